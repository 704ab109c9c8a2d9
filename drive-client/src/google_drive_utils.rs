use google_drive3::common::{Client, GetToken};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use rustls::crypto::ring::default_provider;
use rustls::crypto::CryptoProvider;
use std::error::Error as StdError;
use std::future::Future;
use std::pin::Pin;
use std::sync::Once;

static INIT: Once = Once::new();

pub(crate) fn build_connection_client() -> Client<HttpsConnector<HttpConnector>> {
    INIT.call_once(|| {
        CryptoProvider::install_default(default_provider())
            .expect("Failed to install the default crypto provider for rustls");
    });
    hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new()).build(
        hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .unwrap()
            .https_or_http()
            .enable_http2()
            .build(),
    )
}

/// Hands the hub a pre-acquired access token. The token lifecycle lives in
/// the cookie, not in an authenticator, so the hub only ever sees the bearer
/// string for the current request.
#[derive(Clone)]
pub struct BearerTokenProvider {
    access_token: String,
}

impl BearerTokenProvider {
    pub fn new(access_token: String) -> Self {
        Self { access_token }
    }
}

impl GetToken for BearerTokenProvider {
    fn get_token<'a>(
        &'a self,
        _scopes: &'a [&str],
    ) -> Pin<
        Box<
            dyn Future<Output = Result<Option<String>, Box<dyn StdError + Send + Sync>>>
                + Send
                + 'a,
        >,
    > {
        let token = self.access_token.clone();
        Box::pin(async move { Ok(Some(token)) })
    }
}
