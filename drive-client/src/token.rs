use crate::read_credentials::ClientSecret;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Name of the cookie the token is persisted under.
pub const TOKEN_COOKIE: &str = "token";
/// How long the token cookie lives on the client.
pub const TOKEN_COOKIE_MAX_AGE_SECS: i64 = 3600;

/// Tokens closer to expiry than this are treated as already expired so a call
/// does not fail mid-flight with a just-lapsed credential.
const EXPIRY_SKEW_SECS: i64 = 30;

/// The JSON persisted in the `token` cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub expires_in: i64,
    pub created: i64,
}

impl StoredToken {
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.created + self.expires_in - EXPIRY_SKEW_SECS <= now
    }

    pub fn from_cookie_value(value: &str) -> Result<Self, String> {
        serde_json::from_str(value).map_err(|e| format!("Failed to parse token cookie: {}", e))
    }

    pub fn to_cookie_value(&self) -> Result<String, String> {
        serde_json::to_string(self).map_err(|e| format!("Failed to serialize token: {}", e))
    }
}

/// Lifecycle states of the persisted token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Missing,
    Valid,
    ExpiredWithRefresh,
    ExpiredWithoutRefresh,
}

impl TokenState {
    pub fn of(token: Option<&StoredToken>, now: i64) -> Self {
        match token {
            None => TokenState::Missing,
            Some(token) if !token.is_expired_at(now) => TokenState::Valid,
            Some(token) if token.refresh_token.is_some() => TokenState::ExpiredWithRefresh,
            Some(_) => TokenState::ExpiredWithoutRefresh,
        }
    }

    pub fn current(token: Option<&StoredToken>) -> Self {
        TokenState::of(token, Utc::now().timestamp())
    }
}

/// Performs the OAuth2 authorization-code exchange and silent refresh against
/// the endpoints named in the OAuth client JSON.
pub struct TokenManager {
    secret: ClientSecret,
    scope: String,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct TokenEndpointResponse {
    access_token: String,
    expires_in: i64,
    refresh_token: Option<String>,
}

impl TokenManager {
    pub fn new(secret: ClientSecret, scope: String) -> Self {
        Self {
            secret,
            scope,
            http: reqwest::Client::new(),
        }
    }

    /// URL the user is sent to for the consent screen. Requests offline
    /// access so the exchanged token carries a refresh token.
    pub fn auth_url(&self) -> Result<String, String> {
        let redirect_uri = self.secret.redirect_uri()?;
        let url = reqwest::Url::parse_with_params(
            &self.secret.auth_uri,
            &[
                ("response_type", "code"),
                ("client_id", self.secret.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("scope", self.scope.as_str()),
                ("access_type", "offline"),
                ("prompt", "select_account consent"),
            ],
        )
        .map_err(|e| format!("Failed to build consent URL: {}", e))?;
        Ok(url.into())
    }

    /// Exchanges the code handed back on the redirect URI for a token.
    pub async fn exchange_code(&self, code: &str) -> Result<StoredToken, String> {
        let redirect_uri = self.secret.redirect_uri()?.to_string();
        self.request_token(
            &[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", self.secret.client_id.as_str()),
                ("client_secret", self.secret.client_secret.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
            ],
            None,
        )
        .await
    }

    /// Silently refreshes an expired token. The token endpoint usually omits
    /// the refresh token on this grant, so the previous one is retained.
    pub async fn refresh(&self, token: &StoredToken) -> Result<StoredToken, String> {
        let refresh_token = token
            .refresh_token
            .as_deref()
            .ok_or_else(|| "No refresh token available".to_string())?;
        self.request_token(
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", self.secret.client_id.as_str()),
                ("client_secret", self.secret.client_secret.as_str()),
            ],
            token.refresh_token.clone(),
        )
        .await
    }

    async fn request_token(
        &self,
        form: &[(&str, &str)],
        fallback_refresh_token: Option<String>,
    ) -> Result<StoredToken, String> {
        let response = self
            .http
            .post(&self.secret.token_uri)
            .form(form)
            .send()
            .await
            .map_err(|e| format!("Token endpoint request error: {}", e))?;

        if !response.status().is_success() {
            return Err(format!(
                "Token endpoint returned status: {}, body: {:?}",
                response.status(),
                response.text().await.unwrap_or_default()
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| format!("Reading bytes error: {}", e))?;
        let parsed: TokenEndpointResponse = serde_json::from_slice(&body)
            .map_err(|e| format!("Failed to parse token endpoint response: {}", e))?;

        Ok(Self::stored_token(
            parsed,
            fallback_refresh_token,
            Utc::now().timestamp(),
        ))
    }

    fn stored_token(
        parsed: TokenEndpointResponse,
        fallback_refresh_token: Option<String>,
        created: i64,
    ) -> StoredToken {
        StoredToken {
            access_token: parsed.access_token,
            refresh_token: parsed.refresh_token.or(fallback_refresh_token),
            expires_in: parsed.expires_in,
            created,
        }
    }
}
