use serde::Deserialize;
use std::path::Path;
use std::{env, fs};

/// OAuth client description as downloaded from the Google API console
/// (the `web` or `installed` section of credentials.json).
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,
    pub client_secret: String,
    pub auth_uri: String,
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

#[derive(Deserialize)]
struct ClientSecretFile {
    web: Option<ClientSecret>,
    installed: Option<ClientSecret>,
}

impl ClientSecret {
    /// The registered redirect URI the consent flow sends the user back to.
    pub fn redirect_uri(&self) -> Result<&str, String> {
        self.redirect_uris
            .first()
            .map(String::as_str)
            .ok_or_else(|| "No redirect URIs configured in the OAuth client JSON".to_string())
    }
}

pub fn parse_client_secret(secret_json: &str) -> Result<ClientSecret, String> {
    let parsed: ClientSecretFile = serde_json::from_str(secret_json)
        .map_err(|e| format!("Failed to parse OAuth client JSON: {}", e))?;

    parsed.web.or(parsed.installed).ok_or_else(|| {
        "OAuth client JSON has neither a \"web\" nor an \"installed\" section".to_string()
    })
}

fn read_credentials_from_file(source: &str) -> Result<String, String> {
    let secret_path = Path::new(source);

    match fs::read_to_string(secret_path) {
        Err(e) => Err(format!("Failed to read OAuth client file: {:#?}", e)),
        Ok(secret_json) => Ok(secret_json),
    }
}

fn read_credentials_from_env(variable_name: &str) -> Result<String, String> {
    match env::var(variable_name) {
        Ok(val) => Ok(val),
        Err(e) => Err(format!(
            "Environment variable {} is not set to point at gdrive credentials: {}",
            variable_name, e
        )),
    }
}

/// Loads the OAuth client JSON either from a file at `source` or, when no such
/// file exists, from an environment variable named `source`.
pub fn read_credentials(source: &str) -> Result<String, String> {
    if Path::new(source).exists() {
        read_credentials_from_file(source)
    } else {
        match read_credentials_from_env(source) {
            Ok(credentials) => Ok(credentials),
            Err(e) => Err(format!(
                "File not found for gdrive credentials: '{}'. {}",
                source, e
            )),
        }
    }
}
