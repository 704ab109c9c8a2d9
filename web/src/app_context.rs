use crate::config::config::AppConfig;
use drive_warden_client::read_credentials::{parse_client_secret, read_credentials};
use drive_warden_client::token::TokenManager;

pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// Request-independent state: the OAuth client, the ownership policy and the
/// redirect URI the consent flow lands back on.
pub struct AppContext {
    pub token_manager: TokenManager,
    pub owner_email: String,
    pub verified_emails: Vec<String>,
    pub redirect_uri: String,
}

impl AppContext {
    pub fn from_config(config: &AppConfig) -> Result<Self, String> {
        let secret_json = read_credentials(&config.gdrive_credentials_file)?;
        let secret = parse_client_secret(&secret_json)?;
        let redirect_uri = secret.redirect_uri()?.to_string();
        Ok(Self {
            token_manager: TokenManager::new(secret, DRIVE_SCOPE.to_string()),
            owner_email: config.owner_email.clone(),
            verified_emails: config.verified_emails.clone(),
            redirect_uri,
        })
    }
}
