use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    #[serde(rename = "gdriveCredentialsFile")]
    pub gdrive_credentials_file: String,
    #[serde(rename = "ownerEmail")]
    pub owner_email: String,
    #[serde(rename = "verifiedEmails")]
    pub verified_emails: Vec<String>,
    #[serde(rename = "bindAddress")]
    pub bind_address: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_camel_case_config() {
        let json = r#"{
            "gdriveCredentialsFile": "/etc/drive-warden/credentials.json",
            "ownerEmail": "owner@example.com",
            "verifiedEmails": ["owner@example.com", "teammate@example.com"],
            "bindAddress": "127.0.0.1:9090"
        }"#;

        let config: AppConfig = serde_json::from_str(json).unwrap();

        assert_eq!(
            config.gdrive_credentials_file,
            "/etc/drive-warden/credentials.json"
        );
        assert_eq!(config.owner_email, "owner@example.com");
        assert_eq!(config.verified_emails.len(), 2);
        assert_eq!(config.bind_address.as_deref(), Some("127.0.0.1:9090"));
    }

    #[test]
    fn bind_address_is_optional() {
        let json = r#"{
            "gdriveCredentialsFile": "credentials.json",
            "ownerEmail": "owner@example.com",
            "verifiedEmails": []
        }"#;

        let config: AppConfig = serde_json::from_str(json).unwrap();

        assert!(config.bind_address.is_none());
    }
}
