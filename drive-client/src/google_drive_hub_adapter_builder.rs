use crate::google_drive_hub_adapter::GoogleDriveHubAdapter;
use crate::google_drive_utils::{build_connection_client, BearerTokenProvider};
use google_drive3::DriveHub;
use std::sync::Arc;

pub struct GoogleDriveHubAdapterBuilder {
    scope: Option<String>,
    access_token: Option<String>,
}

impl GoogleDriveHubAdapterBuilder {
    pub fn new() -> Self {
        GoogleDriveHubAdapterBuilder {
            scope: None,
            access_token: None,
        }
    }

    pub fn with_scope(mut self, scope: String) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn with_access_token(mut self, access_token: String) -> Self {
        self.access_token = Some(access_token);
        self
    }

    pub fn build(self) -> Result<Arc<GoogleDriveHubAdapter>, String> {
        let scope = self.scope.ok_or_else(|| "Scope is missing".to_string())?;
        let access_token = self
            .access_token
            .ok_or_else(|| "Access token is missing".to_string())?;
        let client = build_connection_client();
        let hub = DriveHub::new(client, BearerTokenProvider::new(access_token));
        Ok(Arc::new(GoogleDriveHubAdapter::new(hub, scope)))
    }
}

impl Default for GoogleDriveHubAdapterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
