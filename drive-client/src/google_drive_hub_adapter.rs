use crate::drive_hub_adapter::DriveHubAdapter;
use async_trait::async_trait;
use google_drive3::api::{File, Permission, User};
use google_drive3::DriveHub;
use hyper::header::AUTHORIZATION;
use hyper::StatusCode;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use std::io::Cursor;
use std::sync::Arc;

pub struct GoogleDriveHubAdapter {
    hub: Arc<DriveHub<HttpsConnector<HttpConnector>>>,
    scope: String,
}

impl GoogleDriveHubAdapter {
    pub fn new(hub: DriveHub<HttpsConnector<HttpConnector>>, scope: String) -> Self {
        Self {
            hub: Arc::new(hub),
            scope,
        }
    }
}

#[async_trait]
impl DriveHubAdapter for GoogleDriveHubAdapter {
    async fn fetch_files_page(
        &self,
        fields: String,
        page_token: Option<String>,
    ) -> Result<(Vec<File>, Option<String>), String> {
        let mut call = self
            .hub
            .files()
            .list()
            .add_scope(&self.scope)
            .param("fields", fields.as_str());
        if let Some(token) = page_token.as_deref() {
            call = call.page_token(token);
        }
        match call.doit().await {
            Err(e) => Err(format!("HTTP error: {:?}", e)),
            Ok((response, file_list)) => match response.status() {
                StatusCode::OK => Ok((
                    file_list.files.unwrap_or_default(),
                    file_list.next_page_token,
                )),
                _ => Err(format!(
                    "Failed to fetch file list. Response status: {}, body: {:?}",
                    response.status(),
                    response.body()
                )),
            },
        }
    }

    async fn create_file(
        &self,
        metadata: File,
        content: Option<(Vec<u8>, String)>,
    ) -> Result<File, String> {
        // The create endpoint only exposes the upload protocol; a
        // metadata-only create is an upload with an empty body.
        let (data, mime_type) = match content {
            Some((data, mime_type)) => (data, mime_type),
            None => {
                let mime_type = metadata
                    .mime_type
                    .clone()
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                (Vec::new(), mime_type)
            }
        };
        let mime: mime::Mime = mime_type
            .parse()
            .map_err(|_| format!("Invalid mime type: {}", mime_type))?;
        let result = self
            .hub
            .files()
            .create(metadata)
            .add_scope(&self.scope)
            .param("fields", "id")
            .upload(Cursor::new(data), mime)
            .await;
        match result {
            Err(e) => Err(format!("HTTP error: {:?}", e)),
            Ok((response, file)) => match response.status() {
                StatusCode::OK => Ok(file),
                _ => Err(format!(
                    "Failed to create file. Response status: {}, body: {:?}",
                    response.status(),
                    response.body()
                )),
            },
        }
    }

    async fn get_file(&self, file_id: String, fields: String) -> Result<File, String> {
        let result = self
            .hub
            .files()
            .get(&file_id)
            .add_scope(&self.scope)
            .param("fields", fields.as_str())
            .doit()
            .await;
        match result {
            Err(e) => Err(format!("HTTP error: {:?}", e)),
            Ok((response, file)) => match response.status() {
                StatusCode::OK => Ok(file),
                _ => Err(format!(
                    "Failed to get file {}. Response status: {}, body: {:?}",
                    file_id,
                    response.status(),
                    response.body()
                )),
            },
        }
    }

    async fn update_parents(
        &self,
        file_id: String,
        add_parents: String,
        remove_parents: String,
    ) -> Result<File, String> {
        let result = self
            .hub
            .files()
            .update(File::default(), &file_id)
            .add_scope(&self.scope)
            .add_parents(&add_parents)
            .remove_parents(&remove_parents)
            .param("fields", "id, parents")
            .doit_without_upload()
            .await;
        match result {
            Err(e) => Err(format!("HTTP error: {:?}", e)),
            Ok((response, file)) => match response.status() {
                StatusCode::OK => Ok(file),
                _ => Err(format!(
                    "Failed to move file {}. Response status: {}, body: {:?}",
                    file_id,
                    response.status(),
                    response.body()
                )),
            },
        }
    }

    async fn fetch_file_data(&self, file_id: String) -> Result<Vec<u8>, String> {
        let access_token = self
            .hub
            .auth
            .get_token(&[&self.scope])
            .await
            .map_err(|e| format!("Token error: {}", e))?
            .ok_or("Missing access token")?;
        let url = format!(
            "https://www.googleapis.com/drive/v3/files/{}?alt=media",
            file_id
        );

        let client = reqwest::Client::new();
        let response = client
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {}", access_token))
            .send()
            .await
            .map_err(|e| format!("Download request error: {}", e))?;

        if response.status().is_success() {
            let bytes = response
                .bytes()
                .await
                .map_err(|e| format!("Reading bytes error: {}", e))?;
            Ok(bytes.to_vec())
        } else {
            Err(format!(
                "Download failed with status: {}, body: {:?}",
                response.status(),
                response.text().await.unwrap_or_default()
            ))
        }
    }

    async fn create_permission(
        &self,
        file_id: String,
        permission: Permission,
        transfer_ownership: bool,
    ) -> Result<Permission, String> {
        let result = self
            .hub
            .permissions()
            .create(permission, &file_id)
            .add_scope(&self.scope)
            .transfer_ownership(transfer_ownership)
            .doit()
            .await;
        match result {
            Err(e) => Err(format!("HTTP error: {:?}", e)),
            Ok((response, permission)) => match response.status() {
                StatusCode::OK => Ok(permission),
                _ => Err(format!(
                    "Failed to create permission on file {}. Response status: {}, body: {:?}",
                    file_id,
                    response.status(),
                    response.body()
                )),
            },
        }
    }

    async fn about_user(&self) -> Result<User, String> {
        let result = self
            .hub
            .about()
            .get()
            .add_scope(&self.scope)
            .param("fields", "user")
            .doit()
            .await;
        match result {
            Err(e) => Err(format!("HTTP error: {:?}", e)),
            Ok((response, about)) => match response.status() {
                StatusCode::OK => about
                    .user
                    .ok_or_else(|| "About response did not include the user".to_string()),
                _ => Err(format!(
                    "Failed to fetch account info. Response status: {}, body: {:?}",
                    response.status(),
                    response.body()
                )),
            },
        }
    }
}
