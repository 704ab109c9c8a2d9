use async_trait::async_trait;
use google_drive3::api::{File, Permission, User};

/// Narrow seam over the Drive hub so the facade can be exercised against a
/// fake in tests.
#[async_trait]
pub trait DriveHubAdapter: Send + Sync {
    /// One page of the file listing. Returns the files plus the next page
    /// token when more pages remain.
    async fn fetch_files_page(
        &self,
        fields: String,
        page_token: Option<String>,
    ) -> Result<(Vec<File>, Option<String>), String>;

    /// Creates a file. With `content` present this is a multipart upload,
    /// otherwise a metadata-only create (empty file or folder).
    async fn create_file(
        &self,
        metadata: File,
        content: Option<(Vec<u8>, String)>,
    ) -> Result<File, String>;

    async fn get_file(&self, file_id: String, fields: String) -> Result<File, String>;

    async fn update_parents(
        &self,
        file_id: String,
        add_parents: String,
        remove_parents: String,
    ) -> Result<File, String>;

    async fn fetch_file_data(&self, file_id: String) -> Result<Vec<u8>, String>;

    async fn create_permission(
        &self,
        file_id: String,
        permission: Permission,
        transfer_ownership: bool,
    ) -> Result<Permission, String>;

    async fn about_user(&self) -> Result<User, String>;
}
