use crate::drive_hub_adapter::DriveHubAdapter;
use google_drive3::api::{File, Permission};
use log::error;
use std::collections::HashSet;
use std::sync::Arc;

/// Fields requested when no caller-supplied projection is given.
pub const DEFAULT_LIST_FIELDS: &str = "files(id, name, owners)";

const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Facade over the Drive hub: CRUD passthroughs plus the ownership
/// compliance check. Holds no state beyond the logged-in user's email and
/// the configured owner allow-list.
pub struct DriveFacade {
    hub: Arc<dyn DriveHubAdapter>,
    email: String,
    owner_email: String,
    verified_emails: HashSet<String>,
}

impl DriveFacade {
    /// Resolves the logged-in user's email up front, like the underlying
    /// account info endpoint is meant to be used.
    pub async fn new(
        hub: Arc<dyn DriveHubAdapter>,
        owner_email: String,
        verified_emails: Vec<String>,
    ) -> Result<Self, String> {
        let user = hub.about_user().await?;
        let email = user
            .email_address
            .ok_or_else(|| "Account info did not include an email address".to_string())?;
        Ok(Self {
            hub,
            email,
            owner_email,
            verified_emails: verified_emails.into_iter().collect(),
        })
    }

    /// Email of the logged-in user.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Lists every file on the account, page by page. A failed page is
    /// logged and halts pagination; whatever was accumulated so far is
    /// returned. No retries.
    pub async fn list_files(&self, fields: &str) -> Vec<File> {
        let mut result = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let request_fields = format!("nextPageToken, {}", fields);
            match self
                .hub
                .fetch_files_page(request_fields, page_token.take())
                .await
            {
                Ok((files, next_page_token)) => {
                    result.extend(files);
                    page_token = next_page_token;
                }
                Err(e) => {
                    error!("An error occurred while listing files: {}", e);
                    page_token = None;
                }
            }
            if page_token.is_none() {
                break;
            }
        }
        result
    }

    /// Creates a folder under `parent_id` (the root when not given) and
    /// returns its id.
    pub async fn create_folder(
        &self,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<String, String> {
        let metadata = File {
            name: Some(name.to_string()),
            mime_type: Some(FOLDER_MIME_TYPE.to_string()),
            parents: Some(vec![parent_id.unwrap_or("root").to_string()]),
            ..File::default()
        };
        let folder = self.hub.create_file(metadata, None).await?;
        folder
            .id
            .ok_or_else(|| "Created folder has no id".to_string())
    }

    /// Creates an empty file, e.g. `document1.docx` with mime
    /// `application/docx`.
    pub async fn create_file(
        &self,
        full_name: &str,
        mime_type: &str,
        parent_id: Option<&str>,
    ) -> Result<String, String> {
        let metadata = File {
            name: Some(full_name.to_string()),
            mime_type: Some(mime_type.to_string()),
            parents: Some(vec![parent_id.unwrap_or("root").to_string()]),
            ..File::default()
        };
        let file = self.hub.create_file(metadata, None).await?;
        file.id.ok_or_else(|| "Created file has no id".to_string())
    }

    /// Convenience form of [`create_file`](Self::create_file) taking name,
    /// kind and extension separately.
    pub async fn create_file_basic(
        &self,
        name: &str,
        kind: &str,
        extension: &str,
        parent_id: Option<&str>,
    ) -> Result<String, String> {
        self.create_file(
            &format!("{}.{}", name, extension),
            &format!("{}/{}", kind, extension),
            parent_id,
        )
        .await
    }

    /// Uploads a file from the local filesystem as a multipart upload and
    /// returns the id of the created file.
    pub async fn upload_file(
        &self,
        full_name: &str,
        mime_type: &str,
        source_path: &str,
        parent_id: Option<&str>,
    ) -> Result<String, String> {
        let content = std::fs::read(source_path)
            .map_err(|e| format!("Failed to read file to upload '{}': {}", source_path, e))?;
        let metadata = File {
            name: Some(full_name.to_string()),
            parents: Some(vec![parent_id.unwrap_or("root").to_string()]),
            ..File::default()
        };
        let file = self
            .hub
            .create_file(metadata, Some((content, mime_type.to_string())))
            .await?;
        file.id.ok_or_else(|| "Uploaded file has no id".to_string())
    }

    /// Convenience form of [`upload_file`](Self::upload_file); the file is
    /// expected at `source_dir/name.extension`.
    pub async fn upload_file_basic(
        &self,
        name: &str,
        kind: &str,
        extension: &str,
        source_dir: &str,
        parent_id: Option<&str>,
    ) -> Result<String, String> {
        self.upload_file(
            &format!("{}.{}", name, extension),
            &format!("{}/{}", kind, extension),
            &format!("{}/{}.{}", source_dir, name, extension),
            parent_id,
        )
        .await
    }

    /// Moves a file into another folder by swapping its parents.
    pub async fn move_file(&self, file_id: &str, folder_id: &str) -> Result<(), String> {
        let file = self
            .hub
            .get_file(file_id.to_string(), "parents".to_string())
            .await?;
        let previous_parents = file.parents.unwrap_or_default().join(",");
        self.hub
            .update_parents(file_id.to_string(), folder_id.to_string(), previous_parents)
            .await?;
        Ok(())
    }

    /// Raw content of a file.
    pub async fn download_file(&self, file_id: &str) -> Result<Vec<u8>, String> {
        self.hub.fetch_file_data(file_id.to_string()).await
    }

    /// Files whose ownership violates the allow-list: any owner email
    /// outside the configured set puts the file in danger. Each file is
    /// flagged at most once regardless of how many owners violate.
    pub async fn files_in_danger(&self) -> Vec<File> {
        self.list_files(DEFAULT_LIST_FIELDS)
            .await
            .into_iter()
            .filter(|file| self.has_unverified_owner(file))
            .collect()
    }

    /// Transfers ownership of the given files to the configured owner email.
    /// Returns the granted permissions.
    pub async fn set_verified_owner(&self, ids: &[String]) -> Result<Vec<Permission>, String> {
        let files = self.files_by_ids(ids).await;
        let mut granted = Vec::with_capacity(files.len());
        for file in files {
            let file_id = file
                .id
                .ok_or_else(|| "Listed file has no id".to_string())?;
            let permission = Permission {
                type_: Some("user".to_string()),
                role: Some("owner".to_string()),
                email_address: Some(self.owner_email.clone()),
                ..Permission::default()
            };
            granted.push(self.hub.create_permission(file_id, permission, true).await?);
        }
        Ok(granted)
    }

    fn has_unverified_owner(&self, file: &File) -> bool {
        file.owners
            .as_ref()
            .map(|owners| {
                owners.iter().any(|owner| {
                    owner
                        .email_address
                        .as_deref()
                        .map(|email| !self.verified_emails.contains(email))
                        .unwrap_or(true)
                })
            })
            .unwrap_or(false)
    }

    async fn files_by_ids(&self, ids: &[String]) -> Vec<File> {
        self.list_files("files(id, name, permissions)")
            .await
            .into_iter()
            .filter(|file| {
                file.id
                    .as_ref()
                    .map(|id| ids.contains(id))
                    .unwrap_or(false)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use google_drive3::api::User;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    // The generated api types do not implement PartialEq, so calls are
    // recorded field by field.
    #[derive(Debug, Clone, PartialEq)]
    enum RecordedCall {
        FetchFilesPage {
            fields: String,
            page_token: Option<String>,
        },
        CreateFile {
            name: Option<String>,
            mime_type: Option<String>,
            parents: Option<Vec<String>>,
            content: Option<(Vec<u8>, String)>,
        },
        GetFile {
            file_id: String,
            fields: String,
        },
        UpdateParents {
            file_id: String,
            add_parents: String,
            remove_parents: String,
        },
        FetchFileData {
            file_id: String,
        },
        CreatePermission {
            file_id: String,
            grantee_type: Option<String>,
            role: Option<String>,
            email_address: Option<String>,
            transfer_ownership: bool,
        },
    }

    #[derive(Default)]
    struct FakeHub {
        pages: Mutex<VecDeque<Result<(Vec<File>, Option<String>), String>>>,
        calls: Mutex<Vec<RecordedCall>>,
        parents: Option<Vec<String>>,
    }

    impl FakeHub {
        fn with_pages(pages: Vec<Result<(Vec<File>, Option<String>), String>>) -> Self {
            Self {
                pages: Mutex::new(pages.into()),
                ..Self::default()
            }
        }

        fn recorded(&self) -> Vec<RecordedCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl DriveHubAdapter for FakeHub {
        async fn fetch_files_page(
            &self,
            fields: String,
            page_token: Option<String>,
        ) -> Result<(Vec<File>, Option<String>), String> {
            self.calls.lock().unwrap().push(RecordedCall::FetchFilesPage {
                fields,
                page_token,
            });
            self.pages
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok((Vec::new(), None)))
        }

        async fn create_file(
            &self,
            metadata: File,
            content: Option<(Vec<u8>, String)>,
        ) -> Result<File, String> {
            self.calls.lock().unwrap().push(RecordedCall::CreateFile {
                name: metadata.name,
                mime_type: metadata.mime_type,
                parents: metadata.parents,
                content,
            });
            Ok(file("created-id", "irrelevant", &[]))
        }

        async fn get_file(&self, file_id: String, fields: String) -> Result<File, String> {
            self.calls.lock().unwrap().push(RecordedCall::GetFile {
                file_id,
                fields,
            });
            Ok(File {
                parents: self.parents.clone(),
                ..File::default()
            })
        }

        async fn update_parents(
            &self,
            file_id: String,
            add_parents: String,
            remove_parents: String,
        ) -> Result<File, String> {
            self.calls.lock().unwrap().push(RecordedCall::UpdateParents {
                file_id,
                add_parents,
                remove_parents,
            });
            Ok(File::default())
        }

        async fn fetch_file_data(&self, file_id: String) -> Result<Vec<u8>, String> {
            self.calls.lock().unwrap().push(RecordedCall::FetchFileData {
                file_id,
            });
            Ok(b"file content".to_vec())
        }

        async fn create_permission(
            &self,
            file_id: String,
            permission: Permission,
            transfer_ownership: bool,
        ) -> Result<Permission, String> {
            let granted = permission.clone();
            self.calls.lock().unwrap().push(RecordedCall::CreatePermission {
                file_id,
                grantee_type: permission.type_,
                role: permission.role,
                email_address: permission.email_address,
                transfer_ownership,
            });
            Ok(granted)
        }

        async fn about_user(&self) -> Result<User, String> {
            Ok(User {
                email_address: Some("admin@example.com".to_string()),
                ..User::default()
            })
        }
    }

    fn file(id: &str, name: &str, owner_emails: &[&str]) -> File {
        File {
            id: Some(id.to_string()),
            name: Some(name.to_string()),
            owners: if owner_emails.is_empty() {
                None
            } else {
                Some(
                    owner_emails
                        .iter()
                        .map(|email| User {
                            email_address: Some(email.to_string()),
                            ..User::default()
                        })
                        .collect(),
                )
            },
            ..File::default()
        }
    }

    async fn facade_with(hub: Arc<FakeHub>) -> DriveFacade {
        DriveFacade::new(
            hub,
            "owner@example.com".to_string(),
            vec![
                "admin@example.com".to_string(),
                "teammate@example.com".to_string(),
            ],
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn new_resolves_logged_in_email() {
        let facade = facade_with(Arc::new(FakeHub::default())).await;

        assert_eq!(facade.email(), "admin@example.com");
    }

    #[tokio::test]
    async fn list_files_accumulates_all_pages() {
        let hub = Arc::new(FakeHub::with_pages(vec![
            Ok((
                vec![file("1", "a.txt", &[])],
                Some("page-2".to_string()),
            )),
            Ok((vec![file("2", "b.txt", &[]), file("3", "c.txt", &[])], None)),
        ]));
        let facade = facade_with(Arc::clone(&hub)).await;

        let files = facade.list_files(DEFAULT_LIST_FIELDS).await;

        assert_eq!(files.len(), 3);
        let recorded = hub.recorded();
        assert_eq!(
            recorded[0],
            RecordedCall::FetchFilesPage {
                fields: "nextPageToken, files(id, name, owners)".to_string(),
                page_token: None,
            }
        );
        assert_eq!(
            recorded[1],
            RecordedCall::FetchFilesPage {
                fields: "nextPageToken, files(id, name, owners)".to_string(),
                page_token: Some("page-2".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn list_files_halts_on_page_error_and_keeps_partial_result() {
        let hub = Arc::new(FakeHub::with_pages(vec![
            Ok((
                vec![file("1", "a.txt", &[])],
                Some("page-2".to_string()),
            )),
            Err("Response status: 500".to_string()),
        ]));
        let facade = facade_with(Arc::clone(&hub)).await;

        let files = facade.list_files(DEFAULT_LIST_FIELDS).await;

        assert_eq!(files.len(), 1);
        assert_eq!(hub.recorded().len(), 2);
    }

    #[tokio::test]
    async fn create_folder_sends_folder_mime_and_returns_id() {
        let hub = Arc::new(FakeHub::default());
        let facade = facade_with(Arc::clone(&hub)).await;

        let id = facade.create_folder("reports", None).await.unwrap();

        assert_eq!(id, "created-id");
        assert_eq!(
            hub.recorded()[0],
            RecordedCall::CreateFile {
                name: Some("reports".to_string()),
                mime_type: Some("application/vnd.google-apps.folder".to_string()),
                parents: Some(vec!["root".to_string()]),
                content: None,
            }
        );
    }

    #[tokio::test]
    async fn create_file_basic_composes_name_and_mime() {
        let hub = Arc::new(FakeHub::default());
        let facade = facade_with(Arc::clone(&hub)).await;

        facade
            .create_file_basic("document1", "image", "png", Some("folder-9"))
            .await
            .unwrap();

        assert_eq!(
            hub.recorded()[0],
            RecordedCall::CreateFile {
                name: Some("document1.png".to_string()),
                mime_type: Some("image/png".to_string()),
                parents: Some(vec!["folder-9".to_string()]),
                content: None,
            }
        );
    }

    #[tokio::test]
    async fn upload_file_reads_content_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello drive").unwrap();
        let hub = Arc::new(FakeHub::default());
        let facade = facade_with(Arc::clone(&hub)).await;

        let id = facade
            .upload_file("notes.txt", "text/plain", path.to_str().unwrap(), None)
            .await
            .unwrap();

        assert_eq!(id, "created-id");
        assert_eq!(
            hub.recorded()[0],
            RecordedCall::CreateFile {
                name: Some("notes.txt".to_string()),
                mime_type: None,
                parents: Some(vec!["root".to_string()]),
                content: Some((b"hello drive".to_vec(), "text/plain".to_string())),
            }
        );
    }

    #[tokio::test]
    async fn upload_file_missing_source_fails() {
        let facade = facade_with(Arc::new(FakeHub::default())).await;

        let result = facade
            .upload_file("gone.txt", "text/plain", "/no/such/path/gone.txt", None)
            .await;

        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .starts_with("Failed to read file to upload"));
    }

    #[tokio::test]
    async fn move_file_swaps_previous_parents() {
        let hub = Arc::new(FakeHub {
            parents: Some(vec!["old-a".to_string(), "old-b".to_string()]),
            ..FakeHub::default()
        });
        let facade = facade_with(Arc::clone(&hub)).await;

        facade.move_file("file-7", "folder-3").await.unwrap();

        let recorded = hub.recorded();
        assert_eq!(
            recorded[0],
            RecordedCall::GetFile {
                file_id: "file-7".to_string(),
                fields: "parents".to_string(),
            }
        );
        assert_eq!(
            recorded[1],
            RecordedCall::UpdateParents {
                file_id: "file-7".to_string(),
                add_parents: "folder-3".to_string(),
                remove_parents: "old-a,old-b".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn download_file_forwards_to_hub() {
        let hub = Arc::new(FakeHub::default());
        let facade = facade_with(Arc::clone(&hub)).await;

        let content = facade.download_file("file-5").await.unwrap();

        assert_eq!(content, b"file content");
        assert_eq!(
            hub.recorded()[0],
            RecordedCall::FetchFileData {
                file_id: "file-5".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn files_in_danger_flags_unverified_owners_once() {
        let hub = Arc::new(FakeHub::with_pages(vec![Ok((
            vec![
                file("1", "safe.txt", &["admin@example.com"]),
                file(
                    "2",
                    "shared.txt",
                    &["intruder@evil.com", "other@evil.com"],
                ),
                file("3", "mixed.txt", &["teammate@example.com", "intruder@evil.com"]),
                file("4", "ownerless.txt", &[]),
            ],
            None,
        ))]));
        let facade = facade_with(Arc::clone(&hub)).await;

        let in_danger = facade.files_in_danger().await;

        let ids: Vec<_> = in_danger
            .iter()
            .map(|file| file.id.as_deref().unwrap())
            .collect();
        assert_eq!(ids, vec!["2", "3"]);
    }

    #[tokio::test]
    async fn set_verified_owner_transfers_only_requested_ids() {
        let hub = Arc::new(FakeHub::with_pages(vec![Ok((
            vec![
                file("1", "a.txt", &[]),
                file("2", "b.txt", &[]),
                file("3", "c.txt", &[]),
            ],
            None,
        ))]));
        let facade = facade_with(Arc::clone(&hub)).await;

        let granted = facade
            .set_verified_owner(&["1".to_string(), "3".to_string()])
            .await
            .unwrap();

        assert_eq!(granted.len(), 2);
        let recorded = hub.recorded();
        assert_eq!(
            recorded[0],
            RecordedCall::FetchFilesPage {
                fields: "nextPageToken, files(id, name, permissions)".to_string(),
                page_token: None,
            }
        );
        let transfers: Vec<_> = recorded
            .iter()
            .filter(|call| matches!(call, RecordedCall::CreatePermission { .. }))
            .collect();
        assert_eq!(transfers.len(), 2);
        for (call, expected_id) in transfers.iter().zip(["1", "3"]) {
            assert_eq!(
                **call,
                RecordedCall::CreatePermission {
                    file_id: expected_id.to_string(),
                    grantee_type: Some("user".to_string()),
                    role: Some("owner".to_string()),
                    email_address: Some("owner@example.com".to_string()),
                    transfer_ownership: true,
                }
            );
        }
    }
}
