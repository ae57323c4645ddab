//! Credential Storage
//!
//! Durable key/value storage for the access and refresh tokens. The persisted
//! layout is two opaque strings under fixed well-known keys.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{ApiError, StorageError};
use crate::types::Credential;

/// Storage key of the access token.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";

/// Storage key of the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Credential storage interface.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Read a value.
    async fn get(&self, key: &str) -> Result<Option<String>, ApiError>;

    /// Write a value.
    async fn set(&self, key: &str, value: &str) -> Result<(), ApiError>;

    /// Remove a value. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), ApiError>;

    /// Current access token.
    async fn access_token(&self) -> Result<Option<String>, ApiError> {
        self.get(ACCESS_TOKEN_KEY).await
    }

    /// Current refresh token.
    async fn refresh_token(&self) -> Result<Option<String>, ApiError> {
        self.get(REFRESH_TOKEN_KEY).await
    }

    /// Full credential pair, if both halves are present.
    async fn load(&self) -> Result<Option<Credential>, ApiError> {
        let access = self.access_token().await?;
        let refresh = self.refresh_token().await?;
        Ok(match (access, refresh) {
            (Some(access), Some(refresh)) => Some(Credential::new(access, refresh)),
            _ => None,
        })
    }

    /// Store a credential pair.
    async fn save(&self, credential: &Credential) -> Result<(), ApiError> {
        self.set(ACCESS_TOKEN_KEY, credential.access_token()).await?;
        self.set(REFRESH_TOKEN_KEY, credential.refresh_token()).await
    }

    /// Remove both tokens.
    async fn clear(&self) -> Result<(), ApiError> {
        self.remove(ACCESS_TOKEN_KEY).await?;
        self.remove(REFRESH_TOKEN_KEY).await
    }
}

/// In-memory credential storage. Does not survive restarts.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    values: Mutex<HashMap<String, String>>,
}

impl InMemoryCredentialStore {
    /// Create new in-memory storage.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn get(&self, key: &str) -> Result<Option<String>, ApiError> {
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), ApiError> {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), ApiError> {
        self.values.lock().unwrap().remove(key);
        Ok(())
    }
}

/// File-backed credential storage.
///
/// Keeps a flat JSON object of string values. Writes go to a sibling temp file
/// that is renamed over the original.
pub struct FileCredentialStore {
    path: PathBuf,
    io_lock: tokio::sync::Mutex<()>,
}

impl FileCredentialStore {
    /// Create storage backed by `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            io_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<HashMap<String, String>, ApiError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => {
                return Err(ApiError::Storage(StorageError::ReadFailed {
                    message: format!("{}: {}", self.path.display(), e),
                }))
            }
        };

        if raw.trim().is_empty() {
            return Ok(HashMap::new());
        }

        serde_json::from_str(&raw).map_err(|e| {
            ApiError::Storage(StorageError::CorruptedData {
                message: format!("{}: {}", self.path.display(), e),
            })
        })
    }

    async fn write_all(&self, values: &HashMap<String, String>) -> Result<(), ApiError> {
        let write_failed = |e: std::io::Error| {
            ApiError::Storage(StorageError::WriteFailed {
                message: format!("{}: {}", self.path.display(), e),
            })
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
        }

        let serialized = serde_json::to_string_pretty(values).map_err(|e| {
            ApiError::Storage(StorageError::WriteFailed {
                message: e.to_string(),
            })
        })?;

        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, serialized).await.map_err(write_failed)?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(write_failed)
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn get(&self, key: &str) -> Result<Option<String>, ApiError> {
        let _guard = self.io_lock.lock().await;
        Ok(self.read_all().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), ApiError> {
        let _guard = self.io_lock.lock().await;
        let mut values = self.read_all().await?;
        values.insert(key.to_string(), value.to_string());
        self.write_all(&values).await
    }

    async fn remove(&self, key: &str) -> Result<(), ApiError> {
        let _guard = self.io_lock.lock().await;
        let mut values = self.read_all().await?;
        if values.remove(key).is_some() {
            self.write_all(&values).await?;
        }
        Ok(())
    }
}

/// Mock credential storage for testing.
#[derive(Default)]
pub struct MockCredentialStore {
    values: Mutex<HashMap<String, String>>,
    set_history: Mutex<Vec<(String, String)>>,
    clear_count: Mutex<u32>,
    should_fail: Mutex<bool>,
}

impl MockCredentialStore {
    /// Create new mock storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create mock storage holding a credential pair.
    pub fn with_credential(access_token: &str, refresh_token: &str) -> Self {
        let store = Self::new();
        store.insert(ACCESS_TOKEN_KEY, access_token);
        store.insert(REFRESH_TOKEN_KEY, refresh_token);
        store
    }

    /// Pre-populate a value without recording history.
    pub fn insert(&self, key: &str, value: &str) -> &Self {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        self
    }

    /// Set storage to fail all operations.
    pub fn set_should_fail(&self, should_fail: bool) -> &Self {
        *self.should_fail.lock().unwrap() = should_fail;
        self
    }

    /// Get write history.
    pub fn get_set_history(&self) -> Vec<(String, String)> {
        self.set_history.lock().unwrap().clone()
    }

    /// Number of times `clear` ran.
    pub fn clear_count(&self) -> u32 {
        *self.clear_count.lock().unwrap()
    }

    /// Snapshot of a value.
    pub fn value(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    fn check_error(&self) -> Result<(), ApiError> {
        if *self.should_fail.lock().unwrap() {
            return Err(ApiError::Storage(StorageError::WriteFailed {
                message: "Mock storage failure".to_string(),
            }));
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for MockCredentialStore {
    async fn get(&self, key: &str) -> Result<Option<String>, ApiError> {
        self.check_error()?;
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), ApiError> {
        self.check_error()?;
        self.set_history
            .lock()
            .unwrap()
            .push((key.to_string(), value.to_string()));
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), ApiError> {
        self.check_error()?;
        self.values.lock().unwrap().remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), ApiError> {
        self.check_error()?;
        *self.clear_count.lock().unwrap() += 1;
        let mut values = self.values.lock().unwrap();
        values.remove(ACCESS_TOKEN_KEY);
        values.remove(REFRESH_TOKEN_KEY);
        Ok(())
    }
}

/// Create in-memory credential storage.
pub fn create_in_memory_credential_store() -> InMemoryCredentialStore {
    InMemoryCredentialStore::new()
}

/// Create mock credential storage for testing.
pub fn create_mock_credential_store() -> MockCredentialStore {
    MockCredentialStore::new()
}
