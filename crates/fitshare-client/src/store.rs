//! Durable local storage for device key material
//!
//! Two independent databases, each with one named store:
//!
//! | Database | Store | Key | Value |
//! | -------- | ----- | --- | ----- |
//! | `keyDatabase` | `keys` | `privateKey-<fsUserId>` | base64 PKCS#8 private key |
//! | `deviceDatabase` | `devices` | `deviceId-<fsUserId>` | device UUID |
//!
//! Absence is a normal state (first login on a new device) and is reported as
//! `None`, never as an error. On disk every value is its own file under
//! `<root>/<database>/<store>/`, so writers for different users never touch
//! the same file. Several processes may open the same data directory; a write
//! replaces its file atomically and the last writer for a key wins.

use crate::{types::DeviceIdentity, ClientError, Config, Result};
use async_trait::async_trait;
use base64::Engine;
use dashmap::DashMap;
use fitshare_crypto::PrivateKey;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, warn};

/// A database and store name pair
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StoreLocation {
    pub database: &'static str,
    pub store: &'static str,
}

/// Where private keys live
pub const KEY_DATABASE: StoreLocation = StoreLocation {
    database: "keyDatabase",
    store: "keys",
};

/// Where device ids live
pub const DEVICE_DATABASE: StoreLocation = StoreLocation {
    database: "deviceDatabase",
    store: "devices",
};

/// Trait for local key-value storage backends
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Insert or replace a value
    async fn put(&self, location: StoreLocation, key: &str, value: &str) -> Result<()>;

    /// Look a value up; `None` when absent
    async fn get(&self, location: StoreLocation, key: &str) -> Result<Option<String>>;
}

/// An in-memory store for tests and non-durable sessions
#[derive(Clone, Default)]
pub struct MemoryKeyValueStore {
    entries: Arc<DashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored values across all databases
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry_key(location: StoreLocation, key: &str) -> String {
        format!("{}/{}/{}", location.database, location.store, key)
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn put(&self, location: StoreLocation, key: &str, value: &str) -> Result<()> {
        self.entries
            .insert(Self::entry_key(location, key), value.to_string());
        Ok(())
    }

    async fn get(&self, location: StoreLocation, key: &str) -> Result<Option<String>> {
        Ok(self
            .entries
            .get(&Self::entry_key(location, key))
            .map(|entry| entry.value().clone()))
    }
}

/// A store keeping one file per value under a directory
pub struct FileKeyValueStore {
    root: PathBuf,
}

impl FileKeyValueStore {
    /// Open (creating if needed) the data directory
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| unavailable(&root, e))?;
        Ok(Self { root })
    }

    /// Get the data directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn store_dir(&self, location: StoreLocation) -> PathBuf {
        self.root.join(location.database).join(location.store)
    }

    fn value_path(&self, location: StoreLocation, key: &str) -> Result<PathBuf> {
        Ok(self.store_dir(location).join(file_name(key)?))
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn put(&self, location: StoreLocation, key: &str, value: &str) -> Result<()> {
        let path = self.value_path(location, key)?;
        let dir = self.store_dir(location);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| unavailable(&dir, e))?;

        let tmp = dir.join(format!(".{}.tmp", uuid::Uuid::new_v4().simple()));
        if let Err(e) = write_private(&tmp, value.as_bytes()).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(unavailable(&path, e));
        }
        Ok(())
    }

    async fn get(&self, location: StoreLocation, key: &str) -> Result<Option<String>> {
        let path = self.value_path(location, key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(unavailable(&path, e)),
        }
    }
}

/// Keys embed user ids, so they are base64url encoded into file names
fn file_name(key: &str) -> Result<String> {
    if key.is_empty() {
        return Err(ClientError::StorageUnavailable("empty storage key".to_string()));
    }
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(key.as_bytes()))
}

fn unavailable(path: &Path, err: std::io::Error) -> ClientError {
    ClientError::StorageUnavailable(format!("{}: {}", path.display(), err))
}

/// Create `path` readable by the owner only, then write and sync it
async fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await.map_err(|e| unavailable(path, e))?;
    file.write_all(contents)
        .await
        .map_err(|e| unavailable(path, e))?;
    file.sync_all().await.map_err(|e| unavailable(path, e))
}

/// Per-user private key storage
#[derive(Clone)]
pub struct PrivateKeyStore {
    backend: Arc<dyn KeyValueStore>,
}

impl PrivateKeyStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    fn storage_key(fs_user_id: &str) -> String {
        format!("privateKey-{}", fs_user_id)
    }

    /// Store (or replace) the private key of `fs_user_id`
    #[instrument(skip(self, key))]
    pub async fn put(&self, fs_user_id: &str, key: &PrivateKey) -> Result<()> {
        let encoded = key.to_pkcs8_base64()?;
        self.backend
            .put(KEY_DATABASE, &Self::storage_key(fs_user_id), &encoded)
            .await?;
        debug!("stored private key");
        Ok(())
    }

    /// Load the private key of `fs_user_id`
    #[instrument(skip(self))]
    pub async fn get(&self, fs_user_id: &str) -> Result<Option<PrivateKey>> {
        match self
            .backend
            .get(KEY_DATABASE, &Self::storage_key(fs_user_id))
            .await?
        {
            Some(encoded) => Ok(Some(PrivateKey::from_pkcs8_base64(&encoded)?)),
            None => Ok(None),
        }
    }
}

/// Per-user device id storage
#[derive(Clone)]
pub struct DeviceIdentityStore {
    backend: Arc<dyn KeyValueStore>,
}

impl DeviceIdentityStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    fn storage_key(fs_user_id: &str) -> String {
        format!("deviceId-{}", fs_user_id)
    }

    /// Store (or replace) the device id of `fs_user_id`
    #[instrument(skip(self))]
    pub async fn put(&self, fs_user_id: &str, device_id: &str) -> Result<()> {
        self.backend
            .put(DEVICE_DATABASE, &Self::storage_key(fs_user_id), device_id)
            .await
    }

    /// Load the device identity of `fs_user_id`
    #[instrument(skip(self))]
    pub async fn get(&self, fs_user_id: &str) -> Result<Option<DeviceIdentity>> {
        Ok(self
            .backend
            .get(DEVICE_DATABASE, &Self::storage_key(fs_user_id))
            .await?
            .map(|device_id| DeviceIdentity {
                fs_user_id: fs_user_id.to_string(),
                device_id,
            }))
    }
}

/// Both local stores, sharing one backend
#[derive(Clone)]
pub struct LocalStores {
    pub private_keys: PrivateKeyStore,
    pub devices: DeviceIdentityStore,
    durable: bool,
}

impl LocalStores {
    /// Build the stores over an arbitrary backend
    pub fn with_backend(backend: Arc<dyn KeyValueStore>, durable: bool) -> Self {
        Self {
            private_keys: PrivateKeyStore::new(backend.clone()),
            devices: DeviceIdentityStore::new(backend),
            durable,
        }
    }

    /// Non-durable stores for this process only
    pub fn in_memory() -> Self {
        Self::with_backend(Arc::new(MemoryKeyValueStore::new()), false)
    }

    /// Open the stores described by the configuration
    pub async fn open(config: &Config) -> Result<Self> {
        match &config.data_dir {
            Some(dir) => {
                let backend = FileKeyValueStore::open(dir).await?;
                Ok(Self::with_backend(Arc::new(backend), true))
            }
            None => Ok(Self::in_memory()),
        }
    }

    /// Like [`LocalStores::open`], degrading to memory when the disk is unusable
    pub async fn open_or_memory(config: &Config) -> Self {
        match Self::open(config).await {
            Ok(stores) => stores,
            Err(e) => {
                warn!(error = %e, "local storage unavailable, keys will not survive this session");
                Self::in_memory()
            }
        }
    }

    /// Whether writes survive the process
    pub fn is_durable(&self) -> bool {
        self.durable
    }
}
