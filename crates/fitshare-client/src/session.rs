//! Volatile per-session storage
//!
//! Lives only as long as the process; nothing here is written to disk.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Session key holding the current device id
pub const DEVICE_ID_KEY: &str = "deviceId";

/// Session key holding the logged-in user id
pub const FS_USER_ID_KEY: &str = "fsUserId";

/// Shared in-memory session map
#[derive(Clone, Debug, Default)]
pub struct SessionStorage {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl SessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.write().insert(key.into(), value.into());
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        self.entries.write().remove(key)
    }

    /// End the session
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Device id cached for this session
    pub fn device_id(&self) -> Option<String> {
        self.get(DEVICE_ID_KEY)
    }

    pub fn set_device_id(&self, device_id: &str) {
        self.set(DEVICE_ID_KEY, device_id);
    }

    /// User this session was authenticated as
    pub fn fs_user_id(&self) -> Option<String> {
        self.get(FS_USER_ID_KEY)
    }

    pub fn set_fs_user_id(&self, fs_user_id: &str) {
        self.set(FS_USER_ID_KEY, fs_user_id);
    }
}
