//! Shared fixtures for unit tests

use crate::{
    backend::{FeedBackend, KeyDirectory},
    store::{KeyValueStore, StoreLocation},
    types::*,
    ClientError, Result,
};
use async_trait::async_trait;
use fitshare_crypto::KeyPair;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

pub(crate) const TEST_KEY_BITS: usize = 2048;

pub(crate) fn device_key() -> &'static KeyPair {
    static KEY: OnceLock<KeyPair> = OnceLock::new();
    KEY.get_or_init(|| KeyPair::generate_with_bits(TEST_KEY_BITS).unwrap())
}

pub(crate) fn friend_key() -> &'static KeyPair {
    static KEY: OnceLock<KeyPair> = OnceLock::new();
    KEY.get_or_init(|| KeyPair::generate_with_bits(TEST_KEY_BITS).unwrap())
}

/// In-process backend recording every call
#[derive(Default)]
pub(crate) struct MockBackend {
    pub own_key: Mutex<Option<String>>,
    pub friends: Mutex<Vec<RecipientKey>>,
    pub registrations: Mutex<Vec<RegisterKeyRequest>>,
    pub references: Mutex<Vec<String>>,
    pub submissions: Mutex<Vec<NewsSubmission>>,
    pub failing_receivers: Mutex<HashSet<String>>,
    pub received: Mutex<Vec<ReceivedFeedItem>>,
    pub published: Mutex<Vec<ReceivedFeedItem>>,
    pub reject_registration: AtomicBool,
    pub fail_reference: AtomicBool,
}

impl MockBackend {
    pub fn registration_count(&self) -> usize {
        self.registrations.lock().len()
    }

    pub fn reject_registrations(&self) {
        self.reject_registration.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl KeyDirectory for MockBackend {
    async fn register_public_key(&self, request: &RegisterKeyRequest) -> Result<()> {
        if self.reject_registration.load(Ordering::SeqCst) {
            return Err(ClientError::RegistrationRejected {
                status: 409,
                message: "device already registered".into(),
            });
        }
        *self.own_key.lock() = Some(request.public_key.clone());
        self.registrations.lock().push(request.clone());
        Ok(())
    }

    async fn my_public_key(&self) -> Result<String> {
        self.own_key.lock().clone().ok_or(ClientError::Api {
            status: 404,
            message: "no key registered".into(),
        })
    }

    async fn friend_keys(&self) -> Result<Vec<RecipientKey>> {
        Ok(self.friends.lock().clone())
    }
}

#[async_trait]
impl FeedBackend for MockBackend {
    async fn submit_reference(&self, data: &str) -> Result<String> {
        if self.fail_reference.load(Ordering::SeqCst) {
            return Err(ClientError::Api {
                status: 500,
                message: "database down".into(),
            });
        }
        let mut references = self.references.lock();
        references.push(data.to_string());
        Ok(format!("ref-{}", references.len()))
    }

    async fn submit_news(&self, submission: &NewsSubmission) -> Result<()> {
        if self
            .failing_receivers
            .lock()
            .contains(&submission.receiver_fs_user_id)
        {
            return Err(ClientError::Api {
                status: 500,
                message: "insert failed".into(),
            });
        }
        self.submissions.lock().push(submission.clone());
        Ok(())
    }

    async fn received_news(&self) -> Result<Vec<ReceivedFeedItem>> {
        Ok(self.received.lock().clone())
    }

    async fn published_news(&self) -> Result<Vec<ReceivedFeedItem>> {
        Ok(self.published.lock().clone())
    }
}

/// A store whose database can never be opened
pub(crate) struct UnavailableStore;

#[async_trait]
impl KeyValueStore for UnavailableStore {
    async fn put(&self, location: StoreLocation, _key: &str, _value: &str) -> Result<()> {
        Err(ClientError::StorageUnavailable(location.database.to_string()))
    }

    async fn get(&self, location: StoreLocation, _key: &str) -> Result<Option<String>> {
        Err(ClientError::StorageUnavailable(location.database.to_string()))
    }
}

pub(crate) fn feed_item(id: &str, publisher: &str, data: &str) -> ReceivedFeedItem {
    ReceivedFeedItem {
        id: id.to_string(),
        publisher_fs_user_id: publisher.to_string(),
        publisher_username: None,
        receiver_fs_user_id: None,
        receiver_username: None,
        data: data.to_string(),
        created_at: "2024-05-01T07:30:00".to_string(),
    }
}
