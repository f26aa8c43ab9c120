//! End-to-end encrypted news feed
//!
//! A post is encrypted once per reader:
//! - the **reference** copy under the author's own key, stored as the
//!   author's canonical copy
//! - one copy per friend under that friend's key
//!
//! Per-recipient failures are collected, never propagated: one friend with a
//! broken key must not keep the post from everyone else. Reading works the
//! same way, an item that cannot be decrypted is shown as it came in.

use crate::{
    backend::FeedBackend,
    store::LocalStores,
    types::{EncryptedPayload, NewsSubmission, ReceivedFeedItem, RecipientKey},
    ClientError, Result,
};
use fitshare_crypto::{decrypt, encrypt, import_public_key, CryptoError, PrivateKey};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// A recipient whose copy could not be produced or delivered
#[derive(Debug)]
pub struct RecipientFailure {
    pub fs_user_id: String,
    pub error: ClientError,
}

/// Result of encrypting one post for every reader
#[derive(Debug)]
pub struct FanOut {
    /// Ciphertext under the author's own key
    pub reference: String,
    /// One entry per recipient, in input order
    pub recipients: Vec<std::result::Result<EncryptedPayload, RecipientFailure>>,
}

impl FanOut {
    /// Number of ciphertexts produced, reference included
    pub fn payload_count(&self) -> usize {
        1 + self.recipients.iter().filter(|r| r.is_ok()).count()
    }
}

/// Encrypt `plaintext` for a single recipient
pub fn encrypt_for_recipient(recipient: &RecipientKey, plaintext: &str) -> Result<EncryptedPayload> {
    let key = import_public_key(&recipient.public_key)?;
    Ok(EncryptedPayload {
        recipient_fs_user_id: recipient.fs_user_id.clone(),
        ciphertext: encrypt(&key, plaintext)?,
    })
}

/// Encrypt `plaintext` under the author's key and each recipient's key
///
/// Fails only if the reference copy cannot be produced.
pub fn fan_out(plaintext: &str, own_public_key: &str, recipients: &[RecipientKey]) -> Result<FanOut> {
    let own_key = import_public_key(own_public_key)?;
    let reference = encrypt(&own_key, plaintext)?;

    let recipients = recipients
        .iter()
        .map(|recipient| {
            encrypt_for_recipient(recipient, plaintext).map_err(|error| {
                if matches!(error, ClientError::Crypto(CryptoError::MalformedKey(_))) {
                    warn!(fs_user_id = %recipient.fs_user_id, "skipping recipient with malformed public key");
                } else {
                    warn!(fs_user_id = %recipient.fs_user_id, %error, "could not encrypt for recipient");
                }
                RecipientFailure {
                    fs_user_id: recipient.fs_user_id.clone(),
                    error,
                }
            })
        })
        .collect();

    Ok(FanOut {
        reference,
        recipients,
    })
}

/// Decrypt a batch of feed items in place
///
/// Without a key the batch is returned unchanged. Items that fail to decrypt
/// keep their ciphertext. Length and order are preserved.
pub fn decrypt_feed(mut items: Vec<ReceivedFeedItem>, key: Option<&PrivateKey>) -> Vec<ReceivedFeedItem> {
    let Some(key) = key else {
        debug!(count = items.len(), "no private key, feed left encrypted");
        return items;
    };

    for item in &mut items {
        match decrypt(key, &item.data) {
            Ok(plaintext) => item.data = plaintext,
            Err(e) => warn!(id = %item.id, error = %e, "could not decrypt feed item"),
        }
    }
    items
}

/// Outcome of publishing a post
#[derive(Debug)]
pub struct PublishReport {
    pub reference_news_id: String,
    pub reference: String,
    pub delivered: Vec<EncryptedPayload>,
    pub failures: Vec<RecipientFailure>,
}

impl PublishReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Publishes and reads the encrypted feed
pub struct FeedService<B: FeedBackend + ?Sized> {
    backend: Arc<B>,
    stores: LocalStores,
}

impl<B: FeedBackend + ?Sized> FeedService<B> {
    pub fn new(backend: Arc<B>, stores: LocalStores) -> Self {
        Self { backend, stores }
    }

    /// Encrypt and submit a post for the author and all friends
    #[instrument(skip(self, plaintext))]
    pub async fn publish(&self, plaintext: &str) -> Result<PublishReport> {
        let own_key = self.backend.my_public_key().await?;
        let friends = self.backend.friend_keys().await?;
        let fan = fan_out(plaintext, &own_key, &friends)?;

        let reference_news_id = self.backend.submit_reference(&fan.reference).await?;
        debug!(%reference_news_id, "stored reference copy");

        let mut failures = Vec::new();
        let mut pending = Vec::new();
        for (friend, copy) in friends.iter().zip(fan.recipients) {
            match copy {
                Ok(payload) => pending.push((friend, payload)),
                Err(failure) => failures.push(failure),
            }
        }

        let results = join_all(pending.into_iter().map(|(friend, payload)| {
            let submission = NewsSubmission {
                reference_news_id: reference_news_id.clone(),
                receiver_fs_user_id: payload.recipient_fs_user_id.clone(),
                receiver_device_id: friend.device_id.clone(),
                data: payload.ciphertext.clone(),
            };
            async move {
                self.backend
                    .submit_news(&submission)
                    .await
                    .map(|()| payload)
                    .map_err(|error| RecipientFailure {
                        fs_user_id: submission.receiver_fs_user_id,
                        error,
                    })
            }
        }))
        .await;

        let mut delivered = Vec::new();
        for result in results {
            match result {
                Ok(payload) => delivered.push(payload),
                Err(failure) => {
                    warn!(fs_user_id = %failure.fs_user_id, error = %failure.error, "could not deliver copy");
                    failures.push(failure);
                }
            }
        }

        info!(delivered = delivered.len(), failed = failures.len(), "published post");
        Ok(PublishReport {
            reference_news_id,
            reference: fan.reference,
            delivered,
            failures,
        })
    }

    /// Items addressed to `fs_user_id`, decrypted where possible
    #[instrument(skip(self, session_key))]
    pub async fn received(&self, fs_user_id: &str, session_key: Option<&PrivateKey>) -> Result<Vec<ReceivedFeedItem>> {
        let items = self.backend.received_news().await?;
        let key = self.resolve_key(fs_user_id, session_key).await;
        Ok(decrypt_feed(items, key.as_ref()))
    }

    /// Reference copies authored by `fs_user_id`, decrypted where possible
    #[instrument(skip(self, session_key))]
    pub async fn published(&self, fs_user_id: &str, session_key: Option<&PrivateKey>) -> Result<Vec<ReceivedFeedItem>> {
        let items = self.backend.published_news().await?;
        let key = self.resolve_key(fs_user_id, session_key).await;
        Ok(decrypt_feed(items, key.as_ref()))
    }

    async fn resolve_key(&self, fs_user_id: &str, session_key: Option<&PrivateKey>) -> Option<PrivateKey> {
        if let Some(key) = session_key {
            return Some(key.clone());
        }
        match self.stores.private_keys.get(fs_user_id).await {
            Ok(key) => key,
            Err(e) => {
                warn!(error = %e, "private key unavailable, feed left encrypted");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{device_key, feed_item, friend_key, MockBackend, UnavailableStore};
    use fitshare_crypto::export_public_key;
    use std::collections::HashSet;

    fn own_exported() -> String {
        export_public_key(device_key().public_key())
    }

    fn friend(id: &str) -> RecipientKey {
        RecipientKey::new(id, export_public_key(friend_key().public_key())).with_device_id(format!("dev-{}", id))
    }

    #[test]
    fn test_fan_out_produces_distinct_copies() {
        let friends = vec![friend("f1"), friend("f2"), friend("f3")];
        let fan = fan_out("Ran 5km", &own_exported(), &friends).unwrap();

        assert_eq!(fan.payload_count(), friends.len() + 1);

        let mut ciphertexts: HashSet<String> = HashSet::new();
        ciphertexts.insert(fan.reference.clone());
        for copy in &fan.recipients {
            ciphertexts.insert(copy.as_ref().unwrap().ciphertext.clone());
        }
        assert_eq!(ciphertexts.len(), friends.len() + 1);

        assert_eq!(decrypt(device_key().private_key(), &fan.reference).unwrap(), "Ran 5km");
        let first = fan.recipients[0].as_ref().unwrap();
        assert_eq!(first.recipient_fs_user_id, "f1");
        assert_eq!(decrypt(friend_key().private_key(), &first.ciphertext).unwrap(), "Ran 5km");
    }

    #[test]
    fn test_fan_out_skips_malformed_key() {
        let friends = vec![friend("f1"), RecipientKey::new("broken", "not-a-key"), friend("f3")];
        let fan = fan_out("Swim", &own_exported(), &friends).unwrap();

        assert_eq!(fan.payload_count(), 3);
        let failure = fan.recipients[1].as_ref().unwrap_err();
        assert_eq!(failure.fs_user_id, "broken");
        assert!(matches!(failure.error, ClientError::Crypto(CryptoError::MalformedKey(_))));
        assert!(fan.recipients[2].is_ok());
    }

    #[test]
    fn test_fan_out_without_own_key_fails() {
        assert!(fan_out("Walk", "garbage", &[friend("f1")]).is_err());
    }

    #[test]
    fn test_decrypt_feed_keeps_corrupt_item() {
        let key = device_key();
        let items = vec![
            feed_item("1", "u2", &encrypt(key.public_key(), "first").unwrap()),
            feed_item("2", "u2", "corrupted!!"),
            feed_item("3", "u2", &encrypt(key.public_key(), "third").unwrap()),
        ];

        let out = decrypt_feed(items, Some(key.private_key()));
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].data, "first");
        assert_eq!(out[1].data, "corrupted!!");
        assert_eq!(out[2].data, "third");
        assert_eq!(out.iter().map(|i| i.id.as_str()).collect::<Vec<_>>(), ["1", "2", "3"]);
    }

    #[test]
    fn test_decrypt_feed_without_key_is_identity() {
        let items = vec![feed_item("1", "u2", "abc"), feed_item("2", "u3", "def")];
        assert_eq!(decrypt_feed(items.clone(), None), items);
    }

    #[test]
    fn test_decrypt_feed_wrong_key_left_encrypted() {
        let ciphertext = encrypt(friend_key().public_key(), "not for you").unwrap();
        let out = decrypt_feed(vec![feed_item("1", "u2", &ciphertext)], Some(device_key().private_key()));
        assert_eq!(out[0].data, ciphertext);
    }

    fn service() -> (Arc<MockBackend>, FeedService<MockBackend>) {
        let backend = Arc::new(MockBackend::default());
        *backend.own_key.lock() = Some(own_exported());
        let service = FeedService::new(backend.clone(), LocalStores::in_memory());
        (backend, service)
    }

    #[tokio::test]
    async fn test_publish_to_all_friends() {
        let (backend, service) = service();
        *backend.friends.lock() = vec![friend("f1"), friend("f2")];

        let report = service.publish("Cycled to work").await.unwrap();
        assert!(report.is_complete());
        assert_eq!(report.reference_news_id, "ref-1");
        assert_eq!(report.delivered.len(), 2);

        let submissions = backend.submissions.lock().clone();
        assert_eq!(submissions.len(), 2);
        for submission in &submissions {
            assert_eq!(submission.reference_news_id, "ref-1");
            assert_eq!(
                submission.receiver_device_id.as_deref(),
                Some(format!("dev-{}", submission.receiver_fs_user_id).as_str())
            );
            assert_eq!(decrypt(friend_key().private_key(), &submission.data).unwrap(), "Cycled to work");
        }
        assert_eq!(backend.references.lock()[0], report.reference);
    }

    #[tokio::test]
    async fn test_publish_reports_individual_failures() {
        let (backend, service) = service();
        *backend.friends.lock() = vec![
            friend("f1"),
            RecipientKey::new("broken", "AAAA"),
            friend("down"),
            friend("f4"),
        ];
        backend.failing_receivers.lock().insert("down".to_string());

        let report = service.publish("Tennis doubles").await.unwrap();
        assert!(!report.is_complete());
        assert_eq!(report.delivered.len(), 2);

        let mut failed: Vec<_> = report.failures.iter().map(|f| f.fs_user_id.as_str()).collect();
        failed.sort();
        assert_eq!(failed, ["broken", "down"]);
        assert_eq!(backend.submissions.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_publish_aborts_when_reference_fails() {
        let (backend, service) = service();
        *backend.friends.lock() = vec![friend("f1")];
        backend.fail_reference.store(true, std::sync::atomic::Ordering::SeqCst);

        assert!(matches!(service.publish("Walk").await, Err(ClientError::Api { status: 500, .. })));
        assert!(backend.submissions.lock().is_empty());
    }

    #[tokio::test]
    async fn test_publish_oversized_post() {
        let (backend, service) = service();
        let long = "x".repeat(1000);

        assert!(matches!(
            service.publish(&long).await,
            Err(ClientError::Crypto(CryptoError::DataTooLarge { .. }))
        ));
        assert!(backend.references.lock().is_empty());
    }

    #[tokio::test]
    async fn test_received_uses_stored_key() {
        let (backend, service) = service();
        service.stores.private_keys.put("u1", device_key().private_key()).await.unwrap();
        *backend.received.lock() = vec![feed_item("1", "u2", &encrypt(device_key().public_key(), "hello").unwrap())];

        let items = service.received("u1", None).await.unwrap();
        assert_eq!(items[0].data, "hello");
    }

    #[tokio::test]
    async fn test_received_without_key_is_degraded() {
        let (backend, service) = service();
        let ciphertext = encrypt(device_key().public_key(), "hello").unwrap();
        *backend.received.lock() = vec![feed_item("1", "u2", &ciphertext)];

        let items = service.received("u1", None).await.unwrap();
        assert_eq!(items[0].data, ciphertext);
    }

    #[tokio::test]
    async fn test_published_with_session_key_and_no_storage() {
        let backend = Arc::new(MockBackend::default());
        *backend.published.lock() = vec![feed_item("1", "u1", &encrypt(device_key().public_key(), "mine").unwrap())];
        let service = FeedService::new(
            backend,
            LocalStores::with_backend(Arc::new(UnavailableStore), true),
        );

        let items = service.published("u1", Some(device_key().private_key())).await.unwrap();
        assert_eq!(items[0].data, "mine");

        let items = service.published("u1", None).await.unwrap();
        assert_ne!(items[0].data, "mine");
    }
}
