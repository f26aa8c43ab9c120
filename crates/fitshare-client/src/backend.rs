//! Backend seams used by provisioning and the feed
//!
//! [`FitShareClient`](crate::FitShareClient) implements both traits over HTTP.
//! Tests substitute in-process fakes.

use crate::{
    types::{NewsSubmission, ReceivedFeedItem, RecipientKey, RegisterKeyRequest},
    Result,
};
use async_trait::async_trait;

/// Public key registry
#[async_trait]
pub trait KeyDirectory: Send + Sync {
    /// Register this device's public key; any refusal is `RegistrationRejected`
    async fn register_public_key(&self, request: &RegisterKeyRequest) -> Result<()>;

    /// The exported public key registered for the calling user
    async fn my_public_key(&self) -> Result<String>;

    /// Exported public keys of the calling user's friends
    async fn friend_keys(&self) -> Result<Vec<RecipientKey>>;
}

/// News storage and retrieval
#[async_trait]
pub trait FeedBackend: KeyDirectory {
    /// Store the author's own copy, returning its id
    async fn submit_reference(&self, data: &str) -> Result<String>;

    /// Store one recipient's copy
    async fn submit_news(&self, submission: &NewsSubmission) -> Result<()>;

    /// Items addressed to the calling user
    async fn received_news(&self) -> Result<Vec<ReceivedFeedItem>>;

    /// Reference copies authored by the calling user
    async fn published_news(&self) -> Result<Vec<ReceivedFeedItem>>;
}
