//! Wire and domain types for the FitShare backend

use serde::{Deserialize, Serialize};

/// A device's key material and identity as known to this device
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceIdentity {
    /// User the device belongs to
    pub fs_user_id: String,
    /// UUID v4 minted at first login on this device
    pub device_id: String,
}

/// Body of `POST /keys`
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterKeyRequest {
    /// Base64 SubjectPublicKeyInfo of the device key
    pub public_key: String,
    /// Device identifier
    pub device_id: String,
}

/// Response of `GET /keys/my`
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MyPublicKey {
    pub public_key: String,
}

/// A friend's exported public key, from `GET /relationships/friends`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientKey {
    pub fs_user_id: String,
    /// Base64 SubjectPublicKeyInfo
    pub public_key: String,
    #[serde(default)]
    pub device_id: Option<String>,
}

impl RecipientKey {
    pub fn new(fs_user_id: impl Into<String>, public_key: impl Into<String>) -> Self {
        Self {
            fs_user_id: fs_user_id.into(),
            public_key: public_key.into(),
            device_id: None,
        }
    }

    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }
}

/// One recipient-specific ciphertext of a news item
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedPayload {
    pub recipient_fs_user_id: String,
    /// Base64 RSA-OAEP ciphertext
    pub ciphertext: String,
}

/// Body of `POST /news/reference`: the author's own copy
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReferenceNewsSubmission {
    pub data: String,
}

/// Response of `POST /news/reference`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReferenceNewsCreated {
    pub id: String,
}

/// Body of `POST /news`: one friend's copy
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsSubmission {
    pub reference_news_id: String,
    pub receiver_fs_user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver_device_id: Option<String>,
    pub data: String,
}

/// A news item as returned by the feed endpoints
///
/// `data` holds ciphertext until the feed is decrypted for display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedFeedItem {
    pub id: String,
    pub publisher_fs_user_id: String,
    #[serde(default)]
    pub publisher_username: Option<String>,
    #[serde(default)]
    pub receiver_fs_user_id: Option<String>,
    #[serde(default)]
    pub receiver_username: Option<String>,
    pub data: String,
    pub created_at: String,
}
