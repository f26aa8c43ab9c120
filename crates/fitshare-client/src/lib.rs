//! # FitShare Client SDK
//!
//! Device-side core of FitShare's end-to-end encrypted news feed.
//!
//! ## Features
//!
//! - **Provisioning**: one RSA key pair and device id per (user, device), registered at first login
//! - **Local key storage**: private keys never leave the device
//! - **Fan-out**: every post is encrypted separately for the author and for each friend
//! - **Degraded reading**: items that cannot be decrypted are shown as received
//!
//! ## Example
//!
//! ```rust,ignore
//! use fitshare_client::{Config, FeedService, FitShareClient, LocalStores, Provisioner};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::new("https://api.fitshare.app")
//!         .with_token("your-jwt-token")
//!         .with_data_dir("/var/lib/fitshare");
//!
//!     let client = Arc::new(FitShareClient::new(config.clone())?);
//!     let stores = LocalStores::open_or_memory(&config).await;
//!
//!     // At login
//!     let provisioner = Provisioner::new(client.clone(), stores.clone(), client.session().clone(), config.key_bits);
//!     let device = provisioner.provision("user-1").await?;
//!
//!     // Post and read
//!     let feed = FeedService::new(client, stores);
//!     feed.publish(r#"{"category":"RUNNING","content":"5k","kcal":300,"time":28,"distance":5.0}"#).await?;
//!     let items = feed.received("user-1", device.session_key.as_ref()).await?;
//!
//!     Ok(())
//! }
//! ```

mod backend;
mod client;
mod config;
mod error;
mod feed;
mod news;
mod provisioning;
mod session;
mod store;
mod types;

#[cfg(test)]
mod test_support;

pub use backend::{FeedBackend, KeyDirectory};
pub use client::{FitShareClient, DEVICE_ID_HEADER, FS_USER_ID_HEADER};
pub use config::Config;
pub use error::{ClientError, Result};
pub use feed::{decrypt_feed, encrypt_for_recipient, fan_out, FanOut, FeedService, PublishReport, RecipientFailure};
pub use news::{parse_time_minutes, NewsContent, SportCategory};
pub use provisioning::{ProvisionedDevice, Provisioner, ProvisioningOrigin, ProvisioningState};
pub use session::{SessionStorage, DEVICE_ID_KEY, FS_USER_ID_KEY};
pub use store::{
    DeviceIdentityStore, FileKeyValueStore, KeyValueStore, LocalStores, MemoryKeyValueStore,
    PrivateKeyStore, StoreLocation, DEVICE_DATABASE, KEY_DATABASE,
};
pub use types::*;

// Re-export the key types callers hold on to
pub use fitshare_crypto::{CryptoError, KeyPair, PrivateKey, PublicKey};
