//! Login-time device provisioning
//!
//! On every successful login the device either reuses its stored identity or
//! provisions a new one:
//!
//! ```text
//! NoDeviceRecord --(identity found)------------------------> Provisioned
//! NoDeviceRecord --> Provisioning --(registration accepted)--> Provisioned
//!                         |
//!                         +--(registration rejected)--> NoDeviceRecord
//! ```
//!
//! Registration and local persistence are two separate steps. A crash between
//! them leaves a registered public key with no local private key; the next
//! login sees no identity and provisions again.

use crate::{
    backend::KeyDirectory,
    session::SessionStorage,
    store::LocalStores,
    types::{DeviceIdentity, RegisterKeyRequest},
    ClientError, Result,
};
use fitshare_crypto::{export_public_key, KeyPair, PrivateKey};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Provisioning state of this device
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProvisioningState {
    NoDeviceRecord,
    Provisioning,
    Provisioned,
}

/// How the identity of a provisioned device was obtained
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProvisioningOrigin {
    /// Loaded from local storage
    Reused,
    /// Generated and registered during this login
    Generated,
}

/// Outcome of a successful provisioning
#[derive(Debug)]
pub struct ProvisionedDevice {
    pub identity: DeviceIdentity,
    pub origin: ProvisioningOrigin,
    /// Whether the key material will survive this process
    pub durable: bool,
    /// Private key held only in memory when it could not be persisted
    pub session_key: Option<PrivateKey>,
}

/// Drives the provisioning state machine
pub struct Provisioner<K: KeyDirectory + ?Sized> {
    directory: Arc<K>,
    stores: LocalStores,
    session: SessionStorage,
    key_bits: usize,
    state: Mutex<ProvisioningState>,
}

impl<K: KeyDirectory + ?Sized> Provisioner<K> {
    pub fn new(
        directory: Arc<K>,
        stores: LocalStores,
        session: SessionStorage,
        key_bits: usize,
    ) -> Self {
        Self {
            directory,
            stores,
            session,
            key_bits,
            state: Mutex::new(ProvisioningState::NoDeviceRecord),
        }
    }

    /// Current state
    pub fn state(&self) -> ProvisioningState {
        *self.state.lock()
    }

    fn set_state(&self, state: ProvisioningState) {
        *self.state.lock() = state;
    }

    /// Provision this device for `fs_user_id`
    #[instrument(skip(self))]
    pub async fn provision(&self, fs_user_id: &str) -> Result<ProvisionedDevice> {
        self.session.set_fs_user_id(fs_user_id);

        if let Some(identity) = self.lookup(fs_user_id).await {
            info!(device_id = %identity.device_id, "reusing stored device identity");
            self.session.set_device_id(&identity.device_id);
            self.set_state(ProvisioningState::Provisioned);
            return Ok(ProvisionedDevice {
                identity,
                origin: ProvisioningOrigin::Reused,
                durable: self.stores.is_durable(),
                session_key: None,
            });
        }

        self.set_state(ProvisioningState::Provisioning);
        match self.generate_and_register(fs_user_id).await {
            Ok(device) => {
                self.session.set_device_id(&device.identity.device_id);
                self.set_state(ProvisioningState::Provisioned);
                Ok(device)
            }
            Err(e) => {
                self.set_state(ProvisioningState::NoDeviceRecord);
                Err(e)
            }
        }
    }

    /// Stored identity, if both the device id and its private key are present
    async fn lookup(&self, fs_user_id: &str) -> Option<DeviceIdentity> {
        let identity = match self.stores.devices.get(fs_user_id).await {
            Ok(identity) => identity?,
            Err(e) => {
                warn!(error = %e, "device identity lookup failed, provisioning anew");
                return None;
            }
        };

        match self.stores.private_keys.get(fs_user_id).await {
            Ok(Some(_)) => Some(identity),
            Ok(None) => {
                warn!(device_id = %identity.device_id, "device identity has no private key, provisioning anew");
                None
            }
            Err(e) => {
                warn!(error = %e, "private key lookup failed, provisioning anew");
                None
            }
        }
    }

    async fn generate_and_register(&self, fs_user_id: &str) -> Result<ProvisionedDevice> {
        let keypair = KeyPair::generate_with_bits(self.key_bits)?;
        let device_id = Uuid::new_v4().to_string();

        let request = RegisterKeyRequest {
            public_key: export_public_key(keypair.public_key()),
            device_id: device_id.clone(),
        };
        self.directory.register_public_key(&request).await?;
        info!(%device_id, "registered device public key");

        let private_key = keypair.into_private_key();
        let durable = match self.persist(fs_user_id, &device_id, &private_key).await {
            Ok(()) => self.stores.is_durable(),
            Err(e) => {
                warn!(error = %e, "could not persist device keys, continuing for this session only");
                false
            }
        };

        Ok(ProvisionedDevice {
            identity: DeviceIdentity {
                fs_user_id: fs_user_id.to_string(),
                device_id,
            },
            origin: ProvisioningOrigin::Generated,
            durable,
            session_key: (!durable).then_some(private_key),
        })
    }

    /// The private key goes first so a stored device id always has its key
    async fn persist(&self, fs_user_id: &str, device_id: &str, key: &PrivateKey) -> Result<()> {
        self.stores.private_keys.put(fs_user_id, key).await?;
        self.stores.devices.put(fs_user_id, device_id).await
    }
}

impl ProvisionedDevice {
    /// Whether the user should be told keys were not saved
    pub fn needs_warning(&self) -> Option<ClientError> {
        (!self.durable && self.origin == ProvisioningOrigin::Generated).then(|| {
            ClientError::StorageUnavailable("device keys held in memory only".to_string())
        })
    }
}
