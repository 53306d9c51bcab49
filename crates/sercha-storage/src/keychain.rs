//! Master key storage
//!
//! The key that encrypts secrets at rest lives in the platform keychain:
//! Credential Manager on Windows, Keychain on macOS, Secret Service on Linux.

use anyhow::{Context, Result};
use keyring::Entry;
use parking_lot::Mutex;
use sercha_core::branding;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::crypto::{generate_master_key, KEY_SIZE};

const MASTER_KEY_NAME: &str = "master-encryption-key";

/// Source of the master encryption key.
pub trait MasterKeyProvider: Send + Sync {
    /// Get the key, generating and storing one on first use.
    fn get_or_create_key(&self) -> Result<Zeroizing<[u8; KEY_SIZE]>>;

    fn key_exists(&self) -> bool;

    fn delete_key(&self) -> Result<()>;
}

/// Master key in the OS keychain, hex-encoded.
pub struct KeychainKeyProvider {
    entry: Entry,
}

impl KeychainKeyProvider {
    pub fn new() -> Result<Self> {
        Self::with_names(branding::KEYCHAIN_SERVICE, MASTER_KEY_NAME)
    }

    /// Custom service and entry names (separate profiles, tests).
    pub fn with_names(service: &str, key_name: &str) -> Result<Self> {
        let entry = Entry::new(service, key_name).context("Failed to create keychain entry")?;
        Ok(Self { entry })
    }
}

impl MasterKeyProvider for KeychainKeyProvider {
    fn get_or_create_key(&self) -> Result<Zeroizing<[u8; KEY_SIZE]>> {
        match self.entry.get_password() {
            Ok(hex_key) => {
                debug!("[Keychain] Retrieved master key");
                let bytes = Zeroizing::new(hex::decode(&hex_key).context("Invalid key format in keychain")?);
                if bytes.len() != KEY_SIZE {
                    anyhow::bail!(
                        "Invalid key size in keychain: expected {}, got {}",
                        KEY_SIZE,
                        bytes.len()
                    );
                }
                let mut key = Zeroizing::new([0u8; KEY_SIZE]);
                key.copy_from_slice(&bytes);
                Ok(key)
            }
            Err(keyring::Error::NoEntry) => {
                info!("[Keychain] No master key found, generating one");
                let key = Zeroizing::new(generate_master_key()?);
                self.entry
                    .set_password(&hex::encode(*key))
                    .context("Failed to store master key in keychain")?;
                Ok(key)
            }
            Err(e) => {
                warn!("[Keychain] Keychain error: {:?}", e);
                Err(anyhow::anyhow!("Failed to access keychain: {}", e))
            }
        }
    }

    fn key_exists(&self) -> bool {
        self.entry.get_password().is_ok()
    }

    fn delete_key(&self) -> Result<()> {
        match self.entry.delete_credential() {
            Ok(()) => {
                info!("[Keychain] Master key deleted");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(anyhow::anyhow!("Failed to delete key from keychain: {}", e)),
        }
    }
}

/// Process-local key, for tests and keychain-less environments.
///
/// Data encrypted with it is unreadable once the process exits.
#[derive(Default)]
pub struct MemoryKeyProvider {
    key: Mutex<Option<[u8; KEY_SIZE]>>,
}

impl MemoryKeyProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(key: [u8; KEY_SIZE]) -> Self {
        Self {
            key: Mutex::new(Some(key)),
        }
    }
}

impl MasterKeyProvider for MemoryKeyProvider {
    fn get_or_create_key(&self) -> Result<Zeroizing<[u8; KEY_SIZE]>> {
        let mut guard = self.key.lock();
        let key = match *guard {
            Some(key) => key,
            None => {
                let key = generate_master_key()?;
                *guard = Some(key);
                key
            }
        };
        Ok(Zeroizing::new(key))
    }

    fn key_exists(&self) -> bool {
        self.key.lock().is_some()
    }

    fn delete_key(&self) -> Result<()> {
        *self.key.lock() = None;
        Ok(())
    }
}
