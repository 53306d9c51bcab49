//! Field-level encryption for secrets at rest
//!
//! AES-256-GCM with a random 96-bit nonce per value. Ciphertexts are stored
//! as `hex(nonce || ciphertext || tag)`.

use anyhow::{Context, Result};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};
use ring::rand::{SecureRandom, SystemRandom};

use crate::keychain::MasterKeyProvider;

/// Master key length in bytes
pub const KEY_SIZE: usize = 32;

const NONCE_SIZE: usize = 12;

/// Encrypts client secrets, tokens and PATs before they are written.
pub struct FieldEncryptor {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl FieldEncryptor {
    pub fn new(master_key: &[u8; KEY_SIZE]) -> Result<Self> {
        let unbound_key = UnboundKey::new(&AES_256_GCM, master_key)
            .map_err(|_| anyhow::anyhow!("Failed to create encryption key"))?;
        Ok(Self {
            key: LessSafeKey::new(unbound_key),
            rng: SystemRandom::new(),
        })
    }

    /// Encryptor keyed by the provider's master key, creating it on first use.
    pub fn from_key_provider(provider: &dyn MasterKeyProvider) -> Result<Self> {
        let key = provider.get_or_create_key()?;
        Self::new(&key)
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| anyhow::anyhow!("Failed to generate nonce"))?;

        let mut in_out = plaintext.as_bytes().to_vec();
        self.key
            .seal_in_place_append_tag(Nonce::assume_unique_for_key(nonce_bytes), Aad::empty(), &mut in_out)
            .map_err(|_| anyhow::anyhow!("Encryption failed"))?;

        let mut stored = Vec::with_capacity(NONCE_SIZE + in_out.len());
        stored.extend_from_slice(&nonce_bytes);
        stored.extend_from_slice(&in_out);
        Ok(hex::encode(stored))
    }

    pub fn decrypt(&self, stored: &str) -> Result<String> {
        let bytes = hex::decode(stored).context("Invalid hex encoding")?;
        if bytes.len() < NONCE_SIZE + AES_256_GCM.tag_len() {
            anyhow::bail!("Ciphertext too short");
        }

        let (nonce_bytes, sealed) = bytes.split_at(NONCE_SIZE);
        let nonce: [u8; NONCE_SIZE] = nonce_bytes
            .try_into()
            .map_err(|_| anyhow::anyhow!("Invalid nonce"))?;

        let mut in_out = sealed.to_vec();
        let plaintext = self
            .key
            .open_in_place(Nonce::assume_unique_for_key(nonce), Aad::empty(), &mut in_out)
            .map_err(|_| anyhow::anyhow!("Decryption failed - wrong key or corrupted data"))?;

        String::from_utf8(plaintext.to_vec()).context("Decrypted data is not valid UTF-8")
    }

    /// `None` stays `None`; empty strings are not encrypted.
    pub fn encrypt_optional(&self, plaintext: Option<&str>) -> Result<Option<String>> {
        plaintext
            .filter(|p| !p.is_empty())
            .map(|p| self.encrypt(p))
            .transpose()
    }

    pub fn decrypt_optional(&self, stored: Option<&str>) -> Result<Option<String>> {
        stored
            .filter(|s| !s.is_empty())
            .map(|s| self.decrypt(s))
            .transpose()
    }
}

/// Random master key from the system CSPRNG.
pub fn generate_master_key() -> Result<[u8; KEY_SIZE]> {
    let mut key = [0u8; KEY_SIZE];
    SystemRandom::new()
        .fill(&mut key)
        .map_err(|_| anyhow::anyhow!("Failed to generate random key"))?;
    Ok(key)
}
