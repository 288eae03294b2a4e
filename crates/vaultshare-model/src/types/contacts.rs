//! Trusted contact types.

use serde::{Deserialize, Serialize};

use super::UserId;

/// Public keys of a user, hex-encoded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeySet {
    pub encryption: String, // X25519
    pub signing: String,    // Ed25519
}

impl PublicKeySet {
    pub fn from_bytes(encryption: &[u8; 32], signing: &[u8; 32]) -> Self {
        Self {
            encryption: hex::encode(encryption),
            signing: hex::encode(signing),
        }
    }

    /// Whether these keys are exactly the given raw key pair.
    pub fn matches(&self, encryption: &[u8; 32], signing: &[u8; 32]) -> bool {
        self.encryption.eq_ignore_ascii_case(&hex::encode(encryption))
            && self.signing.eq_ignore_ascii_case(&hex::encode(signing))
    }

    /// Decode the X25519 public key.
    pub fn encryption_key_bytes(&self) -> Result<[u8; 32], String> {
        let bytes = hex::decode(&self.encryption)
            .map_err(|e| format!("Invalid encryption key hex: {}", e))?;
        bytes
            .try_into()
            .map_err(|_| "Encryption key must be exactly 32 bytes".to_string())
    }
}

/// A contact whose public keys the local user has verified.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedContact {
    pub contact_id: UserId,
    pub name: String,
    pub public_keys: PublicKeySet,
}

/// Where a change to the contact set originated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeSource {
    /// Made on this device (e.g. the user trusted a new contact).
    LocalChanged,
    /// Pulled in by synchronization.
    RemoteRetrieved,
}
