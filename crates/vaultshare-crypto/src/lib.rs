use chacha20poly1305::{aead::Aead, KeyInit};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand_core::RngCore;
use thiserror::Error;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

pub use x25519_dalek::PublicKey as EncryptionPublicKey;

pub struct Nonce(pub [u8; 24]);
pub struct Ciphertext(pub Vec<u8>);

// ──────────────────────────────────────────────────────────────────────────────
// X25519 keypairs (encryption)
// ──────────────────────────────────────────────────────────────────────────────

/// Encryption keypair (X25519)
pub struct Keypair {
    secret: StaticSecret,
    public: PublicKey,
}

impl Keypair {
    /// Generate a new random X25519 keypair
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(rand_core::OsRng);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Construct keypair from secret key bytes (e.g., from config file)
    pub fn from_secret_bytes(bytes: &[u8; 32]) -> Self {
        let secret = StaticSecret::from(*bytes);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Get the secret key as bytes (for storage)
    pub fn secret_key_bytes(&self) -> [u8; 32] {
        self.secret.to_bytes()
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    pub fn public_key_bytes(&self) -> [u8; 32] {
        *self.public.as_bytes()
    }

    /// Derive shared secret with another party's public key (ECDH)
    pub fn shared_secret(&self, their_public: &PublicKey) -> SharedSecret {
        let secret_bytes = self.secret.diffie_hellman(their_public);
        SharedSecret(Zeroizing::new(*secret_bytes.as_bytes()))
    }
}

impl zeroize::ZeroizeOnDrop for Keypair {}

/// Shared secret derived from ECDH
#[derive(zeroize::Zeroize, zeroize::ZeroizeOnDrop)]
pub struct SharedSecret(Zeroizing<[u8; 32]>);

impl SharedSecret {
    fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Ed25519 keypairs (signing)
// ──────────────────────────────────────────────────────────────────────────────

/// Signing keypair (Ed25519)
pub struct SigningKeypair {
    signing_key: SigningKey,
}

impl SigningKeypair {
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut rand_core::OsRng),
        }
    }

    pub fn from_secret_bytes(bytes: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(bytes),
        }
    }

    pub fn secret_key_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl zeroize::ZeroizeOnDrop for SigningKeypair {}

/// Verify an Ed25519 signature against a raw public key.
pub fn verify_signature(public_key: &[u8; 32], message: &[u8], signature: &[u8; 64]) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(public_key) else {
        return false;
    };
    verifying_key
        .verify(message, &Signature::from_bytes(signature))
        .is_ok()
}

/// The full identity key material of one user: an encryption pair and a signing pair.
pub struct KeyPairs {
    pub encryption: Keypair,
    pub signing: SigningKeypair,
}

impl KeyPairs {
    pub fn generate() -> Self {
        Self {
            encryption: Keypair::generate(),
            signing: SigningKeypair::generate(),
        }
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Key wrapping
// ──────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum WrapError {
    #[error("AEAD encryption failed")]
    AeadFailed(chacha20poly1305::aead::Error),
}

/// Wrap a payload using a shared secret
pub fn wrap_key(
    key: &[u8],
    shared_secret: &SharedSecret,
    aad: &[u8],
) -> Result<(Nonce, Ciphertext), WrapError> {
    let cipher_key = chacha20poly1305::Key::from(*shared_secret.as_bytes());
    let cipher = chacha20poly1305::XChaCha20Poly1305::new(&cipher_key);

    let mut nonce_bytes = [0u8; 24];
    rand_core::OsRng.fill_bytes(&mut nonce_bytes);

    let nonce = chacha20poly1305::XNonce::from(nonce_bytes);
    let ct = cipher
        .encrypt(&nonce, chacha20poly1305::aead::Payload { msg: key, aad })
        .map_err(WrapError::AeadFailed)?;

    Ok((Nonce(nonce_bytes), Ciphertext(ct)))
}

#[derive(Debug, Error)]
pub enum UnwrapError {
    #[error("AEAD decryption failed")]
    AeadFailed(chacha20poly1305::aead::Error),
}

/// Unwrap a payload using a shared secret
pub fn unwrap_key(
    wrapped: &[u8],
    nonce: &Nonce,
    shared_secret: &SharedSecret,
    aad: &[u8],
) -> Result<Zeroizing<Vec<u8>>, UnwrapError> {
    let cipher_key = chacha20poly1305::Key::from(*shared_secret.as_bytes());
    let cipher = chacha20poly1305::XChaCha20Poly1305::new(&cipher_key);

    let nonce = chacha20poly1305::XNonce::from(nonce.0);

    let pt = cipher
        .decrypt(
            &nonce,
            chacha20poly1305::aead::Payload { msg: wrapped, aad },
        )
        .map_err(UnwrapError::AeadFailed)?;

    Ok(Zeroizing::new(pt))
}

// ──────────────────────────────────────────────────────────────────────────────
// Sealed asymmetric messages
// ──────────────────────────────────────────────────────────────────────────────

/// Version prefix of the sealed message wire string.
pub const SEALED_PREFIX: &str = "vs1_asym";

#[derive(Debug, Error)]
pub enum SealError {
    #[error("failed to encrypt message: {0}")]
    Encrypt(#[from] WrapError),
}

#[derive(Debug, Error)]
pub enum OpenError {
    #[error("malformed sealed message: {0}")]
    Malformed(&'static str),
    #[error("sender signature does not verify")]
    BadSignature,
    #[error("failed to decrypt message: {0}")]
    Decrypt(#[from] UnwrapError),
}

/// A successfully opened message together with the sender keys it was bound to.
pub struct OpenedMessage {
    pub plaintext: Zeroizing<Vec<u8>>,
    pub sender_encryption_key: [u8; 32],
    pub sender_signing_key: [u8; 32],
}

struct SealedParts {
    nonce: [u8; 24],
    ciphertext: Vec<u8>,
    sender_encryption_key: [u8; 32],
    sender_signing_key: [u8; 32],
    signature: [u8; 64],
}

impl SealedParts {
    fn parse(encoded: &str) -> Result<Self, OpenError> {
        let parts: Vec<&str> = encoded.split(':').collect();
        if parts.len() != 6 {
            return Err(OpenError::Malformed("unexpected number of components"));
        }
        if parts[0] != SEALED_PREFIX {
            return Err(OpenError::Malformed("unsupported version"));
        }

        let ciphertext =
            hex::decode(parts[2]).map_err(|_| OpenError::Malformed("invalid ciphertext hex"))?;
        if ciphertext.is_empty() {
            return Err(OpenError::Malformed("empty ciphertext"));
        }

        Ok(Self {
            nonce: decode_fixed(parts[1], "invalid nonce")?,
            ciphertext,
            sender_encryption_key: decode_fixed(parts[3], "invalid sender encryption key")?,
            sender_signing_key: decode_fixed(parts[4], "invalid sender signing key")?,
            signature: decode_fixed(parts[5], "invalid signature")?,
        })
    }
}

fn decode_fixed<const N: usize>(part: &str, what: &'static str) -> Result<[u8; N], OpenError> {
    let bytes = hex::decode(part).map_err(|_| OpenError::Malformed(what))?;
    bytes.try_into().map_err(|_| OpenError::Malformed(what))
}

fn sealed_aad(sender_encryption_key: &[u8; 32], sender_signing_key: &[u8; 32]) -> Vec<u8> {
    let mut aad = Vec::with_capacity(SEALED_PREFIX.len() + 64);
    aad.extend_from_slice(SEALED_PREFIX.as_bytes());
    aad.extend_from_slice(sender_encryption_key);
    aad.extend_from_slice(sender_signing_key);
    aad
}

fn signed_bytes(nonce: &[u8; 24], ciphertext: &[u8], aad: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(24 + ciphertext.len() + aad.len());
    message.extend_from_slice(nonce);
    message.extend_from_slice(ciphertext);
    message.extend_from_slice(aad);
    message
}

/// Encrypt `plaintext` for `recipient` and sign it with the sender's signing key.
///
/// The sender's public keys travel inside the sealed string and are bound to the
/// ciphertext through the AAD and the signature, so a recipient can open the
/// message without knowing the sender and later check who sent it.
pub fn seal(
    plaintext: &[u8],
    sender: &KeyPairs,
    recipient: &PublicKey,
) -> Result<String, SealError> {
    let sender_encryption_key = sender.encryption.public_key_bytes();
    let sender_signing_key = sender.signing.public_key_bytes();
    let aad = sealed_aad(&sender_encryption_key, &sender_signing_key);

    let shared = sender.encryption.shared_secret(recipient);
    let (nonce, ciphertext) = wrap_key(plaintext, &shared, &aad)?;
    let signature = sender
        .signing
        .sign(&signed_bytes(&nonce.0, &ciphertext.0, &aad));

    Ok(format!(
        "{}:{}:{}:{}:{}:{}",
        SEALED_PREFIX,
        hex::encode(nonce.0),
        hex::encode(&ciphertext.0),
        hex::encode(sender_encryption_key),
        hex::encode(sender_signing_key),
        hex::encode(signature)
    ))
}

/// Open a sealed message with the recipient's encryption keypair.
///
/// Checks the signature against the embedded signing key, then decrypts. Whether
/// the embedded sender keys belong to anyone the caller trusts is left to the caller.
pub fn open(encoded: &str, recipient: &Keypair) -> Result<OpenedMessage, OpenError> {
    let parts = SealedParts::parse(encoded)?;
    let aad = sealed_aad(&parts.sender_encryption_key, &parts.sender_signing_key);

    if !verify_signature(
        &parts.sender_signing_key,
        &signed_bytes(&parts.nonce, &parts.ciphertext, &aad),
        &parts.signature,
    ) {
        return Err(OpenError::BadSignature);
    }

    let sender_public = PublicKey::from(parts.sender_encryption_key);
    let shared = recipient.shared_secret(&sender_public);
    let plaintext = unwrap_key(&parts.ciphertext, &Nonce(parts.nonce), &shared, &aad)?;

    Ok(OpenedMessage {
        plaintext,
        sender_encryption_key: parts.sender_encryption_key,
        sender_signing_key: parts.sender_signing_key,
    })
}
