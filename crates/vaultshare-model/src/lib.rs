//! Domain model for the vaultshare invite pipeline.
//!
//! Holds the invite, contact and vault records plus the collaborator traits
//! (`InvitesServer`, `KeySource`, `ContactDirectory`, ...) that the pipeline
//! consumes. Transport, key storage and synchronization crates implement these
//! traits so `vaultshare-invites` doesn't depend on any of them directly.

use thiserror::Error;

pub mod collaborators;
pub mod types;

pub use collaborators::*;
pub use types::*;

/// Error returned by the remote invite/membership transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("not found")]
    NotFound,
    #[error("unauthorized")]
    Unauthorized,
    #[error("request failed: {0}")]
    Request(String),
}

/// Error returned by local contact and vault directories.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("not found")]
    NotFound,
    #[error("backend error: {0}")]
    Backend(String),
}

/// Error returned when key material cannot be produced.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("no identity key material available")]
    Unavailable,
    #[error("no root key for vault {0}")]
    MissingRootKey(VaultId),
    #[error("invalid key material: {0}")]
    Invalid(String),
}

/// Error returned by the synchronization engine.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("sync failed: {0}")]
    Backend(String),
}
