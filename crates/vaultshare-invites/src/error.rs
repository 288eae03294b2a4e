use thiserror::Error;
use vaultshare_crypto::SealError;
use vaultshare_model::{KeyError, TransportError};

/// Errors surfaced by `VaultInviteService`. Every variant renders as a
/// message fit for display; none of them indicate a broken process.
#[derive(Debug, Error)]
pub enum InviteError {
    #[error("Failed to get inbound user invites: {0}")]
    InboundFetch(#[source] TransportError),
    #[error("Failed to get outbound user invites: {0}")]
    OutboundFetch(#[source] TransportError),
    #[error("Failed to delete invite: {0}")]
    Delete(#[source] TransportError),
    #[error("Cannot accept untrusted invite")]
    UntrustedInvite,
    #[error("Failed to accept invite: {0}")]
    Accept(#[source] TransportError),
    #[error("Failed to get vault members: {0}")]
    VaultMembers(#[source] TransportError),
    #[error("Failed to send invite: {0}")]
    Send(#[source] TransportError),
    #[error("Invalid recipient keys: {0}")]
    InvalidRecipientKeys(String),
    #[error(transparent)]
    Keys(#[from] KeyError),
    #[error("Failed to seal invite message: {0}")]
    Seal(#[from] SealError),
    #[error("Failed to encode invite message: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Invite service has been disposed")]
    Disposed,
}
