//! Invite types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{InviteId, Permission, UserId, VaultId, VaultInviteMessage};

/// Invite record as issued by the server. The message stays sealed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInvite {
    pub id: InviteId,
    pub vault_id: VaultId,
    pub sender_id: UserId,
    pub recipient_id: UserId,
    pub encrypted_message: String, // Sealed VaultInviteMessage
    pub permission: Permission,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Parameters for creating an invite
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateInviteParams {
    pub vault_id: VaultId,
    pub recipient_id: UserId,
    pub encrypted_message: String,
    pub permission: Permission,
}

/// A resolved inbound invite: the server record, its opened message, and
/// whether the sender was verified against a trusted contact at resolution time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InviteRecord {
    pub invite: ServerInvite,
    pub message: VaultInviteMessage,
    pub trusted: bool,
}
