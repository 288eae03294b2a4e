//! Payload carried inside a sealed vault invite.

use serde::{Deserialize, Serialize};

use super::{Permission, TrustedContact, UserId, VaultId};

/// Vault metadata shared with the invitee.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultMetadata {
    pub vault_id: VaultId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Decrypted vault invite message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultInviteMessage {
    pub recipient_id: UserId,
    pub vault: VaultMetadata,
    pub root_key: String, // Vault root key (hex)
    pub permission: Permission,
    #[serde(default)]
    pub vault_contacts: Vec<TrustedContact>, // Contacts of current vault members
}
