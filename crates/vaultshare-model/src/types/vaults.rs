//! Shared vault types.

use serde::{Deserialize, Serialize};

use super::{Permission, UserId, VaultId};

/// Local listing of a shared vault the user belongs to
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultListing {
    pub id: VaultId,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: UserId,
}

/// Membership record of one user in a shared vault, as reported by the server
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultMember {
    pub vault_id: VaultId,
    pub user_id: UserId,
    pub permission: Permission,
}
