//! Collaborator traits consumed by the invite pipeline.

use vaultshare_crypto::KeyPairs;

use crate::types::*;
use crate::{DirectoryError, KeyError, SyncError, TransportError};

/// Remote invite endpoints.
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait::async_trait]
pub trait InvitesServer: Send + Sync {
    /// All pending invites addressed to the local user.
    async fn inbound_invites(&self) -> Result<Vec<ServerInvite>, TransportError>;

    /// All pending invites the local user has sent.
    async fn outbound_invites(&self) -> Result<Vec<ServerInvite>, TransportError>;

    /// Create an invite for a recipient.
    async fn create_invite(
        &self,
        params: &CreateInviteParams,
    ) -> Result<ServerInvite, TransportError>;

    /// Delete (decline or revoke) an invite.
    async fn delete_invite(
        &self,
        vault_id: &VaultId,
        invite_id: &InviteId,
    ) -> Result<(), TransportError>;
}

/// Source of the local user's key material.
///
/// Implementations must return the *current* keys on every call; callers never
/// hold on to them across batches.
#[cfg_attr(feature = "test-support", mockall::automock)]
pub trait KeySource: Send + Sync {
    fn current_key_pairs(&self) -> Result<KeyPairs, KeyError>;

    /// Root key (hex) of a vault the local user belongs to.
    fn vault_root_key(&self, vault_id: &VaultId) -> Result<String, KeyError>;
}

/// Local directory of trusted contacts.
#[cfg_attr(feature = "test-support", mockall::automock)]
pub trait ContactDirectory: Send + Sync {
    fn find_contact(&self, user_id: &UserId) -> Result<TrustedContact, DirectoryError>;

    fn all_contacts(&self) -> Result<Vec<TrustedContact>, DirectoryError>;
}

/// Vault listings (local) and vault membership (remote).
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait::async_trait]
pub trait VaultDirectory: Send + Sync {
    /// Members of a vault. With `read_from_cache = false` the server is always asked.
    async fn vault_members(
        &self,
        vault_id: &VaultId,
        read_from_cache: bool,
    ) -> Result<Vec<VaultMember>, TransportError>;

    fn find_vault(&self, vault_id: &VaultId) -> Result<VaultListing, DirectoryError>;
}

/// Synchronization engine.
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait::async_trait]
pub trait SyncEngine: Send + Sync {
    /// General incremental sync.
    async fn sync(&self) -> Result<(), SyncError>;

    /// Download the full content of the given vaults, ignoring sync tokens.
    async fn sync_vaults_from_scratch(&self, vault_ids: &[VaultId]) -> Result<(), SyncError>;

    /// Retry decryption of items that previously failed to decrypt.
    async fn decrypt_errored_payloads(&self) -> Result<(), SyncError>;
}

/// Remote workflow that turns an accepted invite into vault membership
/// (stores the vault listing and root key, then confirms with the server).
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait::async_trait]
pub trait AcceptInviteWorkflow: Send + Sync {
    async fn accept(
        &self,
        invite: &ServerInvite,
        message: &VaultInviteMessage,
    ) -> Result<(), TransportError>;
}
