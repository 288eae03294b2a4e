use vaultshare_crypto::KeyPairs;
use vaultshare_model::{ContactDirectory, UserId};

use crate::cache::InviteCache;
use crate::resolver::{resolve_batch, BatchOutcome};

/// Re-runs cached invites through the resolver after the trusted contact set
/// changes. Works from the sealed server records only, so a promotion is
/// always backed by a fresh signature check.
pub struct TrustReprocessor<'a> {
    contacts: &'a dyn ContactDirectory,
    own_user_id: &'a UserId,
}

impl<'a> TrustReprocessor<'a> {
    pub fn new(contacts: &'a dyn ContactDirectory, own_user_id: &'a UserId) -> Self {
        Self {
            contacts,
            own_user_id,
        }
    }

    pub fn reprocess(&self, cache: &mut InviteCache, keys: &KeyPairs) -> BatchOutcome {
        let raw = cache.raw_invites();
        resolve_batch(cache, &raw, keys, self.own_user_id, self.contacts)
    }
}
