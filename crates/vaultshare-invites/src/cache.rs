use std::collections::HashMap;

use vaultshare_model::{InviteId, InviteRecord, ServerInvite};

/// Pending inbound invites keyed by invite id.
///
/// Plain storage; the service wraps it in a mutex and decides when entries
/// are replaced.
#[derive(Debug, Default)]
pub struct InviteCache {
    records: HashMap<InviteId, InviteRecord>,
}

impl InviteCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &InviteId) -> Option<&InviteRecord> {
        self.records.get(id)
    }

    /// Insert or replace the record for `id`.
    pub fn set(&mut self, id: InviteId, record: InviteRecord) {
        self.records.insert(id, record);
    }

    pub fn delete(&mut self, id: &InviteId) -> Option<InviteRecord> {
        self.records.remove(id)
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn values(&self) -> impl Iterator<Item = &InviteRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Server records behind the cached entries, still sealed.
    pub fn raw_invites(&self) -> Vec<ServerInvite> {
        self.records.values().map(|r| r.invite.clone()).collect()
    }
}
