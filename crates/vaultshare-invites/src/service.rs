use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::Poll;
use tracing::{debug, info, warn};
use vaultshare_crypto::{seal, EncryptionPublicKey, KeyPairs};
use vaultshare_events::{Event, EventBus, EventBusError, Topic};
use vaultshare_model::{
    AcceptInviteWorkflow, ChangeSource, ContactDirectory, CreateInviteParams, InvitesServer,
    InviteRecord, KeySource, Permission, ServerInvite, SyncEngine, SyncError, TrustedContact, UserId,
    VaultDirectory, VaultInviteMessage, VaultListing, VaultMember, VaultMetadata,
};
use zeroize::Zeroizing;

use crate::cache::InviteCache;
use crate::error::InviteError;
use crate::reprocess::TrustReprocessor;
use crate::resolver::{resolve_batch, BatchOutcome};
use crate::subscriptions::{spawn_listener, Subscription};

/// Collaborators the invite service talks to.
#[derive(Clone)]
pub struct InviteServiceDeps {
    pub server: Arc<dyn InvitesServer>,
    pub keys: Arc<dyn KeySource>,
    pub contacts: Arc<dyn ContactDirectory>,
    pub vaults: Arc<dyn VaultDirectory>,
    pub sync: Arc<dyn SyncEngine>,
    pub accept_workflow: Arc<dyn AcceptInviteWorkflow>,
    pub events: Arc<dyn EventBus>,
}

/// Owns the pending inbound invite cache and every workflow around it:
/// download, trust classification, accept, decline and sending invites.
///
/// Call [`VaultInviteService::start`] to react to contact and sync events and
/// [`VaultInviteService::dispose`] to tear the listeners down again.
pub struct VaultInviteService {
    own_user_id: UserId,
    deps: InviteServiceDeps,
    // Never held across an await
    cache: Mutex<InviteCache>,
    unresolved: AtomicUsize,
    subscriptions: Mutex<Vec<Subscription>>,
    disposed: AtomicBool,
}

impl VaultInviteService {
    pub fn new(own_user_id: UserId, deps: InviteServiceDeps) -> Self {
        Self {
            own_user_id,
            deps,
            cache: Mutex::new(InviteCache::new()),
            unresolved: AtomicUsize::new(0),
            subscriptions: Mutex::new(Vec::new()),
            disposed: AtomicBool::new(false),
        }
    }

    /// Subscribe to trusted contact changes and sync-delivered invites.
    pub async fn start(self: &Arc<Self>) -> Result<(), EventBusError> {
        if self.is_disposed() {
            debug!("Not starting a disposed invite service");
            return Ok(());
        }
        if !self.subscriptions.lock().is_empty() {
            debug!("Invite service already started");
            return Ok(());
        }

        let contacts = self.deps.events.subscribe(&Topic::Contacts).await?;
        let sync = self.deps.events.subscribe(&Topic::Sync).await?;

        let mut subscriptions = self.subscriptions.lock();
        // A concurrent start won the race; drop our streams
        if !subscriptions.is_empty() {
            return Ok(());
        }
        subscriptions.push(spawn_listener(Topic::Contacts, contacts, Arc::downgrade(self)));
        subscriptions.push(spawn_listener(Topic::Sync, sync, Arc::downgrade(self)));
        debug!("Invite service listening on {} topics", subscriptions.len());
        Ok(())
    }

    /// Abort all listeners and drop every cached invite. Afterwards remote
    /// operations fail with `InviteError::Disposed` and local reads are empty.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        let subscriptions = std::mem::take(&mut *self.subscriptions.lock());
        let count = subscriptions.len();
        drop(subscriptions);
        self.cache.lock().clear();
        debug!("Invite service disposed, {} listeners stopped", count);
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    fn ensure_active(&self) -> Result<(), InviteError> {
        if self.is_disposed() {
            return Err(InviteError::Disposed);
        }
        Ok(())
    }

    /// Snapshot of the cached pending invites.
    pub fn cached_pending_invites(&self) -> Vec<InviteRecord> {
        self.cache.lock().values().cloned().collect()
    }

    /// Number of invites dropped as unresolvable in the last processed batch.
    pub fn unresolved_invite_count(&self) -> usize {
        self.unresolved.load(Ordering::SeqCst)
    }

    /// Fetch every pending inbound invite and rebuild the cache from it.
    ///
    /// On a transport failure the cache keeps its current content.
    pub async fn download_inbound_invites(&self) -> Result<Vec<ServerInvite>, InviteError> {
        self.ensure_active()?;
        let invites = self
            .deps
            .server
            .inbound_invites()
            .await
            .map_err(InviteError::InboundFetch)?;

        self.refresh_cache(&invites).await;
        Ok(invites)
    }

    async fn refresh_cache(&self, invites: &[ServerInvite]) {
        if self.is_disposed() {
            return;
        }
        if invites.is_empty() {
            self.cache.lock().clear();
            return;
        }
        let Some(keys) = self.batch_keys(invites.len()) else {
            self.cache.lock().clear();
            return;
        };

        let outcome = {
            let mut cache = self.cache.lock();
            cache.clear();
            resolve_batch(
                &mut cache,
                invites,
                &keys,
                &self.own_user_id,
                self.deps.contacts.as_ref(),
            )
        };
        self.finish_batch(outcome).await;
    }

    /// Resolve a batch of raw invites into the cache, replacing any entries
    /// with the same ids. Emits one `InvitesReloaded` per non-empty batch.
    pub async fn process_inbound_invites(&self, invites: &[ServerInvite]) {
        if invites.is_empty() || self.is_disposed() {
            return;
        }
        let Some(keys) = self.batch_keys(invites.len()) else {
            return;
        };

        let outcome = {
            let mut cache = self.cache.lock();
            resolve_batch(
                &mut cache,
                invites,
                &keys,
                &self.own_user_id,
                self.deps.contacts.as_ref(),
            )
        };
        self.finish_batch(outcome).await;
    }

    /// Re-classify every cached invite against the current trusted contacts.
    pub async fn reprocess_cached_invites(&self) {
        if self.is_disposed() {
            return;
        }
        let pending = self.cache.lock().len();
        if pending == 0 {
            return;
        }
        let Some(keys) = self.batch_keys(pending) else {
            return;
        };

        let outcome = {
            let mut cache = self.cache.lock();
            TrustReprocessor::new(self.deps.contacts.as_ref(), &self.own_user_id)
                .reprocess(&mut cache, &keys)
        };
        // Emptied by a concurrent refresh
        if outcome.attempted == 0 {
            return;
        }
        self.finish_batch(outcome).await;
    }

    fn batch_keys(&self, batch_len: usize) -> Option<KeyPairs> {
        match self.deps.keys.current_key_pairs() {
            Ok(keys) => Some(keys),
            Err(e) => {
                warn!(
                    "Abandoning batch of {} invites, key pairs unavailable: {}",
                    batch_len, e
                );
                None
            }
        }
    }

    async fn finish_batch(&self, outcome: BatchOutcome) {
        self.unresolved.store(outcome.unresolved, Ordering::SeqCst);
        if outcome.unresolved > 0 {
            debug!(
                "Dropped {} of {} invites as unresolvable",
                outcome.unresolved, outcome.attempted
            );
        }
        debug!(
            "Resolved invites: {} trusted, {} untrusted",
            outcome.trusted, outcome.untrusted
        );
        self.notify(Event::InvitesReloaded).await;
    }

    async fn notify(&self, event: Event) {
        let topic = event.topic();
        if let Err(e) = self.deps.events.publish(&topic, event).await {
            warn!("Failed to publish invite event: {}", e);
        }
    }

    /// Invites the local user has sent, optionally restricted to one vault.
    pub async fn outbound_invites(
        &self,
        vault: Option<&VaultListing>,
    ) -> Result<Vec<ServerInvite>, InviteError> {
        self.ensure_active()?;
        let invites = self
            .deps
            .server
            .outbound_invites()
            .await
            .map_err(InviteError::OutboundFetch)?;

        Ok(match vault {
            Some(vault) => invites
                .into_iter()
                .filter(|invite| invite.vault_id == vault.id)
                .collect(),
            None => invites,
        })
    }

    /// Accept a trusted invite and sync the joined vault.
    pub async fn accept_invite(&self, record: &InviteRecord) -> Result<(), InviteError> {
        if !record.trusted {
            return Err(InviteError::UntrustedInvite);
        }
        self.ensure_active()?;

        self.deps
            .accept_workflow
            .accept(&record.invite, &record.message)
            .await
            .map_err(InviteError::Accept)?;

        self.cache.lock().delete(&record.invite.id);
        info!(
            "Accepted invite {} to vault {}",
            record.invite.id, record.invite.vault_id
        );

        // Poll the general sync once here so its request is issued before the
        // scoped resync; whatever remains finishes in the background.
        let sync = Arc::clone(&self.deps.sync);
        let mut general_sync = Box::pin(async move { sync.sync().await });
        match futures::poll!(&mut general_sync) {
            Poll::Ready(result) => log_general_sync(result),
            Poll::Pending => {
                tokio::spawn(async move { log_general_sync(general_sync.await) });
            }
        }

        if let Err(e) = self.deps.sync.decrypt_errored_payloads().await {
            warn!("Failed to decrypt errored payloads after accept: {}", e);
        }
        if let Err(e) = self
            .deps
            .sync
            .sync_vaults_from_scratch(std::slice::from_ref(&record.invite.vault_id))
            .await
        {
            warn!(
                "Full resync of vault {} failed: {}",
                record.invite.vault_id, e
            );
        }

        Ok(())
    }

    /// Decline an inbound invite or revoke an outbound one.
    pub async fn delete_invite(&self, invite: &ServerInvite) -> Result<(), InviteError> {
        self.ensure_active()?;
        self.deps
            .server
            .delete_invite(&invite.vault_id, &invite.id)
            .await
            .map_err(InviteError::Delete)?;

        self.cache.lock().delete(&invite.id);
        Ok(())
    }

    /// Trusted contacts that are neither members of `vault` nor already invited to it.
    ///
    /// Any lookup failure yields an empty list.
    pub async fn invitable_contacts(&self, vault: &VaultListing) -> Vec<TrustedContact> {
        if self.is_disposed() {
            return Vec::new();
        }
        let members = match self.deps.vaults.vault_members(&vault.id, true).await {
            Ok(members) => members,
            Err(e) => {
                debug!("Failed to get members of vault {}: {}", vault.id, e);
                return Vec::new();
            }
        };
        let contacts = match self.deps.contacts.all_contacts() {
            Ok(contacts) => contacts,
            Err(e) => {
                debug!("Failed to list trusted contacts: {}", e);
                return Vec::new();
            }
        };
        let pending = match self.outbound_invites(Some(vault)).await {
            Ok(invites) => invites,
            Err(e) => {
                debug!("{}", e);
                return Vec::new();
            }
        };

        contacts
            .into_iter()
            .filter(|contact| {
                !members.iter().any(|m| m.user_id == contact.contact_id)
                    && !pending.iter().any(|i| i.recipient_id == contact.contact_id)
            })
            .collect()
    }

    /// Seal a vault invite for `contact` and send it.
    ///
    /// Existing members are not refused; the server decides.
    pub async fn invite_contact(
        &self,
        vault: &VaultListing,
        contact: &TrustedContact,
        permission: Permission,
    ) -> Result<ServerInvite, InviteError> {
        self.ensure_active()?;
        let members = self
            .deps
            .vaults
            .vault_members(&vault.id, false)
            .await
            .map_err(InviteError::VaultMembers)?;

        let vault_contacts: Vec<TrustedContact> = members
            .iter()
            .filter(|m| m.user_id != contact.contact_id)
            .filter_map(|m| self.deps.contacts.find_contact(&m.user_id).ok())
            .collect();

        let message = VaultInviteMessage {
            recipient_id: contact.contact_id.clone(),
            vault: VaultMetadata {
                vault_id: vault.id.clone(),
                name: vault.name.clone(),
                description: vault.description.clone(),
            },
            root_key: self.deps.keys.vault_root_key(&vault.id)?,
            permission,
            vault_contacts,
        };

        let recipient_key = contact
            .public_keys
            .encryption_key_bytes()
            .map_err(InviteError::InvalidRecipientKeys)?;
        let keys = self.deps.keys.current_key_pairs()?;
        let plaintext = Zeroizing::new(serde_json::to_vec(&message)?);
        let encrypted_message = seal(
            &plaintext,
            &keys,
            &EncryptionPublicKey::from(recipient_key),
        )?;

        let invite = self
            .deps
            .server
            .create_invite(&CreateInviteParams {
                vault_id: vault.id.clone(),
                recipient_id: contact.contact_id.clone(),
                encrypted_message,
                permission,
            })
            .await
            .map_err(InviteError::Send)?;

        info!(
            "Invited {} to vault {} with {} permission",
            contact.name, vault.id, permission
        );
        self.notify(Event::InviteSent).await;

        if let Err(e) = self.deps.sync.sync().await {
            warn!("Sync after sending invite failed: {}", e);
        }
        Ok(invite)
    }

    /// Whether `member` owns the vault it belongs to. False when the vault is unknown.
    pub fn is_vault_user_owner(&self, member: &VaultMember) -> bool {
        match self.deps.vaults.find_vault(&member.vault_id) {
            Ok(vault) => vault.owner_id == member.user_id,
            Err(_) => false,
        }
    }

    pub(crate) async fn handle_event(self: &Arc<Self>, event: Event) {
        match event {
            Event::TrustedContactsChanged { inserted, source } => {
                if source == ChangeSource::LocalChanged && !inserted.is_empty() {
                    let service = Arc::clone(self);
                    tokio::spawn(async move {
                        if let Err(e) = service.download_inbound_invites().await {
                            warn!("Invite download after contact change failed: {}", e);
                        }
                    });
                }
                self.reprocess_cached_invites().await;
            }
            Event::SharedVaultInvitesReceived(invites) => {
                self.process_inbound_invites(&invites).await;
            }
            Event::InvitesReloaded | Event::InviteSent => {}
        }
    }
}

fn log_general_sync(result: Result<(), SyncError>) {
    if let Err(e) = result {
        warn!("Sync after accepting invite failed: {}", e);
    }
}
