//! Common test helpers for the invite pipeline.
//!
//! This module provides shared test infrastructure including:
//! - Identities with real key material and sealed invites between them
//! - In-memory fakes for every collaborator trait
//! - A harness wiring a `VaultInviteService` to the fakes and a `MemoryEventBus`

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use vaultshare_crypto::{open, seal, EncryptionPublicKey, KeyPairs, Keypair, SigningKeypair};
use vaultshare_events::{Event, EventBus, EventStream, Topic};
use vaultshare_events_memory::MemoryEventBus;
use vaultshare_model::*;

use crate::service::{InviteServiceDeps, VaultInviteService};

/// Test helper: Install a fmt subscriber writing to the test output
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A user with real key material
#[derive(Clone)]
pub struct Identity {
    pub user_id: UserId,
    encryption_secret: [u8; 32],
    signing_secret: [u8; 32],
}

impl Identity {
    pub fn new() -> Self {
        let keys = KeyPairs::generate();
        Self {
            user_id: UserId(Uuid::new_v4()),
            encryption_secret: keys.encryption.secret_key_bytes(),
            signing_secret: keys.signing.secret_key_bytes(),
        }
    }

    pub fn keys(&self) -> KeyPairs {
        KeyPairs {
            encryption: Keypair::from_secret_bytes(&self.encryption_secret),
            signing: SigningKeypair::from_secret_bytes(&self.signing_secret),
        }
    }

    pub fn public_keys(&self) -> PublicKeySet {
        let keys = self.keys();
        PublicKeySet::from_bytes(
            &keys.encryption.public_key_bytes(),
            &keys.signing.public_key_bytes(),
        )
    }
}

/// Test helper: Trusted contact entry for an identity
pub fn contact_for(identity: &Identity, name: &str) -> TrustedContact {
    TrustedContact {
        contact_id: identity.user_id.clone(),
        name: name.to_string(),
        public_keys: identity.public_keys(),
    }
}

pub fn vault_listing(owner: &Identity) -> VaultListing {
    VaultListing {
        id: VaultId(Uuid::new_v4()),
        name: "Team secrets".to_string(),
        description: Some("shared credentials".to_string()),
        owner_id: owner.user_id.clone(),
    }
}

/// Test helper: Invite from `sender` to `recipient` for a fresh vault
pub fn sealed_invite(sender: &Identity, recipient: &Identity) -> ServerInvite {
    sealed_invite_for_vault(sender, recipient, &VaultId(Uuid::new_v4()))
}

/// Test helper: Invite from `sender` to `recipient` for `vault_id`, sealed for real
pub fn sealed_invite_for_vault(
    sender: &Identity,
    recipient: &Identity,
    vault_id: &VaultId,
) -> ServerInvite {
    let message = VaultInviteMessage {
        recipient_id: recipient.user_id.clone(),
        vault: VaultMetadata {
            vault_id: vault_id.clone(),
            name: "Team secrets".to_string(),
            description: None,
        },
        root_key: "11".repeat(32),
        permission: Permission::Write,
        vault_contacts: vec![],
    };
    let plaintext = serde_json::to_vec(&message).unwrap();
    let recipient_key = EncryptionPublicKey::from(recipient.keys().encryption.public_key_bytes());
    let encrypted_message = seal(&plaintext, &sender.keys(), &recipient_key).unwrap();

    ServerInvite {
        id: InviteId(Uuid::new_v4()),
        vault_id: vault_id.clone(),
        sender_id: sender.user_id.clone(),
        recipient_id: recipient.user_id.clone(),
        encrypted_message,
        permission: Permission::Write,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// Test helper: Cache record for an invite addressed to `me`
pub fn record_for(invite: &ServerInvite, me: &Identity, trusted: bool) -> InviteRecord {
    let opened = open(&invite.encrypted_message, &me.keys().encryption).unwrap();
    InviteRecord {
        invite: invite.clone(),
        message: serde_json::from_slice(&opened.plaintext).unwrap(),
        trusted,
    }
}

/// Fixed contact list
pub struct StaticContacts(pub Vec<TrustedContact>);

impl ContactDirectory for StaticContacts {
    fn find_contact(&self, user_id: &UserId) -> Result<TrustedContact, DirectoryError> {
        self.0
            .iter()
            .find(|c| &c.contact_id == user_id)
            .cloned()
            .ok_or(DirectoryError::NotFound)
    }

    fn all_contacts(&self) -> Result<Vec<TrustedContact>, DirectoryError> {
        Ok(self.0.clone())
    }
}

#[derive(Default)]
pub struct FakeServer {
    pub inbound: Mutex<Vec<ServerInvite>>,
    pub outbound: Mutex<Vec<ServerInvite>>,
    pub created: Mutex<Vec<CreateInviteParams>>,
    pub deleted: Mutex<Vec<InviteId>>,
    pub fail_inbound: AtomicBool,
    pub fail_outbound: AtomicBool,
    pub fail_create: AtomicBool,
    pub fail_delete: AtomicBool,
}

fn unreachable_server() -> TransportError {
    TransportError::Request("connection refused".to_string())
}

#[async_trait]
impl InvitesServer for FakeServer {
    async fn inbound_invites(&self) -> Result<Vec<ServerInvite>, TransportError> {
        if self.fail_inbound.load(Ordering::SeqCst) {
            return Err(unreachable_server());
        }
        Ok(self.inbound.lock().clone())
    }

    async fn outbound_invites(&self) -> Result<Vec<ServerInvite>, TransportError> {
        if self.fail_outbound.load(Ordering::SeqCst) {
            return Err(unreachable_server());
        }
        Ok(self.outbound.lock().clone())
    }

    async fn create_invite(
        &self,
        params: &CreateInviteParams,
    ) -> Result<ServerInvite, TransportError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(unreachable_server());
        }
        self.created.lock().push(params.clone());
        Ok(ServerInvite {
            id: InviteId(Uuid::new_v4()),
            vault_id: params.vault_id.clone(),
            sender_id: UserId(Uuid::nil()),
            recipient_id: params.recipient_id.clone(),
            encrypted_message: params.encrypted_message.clone(),
            permission: params.permission,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
    }

    async fn delete_invite(
        &self,
        _vault_id: &VaultId,
        invite_id: &InviteId,
    ) -> Result<(), TransportError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(unreachable_server());
        }
        self.deleted.lock().push(invite_id.clone());
        Ok(())
    }
}

/// Key source for one identity; can be switched off to simulate a locked keychain
pub struct FakeKeys {
    identity: Identity,
    pub available: AtomicBool,
    pub key_calls: AtomicUsize,
}

impl FakeKeys {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            available: AtomicBool::new(true),
            key_calls: AtomicUsize::new(0),
        }
    }
}

impl KeySource for FakeKeys {
    fn current_key_pairs(&self) -> Result<KeyPairs, KeyError> {
        self.key_calls.fetch_add(1, Ordering::SeqCst);
        if !self.available.load(Ordering::SeqCst) {
            return Err(KeyError::Unavailable);
        }
        Ok(self.identity.keys())
    }

    fn vault_root_key(&self, _vault_id: &VaultId) -> Result<String, KeyError> {
        Ok("22".repeat(32))
    }
}

#[derive(Default)]
pub struct FakeContacts {
    pub contacts: Mutex<Vec<TrustedContact>>,
    pub fail: AtomicBool,
}

impl FakeContacts {
    pub fn add(&self, contact: TrustedContact) {
        self.contacts.lock().push(contact);
    }
}

impl ContactDirectory for FakeContacts {
    fn find_contact(&self, user_id: &UserId) -> Result<TrustedContact, DirectoryError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DirectoryError::Backend("directory offline".to_string()));
        }
        self.contacts
            .lock()
            .iter()
            .find(|c| &c.contact_id == user_id)
            .cloned()
            .ok_or(DirectoryError::NotFound)
    }

    fn all_contacts(&self) -> Result<Vec<TrustedContact>, DirectoryError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DirectoryError::Backend("directory offline".to_string()));
        }
        Ok(self.contacts.lock().clone())
    }
}

#[derive(Default)]
pub struct FakeVaults {
    pub vaults: Mutex<Vec<VaultListing>>,
    pub members: Mutex<Vec<VaultMember>>,
    /// `read_from_cache` flag of every membership read
    pub member_reads: Mutex<Vec<bool>>,
    pub fail_members: AtomicBool,
}

impl FakeVaults {
    pub fn add_member(&self, vault: &VaultListing, user_id: &UserId, permission: Permission) {
        self.members.lock().push(VaultMember {
            vault_id: vault.id.clone(),
            user_id: user_id.clone(),
            permission,
        });
    }
}

#[async_trait]
impl VaultDirectory for FakeVaults {
    async fn vault_members(
        &self,
        vault_id: &VaultId,
        read_from_cache: bool,
    ) -> Result<Vec<VaultMember>, TransportError> {
        self.member_reads.lock().push(read_from_cache);
        if self.fail_members.load(Ordering::SeqCst) {
            return Err(unreachable_server());
        }
        Ok(self
            .members
            .lock()
            .iter()
            .filter(|m| &m.vault_id == vault_id)
            .cloned()
            .collect())
    }

    fn find_vault(&self, vault_id: &VaultId) -> Result<VaultListing, DirectoryError> {
        self.vaults
            .lock()
            .iter()
            .find(|v| &v.id == vault_id)
            .cloned()
            .ok_or(DirectoryError::NotFound)
    }
}

/// Records every sync call in order
#[derive(Default)]
pub struct FakeSync {
    pub calls: Mutex<Vec<String>>,
    pub fail: AtomicBool,
}

impl FakeSync {
    fn record(&self, call: String) -> Result<(), SyncError> {
        self.calls.lock().push(call);
        if self.fail.load(Ordering::SeqCst) {
            return Err(SyncError::Backend("sync unavailable".to_string()));
        }
        Ok(())
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl SyncEngine for FakeSync {
    async fn sync(&self) -> Result<(), SyncError> {
        self.record("sync".to_string())
    }

    async fn sync_vaults_from_scratch(&self, vault_ids: &[VaultId]) -> Result<(), SyncError> {
        let ids: Vec<String> = vault_ids.iter().map(|id| id.to_string()).collect();
        self.record(format!("from_scratch:{}", ids.join(",")))
    }

    async fn decrypt_errored_payloads(&self) -> Result<(), SyncError> {
        self.record("decrypt_errored".to_string())
    }
}

#[derive(Default)]
pub struct FakeAcceptWorkflow {
    pub accepted: Mutex<Vec<(InviteId, VaultInviteMessage)>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl AcceptInviteWorkflow for FakeAcceptWorkflow {
    async fn accept(
        &self,
        invite: &ServerInvite,
        message: &VaultInviteMessage,
    ) -> Result<(), TransportError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(TransportError::Unauthorized);
        }
        self.accepted
            .lock()
            .push((invite.id.clone(), message.clone()));
        Ok(())
    }
}

/// A service wired to fakes, plus handles on every fake
pub struct Harness {
    pub me: Identity,
    pub server: Arc<FakeServer>,
    pub keys: Arc<FakeKeys>,
    pub contacts: Arc<FakeContacts>,
    pub vaults: Arc<FakeVaults>,
    pub sync: Arc<FakeSync>,
    pub accept_workflow: Arc<FakeAcceptWorkflow>,
    pub bus: Arc<MemoryEventBus>,
    pub service: Arc<VaultInviteService>,
}

impl Harness {
    pub fn new() -> Self {
        init_tracing();
        let me = Identity::new();
        let server = Arc::new(FakeServer::default());
        let keys = Arc::new(FakeKeys::new(me.clone()));
        let contacts = Arc::new(FakeContacts::default());
        let vaults = Arc::new(FakeVaults::default());
        let sync = Arc::new(FakeSync::default());
        let accept_workflow = Arc::new(FakeAcceptWorkflow::default());
        let bus = Arc::new(MemoryEventBus::new());

        let deps = InviteServiceDeps {
            server: server.clone(),
            keys: keys.clone(),
            contacts: contacts.clone(),
            vaults: vaults.clone(),
            sync: sync.clone(),
            accept_workflow: accept_workflow.clone(),
            events: bus.clone(),
        };
        let service = Arc::new(VaultInviteService::new(me.user_id.clone(), deps));

        Self {
            me,
            server,
            keys,
            contacts,
            vaults,
            sync,
            accept_workflow,
            bus,
            service,
        }
    }

    /// Deps pointing at this harness' fakes, for swapping individual collaborators
    pub fn deps(&self) -> InviteServiceDeps {
        InviteServiceDeps {
            server: self.server.clone(),
            keys: self.keys.clone(),
            contacts: self.contacts.clone(),
            vaults: self.vaults.clone(),
            sync: self.sync.clone(),
            accept_workflow: self.accept_workflow.clone(),
            events: self.bus.clone(),
        }
    }

    pub async fn invite_events(&self) -> EventStream {
        self.bus.subscribe(&Topic::VaultInvites).await.unwrap()
    }

    pub fn cached(&self, id: &InviteId) -> Option<InviteRecord> {
        self.service
            .cached_pending_invites()
            .into_iter()
            .find(|r| &r.invite.id == id)
    }
}

/// Test helper: Next event on a stream, or `None` after a short wait
pub async fn next_event(stream: &mut EventStream) -> Option<Event> {
    use futures::StreamExt;
    tokio::time::timeout(Duration::from_millis(200), stream.next())
        .await
        .ok()
        .flatten()
}

/// Test helper: Poll until `condition` holds or a second has passed
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
