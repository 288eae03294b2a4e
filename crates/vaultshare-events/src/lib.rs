//! Event bus abstraction for vaultshare.
//!
//! The invite pipeline listens on the `Contacts` and `Sync` topics and
//! publishes its own lifecycle notifications on `VaultInvites`. Only an
//! in-process implementation exists (`vaultshare-events-memory`), but the
//! pipeline depends on the trait alone.

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use thiserror::Error;
use vaultshare_model::{ChangeSource, ServerInvite, TrustedContact};

/// Channel an event is published on
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    /// Changes to the trusted contact set
    Contacts,
    /// Output of the synchronization engine
    Sync,
    /// Notifications emitted by the invite service
    VaultInvites,
}

/// Events exchanged between the invite service and its surroundings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Event {
    /// Trusted contacts were inserted or changed.
    TrustedContactsChanged {
        inserted: Vec<TrustedContact>,
        source: ChangeSource,
    },
    /// A sync pass delivered shared vault invites.
    SharedVaultInvitesReceived(Vec<ServerInvite>),
    /// The pending invite cache was rebuilt from a batch.
    InvitesReloaded,
    /// An invite was sent to a contact.
    InviteSent,
}

impl Event {
    /// Topic this event naturally belongs to.
    pub fn topic(&self) -> Topic {
        match self {
            Event::TrustedContactsChanged { .. } => Topic::Contacts,
            Event::SharedVaultInvitesReceived(_) => Topic::Sync,
            Event::InvitesReloaded | Event::InviteSent => Topic::VaultInvites,
        }
    }
}

/// Error type for event bus operations
#[derive(Debug, Error)]
pub enum EventBusError {
    #[error("backend error: {0}")]
    Backend(String),
}

/// Stream of events for one topic
pub type EventStream = Pin<Box<dyn Stream<Item = Event> + Send>>;

/// Event bus trait for publishing and subscribing to events.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish an event to all current subscribers of a topic.
    ///
    /// Events published while nobody is subscribed are dropped.
    async fn publish(&self, topic: &Topic, event: Event) -> Result<(), EventBusError>;

    /// Subscribe to a topic.
    ///
    /// Returns a stream that yields events as they occur.
    /// The stream will continue until dropped.
    async fn subscribe(&self, topic: &Topic) -> Result<EventStream, EventBusError>;
}
