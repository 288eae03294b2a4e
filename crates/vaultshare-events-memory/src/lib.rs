//! In-memory event bus implementation using tokio broadcast channels.
//!
//! Events are only delivered within a single process, which is all the
//! invite pipeline needs: the sync engine, the contact directory and the
//! invite service share one bus per client.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use vaultshare_events::{Event, EventBus, EventBusError, EventStream, Topic};

const CHANNEL_CAPACITY: usize = 100;

/// In-memory event bus using one tokio broadcast channel per topic.
pub struct MemoryEventBus {
    channels: Arc<DashMap<Topic, broadcast::Sender<Event>>>,
}

impl MemoryEventBus {
    pub fn new() -> Self {
        Self {
            channels: Arc::new(DashMap::new()),
        }
    }

    /// Get or create the broadcast channel for a topic
    fn get_or_create_channel(&self, topic: &Topic) -> broadcast::Sender<Event> {
        self.channels
            .entry(*topic)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }
}

impl Default for MemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for MemoryEventBus {
    async fn publish(&self, topic: &Topic, event: Event) -> Result<(), EventBusError> {
        let tx = self.get_or_create_channel(topic);

        // Ignore error if no receivers (this is fine)
        let _ = tx.send(event);

        Ok(())
    }

    async fn subscribe(&self, topic: &Topic) -> Result<EventStream, EventBusError> {
        let tx = self.get_or_create_channel(topic);
        let rx = tx.subscribe();

        // Lagged receivers skip what they missed; the next full download repairs state
        let stream = BroadcastStream::new(rx).filter_map(|result| result.ok());

        Ok(Box::pin(stream))
    }
}
