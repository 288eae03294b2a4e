use futures::StreamExt;
use std::sync::Weak;
use tokio::task::JoinHandle;
use tracing::debug;
use vaultshare_events::{EventStream, Topic};

use crate::service::VaultInviteService;

/// A running event listener. Dropping it aborts the listener task.
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Forward every event of `stream` to the service until the stream ends or
/// the service is gone. Holds only a weak reference.
pub(crate) fn spawn_listener(
    topic: Topic,
    mut stream: EventStream,
    service: Weak<VaultInviteService>,
) -> Subscription {
    let handle = tokio::spawn(async move {
        while let Some(event) = stream.next().await {
            let Some(service) = service.upgrade() else {
                break;
            };
            service.handle_event(event).await;
        }
        debug!("Invite listener for {:?} stopped", topic);
    });

    Subscription { handle }
}
