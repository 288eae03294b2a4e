//! Shared vault invite pipeline.
//!
//! Inbound invites arrive sealed. [`VaultInviteService`] opens them with the
//! local user's keys, classifies each as trusted or untrusted depending on
//! whether its sender keys match a trusted contact, and keeps the result in an
//! in-memory cache that is re-classified whenever the contact set changes.
//! Only trusted invites can be accepted.

pub mod cache;
pub mod error;
pub mod keys;
pub mod reprocess;
pub mod resolver;
pub mod service;
pub mod subscriptions;

pub use cache::InviteCache;
pub use error::InviteError;
pub use keys::ConfigKeySource;
pub use reprocess::TrustReprocessor;
pub use resolver::{resolve, BatchOutcome, Classification};
pub use service::{InviteServiceDeps, VaultInviteService};
pub use subscriptions::Subscription;
