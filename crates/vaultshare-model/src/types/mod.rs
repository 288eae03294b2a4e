//! Type definitions for vaultshare invites.

mod contacts;
mod ids;
mod invites;
mod messages;
mod permissions;
mod vaults;

pub use contacts::*;
pub use ids::*;
pub use invites::*;
pub use messages::*;
pub use permissions::*;
pub use vaults::*;
