//! Opening and trust-classifying sealed invite messages.
//!
//! A message is *trusted* when the sender keys bound into the sealed string
//! are exactly the keys of a contact the local user trusts, and the message is
//! addressed to the local user. A message that only opens is *untrusted*.

use thiserror::Error;
use vaultshare_crypto::{open, KeyPairs, Keypair, OpenError};
use vaultshare_model::{
    ContactDirectory, InviteRecord, ServerInvite, TrustedContact, UserId, VaultInviteMessage,
};

use crate::cache::InviteCache;

/// Trust tier of one resolved invite.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Classification {
    Trusted(VaultInviteMessage),
    Untrusted(VaultInviteMessage),
    Unresolvable,
}

impl Classification {
    pub fn is_trusted(&self) -> bool {
        matches!(self, Classification::Trusted(_))
    }

    /// Pair the classification with its server record. `None` for unresolvable invites.
    pub fn into_record(self, invite: ServerInvite) -> Option<InviteRecord> {
        match self {
            Classification::Trusted(message) => Some(InviteRecord {
                invite,
                message,
                trusted: true,
            }),
            Classification::Untrusted(message) => Some(InviteRecord {
                invite,
                message,
                trusted: false,
            }),
            Classification::Unresolvable => None,
        }
    }
}

#[derive(Debug, Error)]
enum ResolveError {
    #[error(transparent)]
    Open(#[from] OpenError),
    #[error("sender keys do not match the trusted contact")]
    SenderKeyMismatch,
    #[error("message is addressed to another user")]
    WrongRecipient,
    #[error("invalid invite message: {0}")]
    Decode(#[from] serde_json::Error),
}

fn open_trusted(
    encrypted_message: &str,
    recipient: &Keypair,
    own_user_id: &UserId,
    sender: &TrustedContact,
) -> Result<VaultInviteMessage, ResolveError> {
    let opened = open(encrypted_message, recipient)?;
    if !sender
        .public_keys
        .matches(&opened.sender_encryption_key, &opened.sender_signing_key)
    {
        return Err(ResolveError::SenderKeyMismatch);
    }

    let message: VaultInviteMessage = serde_json::from_slice(&opened.plaintext)?;
    if &message.recipient_id != own_user_id {
        return Err(ResolveError::WrongRecipient);
    }
    Ok(message)
}

fn open_untrusted(
    encrypted_message: &str,
    recipient: &Keypair,
) -> Result<VaultInviteMessage, ResolveError> {
    let opened = open(encrypted_message, recipient)?;
    Ok(serde_json::from_slice(&opened.plaintext)?)
}

/// Classify one invite. Pure: touches neither the cache nor any directory.
///
/// The trusted path is tried first whenever the sender is a known contact; any
/// failure there falls through to the untrusted path, so an untrusted result
/// never hides a message that verifies.
pub fn resolve(
    invite: &ServerInvite,
    recipient: &Keypair,
    own_user_id: &UserId,
    sender: Option<&TrustedContact>,
) -> Classification {
    if let Some(contact) = sender {
        match open_trusted(&invite.encrypted_message, recipient, own_user_id, contact) {
            Ok(message) => return Classification::Trusted(message),
            Err(e) => tracing::debug!("Invite {} not trusted: {}", invite.id, e),
        }
    }

    match open_untrusted(&invite.encrypted_message, recipient) {
        Ok(message) => Classification::Untrusted(message),
        Err(e) => {
            tracing::debug!("Invite {} unresolvable: {}", invite.id, e);
            Classification::Unresolvable
        }
    }
}

/// Counts from one resolved batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub attempted: usize,
    pub trusted: usize,
    pub untrusted: usize,
    pub unresolved: usize,
}

/// Resolve `invites` in order into `cache`.
///
/// Each invite's stale entry is removed before it is classified, so an invite
/// that no longer opens disappears instead of keeping an old classification.
pub fn resolve_batch(
    cache: &mut InviteCache,
    invites: &[ServerInvite],
    keys: &KeyPairs,
    own_user_id: &UserId,
    contacts: &dyn ContactDirectory,
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();

    for invite in invites {
        outcome.attempted += 1;
        cache.delete(&invite.id);

        let sender = contacts.find_contact(&invite.sender_id).ok();
        let classification = resolve(invite, &keys.encryption, own_user_id, sender.as_ref());
        match classification.into_record(invite.clone()) {
            Some(record) => {
                if record.trusted {
                    outcome.trusted += 1;
                } else {
                    outcome.untrusted += 1;
                }
                cache.set(invite.id.clone(), record);
            }
            None => outcome.unresolved += 1,
        }
    }

    outcome
}
