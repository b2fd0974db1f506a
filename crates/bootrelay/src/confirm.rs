//! Two-step confirmation tokens
//!
//! Destructive operations are a two-phase exchange: the first request
//! hands out a token, the second presents it together with the answer.
//! Tokens are single use and expire after a short window.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use uuid::Uuid;

/// What a pending token authorizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    /// Power the host on (second phase picks the OS)
    PowerOn,
    /// Forced power-off via long hold (second phase answers yes/no)
    Shutdown,
}

#[derive(Debug)]
struct Pending {
    action: PendingAction,
    issued_at: Instant,
}

/// Reasons a token is not redeemable
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfirmError {
    #[error("unknown confirmation token")]
    Unknown,

    #[error("confirmation token expired")]
    Expired,

    #[error("token was issued for a different operation")]
    WrongAction,
}

/// In-memory store of outstanding confirmations
#[derive(Clone)]
pub struct ConfirmStore {
    pending: Arc<Mutex<HashMap<Uuid, Pending>>>,
    ttl: Duration,
}

impl Default for ConfirmStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(120))
    }
}

impl ConfirmStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Issue a fresh token for `action`
    pub fn issue(&self, action: PendingAction) -> Uuid {
        let token = Uuid::new_v4();
        let mut pending = self.pending.lock().expect("confirm store poisoned");

        // Opportunistic sweep so abandoned tokens don't pile up
        pending.retain(|_, p| p.issued_at.elapsed() < self.ttl);
        pending.insert(
            token,
            Pending {
                action,
                issued_at: Instant::now(),
            },
        );

        token
    }

    /// Redeem a token. Removes it regardless of the result, so a token
    /// can never authorize two operations.
    ///
    /// # Errors
    /// Returns `ConfirmError` for unknown, expired or mismatched tokens
    pub fn take(&self, token: Uuid, action: PendingAction) -> Result<(), ConfirmError> {
        let mut pending = self.pending.lock().expect("confirm store poisoned");
        let entry = pending.remove(&token).ok_or(ConfirmError::Unknown)?;

        if entry.issued_at.elapsed() >= self.ttl {
            return Err(ConfirmError::Expired);
        }
        if entry.action != action {
            return Err(ConfirmError::WrongAction);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_single_use() {
        let store = ConfirmStore::default();
        let token = store.issue(PendingAction::Shutdown);

        store.take(token, PendingAction::Shutdown).unwrap();
        assert_eq!(
            store.take(token, PendingAction::Shutdown),
            Err(ConfirmError::Unknown)
        );
    }

    #[test]
    fn unknown_token_is_rejected() {
        let store = ConfirmStore::default();
        assert_eq!(
            store.take(Uuid::new_v4(), PendingAction::PowerOn),
            Err(ConfirmError::Unknown)
        );
    }

    #[test]
    fn expired_token_is_rejected_and_consumed() {
        let store = ConfirmStore::new(Duration::ZERO);
        let token = store.issue(PendingAction::PowerOn);

        assert_eq!(
            store.take(token, PendingAction::PowerOn),
            Err(ConfirmError::Expired)
        );
        assert_eq!(
            store.take(token, PendingAction::PowerOn),
            Err(ConfirmError::Unknown)
        );
    }

    #[test]
    fn token_is_bound_to_its_operation() {
        let store = ConfirmStore::default();
        let token = store.issue(PendingAction::PowerOn);

        assert_eq!(
            store.take(token, PendingAction::Shutdown),
            Err(ConfirmError::WrongAction)
        );
    }
}
