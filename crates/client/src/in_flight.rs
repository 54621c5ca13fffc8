//! At-most-once guard for state-changing requests.
//!
//! Each lifecycle transition (`start`, `done`, `rate`, `clear`) holds an
//! [`InFlightTicket`] for the duration of its request. A second identical
//! transition issued while the first is outstanding is refused immediately
//! instead of reaching the server, where it would be rejected as an invalid
//! transition once the first one lands.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use schooldesk_core::task::TaskAction;
use schooldesk_core::types::DbId;

use crate::error::ClientError;

/// Identifies one logical transition on one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransitionKey {
    pub entity: &'static str,
    pub id: DbId,
    pub action: &'static str,
}

impl TransitionKey {
    pub fn task(id: DbId, action: TaskAction) -> Self {
        Self {
            entity: "task",
            id,
            action: action.as_str(),
        }
    }

    pub fn clear_flag(id: DbId) -> Self {
        Self {
            entity: "absence flag",
            id,
            action: "clear",
        }
    }
}

impl fmt::Display for TransitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.action, self.entity, self.id)
    }
}

/// Shared set of transitions currently awaiting a response.
///
/// Cloning is cheap; clones share the same set.
#[derive(Debug, Clone, Default)]
pub struct InFlightRegistry {
    inner: Arc<Mutex<HashSet<TransitionKey>>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key`, or fail with [`ClientError::InFlight`] if it is taken.
    pub fn try_begin(&self, key: TransitionKey) -> Result<InFlightTicket, ClientError> {
        if !self.lock().insert(key) {
            return Err(ClientError::InFlight(key));
        }
        Ok(InFlightTicket {
            registry: self.clone(),
            key,
        })
    }

    /// Whether the UI should currently disable the action for `key`.
    pub fn is_in_flight(&self, key: &TransitionKey) -> bool {
        self.lock().contains(key)
    }

    /// Number of outstanding transitions.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<TransitionKey>> {
        // The set stays consistent even if a holder panicked mid-insert.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases its key when dropped, whether the request succeeded, failed or
/// was cancelled.
#[derive(Debug)]
pub struct InFlightTicket {
    registry: InFlightRegistry,
    key: TransitionKey,
}

impl InFlightTicket {
    pub fn key(&self) -> TransitionKey {
        self.key
    }
}

impl Drop for InFlightTicket {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn duplicate_key_is_refused_while_ticket_is_held() {
        let registry = InFlightRegistry::new();
        let key = TransitionKey::task(1, TaskAction::Start);

        let ticket = registry.try_begin(key).unwrap();
        assert!(registry.is_in_flight(&key));
        assert_matches!(registry.try_begin(key), Err(ClientError::InFlight(k)) if k == key);

        drop(ticket);
        assert!(!registry.is_in_flight(&key));
        assert!(registry.try_begin(key).is_ok());
    }

    #[test]
    fn different_actions_and_entities_do_not_collide() {
        let registry = InFlightRegistry::new();
        let _start = registry.try_begin(TransitionKey::task(1, TaskAction::Start)).unwrap();
        let _done = registry.try_begin(TransitionKey::task(1, TaskAction::MarkDone)).unwrap();
        let _other = registry.try_begin(TransitionKey::task(2, TaskAction::Start)).unwrap();
        let _flag = registry.try_begin(TransitionKey::clear_flag(1)).unwrap();
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn clones_share_state() {
        let registry = InFlightRegistry::new();
        let clone = registry.clone();
        let key = TransitionKey::clear_flag(3);
        let _ticket = registry.try_begin(key).unwrap();
        assert!(clone.is_in_flight(&key));
        assert!(clone.try_begin(key).is_err());
    }

    #[test]
    fn display_names_action_and_entity() {
        let key = TransitionKey::task(9, TaskAction::MarkDone);
        assert_eq!(key.to_string(), "mark_done task 9");
    }
}
