//! Membership set of live sessions.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use posecast_core::SessionId;
use thiserror::Error;

use super::connection::SessionHandle;

/// Registry membership errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A session with this id is already registered.
    #[error("session {0} is already registered")]
    AlreadyRegistered(SessionId),
}

/// Live sessions keyed by id.
///
/// The lock guards membership only. It is never held across a send: fan-out
/// works on a [`snapshot`](Self::snapshot).
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Arc<SessionHandle>>>,
}

impl SessionRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session.
    pub fn add(&self, session: Arc<SessionHandle>) -> Result<(), RegistryError> {
        let mut sessions = self.sessions.write();
        if sessions.contains_key(session.id()) {
            return Err(RegistryError::AlreadyRegistered(session.id().clone()));
        }
        let _ = sessions.insert(session.id().clone(), session);
        Ok(())
    }

    /// Remove a session and mark it closed. Removing an absent id is a no-op.
    pub fn remove(&self, id: &SessionId) -> Option<Arc<SessionHandle>> {
        let removed = self.sessions.write().remove(id);
        if let Some(session) = &removed {
            let _ = session.close();
        }
        removed
    }

    /// Stable copy of the current membership.
    pub fn snapshot(&self) -> Vec<Arc<SessionHandle>> {
        self.sessions.read().values().cloned().collect()
    }

    /// Visit every member of a snapshot. The lock is not held while visiting.
    pub fn for_each(&self, mut visit: impl FnMut(&Arc<SessionHandle>)) {
        for session in &self.snapshot() {
            visit(session);
        }
    }

    /// Look up one session.
    pub fn get(&self, id: &SessionId) -> Option<Arc<SessionHandle>> {
        self.sessions.read().get(id).cloned()
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.read().contains_key(id)
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Whether no session is registered.
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::connection::LivenessState;
    use tokio::sync::mpsc;

    fn session(id: &str) -> Arc<SessionHandle> {
        let (tx, _rx) = mpsc::channel(4);
        Arc::new(SessionHandle::new(SessionId::from(id), tx))
    }

    #[test]
    fn add_and_contains() {
        let reg = SessionRegistry::new();
        assert!(reg.is_empty());
        reg.add(session("a")).unwrap();
        reg.add(session("b")).unwrap();
        assert_eq!(reg.len(), 2);
        assert!(reg.contains(&SessionId::from("a")));
        assert!(reg.get(&SessionId::from("b")).is_some());
    }

    #[test]
    fn duplicate_add_rejected() {
        let reg = SessionRegistry::new();
        reg.add(session("a")).unwrap();
        assert_eq!(
            reg.add(session("a")),
            Err(RegistryError::AlreadyRegistered(SessionId::from("a")))
        );
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn remove_is_idempotent_and_closes() {
        let reg = SessionRegistry::new();
        let s = session("a");
        reg.add(s.clone()).unwrap();

        let removed = reg.remove(&SessionId::from("a"));
        assert!(removed.is_some());
        assert_eq!(s.state(), LivenessState::Closed);
        assert!(reg.remove(&SessionId::from("a")).is_none());
        assert!(reg.is_empty());
    }

    #[test]
    fn add_remove_remove_equals_never_added() {
        let reg = SessionRegistry::new();
        reg.add(session("keep")).unwrap();
        reg.add(session("gone")).unwrap();
        let _ = reg.remove(&SessionId::from("gone"));
        let _ = reg.remove(&SessionId::from("gone"));

        let ids: Vec<_> = reg.snapshot().iter().map(|s| s.id().clone()).collect();
        assert_eq!(ids, vec![SessionId::from("keep")]);
    }

    #[test]
    fn remove_absent_is_noop() {
        let reg = SessionRegistry::new();
        assert!(reg.remove(&SessionId::from("nope")).is_none());
    }

    #[test]
    fn visitor_may_mutate_membership() {
        let reg = SessionRegistry::new();
        for id in ["a", "b", "c"] {
            reg.add(session(id)).unwrap();
        }
        let mut visited = 0;
        reg.for_each(|s| {
            visited += 1;
            // Removing during the pass must not skip or repeat others.
            let _ = reg.remove(s.id());
        });
        assert_eq!(visited, 3);
        assert!(reg.is_empty());
    }
}
