//! Process-wide cooperative-cancellation set (§5, §9).
//!
//! Modeled the same way the teacher models shared sandbox state: an
//! `Arc`-shared struct wrapping a lock-protected collection, with a minimal
//! {add, remove, contains} surface so callers cannot accidentally read-modify-write.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Default)]
pub struct StopFlags {
    inner: Arc<Mutex<HashSet<i64>>>,
}

impl StopFlags {
    pub fn new() -> Self {
        Default::default()
    }

    /// Marks `session_id` for cooperative cancellation. Idempotent.
    pub fn request_stop(&self, session_id: i64) {
        self.inner.lock().unwrap().insert(session_id);
    }

    /// Clears any pending stop request for `session_id`. Called at the start
    /// of a new run so a stale stop from a previous run cannot abort it.
    pub fn clear(&self, session_id: i64) {
        self.inner.lock().unwrap().remove(&session_id);
    }

    pub fn is_stopped(&self, session_id: i64) -> bool {
        self.inner.lock().unwrap().contains(&session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_is_idempotent_and_clearable() {
        let flags = StopFlags::new();
        assert!(!flags.is_stopped(1));
        flags.request_stop(1);
        flags.request_stop(1);
        assert!(flags.is_stopped(1));
        flags.clear(1);
        assert!(!flags.is_stopped(1));
    }

    #[test]
    fn sessions_are_independent() {
        let flags = StopFlags::new();
        flags.request_stop(1);
        assert!(flags.is_stopped(1));
        assert!(!flags.is_stopped(2));
    }
}
