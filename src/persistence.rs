//! Persistence interface (§3.1). Session/account storage is out of scope
//! for this crate; these traits are the seam the Controller is built
//! against. Production code implements them against a real database. An
//! in-memory implementation is provided here for unit/integration tests.

use crate::model::{SessionCode, TestCase};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load_codes(&self, session_id: i64) -> anyhow::Result<SessionCode>;
}

#[async_trait]
pub trait TestCaseStore: Send + Sync {
    /// Deletes all persisted test cases for `session_id`. Used by `start`
    /// before the first `status` event, so the whole operation is visible
    /// to readers atomically with respect to the new run.
    async fn clear(&self, session_id: i64) -> anyhow::Result<()>;

    /// Appends a new test case and returns the id assigned to it.
    async fn append(&self, case: &TestCase) -> anyhow::Result<i64>;

    /// Overwrites an existing test case in place (used by `rerun`).
    async fn update(&self, case: &TestCase) -> anyhow::Result<()>;

    /// Lists a session's test cases ordered by `created_at`.
    async fn list(&self, session_id: i64) -> anyhow::Result<Vec<TestCase>>;
}

/// An in-memory `SessionStore` + `TestCaseStore`, for tests and for the CLI.
#[derive(Default)]
pub struct InMemoryStore {
    sessions: Mutex<HashMap<i64, SessionCode>>,
    cases: Mutex<HashMap<i64, Vec<TestCase>>>,
    next_id: Mutex<i64>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn put_session(&self, session_id: i64, code: SessionCode) {
        self.sessions.lock().unwrap().insert(session_id, code);
    }

    fn alloc_id(&self) -> i64 {
        let mut next = self.next_id.lock().unwrap();
        let id = *next;
        *next += 1;
        id
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn load_codes(&self, session_id: i64) -> anyhow::Result<SessionCode> {
        self.sessions
            .lock()
            .unwrap()
            .get(&session_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unknown session {}", session_id))
    }
}

#[async_trait]
impl TestCaseStore for InMemoryStore {
    async fn clear(&self, session_id: i64) -> anyhow::Result<()> {
        self.cases.lock().unwrap().remove(&session_id);
        Ok(())
    }

    async fn append(&self, case: &TestCase) -> anyhow::Result<i64> {
        let id = self.alloc_id();
        let mut case = case.clone();
        case.id = Some(id);
        self.cases
            .lock()
            .unwrap()
            .entry(case.session_id)
            .or_default()
            .push(case);
        Ok(id)
    }

    async fn update(&self, case: &TestCase) -> anyhow::Result<()> {
        let id = case
            .id
            .ok_or_else(|| anyhow::anyhow!("cannot update a test case without an id"))?;
        let mut cases = self.cases.lock().unwrap();
        let list = cases
            .get_mut(&case.session_id)
            .ok_or_else(|| anyhow::anyhow!("unknown session {}", case.session_id))?;
        let slot = list
            .iter_mut()
            .find(|c| c.id == Some(id))
            .ok_or_else(|| anyhow::anyhow!("unknown test case {}", id))?;
        *slot = case.clone();
        Ok(())
    }

    async fn list(&self, session_id: i64) -> anyhow::Result<Vec<TestCase>> {
        Ok(self
            .cases
            .lock()
            .unwrap()
            .get(&session_id)
            .cloned()
            .unwrap_or_default())
    }
}
