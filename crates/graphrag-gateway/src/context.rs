//! Session-scoped active-repository context (spec §3.3), reinterpreted from
//! `original_source/src/mcp/context.py`'s `ContextVar`-based
//! `set_repository`/`get_repository`/`clear_repository`.
//!
//! A `ContextVar` follows one asyncio task; this gateway serves many
//! concurrent SSE clients on a shared tokio runtime, so the active
//! repository is keyed by session id in a `DashMap` instead of being
//! task-local. One session's choice of repository never leaks into
//! another's.

use dashmap::DashMap;

#[derive(Default)]
pub struct SessionContext {
    repos: DashMap<String, String>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_repository(&self, session_id: &str, repository_id: impl Into<String>) {
        self.repos.insert(session_id.to_string(), repository_id.into());
    }

    pub fn get_repository(&self, session_id: &str) -> Option<String> {
        self.repos.get(session_id).map(|r| r.clone())
    }

    pub fn clear_repository(&self, session_id: &str) {
        self.repos.remove(session_id);
    }

    /// Drops all state for a session, called when its SSE connection closes.
    pub fn end_session(&self, session_id: &str) {
        self.repos.remove(session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trips() {
        let ctx = SessionContext::new();
        ctx.set_repository("s1", "repo-a");
        assert_eq!(ctx.get_repository("s1").as_deref(), Some("repo-a"));
    }

    #[test]
    fn sessions_do_not_leak_into_each_other() {
        let ctx = SessionContext::new();
        ctx.set_repository("s1", "repo-a");
        assert_eq!(ctx.get_repository("s2"), None);
    }

    #[test]
    fn clear_repository_removes_the_active_choice() {
        let ctx = SessionContext::new();
        ctx.set_repository("s1", "repo-a");
        ctx.clear_repository("s1");
        assert_eq!(ctx.get_repository("s1"), None);
    }
}
