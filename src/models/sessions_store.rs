use std::collections::HashMap;

use super::conversation::Conversation;
use crate::repositories::SessionData;

/// Store for all sessions, with at most one active at a time.
pub struct SessionsStore {
    sessions: HashMap<String, Conversation>,
    active_session_id: Option<String>,
}

impl SessionsStore {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
            active_session_id: None,
        }
    }

    /// Add a session to the store. Becomes active if it is the first one.
    pub fn add_session(&mut self, session: Conversation) {
        let id = session.id().to_string();
        self.sessions.insert(id.clone(), session);

        if self.active_session_id.is_none() {
            self.active_session_id = Some(id);
        }
    }

    pub fn get_session(&self, id: &str) -> Option<&Conversation> {
        self.sessions.get(id)
    }

    pub fn get_session_mut(&mut self, id: &str) -> Option<&mut Conversation> {
        self.sessions.get_mut(id)
    }

    pub fn active_id(&self) -> Option<&String> {
        self.active_session_id.as_ref()
    }

    pub fn active(&self) -> Option<&Conversation> {
        self.sessions.get(self.active_session_id.as_deref()?)
    }

    pub fn active_mut(&mut self) -> Option<&mut Conversation> {
        let id = self.active_session_id.clone()?;
        self.sessions.get_mut(&id)
    }

    /// Set the active session. Returns false when `id` is unknown.
    pub fn set_active(&mut self, id: &str) -> bool {
        if self.sessions.contains_key(id) {
            self.active_session_id = Some(id.to_string());
            true
        } else {
            false
        }
    }

    /// Switch the active session, returning a persistence snapshot of the
    /// outgoing session so the caller can save it. The switch policy is
    /// prompt-and-persist, with the prompt living at the UI boundary.
    /// No snapshot is produced when `id` is unknown (no switch happens),
    /// when there was no outgoing session, or when its log is empty.
    pub fn switch_to(&mut self, id: &str) -> Option<SessionData> {
        if !self.sessions.contains_key(id) {
            return None;
        }

        let outgoing = self
            .active_session_id
            .as_deref()
            .filter(|active| *active != id)
            .and_then(|active| self.sessions.get(active))
            .filter(|session| !session.is_empty())
            .map(|session| session.to_data());

        self.active_session_id = Some(id.to_string());
        outgoing
    }

    /// Delete a session. If it was active, another session (if any) becomes
    /// active.
    pub fn delete_session(&mut self, id: &str) -> bool {
        let removed = self.sessions.remove(id).is_some();

        if self.active_session_id.as_deref() == Some(id) {
            self.active_session_id = self.sessions.keys().next().cloned();
        }

        removed
    }

    /// List all sessions, most recently updated first.
    pub fn list_all(&self) -> Vec<&Conversation> {
        let mut sessions: Vec<&Conversation> = self.sessions.values().collect();
        sessions.sort_by_key(|s| std::cmp::Reverse(s.updated_at()));
        sessions
    }

    pub fn count(&self) -> usize {
        self.sessions.len()
    }
}

impl Default for SessionsStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Message;

    fn session(id: &str) -> Conversation {
        Conversation::with_id(id, "sonar", "")
    }

    #[test]
    fn test_first_session_becomes_active() {
        let mut store = SessionsStore::new();
        store.add_session(session("a"));
        store.add_session(session("b"));

        assert_eq!(store.active_id().map(String::as_str), Some("a"));
    }

    #[test]
    fn test_switch_to_returns_outgoing_snapshot() {
        let mut store = SessionsStore::new();
        let mut first = session("a");
        first.append(Message::user("hello"));
        store.add_session(first);
        store.add_session(session("b"));

        let snapshot = store.switch_to("b").unwrap();
        assert_eq!(snapshot.session_id, "a");
        assert_eq!(store.active_id().map(String::as_str), Some("b"));
    }

    #[test]
    fn test_switch_to_empty_outgoing_yields_no_snapshot() {
        let mut store = SessionsStore::new();
        store.add_session(session("a"));
        store.add_session(session("b"));

        assert!(store.switch_to("b").is_none());
        assert_eq!(store.active_id().map(String::as_str), Some("b"));
    }

    #[test]
    fn test_switch_to_unknown_session_is_a_noop() {
        let mut store = SessionsStore::new();
        store.add_session(session("a"));

        assert!(store.switch_to("missing").is_none());
        assert_eq!(store.active_id().map(String::as_str), Some("a"));
    }

    #[test]
    fn test_set_active() {
        let mut store = SessionsStore::new();
        store.add_session(session("a"));
        store.add_session(session("b"));

        assert!(store.set_active("b"));
        assert!(!store.set_active("missing"));
        assert_eq!(store.active_id().map(String::as_str), Some("b"));
    }

    #[test]
    fn test_delete_active_promotes_another() {
        let mut store = SessionsStore::new();
        store.add_session(session("a"));
        store.add_session(session("b"));

        assert!(store.delete_session("a"));
        assert_eq!(store.active_id().map(String::as_str), Some("b"));
        assert_eq!(store.count(), 1);
    }
}
