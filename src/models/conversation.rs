use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::message::{Message, Role};
use super::token_usage::{SessionTokenUsage, TokenUsage};
use crate::config;
use crate::repositories::SessionData;

/// Retention ceiling applied to the in-memory log by default.
pub const DEFAULT_MAX_HISTORY: usize = 1000;

/// One chat session: an append-only ordered log of messages plus the system
/// prompt and model selection it was exchanged under.
///
/// The log is the source of truth for what gets sent upstream and what gets
/// persisted. It is mutated only on the UI loop, never by the request worker;
/// an in-flight request operates on a snapshot taken at submit time
/// (`request_messages`).
pub struct Conversation {
    id: String,
    model: String,
    system_prompt: String,
    template: Option<String>,
    history: Vec<Message>,
    token_usage: SessionTokenUsage,
    max_history: usize,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(model: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), model, system_prompt)
    }

    pub fn with_id(
        id: impl Into<String>,
        model: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            model: model.into(),
            system_prompt: system_prompt.into(),
            template: None,
            history: Vec::new(),
            token_usage: SessionTokenUsage::new(),
            max_history: DEFAULT_MAX_HISTORY,
            created_at: now,
            updated_at: now,
        }
    }

    /// Restore a session from persisted data.
    pub fn from_data(data: SessionData) -> Self {
        Self {
            id: data.session_id,
            model: data.model,
            system_prompt: data.system_prompt,
            template: data.template,
            history: data.conversation_history,
            token_usage: SessionTokenUsage::new(),
            max_history: DEFAULT_MAX_HISTORY,
            created_at: data.saved_at,
            updated_at: data.saved_at,
        }
    }

    /// Snapshot the session into the persistence shape.
    pub fn to_data(&self) -> SessionData {
        SessionData {
            conversation_history: self.history.clone(),
            system_prompt: self.system_prompt.clone(),
            model: self.model.clone(),
            template: self.template.clone(),
            session_id: self.id.clone(),
            saved_at: Utc::now(),
        }
    }

    /// Append a message to the log. The only mutation primitive exposed to
    /// the pipeline; when the retention ceiling is reached the oldest entry
    /// is evicted first.
    pub fn append(&mut self, message: Message) {
        if self.history.len() >= self.max_history {
            self.history.remove(0);
        }
        self.history.push(message);
        self.updated_at = Utc::now();
    }

    /// Remove the trailing assistant turn (if present) and the user turn
    /// preceding it, returning that user turn for re-submission. Returns
    /// `None` when the log does not end in a user turn or an exchange.
    pub fn pop_last_exchange(&mut self) -> Option<Message> {
        if matches!(self.history.last(), Some(m) if m.role == Role::Assistant) {
            self.history.pop();
        }
        if matches!(self.history.last(), Some(m) if m.role == Role::User) {
            self.updated_at = Utc::now();
            return self.history.pop();
        }
        None
    }

    /// Clear the log. Truncation is an explicit operation, guarded by user
    /// confirmation at the UI boundary.
    pub fn clear(&mut self) {
        self.history.clear();
        self.token_usage = SessionTokenUsage::new();
        self.updated_at = Utc::now();
    }

    /// Build the outgoing message list for a request: the system prompt (when
    /// non-empty) prepended to a clone of the full log. Later mutations to
    /// the live log do not affect the returned snapshot.
    pub fn request_messages(&self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.history.len() + 1);
        if !self.system_prompt.is_empty() {
            messages.push(Message::system(self.system_prompt.clone()));
        }
        messages.extend(self.history.iter().cloned());
        messages
    }

    /// Apply a named template: sets both the template name and its system
    /// prompt. Returns false when the name is unknown.
    pub fn apply_template(&mut self, name: &str) -> bool {
        match config::template_prompt(name) {
            Some(prompt) => {
                self.template = Some(name.to_string());
                self.system_prompt = prompt.to_string();
                self.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    pub fn record_usage(&mut self, usage: TokenUsage) {
        self.token_usage.add_usage(usage);
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
        self.updated_at = Utc::now();
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.system_prompt = prompt.into();
        self.updated_at = Utc::now();
    }

    pub fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn token_usage(&self) -> &SessionTokenUsage {
        &self.token_usage
    }

    pub fn set_max_history(&mut self, max_history: usize) {
        self.max_history = max_history.max(1);
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_preserves_order() {
        let mut conv = Conversation::new("sonar", "");
        conv.append(Message::user("first"));
        conv.append(Message::assistant("second"));
        conv.append(Message::user("third"));

        let contents: Vec<&str> = conv.history().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["first", "second", "third"]);
    }

    #[test]
    fn test_retention_ceiling_evicts_oldest() {
        let mut conv = Conversation::new("sonar", "");
        conv.set_max_history(3);
        for i in 0..5 {
            conv.append(Message::user(format!("msg-{i}")));
        }

        assert_eq!(conv.len(), 3);
        assert_eq!(conv.history()[0].content, "msg-2");
        assert_eq!(conv.history()[2].content, "msg-4");
    }

    #[test]
    fn test_request_messages_prepends_system_prompt() {
        let mut conv = Conversation::new("sonar", "Be terse.");
        conv.append(Message::user("hi"));

        let messages = conv.request_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, "Be terse.");
        assert_eq!(messages[1].role, Role::User);
    }

    #[test]
    fn test_request_messages_skips_empty_system_prompt() {
        let mut conv = Conversation::new("sonar", "");
        conv.append(Message::user("hi"));

        let messages = conv.request_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::User);
    }

    #[test]
    fn test_request_messages_is_a_snapshot() {
        let mut conv = Conversation::new("sonar", "");
        conv.append(Message::user("hi"));
        let snapshot = conv.request_messages();

        conv.append(Message::user("later"));
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn test_pop_last_exchange_removes_assistant_and_user() {
        let mut conv = Conversation::new("sonar", "");
        conv.append(Message::user("A"));
        conv.append(Message::assistant("B"));

        let popped = conv.pop_last_exchange().unwrap();
        assert_eq!(popped.content, "A");
        assert!(conv.is_empty());
    }

    #[test]
    fn test_pop_last_exchange_with_trailing_user_turn() {
        let mut conv = Conversation::new("sonar", "");
        conv.append(Message::user("A"));

        let popped = conv.pop_last_exchange().unwrap();
        assert_eq!(popped.content, "A");
        assert!(conv.is_empty());
    }

    #[test]
    fn test_pop_last_exchange_on_empty_log() {
        let mut conv = Conversation::new("sonar", "");
        assert!(conv.pop_last_exchange().is_none());
    }

    #[test]
    fn test_data_round_trip() {
        for n in [0usize, 1, 3] {
            let mut conv = Conversation::new("sonar-pro", "prompt");
            for i in 0..n {
                conv.append(Message::user(format!("u{i}")));
            }

            let restored = Conversation::from_data(conv.to_data());
            assert_eq!(restored.id(), conv.id());
            assert_eq!(restored.model(), "sonar-pro");
            assert_eq!(restored.system_prompt(), "prompt");
            assert_eq!(restored.history(), conv.history());
        }
    }

    #[test]
    fn test_apply_template_sets_prompt() {
        let mut conv = Conversation::new("sonar", "");
        assert!(conv.apply_template("Code Helper"));
        assert_eq!(conv.template(), Some("Code Helper"));
        assert!(conv.system_prompt().contains("programmer"));

        assert!(!conv.apply_template("No Such Template"));
        assert_eq!(conv.template(), Some("Code Helper"));
    }
}
