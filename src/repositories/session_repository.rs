use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::RepositoryResult;
use crate::models::Message;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Serializable session snapshot. This is the JSON document the save/load
/// and export collaborators consume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub conversation_history: Vec<Message>,
    pub system_prompt: String,
    pub model: String,
    #[serde(default)]
    pub template: Option<String>,
    pub session_id: String,
    pub saved_at: DateTime<Utc>,
}

/// Repository trait for session persistence.
pub trait SessionRepository: Send + Sync + 'static {
    /// Load all persisted sessions, most recently saved first.
    fn load_all(&self) -> BoxFuture<'static, RepositoryResult<Vec<SessionData>>>;

    /// Load a single session by ID.
    fn load_one(&self, id: &str) -> BoxFuture<'static, RepositoryResult<Option<SessionData>>>;

    /// Save a session snapshot.
    fn save(&self, id: &str, data: SessionData) -> BoxFuture<'static, RepositoryResult<()>>;

    /// Delete a persisted session.
    fn delete(&self, id: &str) -> BoxFuture<'static, RepositoryResult<()>>;
}
