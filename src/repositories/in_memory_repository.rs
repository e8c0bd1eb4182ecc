use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::error::RepositoryResult;
use super::session_repository::{BoxFuture, SessionData, SessionRepository};

/// In-memory repository for sessions.
/// Useful for testing and development.
#[derive(Clone, Default)]
pub struct InMemorySessionRepository {
    sessions: Arc<Mutex<HashMap<String, SessionData>>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionRepository for InMemorySessionRepository {
    fn load_all(&self) -> BoxFuture<'static, RepositoryResult<Vec<SessionData>>> {
        let sessions = self.sessions.clone();

        Box::pin(async move {
            let store = sessions.lock();
            let mut result: Vec<SessionData> = store.values().cloned().collect();
            result.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
            Ok(result)
        })
    }

    fn load_one(&self, id: &str) -> BoxFuture<'static, RepositoryResult<Option<SessionData>>> {
        let sessions = self.sessions.clone();
        let id = id.to_string();

        Box::pin(async move { Ok(sessions.lock().get(&id).cloned()) })
    }

    fn save(&self, id: &str, data: SessionData) -> BoxFuture<'static, RepositoryResult<()>> {
        let sessions = self.sessions.clone();
        let id = id.to_string();

        Box::pin(async move {
            sessions.lock().insert(id, data);
            Ok(())
        })
    }

    fn delete(&self, id: &str) -> BoxFuture<'static, RepositoryResult<()>> {
        let sessions = self.sessions.clone();
        let id = id.to_string();

        Box::pin(async move {
            sessions.lock().remove(&id);
            Ok(())
        })
    }
}
