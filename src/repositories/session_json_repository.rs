use std::path::PathBuf;

use super::error::{RepositoryError, RepositoryResult};
use super::session_repository::{BoxFuture, SessionData, SessionRepository};
use crate::config;

/// JSON file-based repository for sessions.
/// Stores each session as a separate file in `<config>/sonarchat/sessions/`.
pub struct JsonSessionRepository {
    sessions_dir: PathBuf,
}

impl JsonSessionRepository {
    pub fn new() -> RepositoryResult<Self> {
        let sessions_dir = config::config_dir()
            .ok_or_else(|| RepositoryError::Initialization {
                message: "could not determine config directory".to_string(),
            })?
            .join("sessions");

        Ok(Self { sessions_dir })
    }

    /// Use an explicit directory instead of the config-dir default.
    pub fn with_dir(sessions_dir: impl Into<PathBuf>) -> Self {
        Self {
            sessions_dir: sessions_dir.into(),
        }
    }

    fn session_path(&self, id: &str) -> PathBuf {
        self.sessions_dir.join(format!("{id}.json"))
    }
}

impl SessionRepository for JsonSessionRepository {
    fn load_all(&self) -> BoxFuture<'static, RepositoryResult<Vec<SessionData>>> {
        let sessions_dir = self.sessions_dir.clone();

        Box::pin(async move {
            tokio::fs::create_dir_all(&sessions_dir).await?;

            let mut sessions = Vec::new();
            let mut entries = tokio::fs::read_dir(&sessions_dir).await?;

            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if path.extension().and_then(|s| s.to_str()) == Some("json") {
                    let content = tokio::fs::read_to_string(&path).await?;
                    let data: SessionData = serde_json::from_str(&content)?;
                    sessions.push(data);
                }
            }

            // Most recently saved first
            sessions.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));

            Ok(sessions)
        })
    }

    fn load_one(&self, id: &str) -> BoxFuture<'static, RepositoryResult<Option<SessionData>>> {
        let path = self.session_path(id);

        Box::pin(async move {
            match tokio::fs::read_to_string(&path).await {
                Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    fn save(&self, id: &str, data: SessionData) -> BoxFuture<'static, RepositoryResult<()>> {
        let path = self.session_path(id);
        let sessions_dir = self.sessions_dir.clone();

        Box::pin(async move {
            tokio::fs::create_dir_all(&sessions_dir).await?;

            let json = serde_json::to_string_pretty(&data)?;

            // Write atomically: temp file first, then rename over the target.
            let temp_path = path.with_extension("json.tmp");
            tokio::fs::write(&temp_path, json).await?;
            tokio::fs::rename(&temp_path, &path).await?;

            Ok(())
        })
    }

    fn delete(&self, id: &str) -> BoxFuture<'static, RepositoryResult<()>> {
        let path = self.session_path(id);

        Box::pin(async move {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::models::Message;

    fn data(id: &str) -> SessionData {
        SessionData {
            conversation_history: vec![Message::user("hi"), Message::assistant("hello")],
            system_prompt: "Be helpful.".into(),
            model: "sonar".into(),
            template: None,
            session_id: id.into(),
            saved_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_save_and_load_one() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonSessionRepository::with_dir(dir.path());

        repo.save("s1", data("s1")).await.unwrap();

        let loaded = repo.load_one("s1").await.unwrap().unwrap();
        assert_eq!(loaded.session_id, "s1");
        assert_eq!(loaded.conversation_history.len(), 2);
        assert_eq!(loaded.conversation_history[0].content, "hi");
    }

    #[tokio::test]
    async fn test_load_one_missing_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonSessionRepository::with_dir(dir.path());

        assert!(repo.load_one("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_overwrites_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonSessionRepository::with_dir(dir.path());

        repo.save("s1", data("s1")).await.unwrap();
        let mut updated = data("s1");
        updated.conversation_history.push(Message::user("more"));
        repo.save("s1", updated).await.unwrap();

        let loaded = repo.load_one("s1").await.unwrap().unwrap();
        assert_eq!(loaded.conversation_history.len(), 3);

        // No temp file left behind
        assert!(!dir.path().join("s1.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_load_all_sorted_by_saved_at() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonSessionRepository::with_dir(dir.path());

        let mut older = data("older");
        older.saved_at = Utc::now() - chrono::Duration::hours(1);
        repo.save("older", older).await.unwrap();
        repo.save("newer", data("newer")).await.unwrap();

        let all = repo.load_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].session_id, "newer");
        assert_eq!(all[1].session_id, "older");
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonSessionRepository::with_dir(dir.path());

        repo.save("s1", data("s1")).await.unwrap();
        repo.delete("s1").await.unwrap();
        repo.delete("s1").await.unwrap();

        assert!(repo.load_one("s1").await.unwrap().is_none());
    }
}
