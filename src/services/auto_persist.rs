use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::models::Conversation;
use crate::repositories::SessionRepository;

/// Default snapshot period: five minutes.
pub const DEFAULT_PERSIST_INTERVAL: Duration = Duration::from_secs(300);

/// Periodic, idle-tolerant auto-save of the active session.
///
/// Driven by the UI loop: call [`tick`](Self::tick) on every poll cycle and
/// the scheduler snapshots at most once per interval. The write itself runs
/// on the runtime so interactive use never blocks on disk I/O. A persistence
/// failure is logged and the timer continues; it is never surfaced to the
/// request pipeline.
pub struct AutoPersistScheduler {
    repository: Arc<dyn SessionRepository>,
    interval: Duration,
    last_run: Instant,
    enabled: bool,
}

impl AutoPersistScheduler {
    pub fn new(repository: Arc<dyn SessionRepository>) -> Self {
        Self::with_interval(repository, DEFAULT_PERSIST_INTERVAL)
    }

    pub fn with_interval(repository: Arc<dyn SessionRepository>, interval: Duration) -> Self {
        Self {
            repository,
            interval,
            last_run: Instant::now(),
            enabled: true,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Snapshot the session if auto-save is enabled, the log is non-empty,
    /// and the interval has elapsed. Returns the handle of the spawned save
    /// task, or `None` when nothing was persisted this tick.
    pub fn tick(&mut self, session: &Conversation) -> Option<JoinHandle<()>> {
        if !self.enabled || session.is_empty() {
            return None;
        }
        if self.last_run.elapsed() < self.interval {
            return None;
        }

        // Reset the timer up front so a slow or failing save cannot stall
        // the cadence.
        self.last_run = Instant::now();
        Some(self.spawn_save(session))
    }

    /// Persist immediately, outside the periodic cadence. Used when
    /// switching away from a session.
    pub fn persist_now(&self, session: &Conversation) -> JoinHandle<()> {
        self.spawn_save(session)
    }

    fn spawn_save(&self, session: &Conversation) -> JoinHandle<()> {
        let data = session.to_data();
        let session_id = data.session_id.clone();
        let repository = self.repository.clone();

        tokio::spawn(async move {
            match repository.save(&session_id, data).await {
                Ok(()) => debug!(session_id = %session_id, "auto-saved session"),
                Err(error) => {
                    warn!(session_id = %session_id, error = ?error, "auto-save failed")
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Message;
    use crate::repositories::InMemorySessionRepository;

    fn session_with_message() -> Conversation {
        let mut session = Conversation::new("sonar", "");
        session.append(Message::user("hello"));
        session
    }

    #[tokio::test]
    async fn test_tick_persists_after_interval() {
        let repo = Arc::new(InMemorySessionRepository::new());
        let mut scheduler = AutoPersistScheduler::with_interval(repo.clone(), Duration::ZERO);
        let session = session_with_message();

        let handle = scheduler.tick(&session).expect("should persist");
        handle.await.unwrap();

        let saved = repo.load_one(session.id()).await.unwrap().unwrap();
        assert_eq!(saved.conversation_history.len(), 1);
    }

    #[tokio::test]
    async fn test_tick_skips_before_interval() {
        let repo = Arc::new(InMemorySessionRepository::new());
        let mut scheduler =
            AutoPersistScheduler::with_interval(repo.clone(), Duration::from_secs(3600));
        let session = session_with_message();

        assert!(scheduler.tick(&session).is_none());
    }

    #[tokio::test]
    async fn test_tick_skips_empty_session() {
        let repo = Arc::new(InMemorySessionRepository::new());
        let mut scheduler = AutoPersistScheduler::with_interval(repo.clone(), Duration::ZERO);
        let session = Conversation::new("sonar", "");

        assert!(scheduler.tick(&session).is_none());
    }

    #[tokio::test]
    async fn test_tick_respects_disabled_flag() {
        let repo = Arc::new(InMemorySessionRepository::new());
        let mut scheduler = AutoPersistScheduler::with_interval(repo.clone(), Duration::ZERO);
        scheduler.set_enabled(false);
        let session = session_with_message();

        assert!(scheduler.tick(&session).is_none());
    }

    #[tokio::test]
    async fn test_persist_now_ignores_cadence() {
        let repo = Arc::new(InMemorySessionRepository::new());
        let scheduler =
            AutoPersistScheduler::with_interval(repo.clone(), Duration::from_secs(3600));
        let session = session_with_message();

        scheduler.persist_now(&session).await.unwrap();

        assert!(repo.load_one(session.id()).await.unwrap().is_some());
    }
}
