//! Core request/response pipeline for a desktop Perplexity chat client.
//!
//! The crate owns everything between the submit affordance and the durable
//! transcript: the HTTP transport, the incremental-response decoder, the
//! single-outstanding-request coordinator, the conversation log, the
//! "thinking" placeholder lifecycle, and the periodic auto-save. It has no
//! UI of its own; a shell drives it from a single-threaded event loop that
//! polls [`RequestCoordinator::drain`] on a short fixed interval.
//!
//! A typical turn:
//!
//! ```no_run
//! use std::sync::Arc;
//! use sonarchat::controllers::{RequestCoordinator, SubmitOptions};
//! use sonarchat::models::{Conversation, Message, PendingTurnController, TurnUpdate};
//! use sonarchat::services::PerplexityClient;
//!
//! # fn demo() -> anyhow::Result<()> {
//! let client = Arc::new(PerplexityClient::new(
//!     sonarchat::config::load_api_key().expect("no API key configured"),
//! )?);
//! let mut coordinator = RequestCoordinator::with_client(client);
//! let mut conversation = Conversation::new("sonar", "You are concise.");
//! let mut pending = PendingTurnController::new();
//!
//! conversation.append(Message::user("Hello!"));
//! pending.show_placeholder();
//! coordinator.start(&conversation, &SubmitOptions::default())?;
//!
//! // ...then on every UI tick:
//! for event in coordinator.drain() {
//!     match pending.resolve(&event) {
//!         TurnUpdate::Completed(message) => conversation.append(message),
//!         TurnUpdate::Partial(_text) => { /* redraw the partial turn */ }
//!         TurnUpdate::Failed(_note) => { /* show the error annotation */ }
//!         TurnUpdate::None => {}
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod controllers;
pub mod error;
pub mod models;
pub mod repositories;
pub mod services;

pub use controllers::{CoordinatorError, RequestCoordinator, RequestState, SubmitOptions};
pub use error::{ApiError, ApiResult};
pub use models::{Conversation, Message, PendingTurnController, Role, SessionsStore, TurnUpdate};
pub use services::{AutoPersistScheduler, PerplexityClient, StreamEvent};

/// Initialize structured logging. Call once from the host shell.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();
}
