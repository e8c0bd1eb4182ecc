pub mod conversation;
pub mod message;
pub mod parameters;
pub mod pending_turn;
pub mod sessions_store;
pub mod token_usage;

pub use conversation::{Conversation, DEFAULT_MAX_HISTORY};
pub use message::{Message, Role};
pub use parameters::RequestParameters;
pub use pending_turn::{PendingTurnController, THINKING_FRAMES, TurnUpdate};
pub use sessions_store::SessionsStore;
pub use token_usage::{SessionTokenUsage, TokenUsage};
