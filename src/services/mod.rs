pub mod api_client;
pub mod auto_persist;
pub mod stream_decoder;

pub use api_client::{ChatCompletion, CompletionRequest, PerplexityClient};
pub use auto_persist::{AutoPersistScheduler, DEFAULT_PERSIST_INTERVAL};
pub use stream_decoder::{DATA_PREFIX, DONE_SENTINEL, EventStream, StreamEvent, decode_sse};
