use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config;
use crate::error::ApiError;
use crate::models::{Conversation, RequestParameters};
use crate::services::api_client::{CompletionRequest, PerplexityClient};
use crate::services::stream_decoder::StreamEvent;

/// Lifecycle of the single outstanding request.
///
/// `Idle → Sending → (Streaming | AwaitingFullResponse) → Idle`, with an
/// `Idle → Idle` self-transition when validation fails before any network
/// call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    Sending,
    Streaming,
    AwaitingFullResponse,
}

#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// A second `start` while a request is outstanding. The in-flight
    /// request is unaffected; the call is neither queued nor cancels it.
    #[error("a request is already in flight")]
    Busy,

    /// No client configured: the credential is absent or empty.
    #[error("no API client configured; set an API key first")]
    NotConfigured,

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Per-submission knobs, captured alongside the conversation snapshot.
#[derive(Debug, Clone)]
pub struct SubmitOptions {
    pub parameters: RequestParameters,
    pub stream: bool,
    pub timeout: Duration,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            parameters: RequestParameters::default(),
            stream: true,
            timeout: config::DEFAULT_TIMEOUT,
        }
    }
}

/// Runs one completion request at a time off the UI thread.
///
/// `start` snapshots the conversation, spawns a worker for the blocking
/// network I/O, and hands decoded events back through a single-producer
/// FIFO queue. The UI loop calls [`drain`](Self::drain) on its polling
/// cadence; the conversation log itself is only ever mutated on the UI
/// loop, after draining, never by the worker.
///
/// There is no mid-flight cancellation: once sending, a request runs to
/// completion or natural failure. Dropping the coordinator (or switching
/// sessions) merely drops the receiver, which suppresses further UI
/// updates from that request's eventual events.
pub struct RequestCoordinator {
    client: Option<Arc<PerplexityClient>>,
    state: RequestState,
    events: Option<UnboundedReceiver<StreamEvent>>,
    worker: Option<JoinHandle<()>>,
}

impl RequestCoordinator {
    pub fn new() -> Self {
        Self {
            client: None,
            state: RequestState::Idle,
            events: None,
            worker: None,
        }
    }

    pub fn with_client(client: Arc<PerplexityClient>) -> Self {
        let mut coordinator = Self::new();
        coordinator.client = Some(client);
        coordinator
    }

    /// Install or replace the API client. Does not affect an in-flight
    /// request, which captured its own client reference at submit time.
    pub fn set_client(&mut self, client: Arc<PerplexityClient>) {
        self.client = Some(client);
    }

    pub fn has_client(&self) -> bool {
        self.client.is_some()
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == RequestState::Idle
    }

    /// Submit the conversation for completion. Only legal from `Idle`.
    ///
    /// The outgoing message list is the system prompt (when non-empty)
    /// prepended to a snapshot of the full log taken here; later mutations
    /// to the live log do not affect the in-flight request. Validation
    /// failures return before any network call and leave the state `Idle`.
    pub fn start(
        &mut self,
        conversation: &Conversation,
        options: &SubmitOptions,
    ) -> Result<(), CoordinatorError> {
        if self.state != RequestState::Idle {
            return Err(CoordinatorError::Busy);
        }
        let client = self.client.clone().ok_or(CoordinatorError::NotConfigured)?;

        let request = CompletionRequest::new(
            conversation.model(),
            conversation.request_messages(),
            options.parameters.clone(),
            options.timeout,
        )?;

        let (tx, rx) = mpsc::unbounded_channel();
        let streaming = options.stream;

        debug!(
            session_id = %conversation.id(),
            model = %request.model,
            streaming,
            "starting completion request"
        );

        self.worker = Some(tokio::spawn(run_request(client, request, streaming, tx)));
        self.events = Some(rx);
        self.state = if streaming {
            RequestState::Sending
        } else {
            RequestState::AwaitingFullResponse
        };
        Ok(())
    }

    /// Regenerate the most recent assistant turn: pop it together with the
    /// user turn preceding it, re-append the user turn, and re-submit.
    pub fn regenerate(
        &mut self,
        conversation: &mut Conversation,
        options: &SubmitOptions,
    ) -> Result<(), CoordinatorError> {
        if self.state != RequestState::Idle {
            return Err(CoordinatorError::Busy);
        }
        if self.client.is_none() {
            return Err(CoordinatorError::NotConfigured);
        }

        let user_turn = conversation.pop_last_exchange().ok_or_else(|| {
            CoordinatorError::Api(ApiError::Validation(
                "no user turn to regenerate from".into(),
            ))
        })?;
        conversation.append(user_turn);

        self.start(conversation, options)
    }

    /// Consume every event currently queued, in production order. Called on
    /// the UI loop's fixed polling cadence; drains until empty each tick so
    /// bursts cannot back up. Updates the request state as terminal events
    /// pass through.
    pub fn drain(&mut self) -> Vec<StreamEvent> {
        let Some(receiver) = self.events.as_mut() else {
            return Vec::new();
        };

        let mut drained = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            match &event {
                StreamEvent::ContentDelta(_) => {
                    if self.state == RequestState::Sending {
                        self.state = RequestState::Streaming;
                    }
                }
                StreamEvent::Done | StreamEvent::Error(_) => {
                    self.state = RequestState::Idle;
                }
                StreamEvent::Usage(_) => {}
            }
            drained.push(event);
        }

        if self.state == RequestState::Idle && !drained.is_empty() {
            // Terminal event seen; release the queue and the worker handle.
            // The task itself is detached and finishes on its own.
            self.events = None;
            self.worker = None;
        }

        drained
    }
}

impl Default for RequestCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Worker body: performs all blocking network I/O and forwards events into
/// the queue. A send failure means the UI side dropped the receiver; the
/// request still runs to completion, only its updates are suppressed.
async fn run_request(
    client: Arc<PerplexityClient>,
    request: CompletionRequest,
    streaming: bool,
    tx: UnboundedSender<StreamEvent>,
) {
    if streaming {
        match client.chat_completion_stream(&request).await {
            Ok(mut events) => {
                while let Some(event) = events.next().await {
                    if tx.send(event).is_err() {
                        debug!("event queue closed; suppressing remaining updates");
                        break;
                    }
                }
            }
            Err(error) => {
                warn!(error = %error, "streaming request failed");
                let _ = tx.send(StreamEvent::Error(error.to_string()));
            }
        }
    } else {
        match client.chat_completion(&request).await {
            Ok(completion) => {
                let Some(content) = completion.content().map(str::to_string) else {
                    let _ = tx.send(StreamEvent::Error(
                        "response contained no choices".to_string(),
                    ));
                    return;
                };
                if !content.is_empty() {
                    let _ = tx.send(StreamEvent::ContentDelta(content));
                }
                if let Some(usage) = completion.usage {
                    let _ = tx.send(StreamEvent::Usage(usage));
                }
                let _ = tx.send(StreamEvent::Done);
            }
            Err(error) => {
                warn!(error = %error, "completion request failed");
                let _ = tx.send(StreamEvent::Error(error.to_string()));
            }
        }
    }
}
