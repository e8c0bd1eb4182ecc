use super::message::Message;
use crate::services::StreamEvent;

/// Rotating placeholder text shown while the assistant has produced nothing.
pub const THINKING_FRAMES: [&str; 3] = ["Thinking.", "Thinking..", "Thinking..."];

/// State of the single transient turn an outstanding request may own.
struct PendingTurn {
    /// True once the first real content chunk has replaced the placeholder.
    promoted: bool,
    accumulated: String,
}

/// What the UI should do with the transcript after resolving an event.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnUpdate {
    /// Replace the placeholder (or the partial turn) with this text so far.
    Partial(String),
    /// The turn is complete: append this message to the conversation log.
    Completed(Message),
    /// The request failed: show this annotation where the placeholder was.
    Failed(String),
    /// Nothing visible changed.
    None,
}

/// Manages the "assistant is thinking" placeholder and its promotion into
/// real content. At most one placeholder exists at a time; it is never
/// written to the conversation log.
pub struct PendingTurnController {
    pending: Option<PendingTurn>,
    frame: usize,
}

impl PendingTurnController {
    pub fn new() -> Self {
        Self {
            pending: None,
            frame: 0,
        }
    }

    /// Insert the transient placeholder turn, replacing any existing one.
    /// Returns the placeholder text to display.
    pub fn show_placeholder(&mut self) -> &'static str {
        self.pending = Some(PendingTurn {
            promoted: false,
            accumulated: String::new(),
        });
        THINKING_FRAMES[self.frame % THINKING_FRAMES.len()]
    }

    /// Advance the thinking animation. Returns the next frame while the
    /// placeholder is still unpromoted, `None` otherwise.
    pub fn next_frame(&mut self) -> Option<&'static str> {
        match &self.pending {
            Some(turn) if !turn.promoted => {
                self.frame = (self.frame + 1) % THINKING_FRAMES.len();
                Some(THINKING_FRAMES[self.frame])
            }
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Text accumulated so far for the in-progress turn.
    pub fn accumulated(&self) -> Option<&str> {
        self.pending.as_ref().map(|t| t.accumulated.as_str())
    }

    /// Fold a stream event into the pending turn. Calling this with no
    /// placeholder pending is a safe no-op, so a late drain after the turn
    /// already resolved cannot corrupt the transcript.
    pub fn resolve(&mut self, event: &StreamEvent) -> TurnUpdate {
        let Some(mut turn) = self.pending.take() else {
            return TurnUpdate::None;
        };

        match event {
            StreamEvent::ContentDelta(text) => {
                turn.promoted = true;
                turn.accumulated.push_str(text);
                let update = TurnUpdate::Partial(turn.accumulated.clone());
                self.pending = Some(turn);
                update
            }
            StreamEvent::Usage(_) => {
                self.pending = Some(turn);
                TurnUpdate::None
            }
            StreamEvent::Done => TurnUpdate::Completed(Message::assistant(turn.accumulated)),
            StreamEvent::Error(message) => TurnUpdate::Failed(message.clone()),
        }
    }
}

impl Default for PendingTurnController {
    fn default() -> Self {
        Self::new()
    }
}
