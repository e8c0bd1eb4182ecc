use futures::stream::{BoxStream, Stream, StreamExt};
use serde::Deserialize;
use tracing::warn;

use crate::models::TokenUsage;

/// Prefix carried by every payload line of the incremental protocol.
/// Lines without it (comments, keep-alives, blanks) are ignored.
pub const DATA_PREFIX: &str = "data: ";

/// Payload that closes the stream. Checked before JSON parsing.
pub const DONE_SENTINEL: &str = "[DONE]";

/// A decoded protocol event. Produced lazily by the decoder, consumed once
/// by the coordinator's drain, never stored.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Incremental assistant text. Never empty.
    ContentDelta(String),
    /// Token counters, usually on the final frame before the sentinel.
    Usage(TokenUsage),
    /// End of stream. Exactly one per request on the success path.
    Done,
    /// Terminal failure. Exactly one per request on the failure path.
    Error(String),
}

/// Lazy event sequence for one request. Finite, consumed exactly once,
/// not restartable.
pub type EventStream = BoxStream<'static, StreamEvent>;

#[derive(Debug, Deserialize)]
struct StreamFrame {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

enum Frame {
    Events(Vec<StreamEvent>),
    Done,
    Ignored,
}

/// Decode one protocol line. Malformed JSON payloads are dropped with a
/// warning; the stream continues.
fn decode_frame(line: &str) -> Frame {
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return Frame::Ignored;
    };

    if payload.trim() == DONE_SENTINEL {
        return Frame::Done;
    }

    match serde_json::from_str::<StreamFrame>(payload) {
        Ok(frame) => {
            let mut events = Vec::new();
            if let Some(content) = frame.choices.first().and_then(|c| c.delta.content.as_deref())
                && !content.is_empty()
            {
                events.push(StreamEvent::ContentDelta(content.to_string()));
            }
            if let Some(usage) = frame.usage {
                events.push(StreamEvent::Usage(usage));
            }
            Frame::Events(events)
        }
        Err(error) => {
            warn!(%error, payload, "dropping malformed stream frame");
            Frame::Ignored
        }
    }
}

/// Turn a raw transport byte stream into a lazy sequence of [`StreamEvent`].
///
/// Framing follows the newline-delimited `data: <json>` protocol terminated
/// by `data: [DONE]`. A transport failure mid-iteration terminates the
/// sequence with a single `Error` event. The underlying connection is owned
/// by the returned stream, so it is released when the stream completes or is
/// dropped, including on early termination and consumer abandonment.
pub fn decode_sse<S, B, E>(bytes: S) -> EventStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut bytes = std::pin::pin!(bytes);
        let mut buffer: Vec<u8> = Vec::new();

        loop {
            match bytes.next().await {
                Some(Ok(chunk)) => {
                    buffer.extend_from_slice(chunk.as_ref());

                    while let Some(newline) = buffer.iter().position(|&b| b == b'\n') {
                        let raw: Vec<u8> = buffer.drain(..=newline).collect();
                        let line = String::from_utf8_lossy(&raw);
                        match decode_frame(line.trim_end_matches(['\n', '\r'])) {
                            Frame::Events(events) => {
                                for event in events {
                                    yield event;
                                }
                            }
                            Frame::Done => {
                                yield StreamEvent::Done;
                                return;
                            }
                            Frame::Ignored => {}
                        }
                    }
                }
                Some(Err(error)) => {
                    yield StreamEvent::Error(error.to_string());
                    return;
                }
                None => break,
            }
        }

        // Trailing line without a final newline.
        if !buffer.is_empty() {
            let line = String::from_utf8_lossy(&buffer);
            match decode_frame(line.trim_end_matches('\r')) {
                Frame::Events(events) => {
                    for event in events {
                        yield event;
                    }
                }
                Frame::Done => {
                    yield StreamEvent::Done;
                    return;
                }
                Frame::Ignored => {}
            }
        }

        // Upstream closed without the sentinel; still emit one terminal event.
        yield StreamEvent::Done;
    })
}
