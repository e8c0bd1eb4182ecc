use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config;
use crate::error::{ApiError, ApiResult};
use crate::models::{Message, RequestParameters, TokenUsage};

use super::stream_decoder::{self, EventStream};

/// A fully validated completion request: the immutable snapshot handed to
/// the worker at submit time. UI edits after submission cannot affect it.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub parameters: RequestParameters,
    pub timeout: Duration,
}

impl CompletionRequest {
    pub fn new(
        model: impl Into<String>,
        messages: Vec<Message>,
        parameters: RequestParameters,
        timeout: Duration,
    ) -> ApiResult<Self> {
        let request = Self {
            model: model.into(),
            messages,
            parameters,
            timeout,
        };
        request.validate()?;
        Ok(request)
    }

    fn validate(&self) -> ApiResult<()> {
        if self.model.trim().is_empty() {
            return Err(ApiError::Validation("model must not be empty".into()));
        }
        if self.messages.is_empty() {
            return Err(ApiError::Validation("messages must not be empty".into()));
        }
        if self.timeout.is_zero() {
            return Err(ApiError::Validation("timeout must be positive".into()));
        }
        self.parameters.validate()
    }
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    #[serde(flatten)]
    parameters: &'a RequestParameters,
}

/// Non-streaming completion response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletion {
    pub choices: Vec<CompletionChoice>,
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionChoice {
    pub message: Message,
}

impl ChatCompletion {
    /// Final text of the first choice, the field callers actually render.
    pub fn content(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content.as_str())
    }
}

/// HTTP client for the Perplexity chat-completion endpoint.
///
/// Carries the bearer credential, maps transport and HTTP failures to the
/// `ApiError` taxonomy, and keeps a monotonic request counter plus the
/// timestamp of the most recent call for the diagnostics surface.
pub struct PerplexityClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    request_count: AtomicU64,
    last_request_at: Mutex<Option<DateTime<Utc>>>,
}

impl PerplexityClient {
    pub fn new(api_key: impl Into<String>) -> ApiResult<Self> {
        Self::with_base_url(api_key, config::DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> ApiResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ApiError::Validation("API key must not be empty".into()));
        }

        Ok(Self {
            http: reqwest::Client::new(),
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            request_count: AtomicU64::new(0),
            last_request_at: Mutex::new(None),
        })
    }

    /// Number of requests issued by this client. Diagnostics only.
    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// When the most recent request was issued. Diagnostics only.
    pub fn last_request_at(&self) -> Option<DateTime<Utc>> {
        *self.last_request_at.lock()
    }

    fn note_request(&self) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        *self.last_request_at.lock() = Some(Utc::now());
    }

    async fn post_completion(
        &self,
        request: &CompletionRequest,
        stream: bool,
    ) -> ApiResult<reqwest::Response> {
        request.validate()?;
        self.note_request();

        let body = CompletionBody {
            model: &request.model,
            messages: &request.messages,
            stream,
            parameters: &request.parameters,
        };

        debug!(
            model = %request.model,
            message_count = request.messages.len(),
            stream,
            "issuing completion request"
        );

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(request.timeout)
            .json(&body)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(error_for_status(response).await)
        }
    }

    /// Issue a single-shot completion and return the whole response.
    pub async fn chat_completion(&self, request: &CompletionRequest) -> ApiResult<ChatCompletion> {
        let response = self.post_completion(request, false).await?;

        response.json::<ChatCompletion>().await.map_err(|e| {
            ApiError::Protocol {
                status: 200,
                message: format!("malformed completion body: {e}"),
            }
        })
    }

    /// Issue a streaming completion and return the lazy event sequence.
    /// The sequence is finite and consumed exactly once; callers that need
    /// replay must buffer.
    pub async fn chat_completion_stream(
        &self,
        request: &CompletionRequest,
    ) -> ApiResult<EventStream> {
        let response = self.post_completion(request, true).await?;
        let bytes = response.bytes_stream().map_err(ApiError::from);
        Ok(stream_decoder::decode_sse(bytes))
    }
}

/// Map a non-2xx response to the error taxonomy. The upstream message is
/// pulled from the JSON `error.message` field when the body decodes, raw
/// text otherwise.
async fn error_for_status(response: reqwest::Response) -> ApiError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| {
            v.get("error")?
                .get("message")?
                .as_str()
                .map(str::to_string)
        })
        .unwrap_or(body);

    match status {
        401 => ApiError::Authentication(message),
        429 => ApiError::RateLimit(message),
        500..=599 => ApiError::Server { status, message },
        _ => ApiError::Protocol { status, message },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(model: &str, messages: Vec<Message>) -> ApiResult<CompletionRequest> {
        CompletionRequest::new(
            model,
            messages,
            RequestParameters::default(),
            Duration::from_secs(60),
        )
    }

    #[test]
    fn test_empty_api_key_is_rejected() {
        assert!(matches!(
            PerplexityClient::new(""),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            PerplexityClient::new("   "),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn test_empty_model_is_rejected() {
        let err = request("", vec![Message::user("hi")]).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn test_empty_messages_are_rejected() {
        let err = request("sonar", vec![]).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let err = CompletionRequest::new(
            "sonar",
            vec![Message::user("hi")],
            RequestParameters::default(),
            Duration::ZERO,
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn test_out_of_range_parameter_is_rejected() {
        let err = CompletionRequest::new(
            "sonar",
            vec![Message::user("hi")],
            RequestParameters {
                top_p: Some(1.5),
                ..Default::default()
            },
            Duration::from_secs(60),
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn test_request_body_omits_absent_parameters() {
        let request = request("sonar", vec![Message::user("hi")]).unwrap();
        let body = CompletionBody {
            model: &request.model,
            messages: &request.messages,
            stream: false,
            parameters: &request.parameters,
        };
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["model"], "sonar");
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["role"], "user");
        assert!(json.get("temperature").is_none());
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn test_completion_content_extraction() {
        let completion: ChatCompletion = serde_json::from_str(
            r#"{
                "choices": [{"message": {"role": "assistant", "content": "Hello!"}}],
                "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
            }"#,
        )
        .unwrap();

        assert_eq!(completion.content(), Some("Hello!"));
        assert_eq!(completion.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn test_request_counter_is_monotonic() {
        let client = PerplexityClient::new("test-key").unwrap();
        assert_eq!(client.request_count(), 0);
        assert!(client.last_request_at().is_none());

        client.note_request();
        client.note_request();
        assert_eq!(client.request_count(), 2);
        assert!(client.last_request_at().is_some());
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client =
            PerplexityClient::with_base_url("test-key", "http://localhost:8080/").unwrap();
        assert_eq!(client.base_url, "http://localhost:8080");
    }
}
