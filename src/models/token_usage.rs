use serde::{Deserialize, Serialize};

/// Token usage for a single exchange, as reported by the endpoint's
/// `usage` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Aggregated usage across a session, shown in the API stats surface.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionTokenUsage {
    /// Per-exchange usage in arrival order.
    pub exchange_usages: Vec<TokenUsage>,

    /// Cached totals for quick access.
    pub total_prompt_tokens: u32,
    pub total_completion_tokens: u32,
}

impl SessionTokenUsage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_usage(&mut self, usage: TokenUsage) {
        self.total_prompt_tokens += usage.prompt_tokens;
        self.total_completion_tokens += usage.completion_tokens;
        self.exchange_usages.push(usage);
    }

    pub fn total_tokens(&self) -> u32 {
        self.total_prompt_tokens + self.total_completion_tokens
    }
}
