use std::path::PathBuf;
use std::time::Duration;

use crate::models::RequestParameters;

/// Base URL of the Perplexity completion endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.perplexity.ai";

/// Model selected when the user has not picked one.
pub const DEFAULT_MODEL: &str = "sonar";

/// Per-request transport timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Environment variable consulted first for the bearer credential.
pub const API_KEY_ENV: &str = "PERPLEXITY_API_KEY";

const API_KEY_FILE: &str = "api_key.txt";

/// Known model identifiers, newest families first.
pub const AVAILABLE_MODELS: &[&str] = &[
    "sonar-pro",
    "sonar-deep-research",
    "sonar-reasoning-pro",
    "sonar-reasoning",
    "sonar",
    "llama-3-sonar-small-32k-chat",
    "llama-3-sonar-small-32k-online",
    "llama-3-sonar-large-32k-chat",
    "llama-3-sonar-large-32k-online",
    "codellama-70b-instruct",
    "mistral-7b-instruct",
    "mixtral-8x7b-instruct",
    "llama-3-8b-instruct",
    "llama-3-70b-instruct",
    "r1-1776",
];

/// Named system-prompt presets selectable when starting a session.
pub const CONVERSATION_TEMPLATES: &[(&str, &str)] = &[
    (
        "General Assistant",
        "You are a helpful and concise AI assistant.",
    ),
    (
        "Code Helper",
        "You are an expert programmer. Provide clear, well-commented code examples and explanations.",
    ),
    (
        "Research Assistant",
        "You are a research assistant. Provide detailed, well-sourced information with citations when possible.",
    ),
    (
        "Creative Writer",
        "You are a creative writing assistant. Help with storytelling, character development, and creative ideas.",
    ),
    (
        "Technical Explainer",
        "You are a technical expert who explains complex concepts in simple, understandable terms.",
    ),
    (
        "Problem Solver",
        "You are a problem-solving expert. Break down complex problems into manageable steps.",
    ),
];

/// Look up the system prompt for a named template.
pub fn template_prompt(name: &str) -> Option<&'static str> {
    CONVERSATION_TEMPLATES
        .iter()
        .find(|(template, _)| *template == name)
        .map(|(_, prompt)| *prompt)
}

/// Request parameters applied when the user has not set any knobs.
pub fn default_parameters() -> RequestParameters {
    RequestParameters {
        max_tokens: Some(512),
        temperature: Some(0.7),
        top_p: Some(0.9),
        frequency_penalty: Some(0.1),
        ..RequestParameters::default()
    }
}

/// Application-scoped configuration directory (`~/.config/sonarchat` on Linux).
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("sonarchat"))
}

/// Load the bearer credential from the environment, falling back to the key
/// file in the config directory. Returns `None` when neither yields a
/// non-empty value; the coordinator refuses to start in that case.
pub fn load_api_key() -> Option<String> {
    if let Ok(key) = std::env::var(API_KEY_ENV) {
        let key = key.trim().to_string();
        if !key.is_empty() {
            return Some(key);
        }
    }

    let path = config_dir()?.join(API_KEY_FILE);
    let key = std::fs::read_to_string(path).ok()?.trim().to_string();
    if key.is_empty() { None } else { Some(key) }
}
