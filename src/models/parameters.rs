use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};

pub const MAX_TOKENS_RANGE: RangeInclusive<u32> = 1..=4096;
pub const TEMPERATURE_RANGE: RangeInclusive<f64> = 0.0..=2.0;
pub const TOP_P_RANGE: RangeInclusive<f64> = 0.0..=1.0;
pub const TOP_K_RANGE: RangeInclusive<u32> = 0..=100;
pub const PENALTY_RANGE: RangeInclusive<f64> = -2.0..=2.0;

/// Optional sampling knobs for a completion request.
///
/// An absent knob is omitted from the request body entirely so the endpoint
/// default applies; it is never sent as a zero. Out-of-range values are
/// rejected up front with `ApiError::Validation` rather than clamped, so a
/// typo in a settings field fails loudly before any network call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
}

impl RequestParameters {
    pub fn validate(&self) -> ApiResult<()> {
        check_range("max_tokens", self.max_tokens, &MAX_TOKENS_RANGE)?;
        check_range("temperature", self.temperature, &TEMPERATURE_RANGE)?;
        check_range("top_p", self.top_p, &TOP_P_RANGE)?;
        check_range("top_k", self.top_k, &TOP_K_RANGE)?;
        check_range("presence_penalty", self.presence_penalty, &PENALTY_RANGE)?;
        check_range("frequency_penalty", self.frequency_penalty, &PENALTY_RANGE)?;
        Ok(())
    }
}

fn check_range<T>(name: &str, value: Option<T>, range: &RangeInclusive<T>) -> ApiResult<()>
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    match value {
        Some(v) if !range.contains(&v) => Err(ApiError::Validation(format!(
            "{name} must be between {} and {}, got {v}",
            range.start(),
            range.end()
        ))),
        _ => Ok(()),
    }
}
