// src/cost.rs
//! Pricing for a pipeline run. All figures are USD; nothing is rounded here,
//! display formatting belongs to whoever renders the number.

use serde::{Deserialize, Serialize};

pub const PRICE_PER_1M_INPUT_TOKENS: f64 = 3.50;
pub const PRICE_PER_1M_OUTPUT_TOKENS: f64 = 10.50;
pub const PRICE_PER_IMAGE_GENERATION: f64 = 0.04;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub response_tokens: u64,
}

impl TokenUsage {
    /// Usage counters may be missing from a response; absent counts are zero.
    pub fn from_counts(prompt_tokens: Option<u64>, response_tokens: Option<u64>) -> Self {
        Self {
            prompt_tokens: prompt_tokens.unwrap_or(0),
            response_tokens: response_tokens.unwrap_or(0),
        }
    }

    pub fn cost(&self) -> f64 {
        analysis_cost(self.prompt_tokens, self.response_tokens)
    }
}

pub fn analysis_cost(prompt_tokens: u64, response_tokens: u64) -> f64 {
    (prompt_tokens as f64 / 1_000_000.0) * PRICE_PER_1M_INPUT_TOKENS
        + (response_tokens as f64 / 1_000_000.0) * PRICE_PER_1M_OUTPUT_TOKENS
}

/// Flat per successful generation call, independent of size or aspect ratio.
pub fn generation_cost() -> f64 {
    PRICE_PER_IMAGE_GENERATION
}

/// Cost of one run. The total is derived from the two components and is
/// recomputed on deserialization, so it can never disagree with them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredCost")]
pub struct CostBreakdown {
    analysis_cost: f64,
    generation_cost: f64,
    total_cost: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    token_usage: Option<TokenUsage>,
}

impl CostBreakdown {
    pub fn new(analysis_cost: f64, generation_cost: f64, token_usage: Option<TokenUsage>) -> Self {
        Self {
            analysis_cost,
            generation_cost,
            total_cost: analysis_cost + generation_cost,
            token_usage,
        }
    }

    pub fn analysis_cost(&self) -> f64 {
        self.analysis_cost
    }

    pub fn generation_cost(&self) -> f64 {
        self.generation_cost
    }

    pub fn total_cost(&self) -> f64 {
        self.total_cost
    }

    pub fn token_usage(&self) -> Option<TokenUsage> {
        self.token_usage
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredCost {
    analysis_cost: f64,
    generation_cost: f64,
    #[serde(default)]
    token_usage: Option<TokenUsage>,
}

impl From<StoredCost> for CostBreakdown {
    fn from(stored: StoredCost) -> Self {
        CostBreakdown::new(stored.analysis_cost, stored.generation_cost, stored.token_usage)
    }
}
