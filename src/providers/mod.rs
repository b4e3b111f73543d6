mod anthropic;
mod error;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub use anthropic::AnthropicProvider;
pub use error::{ProviderError, ProviderErrorKind};

/// Paid rate applied to the token total when estimating request cost.
const COST_PER_KILOTOKEN_USD: f64 = 0.001;

/// A single request to the external generation service.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub model_identifier: String,
    pub system_instructions: String,
    pub user_prompt: String,
    pub max_output_tokens: u32,
}

/// Token counts reported by the generation service for one request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }

    /// Rough cost estimate in USD at small-model rates.
    pub fn estimated_cost_usd(&self) -> f64 {
        (self.total() as f64 / 1000.0) * COST_PER_KILOTOKEN_USD
    }
}

/// Raw reply from the generation service: concatenated text plus usage
/// when the service reported it.
#[derive(Debug, Clone)]
pub struct GenerationReply {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

/// Sends an assembled prompt to a generation service and returns the raw
/// reply text. Failures should carry a [`ProviderError`] in the chain so the
/// orchestrator can classify them for retry.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<GenerationReply>;
}

/// Build an HTTP client with a panic-safe fallback when system proxy discovery
/// is unavailable in the runtime environment.
pub(crate) fn build_http_client(timeout: Duration) -> Result<Client, String> {
    // Test environments (and some constrained runtimes) can panic inside
    // macOS system proxy discovery. Skip that code path entirely for tests.
    if cfg!(test)
        || matches!(
            std::env::var("GIFTWISE_DISABLE_SYSTEM_PROXY_DISCOVERY").as_deref(),
            Ok("1") | Ok("true") | Ok("TRUE")
        )
    {
        return Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {}", e));
    }

    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        Client::builder().timeout(timeout).build()
    })) {
        Ok(Ok(client)) => return Ok(client),
        Ok(Err(e)) => {
            warn!(
                error = %e,
                "HTTP client build with system proxy support failed; retrying with proxy discovery disabled"
            );
        }
        Err(_) => {
            warn!(
                "HTTP client build panicked during system proxy discovery; retrying with proxy discovery disabled"
            );
        }
    }

    Client::builder()
        .timeout(timeout)
        .no_proxy()
        .build()
        .map_err(|e| format!("Failed to build HTTP client: {}", e))
}
