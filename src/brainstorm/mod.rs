//! AI-assisted gift brainstorming.
//!
//! A brainstorm request moves through fixed phases: normalize the caller's
//! context against the scenario's slot table, assemble the prompt, await the
//! generation provider (with retry on transient failures), then parse the
//! reply into structured suggestions. At most one request may be in flight
//! per giftee; concurrent callers are rejected rather than queued.

pub mod context;
pub mod parser;
pub mod prompt;
pub mod scenario;

pub use context::{normalize, PromptContext, RawContext};
pub use parser::ParseWarning;
pub use scenario::{Scenario, SlotSpec};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::BrainstormConfig;
use crate::error::GiftError;
use crate::providers::{
    GenerationProvider, GenerationRequest, GenerationReply, ProviderError, ProviderErrorKind,
    TokenUsage,
};
use crate::types::GiftSuggestion;

/// Upper bound on suggestions per request, to keep prompts and replies small.
const MAX_REQUESTED_COUNT: u32 = 10;

/// Cap on a single retry backoff sleep.
const MAX_BACKOFF_SECS: u64 = 120;

/// Where an in-flight brainstorm currently is. `Idle` means no flight exists
/// for the giftee.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BrainstormPhase {
    #[default]
    Idle,
    Normalizing,
    Assembling,
    AwaitingResponse,
    Parsing,
}

/// The result of a completed brainstorm: parsed suggestions plus any
/// per-block degradation warnings and the provider's token accounting.
#[derive(Debug, Clone, Serialize)]
pub struct BrainstormOutcome {
    pub suggestions: Vec<GiftSuggestion>,
    pub warnings: Vec<ParseWarning>,
    pub usage: Option<TokenUsage>,
    pub estimated_cost_usd: Option<f64>,
}

struct FlightHandle {
    phase: BrainstormPhase,
    cancel_token: CancellationToken,
}

/// Tracks the one permitted in-flight brainstorm per giftee.
#[derive(Default)]
struct FlightRegistry {
    flights: RwLock<HashMap<i64, FlightHandle>>,
}

impl FlightRegistry {
    /// Claims the giftee's flight slot, or reports the existing flight.
    async fn begin(&self, giftee_id: i64) -> Result<CancellationToken, GiftError> {
        let mut flights = self.flights.write().await;
        if flights.contains_key(&giftee_id) {
            return Err(GiftError::AlreadyInProgress { giftee_id });
        }
        let token = CancellationToken::new();
        flights.insert(
            giftee_id,
            FlightHandle {
                phase: BrainstormPhase::Normalizing,
                cancel_token: token.clone(),
            },
        );
        Ok(token)
    }

    async fn set_phase(&self, giftee_id: i64, phase: BrainstormPhase) {
        let mut flights = self.flights.write().await;
        if let Some(handle) = flights.get_mut(&giftee_id) {
            debug!(giftee_id, ?phase, "Brainstorm phase change");
            handle.phase = phase;
        }
    }

    async fn phase_for(&self, giftee_id: i64) -> BrainstormPhase {
        let flights = self.flights.read().await;
        flights
            .get(&giftee_id)
            .map(|h| h.phase)
            .unwrap_or(BrainstormPhase::Idle)
    }

    async fn cancel(&self, giftee_id: i64) -> bool {
        let flights = self.flights.read().await;
        match flights.get(&giftee_id) {
            Some(handle) => {
                handle.cancel_token.cancel();
                true
            }
            None => false,
        }
    }

    async fn finish(&self, giftee_id: i64) {
        let mut flights = self.flights.write().await;
        flights.remove(&giftee_id);
    }
}

/// Orchestrates brainstorm requests against a generation provider.
pub struct BrainstormService {
    provider: Arc<dyn GenerationProvider>,
    config: BrainstormConfig,
    model: String,
    registry: FlightRegistry,
}

impl BrainstormService {
    /// Builds the service, checking every scenario template against its slot
    /// table so a malformed template fails construction instead of a request.
    pub fn new(
        provider: Arc<dyn GenerationProvider>,
        model: impl Into<String>,
        config: BrainstormConfig,
    ) -> Result<Self, GiftError> {
        prompt::validate_templates()?;
        Ok(Self {
            provider,
            config,
            model: model.into(),
            registry: FlightRegistry::default(),
        })
    }

    /// Runs one brainstorm for a giftee. Fails fast with
    /// [`GiftError::AlreadyInProgress`] if the giftee already has a flight.
    pub async fn request(
        &self,
        giftee_id: i64,
        scenario: Scenario,
        giftee_name: &str,
        raw_context: &RawContext,
        requested_count: u32,
    ) -> Result<BrainstormOutcome, GiftError> {
        if requested_count < 1 || requested_count > MAX_REQUESTED_COUNT {
            return Err(GiftError::Validation(format!(
                "requested count must be between 1 and {}, got {}",
                MAX_REQUESTED_COUNT, requested_count
            )));
        }

        let cancel = self.registry.begin(giftee_id).await?;
        let started = Instant::now();
        let result = self
            .run(
                giftee_id,
                scenario,
                giftee_name,
                raw_context,
                requested_count,
                &cancel,
            )
            .await;
        self.registry.finish(giftee_id).await;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(outcome) => info!(
                giftee_id,
                scenario = scenario.tag(),
                suggestions = outcome.suggestions.len(),
                warnings = outcome.warnings.len(),
                elapsed_ms,
                "Brainstorm complete"
            ),
            Err(e) => warn!(
                giftee_id,
                scenario = scenario.tag(),
                elapsed_ms,
                "Brainstorm failed: {}",
                e
            ),
        }
        result
    }

    async fn run(
        &self,
        giftee_id: i64,
        scenario: Scenario,
        giftee_name: &str,
        raw_context: &RawContext,
        requested_count: u32,
        cancel: &CancellationToken,
    ) -> Result<BrainstormOutcome, GiftError> {
        self.registry
            .set_phase(giftee_id, BrainstormPhase::Normalizing)
            .await;
        let context = normalize(scenario, raw_context);

        self.registry
            .set_phase(giftee_id, BrainstormPhase::Assembling)
            .await;
        let user_prompt = prompt::assemble(&context, giftee_name, requested_count);
        let request = GenerationRequest {
            model_identifier: self.model.clone(),
            system_instructions: prompt::SYSTEM_INSTRUCTIONS.to_string(),
            user_prompt,
            max_output_tokens: self.config.max_output_tokens,
        };

        self.registry
            .set_phase(giftee_id, BrainstormPhase::AwaitingResponse)
            .await;
        let reply = self.generate_with_recovery(giftee_id, &request, cancel).await?;

        self.registry
            .set_phase(giftee_id, BrainstormPhase::Parsing)
            .await;
        let (suggestions, warnings) = parser::parse(&reply.text, requested_count)?;
        for warning in &warnings {
            warn!(
                giftee_id,
                block = ?warning.block,
                reason = %warning.reason,
                "Suggestion block degraded"
            );
        }

        Ok(BrainstormOutcome {
            suggestions,
            warnings,
            usage: reply.usage,
            estimated_cost_usd: reply.usage.map(|u| u.estimated_cost_usd()),
        })
    }

    /// Calls the provider, retrying transient failures with exponential
    /// backoff. Rate-limit errors that carry a `retry-after` hint use it as
    /// the backoff base. Non-transient errors surface immediately.
    async fn generate_with_recovery(
        &self,
        giftee_id: i64,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerationReply, GiftError> {
        let mut attempt: u32 = 0;
        loop {
            if cancel.is_cancelled() {
                info!(giftee_id, "Brainstorm cancelled before generation call");
                return Err(GiftError::Cancelled);
            }

            let outcome = tokio::select! {
                _ = cancel.cancelled() => {
                    info!(giftee_id, "Brainstorm cancelled during generation call");
                    return Err(GiftError::Cancelled);
                }
                r = self.provider.generate(request) => r,
            };

            let err = match outcome {
                Ok(reply) => return Ok(reply),
                Err(e) => match e.downcast::<ProviderError>() {
                    Ok(provider_err) => provider_err,
                    Err(other) => ProviderError {
                        kind: ProviderErrorKind::Unknown,
                        status: None,
                        message: other.to_string(),
                        retry_after_secs: None,
                    },
                },
            };
            warn!(
                giftee_id,
                kind = ?err.kind,
                status = ?err.status,
                attempt,
                "Generation call failed: {}",
                err
            );

            if !err.is_transient() || attempt >= self.config.max_retries {
                return Err(GiftError::Provider(err));
            }

            let base = if err.kind == ProviderErrorKind::RateLimited {
                err.retry_after_secs
                    .unwrap_or(self.config.retry_base_delay_secs)
            } else {
                self.config.retry_base_delay_secs
            };
            let wait_secs = base
                .saturating_mul(2u64.saturating_pow(attempt))
                .min(MAX_BACKOFF_SECS);
            info!(
                giftee_id,
                wait_secs,
                attempt = attempt + 1,
                max_retries = self.config.max_retries,
                "Retrying after transient generation error"
            );
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(giftee_id, "Brainstorm cancelled during retry backoff");
                    return Err(GiftError::Cancelled);
                }
                _ = tokio::time::sleep(Duration::from_secs(wait_secs)) => {}
            }
            attempt += 1;
        }
    }

    /// Signals the giftee's in-flight brainstorm to stop. Returns false when
    /// no flight exists. Cancellation takes effect at the next await point;
    /// a provider call that has already resolved will still complete.
    pub async fn cancel(&self, giftee_id: i64) -> bool {
        self.registry.cancel(giftee_id).await
    }

    /// Reports the giftee's current phase, `Idle` when nothing is in flight.
    pub async fn phase_for(&self, giftee_id: i64) -> BrainstormPhase {
        self.registry.phase_for(giftee_id).await
    }
}
