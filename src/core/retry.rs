//! Bounded retry with rate-limit gating and backoff around one slot

use std::time::Duration;
use tracing::{debug, warn};

use crate::config;
use crate::core::prompt;
use crate::core::rate_limiter::RateLimiter;
use crate::error::AltgenResult;
use crate::providers::GenerationClient;
use crate::services::RunControl;
use crate::types::{GenerationOutcome, GenerationRequest, ProviderFailure};

/// Wraps one generation attempt with the rate-limit gate, bounded retries,
/// provider-reported backoff and a fixed backoff for transport failures.
///
/// Explicit attempt counter, one pattern match per failure class; success
/// short-circuits with the raw text. The only error path out is
/// cancellation, which unwinds to the batch boundary.
pub struct RetryController<'a> {
    client: &'a dyn GenerationClient,
    limiter: &'a mut RateLimiter,
    control: &'a RunControl,
}

impl<'a> RetryController<'a> {
    pub fn new(
        client: &'a dyn GenerationClient,
        limiter: &'a mut RateLimiter,
        control: &'a RunControl,
    ) -> Self {
        Self {
            client,
            limiter,
            control,
        }
    }

    pub async fn attempt(&mut self, request: &GenerationRequest) -> AltgenResult<GenerationOutcome> {
        let prompt = prompt::build(
            &request.asset_type,
            &request.source_text,
            request.max_chars,
            &request.exclusions,
        );

        let mut retries = 0u32;
        let mut last_failure: Option<ProviderFailure> = None;

        while retries < config::MAX_RETRIES {
            self.gate(&request.model).await?;

            let result = self
                .client
                .generate(request.provider, &request.model, &prompt, request.max_chars)
                .await;

            match result {
                Ok(text) => return Ok(GenerationOutcome::Generated(text)),
                Err(ProviderFailure::RateLimited { retry_after_ms }) => {
                    let delay =
                        Duration::from_millis(retry_after_ms.unwrap_or(config::TRANSIENT_BACKOFF_MS));
                    warn!(
                        model = %request.model,
                        retries,
                        delay_ms = delay.as_millis() as u64,
                        "provider rate limit, backing off"
                    );
                    self.pause(delay).await?;
                    last_failure = Some(ProviderFailure::RateLimited { retry_after_ms });
                    retries += 1;
                }
                Err(
                    failure @ (ProviderFailure::NetworkError(_)
                    | ProviderFailure::MalformedResponse(_)
                    | ProviderFailure::EmptyResponse),
                ) => {
                    debug!(model = %request.model, retries, %failure, "transport failure, fixed backoff");
                    self.pause(Duration::from_millis(config::TRANSIENT_BACKOFF_MS))
                        .await?;
                    last_failure = Some(failure);
                    retries += 1;
                }
                Err(failure) => {
                    debug!(model = %request.model, retries, %failure, "provider error");
                    last_failure = Some(failure);
                    retries += 1;
                }
            }
        }

        Ok(GenerationOutcome::Exhausted { last_failure })
    }

    /// Sleep out rate-limiter waits, polling cancellation between attempts.
    async fn gate(&mut self, model: &str) -> AltgenResult<()> {
        loop {
            self.control.ensure_active().await?;
            let wait = self.limiter.admit(model);
            if wait.is_zero() {
                return Ok(());
            }
            debug!(model, wait_ms = wait.as_millis() as u64, "rate limit window full, waiting");
            tokio::time::sleep(wait).await;
        }
    }

    async fn pause(&self, delay: Duration) -> AltgenResult<()> {
        self.control.ensure_active().await?;
        tokio::time::sleep(delay).await;
        Ok(())
    }
}
