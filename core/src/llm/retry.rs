//! Retry policy for LM provider calls (spec §6): exponential backoff from
//! 1s, multiplier 2, cap 30s, ±25% jitter, max 3 retries, honouring a
//! server-provided retry-after when present.

use std::time::Duration;

use rand::Rng;
use tracing::warn;

use super::error::LmError;
use super::provider::LmProvider;
use super::types::{GenerateRequest, GenerateResponse};

const BASE_DELAY: Duration = Duration::from_secs(1);
const MAX_DELAY: Duration = Duration::from_secs(30);
const MAX_RETRIES: u32 = 3;
const JITTER_FRACTION: f64 = 0.25;

fn backoff_delay(attempt: u32) -> Duration {
    let exp = BASE_DELAY.as_millis() as u64 * 2u64.pow(attempt);
    let capped = exp.min(MAX_DELAY.as_millis() as u64);
    let jitter_range = (capped as f64 * JITTER_FRACTION) as i64;
    let jitter = rand::thread_rng().gen_range(-jitter_range..=jitter_range);
    Duration::from_millis((capped as i64 + jitter).max(0) as u64)
}

/// Wraps a [`LmProvider::generate`] call with the standing retry policy.
pub async fn generate_with_retry(provider: &dyn LmProvider, request: GenerateRequest) -> Result<GenerateResponse, LmError> {
    let mut attempt = 0;
    loop {
        match provider.generate(request.clone()).await {
            Ok(response) => return Ok(response),
            Err(err) if err.is_retryable() && attempt < MAX_RETRIES => {
                let delay = err.retry_after().unwrap_or_else(|| backoff_delay(attempt));
                warn!(attempt, delay_ms = delay.as_millis() as u64, "retrying LM provider call after error: {err}");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_and_is_capped() {
        let d0 = backoff_delay(0).as_millis();
        let d3 = backoff_delay(3).as_millis();
        assert!(d0 <= 1_250);
        assert!(d3 <= (MAX_DELAY.as_millis() as f64 * 1.25) as u128);
    }

    #[test]
    fn jitter_stays_within_twenty_five_percent() {
        for attempt in 0..5 {
            let exp = BASE_DELAY.as_millis() as u64 * 2u64.pow(attempt);
            let capped = exp.min(MAX_DELAY.as_millis() as u64) as f64;
            let delay = backoff_delay(attempt).as_millis() as f64;
            assert!(delay <= capped * 1.25 + 1.0);
            assert!(delay >= capped * 0.75 - 1.0);
        }
    }
}
