use std::time::Duration;

use crate::Result;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
	pub max_attempts: u32,
	pub base_delay: Duration,
}
impl RetryPolicy {
	pub fn new(max_attempts: u32, base_delay_ms: u64) -> Self {
		Self { max_attempts: max_attempts.max(1), base_delay: Duration::from_millis(base_delay_ms) }
	}
}

/// Runs `op` up to `max_attempts` times, doubling the delay after each
/// transient failure (capped at two seconds). Non-transient failures
/// surface immediately.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T>>,
{
	let mut backoff = policy.base_delay;
	let mut attempt = 1_u32;

	loop {
		match op().await {
			Ok(value) => return Ok(value),
			Err(err) if err.is_transient() && attempt < policy.max_attempts => {
				tracing::warn!(error = %err, attempt, "Transient provider failure; retrying.");

				tokio::time::sleep(backoff).await;

				backoff = backoff.saturating_mul(2).min(Duration::from_secs(2));
				attempt += 1;
			},
			Err(err) => return Err(err),
		}
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicU32, Ordering};

	use super::*;
	use crate::Error;

	#[tokio::test]
	async fn retries_transient_failures_until_success() {
		let calls = AtomicU32::new(0);
		let policy = RetryPolicy::new(3, 1);
		let result = with_retry(policy, || {
			let attempt = calls.fetch_add(1, Ordering::SeqCst) + 1;

			async move {
				if attempt < 3 {
					Err(Error::Status { status: 503, body: "unavailable".to_string() })
				} else {
					Ok(attempt)
				}
			}
		})
		.await;

		assert_eq!(result.expect("Expected eventual success."), 3);
		assert_eq!(calls.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn surfaces_non_transient_failures_immediately() {
		let calls = AtomicU32::new(0);
		let policy = RetryPolicy::new(5, 1);
		let result: Result<()> = with_retry(policy, || {
			calls.fetch_add(1, Ordering::SeqCst);

			async { Err(Error::Status { status: 401, body: "bad key".to_string() }) }
		})
		.await;

		assert!(result.is_err());
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn gives_up_after_max_attempts() {
		let calls = AtomicU32::new(0);
		let policy = RetryPolicy::new(2, 1);
		let result: Result<()> = with_retry(policy, || {
			calls.fetch_add(1, Ordering::SeqCst);

			async { Err(Error::Status { status: 500, body: "boom".to_string() }) }
		})
		.await;

		assert!(result.is_err());
		assert_eq!(calls.load(Ordering::SeqCst), 2);
	}
}
