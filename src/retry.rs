use crate::backend::BackendError;
use std::{future::Future, time::Duration};

/// Exponential backoff with jitter for remote operations.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
	/// Total tries, including the first. Never less than one.
	pub max_attempts: u32,
	pub initial_delay: Duration,
	pub max_delay: Duration,
	/// Fraction of each delay that is randomized, from 0 (none) to 1.
	pub jitter: f64,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_attempts: 4,
			initial_delay: Duration::from_millis(250),
			max_delay: Duration::from_secs(4),
			jitter: 0.25,
		}
	}
}

/// Why a remote operation was given up on.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SyncFailure {
	/// The service refused the request; retrying would not help.
	#[error("{0}")]
	Rejected(BackendError),
	#[error("gave up after {attempts} attempts: {last}")]
	Exhausted { attempts: u32, last: BackendError },
}

impl RetryPolicy {
	pub fn immediate(max_attempts: u32) -> Self {
		Self {
			max_attempts,
			initial_delay: Duration::ZERO,
			max_delay: Duration::ZERO,
			jitter: 0.0,
		}
	}

	/// Delay before retry number `retry` (1 for the first retry), before jitter.
	pub fn base_delay(&self, retry: u32) -> Duration {
		let exponent = retry.saturating_sub(1).min(31);
		self.initial_delay.saturating_mul(1u32 << exponent).min(self.max_delay)
	}

	pub fn delay(&self, retry: u32) -> Duration {
		let base = self.base_delay(retry);
		let jitter = self.jitter.clamp(0.0, 1.0);
		if jitter == 0.0 || base.is_zero() {
			return base;
		}
		let spread = base.as_secs_f64() * jitter;
		let offset = rand::random::<f64>() * 2.0 * spread - spread;
		Duration::from_secs_f64((base.as_secs_f64() + offset).max(0.0))
	}

	/// Runs `operation` until it succeeds, fails with a non-transient error, or runs out of attempts.
	/// Resolves to the number of attempts the success took.
	pub async fn run<F, Fut>(&self, mut operation: F) -> Result<u32, SyncFailure>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<(), BackendError>>,
	{
		let max_attempts = self.max_attempts.max(1);
		let mut attempt = 1;
		loop {
			match operation().await {
				Ok(()) => return Ok(attempt),
				Err(err) if !err.is_transient() => return Err(SyncFailure::Rejected(err)),
				Err(err) if attempt >= max_attempts => {
					return Err(SyncFailure::Exhausted {
						attempts: attempt,
						last: err,
					})
				}
				Err(err) => {
					let delay = self.delay(attempt);
					log::debug!(target: "sync", "attempt {attempt} failed ({err}), retrying in {delay:?}");
					sleep(delay).await;
					attempt += 1;
				}
			}
		}
	}
}

async fn sleep(delay: Duration) {
	if !delay.is_zero() {
		gloo_timers::future::sleep(delay).await;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use futures::executor::block_on;
	use std::{cell::RefCell, collections::VecDeque};

	fn scripted(outcomes: Vec<Result<(), BackendError>>) -> (RefCell<VecDeque<Result<(), BackendError>>>, RefCell<u32>) {
		(RefCell::new(outcomes.into()), RefCell::new(0))
	}

	fn network() -> BackendError {
		BackendError::Network("connection reset".into())
	}

	#[test]
	fn backoff_doubles_up_to_ceiling() {
		let policy = RetryPolicy {
			jitter: 0.0,
			..Default::default()
		};
		assert_eq!(policy.base_delay(1), Duration::from_millis(250));
		assert_eq!(policy.base_delay(2), Duration::from_millis(500));
		assert_eq!(policy.base_delay(3), Duration::from_secs(1));
		assert_eq!(policy.base_delay(10), Duration::from_secs(4));
		assert_eq!(policy.base_delay(u32::MAX), Duration::from_secs(4));
	}

	#[test]
	fn jitter_stays_within_spread() {
		let policy = RetryPolicy::default();
		for _ in 0..100 {
			let delay = policy.delay(2);
			assert!(delay >= Duration::from_millis(375), "{delay:?}");
			assert!(delay <= Duration::from_millis(625), "{delay:?}");
		}
	}

	#[test]
	fn transient_failures_are_retried() {
		let (outcomes, calls) = scripted(vec![Err(network()), Err(BackendError::Unavailable { status: 503 }), Ok(())]);
		let result = block_on(RetryPolicy::immediate(4).run(|| {
			*calls.borrow_mut() += 1;
			let next = outcomes.borrow_mut().pop_front().unwrap_or(Ok(()));
			async move { next }
		}));
		assert_eq!(result, Ok(3));
		assert_eq!(*calls.borrow(), 3);
	}

	#[test]
	fn rejection_is_not_retried() {
		let (outcomes, calls) = scripted(vec![Err(BackendError::rejected("Permission denied")), Ok(())]);
		let result = block_on(RetryPolicy::immediate(4).run(|| {
			*calls.borrow_mut() += 1;
			let next = outcomes.borrow_mut().pop_front().unwrap_or(Ok(()));
			async move { next }
		}));
		assert_eq!(result, Err(SyncFailure::Rejected(BackendError::rejected("Permission denied"))));
		assert_eq!(*calls.borrow(), 1);
	}

	#[test]
	fn gives_up_after_max_attempts() {
		let (outcomes, calls) = scripted(vec![Err(network()); 5]);
		let result = block_on(RetryPolicy::immediate(3).run(|| {
			*calls.borrow_mut() += 1;
			let next = outcomes.borrow_mut().pop_front().unwrap_or(Ok(()));
			async move { next }
		}));
		assert_eq!(
			result,
			Err(SyncFailure::Exhausted {
				attempts: 3,
				last: network()
			})
		);
		assert_eq!(*calls.borrow(), 3);
	}

	#[test]
	fn zero_attempts_still_tries_once() {
		let result = block_on(RetryPolicy::immediate(0).run(|| async { Err(network()) }));
		assert!(matches!(result, Err(SyncFailure::Exhausted { attempts: 1, .. })));
	}
}
