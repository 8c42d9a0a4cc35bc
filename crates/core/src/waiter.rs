//! Deadline-bounded polling shared by every `wait_for_*` operation.

use std::future::Future;
use std::time::Duration;

use playgodot_runtime::{Error, Result};
use tokio::time::Instant;

/// Stand-in deadline for timeouts too large to add to an instant.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Outcome of one condition check.
#[derive(Debug, Clone, PartialEq)]
pub enum Check<T> {
	/// The condition holds; polling stops with this value.
	Done(T),
	/// Not yet; the string describes what was observed.
	Pending(String),
}

/// Repeatedly evaluates a check until it succeeds or the deadline passes.
///
/// The deadline is measured from the first check and the sleep between checks
/// is clamped to the time left, so a condition that never holds fails between
/// `timeout` and `timeout + poll_interval`. A zero timeout performs exactly one
/// check.
///
/// Terminal session errors abort the wait immediately. Any other error counts
/// as "not yet" and its message becomes the last observed state.
#[derive(Debug, Clone, Copy)]
pub struct Waiter {
	timeout: Duration,
	poll_interval: Duration,
}

impl Waiter {
	pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
		Self {
			timeout,
			poll_interval,
		}
	}

	pub fn timeout(&self) -> Duration {
		self.timeout
	}

	pub fn poll_interval(&self) -> Duration {
		self.poll_interval
	}

	/// Polls `check` until it returns [`Check::Done`].
	///
	/// `condition` names what is being waited for in the timeout error.
	/// Cancellation is by dropping the returned future.
	pub async fn poll_until<T, F, Fut>(&self, condition: &str, mut check: F) -> Result<T>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<Check<T>>>,
	{
		let started = Instant::now();
		let deadline = started
			.checked_add(self.timeout)
			.unwrap_or_else(|| started + FAR_FUTURE);
		let hang_bound = deadline.checked_add(self.poll_interval).unwrap_or(deadline);
		let mut last_state = String::from("never checked");
		let mut attempts = 0u32;

		loop {
			attempts += 1;
			// A check that hangs past the deadline must not stretch the wait.
			match tokio::time::timeout_at(hang_bound, check()).await {
				Ok(Ok(Check::Done(value))) => {
					tracing::debug!(condition, attempts, elapsed_ms = started.elapsed().as_millis() as u64, "condition met");
					return Ok(value);
				}
				Ok(Ok(Check::Pending(state))) => last_state = state,
				Ok(Err(e)) if e.is_terminal() => return Err(e),
				Ok(Err(e)) => last_state = e.to_string(),
				Err(_) => {
					last_state = "check did not complete before the deadline".to_string();
					break;
				}
			}

			let now = Instant::now();
			if now >= deadline {
				break;
			}
			tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
		}

		tracing::debug!(condition, attempts, %last_state, "condition timed out");
		Err(Error::WaitTimeout {
			condition: condition.to_string(),
			timeout: self.timeout,
			elapsed: started.elapsed(),
			last_state,
		})
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;
	use std::sync::atomic::{AtomicU32, Ordering};

	use super::*;

	fn counting_check(
		counter: &Arc<AtomicU32>,
		ready_after: u32,
	) -> impl FnMut() -> std::future::Ready<Result<Check<u32>>> + use<> {
		let counter = Arc::clone(counter);
		move || {
			let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
			std::future::ready(Ok(if n >= ready_after {
				Check::Done(n)
			} else {
				Check::Pending(format!("attempt {n}"))
			}))
		}
	}

	#[tokio::test]
	async fn test_returns_once_condition_holds() {
		let counter = Arc::new(AtomicU32::new(0));
		let waiter = Waiter::new(Duration::from_secs(5), Duration::from_millis(10));

		let value = waiter
			.poll_until("third attempt", counting_check(&counter, 3))
			.await
			.unwrap();
		assert_eq!(value, 3);
	}

	#[tokio::test]
	async fn test_unbounded_timeout_returns_on_first_success() {
		let waiter = Waiter::new(Duration::MAX, Duration::MAX);

		let value = waiter
			.poll_until("forever", || async { Ok(Check::Done(7)) })
			.await
			.unwrap();
		assert_eq!(value, 7);
	}

	#[tokio::test]
	async fn test_unbounded_timeout_keeps_polling() {
		let counter = Arc::new(AtomicU32::new(0));
		let waiter = Waiter::new(Duration::MAX, Duration::from_millis(5));

		let value = waiter
			.poll_until("third attempt", counting_check(&counter, 3))
			.await
			.unwrap();
		assert_eq!(value, 3);
	}

	#[tokio::test]
	async fn test_zero_timeout_checks_exactly_once() {
		let counter = Arc::new(AtomicU32::new(0));
		let waiter = Waiter::new(Duration::ZERO, Duration::from_millis(10));

		let err = waiter
			.poll_until("never", counting_check(&counter, u32::MAX))
			.await
			.unwrap_err();
		assert!(matches!(err, Error::WaitTimeout { ref last_state, .. } if last_state == "attempt 1"));
		assert_eq!(counter.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn test_timeout_fires_within_one_interval() {
		let timeout = Duration::from_millis(300);
		let interval = Duration::from_millis(100);
		let waiter = Waiter::new(timeout, interval);

		let started = std::time::Instant::now();
		let err = waiter
			.poll_until("never", || async { Ok(Check::<()>::Pending("false".into())) })
			.await
			.unwrap_err();
		let elapsed = started.elapsed();

		assert!(err.is_timeout());
		assert!(elapsed >= timeout, "fired early: {elapsed:?}");
		// Scheduler slack on top of the one-interval bound.
		assert!(elapsed < timeout + interval + Duration::from_millis(150), "fired late: {elapsed:?}");
	}

	#[tokio::test]
	async fn test_terminal_error_aborts_immediately() {
		let counter = Arc::new(AtomicU32::new(0));
		let waiter = Waiter::new(Duration::from_secs(10), Duration::from_millis(10));

		let calls = Arc::clone(&counter);
		let err = waiter
			.poll_until("node", move || {
				calls.fetch_add(1, Ordering::SeqCst);
				async { Err::<Check<()>, _>(Error::SessionLost("eof".into())) }
			})
			.await
			.unwrap_err();

		assert!(matches!(err, Error::SessionLost(_)));
		assert_eq!(counter.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn test_operation_errors_become_last_state() {
		let waiter = Waiter::new(Duration::from_millis(50), Duration::from_millis(10));

		let err = waiter
			.poll_until("key", || async {
				Err::<Check<()>, _>(Error::UnknownKey("hyper".into()))
			})
			.await
			.unwrap_err();

		match err {
			Error::WaitTimeout {
				condition,
				last_state,
				..
			} => {
				assert_eq!(condition, "key");
				assert!(last_state.contains("hyper"));
			}
			other => panic!("unexpected error: {other:?}"),
		}
	}

	#[tokio::test]
	async fn test_hanging_check_is_bounded() {
		let waiter = Waiter::new(Duration::from_millis(100), Duration::from_millis(50));

		let started = std::time::Instant::now();
		let err = waiter
			.poll_until("hang", || async {
				tokio::time::sleep(Duration::from_secs(60)).await;
				Ok(Check::<()>::Pending("unreachable".into()))
			})
			.await
			.unwrap_err();

		assert!(err.is_timeout());
		assert!(started.elapsed() < Duration::from_secs(2));
	}
}
