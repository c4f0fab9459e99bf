//! Per-call context carrying the requested provider name, a deadline, and cancellation.
//!
//! Every [`Tokenizer::token`](crate::tokenizer::Tokenizer::token) call receives a
//! [`TokenContext`]. Backends wrap their refresh-lock acquisition and upstream round trip in
//! [`TokenContext::run`], so a cancelled or expired context aborts the in-flight future and
//! surfaces a [`CancelledError`] instead of returning stale data.

// crates.io
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
// self
use crate::{_prelude::*, error::CancelledError};

/// Caller-scoped request data shared by every backend.
#[derive(Clone, Debug, Default)]
pub struct TokenContext {
	provider: Option<String>,
	deadline: Option<Instant>,
	cancellation: CancellationToken,
}
impl TokenContext {
	/// Creates a context with no deadline, no provider name, and a fresh cancellation token.
	pub fn new() -> Self {
		Self::default()
	}

	/// Records the provider name exactly as the caller requested it.
	pub fn with_provider(mut self, name: impl Into<String>) -> Self {
		self.provider = Some(name.into());

		self
	}

	/// Bounds the call by `timeout` from now, keeping any earlier deadline.
	pub fn with_timeout(self, timeout: StdDuration) -> Self {
		match Instant::now().checked_add(timeout) {
			Some(deadline) => self.with_deadline(deadline),
			None => self,
		}
	}

	/// Bounds the call by an absolute deadline, keeping any earlier deadline.
	pub fn with_deadline(mut self, deadline: Instant) -> Self {
		self.deadline = Some(match self.deadline {
			Some(current) if current <= deadline => current,
			_ => deadline,
		});

		self
	}

	/// Links the context to an external cancellation token.
	pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
		self.cancellation = token;

		self
	}

	/// Provider name as requested by the caller, if any.
	pub fn provider(&self) -> Option<&str> {
		self.provider.as_deref()
	}

	/// Absolute deadline, if any.
	pub fn deadline(&self) -> Option<Instant> {
		self.deadline
	}

	/// Cancels the context; in-flight [`run`](Self::run) calls resolve with an error.
	pub fn cancel(&self) {
		self.cancellation.cancel();
	}

	/// Returns the first cancellation reason that already applies, if any.
	pub fn check(&self) -> Result<(), CancelledError> {
		if self.cancellation.is_cancelled() {
			return Err(CancelledError::Canceled);
		}
		if self.deadline.is_some_and(|deadline| deadline <= Instant::now()) {
			return Err(CancelledError::DeadlineExceeded);
		}

		Ok(())
	}

	/// Drives `fut` until it completes, the context is cancelled, or the deadline passes.
	///
	/// The future is dropped on cancellation, which aborts any request it owns.
	pub async fn run<F>(&self, fut: F) -> Result<F::Output, CancelledError>
	where
		F: Future,
	{
		self.check()?;

		let deadline = self.deadline;
		let expired = async move {
			match deadline {
				Some(deadline) => tokio::time::sleep_until(deadline).await,
				None => std::future::pending::<()>().await,
			}
		};

		tokio::select! {
			biased;
			_ = self.cancellation.cancelled() => Err(CancelledError::Canceled),
			_ = expired => Err(CancelledError::DeadlineExceeded),
			output = fut => Ok(output),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn run_returns_output_when_unbounded() {
		let ctx = TokenContext::new();

		assert_eq!(ctx.run(async { 7 }).await, Ok(7));
	}

	#[tokio::test]
	async fn run_reports_deadline() {
		let ctx = TokenContext::new().with_timeout(StdDuration::from_millis(10));
		let result = ctx.run(tokio::time::sleep(StdDuration::from_secs(5))).await;

		assert_eq!(result, Err(CancelledError::DeadlineExceeded));
	}

	#[tokio::test]
	async fn run_reports_cancellation_before_polling() {
		let ctx = TokenContext::new();

		ctx.cancel();

		assert_eq!(ctx.run(async { 1 }).await, Err(CancelledError::Canceled));
	}

	#[test]
	fn earlier_deadline_wins() {
		let now = Instant::now();
		let ctx = TokenContext::new()
			.with_deadline(now + StdDuration::from_secs(1))
			.with_deadline(now + StdDuration::from_secs(10));

		assert_eq!(ctx.deadline(), Some(now + StdDuration::from_secs(1)));
	}
}
