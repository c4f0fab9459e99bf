//! Optional observability helpers for token fetches.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `token_broker.fetch` with the `provider`
//!   (backend kind) and `stage` (call site) fields, and to install a `tracing-subscriber`
//!   formatter through [`init_subscriber`].
//! - Enable `metrics` to increment the `token_broker_fetch_total` counter for every
//!   attempt/cache hit/success/failure, labeled by `provider` + `outcome`.

mod metrics;
mod subscriber;
mod tracing;

pub use metrics::*;
pub use subscriber::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Outcome labels recorded for each token request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FetchOutcome {
	/// Entry to a backend's token call.
	Attempt,
	/// Answered from the in-memory cache.
	CacheHit,
	/// Upstream fetch completed successfully.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FetchOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FetchOutcome::Attempt => "attempt",
			FetchOutcome::CacheHit => "cache_hit",
			FetchOutcome::Success => "success",
			FetchOutcome::Failure => "failure",
		}
	}
}
impl Display for FetchOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
