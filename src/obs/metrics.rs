// self
use crate::{obs::FetchOutcome, tokenizer::ProviderKind};

/// Counter bumped once per [`FetchOutcome`] observed for a backend.
pub const FETCH_TOTAL: &str = "token_broker_fetch_total";

/// Counts `outcome` for a `kind` backend; compiled out without the `metrics` feature.
pub fn record_fetch_outcome(kind: ProviderKind, outcome: FetchOutcome) {
	#[cfg(feature = "metrics")]
	metrics::counter!(FETCH_TOTAL, "provider" => kind.as_str(), "outcome" => outcome.as_str())
		.increment(1);

	#[cfg(not(feature = "metrics"))]
	let _ = (kind, outcome);
}
