// self
use crate::{_prelude::*, tokenizer::ProviderKind};

/// Span name shared by every upstream token fetch.
pub const FETCH_SPAN: &str = "token_broker.fetch";

/// Future returned by [`FetchSpan::instrument`]; the bare future when `tracing` is off.
#[cfg(feature = "tracing")]
pub type Traced<F> = tracing::instrument::Instrumented<F>;
/// Future returned by [`FetchSpan::instrument`]; the bare future when `tracing` is off.
#[cfg(not(feature = "tracing"))]
pub type Traced<F> = F;

/// `token_broker.fetch` span carrying the backend kind and the call site.
#[derive(Clone, Debug)]
pub struct FetchSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FetchSpan {
	/// Opens a span for a `kind` backend at `stage` (`refresh`, `metadata`, ...).
	pub fn new(kind: ProviderKind, stage: &'static str) -> Self {
		#[cfg(not(feature = "tracing"))]
		let _ = (kind, stage);

		Self {
			#[cfg(feature = "tracing")]
			span: tracing::info_span!(FETCH_SPAN, provider = kind.as_str(), stage),
		}
	}

	/// Attaches the span to `fut` so it is entered on every poll.
	pub fn instrument<Fut>(&self, fut: Fut) -> Traced<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			tracing::Instrument::instrument(fut, self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}
