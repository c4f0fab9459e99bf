//! Per-instance cache/refresh unit embedded in every caching backend.
//!
//! A [`TokenCache`] holds the last fetched token and its computed expiry. Calls first take a
//! consistent snapshot of the record (fast path). When the snapshot is missing or stale the
//! caller acquires the instance's refresh lock, re-checks freshness (a concurrent caller may
//! have refreshed while this one waited), and only then drives exactly one upstream fetch.
//! Concurrent callers therefore collapse into a single round trip per instance, while
//! different instances never share a lock.
//!
//! A failed fetch leaves the previous record untouched and is reported to that caller only;
//! the next caller retries on its own.

// self
use crate::{
	_prelude::*,
	context::TokenContext,
	error::UpstreamError,
	obs::{self, FetchOutcome, FetchSpan},
	secret::Secret,
	tokenizer::ProviderKind,
};

/// Lifetime reported by an upstream for a freshly fetched token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Expiry {
	/// Relative lifetime measured from the moment of the call.
	In(Duration),
	/// Absolute expiry instant.
	At(OffsetDateTime),
}
impl Expiry {
	/// Token that must not be reused.
	pub const NEVER_REUSE: Self = Self::In(Duration::ZERO);

	fn resolve(self, now: OffsetDateTime) -> OffsetDateTime {
		match self {
			Self::In(lifetime) => saturating_add(now, lifetime),
			Self::At(instant) => instant,
		}
	}
}

/// Token returned by a backend's upstream call.
#[derive(Clone, Debug)]
pub struct FetchedToken {
	/// Token value handed to callers.
	pub value: Secret,
	/// Upstream-declared lifetime.
	pub expiry: Expiry,
}
impl FetchedToken {
	/// Creates a fetched token valid for `lifetime` from now.
	pub fn valid_for(value: impl Into<String>, lifetime: Duration) -> Self {
		Self { value: Secret::new(value), expiry: Expiry::In(lifetime) }
	}

	/// Creates a fetched token valid until `instant`.
	pub fn valid_until(value: impl Into<String>, instant: OffsetDateTime) -> Self {
		Self { value: Secret::new(value), expiry: Expiry::At(instant) }
	}

	/// Creates a fetched token with the given expiry.
	pub fn new(value: impl Into<String>, expiry: Expiry) -> Self {
		Self { value: Secret::new(value), expiry }
	}
}

/// Immutable cached record; replaced wholesale on every refresh.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedToken {
	/// Cached token value.
	pub value: Secret,
	/// Instant after which the value is stale.
	pub expires_at: OffsetDateTime,
}
impl CachedToken {
	/// Returns `true` while `expires_at` is strictly after `now`.
	pub fn is_fresh_at(&self, now: OffsetDateTime) -> bool {
		self.expires_at > now
	}
}

/// Cache/refresh state machine for a single provider instance.
pub struct TokenCache {
	kind: ProviderKind,
	short_expiration: Option<Duration>,
	record: RwLock<Option<CachedToken>>,
	refresh: AsyncMutex<()>,
}
impl TokenCache {
	/// Creates an empty cache for a backend of the given kind.
	pub fn new(kind: ProviderKind) -> Self {
		Self { kind, short_expiration: None, record: RwLock::new(None), refresh: AsyncMutex::new(()) }
	}

	/// Replaces every upstream lifetime with `lifetime` when set.
	pub fn with_short_expiration(mut self, lifetime: Option<Duration>) -> Self {
		self.short_expiration = lifetime.map(|value| value.max(Duration::ZERO));

		self
	}

	/// Configured short-expiration override.
	pub fn short_expiration(&self) -> Option<Duration> {
		self.short_expiration
	}

	/// Consistent copy of the current record.
	pub fn snapshot(&self) -> Option<CachedToken> {
		self.record.read().clone()
	}

	/// Returns the cached value if it is still fresh at `now`.
	pub fn fresh_at(&self, now: OffsetDateTime) -> Option<String> {
		self.record
			.read()
			.as_ref()
			.filter(|record| record.is_fresh_at(now))
			.map(|record| record.value.expose().to_owned())
	}

	/// Computes the expiry stored for a token fetched at `now`.
	pub fn expires_at(&self, expiry: Expiry, now: OffsetDateTime) -> OffsetDateTime {
		match self.short_expiration {
			Some(lifetime) => saturating_add(now, lifetime),
			None => expiry.resolve(now),
		}
	}

	/// Returns a fresh cached token or drives `fetch` once under the refresh lock.
	///
	/// Both the lock wait and the fetch are bounded by `ctx`; on cancellation or failure the
	/// previous record is kept as it was.
	pub async fn get_or_refresh<F, Fut>(&self, ctx: &TokenContext, fetch: F) -> Result<String>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<FetchedToken>>,
	{
		let kind = self.kind;

		obs::record_fetch_outcome(kind, FetchOutcome::Attempt);

		if let Some(value) = self.fresh_at(OffsetDateTime::now_utc()) {
			obs::record_fetch_outcome(kind, FetchOutcome::CacheHit);

			return Ok(value);
		}

		let span = FetchSpan::new(kind, "refresh");
		let result: Result<(String, bool)> = span
			.instrument(async move {
				let _refresh = ctx.run(self.refresh.lock()).await?;

				if let Some(value) = self.fresh_at(OffsetDateTime::now_utc()) {
					return Ok((value, true));
				}

				let now = OffsetDateTime::now_utc();
				let fetched = ctx.run(fetch()).await??;

				if fetched.value.expose().is_empty() {
					return Err(UpstreamError::incomplete("upstream returned an empty token").into());
				}

				let record = CachedToken {
					expires_at: self.expires_at(fetched.expiry, now),
					value: fetched.value,
				};
				let value = record.value.expose().to_owned();

				*self.record.write() = Some(record);

				Ok((value, false))
			})
			.await;

		match result {
			Ok((value, true)) => {
				obs::record_fetch_outcome(kind, FetchOutcome::CacheHit);

				Ok(value)
			},
			Ok((value, false)) => {
				obs::record_fetch_outcome(kind, FetchOutcome::Success);

				Ok(value)
			},
			Err(err) => {
				obs::record_fetch_outcome(kind, FetchOutcome::Failure);

				Err(err)
			},
		}
	}
}
impl Debug for TokenCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenCache")
			.field("kind", &self.kind)
			.field("short_expiration", &self.short_expiration)
			.field("cached", &self.record.read().is_some())
			.finish()
	}
}

fn saturating_add(now: OffsetDateTime, lifetime: Duration) -> OffsetDateTime {
	now.checked_add(lifetime).unwrap_or_else(|| PrimitiveDateTime::MAX.assume_utc())
}
