//! Shared API-key check for every authenticated route.

// crates.io
use axum::{
	Json,
	extract::{Request, State},
	http::StatusCode,
	middleware::Next,
	response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, api::AppState, api::handler::ErrorBody};

/// Request header carrying the shared secret.
pub const API_KEY_HEADER: &str = "Api-Key";

const BAD_API_KEY: &str = "bad api key";

/// SHA-256 digest of the configured API key.
///
/// Keys are compared digest to digest, so the comparison time depends on neither the length nor
/// the content of the presented key.
#[derive(Clone, Copy)]
pub struct ApiKey([u8; 32]);
impl ApiKey {
	/// Digests the configured key.
	pub fn new(key: &str) -> Self {
		Self(digest(key))
	}

	/// Constant-time comparison against a presented key.
	pub fn verify(&self, presented: &str) -> bool {
		let presented = digest(presented);

		self.0.iter().zip(presented.iter()).fold(0_u8, |diff, (a, b)| diff | (a ^ b)) == 0
	}
}
impl Debug for ApiKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("ApiKey(<redacted>)")
	}
}

/// Rejects requests whose `Api-Key` header does not match with `403 {"error":"bad api key"}`.
pub async fn require_api_key(State(state): State<AppState>, req: Request, next: Next) -> Response {
	let presented = req
		.headers()
		.get(API_KEY_HEADER)
		.and_then(|value| value.to_str().ok())
		.unwrap_or_default();

	if !state.api_key.verify(presented) {
		#[cfg(feature = "tracing")]
		tracing::warn!(path = %req.uri().path(), "rejected request with a bad api key");

		return (StatusCode::FORBIDDEN, Json(ErrorBody::new(BAD_API_KEY))).into_response();
	}

	next.run(req).await
}

fn digest(value: &str) -> [u8; 32] {
	Sha256::digest(value.as_bytes()).into()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn verify_matches_only_the_configured_key() {
		let key = ApiKey::new("s3cret");

		assert!(key.verify("s3cret"));
		assert!(!key.verify("s3cre"));
		assert!(!key.verify("s3cret "));
		assert!(!key.verify(""));
	}

	#[test]
	fn debug_redacts_digest() {
		assert_eq!(format!("{:?}", ApiKey::new("s3cret")), "ApiKey(<redacted>)");
	}
}
