//! Route handlers and the error-to-status mapping.

// crates.io
use axum::{
	Json,
	extract::{Query, State},
	http::StatusCode,
	response::{IntoResponse, Response},
};
// self
use crate::{_prelude::*, api::AppState, context::TokenContext};

/// Query string accepted by `GET /tokens`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TokenQuery {
	/// Requested provider; empty or absent selects the default provider.
	#[serde(default)]
	pub provider: Option<String>,
}

/// Successful `GET /tokens` body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBody {
	/// Issued access token.
	pub token: String,
}

/// Error body shared by every failing route.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
	/// Human-readable failure.
	pub error: String,
}
impl ErrorBody {
	/// Wraps a message.
	pub fn new(error: impl Into<String>) -> Self {
		Self { error: error.into() }
	}
}

/// `GET /healthz`: always `200` with an empty body.
pub async fn healthz() -> StatusCode {
	StatusCode::OK
}

/// `GET /tokens?provider=<name>`.
///
/// The requested name travels on the [`TokenContext`] so backends serving qualified names can
/// parse their suffix; the configured timeout becomes the call's deadline. Dropping this future
/// (client disconnect) drops the upstream call with it.
pub async fn tokens(State(state): State<AppState>, Query(query): Query<TokenQuery>) -> Response {
	let requested = query.provider.filter(|name| !name.is_empty());
	let Some((resolved, tokenizer)) = state.registry.lookup(requested.as_deref()) else {
		let name = requested.unwrap_or_else(|| state.registry.default_provider().to_owned());

		return Error::UnsupportedProvider { name }.into_response();
	};
	let provider = requested.unwrap_or_else(|| resolved.to_owned());
	let ctx = TokenContext::new().with_provider(provider.as_str()).with_timeout(state.timeout);

	match tokenizer.token(&ctx).await {
		Ok(token) => (StatusCode::OK, Json(TokenBody { token })).into_response(),
		Err(err) => {
			#[cfg(feature = "tracing")]
			tracing::warn!(provider = %provider, error = %err, "token request failed");

			err.into_response()
		},
	}
}

impl IntoResponse for Error {
	fn into_response(self) -> Response {
		let status = if self.is_caller_error() {
			StatusCode::BAD_REQUEST
		} else {
			StatusCode::INTERNAL_SERVER_ERROR
		};

		(status, Json(ErrorBody::new(self.to_string()))).into_response()
	}
}
