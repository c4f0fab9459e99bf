//! Shared reqwest plumbing for every backend.
//!
//! Backends never build their own [`ReqwestClient`]; [`build_client`] applies the default
//! timeout, disables redirect following (token endpoints answer directly), and appends an
//! optional PEM trust anchor. The remaining helpers translate transport and payload failures
//! into the broker's error taxonomy so every adapter reports them identically.

// crates.io
use reqwest::{Certificate, Response, StatusCode, redirect::Policy};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	error::{CancelledError, ConfigError, UpstreamError},
};

/// Builds the HTTP client used by one provider instance.
///
/// `root_ca` is appended to the built-in trust roots when present and must contain at least
/// one PEM certificate.
pub fn build_client(
	name: &str,
	timeout: StdDuration,
	root_ca: Option<&str>,
) -> Result<ReqwestClient, ConfigError> {
	let mut builder = ReqwestClient::builder().timeout(timeout).redirect(Policy::none());

	if let Some(pem) = root_ca.filter(|pem| !pem.trim().is_empty()) {
		let certificates = Certificate::from_pem_bundle(pem.as_bytes())
			.map_err(|_| ConfigError::InvalidRootCa { name: name.to_owned() })?;

		if certificates.is_empty() {
			return Err(ConfigError::InvalidRootCa { name: name.to_owned() });
		}

		for certificate in certificates {
			builder = builder.add_root_certificate(certificate);
		}
	}

	builder.build().map_err(ConfigError::http_client_build)
}

/// Renders a status as its status line, e.g. `500 Internal Server Error`.
pub fn status_line(status: StatusCode) -> String {
	status.to_string()
}

/// Rejection carrying only the status line; the body is never echoed.
pub fn rejected(status: StatusCode) -> Error {
	UpstreamError::Rejected { status: Some(status.as_u16()), reason: status_line(status) }.into()
}

/// Maps a reqwest failure; transport timeouts count as an exceeded deadline.
pub fn transport_error(err: ReqwestError) -> Error {
	if err.is_timeout() {
		CancelledError::DeadlineExceeded.into()
	} else {
		UpstreamError::Unreachable { source: err }.into()
	}
}

/// Reads the full response body.
pub async fn read_body(response: Response) -> Result<Vec<u8>> {
	let bytes = response.bytes().await.map_err(transport_error)?;

	Ok(bytes.to_vec())
}

/// Decodes a JSON payload, keeping the failing path in the error.
pub fn decode_json<T>(body: &[u8]) -> Result<T>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| UpstreamError::Malformed { source }.into())
}
