//! Broker-level error types shared across the registry, backends, and HTTP surface.

// std
use std::{io::Error as IoError, path::PathBuf};
// self
use crate::_prelude::*;

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical broker error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem; fatal at startup.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Upstream backend failed for this call only.
	#[error(transparent)]
	Upstream(#[from] UpstreamError),
	/// Caller-driven cancellation or deadline.
	#[error(transparent)]
	Cancelled(#[from] CancelledError),
	/// Caller supplied missing or malformed request data.
	#[error(transparent)]
	Request(#[from] RequestError),

	/// No provider is registered under the requested name.
	#[error("unsupported token provider: {name}")]
	UnsupportedProvider {
		/// Provider name as requested by the caller.
		name: String,
	},
	/// The HTTP server stopped with an I/O failure.
	#[error("HTTP server failed: {source}")]
	Serve {
		/// Underlying I/O failure.
		#[source]
		source: IoError,
	},
}
impl Error {
	/// Returns `true` when the failure was caused by the caller rather than an upstream.
	pub fn is_caller_error(&self) -> bool {
		matches!(self, Self::UnsupportedProvider { .. } | Self::Request(_))
	}
}

/// Configuration and validation failures raised while building the broker.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// The descriptor set handed to the registry was empty.
	#[error("no token providers found")]
	NoDescriptors,
	/// The descriptor directory contained no entries at all.
	#[error("no token providers found in directory: {}", dir.display())]
	NoProvidersInDirectory {
		/// Directory that was scanned.
		dir: PathBuf,
	},
	/// Every entry in the descriptor directory was skipped.
	#[error("no usable token providers found")]
	NoUsableProviders,
	/// The descriptor directory could not be listed.
	#[error("failed to read token provider directory {}: {source}", dir.display())]
	ReadDirectory {
		/// Directory that was scanned.
		dir: PathBuf,
		/// Underlying I/O failure.
		#[source]
		source: IoError,
	},
	/// A descriptor file is not valid JSON for the descriptor shape.
	#[error("parse provider config {source_name}: {source}")]
	ParseDescriptor {
		/// File (or other source) the descriptor came from.
		source_name: String,
		/// Structured parsing failure including the JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Descriptor is missing its `name`.
	#[error("no \"name\" found in token provider config {source_name}")]
	MissingName {
		/// File (or other source) the descriptor came from.
		source_name: String,
	},
	/// Two descriptors share a case-insensitive name.
	#[error("duplicate token provider listed: {name} (conflicts with {existing})")]
	DuplicateProvider {
		/// Name of the rejected descriptor.
		name: String,
		/// Name of the previously accepted descriptor.
		existing: String,
	},
	/// Descriptor `type` does not match any backend.
	#[error("unsupported token provider type: {kind}")]
	UnsupportedType {
		/// Provider name.
		name: String,
		/// Raw type string from the descriptor.
		kind: String,
	},
	/// Backend-specific required field is absent or empty.
	#[error("{kind} token provider {name} missing required \"{field}\" attribute")]
	MissingField {
		/// Backend type label.
		kind: &'static str,
		/// Provider name.
		name: String,
		/// Descriptor field name as written in JSON.
		field: &'static str,
	},
	/// Endpoint field does not parse as an absolute URL.
	#[error("token provider {name} has an invalid \"{field}\" URL: {source}")]
	InvalidUrl {
		/// Provider name.
		name: String,
		/// Descriptor field name as written in JSON.
		field: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// `rootCA` contains no usable PEM certificate.
	#[error("token provider {name} has an invalid \"rootCA\" PEM")]
	InvalidRootCa {
		/// Provider name.
		name: String,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// The HTTP listener could not be bound.
	#[error("failed to bind {addr}: {source}")]
	Bind {
		/// Address that was requested.
		addr: String,
		/// Underlying I/O failure.
		#[source]
		source: IoError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}

/// Per-call upstream failures; the cache is never touched when one is returned.
#[derive(Debug, ThisError)]
pub enum UpstreamError {
	/// Network, DNS, TLS, or connection failure.
	#[error("error making request: {source}")]
	Unreachable {
		/// Transport-specific failure.
		#[source]
		source: ReqwestError,
	},
	/// Upstream answered with a non-success status.
	///
	/// `reason` is either the upstream's `error_description` or the status line; response
	/// bodies are never echoed otherwise.
	#[error("error getting token: {reason}")]
	Rejected {
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Status line or provider-supplied description.
		reason: String,
	},
	/// Upstream body could not be decoded.
	#[error("error unmarshaling body: {source}")]
	Malformed {
		/// Structured parsing failure including the JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Upstream body decoded but lacks the data the broker needs.
	#[error("{reason}")]
	Incomplete {
		/// Human-readable description of what is missing.
		reason: String,
	},
}
impl UpstreamError {
	/// Builds an [`UpstreamError::Incomplete`] from any displayable reason.
	pub fn incomplete(reason: impl Into<String>) -> Self {
		Self::Incomplete { reason: reason.into() }
	}
}

/// Cancellation observed through the caller's [`TokenContext`](crate::context::TokenContext).
#[derive(Clone, Copy, Debug, PartialEq, Eq, ThisError)]
pub enum CancelledError {
	/// The caller cancelled the request explicitly.
	#[error("context canceled")]
	Canceled,
	/// The caller's deadline (or the transport timeout) elapsed.
	#[error("context deadline exceeded")]
	DeadlineExceeded,
}

/// Request data required by a backend is missing or malformed.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum RequestError {
	/// The context did not carry a requested provider name.
	#[error("cluster name not found in context")]
	MissingClusterName,
	/// The requested provider name does not embed a cluster name.
	#[error("invalid cluster name format")]
	InvalidClusterName,
}
