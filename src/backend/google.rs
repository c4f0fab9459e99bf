//! Metadata-service backend.
//!
//! The co-located metadata server already caches service-account tokens, so this backend
//! holds no [`TokenCache`](crate::cache::TokenCache) and every call is a fresh local request.

// crates.io
use reqwest::StatusCode;
// self
use crate::{
	_prelude::*,
	context::TokenContext,
	error::{ConfigError, UpstreamError},
	http,
	obs::{self, FetchOutcome, FetchSpan},
	tokenizer::{ProviderKind, TokenFuture, Tokenizer},
};

/// Metadata host used when none is configured.
pub const DEFAULT_METADATA_HOST: &str = "metadata.google.internal";

const TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";
const METADATA_FLAVOR: (&str, &str) = ("Metadata-Flavor", "Google");

#[derive(Deserialize)]
struct MetadataToken {
	#[serde(default)]
	access_token: Option<String>,
}

/// Fetches the default service account's token from the metadata server.
#[derive(Clone, Debug)]
pub struct GoogleTokenizer {
	http: ReqwestClient,
	endpoint: Url,
}
impl GoogleTokenizer {
	/// Targets `metadata_host`, given either as `host[:port]` or as a full base URL.
	pub fn new(name: &str, http: ReqwestClient, metadata_host: &str) -> Result<Self, ConfigError> {
		let host = metadata_host.trim().trim_end_matches('/');
		let base = if host.contains("://") { host.to_owned() } else { format!("http://{host}") };
		let endpoint = Url::parse(&format!("{base}{TOKEN_PATH}")).map_err(|source| {
			ConfigError::InvalidUrl { name: name.to_owned(), field: "metadataHost", source }
		})?;

		Ok(Self { http, endpoint })
	}

	/// Token endpoint this instance calls.
	pub fn endpoint(&self) -> &Url {
		&self.endpoint
	}

	async fn fetch(&self) -> Result<String> {
		let response = self
			.http
			.get(self.endpoint.clone())
			.header(METADATA_FLAVOR.0, METADATA_FLAVOR.1)
			.send()
			.await
			.map_err(http::transport_error)?;
		let status = response.status();

		if status != StatusCode::OK {
			return Err(http::rejected(status));
		}

		let body = http::read_body(response).await?;
		let token: MetadataToken = http::decode_json(&body)?;

		token
			.access_token
			.filter(|value| !value.is_empty())
			.ok_or_else(|| UpstreamError::incomplete("metadata response is missing access_token").into())
	}
}
impl Tokenizer for GoogleTokenizer {
	fn token<'a>(&'a self, ctx: &'a TokenContext) -> TokenFuture<'a> {
		const KIND: ProviderKind = ProviderKind::Google;

		Box::pin(async move {
			obs::record_fetch_outcome(KIND, FetchOutcome::Attempt);

			let result: Result<String> = FetchSpan::new(KIND, "metadata")
				.instrument(async move { ctx.run(self.fetch()).await? })
				.await;

			match &result {
				Ok(_) => obs::record_fetch_outcome(KIND, FetchOutcome::Success),
				Err(_) => obs::record_fetch_outcome(KIND, FetchOutcome::Failure),
			}

			result
		})
	}

	fn kind(&self) -> ProviderKind {
		ProviderKind::Google
	}
}
