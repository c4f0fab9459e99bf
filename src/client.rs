//! Minimal client for a running broker's `/tokens` endpoint.

// crates.io
use reqwest::StatusCode;
// self
use crate::{
	_prelude::*,
	api::{API_KEY_HEADER, TokenBody},
	error::ConfigError,
	http,
	secret::Secret,
};

/// Requests tokens from a broker with the shared API key.
#[derive(Clone, Debug)]
pub struct BrokerClient {
	http: ReqwestClient,
	endpoint: Url,
	api_key: Secret,
}
impl BrokerClient {
	/// Targets the broker at `base_url` (e.g. `http://token-broker:1982`).
	pub fn new(base_url: &str, api_key: impl Into<Secret>) -> Result<Self, ConfigError> {
		let http = http::build_client("broker", crate::provider::DEFAULT_TIMEOUT, None)?;

		Self::with_client(http, base_url, api_key)
	}

	/// Like [`new`](Self::new) with a caller-supplied HTTP client.
	pub fn with_client(
		http: ReqwestClient,
		base_url: &str,
		api_key: impl Into<Secret>,
	) -> Result<Self, ConfigError> {
		let endpoint = Url::parse(&format!("{}/tokens", base_url.trim_end_matches('/')))
			.map_err(|source| ConfigError::InvalidUrl {
				name: "broker".into(),
				field: "baseUrl",
				source,
			})?;

		Ok(Self { http, endpoint, api_key: api_key.into() })
	}

	/// Fetches a token for `provider`; `None` asks for the broker's default provider.
	pub async fn token(&self, provider: Option<&str>) -> Result<String> {
		let mut endpoint = self.endpoint.clone();

		if let Some(provider) = provider {
			endpoint.query_pairs_mut().append_pair("provider", provider);
		}

		let response = self
			.http
			.get(endpoint)
			.header(API_KEY_HEADER, self.api_key.expose())
			.send()
			.await
			.map_err(http::transport_error)?;
		let status = response.status();

		if status != StatusCode::OK {
			return Err(http::rejected(status));
		}

		let body = http::read_body(response).await?;
		let TokenBody { token } = http::decode_json(&body)?;

		Ok(token)
	}
}
