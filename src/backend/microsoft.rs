//! OAuth2 client-credentials backend.

// crates.io
use reqwest::StatusCode;
// self
use crate::{
	_prelude::*,
	cache::{FetchedToken, TokenCache},
	context::TokenContext,
	error::{ConfigError, UpstreamError},
	http,
	provider::{ProviderDescriptor, RegistryOptions},
	secret::Secret,
	tokenizer::{ProviderKind, TokenFuture, Tokenizer},
};

const GRANT_TYPE: &str = "client_credentials";

#[derive(Deserialize)]
struct TokenResponse {
	#[serde(default)]
	access_token: Option<String>,
	#[serde(default)]
	expires_in: Option<ExpiresIn>,
	#[serde(default)]
	error_description: Option<String>,
}

// Some identity endpoints encode `expires_in` as a string.
#[derive(Deserialize)]
#[serde(untagged)]
enum ExpiresIn {
	Seconds(i64),
	Text(String),
}
impl ExpiresIn {
	fn lifetime(&self) -> Result<Duration> {
		let seconds = match self {
			Self::Seconds(value) => *value,
			Self::Text(raw) => raw.trim().parse::<i64>().map_err(|_| {
				UpstreamError::incomplete(format!("invalid expires_in value: {raw:?}"))
			})?,
		};

		if seconds <= 0 {
			return Err(UpstreamError::incomplete("token response has a non-positive expires_in").into());
		}

		Ok(Duration::seconds(seconds))
	}
}

#[derive(Default, Deserialize)]
struct ErrorResponse {
	#[serde(default)]
	error_description: Option<String>,
}

/// Validated client-credentials settings.
#[derive(Clone, Debug)]
pub struct MicrosoftConfig {
	/// OAuth2 client identifier.
	pub client_id: String,
	/// OAuth2 client secret.
	pub client_secret: Secret,
	/// Requested `resource`.
	pub resource: String,
	/// Token endpoint.
	pub login_endpoint: Url,
}
impl MicrosoftConfig {
	/// Extracts and validates the fields this backend needs.
	pub fn from_descriptor(descriptor: &ProviderDescriptor) -> Result<Self, ConfigError> {
		const KIND: &str = "microsoft";

		let client_id = descriptor.require(KIND, "clientId", &descriptor.client_id)?.to_owned();
		let client_secret =
			descriptor.require_secret(KIND, "clientSecret", &descriptor.client_secret)?;
		let resource = descriptor.require(KIND, "resource", &descriptor.resource)?.to_owned();
		let login_endpoint =
			descriptor.require_url(KIND, "loginEndpoint", &descriptor.login_endpoint)?;

		Ok(Self { client_id, client_secret, resource, login_endpoint })
	}
}

/// Exchanges client credentials for an access token and caches it for `expires_in`.
#[derive(Debug)]
pub struct MicrosoftTokenizer {
	http: ReqwestClient,
	config: MicrosoftConfig,
	cache: TokenCache,
}
impl MicrosoftTokenizer {
	/// Creates a tokenizer from validated settings.
	pub fn new(http: ReqwestClient, config: MicrosoftConfig) -> Self {
		Self { http, config, cache: TokenCache::new(ProviderKind::Microsoft) }
	}

	/// Validates `descriptor` and builds the tokenizer with its own HTTP client.
	pub fn from_descriptor(
		descriptor: &ProviderDescriptor,
		options: &RegistryOptions,
	) -> Result<Self, ConfigError> {
		let config = MicrosoftConfig::from_descriptor(descriptor)?;
		let http = http::build_client(&descriptor.name, options.timeout, None)?;

		Ok(Self::new(http, config))
	}

	/// Cache backing this instance.
	pub fn cache(&self) -> &TokenCache {
		&self.cache
	}

	async fn fetch(&self) -> Result<FetchedToken> {
		let form = [
			("grant_type", GRANT_TYPE),
			("client_id", self.config.client_id.as_str()),
			("client_secret", self.config.client_secret.expose()),
			("resource", self.config.resource.as_str()),
		];
		let response = self
			.http
			.post(self.config.login_endpoint.clone())
			.form(&form)
			.send()
			.await
			.map_err(http::transport_error)?;
		let status = response.status();
		let body = http::read_body(response).await?;

		if !status.is_success() {
			return Err(rejection(status, &body));
		}

		let payload: TokenResponse = http::decode_json(&body)?;
		let Some(access_token) = payload.access_token.filter(|token| !token.is_empty()) else {
			return Err(match payload.error_description.filter(|reason| !reason.is_empty()) {
				Some(reason) => UpstreamError::Rejected { status: Some(status.as_u16()), reason },
				None => UpstreamError::incomplete("token response is missing access_token"),
			}
			.into());
		};
		let lifetime = payload
			.expires_in
			.ok_or_else(|| UpstreamError::incomplete("token response is missing expires_in"))?
			.lifetime()?;

		Ok(FetchedToken::valid_for(access_token, lifetime))
	}
}
impl Tokenizer for MicrosoftTokenizer {
	fn token<'a>(&'a self, ctx: &'a TokenContext) -> TokenFuture<'a> {
		Box::pin(self.cache.get_or_refresh(ctx, || self.fetch()))
	}

	fn kind(&self) -> ProviderKind {
		ProviderKind::Microsoft
	}
}

fn rejection(status: StatusCode, body: &[u8]) -> Error {
	let description = serde_json::from_slice::<ErrorResponse>(body)
		.unwrap_or_default()
		.error_description
		.filter(|reason| !reason.is_empty());

	match description {
		Some(reason) => UpstreamError::Rejected { status: Some(status.as_u16()), reason }.into(),
		None => http::rejected(status),
	}
}
