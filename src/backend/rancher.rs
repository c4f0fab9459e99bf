//! Proprietary-login backend for Rancher's local auth provider.
//!
//! The login endpoint answers `201 Created` with `{ "token", "expiresAt", "ttl" }`. When the
//! response carries neither an absolute expiry nor a positive TTL the token is handed out once
//! and never reused; `shortExpiration` replaces whatever lifetime the server reported.

// crates.io
use reqwest::StatusCode;
use time::format_description::well_known::Rfc3339;
// self
use crate::{
	_prelude::*,
	cache::{Expiry, FetchedToken, TokenCache},
	context::TokenContext,
	error::{ConfigError, UpstreamError},
	http,
	provider::{ProviderDescriptor, RegistryOptions},
	secret::Secret,
	tokenizer::{ProviderKind, TokenFuture, Tokenizer},
};

const RESPONSE_TYPE: &str = "json";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
	response_type: &'a str,
	username: &'a str,
	password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
	#[serde(default)]
	token: Option<String>,
	#[serde(default)]
	expires_at: Option<String>,
	#[serde(default)]
	ttl: Option<i64>,
}
impl LoginResponse {
	fn expiry(&self) -> Expiry {
		let absolute = self
			.expires_at
			.as_deref()
			.map(str::trim)
			.filter(|raw| !raw.is_empty())
			.and_then(|raw| OffsetDateTime::parse(raw, &Rfc3339).ok());

		if let Some(instant) = absolute {
			return Expiry::At(instant);
		}

		match self.ttl {
			Some(millis) if millis > 0 => Expiry::In(Duration::milliseconds(millis)),
			_ => Expiry::NEVER_REUSE,
		}
	}
}

/// Validated login settings.
#[derive(Clone, Debug)]
pub struct RancherConfig {
	/// Login URL, including the `?action=login` query.
	pub url: Url,
	/// Login user.
	pub username: String,
	/// Login password.
	pub password: Secret,
	/// Lifetime override applied to every fetched token.
	pub short_expiration: Option<Duration>,
}
impl RancherConfig {
	/// Extracts and validates the fields this backend needs.
	pub fn from_descriptor(descriptor: &ProviderDescriptor) -> Result<Self, ConfigError> {
		const KIND: &str = "rancher";

		let username = descriptor.require(KIND, "username", &descriptor.username)?.to_owned();
		let password = descriptor.require_secret(KIND, "password", &descriptor.password)?;
		let url = descriptor.require_url(KIND, "url", &descriptor.url)?;

		Ok(Self { url, username, password, short_expiration: descriptor.short_expiration() })
	}
}

/// Logs in with a username and password and caches the issued session token.
#[derive(Debug)]
pub struct RancherTokenizer {
	http: ReqwestClient,
	config: RancherConfig,
	cache: TokenCache,
}
impl RancherTokenizer {
	/// Creates a tokenizer from validated settings.
	pub fn new(http: ReqwestClient, config: RancherConfig) -> Self {
		let cache =
			TokenCache::new(ProviderKind::Rancher).with_short_expiration(config.short_expiration);

		Self { http, config, cache }
	}

	/// Validates `descriptor` and builds the tokenizer, trusting `rootCA` when present.
	pub fn from_descriptor(
		descriptor: &ProviderDescriptor,
		options: &RegistryOptions,
	) -> Result<Self, ConfigError> {
		let config = RancherConfig::from_descriptor(descriptor)?;
		let http =
			http::build_client(&descriptor.name, options.timeout, Some(descriptor.root_ca.as_str()))?;

		Ok(Self::new(http, config))
	}

	/// Cache backing this instance.
	pub fn cache(&self) -> &TokenCache {
		&self.cache
	}

	async fn fetch(&self) -> Result<FetchedToken> {
		let request = LoginRequest {
			response_type: RESPONSE_TYPE,
			username: &self.config.username,
			password: self.config.password.expose(),
		};
		let response = self
			.http
			.post(self.config.url.clone())
			.json(&request)
			.send()
			.await
			.map_err(http::transport_error)?;
		let status = response.status();

		if status != StatusCode::CREATED {
			return Err(http::rejected(status));
		}

		let body = http::read_body(response).await?;
		let payload: LoginResponse = http::decode_json(&body)?;
		let expiry = payload.expiry();
		let token = payload
			.token
			.filter(|token| !token.is_empty())
			.ok_or_else(|| UpstreamError::incomplete("login response is missing token"))?;

		Ok(FetchedToken::new(token, expiry))
	}
}
impl Tokenizer for RancherTokenizer {
	fn token<'a>(&'a self, ctx: &'a TokenContext) -> TokenFuture<'a> {
		Box::pin(self.cache.get_or_refresh(ctx, || self.fetch()))
	}

	fn kind(&self) -> ProviderKind {
		ProviderKind::Rancher
	}
}
