//! Secret-store backend reading per-cluster kubeconfig tokens from a KV v2 mount.
//!
//! One registered instance serves many clusters. Callers address a cluster by requesting
//! `<registered-name>-<lifecycle>-<cluster>`, e.g. `vault-k8s-np-rancher-int` for cluster
//! `rancher-int`. Cluster names are limited to `[A-Za-z0-9._-]` and may not be `.` or `..`.
//!
//! Tokens are only reused when `shortExpiration` is configured. In that case each cluster gets
//! its own [`TokenCache`], so refreshes for different clusters never wait on each other; a
//! cluster's cache is dropped again when it fails before ever holding a token.

// crates.io
use reqwest::StatusCode;
// self
use crate::{
	_prelude::*,
	cache::{Expiry, FetchedToken, TokenCache},
	context::TokenContext,
	error::{ConfigError, RequestError, UpstreamError},
	http,
	provider::{ProviderDescriptor, RegistryOptions},
	secret::Secret,
	tokenizer::{ProviderKind, TokenFuture, Tokenizer},
};

/// Secret path used when neither the descriptor nor the process configures one.
pub const DEFAULT_PATH_PATTERN: &str = "secret/data/[CLUSTER]/kubeconfig";
/// Placeholder replaced with the cluster name.
pub const CLUSTER_PLACEHOLDER: &str = "[CLUSTER]";

const TOKEN_HEADER: &str = "X-Vault-Token";
// "-" + two-letter lifecycle.
const MIN_SUFFIX_LEN: usize = 3;
// "-" + two-letter lifecycle + "-".
const PREFIX_SUFFIX_LEN: usize = 4;

#[derive(Deserialize)]
struct SecretResponse {
	#[serde(default)]
	data: Option<KubeconfigSecret>,
}

#[derive(Deserialize)]
struct KubeconfigSecret {
	#[serde(default)]
	data: KubeconfigData,
}

#[derive(Default, Deserialize)]
struct KubeconfigData {
	#[serde(default)]
	users: Vec<KubeconfigUser>,
}

#[derive(Deserialize)]
struct KubeconfigUser {
	#[serde(default)]
	user: KubeconfigCredentials,
}

#[derive(Default, Deserialize)]
struct KubeconfigCredentials {
	#[serde(default)]
	token: String,
}

/// Validated secret-store settings.
#[derive(Clone, Debug)]
pub struct VaultConfig {
	/// Registered provider name; the prefix of every routed request.
	pub name: String,
	/// Store address.
	pub url: Url,
	/// Store access token.
	pub token: Secret,
	/// Secret path with a `[CLUSTER]` placeholder.
	pub path_pattern: String,
	/// Lifetime override; without it tokens are never reused.
	pub short_expiration: Option<Duration>,
}
impl VaultConfig {
	/// Extracts and validates the fields this backend needs.
	///
	/// A descriptor-level `pathPattern` takes precedence over `default_pattern`.
	pub fn from_descriptor(
		descriptor: &ProviderDescriptor,
		default_pattern: &str,
	) -> Result<Self, ConfigError> {
		const KIND: &str = "vault-k8s";

		let url = descriptor.require_url(KIND, "url", &descriptor.url)?;
		let token = descriptor.require_secret(KIND, "password", &descriptor.password)?;
		let path_pattern = match descriptor.path_pattern.trim() {
			"" => default_pattern.to_owned(),
			pattern => pattern.to_owned(),
		};

		Ok(Self {
			name: descriptor.name.clone(),
			url,
			token,
			path_pattern,
			short_expiration: descriptor.short_expiration(),
		})
	}
}

/// Reads the first kubeconfig user's token for the cluster named in the request.
#[derive(Debug)]
pub struct VaultTokenizer {
	http: ReqwestClient,
	config: VaultConfig,
	caches: Mutex<HashMap<String, Arc<TokenCache>>>,
}
impl VaultTokenizer {
	/// Creates a tokenizer from validated settings.
	pub fn new(http: ReqwestClient, config: VaultConfig) -> Self {
		Self { http, config, caches: Mutex::new(HashMap::new()) }
	}

	/// Validates `descriptor` and builds the tokenizer with its own HTTP client.
	pub fn from_descriptor(
		descriptor: &ProviderDescriptor,
		options: &RegistryOptions,
	) -> Result<Self, ConfigError> {
		let config = VaultConfig::from_descriptor(descriptor, &options.secret_store_path_pattern)?;
		let http = http::build_client(&descriptor.name, options.timeout, None)?;

		Ok(Self::new(http, config))
	}

	/// Extracts the cluster name from a routed provider name.
	pub fn cluster_name<'a>(&self, requested: &'a str) -> Result<&'a str, RequestError> {
		let registered = self.config.name.len();

		if requested.len() < registered + MIN_SUFFIX_LEN {
			return Err(RequestError::InvalidClusterName);
		}

		match requested.get(registered + PREFIX_SUFFIX_LEN..) {
			Some(cluster) if is_valid_cluster(cluster) => Ok(cluster),
			_ => Err(RequestError::InvalidClusterName),
		}
	}

	/// Number of clusters currently holding a cache.
	pub fn cached_clusters(&self) -> usize {
		self.caches.lock().len()
	}

	/// Secret path for `cluster`.
	pub fn secret_path(&self, cluster: &str) -> String {
		self.config.path_pattern.replace(CLUSTER_PLACEHOLDER, cluster)
	}

	fn cache_for(&self, cluster: &str) -> Arc<TokenCache> {
		let mut caches = self.caches.lock();

		caches
			.entry(cluster.to_owned())
			.or_insert_with(|| {
				Arc::new(
					TokenCache::new(ProviderKind::VaultK8s)
						.with_short_expiration(self.config.short_expiration),
				)
			})
			.clone()
	}

	fn evict_if_empty(&self, cluster: &str, cache: &Arc<TokenCache>) {
		let mut caches = self.caches.lock();

		if caches.get(cluster).is_some_and(|held| Arc::ptr_eq(held, cache))
			&& cache.snapshot().is_none()
		{
			caches.remove(cluster);
		}
	}

	async fn fetch(&self, path: String) -> Result<FetchedToken> {
		let endpoint = format!(
			"{}/v1/{}",
			self.config.url.as_str().trim_end_matches('/'),
			path.trim_start_matches('/')
		);
		let endpoint = Url::parse(&endpoint).map_err(|_| RequestError::InvalidClusterName)?;
		let response = self
			.http
			.get(endpoint)
			.header(TOKEN_HEADER, self.config.token.expose())
			.send()
			.await
			.map_err(http::transport_error)?;
		let status = response.status();

		if status == StatusCode::NOT_FOUND {
			return Err(UpstreamError::incomplete(format!("secret not found at {path}")).into());
		}
		if !status.is_success() {
			return Err(http::rejected(status));
		}

		let body = http::read_body(response).await?;
		let payload: SecretResponse = http::decode_json(&body)?;
		let secret = payload
			.data
			.ok_or_else(|| UpstreamError::incomplete(format!("secret not found at {path}")))?;
		let user = secret
			.data
			.users
			.into_iter()
			.next()
			.ok_or_else(|| UpstreamError::incomplete("no users found in kubeconfig token"))?;

		Ok(FetchedToken::new(user.user.token, Expiry::NEVER_REUSE))
	}
}
impl Tokenizer for VaultTokenizer {
	fn token<'a>(&'a self, ctx: &'a TokenContext) -> TokenFuture<'a> {
		Box::pin(async move {
			let requested = ctx.provider().ok_or(RequestError::MissingClusterName)?;
			let cluster = self.cluster_name(requested)?;
			let path = self.secret_path(cluster);

			if self.config.short_expiration.is_none() {
				return TokenCache::new(ProviderKind::VaultK8s)
					.get_or_refresh(ctx, move || self.fetch(path))
					.await;
			}

			let cache = self.cache_for(cluster);
			let result = cache.get_or_refresh(ctx, move || self.fetch(path)).await;

			if result.is_err() {
				self.evict_if_empty(cluster, &cache);
			}

			result
		})
	}

	fn kind(&self) -> ProviderKind {
		ProviderKind::VaultK8s
	}

	fn accepts_qualified_names(&self) -> bool {
		true
	}
}

fn is_valid_cluster(cluster: &str) -> bool {
	!matches!(cluster, "" | "." | "..")
		&& cluster.bytes().all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'))
}
