//! Immutable name → tokenizer map built once from descriptors.

// self
use crate::{
	_prelude::*,
	backend::{
		GoogleTokenizer, MicrosoftTokenizer, RancherTokenizer, VaultTokenizer, google,
		vault,
	},
	error::ConfigError,
	http,
	provider::{ProviderDescriptor, SourcedDescriptor},
	tokenizer::{ProviderKind, Tokenizer},
};

/// Provider name used when a request does not name one.
pub const DEFAULT_PROVIDER: &str = "google";
/// Per-call timeout applied when none is configured.
pub const DEFAULT_TIMEOUT: StdDuration = StdDuration::from_secs(30);

/// Process-level settings shared by every backend the registry constructs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistryOptions {
	/// HTTP timeout for every upstream call.
	pub timeout: StdDuration,
	/// Name resolved when a lookup is empty.
	pub default_provider: String,
	/// Metadata server host (or base URL) for `google` providers.
	pub metadata_host: String,
	/// Default secret path pattern for `vault-k8s` providers.
	pub secret_store_path_pattern: String,
}
impl RegistryOptions {
	/// Sets the upstream timeout.
	pub fn timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Sets the provider resolved for empty lookups.
	pub fn default_provider(mut self, name: impl Into<String>) -> Self {
		self.default_provider = name.into();

		self
	}

	/// Sets the metadata server host.
	pub fn metadata_host(mut self, host: impl Into<String>) -> Self {
		self.metadata_host = host.into();

		self
	}

	/// Sets the default secret path pattern.
	pub fn secret_store_path_pattern(mut self, pattern: impl Into<String>) -> Self {
		self.secret_store_path_pattern = pattern.into();

		self
	}
}
impl Default for RegistryOptions {
	fn default() -> Self {
		Self {
			timeout: DEFAULT_TIMEOUT,
			default_provider: DEFAULT_PROVIDER.into(),
			metadata_host: google::DEFAULT_METADATA_HOST.into(),
			secret_store_path_pattern: vault::DEFAULT_PATH_PATTERN.into(),
		}
	}
}

/// Live providers keyed by their registered name.
///
/// Built once at startup and shared read-only afterwards; lookups take no lock.
#[derive(Clone)]
pub struct ProviderRegistry {
	tokenizers: HashMap<String, Arc<dyn Tokenizer>>,
	default_provider: String,
}
impl ProviderRegistry {
	/// Validates every descriptor and constructs one tokenizer per descriptor.
	///
	/// The build is all-or-nothing: the first invalid descriptor aborts it.
	pub fn build<I>(descriptors: I, options: &RegistryOptions) -> Result<Self, ConfigError>
	where
		I: IntoIterator<Item = SourcedDescriptor>,
	{
		let mut descriptors = descriptors.into_iter().peekable();

		if descriptors.peek().is_none() {
			return Err(ConfigError::NoDescriptors);
		}

		let mut tokenizers = HashMap::new();
		// Lowercased name → name as first accepted.
		let mut seen = HashMap::<String, String>::new();

		for SourcedDescriptor { source, descriptor } in descriptors {
			let name = descriptor.name.trim();

			if name.is_empty() {
				return Err(ConfigError::MissingName { source_name: source });
			}
			if let Some(existing) = seen.get(&name.to_lowercase()) {
				return Err(ConfigError::DuplicateProvider {
					name: name.to_owned(),
					existing: existing.clone(),
				});
			}

			let tokenizer = construct(&descriptor, options)?;

			seen.insert(name.to_lowercase(), name.to_owned());
			tokenizers.insert(name.to_owned(), tokenizer);

			#[cfg(feature = "tracing")]
			tracing::debug!(provider = name, source = %source, "registered token provider");
		}

		if tokenizers.is_empty() {
			return Err(ConfigError::NoUsableProviders);
		}

		Ok(Self { tokenizers, default_provider: options.default_provider.clone() })
	}

	/// Registry holding the given tokenizers verbatim, for embedding and tests.
	pub fn from_tokenizers<I, S>(tokenizers: I, default_provider: impl Into<String>) -> Self
	where
		I: IntoIterator<Item = (S, Arc<dyn Tokenizer>)>,
		S: Into<String>,
	{
		Self {
			tokenizers: tokenizers.into_iter().map(|(name, t)| (name.into(), t)).collect(),
			default_provider: default_provider.into(),
		}
	}

	/// Resolves a requested name to a registered provider.
	///
	/// Empty or absent names resolve to the default provider. Exact names win; otherwise the
	/// longest registered name `N` whose tokenizer accepts qualified names and for which the
	/// request starts with `N-` is returned. The resolved registered name is returned with it.
	pub fn lookup(&self, requested: Option<&str>) -> Option<(&str, Arc<dyn Tokenizer>)> {
		let requested =
			requested.filter(|name| !name.is_empty()).unwrap_or(self.default_provider.as_str());

		if let Some((name, tokenizer)) = self.tokenizers.get_key_value(requested) {
			return Some((name.as_str(), tokenizer.clone()));
		}

		self.tokenizers
			.iter()
			.filter(|(name, tokenizer)| {
				tokenizer.accepts_qualified_names()
					&& requested.len() > name.len()
					&& requested.starts_with(name.as_str())
					&& requested.as_bytes()[name.len()] == b'-'
			})
			.max_by_key(|(name, _)| name.len())
			.map(|(name, tokenizer)| (name.as_str(), tokenizer.clone()))
	}

	/// Name resolved for empty lookups.
	pub fn default_provider(&self) -> &str {
		&self.default_provider
	}

	/// Registered names in sorted order.
	pub fn names(&self) -> Vec<&str> {
		let mut names = self.tokenizers.keys().map(String::as_str).collect::<Vec<_>>();

		names.sort_unstable();

		names
	}

	/// Number of registered providers.
	pub fn len(&self) -> usize {
		self.tokenizers.len()
	}

	/// Returns `true` when nothing is registered.
	pub fn is_empty(&self) -> bool {
		self.tokenizers.is_empty()
	}
}
impl Debug for ProviderRegistry {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ProviderRegistry")
			.field("providers", &self.names())
			.field("default_provider", &self.default_provider)
			.finish()
	}
}

fn construct(
	descriptor: &ProviderDescriptor,
	options: &RegistryOptions,
) -> Result<Arc<dyn Tokenizer>, ConfigError> {
	let kind = ProviderKind::parse(descriptor.kind.trim()).ok_or_else(|| {
		ConfigError::UnsupportedType { name: descriptor.name.clone(), kind: descriptor.kind.clone() }
	})?;
	let tokenizer: Arc<dyn Tokenizer> = match kind {
		ProviderKind::Google => {
			let http = http::build_client(&descriptor.name, options.timeout, None)?;

			Arc::new(GoogleTokenizer::new(&descriptor.name, http, &options.metadata_host)?)
		},
		ProviderKind::Microsoft => Arc::new(MicrosoftTokenizer::from_descriptor(descriptor, options)?),
		ProviderKind::Rancher => Arc::new(RancherTokenizer::from_descriptor(descriptor, options)?),
		ProviderKind::VaultK8s => Arc::new(VaultTokenizer::from_descriptor(descriptor, options)?),
	};

	Ok(tokenizer)
}
