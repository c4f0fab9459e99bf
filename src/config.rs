//! Process configuration, read from flags with environment fallbacks.

// std
use std::path::PathBuf;
// crates.io
use clap::Parser;
// self
use crate::{
	_prelude::*,
	backend::{google, vault},
	obs::LogFormat,
	provider::{DEFAULT_PROVIDER, RegistryOptions},
	secret::Secret,
};

/// Command-line and environment configuration for the broker binary.
#[derive(Clone, Debug, Parser)]
#[command(name = "token-broker", version, about, long_about = None)]
pub struct BrokerConfig {
	/// Shared secret callers present in the `Api-Key` header.
	#[arg(long, env = "BROKER_API_KEY", hide_env_values = true)]
	pub api_key: Secret,
	/// Directory holding one JSON provider descriptor per file.
	#[arg(long, env = "BROKER_CONFIG_DIRECTORY")]
	pub config_directory: PathBuf,
	/// Listen port.
	#[arg(long, env = "PORT", default_value_t = 1982)]
	pub port: u16,
	/// Timeout, in seconds, for every upstream call and token request.
	#[arg(
		long = "default-timeout-secs",
		env = "BROKER_DEFAULT_TIMEOUT_SECONDS",
		default_value_t = 30,
		value_parser = clap::value_parser!(u64).range(1..)
	)]
	pub default_timeout_secs: u64,
	/// Provider used when a request names none.
	#[arg(long, env = "BROKER_DEFAULT_PROVIDER", default_value = DEFAULT_PROVIDER)]
	pub default_provider: String,
	/// Metadata server host for `google` providers.
	#[arg(long, env = "GCE_METADATA_HOST", default_value = google::DEFAULT_METADATA_HOST)]
	pub metadata_host: String,
	/// Secret path pattern for `vault-k8s` providers; `[CLUSTER]` is substituted.
	#[arg(long, env = "VAULT_K8S_PATH_PATTERN", default_value = vault::DEFAULT_PATH_PATTERN)]
	pub secret_store_path_pattern: String,
	/// Log filter directive, e.g. `info` or `token_broker=debug`.
	#[arg(long, env = "LOG_LEVEL", default_value = "info")]
	pub log_level: String,
	/// Log output format.
	#[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact)]
	pub log_format: LogFormat,
}
impl BrokerConfig {
	/// Per-call timeout.
	pub fn timeout(&self) -> StdDuration {
		StdDuration::from_secs(self.default_timeout_secs)
	}

	/// Settings the registry needs to construct backends.
	pub fn registry_options(&self) -> RegistryOptions {
		RegistryOptions::default()
			.timeout(self.timeout())
			.default_provider(self.default_provider.clone())
			.metadata_host(self.metadata_host.clone())
			.secret_store_path_pattern(self.secret_store_path_pattern.clone())
	}
}
