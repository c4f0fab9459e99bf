//! `token-broker` binary: load provider descriptors and serve `/tokens`.

// std
use std::process::ExitCode;
// crates.io
use clap::Parser;
use token_broker::{
	api::{self, AppState},
	config::BrokerConfig,
	obs,
	provider,
};

#[tokio::main]
async fn main() -> ExitCode {
	let config = BrokerConfig::parse();

	obs::init_subscriber(&config.log_level, config.log_format);

	let options = config.registry_options();
	let registry = match provider::load_dir(&config.config_directory, &options) {
		Ok(registry) => registry,
		Err(err) => {
			tracing::error!(
				dir = %config.config_directory.display(),
				error = %err,
				"failed to load token providers"
			);

			return ExitCode::FAILURE;
		},
	};

	tracing::info!(
		providers = ?registry.names(),
		default = registry.default_provider(),
		"loaded token providers"
	);

	let state = AppState::new(registry, config.api_key.expose(), config.timeout());

	if let Err(err) = api::serve(state, config.port).await {
		tracing::error!(error = %err, "token broker exited");

		return ExitCode::FAILURE;
	}

	ExitCode::SUCCESS
}
