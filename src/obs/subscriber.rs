// crates.io
use clap::ValueEnum;

/// Output layout for process logs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
	/// Human-readable single-line events.
	#[default]
	Compact,
	/// Flattened JSON events for log collectors.
	Json,
}

/// Installs the global `tracing` subscriber; later calls are ignored.
///
/// `filter` accepts any `EnvFilter` directive (`info`, `token_broker=debug`, ...); an invalid
/// directive falls back to `info`.
pub fn init_subscriber(filter: &str, format: LogFormat) {
	#[cfg(feature = "tracing")]
	{
		use tracing_subscriber::{
			EnvFilter, fmt, fmt::time::UtcTime, layer::SubscriberExt, util::SubscriberInitExt,
		};

		let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
		let registry = tracing_subscriber::registry().with(env_filter);

		match format {
			LogFormat::Json => {
				let layer = fmt::layer()
					.json()
					.with_timer(UtcTime::rfc_3339())
					.flatten_event(true)
					.with_ansi(false);
				let _ = registry.with(layer).try_init();
			},
			LogFormat::Compact => {
				let layer = fmt::layer().compact().with_timer(UtcTime::rfc_3339());
				let _ = registry.with(layer).try_init();
			},
		}
	}

	#[cfg(not(feature = "tracing"))]
	{
		let _ = (filter, format);
	}
}
