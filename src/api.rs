//! Broker HTTP surface.
//!
//! `GET /healthz` is open; `GET /tokens` sits behind the [`auth::require_api_key`] layer and
//! dispatches to the registry. The router is exposed separately from [`serve`] so embedders and
//! tests can mount it on their own listener.

pub mod auth;
pub mod handler;

pub use auth::{API_KEY_HEADER, ApiKey};
pub use handler::{ErrorBody, TokenBody, TokenQuery};

// std
use std::net::{Ipv4Addr, SocketAddr};
// crates.io
use axum::{Router, middleware, routing::get};
use tokio::net::TcpListener;
// self
use crate::{_prelude::*, error::ConfigError, provider::ProviderRegistry};

/// State shared by every request.
#[derive(Clone, Debug)]
pub struct AppState {
	/// Live providers.
	pub registry: Arc<ProviderRegistry>,
	/// Digest of the shared API key.
	pub api_key: ApiKey,
	/// Deadline applied to each token request.
	pub timeout: StdDuration,
}
impl AppState {
	/// Bundles the registry with the API key and per-request timeout.
	pub fn new(registry: ProviderRegistry, api_key: &str, timeout: StdDuration) -> Self {
		Self { registry: Arc::new(registry), api_key: ApiKey::new(api_key), timeout }
	}
}

/// Builds the broker router.
pub fn router(state: AppState) -> Router {
	let tokens = Router::new()
		.route("/tokens", get(handler::tokens))
		.layer(middleware::from_fn_with_state(state.clone(), auth::require_api_key));

	Router::new().route("/healthz", get(handler::healthz)).merge(tokens).with_state(state)
}

/// Binds `0.0.0.0:<port>` and serves until Ctrl-C or SIGTERM.
pub async fn serve(state: AppState, port: u16) -> Result<()> {
	let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
	let listener = TcpListener::bind(addr)
		.await
		.map_err(|source| ConfigError::Bind { addr: addr.to_string(), source })?;

	#[cfg(feature = "tracing")]
	tracing::info!(%addr, providers = ?state.registry.names(), "token broker listening");

	axum::serve(listener, router(state))
		.with_graceful_shutdown(shutdown_signal())
		.await
		.map_err(|source| Error::Serve { source })?;

	#[cfg(feature = "tracing")]
	tracing::info!("token broker stopped");

	Ok(())
}

async fn shutdown_signal() {
	let ctrl_c = async {
		// A failed handler install leaves only SIGTERM.
		if tokio::signal::ctrl_c().await.is_err() {
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		use tokio::signal::unix::{SignalKind, signal};

		match signal(SignalKind::terminate()) {
			Ok(mut stream) => {
				stream.recv().await;
			},
			Err(_) => std::future::pending::<()>().await,
		}
	};
	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}
}
