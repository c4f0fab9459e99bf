//! Helpers shared by the integration tests.

#![allow(dead_code)]

// std
use std::{net::SocketAddr, sync::Arc};
// crates.io
use tokio::{net::TcpListener, task::JoinHandle};
// self
use token_broker::{
	api::{self, AppState},
	provider::{ProviderDescriptor, ProviderRegistry, RegistryOptions, SourcedDescriptor},
	secret::Secret,
	tokenizer::Tokenizer,
};

/// API key configured on every spawned broker.
pub const API_KEY: &str = "integration-api-key";

/// Registry options with a short timeout so stalled mocks fail fast.
pub fn options() -> RegistryOptions {
	RegistryOptions::default().timeout(std::time::Duration::from_secs(5))
}

/// Builds a one-provider registry and returns the tokenizer registered under `descriptor.name`.
pub fn build_one(descriptor: ProviderDescriptor) -> Arc<dyn Tokenizer> {
	let name = descriptor.name.clone();
	let registry = ProviderRegistry::build(
		[SourcedDescriptor::new(format!("{name}.json"), descriptor)],
		&options(),
	)
	.expect("Single-provider registry should build.");
	let (_, tokenizer) =
		registry.lookup(Some(name.as_str())).expect("Registered provider should resolve.");

	tokenizer
}

/// `microsoft` descriptor pointing at `login_endpoint`.
pub fn microsoft(name: &str, login_endpoint: &str) -> ProviderDescriptor {
	let mut descriptor = ProviderDescriptor::new("oauth2-client-credentials", name);

	descriptor.client_id = "client-id".into();
	descriptor.client_secret = Secret::new("client-secret");
	descriptor.resource = "https://management.azure.com/".into();
	descriptor.login_endpoint = login_endpoint.into();

	descriptor
}

/// `rancher` descriptor pointing at `url`.
pub fn rancher(name: &str, url: &str) -> ProviderDescriptor {
	let mut descriptor = ProviderDescriptor::new("proprietary-login", name);

	descriptor.username = "svc-broker".into();
	descriptor.password = Secret::new("rancher-password");
	descriptor.url = url.into();

	descriptor
}

/// `vault-k8s` descriptor pointing at `url`.
pub fn vault(name: &str, url: &str) -> ProviderDescriptor {
	let mut descriptor = ProviderDescriptor::new("secret-store", name);

	descriptor.url = url.into();
	descriptor.password = Secret::new("vault-token");

	descriptor
}

/// Serves the broker router on an ephemeral local port.
pub async fn spawn_broker(registry: ProviderRegistry) -> (JoinHandle<()>, SocketAddr) {
	let state = AppState::new(registry, API_KEY, std::time::Duration::from_secs(5));
	let listener =
		TcpListener::bind("127.0.0.1:0").await.expect("Ephemeral listener should bind.");
	let addr = listener.local_addr().expect("Listener should report its address.");
	let handle = tokio::spawn(async move {
		axum::serve(listener, api::router(state)).await.expect("Broker server should run.");
	});

	(handle, addr)
}
