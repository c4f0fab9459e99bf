mod common;

// crates.io
use httpmock::prelude::*;
use serde_json::{Value, json};
// self
use common::*;
use token_broker::{
	api::API_KEY_HEADER,
	client::BrokerClient,
	provider::{ProviderDescriptor, ProviderRegistry, SourcedDescriptor},
};

const METADATA_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";

async fn metadata_server() -> MockServer {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path(METADATA_PATH).header("Metadata-Flavor", "Google");
			then.status(200).json_body(json!({ "access_token": "gce-token", "expires_in": 3599 }));
		})
		.await;

	server
}

fn registry(metadata: &MockServer, extra: Vec<ProviderDescriptor>) -> ProviderRegistry {
	let descriptors = std::iter::once(ProviderDescriptor::new("google", "google"))
		.chain(extra)
		.map(|descriptor| SourcedDescriptor::new(format!("{}.json", descriptor.name), descriptor));

	ProviderRegistry::build(descriptors, &options().metadata_host(metadata.base_url()))
		.expect("Registry should build.")
}

async fn get(url: String, api_key: Option<&str>) -> (u16, String) {
	let mut request = reqwest::Client::new().get(url);

	if let Some(api_key) = api_key {
		request = request.header(API_KEY_HEADER, api_key);
	}

	let response = request.send().await.expect("Broker should answer.");
	let status = response.status().as_u16();
	let body = response.text().await.expect("Body should be readable.");

	(status, body)
}

#[tokio::test]
async fn healthz_is_open() {
	let metadata = metadata_server().await;
	let (_handle, addr) = spawn_broker(registry(&metadata, Vec::new())).await;
	let (status, body) = get(format!("http://{addr}/healthz"), None).await;

	assert_eq!(status, 200);
	assert!(body.is_empty());
}

#[tokio::test]
async fn tokens_require_the_api_key() {
	let metadata = metadata_server().await;
	let (_handle, addr) = spawn_broker(registry(&metadata, Vec::new())).await;

	for api_key in [None, Some("wrong"), Some("")] {
		let (status, body) = get(format!("http://{addr}/tokens"), api_key).await;
		let body: Value = serde_json::from_str(&body).expect("Error body should be JSON.");

		assert_eq!(status, 403);
		assert_eq!(body, json!({ "error": "bad api key" }));
	}
}

#[tokio::test]
async fn tokens_default_to_the_metadata_provider() {
	let metadata = metadata_server().await;
	let (_handle, addr) = spawn_broker(registry(&metadata, Vec::new())).await;
	let (status, body) = get(format!("http://{addr}/tokens"), Some(API_KEY)).await;
	let body: Value = serde_json::from_str(&body).expect("Token body should be JSON.");

	assert_eq!(status, 200);
	assert_eq!(body, json!({ "token": "gce-token" }));
}

#[tokio::test]
async fn unknown_provider_is_a_bad_request() {
	let metadata = metadata_server().await;
	let (_handle, addr) = spawn_broker(registry(&metadata, Vec::new())).await;
	let (status, body) =
		get(format!("http://{addr}/tokens?provider=unknown"), Some(API_KEY)).await;

	assert_eq!(status, 400);
	assert_eq!(body, r#"{"error":"unsupported token provider: unknown"}"#);
}

#[tokio::test]
async fn upstream_failures_are_internal_errors() {
	let metadata = metadata_server().await;
	let login = MockServer::start_async().await;

	login
		.mock_async(|when, then| {
			when.method(POST).path("/login");
			then.status(500).body("boom");
		})
		.await;

	let registry = registry(&metadata, vec![rancher("rancher-np", &login.url("/login"))]);
	let (_handle, addr) = spawn_broker(registry).await;
	let (status, body) =
		get(format!("http://{addr}/tokens?provider=rancher-np"), Some(API_KEY)).await;
	let body: Value = serde_json::from_str(&body).expect("Error body should be JSON.");

	assert_eq!(status, 500);
	assert_eq!(body, json!({ "error": "error getting token: 500 Internal Server Error" }));
}

#[tokio::test]
async fn qualified_names_route_to_the_secret_store() {
	let metadata = metadata_server().await;
	let store = MockServer::start_async().await;
	let mock = store
		.mock_async(|when, then| {
			when.method(GET).path("/v1/secret/data/rancher-int/kubeconfig");
			then.status(200).json_body(json!({
				"data": { "data": { "users": [{ "name": "u", "user": { "token": "k8s-token" } }] } },
			}));
		})
		.await;
	let registry = registry(&metadata, vec![vault("vault-k8s", &store.base_url())]);
	let (_handle, addr) = spawn_broker(registry).await;
	let client =
		BrokerClient::new(&format!("http://{addr}"), API_KEY).expect("Client should build.");
	let token = client
		.token(Some("vault-k8s-np-rancher-int"))
		.await
		.expect("Qualified request should succeed.");

	assert_eq!(token, "k8s-token");

	let err = client
		.token(Some("vault-k8s-np"))
		.await
		.expect_err("Names without a cluster should be rejected.");

	assert_eq!(err.to_string(), "error getting token: 400 Bad Request");

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn broker_client_fetches_default_token() {
	let metadata = metadata_server().await;
	let (_handle, addr) = spawn_broker(registry(&metadata, Vec::new())).await;
	let client =
		BrokerClient::new(&format!("http://{addr}/"), API_KEY).expect("Client should build.");

	assert_eq!(client.token(None).await.expect("Default token should be issued."), "gce-token");
	assert_eq!(
		client.token(Some("google")).await.expect("Named token should be issued."),
		"gce-token"
	);

	let unauthorized =
		BrokerClient::new(&format!("http://{addr}"), "nope").expect("Client should build.");
	let err = unauthorized.token(None).await.expect_err("Bad keys should be rejected.");

	assert_eq!(err.to_string(), "error getting token: 403 Forbidden");
}
