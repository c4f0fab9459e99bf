mod common;

// std
use std::time::Duration;
// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use common::*;
use token_broker::{
	backend::RancherTokenizer,
	context::TokenContext,
	error::{CancelledError, Error, UpstreamError},
	tokenizer::Tokenizer,
};

const LOGIN_PATH: &str = "/v3-public/localProviders/local";

fn login_url(server: &MockServer) -> String {
	server.url(format!("{LOGIN_PATH}?action=login"))
}

#[tokio::test]
async fn rancher_logs_in_and_reuses_token_until_expiry() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(LOGIN_PATH).query_param("action", "login").json_body(json!({
				"responseType": "json",
				"username": "svc-broker",
				"password": "rancher-password",
			}));
			then.status(201).json_body(json!({
				"token": "token-abc:xyz",
				"expiresAt": "2099-01-01T00:00:00Z",
				"ttl": 57_600_000,
			}));
		})
		.await;
	let tokenizer = build_one(rancher("rancher-np", &login_url(&server)));
	let ctx = TokenContext::new();

	for _ in 0..3 {
		let token = tokenizer.token(&ctx).await.expect("Login should succeed.");

		assert_eq!(token, "token-abc:xyz");
	}

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn rancher_short_expiration_forces_refresh() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(LOGIN_PATH);
			then.status(201)
				.json_body(json!({ "token": "short-lived", "expiresAt": "2099-01-01T00:00:00Z" }));
		})
		.await;
	let mut descriptor = rancher("rancher-np", &login_url(&server));

	descriptor.short_expiration = Some(1);

	let tokenizer = build_one(descriptor);
	let ctx = TokenContext::new();

	tokenizer.token(&ctx).await.expect("First login should succeed.");
	tokenizer.token(&ctx).await.expect("Second call should be served from cache.");
	mock.assert_calls_async(1).await;

	tokio::time::sleep(Duration::from_millis(1_100)).await;

	tokenizer.token(&ctx).await.expect("Login after the override should succeed.");
	mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn rancher_without_lifetime_logs_in_every_time() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(LOGIN_PATH);
			then.status(201).json_body(json!({ "token": "one-shot" }));
		})
		.await;
	let tokenizer = build_one(rancher("rancher-np", &login_url(&server)));

	for _ in 0..2 {
		tokenizer.token(&TokenContext::new()).await.expect("Login should succeed.");
	}

	mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn rancher_server_error_reports_status_line_only() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path(LOGIN_PATH);
			then.status(500).body("<html><body>stack trace with secrets</body></html>");
		})
		.await;

	let tokenizer = build_one(rancher("rancher-np", &login_url(&server)));
	let err = tokenizer
		.token(&TokenContext::new())
		.await
		.expect_err("Server errors should fail the call.");

	assert_eq!(err.to_string(), "error getting token: 500 Internal Server Error");
}

#[tokio::test]
async fn rancher_requires_created_status() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path(LOGIN_PATH);
			then.status(200).json_body(json!({ "token": "unexpected" }));
		})
		.await;

	let tokenizer = build_one(rancher("rancher-np", &login_url(&server)));
	let err = tokenizer
		.token(&TokenContext::new())
		.await
		.expect_err("Only 201 counts as a successful login.");

	assert_eq!(err.to_string(), "error getting token: 200 OK");
}

#[tokio::test]
async fn rancher_missing_token_is_incomplete() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path(LOGIN_PATH);
			then.status(201).json_body(json!({ "ttl": 1000 }));
		})
		.await;

	let tokenizer = build_one(rancher("rancher-np", &login_url(&server)));
	let err = tokenizer
		.token(&TokenContext::new())
		.await
		.expect_err("A login without a token should fail.");

	assert!(matches!(err, Error::Upstream(UpstreamError::Incomplete { .. })));
}

#[tokio::test]
async fn rancher_rejects_malformed_login_body() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path(LOGIN_PATH);
			then.status(201).body("{\"token\": ");
		})
		.await;

	let tokenizer = build_one(rancher("rancher-np", &login_url(&server)));
	let err =
		tokenizer.token(&TokenContext::new()).await.expect_err("Malformed body should fail.");

	assert!(matches!(err, Error::Upstream(UpstreamError::Malformed { .. })));
	assert!(err.to_string().starts_with("error unmarshaling body: "), "{err}");
}

#[tokio::test]
async fn rancher_deadline_aborts_login() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path(LOGIN_PATH);
			then.status(201)
				.delay(Duration::from_secs(3))
				.json_body(json!({ "token": "late", "expiresAt": "2099-01-01T00:00:00Z" }));
		})
		.await;

	let tokenizer =
		RancherTokenizer::from_descriptor(&rancher("rancher-np", &login_url(&server)), &options())
			.expect("Tokenizer should build.");
	let ctx = TokenContext::new().with_timeout(Duration::from_millis(100));
	let err = tokenizer.token(&ctx).await.expect_err("Deadline should abort the login.");

	assert!(matches!(err, Error::Cancelled(CancelledError::DeadlineExceeded)));
	assert!(tokenizer.cache().snapshot().is_none());
}

#[tokio::test]
async fn rancher_cancel_keeps_stale_record() {
	let server = MockServer::start_async().await;
	let mut first = server
		.mock_async(|when, then| {
			when.method(POST).path(LOGIN_PATH);
			then.status(201)
				.json_body(json!({ "token": "stale", "expiresAt": "2099-01-01T00:00:00Z" }));
		})
		.await;
	let mut descriptor = rancher("rancher-np", &login_url(&server));

	descriptor.short_expiration = Some(1);

	let tokenizer =
		RancherTokenizer::from_descriptor(&descriptor, &options()).expect("Tokenizer should build.");

	tokenizer.token(&TokenContext::new()).await.expect("First login should succeed.");

	let before = tokenizer.cache().snapshot().expect("First login should populate the cache.");

	first.delete_async().await;
	tokio::time::sleep(Duration::from_millis(1_100)).await;

	server
		.mock_async(|when, then| {
			when.method(POST).path(LOGIN_PATH);
			then.status(201)
				.delay(Duration::from_secs(3))
				.json_body(json!({ "token": "fresh", "expiresAt": "2099-01-01T00:00:00Z" }));
		})
		.await;

	let ctx = TokenContext::new();
	let canceller = ctx.clone();

	tokio::spawn(async move {
		tokio::time::sleep(Duration::from_millis(100)).await;
		canceller.cancel();
	});

	let err = tokenizer.token(&ctx).await.expect_err("Cancellation should abort the refresh.");

	assert!(matches!(err, Error::Cancelled(CancelledError::Canceled)));
	assert_eq!(err.to_string(), "context canceled");
	assert_eq!(tokenizer.cache().snapshot(), Some(before));
}
