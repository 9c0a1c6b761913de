#![cfg(feature = "reqwest")]

// std
use std::{
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};
// crates.io
use httpmock::prelude::*;
// self
use bearer_refresh::{
	_preludet::test_reqwest_transport,
	auth::Credentials,
	client::{Client, ReqwestApiClient},
	config::ClientConfig,
	env::SharedLocation,
	error::Error,
	store::{CredentialKey, CredentialStore, MemoryStore},
};

struct Session {
	client: ReqwestApiClient,
	store: MemoryStore,
	location: SharedLocation,
	logouts: Arc<AtomicUsize>,
}

fn build_session(server: &MockServer) -> Session {
	let config = ClientConfig::parse(&server.url("/api"))
		.expect("Mock server base URL should parse.")
		.with_request_timeout(Duration::from_secs(5));
	let store = MemoryStore::with_entries([
		(CredentialKey::AccessToken, "stale"),
		(CredentialKey::RefreshToken, "refresh-1"),
	]);
	let location = SharedLocation::new("/dashboard");
	let logouts = Arc::new(AtomicUsize::new(0));
	let counter = logouts.clone();
	let client = Client::with_transport(
		config.clone(),
		test_reqwest_transport(config),
		Arc::new(store.clone()),
		Arc::new(location.clone()),
		Arc::new(move || {
			counter.fetch_add(1, Ordering::SeqCst);
		}),
	);

	Session { client, store, location, logouts }
}

#[tokio::test]
async fn expired_token_is_refreshed_and_request_replayed() {
	let server = MockServer::start_async().await;
	let session = build_session(&server);
	let rejected = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/items").header("authorization", "Bearer stale");
			then.status(401).body("token expired");
		})
		.await;
	let accepted = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/items").header("authorization", "Bearer fresh");
			then.status(200)
				.header("content-type", "application/json")
				.body("[{\"id\":1}]");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/admins/refresh")
				.header("authorization", "Bearer stale")
				.json_body(serde_json::json!({ "refreshToken": "refresh-1" }));
			then.status(200).header("content-type", "application/json").body(
				"{\"token\":\"fresh\",\"refreshToken\":\"refresh-2\",\"admin\":{\"id\":9}}",
			);
		})
		.await;
	let response = session.client.get("/items").await.expect("Request should succeed.");
	let items: serde_json::Value = response.json().expect("Body should decode.");

	rejected.assert_async().await;
	accepted.assert_async().await;
	refresh.assert_async().await;

	assert_eq!(items, serde_json::json!([{ "id": 1 }]));

	let stored = Credentials::load(&session.store).expect("Credentials should load.");

	assert_eq!(stored.access_token.as_ref().map(|t| t.expose()), Some("fresh"));
	assert_eq!(stored.refresh_token.as_ref().map(|t| t.expose()), Some("refresh-2"));
	assert_eq!(stored.principal, Some(serde_json::json!({ "id": 9 })));
	assert_eq!(session.logouts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn concurrent_failures_trigger_a_single_refresh() {
	let server = MockServer::start_async().await;
	let session = build_session(&server);

	server
		.mock_async(|when, then| {
			when.method(GET).header("authorization", "Bearer stale");
			then.status(401);
		})
		.await;

	let accepted = server
		.mock_async(|when, then| {
			when.method(GET).header("authorization", "Bearer fresh");
			then.status(200).body("ok");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/admins/refresh");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"token\":\"fresh\"}")
				.delay(Duration::from_millis(500));
		})
		.await;
	let (a, b, c) = tokio::join!(
		session.client.get("/orders"),
		session.client.get("/customers"),
		session.client.get("/invoices"),
	);

	for response in [a, b, c] {
		assert_eq!(response.expect("Every request should recover.").body, b"ok");
	}

	refresh.assert_calls_async(1).await;
	accepted.assert_calls_async(3).await;

	assert_eq!(session.client.coordinator().metrics().attempts(), 1);
	assert!(!session.client.coordinator().is_refreshing());
	assert_eq!(
		session.store.get(CredentialKey::RefreshToken).expect("Store read should succeed."),
		Some("refresh-1".into())
	);
}

#[tokio::test]
async fn rejected_refresh_clears_session_and_logs_out() {
	let server = MockServer::start_async().await;
	let session = build_session(&server);

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/items");
			then.status(401);
		})
		.await;

	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/admins/refresh");
			then.status(401).body("refresh token expired");
		})
		.await;
	let err = session.client.get("/items").await.expect_err("Refresh failure should surface.");

	refresh.assert_async().await;

	assert!(matches!(err, Error::RefreshEndpoint(_)));
	assert_eq!(err.status(), Some(401));
	assert!(session.store.is_empty());
	assert_eq!(session.logouts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn public_views_surface_401_untouched() {
	let server = MockServer::start_async().await;
	let session = build_session(&server);

	session.location.set("/kundenansicht/17");

	let items = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/items");
			then.status(401).body("no session");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/admins/refresh");
			then.status(200).body("{\"token\":\"fresh\"}");
		})
		.await;
	let err = session.client.get("/items").await.expect_err("401 should surface untouched.");

	items.assert_async().await;
	refresh.assert_calls_async(0).await;

	match err {
		Error::Status(e) => assert_eq!(e.body_text(), "no session"),
		other => panic!("Unexpected error: {other:?}."),
	}

	assert_eq!(
		session.store.get(CredentialKey::AccessToken).expect("Store read should succeed."),
		Some("stale".into())
	);
}

#[tokio::test]
async fn server_errors_are_not_retried() {
	let server = MockServer::start_async().await;
	let session = build_session(&server);
	let items = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/items").json_body(serde_json::json!({ "name": "desk" }));
			then.status(500).body("boom");
		})
		.await;
	let err = session
		.client
		.post_json("/items", &serde_json::json!({ "name": "desk" }))
		.await
		.expect_err("500 should surface.");

	items.assert_calls_async(1).await;

	assert_eq!(err.status(), Some(500));
	assert_eq!(session.client.coordinator().metrics().attempts(), 0);
}
