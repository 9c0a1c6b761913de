//! Demonstrates the refresh pipeline against a mock API: the stored access token is rejected,
//! one refresh call rotates the credentials, and the original request is replayed.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use bearer_refresh::{
	auth::Credentials,
	client::Client,
	config::ClientConfig,
	env::SharedLocation,
	http::ReqwestTransport,
	reqwest,
	store::{CredentialKey, MemoryStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let expired = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/orders").header("authorization", "Bearer expired");
			then.status(401);
		})
		.await;
	let orders = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/orders").header("authorization", "Bearer rotated");
			then.status(200).header("content-type", "application/json").body("[{\"id\":42}]");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/admins/refresh");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"token\":\"rotated\",\"refreshToken\":\"refresh-2\"}");
		})
		.await;
	let config = ClientConfig::parse(&server.url("/api"))?;
	let transport = ReqwestTransport::with_client(
		reqwest::Client::builder()
			.cookie_store(true)
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()?,
		config.clone(),
	);
	let store = MemoryStore::with_entries([
		(CredentialKey::AccessToken, "expired"),
		(CredentialKey::RefreshToken, "refresh-1"),
	]);
	let client = <Client<ReqwestTransport>>::with_transport(
		config,
		transport,
		Arc::new(store.clone()),
		Arc::new(SharedLocation::new("/dashboard")),
		Arc::new(|| println!("Session expired; showing the login view.")),
	);
	let response = client.get("/orders").await?;
	let body: serde_json::Value = response.json()?;
	let credentials = Credentials::load(&store)?;

	println!("Orders: {body}.");
	println!(
		"Refresh calls: {}, stored refresh token rotated: {}.",
		client.coordinator().metrics().attempts(),
		credentials.refresh_token.as_ref().is_some_and(|t| t.expose() == "refresh-2"),
	);

	expired.assert_async().await;
	orders.assert_async().await;
	refresh.assert_async().await;

	Ok(())
}
