//! Request pipeline: attach credentials, send, and route failures through the coordinator.

// self
use crate::{
	_prelude::*,
	attach::CredentialAttacher,
	auth::Credentials,
	config::ClientConfig,
	env::{LocationProvider, Navigator},
	http::{ApiResponse, HttpTransport, RequestDescriptor},
	obs::{PipelineSpan, Stage},
	refresh::RefreshCoordinator,
	store::CredentialStore,
};
#[cfg(feature = "reqwest")]
use crate::{error::ConfigError, http::ReqwestTransport};

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestApiClient = Client<ReqwestTransport>;

/// HTTP client that keeps bearer credentials fresh transparently.
///
/// Every request passes through the [`CredentialAttacher`] before it is sent; every failure
/// passes through the session's [`RefreshCoordinator`]. A request replayed after a refresh runs
/// through both again, and because replayed descriptors are marked retried a second 401 is
/// surfaced instead of looping.
pub struct Client<T>
where
	T: ?Sized + HttpTransport,
{
	transport: Arc<T>,
	store: Arc<dyn CredentialStore>,
	attacher: CredentialAttacher,
	coordinator: Arc<RefreshCoordinator<T>>,
	config: Arc<ClientConfig>,
}
impl<T> Client<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a client around a caller-provided transport.
	pub fn with_transport(
		config: ClientConfig,
		transport: impl Into<Arc<T>>,
		store: Arc<dyn CredentialStore>,
		location: Arc<dyn LocationProvider>,
		navigator: Arc<dyn Navigator>,
	) -> Self {
		let config = Arc::new(config);
		let transport = transport.into();
		let coordinator = Arc::new(RefreshCoordinator::new(
			config.clone(),
			transport.clone(),
			store.clone(),
			location,
			navigator,
		));

		Self { attacher: CredentialAttacher::new(store.clone()), transport, store, coordinator, config }
	}

	/// Sends `request`, refreshing credentials and replaying once on a 401.
	pub async fn send(&self, request: RequestDescriptor) -> Result<ApiResponse> {
		let span = PipelineSpan::new(Stage::Send, &request.path);

		span.instrument(async move {
			let mut request = request;

			loop {
				self.attacher.attach(&mut request)?;

				let failure = match self.dispatch(&request).await {
					Ok(response) => return Ok(response),
					Err(e) => e,
				};

				request = self.coordinator.handle_failure(request, failure).await?;
			}
		})
		.await
	}

	/// Sends a `GET` request.
	pub async fn get(&self, path: impl Into<String>) -> Result<ApiResponse> {
		self.send(RequestDescriptor::get(path)).await
	}

	/// Sends a `DELETE` request.
	pub async fn delete(&self, path: impl Into<String>) -> Result<ApiResponse> {
		self.send(RequestDescriptor::delete(path)).await
	}

	/// Sends a `POST` request with a JSON body.
	pub async fn post_json<B>(&self, path: impl Into<String>, body: &B) -> Result<ApiResponse>
	where
		B: ?Sized + Serialize,
	{
		self.send(RequestDescriptor::post(path).with_json(body)?).await
	}

	/// Sends a `PUT` request with a JSON body.
	pub async fn put_json<B>(&self, path: impl Into<String>, body: &B) -> Result<ApiResponse>
	where
		B: ?Sized + Serialize,
	{
		self.send(RequestDescriptor::put(path).with_json(body)?).await
	}

	/// Persists a session obtained elsewhere (e.g. a login response).
	pub fn sign_in(&self, credentials: &Credentials) -> Result<()> {
		credentials.persist(self.store.as_ref()).map_err(Error::from)
	}

	/// Clears the session and forces the logged-out view.
	pub fn sign_out(&self) -> Result<()> {
		self.coordinator.sign_out()
	}

	/// Reads the stored credential triple.
	pub fn credentials(&self) -> Result<Credentials> {
		Credentials::load(self.store.as_ref()).map_err(Error::from)
	}

	/// The session's refresh coordinator.
	pub fn coordinator(&self) -> &RefreshCoordinator<T> {
		&self.coordinator
	}

	/// Configuration shared with the coordinator.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	async fn dispatch(&self, request: &RequestDescriptor) -> Result<ApiResponse> {
		self.transport.send(request).await?.into_result(&request.path)
	}
}
#[cfg(feature = "reqwest")]
impl Client<ReqwestTransport> {
	/// Creates a client that provisions its own reqwest transport from `config`.
	pub fn new(
		config: ClientConfig,
		store: Arc<dyn CredentialStore>,
		location: Arc<dyn LocationProvider>,
		navigator: Arc<dyn Navigator>,
	) -> Result<Self, ConfigError> {
		let transport = ReqwestTransport::new(config.clone())?;

		Ok(Self::with_transport(config, transport, store, location, navigator))
	}
}
impl<T> Clone for Client<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			store: self.store.clone(),
			attacher: self.attacher.clone(),
			coordinator: self.coordinator.clone(),
			config: self.config.clone(),
		}
	}
}
impl<T> Debug for Client<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Client")
			.field("base_url", &self.config.base_url.as_str())
			.field("coordinator", &self.coordinator)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use tokio::sync::Notify;
	// self
	use super::*;
	use crate::{
		_preludet::*,
		auth::TokenSecret,
		env::SharedLocation,
		store::{CredentialKey, MemoryStore},
	};

	const REFRESH: &str = "/admins/refresh";

	fn protected(request: &RequestDescriptor, token: &str) -> ApiResponse {
		if request.authorization() == Some(format!("Bearer {token}").as_str()) {
			ApiResponse::new(200, format!("{{\"path\":\"{}\"}}", request.path))
		} else {
			ApiResponse::new(401, "expired")
		}
	}

	fn build_client(
		transport: ScriptedTransport,
		location: &str,
	) -> (Client<ScriptedTransport>, MemoryStore, CountingNavigator) {
		let store = MemoryStore::with_entries([
			(CredentialKey::AccessToken, "t1"),
			(CredentialKey::RefreshToken, "r1"),
		]);
		let navigator = CountingNavigator::default();
		let client = Client::with_transport(
			ClientConfig::parse("https://example.com/api").expect("Base URL should parse."),
			transport,
			Arc::new(store.clone()),
			Arc::new(SharedLocation::new(location)),
			Arc::new(navigator.clone()),
		);

		(client, store, navigator)
	}

	#[tokio::test]
	async fn transparent_retry_looks_like_first_time_success() {
		let (client, store, navigator) = build_client(
			ScriptedTransport::new(|request| async move {
				if request.path == REFRESH {
					Ok(ApiResponse::new(200, r#"{"token":"t2","refreshToken":"r2"}"#))
				} else {
					Ok(protected(&request, "t2"))
				}
			}),
			"/dashboard",
		);
		let response = client.get("/items").await.expect("Request should succeed after refresh.");
		let body: serde_json::Value = response.json().expect("Body should decode.");

		assert_eq!(response.status, 200);
		assert_eq!(body["path"], "/items");
		assert_eq!(
			store.get(CredentialKey::RefreshToken).expect("Read should succeed."),
			Some("r2".into())
		);
		assert_eq!(navigator.count(), 0);
	}

	#[tokio::test]
	async fn queued_request_replays_with_new_token() {
		let gate = Arc::new(Notify::new());
		let refresh_gate = gate.clone();
		let (client, store, _) = build_client(
			ScriptedTransport::new(move |request| {
				let gate = refresh_gate.clone();

				async move {
					if request.path == REFRESH {
						gate.notified().await;

						return Ok(ApiResponse::new(200, r#"{"token":"t2"}"#));
					}

					Ok(protected(&request, "t2"))
				}
			}),
			"/dashboard",
		);
		let release = async {
			while client.coordinator().queued_waiters() < 1 {
				tokio::task::yield_now().await;
			}

			gate.notify_one();
		};
		let (a, b, ()) = tokio::join!(client.get("/a"), client.get("/b"), release);

		assert_eq!(a.expect("Leader request should succeed.").status, 200);
		assert_eq!(b.expect("Queued request should succeed.").status, 200);
		assert_eq!(client.coordinator().metrics().attempts(), 1);
		assert!(!client.coordinator().is_refreshing());
		assert_eq!(client.coordinator().queued_waiters(), 0);
		assert_eq!(
			store.get(CredentialKey::AccessToken).expect("Read should succeed."),
			Some("t2".into())
		);
	}

	#[tokio::test]
	async fn second_401_after_replay_is_surfaced() {
		let transport = ScriptedTransport::new(|request| async move {
			if request.path == REFRESH {
				Ok(ApiResponse::new(200, r#"{"token":"t2"}"#))
			} else {
				Ok(ApiResponse::new(401, "still expired"))
			}
		});
		let (client, _, navigator) = build_client(transport, "/dashboard");
		let err = client.get("/items").await.expect_err("Replayed 401 should surface.");
		let requests = client.transport.requests();

		assert_eq!(err.status(), Some(401));
		assert_eq!(requests.len(), 3);
		assert_eq!(requests[2].authorization(), Some("Bearer t2"));
		assert!(requests[2].is_retried());
		assert_eq!(navigator.count(), 0);
	}

	#[tokio::test]
	async fn login_view_surfaces_401_without_refresh() {
		let (client, store, navigator) = build_client(
			ScriptedTransport::new(|_| async { Ok(ApiResponse::new(401, "no session")) }),
			"/login",
		);
		let err = client.get("/items").await.expect_err("401 on the login view should surface.");

		assert_eq!(err.status(), Some(401));
		assert_eq!(client.transport.calls_to(REFRESH), 0);
		assert_eq!(navigator.count(), 0);
		assert!(!store.is_empty());
	}

	#[tokio::test]
	async fn failed_refresh_logs_out_and_reports_refresh_failure() {
		let (client, store, navigator) = build_client(
			ScriptedTransport::new(|request| async move {
				if request.path == REFRESH {
					Ok(ApiResponse::new(401, "refresh expired"))
				} else {
					Ok(ApiResponse::new(401, "expired"))
				}
			}),
			"/dashboard",
		);
		let err = client.get("/items").await.expect_err("Refresh failure should surface.");

		assert!(matches!(err, Error::RefreshEndpoint(_)));
		assert_eq!(err.status(), Some(401));
		assert_eq!(navigator.count(), 1);
		assert!(store.is_empty());
	}

	#[tokio::test]
	async fn missing_token_sends_unauthenticated_request() {
		let (client, store, _) = build_client(
			ScriptedTransport::new(|request| async move {
				assert!(request.authorization().is_none());

				Ok(ApiResponse::new(204, Vec::new()))
			}),
			"/dashboard",
		);

		store.remove(CredentialKey::AccessToken).expect("Remove should succeed.");

		let response = client
			.delete("/items/1")
			.await
			.expect("Unauthenticated request should still be sent.");

		assert_eq!(response.status, 204);
	}

	#[tokio::test]
	async fn sign_in_and_sign_out_manage_the_store() {
		let (client, store, navigator) =
			build_client(ScriptedTransport::new(|_| async { Ok(ApiResponse::new(200, "{}")) }), "/");

		client
			.sign_in(
				&Credentials::default()
					.with_access_token(TokenSecret::new("fresh"))
					.with_principal(serde_json::json!({ "email": "ada@example.com" })),
			)
			.expect("Sign-in should persist credentials.");

		let loaded = client.credentials().expect("Credentials should load.");

		assert_eq!(loaded.access_token.as_ref().map(TokenSecret::expose), Some("fresh"));
		assert_eq!(loaded.refresh_token.as_ref().map(TokenSecret::expose), Some("r1"));

		client.sign_out().expect("Sign-out should succeed.");

		assert!(store.is_empty());
		assert_eq!(navigator.count(), 1);
	}
}
