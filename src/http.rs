//! Transport primitives: request descriptors, responses, and the pluggable HTTP capability.
//!
//! [`HttpTransport`] is the pipeline's only dependency on an HTTP stack. It receives a
//! [`RequestDescriptor`] whose path is relative to the configured base URL and resolves to an
//! [`ApiResponse`] for every status the server returns; classifying non-success statuses is the
//! pipeline's job, not the transport's.

// crates.io
use http::{
	HeaderMap, HeaderName, HeaderValue, Method,
	header::{AUTHORIZATION, CONTENT_TYPE},
};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::{ConfigError, StatusError},
};
#[cfg(feature = "reqwest")] use crate::{config::ClientConfig, error::TransportError};

/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = Result<ApiResponse>> + 'a + Send>>;

/// Abstraction over HTTP stacks able to execute a [`RequestDescriptor`].
///
/// Implementations must be `Send + Sync + 'static` so one transport can back the client and
/// its refresh coordinator at the same time.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Executes `request` exactly once and returns the raw response.
	fn send<'a>(&'a self, request: &'a RequestDescriptor) -> TransportFuture<'a>;
}

/// One HTTP call flowing through the pipeline.
#[derive(Clone, Debug)]
pub struct RequestDescriptor {
	/// HTTP method.
	pub method: Method,
	/// Target path relative to the base URL (query string allowed).
	pub path: String,
	/// Mutable request headers.
	pub headers: HeaderMap,
	/// Optional request body.
	pub body: Option<Vec<u8>>,
	retried: bool,
}
impl RequestDescriptor {
	/// Creates a descriptor for `method` + `path` with no headers or body.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self { method, path: path.into(), headers: HeaderMap::new(), body: None, retried: false }
	}

	/// Shorthand for a `GET` descriptor.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	/// Shorthand for a `POST` descriptor.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::POST, path)
	}

	/// Shorthand for a `PUT` descriptor.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::PUT, path)
	}

	/// Shorthand for a `PATCH` descriptor.
	pub fn patch(path: impl Into<String>) -> Self {
		Self::new(Method::PATCH, path)
	}

	/// Shorthand for a `DELETE` descriptor.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::DELETE, path)
	}

	/// Adds or replaces a header.
	pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Serializes `body` as JSON and sets `Content-Type: application/json`.
	pub fn with_json<T>(mut self, body: &T) -> Result<Self, ConfigError>
	where
		T: ?Sized + Serialize,
	{
		self.body = Some(serde_json::to_vec(body)?);
		self.headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

		Ok(self)
	}

	/// Sets a raw body.
	pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = Some(body.into());

		self
	}

	/// Returns `true` once the descriptor has been replayed after a refresh.
	pub fn is_retried(&self) -> bool {
		self.retried
	}

	pub(crate) fn mark_retried(&mut self) {
		self.retried = true;
	}

	/// Sets `Authorization: Bearer <token>`; the header is flagged sensitive.
	pub fn set_bearer(&mut self, token: &TokenSecret) -> Result<(), ConfigError> {
		let mut value = HeaderValue::from_str(&token.bearer())
			.map_err(|_| ConfigError::InvalidHeader { name: "authorization" })?;

		value.set_sensitive(true);
		self.headers.insert(AUTHORIZATION, value);

		Ok(())
	}

	/// Returns the current `Authorization` header, if set and valid UTF-8.
	pub fn authorization(&self) -> Option<&str> {
		self.headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
	}
}

/// Raw response returned by a transport.
#[derive(Clone, Debug, Default)]
pub struct ApiResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers.
	pub headers: HeaderMap,
	/// Response body bytes.
	pub body: Vec<u8>,
}
impl ApiResponse {
	/// Creates a response with `status` and `body` and no headers.
	pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self { status, headers: HeaderMap::new(), body: body.into() }
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Decodes the body as JSON, reporting the failing field path on mismatch.
	pub fn json<T>(&self) -> Result<T>
	where
		T: serde::de::DeserializeOwned,
	{
		let de = &mut serde_json::Deserializer::from_slice(&self.body);

		Ok(serde_path_to_error::deserialize(de)?)
	}

	/// Converts a non-2xx response into a [`StatusError`] for `path`.
	pub(crate) fn into_result(self, path: &str) -> Result<Self> {
		if self.is_success() {
			Ok(self)
		} else {
			Err(StatusError { status: self.status, path: path.to_owned(), body: self.body }.into())
		}
	}
}

/// Transport backed by [`ReqwestClient`] with a cookie store, resolving paths against the
/// configured base URL.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
	client: ReqwestClient,
	config: Arc<ClientConfig>,
}
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Builds a client honoring the config's timeout with cookies enabled.
	pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
		let mut builder = ReqwestClient::builder().cookie_store(true);

		if let Some(timeout) = config.request_timeout {
			builder = builder.timeout(timeout);
		}

		Ok(Self::with_client(builder.build()?, config))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient, config: ClientConfig) -> Self {
		Self { client, config: Arc::new(config) }
	}

	/// Configuration the transport resolves paths with.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn send<'a>(&'a self, request: &'a RequestDescriptor) -> TransportFuture<'a> {
		Box::pin(async move {
			let url = self.config.endpoint_url(&request.path)?;
			let mut builder =
				self.client.request(request.method.clone(), url).headers(request.headers.clone());

			if let Some(body) = &request.body {
				if !request.headers.contains_key(CONTENT_TYPE) {
					builder = builder.header(CONTENT_TYPE, "application/json");
				}

				builder = builder.body(body.clone());
			}

			let response = builder
				.send()
				.await
				.map_err(|e| TransportError::network(request.path.as_str(), e))?;
			let status = response.status().as_u16();
			let headers = response.headers().to_owned();
			let body = response
				.bytes()
				.await
				.map_err(|e| TransportError::network(request.path.as_str(), e))?
				.to_vec();

			Ok(ApiResponse { status, headers, body })
		})
	}
}
