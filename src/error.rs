//! Pipeline-level error types shared across the attacher, coordinator, stores, and transports.

// self
use crate::_prelude::*;

/// Pipeline-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical pipeline error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Credential store failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeouts).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Server answered with a non-success status.
	#[error(transparent)]
	Status(#[from] StatusError),
	/// The credential refresh call failed; the session has been logged out.
	#[error(transparent)]
	RefreshEndpoint(#[from] RefreshFailure),
	/// Response body could not be decoded into the expected shape.
	#[error("Response body could not be decoded.")]
	Decode(#[from] serde_path_to_error::Error<serde_json::Error>),
	/// The refresh this request was waiting on was dropped before it settled.
	#[error("The in-flight credential refresh was abandoned before it settled.")]
	RefreshAbandoned,
}
impl Error {
	/// Returns the HTTP status carried by the failure, when one exists.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Status(e) => Some(e.status),
			Self::RefreshEndpoint(e) => e.status,
			_ => None,
		}
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] http::Error),
	/// Base URL is missing from the environment.
	#[error("Environment variable `{var}` is not set.")]
	MissingBaseUrl {
		/// Variable that was consulted.
		var: &'static str,
	},
	/// Base URL or a joined endpoint URL cannot be parsed.
	#[error("URL `{value}` is invalid.")]
	InvalidUrl {
		/// Offending input.
		value: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Header value cannot be encoded.
	#[error("Header `{name}` contains characters that are not allowed.")]
	InvalidHeader {
		/// Header name.
		name: &'static str,
	},
	/// Request body could not be serialized to JSON.
	#[error("Request body could not be serialized.")]
	BodySerialize(#[from] serde_json::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling `{path}`.")]
	Network {
		/// Request path that failed.
		path: String,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(
		path: impl Into<String>,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Network { path: path.into(), source: Box::new(src) }
	}
}

/// Non-success HTTP response surfaced to the caller.
#[derive(Clone, Debug, ThisError)]
#[error("Request to `{path}` failed with HTTP status {status}.")]
pub struct StatusError {
	/// HTTP status code.
	pub status: u16,
	/// Request path that produced the status.
	pub path: String,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl StatusError {
	/// Returns the body as UTF-8 text, replacing invalid sequences.
	pub fn body_text(&self) -> std::borrow::Cow<'_, str> {
		String::from_utf8_lossy(&self.body)
	}
}

/// Failure of the credential refresh call, shared by the leader and every queued waiter.
#[derive(Clone, Debug, ThisError)]
#[error("Credential refresh failed.")]
pub struct RefreshFailure {
	/// HTTP status of the refresh response, if the server answered.
	pub status: Option<u16>,
	/// Underlying failure.
	#[source]
	pub cause: Arc<Error>,
	/// Store failure hit while clearing the session afterwards; credentials may still be stored.
	pub uncleared: Option<crate::store::StoreError>,
}
impl RefreshFailure {
	pub(crate) fn new(cause: Error) -> Self {
		Self { status: cause.status(), cause: Arc::new(cause), uncleared: None }
	}

	pub(crate) fn with_uncleared(mut self, uncleared: Option<crate::store::StoreError>) -> Self {
		self.uncleared = uncleared;

		self
	}
}
