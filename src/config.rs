//! Client configuration: base URL, refresh endpoint, unauthenticated surfaces, timeouts.

// std
use std::env;
// self
use crate::{_prelude::*, env::UnauthenticatedSurfaces, error::ConfigError};

/// Settings shared by the transport, attacher, and refresh coordinator.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ClientConfig {
	/// API base URL; request paths are appended to its path verbatim.
	pub base_url: Url,
	/// Path of the credential refresh endpoint.
	#[serde(default = "ClientConfig::default_refresh_path")]
	pub refresh_path: String,
	/// Location markers that disable refresh handling.
	#[serde(default)]
	pub unauthenticated_surfaces: UnauthenticatedSurfaces,
	/// Per-request timeout applied by the transport; also bounds how long waiters can be parked.
	#[serde(default, with = "duration_secs")]
	pub request_timeout: Option<Duration>,
}
impl ClientConfig {
	/// Environment variable consulted by [`ClientConfig::from_env`].
	pub const BASE_URL_VAR: &'static str = "API_BASE_URL";
	/// Default refresh endpoint path.
	pub const DEFAULT_REFRESH_PATH: &'static str = "/admins/refresh";

	/// Creates a config for `base_url` with default endpoint and surfaces.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			refresh_path: Self::default_refresh_path(),
			unauthenticated_surfaces: UnauthenticatedSurfaces::default(),
			request_timeout: None,
		}
	}

	/// Parses `base_url` and builds a default config around it.
	pub fn parse(base_url: &str) -> Result<Self, ConfigError> {
		let url = Url::parse(base_url)
			.map_err(|source| ConfigError::InvalidUrl { value: base_url.into(), source })?;

		Ok(Self::new(url))
	}

	/// Reads the base URL from `API_BASE_URL`.
	pub fn from_env() -> Result<Self, ConfigError> {
		let raw = env::var(Self::BASE_URL_VAR)
			.map_err(|_| ConfigError::MissingBaseUrl { var: Self::BASE_URL_VAR })?;

		Self::parse(raw.trim())
	}

	/// Overrides the refresh endpoint path.
	pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Replaces the unauthenticated surface markers.
	pub fn with_unauthenticated_surfaces(mut self, surfaces: UnauthenticatedSurfaces) -> Self {
		self.unauthenticated_surfaces = surfaces;

		self
	}

	/// Sets the transport timeout.
	pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
		self.request_timeout = Some(timeout);

		self
	}

	/// Joins `path` onto the base URL, keeping the base path prefix (`/api` + `/items`).
	pub fn endpoint_url(&self, path: &str) -> Result<Url, ConfigError> {
		if path.starts_with("http://") || path.starts_with("https://") {
			return Url::parse(path)
				.map_err(|source| ConfigError::InvalidUrl { value: path.into(), source });
		}

		let base = self.base_url.as_str().trim_end_matches('/');
		let joined = if path.starts_with('/') {
			format!("{base}{path}")
		} else {
			format!("{base}/{path}")
		};

		Url::parse(&joined).map_err(|source| ConfigError::InvalidUrl { value: joined, source })
	}

	/// Returns `true` when `path` addresses the refresh endpoint.
	///
	/// The refresh path must match whole trailing segments, so `/xadmins/refresh` is not the
	/// `admins/refresh` endpoint.
	pub fn is_refresh_path(&self, path: &str) -> bool {
		let target = self.refresh_path.trim_matches('/');
		let path = path.split(['?', '#']).next().unwrap_or_default().trim_end_matches('/');

		!target.is_empty()
			&& path.strip_suffix(target).is_some_and(|rest| rest.is_empty() || rest.ends_with('/'))
	}

	fn default_refresh_path() -> String {
		Self::DEFAULT_REFRESH_PATH.into()
	}
}

mod duration_secs {
	// self
	use crate::_prelude::*;

	pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		value.map(|d| d.as_secs_f64()).serialize(serializer)
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		let secs = Option::<f64>::deserialize(deserializer)?;

		secs.map(|s| Duration::try_from_secs_f64(s).map_err(serde::de::Error::custom)).transpose()
	}
}
