//! Injected environment capabilities: current location, forced navigation, surface classification.

// self
use crate::_prelude::*;

/// Reports where the application currently is (a route or pathname).
pub trait LocationProvider
where
	Self: Send + Sync,
{
	/// Returns the current location path.
	fn current_location(&self) -> String;
}

/// Moves the application to its logged-out view.
pub trait Navigator
where
	Self: Send + Sync,
{
	/// Forces the logged-out view. Must not fail.
	fn force_logged_out_view(&self);
}
impl<F> Navigator for F
where
	F: Fn() + Send + Sync,
{
	fn force_logged_out_view(&self) {
		self()
	}
}

/// Mutable location shared between the application and the pipeline.
#[derive(Clone, Debug, Default)]
pub struct SharedLocation(Arc<RwLock<String>>);
impl SharedLocation {
	/// Creates a location starting at `path`.
	pub fn new(path: impl Into<String>) -> Self {
		Self(Arc::new(RwLock::new(path.into())))
	}

	/// Replaces the current location.
	pub fn set(&self, path: impl Into<String>) {
		*self.0.write() = path.into();
	}
}
impl LocationProvider for SharedLocation {
	fn current_location(&self) -> String {
		self.0.read().clone()
	}
}

/// Location markers identifying views that run without a session (login, public pages).
///
/// A location is unauthenticated when it contains any marker, so `/kundenansicht/42` matches
/// the `/kundenansicht` marker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnauthenticatedSurfaces(Vec<String>);
impl UnauthenticatedSurfaces {
	/// Builds a marker set from `markers`, dropping empty entries.
	pub fn new<I, S>(markers: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self(markers.into_iter().map(Into::into).filter(|m: &String| !m.is_empty()).collect())
	}

	/// Returns `true` when `location` is an unauthenticated surface.
	pub fn contains(&self, location: &str) -> bool {
		self.0.iter().any(|marker| !marker.is_empty() && location.contains(marker.as_str()))
	}

	/// Iterates over the configured markers.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.0.iter().map(String::as_str)
	}
}
impl Default for UnauthenticatedSurfaces {
	fn default() -> Self {
		Self::new(["/login", "/kundenansicht"])
	}
}
