//! Credential storage contract and built-in store implementations.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::_prelude::*;

/// Key-value contract for the three persisted credential fields.
///
/// Calls are synchronous: the attacher reads the access credential on every request without
/// suspending, and the coordinator writes only while settling a refresh.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Returns the value stored under `key`, if any.
	fn get(&self, key: CredentialKey) -> Result<Option<String>, StoreError>;

	/// Stores or replaces the value under `key`.
	fn set(&self, key: CredentialKey, value: &str) -> Result<(), StoreError>;

	/// Removes `key`; removing an absent key is not an error.
	fn remove(&self, key: CredentialKey) -> Result<(), StoreError>;
}

/// Persisted credential fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CredentialKey {
	/// Short-lived access credential.
	#[serde(rename = "token")]
	AccessToken,
	/// Longer-lived refresh credential.
	#[serde(rename = "refreshToken")]
	RefreshToken,
	/// Opaque principal record, stored as JSON text.
	#[serde(rename = "admin")]
	Principal,
}
impl CredentialKey {
	/// Every key, in storage order.
	pub const ALL: [CredentialKey; 3] = [Self::AccessToken, Self::RefreshToken, Self::Principal];

	/// Returns the stable storage name for the key.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::AccessToken => "token",
			Self::RefreshToken => "refreshToken",
			Self::Principal => "admin",
		}
	}
}
impl Display for CredentialKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
