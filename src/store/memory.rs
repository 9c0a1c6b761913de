//! Thread-safe in-memory [`CredentialStore`] for tests, demos, and ephemeral sessions.

// self
use crate::{
	_prelude::*,
	store::{CredentialKey, CredentialStore, StoreError},
};

type StoreMap = Arc<RwLock<HashMap<CredentialKey, String>>>;

/// Keeps credentials in-process; clones share the same map.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Builds a store pre-populated with `entries`.
	pub fn with_entries<I, V>(entries: I) -> Self
	where
		I: IntoIterator<Item = (CredentialKey, V)>,
		V: Into<String>,
	{
		let map = entries.into_iter().map(|(k, v)| (k, v.into())).collect();

		Self(Arc::new(RwLock::new(map)))
	}

	/// Returns `true` when no credential is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl CredentialStore for MemoryStore {
	fn get(&self, key: CredentialKey) -> Result<Option<String>, StoreError> {
		Ok(self.0.read().get(&key).cloned())
	}

	fn set(&self, key: CredentialKey, value: &str) -> Result<(), StoreError> {
		self.0.write().insert(key, value.to_owned());

		Ok(())
	}

	fn remove(&self, key: CredentialKey) -> Result<(), StoreError> {
		self.0.write().remove(&key);

		Ok(())
	}
}
