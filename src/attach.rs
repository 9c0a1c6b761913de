//! Credential attacher: stamps the stored access credential onto outgoing requests.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	http::RequestDescriptor,
	store::{CredentialKey, CredentialStore},
};

/// Reads the access credential from the store and injects it as a bearer header.
#[derive(Clone)]
pub struct CredentialAttacher {
	store: Arc<dyn CredentialStore>,
}
impl CredentialAttacher {
	/// Creates an attacher reading from `store`.
	pub fn new(store: Arc<dyn CredentialStore>) -> Self {
		Self { store }
	}

	/// Sets `Authorization: Bearer <token>` when an access credential is stored.
	///
	/// A missing (or empty) credential leaves the request untouched so it goes out
	/// unauthenticated; the server's rejection is then handled by the refresh coordinator.
	pub fn attach(&self, request: &mut RequestDescriptor) -> Result<()> {
		let Some(token) = self.store.get(CredentialKey::AccessToken)?.map(TokenSecret::from)
		else {
			return Ok(());
		};

		if token.is_blank() {
			return Ok(());
		}

		request.set_bearer(&token)?;

		Ok(())
	}
}
impl Debug for CredentialAttacher {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("CredentialAttacher(..)")
	}
}
