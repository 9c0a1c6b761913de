//! The access/refresh/principal triple as returned by the refresh endpoint and kept in stores.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	store::{CredentialKey, CredentialStore, StoreError},
};

/// Credential payload returned by the refresh endpoint.
///
/// Every field is optional: an absent field means "unchanged" and [`Credentials::persist`]
/// leaves the stored value alone. Field names follow the server's JSON contract (`token`,
/// `refreshToken`, `admin`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
	/// Fresh access credential.
	#[serde(default, rename = "token", skip_serializing_if = "Option::is_none")]
	pub access_token: Option<TokenSecret>,
	/// Rotated refresh credential.
	#[serde(default, rename = "refreshToken", skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<TokenSecret>,
	/// Opaque principal (user/session) record.
	#[serde(default, rename = "admin", skip_serializing_if = "Option::is_none")]
	pub principal: Option<serde_json::Value>,
}
impl Credentials {
	/// Sets the access credential.
	pub fn with_access_token(mut self, token: impl Into<TokenSecret>) -> Self {
		self.access_token = Some(token.into());

		self
	}

	/// Sets the refresh credential.
	pub fn with_refresh_token(mut self, token: impl Into<TokenSecret>) -> Self {
		self.refresh_token = Some(token.into());

		self
	}

	/// Sets the principal record.
	pub fn with_principal(mut self, principal: serde_json::Value) -> Self {
		self.principal = Some(principal);

		self
	}

	/// Parses a refresh response body; an empty body yields an all-absent payload.
	pub fn from_slice(body: &[u8]) -> Result<Self> {
		if body.iter().all(u8::is_ascii_whitespace) {
			return Ok(Self::default());
		}

		let de = &mut serde_json::Deserializer::from_slice(body);

		Ok(serde_path_to_error::deserialize(de)?)
	}

	/// Reads the current triple out of `store`.
	pub fn load(store: &dyn CredentialStore) -> Result<Self, StoreError> {
		let principal = match store.get(CredentialKey::Principal)? {
			Some(raw) => Some(serde_json::from_str(&raw).map_err(|e| StoreError::Serialization {
				message: format!("Stored principal is not valid JSON: {e}"),
			})?),
			None => None,
		};

		Ok(Self {
			access_token: store.get(CredentialKey::AccessToken)?.map(TokenSecret::from),
			refresh_token: store.get(CredentialKey::RefreshToken)?.map(TokenSecret::from),
			principal,
		})
	}

	/// Writes every present, non-empty field into `store`; absent fields keep their value.
	pub fn persist(&self, store: &dyn CredentialStore) -> Result<(), StoreError> {
		if let Some(token) = self.access_token.as_ref().filter(|t| !t.is_blank()) {
			store.set(CredentialKey::AccessToken, token.expose())?;
		}
		if let Some(token) = self.refresh_token.as_ref().filter(|t| !t.is_blank()) {
			store.set(CredentialKey::RefreshToken, token.expose())?;
		}
		if let Some(principal) = self.principal.as_ref().filter(|p| !p.is_null()) {
			let raw = serde_json::to_string(principal).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize principal: {e}"),
			})?;

			store.set(CredentialKey::Principal, &raw)?;
		}

		Ok(())
	}

	/// Removes all three fields from `store`, attempting every key even if one fails.
	pub fn clear(store: &dyn CredentialStore) -> Result<(), StoreError> {
		let mut first_err = None;

		for key in CredentialKey::ALL {
			if let Err(e) = store.remove(key) {
				first_err.get_or_insert(e);
			}
		}

		first_err.map_or(Ok(()), Err)
	}

	/// Returns the access credential only when it is present and non-empty.
	pub(crate) fn usable_access_token(&self) -> Option<&TokenSecret> {
		self.access_token.as_ref().filter(|t| !t.is_blank())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::MemoryStore;

	#[test]
	fn partial_payload_only_overwrites_present_fields() {
		let store = MemoryStore::default();

		Credentials::default()
			.with_access_token("t1")
			.with_refresh_token("r1")
			.with_principal(serde_json::json!({ "id": 7 }))
			.persist(&store)
			.expect("Seeding credentials should succeed.");

		let update = Credentials::from_slice(br#"{"token":"t2"}"#)
			.expect("Partial refresh payload should parse.");

		update.persist(&store).expect("Persisting a partial payload should succeed.");

		let loaded = Credentials::load(&store).expect("Loading credentials should succeed.");

		assert_eq!(loaded.access_token.as_ref().map(TokenSecret::expose), Some("t2"));
		assert_eq!(loaded.refresh_token.as_ref().map(TokenSecret::expose), Some("r1"));
		assert_eq!(loaded.principal, Some(serde_json::json!({ "id": 7 })));
	}

	#[test]
	fn empty_and_null_fields_count_as_absent() {
		let store = MemoryStore::default();

		Credentials::default().with_access_token("t1").persist(&store).expect("Seed should work.");

		let update = Credentials::from_slice(br#"{"token":"","admin":null}"#)
			.expect("Payload with empty fields should parse.");

		assert!(update.principal.is_none());

		update.persist(&store).expect("Persisting empty fields should succeed.");

		assert_eq!(
			store.get(CredentialKey::AccessToken).expect("Store read should succeed."),
			Some("t1".into()),
		);
		assert!(store.get(CredentialKey::Principal).expect("Store read should succeed.").is_none());
	}

	#[test]
	fn whitespace_tokens_count_as_absent() {
		let store = MemoryStore::with_entries([
			(CredentialKey::AccessToken, "t1"),
			(CredentialKey::RefreshToken, "r1"),
		]);
		let update = Credentials::from_slice(br#"{"token":"  ","refreshToken":"\t"}"#)
			.expect("Whitespace tokens should parse.");

		assert!(update.usable_access_token().is_none());

		update.persist(&store).expect("Persisting whitespace fields should succeed.");

		assert_eq!(
			store.get(CredentialKey::AccessToken).expect("Store read should succeed."),
			Some("t1".into()),
		);
		assert_eq!(
			store.get(CredentialKey::RefreshToken).expect("Store read should succeed."),
			Some("r1".into()),
		);
	}

	#[test]
	fn empty_body_parses_as_no_change() {
		let parsed = Credentials::from_slice(b"  ").expect("Blank body should parse.");

		assert_eq!(parsed, Credentials::default());
	}

	#[test]
	fn malformed_body_reports_path() {
		let err = Credentials::from_slice(br#"{"token":42}"#)
			.expect_err("Numeric token should be rejected.");

		match err {
			Error::Decode(inner) => assert_eq!(inner.path().to_string(), "token"),
			other => panic!("Unexpected error: {other:?}."),
		}
	}

	#[test]
	fn clear_removes_every_field() {
		let store = MemoryStore::default();

		Credentials::default()
			.with_access_token("t1")
			.with_refresh_token("r1")
			.persist(&store)
			.expect("Seed should work.");
		Credentials::clear(&store).expect("Clearing should succeed.");

		assert_eq!(
			Credentials::load(&store).expect("Loading should succeed."),
			Credentials::default()
		);
	}
}
