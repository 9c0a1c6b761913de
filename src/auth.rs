//! Credential models: redacted secrets and the access/refresh/principal triple.

pub mod credentials;
pub mod secret;

pub use credentials::*;
pub use secret::*;
