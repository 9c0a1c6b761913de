//! Failure taxonomy and the dispositions the coordinator derives from it.

// self
use crate::{_prelude::*, config::ClientConfig, http::RequestDescriptor};

/// Status code signalling a missing, invalid, or expired credential.
pub const UNAUTHORIZED: u16 = 401;

/// What kind of failure a response represents, independent of where the application is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
	/// 401 on a first-time descriptor; eligible for refresh-and-replay.
	AuthorizationFailure,
	/// 401 returned by the refresh endpoint itself.
	RefreshEndpointFailure,
	/// 401 on a descriptor that was already replayed once.
	AlreadyRetriedFailure,
	/// Any other status or a transport error.
	OtherHttpFailure,
}
impl FailureKind {
	/// Classifies `failure` for `request`.
	pub fn of(config: &ClientConfig, request: &RequestDescriptor, failure: &Error) -> Self {
		match failure {
			Error::Status(e) if e.status == UNAUTHORIZED =>
				if request.is_retried() {
					Self::AlreadyRetriedFailure
				} else if config.is_refresh_path(&request.path) {
					Self::RefreshEndpointFailure
				} else {
					Self::AuthorizationFailure
				},
			_ => Self::OtherHttpFailure,
		}
	}
}

/// Action the coordinator takes for a failed response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Disposition {
	/// The application is on an unauthenticated surface; surface the failure untouched.
	Bypass,
	/// The refresh endpoint rejected the caller; clear credentials and log out.
	FatalRefreshEndpoint,
	/// The descriptor was already replayed; surface the failure.
	AlreadyRetried,
	/// Refresh (or join the in-flight refresh) and replay.
	RefreshAndReplay,
	/// Not an authorization failure; surface it.
	Passthrough,
}
impl Disposition {
	/// Derives the disposition from the surface check and the failure kind.
	pub fn decide(on_unauthenticated_surface: bool, kind: FailureKind) -> Self {
		if on_unauthenticated_surface {
			return Self::Bypass;
		}

		match kind {
			FailureKind::AuthorizationFailure => Self::RefreshAndReplay,
			FailureKind::RefreshEndpointFailure => Self::FatalRefreshEndpoint,
			FailureKind::AlreadyRetriedFailure => Self::AlreadyRetried,
			FailureKind::OtherHttpFailure => Self::Passthrough,
		}
	}

	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Bypass => "bypass",
			Self::FatalRefreshEndpoint => "fatal_refresh_endpoint",
			Self::AlreadyRetried => "already_retried",
			Self::RefreshAndReplay => "refresh_and_replay",
			Self::Passthrough => "passthrough",
		}
	}
}
impl Display for Disposition {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
