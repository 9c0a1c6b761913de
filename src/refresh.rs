//! Single-flight credential refresh with a FIFO waiter queue.
//!
//! [`RefreshCoordinator::handle_failure`] classifies every failed response. For a first-time
//! 401 it either becomes the *leader* and issues the one refresh call, or parks behind the
//! leader as a *waiter*. The queue lives inside [`RefreshState::Refreshing`], so it is empty by
//! construction whenever the coordinator is idle. When the refresh settles the leader swaps the
//! state back to idle and completes every waiter in enqueue order in a single pass; a failed
//! refresh clears the credential store and forces the logged-out view exactly once.

mod classify;
mod metrics;

pub use classify::*;
pub use metrics::RefreshMetrics;

// std
use std::mem;
// crates.io
use futures::channel::oneshot;
// self
use crate::{
	_prelude::*,
	attach::CredentialAttacher,
	auth::{Credentials, TokenSecret},
	config::ClientConfig,
	env::{LocationProvider, Navigator},
	error::RefreshFailure,
	http::{HttpTransport, RequestDescriptor},
	obs::{self, PipelineSpan, RefreshOutcome, Stage},
	store::{CredentialKey, CredentialStore, StoreError},
};

type Settlement = std::result::Result<Option<TokenSecret>, RefreshFailure>;

/// Refresh state; the waiter queue only exists while a refresh is in flight.
#[derive(Debug, Default)]
enum RefreshState {
	#[default]
	Idle,
	Refreshing {
		waiters: Vec<oneshot::Sender<Settlement>>,
	},
}

enum Entry<'a> {
	Leader(RefreshLease<'a>),
	Waiter(oneshot::Receiver<Settlement>),
}

/// Leadership over the in-flight refresh; dropping it unsettled releases every waiter with
/// [`Error::RefreshAbandoned`].
struct RefreshLease<'a> {
	state: &'a Mutex<RefreshState>,
	armed: bool,
}
impl RefreshLease<'_> {
	fn settle(mut self, settlement: &Settlement) {
		self.armed = false;

		for waiter in take_waiters(self.state) {
			let _ = waiter.send(settlement.clone());
		}
	}
}
impl Drop for RefreshLease<'_> {
	fn drop(&mut self) {
		if self.armed {
			drop(take_waiters(self.state));
		}
	}
}

fn take_waiters(state: &Mutex<RefreshState>) -> Vec<oneshot::Sender<Settlement>> {
	match mem::take(&mut *state.lock()) {
		RefreshState::Idle => Vec::new(),
		RefreshState::Refreshing { waiters } => waiters,
	}
}

#[derive(Serialize)]
struct RefreshRequest {
	#[serde(rename = "refreshToken", skip_serializing_if = "Option::is_none")]
	refresh_token: Option<TokenSecret>,
}

/// Coordinates credential refreshes for one client session.
///
/// Construct one coordinator per session and share it by reference; it owns the refresh state
/// and waiter queue and is the only component that mutates them.
pub struct RefreshCoordinator<T>
where
	T: ?Sized + HttpTransport,
{
	transport: Arc<T>,
	store: Arc<dyn CredentialStore>,
	attacher: CredentialAttacher,
	location: Arc<dyn LocationProvider>,
	navigator: Arc<dyn Navigator>,
	config: Arc<ClientConfig>,
	metrics: RefreshMetrics,
	state: Mutex<RefreshState>,
}
impl<T> RefreshCoordinator<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates an idle coordinator wired to the given capabilities.
	pub fn new(
		config: Arc<ClientConfig>,
		transport: Arc<T>,
		store: Arc<dyn CredentialStore>,
		location: Arc<dyn LocationProvider>,
		navigator: Arc<dyn Navigator>,
	) -> Self {
		Self {
			attacher: CredentialAttacher::new(store.clone()),
			transport,
			store,
			location,
			navigator,
			config,
			metrics: RefreshMetrics::default(),
			state: Default::default(),
		}
	}

	/// Counters describing refresh activity so far.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	/// Returns `true` while a refresh call is in flight.
	pub fn is_refreshing(&self) -> bool {
		matches!(*self.state.lock(), RefreshState::Refreshing { .. })
	}

	/// Number of requests currently parked behind the in-flight refresh.
	pub fn queued_waiters(&self) -> usize {
		match &*self.state.lock() {
			RefreshState::Idle => 0,
			RefreshState::Refreshing { waiters } => waiters.len(),
		}
	}

	/// Classifies `failure` for `request` against the current location.
	pub fn classify(&self, request: &RequestDescriptor, failure: &Error) -> Disposition {
		let location = self.location.current_location();
		let bypass = self.config.unauthenticated_surfaces.contains(&location);

		Disposition::decide(bypass, FailureKind::of(&self.config, request, failure))
	}

	/// Handles a failed response for `request`.
	///
	/// Returns the descriptor to replay (marked retried, carrying the new bearer credential when
	/// the refresh produced one), or the error to surface: the original `failure` for every
	/// disposition other than refresh-and-replay, or the shared [`RefreshFailure`] when the
	/// refresh itself failed.
	pub async fn handle_failure(
		&self,
		mut request: RequestDescriptor,
		failure: Error,
	) -> Result<RequestDescriptor> {
		let disposition = self.classify(&request, &failure);

		obs::record_disposition(disposition);
		obs::trace_disposition(disposition, &request.path, failure.status());

		match disposition {
			Disposition::Bypass | Disposition::AlreadyRetried | Disposition::Passthrough =>
				return Err(failure),
			Disposition::FatalRefreshEndpoint => {
				let uncleared = self.clear_session();

				self.force_logged_out("refresh endpoint rejected the session");

				return Err(uncleared.map_or(failure, Error::from));
			},
			Disposition::RefreshAndReplay => (),
		}

		request.mark_retried();

		let settlement = match self.enter() {
			Entry::Leader(lease) =>
				PipelineSpan::new(Stage::Refresh, &self.config.refresh_path)
					.instrument(self.lead(lease))
					.await,
			Entry::Waiter(waiter) => PipelineSpan::new(Stage::Wait, &request.path)
				.instrument(waiter)
				.await
				.map_err(|_| Error::RefreshAbandoned)?,
		};

		match settlement {
			Ok(Some(token)) => request.set_bearer(&token)?,
			Ok(None) => (),
			Err(refresh_failure) => return Err(refresh_failure.into()),
		}

		Ok(request)
	}

	/// Clears every stored credential and forces the logged-out view.
	pub fn sign_out(&self) -> Result<()> {
		let uncleared = self.clear_session();

		self.force_logged_out("signed out");

		match uncleared {
			Some(e) => Err(e.into()),
			None => Ok(()),
		}
	}

	fn enter(&self) -> Entry<'_> {
		let mut state = self.state.lock();

		if let RefreshState::Refreshing { waiters } = &mut *state {
			let (tx, rx) = oneshot::channel();

			waiters.push(tx);
			self.metrics.record_waiter();

			return Entry::Waiter(rx);
		}

		*state = RefreshState::Refreshing { waiters: Vec::new() };

		Entry::Leader(RefreshLease { state: &self.state, armed: true })
	}

	async fn lead(&self, lease: RefreshLease<'_>) -> Settlement {
		self.metrics.record_attempt();
		obs::record_refresh_outcome(RefreshOutcome::Attempt);

		let refreshed = match self.call_refresh_endpoint().await {
			Ok(credentials) => credentials
				.persist(self.store.as_ref())
				.map(|()| credentials.usable_access_token().cloned())
				.map_err(Error::from),
			Err(e) => Err(e),
		};

		match refreshed {
			Ok(token) => {
				let settlement = Ok(token);

				self.metrics.record_success();
				obs::record_refresh_outcome(RefreshOutcome::Success);
				lease.settle(&settlement);

				settlement
			},
			Err(e) => {
				let uncleared = self.clear_session();
				let settlement = Err(RefreshFailure::new(e).with_uncleared(uncleared));

				self.metrics.record_failure();
				obs::record_refresh_outcome(RefreshOutcome::Failure);
				lease.settle(&settlement);
				self.force_logged_out("credential refresh failed");

				settlement
			},
		}
	}

	async fn call_refresh_endpoint(&self) -> Result<Credentials> {
		let refresh_token = self.store.get(CredentialKey::RefreshToken)?.map(TokenSecret::from);
		let mut request = RequestDescriptor::post(self.config.refresh_path.as_str())
			.with_json(&RefreshRequest { refresh_token })?;

		self.attacher.attach(&mut request)?;

		let response = self.transport.send(&request).await?.into_result(&request.path)?;

		Credentials::from_slice(&response.body)
	}

	fn clear_session(&self) -> Option<StoreError> {
		let err = Credentials::clear(self.store.as_ref()).err()?;

		obs::trace_store_failure(&err);

		Some(err)
	}

	fn force_logged_out(&self, reason: &'static str) {
		obs::trace_forced_logout(reason);
		self.metrics.record_logout();
		self.navigator.force_logged_out_view();
	}
}
impl<T> Debug for RefreshCoordinator<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshCoordinator")
			.field("refresh_path", &self.config.refresh_path)
			.field("refreshing", &self.is_refreshing())
			.field("queued_waiters", &self.queued_waiters())
			.finish()
	}
}
