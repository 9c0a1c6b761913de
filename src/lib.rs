//! Bearer-token HTTP pipeline: attach stored credentials to every request, and when the server
//! answers 401, run exactly one credential refresh for all concurrent callers and replay them.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod attach;
pub mod auth;
pub mod client;
pub mod config;
pub mod env;
pub mod error;
pub mod http;
pub mod obs;
pub mod refresh;
pub mod store;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for tests; enabled via `cfg(test)` or the `test` crate
	//! feature.

	pub use crate::_prelude::*;

	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use crate::{
		env::Navigator,
		http::{ApiResponse, HttpTransport, RequestDescriptor, TransportFuture},
	};
	#[cfg(feature = "reqwest")] use crate::{config::ClientConfig, http::ReqwestTransport};

	/// Builds a reqwest transport that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	#[cfg(feature = "reqwest")]
	pub fn test_reqwest_transport(config: ClientConfig) -> ReqwestTransport {
		let client = ReqwestClient::builder()
			.cookie_store(true)
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestTransport::with_client(client, config)
	}

	type Handler = Box<dyn Fn(RequestDescriptor) -> TransportFuture<'static> + Send + Sync>;

	/// Transport that answers through a closure and records every request it receives.
	pub struct ScriptedTransport {
		handler: Handler,
		log: Mutex<Vec<RequestDescriptor>>,
	}
	impl ScriptedTransport {
		/// Builds a transport that resolves each request with `handler`.
		pub fn new<F, Fut>(handler: F) -> Self
		where
			F: 'static + Send + Sync + Fn(RequestDescriptor) -> Fut,
			Fut: 'static + Send + Future<Output = Result<ApiResponse>>,
		{
			Self {
				handler: Box::new(move |request| -> TransportFuture<'static> {
					Box::pin(handler(request))
				}),
				log: Default::default(),
			}
		}

		/// Returns clones of every request sent so far, in order.
		pub fn requests(&self) -> Vec<RequestDescriptor> {
			self.log.lock().clone()
		}

		/// Counts requests sent to `path`.
		pub fn calls_to(&self, path: &str) -> usize {
			self.log.lock().iter().filter(|r| r.path == path).count()
		}
	}
	impl HttpTransport for ScriptedTransport {
		fn send<'a>(&'a self, request: &'a RequestDescriptor) -> TransportFuture<'a> {
			self.log.lock().push(request.clone());

			(self.handler)(request.clone())
		}
	}
	impl Debug for ScriptedTransport {
		fn fmt(&self, f: &mut Formatter) -> FmtResult {
			f.debug_struct("ScriptedTransport").field("sent", &self.log.lock().len()).finish()
		}
	}

	/// Navigator counting how often the logged-out view was forced.
	#[derive(Clone, Debug, Default)]
	pub struct CountingNavigator(Arc<AtomicUsize>);
	impl CountingNavigator {
		/// Number of forced navigations so far.
		pub fn count(&self) -> usize {
			self.0.load(Ordering::SeqCst)
		}
	}
	impl Navigator for CountingNavigator {
		fn force_logged_out_view(&self) {
			self.0.fetch_add(1, Ordering::SeqCst);
		}
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
		time::Duration,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
