//! Session core for the Bibliodex library console—token lifecycle, single-flight refresh,
//! authorized requests with one-shot 401 recovery, and role-based route gating against the
//! Bibliodex REST API.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

#[cfg(test)] use bibliodex_session as _;

pub mod auth;
pub mod client;
pub mod error;
pub mod gate;
pub mod http;
pub mod nav;
pub mod obs;
pub mod session;
pub mod store;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	pub use crate::nav::RecordingNavigator;

	// crates.io
	use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
	// self
	use crate::{
		auth::Role,
		session::{Session, SessionConfig},
		store::MemoryStore,
	};

	/// Builds an unsigned JWT carrying the Bibliodex claim set used across tests.
	pub fn make_access_token(
		sub: &str,
		user_id: i64,
		role: &Role,
		expires_at: OffsetDateTime,
	) -> String {
		let header = URL_SAFE_NO_PAD.encode(b"{\"alg\":\"HS256\",\"typ\":\"JWT\"}");
		let payload = serde_json::json!({
			"sub": sub,
			"user_id": user_id,
			"role": role.as_str(),
			"nome": "Test User",
			"exp": expires_at.unix_timestamp(),
		});
		let payload = URL_SAFE_NO_PAD.encode(payload.to_string().as_bytes());

		format!("{header}.{payload}.test-signature")
	}

	/// Constructs a [`Session`] backed by an in-memory store and a recording navigator,
	/// pointed at the provided API base (typically an `httpmock` server URL).
	pub fn build_test_session(api_base: &str) -> (Session, Arc<MemoryStore>, Arc<RecordingNavigator>) {
		let config =
			SessionConfig::new(Url::parse(api_base).expect("Test API base URL should parse."));

		build_test_session_with_config(config)
	}

	/// Same as [`build_test_session`] but with a caller-tuned [`SessionConfig`], used by the
	/// scheduler tests to shrink refresh delays.
	pub fn build_test_session_with_config(
		config: SessionConfig,
	) -> (Session, Arc<MemoryStore>, Arc<RecordingNavigator>) {
		let store = Arc::new(MemoryStore::default());
		let navigator = Arc::new(RecordingNavigator::default());
		let session = Session::new(config, store.clone(), navigator.clone())
			.expect("Failed to build test session.");

		(session, store, navigator)
	}
}

mod _prelude {
	pub use std::{
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::{Arc, Weak},
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use httpmock as _;
