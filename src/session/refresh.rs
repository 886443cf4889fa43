//! Refresh token rotation with a single-flight guard.
//!
//! [`Session::refresh`] is the one shared refresh routine: the proactive scheduler and the
//! 401-recovery path of [`ApiClient`](crate::client::ApiClient) both call it. The Bibliodex
//! refresh token is single-use, so two concurrent rotations would invalidate each other; the
//! routine collapses concurrent callers onto one endpoint call by serializing them behind an
//! async guard and handing everyone queued on the same cycle that cycle's settled outcome,
//! success or failure. Once a cycle settles, the next caller starts a fresh one.

mod metrics;

pub use metrics::RefreshMetrics;

// std
use std::sync::atomic::Ordering;
// self
use crate::{
	_prelude::*,
	auth::{TokenPair, claims},
	http,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	session::{Session, parse_token_pair},
};

/// State behind the single-flight guard: the serial of the last settled cycle and its outcome,
/// kept so queued callers adopt the settlement instead of repeating it.
#[derive(Debug, Default)]
pub(crate) struct RefreshCycle {
	serial: u64,
	settled: Option<Result<TokenPair, SettledFailure>>,
}

/// Clonable rendition of a refresh failure, handed to every caller that was queued behind the
/// attempt that produced it.
#[derive(Clone, Debug)]
pub(crate) struct SettledFailure {
	status: Option<u16>,
	detail: String,
}
impl SettledFailure {
	fn capture(err: &Error) -> Self {
		match err {
			Error::Refresh { status, detail } =>
				Self { status: *status, detail: detail.clone() },
			other => Self { status: None, detail: other.to_string() },
		}
	}

	fn into_error(self) -> Error {
		Error::Refresh { status: self.status, detail: self.detail }
	}
}

impl Session {
	/// Exchanges the stored refresh token for a rotated token pair.
	///
	/// Fails with [`Error::NoRefreshToken`] without touching the network when nothing is
	/// stored. Any failure leaves the store exactly as it was; success persists the rotated
	/// pair, updates the identity, and re-arms the refresh timer from the new expiry.
	/// Concurrent callers collapse onto a single endpoint call and all receive that call's
	/// outcome, including its failure.
	pub async fn refresh(&self) -> Result<TokenPair> {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "refresh");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.refresh_metrics().record_attempt();

		let result = span.instrument(self.refresh_inner()).await;

		match &result {
			Ok(_) => {
				self.refresh_metrics().record_success();
				obs::record_flow_outcome(KIND, FlowOutcome::Success);
			},
			Err(_) => {
				self.refresh_metrics().record_failure();
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
			},
		}

		result
	}

	async fn refresh_inner(&self) -> Result<TokenPair> {
		let observed_serial = self.inner.refresh_serial.load(Ordering::Relaxed);
		let mut cycle = self.inner.refresh_guard.lock().await;

		// A cycle that settled while this caller waited is this caller's outcome. Repeating
		// it would burn the freshly rotated refresh token, or re-send a rotation the server
		// just rejected.
		if cycle.serial != observed_serial
			&& let Some(settled) = &cycle.settled
		{
			return match settled {
				Ok(pair) => Ok(pair.clone()),
				Err(failure) => Err(failure.clone().into_error()),
			};
		}

		let outcome = self.rotate().await;

		cycle.settled = Some(match &outcome {
			Ok(pair) => Ok(pair.clone()),
			Err(err) => Err(SettledFailure::capture(err)),
		});
		cycle.serial = cycle.serial.wrapping_add(1);
		self.inner.refresh_serial.store(cycle.serial, Ordering::Relaxed);

		outcome
	}

	async fn rotate(&self) -> Result<TokenPair> {
		let Some(current) = self.store().load().await? else {
			return Err(Error::NoRefreshToken);
		};
		let url = self.config().endpoint("auth/refresh_token")?;
		let response = self
			.http_client()
			.post(url)
			.json(&serde_json::json!({ "refresh_token": current.refresh_token.expose() }))
			.send()
			.await?;
		let status = response.status();
		let bytes = response.bytes().await?;

		if !status.is_success() {
			return Err(Error::Refresh {
				status: Some(status.as_u16()),
				detail: http::extract_detail(&bytes, "refresh token was rejected"),
			});
		}

		let pair = parse_token_pair(&bytes, Some(status.as_u16()))?;
		// Decode before save: a malformed rotation must not leave a half-updated store, and a
		// failed store write is this refresh's failure.
		let identity = claims::decode(pair.access_token.expose())?;

		self.store().save(pair.clone()).await?;
		self.send_modify(|state| state.identity = Some(identity.clone()));
		self.arm_refresh_timer(identity.expires_at);

		Ok(pair)
	}
}
