//! Proactive refresh timer owned by the session.
//!
//! The scheduler keeps at most one armed timer. Arming replaces any previous timer, and the
//! spawned task holds only a weak reference to the session, so the timer's lifetime never
//! exceeds the session's: once every strong handle is gone (or `cancel` runs on logout), the
//! timer can no longer act.

// crates.io
use tokio::task::JoinHandle;
// self
use crate::{_prelude::*, session::{Session, SessionInner}};

#[derive(Debug, Default)]
pub(crate) struct RefreshScheduler {
	handle: Mutex<Option<JoinHandle<()>>>,
}
impl RefreshScheduler {
	/// Arms the timer for the provided expiry, replacing any previously armed timer.
	pub(crate) fn arm(
		&self,
		session: Weak<SessionInner>,
		expires_at: OffsetDateTime,
		lead: Duration,
		floor: Duration,
	) {
		let delay = refresh_delay(expires_at, OffsetDateTime::now_utc(), lead, floor);
		let task = tokio::spawn(async move {
			tokio::time::sleep(delay).await;

			let Some(inner) = session.upgrade() else {
				return;
			};
			let session = Session::from_inner(inner);

			// A successful refresh re-arms the timer itself; failure means the session is
			// unrecoverable. No navigation here: the next gate check or protected call
			// observes the logged-out snapshot and redirects.
			if session.refresh().await.is_err() {
				session.invalidate().await;
			}
		});
		// Replacing the handle may abort the very task performing this re-arm; by then its
		// remaining work is already done.
		if let Some(previous) = self.handle.lock().replace(task) {
			previous.abort();
		}
	}

	/// Cancels the armed timer, if any.
	pub(crate) fn cancel(&self) {
		if let Some(task) = self.handle.lock().take() {
			task.abort();
		}
	}
}

/// Computes the timer delay: `expires_at - now - lead`, floored at `floor`.
///
/// A token that is already (or nearly) expired therefore schedules a near-immediate refresh
/// instead of a timer in the past.
pub(crate) fn refresh_delay(
	expires_at: OffsetDateTime,
	now: OffsetDateTime,
	lead: Duration,
	floor: Duration,
) -> std::time::Duration {
	let delay = expires_at - now - lead;
	let delay = if delay < floor { floor } else { delay };

	std::time::Duration::try_from(delay).unwrap_or_default()
}
