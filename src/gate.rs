//! Declarative route protection driven by session snapshots.

// crates.io
use tokio::sync::watch;
// self
use crate::{
	_prelude::*,
	auth::Role,
	nav::{Navigator, Route},
	session::SessionSnapshot,
};

/// Resolution of a gate check for a protected view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateState {
	/// Session state is still hydrating; render nothing yet.
	Checking,
	/// The wrapped view may render.
	Allowed,
	/// Unauthenticated; the view must yield to the login route.
	RedirectLogin,
	/// Authenticated but lacking a required role; the view must yield to the forbidden route.
	RedirectForbidden,
}

/// Guards a view by authentication and, optionally, by role.
///
/// A gate without a role set admits any authenticated session. Evaluation is pure; pair it
/// with [`RouteGate::drive`] to turn snapshot changes into navigations for as long as the
/// protected view stays mounted, so a logout (or a scheduler-forced invalidation) redirects
/// within one snapshot tick instead of leaving stale protected content visible.
#[derive(Clone, Debug, Default)]
pub struct RouteGate {
	allowed_roles: Option<Vec<Role>>,
}
impl RouteGate {
	/// Gate that admits any authenticated session.
	pub fn any_authenticated() -> Self {
		Self { allowed_roles: None }
	}

	/// Gate that additionally requires the session role to be in `roles`.
	pub fn with_roles(roles: impl IntoIterator<Item = Role>) -> Self {
		Self { allowed_roles: Some(roles.into_iter().collect()) }
	}

	/// Evaluates the gate against a snapshot.
	pub fn evaluate(&self, snapshot: &SessionSnapshot) -> GateState {
		if snapshot.is_loading {
			return GateState::Checking;
		}

		let Some(identity) = &snapshot.identity else {
			return GateState::RedirectLogin;
		};

		match &self.allowed_roles {
			Some(roles) if !roles.contains(&identity.role) => GateState::RedirectForbidden,
			_ => GateState::Allowed,
		}
	}

	/// Waits past [`GateState::Checking`] and returns the first settled state.
	pub async fn resolve(&self, rx: &mut watch::Receiver<SessionSnapshot>) -> GateState {
		loop {
			let state = self.evaluate(&rx.borrow_and_update());

			if state != GateState::Checking || rx.changed().await.is_err() {
				return state;
			}
		}
	}

	/// Re-evaluates on every snapshot change and issues redirect navigations.
	///
	/// Runs until the session is dropped; callers abort the driving task when the protected
	/// view unmounts.
	pub async fn drive(
		&self,
		mut rx: watch::Receiver<SessionSnapshot>,
		navigator: Arc<dyn Navigator>,
	) {
		loop {
			let state = self.evaluate(&rx.borrow_and_update());

			match state {
				GateState::RedirectLogin =>
					if !navigator.is_at(Route::Login) {
						navigator.navigate(Route::Login);
					},
				GateState::RedirectForbidden =>
					if !navigator.is_at(Route::Forbidden) {
						navigator.navigate(Route::Forbidden);
					},
				GateState::Checking | GateState::Allowed => {},
			}

			if rx.changed().await.is_err() {
				return;
			}
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		auth::Identity,
		nav::RecordingNavigator,
	};

	fn snapshot_with_role(role: Role) -> SessionSnapshot {
		SessionSnapshot {
			identity: Some(Identity {
				subject: "12345".into(),
				user_id: 7,
				role,
				display_name: None,
				expires_at: OffsetDateTime::now_utc() + Duration::hours(1),
			}),
			is_loading: false,
			last_error: None,
		}
	}

	fn logged_out_snapshot() -> SessionSnapshot {
		SessionSnapshot { identity: None, is_loading: false, last_error: None }
	}

	#[test]
	fn loading_session_keeps_checking() {
		let snapshot =
			SessionSnapshot { identity: None, is_loading: true, last_error: None };

		assert_eq!(RouteGate::any_authenticated().evaluate(&snapshot), GateState::Checking);
		assert_eq!(
			RouteGate::with_roles([Role::Staff]).evaluate(&snapshot),
			GateState::Checking,
			"Role checks must wait for hydration to finish.",
		);
	}

	#[test]
	fn unauthenticated_session_redirects_to_login() {
		let gate = RouteGate::any_authenticated();

		assert_eq!(gate.evaluate(&logged_out_snapshot()), GateState::RedirectLogin);
	}

	#[test]
	fn role_mismatch_redirects_to_forbidden() {
		let gate = RouteGate::with_roles([Role::Staff]);

		assert_eq!(
			gate.evaluate(&snapshot_with_role(Role::Client)),
			GateState::RedirectForbidden,
			"A patron session must never render a staff-only view.",
		);
		assert_eq!(gate.evaluate(&snapshot_with_role(Role::Staff)), GateState::Allowed);
	}

	#[test]
	fn missing_role_set_admits_any_authenticated_role() {
		let gate = RouteGate::any_authenticated();

		assert_eq!(gate.evaluate(&snapshot_with_role(Role::Client)), GateState::Allowed);
		assert_eq!(
			gate.evaluate(&snapshot_with_role(Role::Other("auditor".into()))),
			GateState::Allowed,
		);
	}

	#[tokio::test]
	async fn resolve_waits_for_hydration() {
		let (tx, mut rx) = tokio::sync::watch::channel(SessionSnapshot {
			identity: None,
			is_loading: true,
			last_error: None,
		});
		let gate = RouteGate::with_roles([Role::Staff]);
		let resolved = tokio::spawn(async move { gate.resolve(&mut rx).await });

		tx.send(snapshot_with_role(Role::Staff)).expect("Snapshot send should succeed.");

		let state = resolved.await.expect("Resolve task should not panic.");

		assert_eq!(state, GateState::Allowed);
	}

	#[tokio::test]
	async fn drive_redirects_after_logout_within_one_tick() {
		let (tx, rx) = tokio::sync::watch::channel(snapshot_with_role(Role::Staff));
		let navigator = Arc::new(RecordingNavigator::default());
		let gate = RouteGate::with_roles([Role::Staff]);
		let driver = tokio::spawn({
			let navigator = navigator.clone();

			async move { gate.drive(rx, navigator).await }
		});

		tokio::task::yield_now().await;

		assert!(navigator.visits().is_empty(), "An allowed session must not navigate.");

		// Logout while the protected view is still mounted.
		tx.send(logged_out_snapshot()).expect("Snapshot send should succeed.");
		drop(tx);
		driver.await.expect("Gate driver should finish when the session ends.");

		assert_eq!(navigator.visits(), vec![Route::Login]);
	}
}
