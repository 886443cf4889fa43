//! Navigation seam between the session core and the embedding view layer.

// self
use crate::_prelude::*;

/// Routes the session core can force the application onto.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Route {
	/// Login view, shown after logout or a terminal auth failure.
	Login,
	/// Access-denied view, shown on a role mismatch.
	Forbidden,
}
impl Route {
	/// Returns the canonical client-side path for the route.
	pub const fn as_path(self) -> &'static str {
		match self {
			Route::Login => "/login",
			Route::Forbidden => "/forbidden",
		}
	}
}
impl Display for Route {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_path())
	}
}

/// Navigation sink implemented by the embedding application.
///
/// The core never renders anything; it only asks the host to move the user. Implementations
/// that can tell where the user currently is should override [`Navigator::is_at`] so the core
/// can skip redundant redirects to the login view.
pub trait Navigator
where
	Self: Send + Sync,
{
	/// Performs a client-side navigation to the route.
	fn navigate(&self, route: Route);

	/// Returns `true` when the application is already showing the route.
	fn is_at(&self, route: Route) -> bool {
		let _ = route;

		false
	}
}

/// Navigator that ignores every request, for headless or test-bench embeddings.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNavigator;
impl Navigator for NoopNavigator {
	fn navigate(&self, _: Route) {}
}

/// Records navigations for assertions; enabled via `cfg(test)` or the `test` crate feature.
#[cfg(any(test, feature = "test"))]
#[derive(Debug, Default)]
pub struct RecordingNavigator {
	visits: Mutex<Vec<Route>>,
	current: Mutex<Option<Route>>,
}
#[cfg(any(test, feature = "test"))]
impl RecordingNavigator {
	/// Marks a route as the one currently displayed.
	pub fn set_current(&self, route: Route) {
		*self.current.lock() = Some(route);
	}

	/// Returns every navigation observed so far, in order.
	pub fn visits(&self) -> Vec<Route> {
		self.visits.lock().clone()
	}
}
#[cfg(any(test, feature = "test"))]
impl Navigator for RecordingNavigator {
	fn navigate(&self, route: Route) {
		self.visits.lock().push(route);
		*self.current.lock() = Some(route);
	}

	fn is_at(&self, route: Route) -> bool {
		*self.current.lock() == Some(route)
	}
}
