//! Session state machine: hydration, login, logout, and snapshot broadcasting.

pub mod refresh;
pub mod scheduler;

pub use refresh::RefreshMetrics;

// std
use std::sync::atomic::AtomicU64;
// crates.io
use tokio::sync::watch;
// self
use crate::{
	_prelude::*,
	auth::{Identity, Role, TokenPair, claims},
	http::{self, ApiHttpClient},
	nav::{Navigator, Route},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	session::{refresh::RefreshCycle, scheduler::RefreshScheduler},
	store::SessionStore,
};

/// Configuration for a [`Session`]: API base URL plus refresh timing policy.
#[derive(Clone, Debug)]
pub struct SessionConfig {
	api_base: Url,
	refresh_lead: Duration,
	min_refresh_delay: Duration,
	request_timeout: std::time::Duration,
}
impl SessionConfig {
	/// Default lead time subtracted from the token expiry when arming the refresh timer.
	pub const DEFAULT_REFRESH_LEAD: Duration = Duration::seconds(60);
	/// Default floor for the refresh timer delay.
	pub const DEFAULT_MIN_REFRESH_DELAY: Duration = Duration::seconds(5);
	const DEFAULT_REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

	/// Creates a configuration for the provided API base URL.
	pub fn new(mut api_base: Url) -> Self {
		if !api_base.path().ends_with('/') {
			let path = format!("{}/", api_base.path());

			api_base.set_path(&path);
		}

		Self {
			api_base,
			refresh_lead: Self::DEFAULT_REFRESH_LEAD,
			min_refresh_delay: Self::DEFAULT_MIN_REFRESH_DELAY,
			request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
		}
	}

	/// Overrides the refresh lead time (defaults to 60 seconds; negative values clamp to zero).
	pub fn with_refresh_lead(mut self, lead: Duration) -> Self {
		self.refresh_lead = if lead.is_negative() { Duration::ZERO } else { lead };

		self
	}

	/// Overrides the refresh delay floor (defaults to 5 seconds; negative values clamp to zero).
	pub fn with_min_refresh_delay(mut self, floor: Duration) -> Self {
		self.min_refresh_delay = if floor.is_negative() { Duration::ZERO } else { floor };

		self
	}

	/// Overrides the per-request timeout applied to the built-in HTTP client.
	pub fn with_request_timeout(mut self, timeout: std::time::Duration) -> Self {
		self.request_timeout = timeout;

		self
	}

	/// Returns the normalized API base URL.
	pub fn api_base(&self) -> &Url {
		&self.api_base
	}

	pub(crate) fn refresh_lead(&self) -> Duration {
		self.refresh_lead
	}

	pub(crate) fn min_refresh_delay(&self) -> Duration {
		self.min_refresh_delay
	}

	pub(crate) fn endpoint(&self, path: &str) -> Result<Url> {
		self.api_base
			.join(path.trim_start_matches('/'))
			.map_err(|source| Error::InvalidPath { source })
	}
}

/// Point-in-time view of the session, broadcast to gates and views on every mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSnapshot {
	/// Decoded identity; non-null exactly when a decodable access token is stored.
	pub identity: Option<Identity>,
	/// True during initial hydration or an in-flight login.
	pub is_loading: bool,
	/// Surfaced login failure reason; cleared explicitly.
	pub last_error: Option<String>,
}
impl SessionSnapshot {
	fn initial() -> Self {
		Self { identity: None, is_loading: true, last_error: None }
	}

	/// Returns `true` when an identity is present.
	pub fn is_authenticated(&self) -> bool {
		self.identity.is_some()
	}

	/// Returns the current role, if authenticated.
	pub fn role(&self) -> Option<&Role> {
		self.identity.as_ref().map(|identity| &identity.role)
	}
}

pub(crate) struct SessionInner {
	config: SessionConfig,
	http_client: ApiHttpClient,
	store: Arc<dyn SessionStore>,
	navigator: Arc<dyn Navigator>,
	state_tx: watch::Sender<SessionSnapshot>,
	refresh_guard: AsyncMutex<RefreshCycle>,
	refresh_serial: AtomicU64,
	scheduler: RefreshScheduler,
	refresh_metrics: RefreshMetrics,
}

/// Single source of truth for "am I logged in, as whom, with what in-flight state".
///
/// The session owns the token store, the proactive refresh timer, and the single-flight refresh
/// guard; every token mutation funnels through `login`, `refresh`, or `logout`. Handles are
/// cheap to clone and share one inner state. A session must live inside a Tokio runtime, since
/// the refresh scheduler spawns timer tasks.
#[derive(Clone)]
pub struct Session {
	inner: Arc<SessionInner>,
}
impl Session {
	/// Creates a session with the built-in HTTP client (redirects off, timeout applied).
	pub fn new(
		config: SessionConfig,
		store: Arc<dyn SessionStore>,
		navigator: Arc<dyn Navigator>,
	) -> Result<Self> {
		let http_client = ApiHttpClient::with_timeout(config.request_timeout)?;

		Ok(Self::with_http_client(config, store, navigator, http_client))
	}

	/// Creates a session that reuses a caller-provided HTTP client.
	pub fn with_http_client(
		config: SessionConfig,
		store: Arc<dyn SessionStore>,
		navigator: Arc<dyn Navigator>,
		http_client: ApiHttpClient,
	) -> Self {
		let (state_tx, _) = watch::channel(SessionSnapshot::initial());

		Self {
			inner: Arc::new(SessionInner {
				config,
				http_client,
				store,
				navigator,
				state_tx,
				refresh_guard: AsyncMutex::new(RefreshCycle::default()),
				refresh_serial: AtomicU64::new(0),
				scheduler: RefreshScheduler::default(),
				refresh_metrics: RefreshMetrics::default(),
			}),
		}
	}

	pub(crate) fn from_inner(inner: Arc<SessionInner>) -> Self {
		Self { inner }
	}

	/// Returns the current session snapshot.
	pub fn snapshot(&self) -> SessionSnapshot {
		self.inner.state_tx.borrow().clone()
	}

	/// Subscribes to snapshot changes; every mutation publishes a new value.
	pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
		self.inner.state_tx.subscribe()
	}

	/// Returns the refresh flow counters.
	pub fn refresh_metrics(&self) -> &RefreshMetrics {
		&self.inner.refresh_metrics
	}

	/// Loads the persisted token pair and rebuilds identity state on application start.
	///
	/// A decodable stored access token populates the identity and arms the refresh timer from
	/// the stored expiry, which may already be in the past (the timer floor then triggers a
	/// near-immediate refresh). An undecodable token is discarded and the session starts logged
	/// out, and an unreadable store reads back as absent. Hydration always completes, so
	/// `is_loading` never outlives it.
	pub async fn hydrate(&self) -> Result<()> {
		// Unavailable storage means logged out, not stuck: gates must get past the checking
		// state even when the backend is broken.
		match self.inner.store.load().await.unwrap_or_default() {
			Some(pair) => match claims::decode(pair.access_token.expose()) {
				Ok(identity) => {
					self.send_modify(|state| {
						state.is_loading = false;
						state.identity = Some(identity.clone());
					});
					self.arm_refresh_timer(identity.expires_at);
				},
				Err(_) => {
					// Stale or foreign data in the store; discard it rather than crash.
					let _ = self.inner.store.clear().await;

					self.send_modify(|state| {
						state.is_loading = false;
						state.identity = None;
					});
				},
			},
			None => self.send_modify(|state| state.is_loading = false),
		}

		Ok(())
	}

	/// Exchanges credentials for a token pair at the token endpoint.
	///
	/// Login bypasses [`ApiClient`](crate::client::ApiClient): no prior token exists, and a 401
	/// here means "bad credentials", never "expired session". On rejection the server's
	/// `detail` is stored in `last_error` and the session state is otherwise unchanged.
	pub async fn login(&self, identifier: &str, secret: &str) -> Result<()> {
		const KIND: FlowKind = FlowKind::Login;

		let span = FlowSpan::new(KIND, "login");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.login_inner(identifier, secret)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn login_inner(&self, identifier: &str, secret: &str) -> Result<()> {
		self.send_modify(|state| {
			state.is_loading = true;
			state.last_error = None;
		});

		match self.exchange_credentials(identifier, secret).await {
			Ok(identity) => {
				self.send_modify(|state| {
					state.is_loading = false;
					state.identity = Some(identity.clone());
					state.last_error = None;
				});
				self.arm_refresh_timer(identity.expires_at);

				Ok(())
			},
			Err(err) => {
				let surfaced = match &err {
					Error::InvalidCredentials { detail } => detail.clone(),
					other => other.to_string(),
				};

				self.send_modify(|state| {
					state.is_loading = false;
					state.last_error = Some(surfaced);
				});

				Err(err)
			},
		}
	}

	async fn exchange_credentials(&self, identifier: &str, secret: &str) -> Result<Identity> {
		let url = self.inner.config.endpoint("auth/token")?;
		let response = self
			.inner
			.http_client
			.post(url)
			.form(&[("username", identifier), ("password", secret)])
			.send()
			.await?;
		let status = response.status();
		let bytes = response.bytes().await?;

		if !status.is_success() {
			return Err(Error::InvalidCredentials {
				detail: http::extract_detail(&bytes, "Invalid credentials"),
			});
		}

		let pair = parse_token_pair(&bytes, Some(status.as_u16()))?;
		// Decode before save so an undecodable response never populates the store.
		let identity = claims::decode(pair.access_token.expose())?;

		self.inner.store.save(pair).await?;

		Ok(identity)
	}

	/// Ends the session: cancels the refresh timer, clears the store and identity, and
	/// navigates to the login view.
	pub async fn logout(&self) {
		self.invalidate().await;
		self.inner.navigator.navigate(Route::Login);
	}

	/// Clears `last_error` without other side effects.
	pub fn clear_error(&self) {
		self.send_modify(|state| state.last_error = None);
	}

	/// Forced-logout primitive shared by logout, scheduler failures, and terminal request
	/// failures. Clears everything but performs no navigation; gates observing the published
	/// snapshot handle the redirect.
	pub(crate) async fn invalidate(&self) {
		self.inner.scheduler.cancel();

		let _ = self.inner.store.clear().await;

		self.send_modify(|state| {
			state.identity = None;
			state.last_error = None;
			state.is_loading = false;
		});
	}

	pub(crate) fn send_modify(&self, op: impl FnOnce(&mut SessionSnapshot)) {
		self.inner.state_tx.send_modify(op);
	}

	pub(crate) fn arm_refresh_timer(&self, expires_at: OffsetDateTime) {
		self.inner.scheduler.arm(
			Arc::downgrade(&self.inner),
			expires_at,
			self.inner.config.refresh_lead(),
			self.inner.config.min_refresh_delay(),
		);
	}

	pub(crate) fn config(&self) -> &SessionConfig {
		&self.inner.config
	}

	pub(crate) fn http_client(&self) -> &ApiHttpClient {
		&self.inner.http_client
	}

	pub(crate) fn store(&self) -> &dyn SessionStore {
		self.inner.store.as_ref()
	}

	pub(crate) fn navigator(&self) -> &dyn Navigator {
		self.inner.navigator.as_ref()
	}
}
impl Debug for Session {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Session")
			.field("api_base", &self.inner.config.api_base.as_str())
			.field("authenticated", &self.snapshot().is_authenticated())
			.finish()
	}
}

#[derive(Deserialize)]
struct TokenEndpointBody {
	access_token: String,
	refresh_token: String,
}

pub(crate) fn parse_token_pair(bytes: &[u8], status: Option<u16>) -> Result<TokenPair> {
	let mut deserializer = serde_json::Deserializer::from_slice(bytes);
	let body: TokenEndpointBody = serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| Error::ResponseParse { source, status })?;

	Ok(TokenPair::new(body.access_token, body.refresh_token))
}
