//! Transport primitives for session and domain API calls.

// std
use std::ops::Deref;
// self
use crate::_prelude::*;

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Session endpoints should not follow redirects and must resolve hung calls in bounded time,
/// so [`ApiHttpClient::with_timeout`] builds a client with both policies applied. A custom
/// [`ReqwestClient`] passed through [`ApiHttpClient::with_client`] should be configured the
/// same way.
#[derive(Clone, Debug, Default)]
pub struct ApiHttpClient(pub ReqwestClient);
impl ApiHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client with redirects disabled and the provided per-request timeout.
	pub fn with_timeout(timeout: std::time::Duration) -> Result<Self> {
		let client = ReqwestClient::builder()
			.redirect(reqwest::redirect::Policy::none())
			.timeout(timeout)
			.build()?;

		Ok(Self(client))
	}
}
impl AsRef<ReqwestClient> for ApiHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
impl Deref for ApiHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

/// Extracts the `detail` (or `message`) string from an API error body.
///
/// The Bibliodex API reports failures as JSON `{"detail": ...}`; a few legacy endpoints use
/// `message`. Anything else falls back to a generic description.
pub(crate) fn extract_detail(body: &[u8], fallback: &str) -> String {
	let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) else {
		return fallback.to_owned();
	};

	value
		.get("detail")
		.or_else(|| value.get("message"))
		.and_then(serde_json::Value::as_str)
		.map(str::to_owned)
		.unwrap_or_else(|| fallback.to_owned())
}
