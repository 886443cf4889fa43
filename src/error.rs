//! Session-level error types shared across the auth, request, and gate layers.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical session error exposed by public APIs.
///
/// Authentication-layer variants ([`Error::MalformedToken`], [`Error::NoRefreshToken`],
/// [`Error::Refresh`]) are resolved inside the crate; callers of
/// [`ApiClient`](crate::client::ApiClient) observe them only as a cleared session plus a login
/// redirect. Domain variants ([`Error::Api`], [`Error::Network`]) propagate to the calling view
/// untouched.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Stored or received access token could not be decoded.
	#[error(transparent)]
	MalformedToken(#[from] crate::auth::TokenDecodeError),

	/// Login rejected by the server; the user may retry with new credentials.
	#[error("Login was rejected: {detail}.")]
	InvalidCredentials {
		/// Server-supplied rejection detail, surfaced inline to the user.
		detail: String,
	},
	/// No refresh token is stored, so a refresh cannot be attempted.
	#[error("No refresh token is available for this session.")]
	NoRefreshToken,
	/// Refresh endpoint rejected or failed the rotation.
	#[error("Token refresh failed: {detail}.")]
	Refresh {
		/// HTTP status code, when the endpoint responded at all.
		status: Option<u16>,
		/// Server- or session-supplied reason string.
		detail: String,
	},
	/// Non-auth HTTP failure from a domain call; session state is untouched.
	#[error("API call failed with status {status}: {detail}.")]
	Api {
		/// HTTP status code returned by the server.
		status: u16,
		/// Detail string extracted from the response body, when present.
		detail: String,
	},
	/// Transport-level failure with no HTTP response.
	#[error("Network error occurred while calling the API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Request body could not be serialized to JSON; nothing was sent.
	#[error("Request body could not be serialized to JSON.")]
	RequestSerialize {
		/// Underlying serialization failure.
		#[source]
		source: serde_json::Error,
	},
	/// Response body was not the JSON shape the endpoint promises.
	#[error("API returned malformed JSON.")]
	ResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Request path could not be joined onto the API base URL.
	#[error("Request path could not be resolved against the API base.")]
	InvalidPath {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
}
impl Error {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Returns `true` for variants that end the session (forced logout on the caller's side).
	pub fn is_terminal(&self) -> bool {
		matches!(self, Self::MalformedToken(_) | Self::NoRefreshToken | Self::Refresh { .. })
	}
}
impl From<ReqwestError> for Error {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
