//! Decoded identity and the role taxonomy carried inside access tokens.

// self
use crate::_prelude::*;

/// Role claim values minted by the Bibliodex API.
///
/// Decoded roles drive navigation and route gating only; the server re-checks permissions on
/// every call, so an unknown value is preserved rather than rejected.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
	/// Library patron account.
	Client,
	/// Library staff account.
	Staff,
	/// Role string this crate does not recognize; kept verbatim for gating comparisons.
	Other(String),
}
impl Role {
	/// Returns the wire representation of the role.
	pub fn as_str(&self) -> &str {
		match self {
			Self::Client => "client_user",
			Self::Staff => "staff",
			Self::Other(value) => value,
		}
	}
}
impl From<String> for Role {
	fn from(value: String) -> Self {
		match value.as_str() {
			"client_user" => Self::Client,
			"staff" => Self::Staff,
			_ => Self::Other(value),
		}
	}
}
impl From<&str> for Role {
	fn from(value: &str) -> Self {
		Self::from(value.to_owned())
	}
}
impl From<Role> for String {
	fn from(value: Role) -> Self {
		value.as_str().to_owned()
	}
}
impl Display for Role {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Client-side view of the access token's claims.
///
/// An identity is always a pure function of the current access token: it is rebuilt whenever the
/// token changes and destroyed when the token is cleared or fails to decode. It is never
/// persisted on its own.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
	/// Login identifier (the `sub` claim, a registration number).
	pub subject: String,
	/// Numeric account id.
	pub user_id: i64,
	/// Role used for route gating and navigation.
	pub role: Role,
	/// Optional display name for the UI.
	pub display_name: Option<String>,
	/// Instant at which the access token expires.
	pub expires_at: OffsetDateTime,
}
impl Identity {
	/// Returns `true` if the token behind this identity has expired at `instant`.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}
}
