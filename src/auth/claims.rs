//! Access token claims codec.
//!
//! The codec reads the self-describing JWT payload without verifying the signature: trust is
//! established by the server on every request, and the client only needs the claims to render
//! identity state and schedule the proactive refresh. Decoded claims must never stand in for an
//! authorization decision the server makes itself.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::{
	_prelude::*,
	auth::identity::{Identity, Role},
};

/// Error returned when an access token cannot be decoded.
#[derive(Debug, ThisError)]
pub enum TokenDecodeError {
	/// Token is not three dot-separated segments.
	#[error("Access token is not a three-segment JWT.")]
	MalformedStructure,
	/// Payload segment is not valid base64url.
	#[error("Access token payload is not valid base64url.")]
	PayloadEncoding(#[from] base64::DecodeError),
	/// Payload decoded but is not the expected claims JSON.
	#[error("Access token payload is not valid claims JSON.")]
	PayloadParse(#[source] serde_path_to_error::Error<serde_json::Error>),
	/// `exp` claim is outside the representable timestamp range.
	#[error("Access token expiry is out of range.")]
	TimestampOutOfRange,
}

#[derive(Deserialize)]
struct Claims {
	sub: String,
	user_id: i64,
	role: String,
	nome: Option<String>,
	exp: i64,
}

/// Decodes the claims of a Bibliodex access token into an [`Identity`].
///
/// Decoding is pure: the same token always yields the same identity, and malformed input always
/// yields a [`TokenDecodeError`] rather than a panic.
pub fn decode(token: &str) -> Result<Identity, TokenDecodeError> {
	let mut segments = token.split('.');
	let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
		(Some(_), Some(payload), Some(_), None) => payload,
		_ => return Err(TokenDecodeError::MalformedStructure),
	};
	let bytes = URL_SAFE_NO_PAD.decode(payload)?;
	let mut deserializer = serde_json::Deserializer::from_slice(&bytes);
	let claims: Claims = serde_path_to_error::deserialize(&mut deserializer)
		.map_err(TokenDecodeError::PayloadParse)?;
	let expires_at = OffsetDateTime::from_unix_timestamp(claims.exp)
		.map_err(|_| TokenDecodeError::TimestampOutOfRange)?;

	Ok(Identity {
		subject: claims.sub,
		user_id: claims.user_id,
		role: Role::from(claims.role),
		display_name: claims.nome,
		expires_at,
	})
}
