//! Storage contracts and built-in stores for the persisted token pair.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{_prelude::*, auth::TokenPair};

/// Fixed, versioned storage key for the access token.
pub const ACCESS_TOKEN_KEY: &str = "bibliodex_access_token";
/// Fixed, versioned storage key for the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "bibliodex_refresh_token";

/// Boxed future returned by [`SessionStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Persistence contract for the session's token pair.
///
/// The store is the single mutable shared resource of the crate: it is written only by a
/// successful login, a successful refresh, or logout. Loads are snapshot reads and never fail;
/// an unavailable or partially populated backend reads back as absent, which the session treats
/// as logged out.
pub trait SessionStore
where
	Self: Send + Sync,
{
	/// Returns the stored pair, or `None` when either secret is absent.
	fn load(&self) -> StoreFuture<'_, Option<TokenPair>>;

	/// Persists both secrets together, replacing any previous pair.
	fn save(&self, pair: TokenPair) -> StoreFuture<'_, ()>;

	/// Removes both secrets.
	fn clear(&self) -> StoreFuture<'_, ()>;
}

/// Error type produced by [`SessionStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
