//! Thread-safe in-memory [`SessionStore`] for tests and headless tooling.

// self
use crate::{
	_prelude::*,
	auth::TokenPair,
	store::{SessionStore, StoreFuture},
};

type StoreSlot = Arc<RwLock<Option<TokenPair>>>;

/// Keeps the token pair in-process; nothing survives a restart.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreSlot);
impl SessionStore for MemoryStore {
	fn load(&self) -> StoreFuture<'_, Option<TokenPair>> {
		let slot = self.0.clone();

		Box::pin(async move { Ok(slot.read().clone()) })
	}

	fn save(&self, pair: TokenPair) -> StoreFuture<'_, ()> {
		let slot = self.0.clone();

		Box::pin(async move {
			*slot.write() = Some(pair);

			Ok(())
		})
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		let slot = self.0.clone();

		Box::pin(async move {
			*slot.write() = None;

			Ok(())
		})
	}
}
