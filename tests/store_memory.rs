// self
use bibliodex_session::{
	auth::TokenPair,
	store::{MemoryStore, SessionStore},
};

#[tokio::test]
async fn starts_empty() {
	let store = MemoryStore::default();

	assert_eq!(store.load().await.expect("Load on an empty store should succeed."), None);
}

#[tokio::test]
async fn save_then_load_round_trips() {
	let store = MemoryStore::default();

	store
		.save(TokenPair::new("access-1", "refresh-1"))
		.await
		.expect("Save should succeed.");

	let pair = store
		.load()
		.await
		.expect("Load should succeed.")
		.expect("A saved pair should be readable.");

	assert_eq!(pair.access_token.expose(), "access-1");
	assert_eq!(pair.refresh_token.expose(), "refresh-1");
}

#[tokio::test]
async fn save_overwrites_the_previous_pair() {
	let store = MemoryStore::default();

	store
		.save(TokenPair::new("access-1", "refresh-1"))
		.await
		.expect("First save should succeed.");
	store
		.save(TokenPair::new("access-2", "refresh-2"))
		.await
		.expect("Second save should succeed.");

	let pair = store
		.load()
		.await
		.expect("Load should succeed.")
		.expect("The overwritten pair should be readable.");

	assert_eq!(pair.access_token.expose(), "access-2");
}

#[tokio::test]
async fn clear_removes_the_pair() {
	let store = MemoryStore::default();

	store
		.save(TokenPair::new("access-1", "refresh-1"))
		.await
		.expect("Save should succeed.");
	store.clear().await.expect("Clear should succeed.");

	assert_eq!(store.load().await.expect("Load should succeed."), None);
}
