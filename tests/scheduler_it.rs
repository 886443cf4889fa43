// crates.io
use httpmock::prelude::*;
// self
use bibliodex_session::{
	_preludet::*,
	auth::{Role, TokenPair},
	session::SessionConfig,
	store::SessionStore,
};

fn short_fuse_config(api_base: &str) -> SessionConfig {
	SessionConfig::new(Url::parse(api_base).expect("Mock server URL should parse."))
		.with_refresh_lead(Duration::seconds(60))
		.with_min_refresh_delay(Duration::milliseconds(100))
}

#[tokio::test]
async fn scheduled_refresh_fires_and_rearms_from_the_new_expiry() {
	let server = MockServer::start_async().await;
	let (session, store, _navigator) =
		build_test_session_with_config(short_fuse_config(&server.base_url()));
	// Both expiries sit inside the lead window, so each refresh schedules at the floor.
	let second = make_access_token(
		"12345",
		7,
		&Role::Client,
		OffsetDateTime::now_utc() + Duration::seconds(30),
	);
	let third = make_access_token(
		"12345",
		7,
		&Role::Client,
		OffsetDateTime::now_utc() + Duration::hours(1),
	);
	let first_fire = server
		.mock_async({
			let body = serde_json::json!({
				"access_token": second.clone(),
				"refresh_token": "refresh-2",
			})
			.to_string();

			move |when, then| {
				when.method(POST).path("/auth/refresh_token").body_includes("refresh-1");
				then.status(200).header("content-type", "application/json").body(body);
			}
		})
		.await;
	let second_fire = server
		.mock_async({
			let body = serde_json::json!({
				"access_token": third.clone(),
				"refresh_token": "refresh-3",
			})
			.to_string();

			move |when, then| {
				when.method(POST).path("/auth/refresh_token").body_includes("refresh-2");
				then.status(200).header("content-type", "application/json").body(body);
			}
		})
		.await;

	store
		.save(TokenPair::new(
			make_access_token(
				"12345",
				7,
				&Role::Client,
				OffsetDateTime::now_utc() + Duration::seconds(30),
			),
			"refresh-1",
		))
		.await
		.expect("Seeding the store should succeed.");
	session.hydrate().await.expect("Hydration of a seeded store should succeed.");

	tokio::time::sleep(std::time::Duration::from_millis(900)).await;

	first_fire.assert_async().await;
	second_fire.assert_async().await;

	let stored = store
		.load()
		.await
		.expect("Store load should succeed after the scheduled refreshes.")
		.expect("The latest pair should be persisted.");

	assert_eq!(stored.access_token.expose(), third);
	assert_eq!(stored.refresh_token.expose(), "refresh-3");
	assert!(session.snapshot().is_authenticated());
}

#[tokio::test]
async fn failed_scheduled_refresh_ends_the_session() {
	let server = MockServer::start_async().await;
	let (session, store, navigator) =
		build_test_session_with_config(short_fuse_config(&server.base_url()));
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh_token");
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"detail\":\"Refresh token expired\"}");
		})
		.await;

	store
		.save(TokenPair::new(
			make_access_token(
				"12345",
				7,
				&Role::Client,
				OffsetDateTime::now_utc() + Duration::seconds(30),
			),
			"refresh-1",
		))
		.await
		.expect("Seeding the store should succeed.");
	session.hydrate().await.expect("Hydration of a seeded store should succeed.");
	assert!(session.snapshot().is_authenticated());

	tokio::time::sleep(std::time::Duration::from_millis(600)).await;

	mock.assert_async().await;

	let snapshot = session.snapshot();

	assert!(!snapshot.is_authenticated());
	assert_eq!(store.load().await.expect("Store load should succeed."), None);
	// The timer ends the session quietly; redirects stay with the request path and the gate.
	assert!(navigator.visits().is_empty());
}

#[tokio::test]
async fn dropping_the_session_disarms_the_timer() {
	let server = MockServer::start_async().await;
	let (session, store, _navigator) =
		build_test_session_with_config(short_fuse_config(&server.base_url()));
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh_token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"never-used\",\"refresh_token\":\"never-used\"}");
		})
		.await;

	store
		.save(TokenPair::new(
			make_access_token(
				"12345",
				7,
				&Role::Client,
				OffsetDateTime::now_utc() + Duration::seconds(30),
			),
			"refresh-1",
		))
		.await
		.expect("Seeding the store should succeed.");
	session.hydrate().await.expect("Hydration of a seeded store should succeed.");

	drop(session);
	tokio::time::sleep(std::time::Duration::from_millis(600)).await;

	// The timer holds a weak handle; with the session gone it fires into nothing.
	mock.assert_calls_async(0).await;
}
