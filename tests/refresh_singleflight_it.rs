// crates.io
use httpmock::prelude::*;
// self
use bibliodex_session::{
	_preludet::*,
	auth::{Role, TokenPair},
	store::SessionStore,
};

fn access_token_expiring_in(minutes: i64) -> String {
	make_access_token(
		"12345",
		7,
		&Role::Client,
		OffsetDateTime::now_utc() + Duration::minutes(minutes),
	)
}

#[tokio::test]
async fn concurrent_refreshes_hit_the_endpoint_once() {
	let server = MockServer::start_async().await;
	let (session, store, _navigator) = build_test_session(&server.base_url());
	let rotated = access_token_expiring_in(120);
	let mock = server
		.mock_async({
			let body = serde_json::json!({
				"access_token": rotated.clone(),
				"refresh_token": "refresh-2",
			})
			.to_string();

			move |when, then| {
				when.method(POST).path("/auth/refresh_token").body_includes("refresh-1");
				then.status(200).header("content-type", "application/json").body(body);
			}
		})
		.await;

	store
		.save(TokenPair::new(access_token_expiring_in(60), "refresh-1"))
		.await
		.expect("Seeding the store should succeed.");
	session.hydrate().await.expect("Hydration of a seeded store should succeed.");

	let (first, second) = tokio::join!(session.refresh(), session.refresh());
	let first = first.expect("The first refresh should succeed.");
	let second = second.expect("The collapsed refresh should succeed.");

	mock.assert_calls_async(1).await;
	assert_eq!(first.access_token.expose(), rotated);
	assert_eq!(second.access_token.expose(), rotated);
	assert_eq!(session.refresh_metrics().attempts(), 2);
	assert_eq!(session.refresh_metrics().successes(), 2);
	assert_eq!(session.refresh_metrics().failures(), 0);
}

#[tokio::test]
async fn refresh_rotates_the_stored_pair_and_identity() {
	let server = MockServer::start_async().await;
	let (session, store, _navigator) = build_test_session(&server.base_url());
	let rotated = make_access_token(
		"12345",
		7,
		&Role::Staff,
		OffsetDateTime::now_utc() + Duration::hours(2),
	);
	let mock = server
		.mock_async({
			let body = serde_json::json!({
				"access_token": rotated.clone(),
				"refresh_token": "refresh-2",
			})
			.to_string();

			move |when, then| {
				when.method(POST).path("/auth/refresh_token");
				then.status(200).header("content-type", "application/json").body(body);
			}
		})
		.await;

	store
		.save(TokenPair::new(access_token_expiring_in(60), "refresh-1"))
		.await
		.expect("Seeding the store should succeed.");
	session.hydrate().await.expect("Hydration of a seeded store should succeed.");

	let pair = session.refresh().await.expect("Refresh should succeed.");

	mock.assert_async().await;
	assert_eq!(pair.access_token.expose(), rotated);
	assert_eq!(pair.refresh_token.expose(), "refresh-2");

	let stored = store
		.load()
		.await
		.expect("Store load should succeed after the refresh.")
		.expect("The rotated pair should be persisted.");

	assert_eq!(stored.access_token.expose(), rotated);
	assert_eq!(session.snapshot().role(), Some(&Role::Staff));
}

#[tokio::test]
async fn concurrent_refresh_failure_settles_once_for_all_callers() {
	let server = MockServer::start_async().await;
	let (session, store, _navigator) = build_test_session(&server.base_url());
	let seeded = access_token_expiring_in(60);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh_token");
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"detail\":\"Refresh token expired\"}");
		})
		.await;

	store
		.save(TokenPair::new(seeded.clone(), "refresh-1"))
		.await
		.expect("Seeding the store should succeed.");

	let (first, second) = tokio::join!(session.refresh(), session.refresh());
	let first = first.expect_err("The attempt that reached the endpoint should fail.");
	let second = second.expect_err("The queued caller should adopt the settled failure.");

	mock.assert_calls_async(1).await;
	assert!(matches!(
		&first,
		Error::Refresh { status: Some(400), detail } if detail == "Refresh token expired",
	));
	assert!(matches!(
		&second,
		Error::Refresh { status: Some(400), detail } if detail == "Refresh token expired",
	));
	assert_eq!(session.refresh_metrics().attempts(), 2);
	assert_eq!(session.refresh_metrics().failures(), 2);

	let stored = store
		.load()
		.await
		.expect("Store load should succeed.")
		.expect("A failed refresh must not clear the store.");

	assert_eq!(stored.access_token.expose(), seeded);
}

#[tokio::test]
async fn settled_cycle_does_not_leak_into_the_next() {
	let server = MockServer::start_async().await;
	let (session, store, _navigator) = build_test_session(&server.base_url());
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh_token");
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"detail\":\"Refresh token expired\"}");
		})
		.await;

	store
		.save(TokenPair::new(access_token_expiring_in(60), "refresh-1"))
		.await
		.expect("Seeding the store should succeed.");

	session.refresh().await.expect_err("The first cycle should fail.");
	// A caller arriving after settlement starts a fresh cycle and hits the endpoint again.
	session.refresh().await.expect_err("The second cycle should fail on its own call.");

	mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn refresh_without_a_stored_pair_fails_without_a_request() {
	let server = MockServer::start_async().await;
	let (session, _store, _navigator) = build_test_session(&server.base_url());
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh_token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"never-used\",\"refresh_token\":\"never-used\"}");
		})
		.await;

	let err = session.refresh().await.expect_err("Refresh without a token should fail.");

	mock.assert_calls_async(0).await;
	assert!(matches!(err, Error::NoRefreshToken));
	assert!(err.is_terminal());
}

#[tokio::test]
async fn rejected_refresh_leaves_the_stored_pair_untouched() {
	let server = MockServer::start_async().await;
	let (session, store, _navigator) = build_test_session(&server.base_url());
	let seeded = access_token_expiring_in(60);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh_token");
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"detail\":\"Refresh token expired\"}");
		})
		.await;

	store
		.save(TokenPair::new(seeded.clone(), "refresh-1"))
		.await
		.expect("Seeding the store should succeed.");

	let err = session.refresh().await.expect_err("A rejected refresh should fail.");

	mock.assert_async().await;
	assert!(matches!(
		&err,
		Error::Refresh { status: Some(400), detail } if detail == "Refresh token expired",
	));
	assert!(err.is_terminal());

	let stored = store
		.load()
		.await
		.expect("Store load should succeed after a rejected refresh.")
		.expect("A rejected refresh must not clear the store.");

	assert_eq!(stored.access_token.expose(), seeded);
	assert_eq!(session.refresh_metrics().failures(), 1);
}

#[tokio::test]
async fn malformed_refresh_response_is_a_parse_error() {
	let server = MockServer::start_async().await;
	let (session, store, _navigator) = build_test_session(&server.base_url());
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh_token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"only-half-a-pair\"}");
		})
		.await;

	store
		.save(TokenPair::new(access_token_expiring_in(60), "refresh-1"))
		.await
		.expect("Seeding the store should succeed.");

	let err = session.refresh().await.expect_err("A malformed response body should fail.");

	mock.assert_async().await;
	assert!(matches!(err, Error::ResponseParse { .. }));
	assert!(
		store.load().await.expect("Store load should succeed.").is_some(),
		"A malformed response must not clear the store.",
	);
}
