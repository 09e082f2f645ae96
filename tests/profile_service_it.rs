#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
use serde_json::{Value, json};
use time::format_description::well_known::Rfc3339;
// self
use xbl_profile_broker::{
	_preludet::*,
	auth::TokenChain,
	oauth::ReqwestTransportErrorMapper,
	obs::Stage,
	profile::{CACHED_DIAGNOSTIC, LookupError, NOT_FOUND_DIAGNOSTIC},
	store::{MemoryStore, ProfileCache, TOKEN_CHAIN_KEY, TokenStore},
};

const XUID: &str = "2533274792693551";

fn xbl_token_body(token: &str, claims: Value) -> String {
	let issued = OffsetDateTime::now_utc();

	json!({
		"IssueInstant": issued.format(&Rfc3339).expect("Issue instant should format."),
		"NotAfter": (issued + Duration::hours(16)).format(&Rfc3339).expect("Expiry should format."),
		"Token": token,
		"DisplayClaims": { "xui": [claims] },
	})
	.to_string()
}

fn profile_body(xuid: &str, gamertag: &str) -> String {
	json!({
		"profileUsers": [{
			"id": xuid,
			"hostId": xuid,
			"settings": [
				{ "id": "Gamertag", "value": gamertag },
				{ "id": "Gamerscore", "value": "1234" },
				{ "id": "PublicGamerpic", "value": "https://images.example/gamerpic.png" },
				{ "id": "XboxOneRep", "value": "GoodPlayer" },
				{ "id": "AccountTier", "value": "Gold" },
				{ "id": "Bio", "value": "" },
				{ "id": "Location", "value": "Redmond" },
			],
			"isSponsoredUser": false,
		}],
	})
	.to_string()
}

struct AuthMocks<'a> {
	authenticate: httpmock::Mock<'a>,
	authorize: httpmock::Mock<'a>,
}
impl AuthMocks<'_> {
	async fn assert_calls(&self, authenticate: usize, authorize: usize) {
		self.authenticate.assert_calls_async(authenticate).await;
		self.authorize.assert_calls_async(authorize).await;
	}
}

async fn mock_auth_stages(server: &MockServer) -> AuthMocks<'_> {
	let authenticate = server
		.mock_async(|when, then| {
			when.method(POST).path("/user/authenticate");
			then.status(200)
				.header("content-type", "application/json")
				.body(xbl_token_body("user-token", json!({ "uhs": "uhs-1" })));
		})
		.await;
	let authorize = server
		.mock_async(|when, then| {
			when.method(POST).path("/xsts/authorize");
			then.status(200).header("content-type", "application/json").body(xbl_token_body(
				"xsts-token",
				json!({ "gtg": "FixtureTag", "xid": "2535400000000000", "uhs": "uhs-1" }),
			));
		})
		.await;

	AuthMocks { authenticate, authorize }
}

async fn mock_profile<'a>(
	server: &'a MockServer,
	raw_key: &str,
	status: u16,
	body: String,
) -> httpmock::Mock<'a> {
	let path = format!("/users/{raw_key}/profile/settings");

	server
		.mock_async(move |when, then| {
			when.method(GET)
				.path(path)
				.query_param(
					"settings",
					"Gamerscore,Gamertag,PublicGamerpic,XboxOneRep,AccountTier,Bio,Location",
				)
				.header("authorization", "XBL3.0 x=uhs-1;xsts-token")
				.header("x-xbl-contract-version", "2");
			then.status(status).header("content-type", "application/json").body(body);
		})
		.await
}

#[tokio::test(flavor = "multi_thread")]
async fn first_lookup_runs_chain_then_serves_from_cache() {
	let server = MockServer::start_async().await;
	let auth = mock_auth_stages(&server).await;
	let profile =
		mock_profile(&server, &format!("xuid({XUID})"), 200, profile_body(XUID, "FixtureTag")).await;
	let (service, store) = build_reqwest_test_service(test_config(test_descriptor(&server.base_url())));
	let first = service.get_profile_by_xuid(XUID).await.expect("First lookup should succeed.");

	assert_eq!(first.diagnostic, "authenticate, authorize, fetch");

	let record = first.profile.clone().expect("Profile should be found.");

	assert_eq!(record.xuid, XUID);
	assert_eq!(record.attribute("gamertag"), Some("FixtureTag"));
	assert_eq!(record.attribute("gamerscore"), Some("1234"));
	assert_eq!(record.attribute("gamerpic"), Some("https://images.example/gamerpic.png"));
	assert_eq!(record.attribute("reputation"), Some("GoodPlayer"));
	assert_eq!(record.attribute("tier"), Some("Gold"));
	assert_eq!(record.attribute("bio"), Some(""));
	assert_eq!(record.attribute("location"), Some("Redmond"));

	let second = service.get_profile_by_xuid(XUID).await.expect("Second lookup should succeed.");

	assert_eq!(second.diagnostic, CACHED_DIAGNOSTIC);
	assert_eq!(second.profile, first.profile);

	auth.assert_calls(1, 1).await;
	profile.assert_calls_async(1).await;

	let persisted = TokenStore::get(store.as_ref(), TOKEN_CHAIN_KEY)
		.await
		.expect("Reading the token store should succeed.")
		.expect("The derived chain should be persisted.");
	let chain = TokenChain::from_json(&persisted).expect("Persisted chain should decode.");

	assert!(chain.is_authenticated());
	assert_eq!(service.metrics().cache_hits(), 1);
	assert_eq!(service.metrics().successes(Stage::Fetch), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn later_lookups_reuse_the_persisted_chain() {
	let server = MockServer::start_async().await;
	let auth = mock_auth_stages(&server).await;
	let _first =
		mock_profile(&server, &format!("xuid({XUID})"), 200, profile_body(XUID, "FixtureTag")).await;
	let by_gamertag =
		mock_profile(&server, "gt(OtherTag)", 200, profile_body("2533274792693552", "OtherTag"))
			.await;
	let (service, _store) =
		build_reqwest_test_service(test_config(test_descriptor(&server.base_url())));

	service.get_profile_by_xuid(XUID).await.expect("First lookup should succeed.");

	let second =
		service.get_profile_by_gamertag("OtherTag").await.expect("Gamertag lookup should succeed.");

	assert_eq!(second.diagnostic, "fetch");
	assert_eq!(
		second.profile.as_ref().and_then(|record| record.attribute("gamertag")),
		Some("OtherTag")
	);

	auth.assert_calls(1, 1).await;
	by_gamertag.assert_calls_async(1).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn not_found_is_cached_and_replayed() {
	let server = MockServer::start_async().await;
	let _auth = mock_auth_stages(&server).await;
	let profile = mock_profile(&server, "gt(Nobody)", 404, String::new()).await;
	let (service, _store) =
		build_reqwest_test_service(test_config(test_descriptor(&server.base_url())));
	let first = service.get_profile_by_gamertag("Nobody").await.expect("A 404 is not an error.");

	assert_eq!(first.profile, None);
	assert_eq!(first.diagnostic, NOT_FOUND_DIAGNOSTIC);

	let second = service.get_profile_by_gamertag("Nobody").await.expect("Replay should succeed.");

	assert_eq!(second.profile, None);
	assert_eq!(second.diagnostic, CACHED_DIAGNOSTIC);

	profile.assert_calls_async(1).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn profile_failures_surface_and_are_not_cached() {
	let server = MockServer::start_async().await;
	let _auth = mock_auth_stages(&server).await;
	let profile =
		mock_profile(&server, &format!("xuid({XUID})"), 500, r#"{"code":"boom"}"#.into()).await;
	let (service, _store) =
		build_reqwest_test_service(test_config(test_descriptor(&server.base_url())));

	for _ in 0..2 {
		let err = service.get_profile_by_xuid(XUID).await.expect_err("A 500 must be an error.");

		match err {
			Error::UpstreamProfile { status, body } => {
				assert_eq!(status, 500);
				assert!(body.contains("boom"));
			},
			other => panic!("Unexpected error variant: {other:?}."),
		}
	}

	profile.assert_calls_async(2).await;

	assert_eq!(service.metrics().failures(Stage::Fetch), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_keys_never_reach_the_network() {
	let server = MockServer::start_async().await;
	let auth = mock_auth_stages(&server).await;
	let (service, store) = build_reqwest_test_service(test_config(test_descriptor(&server.base_url())));

	for (result, expected) in [
		(service.get_profile_by_xuid("").await, LookupError::EmptyXuid),
		(
			service.get_profile_by_xuid("12ab").await,
			LookupError::NonNumericXuid { value: "12ab".into() },
		),
		(service.get_profile_by_gamertag("").await, LookupError::EmptyGamertag),
		(
			service.get_profile_by_gamertag("bad(tag").await,
			LookupError::ReservedCharacter { value: "bad(tag".into() },
		),
		(
			service.get_profile_by_gamertag("ThisGamertagIsFarTooLong").await,
			LookupError::GamertagTooLong { length: 24, max: 16 },
		),
	] {
		match result {
			Err(Error::InvalidLookup(err)) => assert_eq!(err, expected),
			other => panic!("Expected a lookup rejection, got {other:?}."),
		}
	}

	auth.assert_calls(0, 0).await;

	assert!(store.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn lookups_without_a_cache_always_go_live() {
	let server = MockServer::start_async().await;
	let auth = mock_auth_stages(&server).await;
	let profile =
		mock_profile(&server, &format!("xuid({XUID})"), 200, profile_body(XUID, "FixtureTag")).await;
	let store = Arc::new(MemoryStore::default());
	let service = ReqwestTestService::with_http_client(
		test_config(test_descriptor(&server.base_url())),
		test_reqwest_http_client(),
		ReqwestTransportErrorMapper,
	)
	.with_token_store(store.clone());
	let first = service.get_profile_by_xuid(XUID).await.expect("First lookup should succeed.");
	let second = service.get_profile_by_xuid(XUID).await.expect("Second lookup should succeed.");

	assert_eq!(first.diagnostic, "authenticate, authorize, fetch");
	assert_eq!(second.diagnostic, "fetch");
	assert_eq!(first.profile, second.profile);

	auth.assert_calls(1, 1).await;
	profile.assert_calls_async(2).await;

	assert_eq!(store.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn undecodable_cache_entries_are_treated_as_misses() {
	let server = MockServer::start_async().await;
	let auth = mock_auth_stages(&server).await;
	let raw_key = format!("xuid({XUID})");
	let profile = mock_profile(&server, &raw_key, 200, profile_body(XUID, "FixtureTag")).await;
	let (service, store) = build_reqwest_test_service(test_config(test_descriptor(&server.base_url())));

	TokenStore::put(store.as_ref(), TOKEN_CHAIN_KEY, "not a chain".into())
		.await
		.expect("Seeding the token store should succeed.");
	ProfileCache::put(store.as_ref(), &raw_key, "not a profile".into(), Duration::minutes(5))
		.await
		.expect("Seeding the profile cache should succeed.");

	let result = service.get_profile_by_xuid(XUID).await.expect("Lookup should recover.");

	assert_eq!(result.diagnostic, "authenticate, authorize, fetch");
	assert!(result.profile.is_some());

	auth.assert_calls(1, 1).await;
	profile.assert_calls_async(1).await;

	let persisted = TokenStore::get(store.as_ref(), TOKEN_CHAIN_KEY)
		.await
		.expect("Reading the token store should succeed.")
		.expect("The re-derived chain should replace the corrupt value.");

	assert!(TokenChain::from_json(&persisted).is_ok());
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_lookups_race_to_a_complete_chain() {
	let server = MockServer::start_async().await;
	let auth = mock_auth_stages(&server).await;
	let _first =
		mock_profile(&server, &format!("xuid({XUID})"), 200, profile_body(XUID, "FixtureTag")).await;
	let _second = mock_profile(&server, "gt(OtherTag)", 200, profile_body("2533274792693552", "OtherTag"))
		.await;
	let (service, store) = build_reqwest_test_service(test_config(test_descriptor(&server.base_url())));
	let (by_xuid, by_gamertag) = tokio::join!(
		service.get_profile_by_xuid(XUID),
		service.get_profile_by_gamertag("OtherTag")
	);

	by_xuid.expect("XUID lookup should succeed.");
	by_gamertag.expect("Gamertag lookup should succeed.");

	// Both lookups load the empty store before either writes back.
	auth.assert_calls(2, 2).await;

	let persisted = TokenStore::get(store.as_ref(), TOKEN_CHAIN_KEY)
		.await
		.expect("Reading the token store should succeed.")
		.expect("One of the racing chains should be persisted.");
	let chain = TokenChain::from_json(&persisted).expect("Persisted chain should decode.");

	assert!(chain.is_authenticated());
}

#[tokio::test(flavor = "multi_thread")]
async fn one_resolver_authenticates_once_across_lookups() {
	let server = MockServer::start_async().await;
	let auth = mock_auth_stages(&server).await;
	let by_xuid =
		mock_profile(&server, &format!("xuid({XUID})"), 200, profile_body(XUID, "FixtureTag")).await;
	let by_gamertag =
		mock_profile(&server, "gt(FixtureTag)", 200, profile_body(XUID, "FixtureTag")).await;
	let (service, store) =
		build_reqwest_test_service(test_config(test_descriptor(&server.base_url())));
	let mut resolver = service.resolver().await.expect("Resolver should build.");

	assert!(!resolver.manager().chain().is_authenticated());

	let first = resolver
		.get_profile_by_gamertag("FixtureTag")
		.await
		.expect("Gamertag lookup should succeed.");

	assert_eq!(first.diagnostic, "authenticate, authorize, fetch");
	assert!(resolver.manager().chain().is_authenticated());

	let replay =
		resolver.get_profile_by_gamertag("FixtureTag").await.expect("Replay should succeed.");

	assert_eq!(replay.diagnostic, CACHED_DIAGNOSTIC);
	assert_eq!(replay.profile, first.profile);

	let by_id = resolver.get_profile_by_xuid(XUID).await.expect("XUID lookup should succeed.");

	assert_eq!(by_id.diagnostic, "fetch");
	assert_eq!(by_id.profile, first.profile);

	auth.assert_calls(1, 1).await;
	by_gamertag.assert_calls_async(1).await;
	by_xuid.assert_calls_async(1).await;

	let chain = resolver.into_manager().into_chain();
	let persisted = TokenStore::get(store.as_ref(), TOKEN_CHAIN_KEY)
		.await
		.expect("Reading the chain should succeed.")
		.expect("The chain should be persisted.");

	assert_eq!(TokenChain::from_json(&persisted).expect("Persisted chain should decode."), chain);
}
