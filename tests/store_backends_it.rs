#![cfg(feature = "reqwest")]

// std
use std::{
	env, fs,
	path::{Path, PathBuf},
	process,
};
// crates.io
use httpmock::prelude::*;
use serde_json::{Value, json};
use time::format_description::well_known::Rfc3339;
// self
use xbl_profile_broker::{
	_preludet::*,
	auth::TokenChain,
	oauth::ReqwestTransportErrorMapper,
	store::{FileStore, MemoryStore, ProfileCache, TOKEN_CHAIN_KEY, TokenStore},
};

const XUID: &str = "2533274792693551";

fn temp_path(tag: &str) -> PathBuf {
	env::temp_dir().join(format!(
		"xbl_profile_broker_it_{tag}_{}_{}",
		process::id(),
		OffsetDateTime::now_utc().unix_timestamp_nanos(),
	))
}

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

fn file_backed_service(server: &MockServer, path: &Path) -> ReqwestTestService {
	let store: Arc<dyn TokenStore> =
		Arc::new(FileStore::open(path).expect("File store should open."));

	ReqwestTestService::with_http_client(
		test_config(test_descriptor(&server.base_url())),
		test_reqwest_http_client(),
		ReqwestTransportErrorMapper,
	)
	.with_token_store(store)
}

#[tokio::test(flavor = "multi_thread")]
async fn file_store_keeps_the_chain_across_restarts() {
	let server = MockServer::start_async().await;
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
	let profile = server
		.mock_async(|when, then| {
			when.method(GET).path(format!("/users/xuid({XUID})/profile/settings"));
			then.status(200).header("content-type", "application/json").body(
				json!({
					"profileUsers": [{
						"id": XUID,
						"settings": [{ "id": "Gamertag", "value": "FixtureTag" }],
					}],
				})
				.to_string(),
			);
		})
		.await;
	let dir = temp_path("restart");
	let path = dir.join("chain.json");
	let first = file_backed_service(&server, &path)
		.get_profile_by_xuid(XUID)
		.await
		.expect("First process should authenticate and fetch.");

	assert_eq!(first.diagnostic, "authenticate, authorize, fetch");
	assert!(path.exists());

	let restarted = file_backed_service(&server, &path)
		.get_profile_by_xuid(XUID)
		.await
		.expect("Restarted process should reuse the persisted chain.");

	assert_eq!(restarted.diagnostic, "fetch");
	assert_eq!(restarted.profile, first.profile);

	authenticate.assert_calls_async(1).await;
	authorize.assert_calls_async(1).await;
	profile.assert_calls_async(2).await;

	let reopened = FileStore::open(&path).expect("Snapshot should reopen.");
	let payload = TokenStore::get(&reopened, TOKEN_CHAIN_KEY)
		.await
		.expect("Reading the snapshot should succeed.")
		.expect("Snapshot should hold the chain.");

	assert!(TokenChain::from_json(&payload).expect("Persisted chain should decode.").is_authenticated());

	fs::remove_dir_all(&dir).expect("Failed to remove temporary store directory.");
}

#[tokio::test]
async fn memory_store_clones_share_entries() {
	let store = MemoryStore::default();
	let clone = store.clone();

	TokenStore::put(&store, TOKEN_CHAIN_KEY, "{}".into())
		.await
		.expect("Token put should succeed.");
	ProfileCache::put(&clone, "gt(FixtureTag)", "null".into(), Duration::hours(1))
		.await
		.expect("Cache put should succeed.");

	assert_eq!(
		TokenStore::get(&clone, TOKEN_CHAIN_KEY).await.expect("Token get should succeed."),
		Some("{}".into())
	);
	assert_eq!(
		ProfileCache::get(&store, "gt(FixtureTag)").await.expect("Cache get should succeed."),
		Some("null".into())
	);
	assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn memory_store_last_writer_wins() {
	let store = Arc::new(MemoryStore::default());
	let writers = (0..8).map(|i| {
		let store = store.clone();

		tokio::spawn(async move {
			TokenStore::put(store.as_ref(), TOKEN_CHAIN_KEY, format!("chain-{i}")).await
		})
	});

	for writer in writers.collect::<Vec<_>>() {
		writer.await.expect("Writer task should not panic.").expect("Put should succeed.");
	}

	let value = TokenStore::get(store.as_ref(), TOKEN_CHAIN_KEY)
		.await
		.expect("Get should succeed.")
		.expect("One writer should win.");

	assert!(value.starts_with("chain-"));
	assert_eq!(store.len(), 1);
}
