//! Xbox Live profile lookups backed by a self-healing refresh → user → XSTS token chain,
//! persistent session stores, and a short-TTL profile cache.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod error;
pub mod flows;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod profile;
pub mod provider;
pub mod service;
pub mod store;
#[cfg(feature = "reqwest")]
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::{Identity, Token, TokenChain, XstsSession},
		config::BrokerConfig,
		flows::TokenChainManager,
		http::ReqwestHttpClient,
		oauth::ReqwestTransportErrorMapper,
		provider::ProviderDescriptor,
		service::ProfileService,
		store::{MemoryStore, ProfileCache, TokenStore},
	};

	/// Client identifier used by test configurations.
	pub const TEST_CLIENT_ID: &str = "client-xbl";
	/// Client secret used by test configurations.
	pub const TEST_CLIENT_SECRET: &str = "secret-xbl";

	/// Manager type alias used by reqwest-backed integration tests.
	pub type ReqwestTestManager = TokenChainManager<ReqwestHttpClient, ReqwestTransportErrorMapper>;
	/// Service type alias used by reqwest-backed integration tests.
	pub type ReqwestTestService = ProfileService<ReqwestHttpClient, ReqwestTransportErrorMapper>;

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Points every provider endpoint at paths under the given mock server base URL.
	pub fn test_descriptor(base: &str) -> ProviderDescriptor {
		let endpoint = |path: &str| {
			Url::parse(&format!("{}{path}", base.trim_end_matches('/')))
				.expect("Mock endpoint should parse successfully.")
		};

		ProviderDescriptor::builder()
			.token_endpoint(endpoint("/oauth20_token.srf"))
			.user_authenticate_endpoint(endpoint("/user/authenticate"))
			.xsts_authorize_endpoint(endpoint("/xsts/authorize"))
			.profile_endpoint(endpoint("/"))
			.build()
			.expect("Test provider descriptor should build successfully.")
	}

	/// Builds a configuration with bootstrap credentials against the provided descriptor.
	pub fn test_config(descriptor: ProviderDescriptor) -> BrokerConfig {
		BrokerConfig::builder()
			.client_id(TEST_CLIENT_ID)
			.client_secret(TEST_CLIENT_SECRET)
			.bootstrap_refresh_token("bootstrap-refresh")
			.bootstrap_access_token("bootstrap-access")
			.descriptor(descriptor)
			.build()
			.expect("Test configuration should build successfully.")
	}

	/// Creates a token issued five minutes ago that expires after `lifetime` from issuance.
	pub fn fixture_token(secret: &str, lifetime: Duration) -> Token {
		let issued = OffsetDateTime::now_utc() - Duration::minutes(5);

		Token::new(secret, issued, issued + lifetime)
	}

	/// Builds a chain whose tiers expire according to the supplied lifetimes.
	///
	/// Passing `None` for `session` yields an unauthenticated chain.
	pub fn fixture_chain(access: Duration, session: Option<(Duration, Duration)>) -> TokenChain {
		let refresh_token = fixture_token("fixture-refresh", Duration::days(30));
		let access_token = fixture_token("fixture-access", access);
		let chain = TokenChain::new(refresh_token, access_token);

		match session {
			Some((user, xsts)) => chain.with_session(XstsSession {
				user_token: fixture_token("fixture-user", user),
				xsts_token: fixture_token("fixture-xsts", xsts),
				identity: Identity::new("2535400000000000", "FixtureTag", "fixture-uhs"),
			}),
			None => chain,
		}
	}

	/// Constructs a [`TokenChainManager`] backed by the insecure test transport.
	pub fn build_reqwest_test_manager(
		config: &BrokerConfig,
		persisted: Option<TokenChain>,
	) -> ReqwestTestManager {
		ReqwestTestManager::with_http_client(
			config,
			persisted,
			test_reqwest_http_client(),
			ReqwestTransportErrorMapper,
		)
		.expect("Test manager should be constructible from the test configuration.")
	}

	/// Constructs a [`ProfileService`] with a shared in-memory store acting as both the token
	/// store and the profile cache.
	pub fn build_reqwest_test_service(config: BrokerConfig) -> (ReqwestTestService, Arc<MemoryStore>) {
		let store = Arc::new(MemoryStore::default());
		let token_store: Arc<dyn TokenStore> = store.clone();
		let profile_cache: Arc<dyn ProfileCache> = store.clone();
		let service = ReqwestTestService::with_http_client(
			config,
			test_reqwest_http_client(),
			ReqwestTransportErrorMapper,
		)
		.with_token_store(token_store)
		.with_profile_cache(profile_cache);

		(service, store)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
