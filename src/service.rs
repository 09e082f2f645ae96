//! Per-request wiring of configuration, transport, stores, and metrics.
//!
//! The service never holds a token chain itself. Every lookup loads the persisted chain from
//! the token store, builds a fresh [`TokenChainManager`], and lets it write back whatever it
//! derives. Concurrent lookups may each re-derive the chain; the last write wins.

// self
use crate::{
	_prelude::*,
	auth::TokenChain,
	config::BrokerConfig,
	flows::TokenChainManager,
	http::TokenHttpClient,
	oauth::TransportErrorMapper,
	obs::{self, StageMetrics},
	profile::{LookupKey, LookupResult, ProfileResolver},
	store::{ProfileCache, TOKEN_CHAIN_KEY, TokenStore},
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};

#[cfg(feature = "reqwest")]
/// Service specialized for the crate's default reqwest transport stack.
pub type ReqwestProfileService = ProfileService<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Entry point for profile lookups.
pub struct ProfileService<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	config: Arc<BrokerConfig>,
	http_client: Arc<C>,
	transport_mapper: Arc<M>,
	token_store: Option<Arc<dyn TokenStore>>,
	profile_cache: Option<Arc<dyn ProfileCache>>,
	metrics: Arc<StageMetrics>,
}
impl<C, M> ProfileService<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a service that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		config: BrokerConfig,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			config: Arc::new(config),
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			token_store: None,
			profile_cache: None,
			metrics: Default::default(),
		}
	}

	/// Loads and persists the token chain through `store`.
	pub fn with_token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
		self.token_store = Some(store);

		self
	}

	/// Caches lookup results in `cache`.
	pub fn with_profile_cache(mut self, cache: Arc<dyn ProfileCache>) -> Self {
		self.profile_cache = Some(cache);

		self
	}

	/// Returns the configuration shared by every lookup.
	pub fn config(&self) -> &BrokerConfig {
		&self.config
	}

	/// Returns the stage counters shared by every lookup.
	pub fn metrics(&self) -> &Arc<StageMetrics> {
		&self.metrics
	}

	/// Reads the persisted chain, discarding values that no longer decode.
	pub async fn load_chain(&self) -> Result<Option<TokenChain>> {
		let Some(store) = &self.token_store else {
			return Ok(None);
		};
		let Some(payload) = store.get(TOKEN_CHAIN_KEY).await? else {
			return Ok(None);
		};

		match TokenChain::from_json(&payload) {
			Ok(chain) => Ok(Some(chain)),
			Err(e) => {
				obs::record_discarded_entry("token_store", TOKEN_CHAIN_KEY, &e);

				Ok(None)
			},
		}
	}

	/// Builds a resolver around a fresh manager seeded from the token store.
	pub async fn resolver(&self) -> Result<ProfileResolver<C, M>> {
		let persisted = self.load_chain().await?;
		let mut manager = TokenChainManager::with_http_client(
			&self.config,
			persisted,
			self.http_client.clone(),
			self.transport_mapper.clone(),
		)?
		.with_metrics(self.metrics.clone());

		if let Some(store) = &self.token_store {
			manager = manager.with_store(store.clone());
		}

		let mut resolver = ProfileResolver::new(manager, self.config.gamertag_policy);

		if let Some(cache) = &self.profile_cache {
			resolver = resolver.with_cache(cache.clone());
		}

		Ok(resolver)
	}

	/// Looks up a profile by numeric XUID.
	///
	/// Malformed ids are rejected before the token store or the network is touched.
	pub async fn get_profile_by_xuid(&self, id: &str) -> Result<LookupResult> {
		let key = LookupKey::xuid(id)?;

		self.resolver().await?.resolve(&key).await
	}

	/// Looks up a profile by gamertag.
	///
	/// Malformed gamertags are rejected before the token store or the network is touched.
	pub async fn get_profile_by_gamertag(&self, name: &str) -> Result<LookupResult> {
		let key = LookupKey::gamertag(name, &self.config.gamertag_policy)?;

		self.resolver().await?.resolve(&key).await
	}
}
#[cfg(feature = "reqwest")]
impl ProfileService<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a service with its own reqwest-backed transport.
	pub fn new(config: BrokerConfig) -> Self {
		Self::with_http_client(config, ReqwestHttpClient::default(), ReqwestTransportErrorMapper)
	}
}
impl<C, M> Debug for ProfileService<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ProfileService")
			.field("config", &self.config)
			.field("token_store_set", &self.token_store.is_some())
			.field("profile_cache_set", &self.profile_cache.is_some())
			.finish()
	}
}
