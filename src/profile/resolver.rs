//! Cache-first profile resolution on top of a [`TokenChainManager`].

// crates.io
use oauth2::http::{Method, StatusCode};
// self
use crate::{
	_prelude::*,
	flows::{TokenChainManager, common},
	http::TokenHttpClient,
	oauth::TransportErrorMapper,
	obs::{self, Stage},
	profile::{GamertagPolicy, LookupKey, ProfileRecord, ProfileSettingsResponse},
	store::{ProfileCache, StoreError},
};

/// Lifetime of cached lookup results, including "not found" answers.
pub const PROFILE_CACHE_TTL: Duration = Duration::seconds(3600);
/// Diagnostic attached to results served from the profile cache.
pub const CACHED_DIAGNOSTIC: &str = "cached profile";
/// Diagnostic attached to results for profiles the provider does not know.
pub const NOT_FOUND_DIAGNOSTIC: &str = "404 response from provider";

/// Outcome of one lookup.
///
/// `diagnostic` describes how the result was produced and never drives control flow.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LookupResult {
	/// Normalized profile, or `None` when the provider does not know the key.
	pub profile: Option<ProfileRecord>,
	/// `cached profile`, `404 response from provider`, or the comma-separated stage trace.
	pub diagnostic: String,
}

/// Resolves lookup keys to profiles, consulting the cache before authenticating.
pub struct ProfileResolver<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	manager: TokenChainManager<C, M>,
	cache: Option<Arc<dyn ProfileCache>>,
	gamertag_policy: GamertagPolicy,
}
impl<C, M> ProfileResolver<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Wraps a manager; lookups go straight to the provider until a cache is attached.
	pub fn new(manager: TokenChainManager<C, M>, gamertag_policy: GamertagPolicy) -> Self {
		Self { manager, cache: None, gamertag_policy }
	}

	/// Attaches the profile cache.
	pub fn with_cache(mut self, cache: Arc<dyn ProfileCache>) -> Self {
		self.cache = Some(cache);

		self
	}

	/// Returns the wrapped manager.
	pub fn manager(&self) -> &TokenChainManager<C, M> {
		&self.manager
	}

	/// Consumes the resolver, returning the wrapped manager.
	pub fn into_manager(self) -> TokenChainManager<C, M> {
		self.manager
	}

	/// Looks up a profile by numeric XUID.
	pub async fn get_profile_by_xuid(&mut self, id: &str) -> Result<LookupResult> {
		let key = LookupKey::xuid(id)?;

		self.resolve(&key).await
	}

	/// Looks up a profile by gamertag.
	pub async fn get_profile_by_gamertag(&mut self, name: &str) -> Result<LookupResult> {
		let key = LookupKey::gamertag(name, &self.gamertag_policy)?;

		self.resolve(&key).await
	}

	/// Resolves a validated key: cache first, then authenticate and fetch.
	///
	/// Both found and not-found answers are cached for [`PROFILE_CACHE_TTL`]; errors are not.
	pub async fn resolve(&mut self, key: &LookupKey) -> Result<LookupResult> {
		let raw_key = key.raw();

		if let Some(cached) = self.cached(&raw_key).await? {
			return Ok(cached);
		}

		let authenticated = self.manager.ensure_authenticated().await?;
		let mut stages = authenticated.stages.clone();
		let profile = self.fetch(&raw_key, &authenticated.authorization_header()).await?;

		stages.push(Stage::Fetch);

		let diagnostic = match &profile {
			Some(_) => stages.to_string(),
			None => NOT_FOUND_DIAGNOSTIC.to_owned(),
		};

		if let Some(cache) = &self.cache {
			let payload = serde_json::to_string(&profile).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize the profile for {raw_key}: {e}"),
			})?;

			cache.put(&raw_key, payload, PROFILE_CACHE_TTL).await?;
		}

		Ok(LookupResult { profile, diagnostic })
	}

	async fn cached(&self, raw_key: &str) -> Result<Option<LookupResult>> {
		let Some(cache) = &self.cache else {
			return Ok(None);
		};
		let Some(payload) = cache.get(raw_key).await? else {
			return Ok(None);
		};

		match serde_json::from_str::<Option<ProfileRecord>>(&payload) {
			Ok(profile) => {
				self.manager.metrics.record_cache_hit();

				Ok(Some(LookupResult { profile, diagnostic: CACHED_DIAGNOSTIC.to_owned() }))
			},
			Err(e) => {
				obs::record_discarded_entry("profile_cache", raw_key, &e);

				Ok(None)
			},
		}
	}

	async fn fetch(&self, raw_key: &str, authorization: &str) -> Result<Option<ProfileRecord>> {
		const STAGE: Stage = Stage::Fetch;

		let manager = &self.manager;

		common::run_stage(&manager.metrics, STAGE, "resolve", async {
			let descriptor = &manager.descriptor;
			let url = descriptor.profile_settings_url(raw_key)?;
			let request = common::xbl_request(
				Method::GET,
				&url,
				&descriptor.quirks,
				&descriptor.quirks.profile_contract_version,
				Some(authorization),
				Vec::new(),
			)?;
			let response = common::send(
				manager.http_client.as_ref(),
				manager.transport_mapper.as_ref(),
				STAGE,
				request,
			)
			.await?;
			let status = response.status();

			if status == StatusCode::NOT_FOUND {
				return Ok(None);
			}
			if !status.is_success() {
				return Err(Error::UpstreamProfile {
					status: status.as_u16(),
					body: String::from_utf8_lossy(response.body()).into_owned(),
				});
			}

			let decoded: ProfileSettingsResponse = common::decode_json(STAGE, response.body())?;

			Ok(Some(ProfileRecord::from_response(decoded)?))
		})
		.await
	}
}
impl<C, M> Debug for ProfileResolver<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ProfileResolver")
			.field("manager", &self.manager)
			.field("cache_set", &self.cache.is_some())
			.field("gamertag_policy", &self.gamertag_policy)
			.finish()
	}
}
