//! Token chain manager: advances only the stale tiers of the delegation chain.
//!
//! A manager is created per request from the shared [`BrokerConfig`] and whatever chain the
//! token store holds. [`TokenChainManager::ensure_authenticated`] returns a usable XSTS token
//! plus identity, running `refresh`, `authenticate`, and `authorize` only when the tier they
//! produce is missing or expired. The new chain is committed in memory and written to the
//! store as one value after every stage succeeded; a failed stage leaves both untouched.

pub mod authenticate;
pub mod authorize;
pub mod common;
pub mod refresh;

// self
use crate::{
	_prelude::*,
	auth::{ChainPlan, Identity, Token, TokenChain, TokenSecret, XstsSession},
	config::BrokerConfig,
	error::ConfigError,
	http::TokenHttpClient,
	oauth::TransportErrorMapper,
	obs::{Stage, StageMetrics, StageTrace},
	provider::ProviderDescriptor,
	store::{StoreError, TOKEN_CHAIN_KEY, TokenStore},
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};

#[cfg(feature = "reqwest")]
/// Manager specialized for the crate's default reqwest transport stack.
pub type ReqwestTokenChainManager = TokenChainManager<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Usable XSTS credentials returned by [`TokenChainManager::ensure_authenticated`].
#[derive(Clone, Debug)]
pub struct Authenticated {
	/// Valid XSTS token.
	pub xsts_token: Token,
	/// Identity minted with the XSTS token.
	pub identity: Identity,
	/// Network stages that ran to produce the token, empty when the chain was warm.
	pub stages: StageTrace,
}
impl Authenticated {
	/// Formats the `Authorization` header for Xbox Live service calls.
	pub fn authorization_header(&self) -> String {
		self.identity.authorization_header(self.xsts_token.expose())
	}
}

/// Owns one token chain and the collaborators needed to re-derive it.
pub struct TokenChainManager<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client wrapper used for every outbound provider request.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	/// Provider descriptor that defines endpoints and request quirks.
	pub descriptor: ProviderDescriptor,
	/// OAuth 2.0 client identifier used by the refresh grant.
	pub client_id: String,
	/// Shared per-stage counters.
	pub metrics: Arc<StageMetrics>,
	client_secret: TokenSecret,
	store: Option<Arc<dyn TokenStore>>,
	chain: TokenChain,
}
impl<C, M> TokenChainManager<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a manager that reuses the caller-provided transport + mapper pair.
	///
	/// `persisted` wins over the bootstrap credentials; with neither available the call fails
	/// with [`ConfigError::MissingCredentials`].
	pub fn with_http_client(
		config: &BrokerConfig,
		persisted: Option<TokenChain>,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Result<Self> {
		let chain = match persisted {
			Some(chain) => chain,
			None => config
				.bootstrap
				.as_ref()
				.map(|bootstrap| bootstrap.chain_at(OffsetDateTime::now_utc()))
				.ok_or(ConfigError::MissingCredentials)?,
		};

		Ok(Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			descriptor: config.descriptor.clone(),
			client_id: config.client_id.clone(),
			metrics: Default::default(),
			client_secret: config.client_secret.clone(),
			store: None,
			chain,
		})
	}

	/// Persists every newly derived chain to `store` under [`TOKEN_CHAIN_KEY`].
	pub fn with_store(mut self, store: Arc<dyn TokenStore>) -> Self {
		self.store = Some(store);

		self
	}

	/// Shares stage counters with other managers.
	pub fn with_metrics(mut self, metrics: Arc<StageMetrics>) -> Self {
		self.metrics = metrics;

		self
	}

	/// Returns the current chain.
	pub fn chain(&self) -> &TokenChain {
		&self.chain
	}

	/// Consumes the manager, returning the current chain.
	pub fn into_chain(self) -> TokenChain {
		self.chain
	}

	/// Returns a valid XSTS token and identity, re-deriving only the stale tiers.
	///
	/// Non-success statuses from any auth stage (404 included) surface as
	/// [`Error::UpstreamAuth`]; nothing is retried.
	pub async fn ensure_authenticated(&mut self) -> Result<Authenticated> {
		let now = OffsetDateTime::now_utc();
		let plan = self.chain.plan_at(now);
		let mut stages = StageTrace::default();

		if let (ChainPlan::Warm, Some(session)) = (plan, self.chain.session()) {
			return Ok(Authenticated {
				xsts_token: session.xsts_token.clone(),
				identity: session.identity.clone(),
				stages,
			});
		}

		// `Warm` always carries a session and returned above.
		let (reusable_user, refresh) = match plan {
			ChainPlan::Authorize =>
				(self.chain.session().map(|session| session.user_token.clone()), false),
			ChainPlan::Authenticate { refresh } => (None, refresh),
			ChainPlan::Warm => (None, false),
		};
		let mut next = self.chain.clone();
		let user_token = match reusable_user {
			Some(user_token) => user_token,
			None => {
				if refresh {
					let grant = self.refresh(&next.refresh_token).await?;

					stages.push(Stage::Refresh);
					next.access_token = grant.access_token;

					if let Some(refresh_token) = grant.refresh_token {
						next.refresh_token = refresh_token;
					}
				}

				let user_token = self.authenticate(&next.access_token).await?;

				stages.push(Stage::Authenticate);

				user_token
			},
		};
		let (xsts_token, identity) = self.authorize(&user_token).await?;

		stages.push(Stage::Authorize);

		self.chain = next.with_session(XstsSession {
			user_token,
			xsts_token: xsts_token.clone(),
			identity: identity.clone(),
		});
		self.persist().await?;

		Ok(Authenticated { xsts_token, identity, stages })
	}

	async fn persist(&self) -> Result<()> {
		let Some(store) = &self.store else {
			return Ok(());
		};
		let payload = self.chain.to_json().map_err(|e| StoreError::Serialization {
			message: format!("Failed to serialize the token chain: {e}"),
		})?;

		store.put(TOKEN_CHAIN_KEY, payload).await?;

		Ok(())
	}
}
#[cfg(feature = "reqwest")]
impl TokenChainManager<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a manager with its own reqwest-backed transport.
	pub fn create(config: &BrokerConfig, persisted: Option<TokenChain>) -> Result<Self> {
		Self::with_http_client(
			config,
			persisted,
			ReqwestHttpClient::default(),
			Arc::new(ReqwestTransportErrorMapper),
		)
	}
}
impl<C, M> Debug for TokenChainManager<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenChainManager")
			.field("descriptor", &self.descriptor)
			.field("client_id", &self.client_id)
			.field("authenticated", &self.chain.is_authenticated())
			.field("store_set", &self.store.is_some())
			.finish()
	}
}
