//! Broker configuration: OAuth client credentials, bootstrap tokens, endpoints, and lookup rules.
//!
//! Values are passed explicitly to every constructor. [`BrokerConfig::from_env`] reads the
//! process environment once; [`BrokerConfig::from_vars`] accepts any key/value source so tests
//! never touch global state.

// self
use crate::{
	_prelude::*,
	auth::{REFRESH_TOKEN_LIFETIME, Token, TokenChain, TokenSecret},
	error::ConfigError,
	profile::GamertagPolicy,
	provider::ProviderDescriptor,
};

/// Environment key holding the OAuth client identifier.
pub const ENV_CLIENT_ID: &str = "MS_CLIENT_ID";
/// Environment key holding the OAuth client secret.
pub const ENV_CLIENT_SECRET: &str = "MS_CLIENT_SECRET";
/// Environment key holding the bootstrap refresh token.
pub const ENV_REFRESH_TOKEN: &str = "XBOX_REFRESH_TOKEN";
/// Environment key holding the optional bootstrap access token.
pub const ENV_ACCESS_TOKEN: &str = "XBOX_ACCESS_TOKEN";
/// Environment key overriding the gamertag length limit (`0` disables it).
pub const ENV_GAMERTAG_MAX_LENGTH: &str = "XBOX_GAMERTAG_MAX_LENGTH";

/// Validity assumed for a bootstrap access token.
pub const BOOTSTRAP_ACCESS_TOKEN_LIFETIME: Duration = Duration::hours(24);

/// Long-lived credentials used when no persisted chain exists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BootstrapTokens {
	/// Refresh token obtained out of band.
	pub refresh_token: TokenSecret,
	/// Access token obtained together with the refresh token, if still at hand.
	pub access_token: Option<TokenSecret>,
}
impl BootstrapTokens {
	/// Builds an unauthenticated chain anchored at `now`.
	///
	/// Without an access token the placeholder is already expired, so the first use refreshes.
	pub fn chain_at(&self, now: OffsetDateTime) -> TokenChain {
		let refresh_token = Token::lasting(self.refresh_token.clone(), now, REFRESH_TOKEN_LIFETIME);
		let access_token = match &self.access_token {
			Some(secret) => Token::lasting(secret.clone(), now, BOOTSTRAP_ACCESS_TOKEN_LIFETIME),
			None => Token::new(TokenSecret::new(""), now, now),
		};

		TokenChain::new(refresh_token, access_token)
	}
}

/// Immutable configuration shared by the chain manager, resolver, and service.
#[derive(Clone, Debug)]
pub struct BrokerConfig {
	/// OAuth client identifier.
	pub client_id: String,
	/// OAuth client secret.
	pub client_secret: TokenSecret,
	/// Bootstrap credentials, if configured.
	pub bootstrap: Option<BootstrapTokens>,
	/// Endpoints and request quirks.
	pub descriptor: ProviderDescriptor,
	/// Length rule for gamertag lookups.
	pub gamertag_policy: GamertagPolicy,
}
impl BrokerConfig {
	/// Creates an empty builder targeting the production descriptor.
	pub fn builder() -> BrokerConfigBuilder {
		BrokerConfigBuilder::default()
	}

	/// Reads configuration from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_vars(std::env::vars())
	}

	/// Reads configuration from key/value pairs using the `MS_*`/`XBOX_*` keys.
	///
	/// Empty values count as missing.
	pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
	where
		I: IntoIterator<Item = (K, V)>,
		K: AsRef<str>,
		V: Into<String>,
	{
		let mut values = HashMap::new();

		for (key, value) in vars {
			let value = value.into();

			if !value.is_empty() {
				values.insert(key.as_ref().to_owned(), value);
			}
		}

		let mut builder = Self::builder();

		if let Some(id) = values.remove(ENV_CLIENT_ID) {
			builder = builder.client_id(id);
		}
		if let Some(secret) = values.remove(ENV_CLIENT_SECRET) {
			builder = builder.client_secret(secret);
		}
		if let Some(refresh) = values.remove(ENV_REFRESH_TOKEN) {
			builder = builder.bootstrap_refresh_token(refresh);
		}
		if let Some(access) = values.remove(ENV_ACCESS_TOKEN) {
			builder = builder.bootstrap_access_token(access);
		}
		if let Some(raw) = values.remove(ENV_GAMERTAG_MAX_LENGTH) {
			let max = raw.trim().parse::<usize>().map_err(|e| ConfigError::InvalidValue {
				key: ENV_GAMERTAG_MAX_LENGTH,
				reason: e.to_string(),
			})?;
			let policy =
				if max == 0 { GamertagPolicy::unlimited() } else { GamertagPolicy::max_chars(max) };

			builder = builder.gamertag_policy(policy);
		}

		builder.build()
	}
}

/// Builder for [`BrokerConfig`].
#[derive(Debug, Default)]
pub struct BrokerConfigBuilder {
	client_id: Option<String>,
	client_secret: Option<TokenSecret>,
	bootstrap_refresh_token: Option<TokenSecret>,
	bootstrap_access_token: Option<TokenSecret>,
	descriptor: Option<ProviderDescriptor>,
	gamertag_policy: GamertagPolicy,
}
impl BrokerConfigBuilder {
	/// Sets the OAuth client identifier.
	pub fn client_id(mut self, id: impl Into<String>) -> Self {
		self.client_id = Some(id.into());

		self
	}

	/// Sets the OAuth client secret.
	pub fn client_secret(mut self, secret: impl Into<TokenSecret>) -> Self {
		self.client_secret = Some(secret.into());

		self
	}

	/// Sets the bootstrap refresh token.
	pub fn bootstrap_refresh_token(mut self, token: impl Into<TokenSecret>) -> Self {
		self.bootstrap_refresh_token = Some(token.into());

		self
	}

	/// Sets the bootstrap access token.
	pub fn bootstrap_access_token(mut self, token: impl Into<TokenSecret>) -> Self {
		self.bootstrap_access_token = Some(token.into());

		self
	}

	/// Overrides the provider descriptor (defaults to [`ProviderDescriptor::xbox_live`]).
	pub fn descriptor(mut self, descriptor: ProviderDescriptor) -> Self {
		self.descriptor = Some(descriptor);

		self
	}

	/// Overrides the gamertag length rule.
	pub fn gamertag_policy(mut self, policy: GamertagPolicy) -> Self {
		self.gamertag_policy = policy;

		self
	}

	/// Validates the collected values.
	pub fn build(self) -> Result<BrokerConfig, ConfigError> {
		let client_id =
			self.client_id.filter(|id| !id.is_empty()).ok_or(ConfigError::MissingClientId)?;
		let client_secret = self
			.client_secret
			.filter(|secret| !secret.is_empty())
			.ok_or(ConfigError::MissingClientSecret)?;
		let bootstrap = match (self.bootstrap_refresh_token, self.bootstrap_access_token) {
			(Some(refresh_token), access_token) if !refresh_token.is_empty() => Some(BootstrapTokens {
				refresh_token,
				access_token: access_token.filter(|token| !token.is_empty()),
			}),
			(_, Some(access)) if !access.is_empty() =>
				return Err(ConfigError::InvalidValue {
					key: ENV_ACCESS_TOKEN,
					reason: "a bootstrap access token requires a bootstrap refresh token".into(),
				}),
			_ => None,
		};
		let descriptor = self.descriptor.unwrap_or_default();

		descriptor.validate()?;

		Ok(BrokerConfig {
			client_id,
			client_secret,
			bootstrap,
			descriptor,
			gamertag_policy: self.gamertag_policy,
		})
	}
}
