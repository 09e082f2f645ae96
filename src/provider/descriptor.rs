//! Provider descriptor data structures shared by every chain stage.

/// Builder API for assembling provider descriptors.
pub mod builder;
/// Request shaping toggles.
pub mod quirks;

pub use builder::*;
pub use quirks::*;

// self
use crate::{_prelude::*, error::ConfigError};

/// Microsoft account token endpoint used by the refresh stage.
pub const LIVE_TOKEN_ENDPOINT: &str = "https://login.live.com/oauth20_token.srf";
/// Xbox Live user authentication endpoint.
pub const USER_AUTHENTICATE_ENDPOINT: &str = "https://user.auth.xboxlive.com/user/authenticate";
/// Xbox Live XSTS authorization endpoint.
pub const XSTS_AUTHORIZE_ENDPOINT: &str = "https://xsts.auth.xboxlive.com/xsts/authorize";
/// Xbox Live profile service base URL.
pub const PROFILE_ENDPOINT: &str = "https://profile.xboxlive.com";

/// Endpoint set declared by a provider descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
	/// OAuth token endpoint for the refresh-token grant.
	pub token: Url,
	/// User-token endpoint (`authenticate` stage).
	pub user_authenticate: Url,
	/// XSTS endpoint (`authorize` stage).
	pub xsts_authorize: Url,
	/// Base URL of the profile service; `/users/<key>/profile/settings` is appended.
	pub profile: Url,
}

/// Immutable provider descriptor consumed by the manager and resolver.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
	/// Endpoint definitions exposed by the provider.
	pub endpoints: ProviderEndpoints,
	/// Request shaping toggles.
	pub quirks: ProviderQuirks,
}
impl ProviderDescriptor {
	/// Creates a new builder with no endpoints set.
	pub fn builder() -> ProviderDescriptorBuilder {
		ProviderDescriptorBuilder::new()
	}

	/// Returns the production Xbox Live descriptor.
	pub fn xbox_live() -> Self {
		let parse = |raw: &str| Url::parse(raw).expect("Built-in endpoint URLs must parse.");

		Self {
			endpoints: ProviderEndpoints {
				token: parse(LIVE_TOKEN_ENDPOINT),
				user_authenticate: parse(USER_AUTHENTICATE_ENDPOINT),
				xsts_authorize: parse(XSTS_AUTHORIZE_ENDPOINT),
				profile: parse(PROFILE_ENDPOINT),
			},
			quirks: ProviderQuirks::default(),
		}
	}

	/// Builds the profile-settings URL for a raw lookup key such as `gt(Major Nelson)`.
	pub fn profile_settings_url(&self, raw_key: &str) -> Result<Url, ConfigError> {
		let mut url = self.endpoints.profile.clone();

		{
			let mut segments = url.path_segments_mut().map_err(|_| {
				ConfigError::InvalidProfileEndpoint { url: self.endpoints.profile.to_string() }
			})?;

			segments.pop_if_empty().extend(["users", raw_key, "profile", "settings"]);
		}

		url.set_query(Some(&format!("settings={}", self.quirks.profile_settings.join(","))));

		Ok(url)
	}
}
impl Default for ProviderDescriptor {
	fn default() -> Self {
		Self::xbox_live()
	}
}
