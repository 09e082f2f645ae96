//! The delegation chain: refresh → access → user → XSTS, plus the identity minted with XSTS.
//!
//! The user token, XSTS token, and identity are produced together by the authorization step,
//! so they live in a single [`XstsSession`] that is either wholly present or absent. The
//! persisted JSON layout keeps the flat `refreshToken`/`accessToken`/`userToken`/`xstsToken`/
//! `user` shape; restoring a value where the session triple is only partially present yields
//! an unauthenticated chain.

// self
use crate::{
	_prelude::*,
	auth::{Identity, Token},
};

/// Validity assumed for refresh tokens; the provider does not report their lifetime.
pub const REFRESH_TOKEN_LIFETIME: Duration = Duration::days(30);

/// Work needed to turn a chain into a usable XSTS session at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChainPlan {
	/// XSTS token and identity are usable; no network calls are needed.
	Warm,
	/// User token is still valid; only a fresh XSTS token is needed.
	Authorize,
	/// User token is absent or expired and must be re-derived before authorizing.
	Authenticate {
		/// Access token is expired and must be refreshed first.
		refresh: bool,
	},
}

/// User/XSTS tokens and identity produced by one authorization round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XstsSession {
	/// Token obtained from the user-authentication stage.
	pub user_token: Token,
	/// Token obtained from the authorization stage.
	pub xsts_token: Token,
	/// Identity claims returned with the XSTS token.
	pub identity: Identity,
}

/// Authorization tier of a chain.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ChainAuthorization {
	/// No user/XSTS session has been derived yet.
	#[default]
	Unauthenticated,
	/// A complete session is available (possibly expired).
	Authenticated(XstsSession),
}

/// Every credential held for one authenticated session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "PersistedChain", from = "PersistedChain")]
pub struct TokenChain {
	/// Long-lived token used to mint access tokens.
	pub refresh_token: Token,
	/// Short-lived token exchanged for a user token.
	pub access_token: Token,
	/// Derived user/XSTS session, if any.
	pub authorization: ChainAuthorization,
}
impl TokenChain {
	/// Creates an unauthenticated chain from an access/refresh pair.
	pub fn new(refresh_token: Token, access_token: Token) -> Self {
		Self { refresh_token, access_token, authorization: ChainAuthorization::Unauthenticated }
	}

	/// Replaces the session tier wholesale.
	pub fn with_session(mut self, session: XstsSession) -> Self {
		self.authorization = ChainAuthorization::Authenticated(session);

		self
	}

	/// Returns the derived session, if present.
	pub fn session(&self) -> Option<&XstsSession> {
		match &self.authorization {
			ChainAuthorization::Authenticated(session) => Some(session),
			ChainAuthorization::Unauthenticated => None,
		}
	}

	/// Returns `true` when a session (valid or not) is present.
	pub fn is_authenticated(&self) -> bool {
		self.session().is_some()
	}

	/// Decides which stages must run at `now`.
	///
	/// Staleness propagates upward only: an expired XSTS token leaves the user token alone,
	/// while an expired user token forces a new XSTS token as well.
	pub fn plan_at(&self, now: OffsetDateTime) -> ChainPlan {
		match self.session() {
			Some(session) if session.xsts_token.is_valid_at(now) => ChainPlan::Warm,
			Some(session) if session.user_token.is_valid_at(now) => ChainPlan::Authorize,
			_ => ChainPlan::Authenticate { refresh: self.access_token.is_expired_at(now) },
		}
	}

	/// Serializes the chain into its persisted JSON form.
	pub fn to_json(&self) -> Result<String, serde_json::Error> {
		serde_json::to_string(self)
	}

	/// Restores a chain from its persisted JSON form.
	pub fn from_json(payload: &str) -> Result<Self, serde_path_to_error::Error<serde_json::Error>> {
		let mut de = serde_json::Deserializer::from_str(payload);

		serde_path_to_error::deserialize(&mut de)
	}
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedChain {
	refresh_token: Token,
	access_token: Token,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	user_token: Option<Token>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	xsts_token: Option<Token>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	user: Option<Identity>,
}
impl From<TokenChain> for PersistedChain {
	fn from(chain: TokenChain) -> Self {
		let (user_token, xsts_token, user) = match chain.authorization {
			ChainAuthorization::Authenticated(session) =>
				(Some(session.user_token), Some(session.xsts_token), Some(session.identity)),
			ChainAuthorization::Unauthenticated => (None, None, None),
		};

		Self {
			refresh_token: chain.refresh_token,
			access_token: chain.access_token,
			user_token,
			xsts_token,
			user,
		}
	}
}
impl From<PersistedChain> for TokenChain {
	fn from(persisted: PersistedChain) -> Self {
		let authorization = match (persisted.user_token, persisted.xsts_token, persisted.user) {
			(Some(user_token), Some(xsts_token), Some(identity)) =>
				ChainAuthorization::Authenticated(XstsSession { user_token, xsts_token, identity }),
			_ => ChainAuthorization::Unauthenticated,
		};

		Self { refresh_token: persisted.refresh_token, access_token: persisted.access_token, authorization }
	}
}
