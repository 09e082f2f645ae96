//! Player identity claims returned alongside an XSTS token.

// self
use crate::_prelude::*;

/// Claims from `DisplayClaims.xui[0]` of the authorization response.
///
/// `hash` is the user hash (`uhs`) that must accompany the XSTS token in every
/// `XBL3.0` authorization header.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
	/// Authenticated account XUID (`xid` claim).
	pub id: String,
	/// Authenticated account gamertag (`gtg` claim).
	#[serde(rename = "name")]
	pub display_name: String,
	/// User hash (`uhs` claim).
	pub hash: String,
}
impl Identity {
	/// Creates an identity from its three claims.
	pub fn new(
		id: impl Into<String>,
		display_name: impl Into<String>,
		hash: impl Into<String>,
	) -> Self {
		Self { id: id.into(), display_name: display_name.into(), hash: hash.into() }
	}

	/// Formats the `Authorization` header value for Xbox Live service calls.
	pub fn authorization_header(&self, xsts_token: &str) -> String {
		format!("XBL3.0 x={};{xsts_token}", self.hash)
	}
}
