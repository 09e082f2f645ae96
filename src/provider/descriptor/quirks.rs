// self
use crate::_prelude::*;

/// Settings requested from the profile service by default.
pub const DEFAULT_PROFILE_SETTINGS: [&str; 7] = [
	"Gamerscore",
	"Gamertag",
	"PublicGamerpic",
	"XboxOneRep",
	"AccountTier",
	"Bio",
	"Location",
];

/// Provider-specific values that shape outgoing requests.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderQuirks {
	/// Scopes requested by the refresh-token grant.
	pub refresh_scopes: Vec<String>,
	/// Relying party for the user-authentication stage.
	pub user_relying_party: String,
	/// `SiteName` property for the user-authentication stage.
	pub site_name: String,
	/// Prefix placed before the access token in the RPS ticket.
	pub rps_ticket_prefix: String,
	/// Relying party for the XSTS authorization stage.
	pub xsts_relying_party: String,
	/// Sandbox requested in the XSTS authorization stage.
	pub sandbox_id: String,
	/// `x-xbl-contract-version` header for the auth stages.
	pub auth_contract_version: String,
	/// `x-xbl-contract-version` header for the profile request.
	pub profile_contract_version: String,
	/// Settings requested from the profile service.
	pub profile_settings: Vec<String>,
	/// `User-Agent` header sent with every request.
	pub user_agent: String,
}
impl Default for ProviderQuirks {
	fn default() -> Self {
		Self {
			refresh_scopes: vec!["Xboxlive.signin".into(), "Xboxlive.offline_access".into()],
			user_relying_party: "http://auth.xboxlive.com".into(),
			site_name: "user.auth.xboxlive.com".into(),
			rps_ticket_prefix: "d=".into(),
			xsts_relying_party: "http://xboxlive.com".into(),
			sandbox_id: "RETAIL".into(),
			auth_contract_version: "1".into(),
			profile_contract_version: "2".into(),
			profile_settings: DEFAULT_PROFILE_SETTINGS.iter().map(|s| (*s).to_owned()).collect(),
			user_agent: concat!("xbl-profile-broker/", env!("CARGO_PKG_VERSION")).into(),
		}
	}
}
