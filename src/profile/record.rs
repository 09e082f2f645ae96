//! Normalized profile records built from profile-settings responses.

// self
use crate::{_prelude::*, error::DecodeError, obs::Stage};

/// Raw `profile/settings` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProfileSettingsResponse {
	pub profile_users: Vec<ProfileUser>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProfileUser {
	pub id: String,
	#[serde(default)]
	pub settings: Vec<ProfileSetting>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProfileSetting {
	pub id: String,
	#[serde(default)]
	pub value: String,
}

/// Maps a provider setting name to its normalized attribute key.
pub fn normalize_setting_key(name: &str) -> String {
	match name {
		"PublicGamerpic" => "gamerpic".into(),
		"AccountTier" => "tier".into(),
		"XboxOneRep" => "reputation".into(),
		other => other.to_lowercase(),
	}
}

/// Player profile with normalized attribute keys.
///
/// Serialized flat: `{"xuid": "...", "gamertag": "...", "gamerscore": "..."}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
	/// Xbox user id the profile belongs to.
	pub xuid: String,
	/// Normalized settings keyed by attribute name.
	#[serde(flatten)]
	pub attributes: BTreeMap<String, String>,
}
impl ProfileRecord {
	/// Builds a record from raw `(setting, value)` pairs, normalizing every key.
	pub fn from_settings<I, K, V>(xuid: impl Into<String>, settings: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: AsRef<str>,
		V: Into<String>,
	{
		let attributes = settings
			.into_iter()
			.map(|(name, value)| (normalize_setting_key(name.as_ref()), value.into()))
			.filter(|(key, _)| key != "xuid")
			.collect();

		Self { xuid: xuid.into(), attributes }
	}

	/// Returns a normalized attribute, e.g. `gamertag` or `reputation`.
	pub fn attribute(&self, key: &str) -> Option<&str> {
		self.attributes.get(key).map(String::as_str)
	}

	pub(crate) fn from_response(response: ProfileSettingsResponse) -> Result<Self, DecodeError> {
		let user = response
			.profile_users
			.into_iter()
			.next()
			.ok_or(DecodeError::MissingField { stage: Stage::Fetch, field: "profileUsers[0]" })?;

		Ok(Self::from_settings(
			user.id,
			user.settings.into_iter().map(|setting| (setting.id, setting.value)),
		))
	}
}
