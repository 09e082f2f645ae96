//! Lookup identifiers accepted by the profile service.

// self
use crate::_prelude::*;

/// Default upper bound on gamertag length, counted in characters.
pub const DEFAULT_GAMERTAG_MAX_CHARS: usize = 16;

/// Reasons a lookup identifier is rejected before any cache or network activity.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum LookupError {
	/// The XUID is empty.
	#[error("XUID must not be empty.")]
	EmptyXuid,
	/// The XUID contains something other than ASCII digits.
	#[error("XUID must contain only digits: {value}.")]
	NonNumericXuid {
		/// Rejected input.
		value: String,
	},
	/// The gamertag is empty.
	#[error("Gamertag must not be empty.")]
	EmptyGamertag,
	/// The gamertag contains `(` or `)`, which would break the `gt(...)` key.
	#[error("Gamertag must not contain parentheses: {value}.")]
	ReservedCharacter {
		/// Rejected input.
		value: String,
	},
	/// The gamertag exceeds the configured length limit.
	#[error("Gamertag is {length} characters long; the limit is {max}.")]
	GamertagTooLong {
		/// Length of the rejected input in characters.
		length: usize,
		/// Configured limit.
		max: usize,
	},
}

/// Length rule applied to gamertag lookups.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamertagPolicy {
	/// Maximum length in characters; `None` disables the check.
	pub max_chars: Option<usize>,
}
impl GamertagPolicy {
	/// Enforces the given maximum length.
	pub const fn max_chars(max: usize) -> Self {
		Self { max_chars: Some(max) }
	}

	/// Accepts gamertags of any length.
	pub const fn unlimited() -> Self {
		Self { max_chars: None }
	}

	fn check(&self, gamertag: &str) -> Result<(), LookupError> {
		let Some(max) = self.max_chars else {
			return Ok(());
		};
		let length = gamertag.chars().count();

		if length > max { Err(LookupError::GamertagTooLong { length, max }) } else { Ok(()) }
	}
}
impl Default for GamertagPolicy {
	fn default() -> Self {
		Self::max_chars(DEFAULT_GAMERTAG_MAX_CHARS)
	}
}

/// Validated profile lookup identifier.
///
/// Renders as the raw key the profile service expects in its URL path, `xuid(<id>)` or
/// `gt(<name>)`, which is also the profile cache key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum LookupKey {
	/// Numeric Xbox user id.
	Xuid(String),
	/// Player gamertag.
	Gamertag(String),
}
impl LookupKey {
	/// Validates a numeric XUID.
	pub fn xuid(id: impl Into<String>) -> Result<Self, LookupError> {
		let id = id.into();

		if id.is_empty() {
			return Err(LookupError::EmptyXuid);
		}
		if !id.bytes().all(|b| b.is_ascii_digit()) {
			return Err(LookupError::NonNumericXuid { value: id });
		}

		Ok(Self::Xuid(id))
	}

	/// Validates a gamertag against the reserved characters and the length policy.
	pub fn gamertag(name: impl Into<String>, policy: &GamertagPolicy) -> Result<Self, LookupError> {
		let name = name.into();

		if name.is_empty() {
			return Err(LookupError::EmptyGamertag);
		}
		if name.contains(['(', ')']) {
			return Err(LookupError::ReservedCharacter { value: name });
		}

		policy.check(&name)?;

		Ok(Self::Gamertag(name))
	}

	/// Returns the raw key, e.g. `gt(Major Nelson)`.
	pub fn raw(&self) -> String {
		self.to_string()
	}
}
impl Display for LookupKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Xuid(id) => write!(f, "xuid({id})"),
			Self::Gamertag(name) => write!(f, "gt({name})"),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn xuid_must_be_digits() {
		assert_eq!(
			LookupKey::xuid("2533274792693551").expect("Numeric XUID should be accepted.").raw(),
			"xuid(2533274792693551)"
		);
		assert_eq!(LookupKey::xuid(""), Err(LookupError::EmptyXuid));
		assert_eq!(
			LookupKey::xuid("12a4"),
			Err(LookupError::NonNumericXuid { value: "12a4".into() })
		);
		assert!(LookupKey::xuid("-12").is_err());
		assert!(LookupKey::xuid("١٢٣").is_err());
	}

	#[test]
	fn gamertag_rejects_reserved_characters() {
		let policy = GamertagPolicy::default();

		assert_eq!(LookupKey::gamertag("", &policy), Err(LookupError::EmptyGamertag));
		assert!(matches!(
			LookupKey::gamertag("bad)name", &policy),
			Err(LookupError::ReservedCharacter { .. })
		));
		assert!(matches!(
			LookupKey::gamertag("(bad", &policy),
			Err(LookupError::ReservedCharacter { .. })
		));
		assert_eq!(
			LookupKey::gamertag("Major Nelson", &policy)
				.expect("Gamertag with a space should be accepted.")
				.raw(),
			"gt(Major Nelson)"
		);
	}

	#[test]
	fn gamertag_length_follows_policy() {
		let seventeen = "a".repeat(17);

		assert_eq!(
			LookupKey::gamertag(seventeen.as_str(), &GamertagPolicy::default()),
			Err(LookupError::GamertagTooLong { length: 17, max: 16 })
		);
		assert!(LookupKey::gamertag("a".repeat(16), &GamertagPolicy::default()).is_ok());
		assert!(LookupKey::gamertag(seventeen, &GamertagPolicy::unlimited()).is_ok());
		assert!(LookupKey::gamertag("ÅÅÅÅÅÅÅÅÅÅÅÅÅÅÅÅ", &GamertagPolicy::max_chars(16)).is_ok());
	}
}
