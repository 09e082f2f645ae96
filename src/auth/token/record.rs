//! Immutable bearer token records and their lifecycle helpers.

// crates.io
use time::format_description::well_known::Rfc3339;
// self
use crate::{_prelude::*, auth::TokenSecret, error::DecodeError, obs::Stage};

/// Lifecycle status for a token at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
	/// Token is still usable.
	Active,
	/// Token reached its expiry instant.
	Expired,
}

/// One credential of the delegation chain.
///
/// Validity depends only on `expires_at` and the instant it is checked against; a token never
/// changes after construction, and re-deriving a tier always yields a new value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
	/// Opaque bearer value.
	#[serde(rename = "token")]
	pub secret: TokenSecret,
	/// Instant the provider (or the bootstrap) issued the token.
	#[serde(rename = "created", with = "time::serde::rfc3339")]
	pub issued_at: OffsetDateTime,
	/// Instant after which the token must be re-derived.
	#[serde(rename = "expire", with = "time::serde::rfc3339")]
	pub expires_at: OffsetDateTime,
}
impl Token {
	/// Creates a token with absolute issue/expiry instants.
	pub fn new(
		secret: impl Into<TokenSecret>,
		issued_at: OffsetDateTime,
		expires_at: OffsetDateTime,
	) -> Self {
		Self { secret: secret.into(), issued_at, expires_at }
	}

	/// Creates a token that expires `lifetime` after `issued_at`.
	pub fn lasting(
		secret: impl Into<TokenSecret>,
		issued_at: OffsetDateTime,
		lifetime: Duration,
	) -> Self {
		Self::new(secret, issued_at, issued_at + lifetime)
	}

	/// Parses the `Token`/`IssueInstant`/`NotAfter` triple returned by Xbox Live auth services.
	pub(crate) fn from_xbl_response(
		stage: Stage,
		token: String,
		issue_instant: &str,
		not_after: &str,
	) -> Result<Self, DecodeError> {
		let issued_at = OffsetDateTime::parse(issue_instant, &Rfc3339).map_err(|source| {
			DecodeError::Timestamp { stage, field: "IssueInstant", source }
		})?;
		let expires_at = OffsetDateTime::parse(not_after, &Rfc3339)
			.map_err(|source| DecodeError::Timestamp { stage, field: "NotAfter", source })?;

		Ok(Self::new(token, issued_at, expires_at))
	}

	/// Returns the raw bearer value. Never log the result.
	pub fn expose(&self) -> &str {
		self.secret.expose()
	}

	/// Computes the lifecycle status at a given instant.
	pub fn status_at(&self, instant: OffsetDateTime) -> TokenStatus {
		if instant < self.expires_at { TokenStatus::Active } else { TokenStatus::Expired }
	}

	/// Returns `true` if the token is usable at the provided instant.
	pub fn is_valid_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), TokenStatus::Active)
	}

	/// Returns `true` if the token has expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		!self.is_valid_at(instant)
	}

	/// Checks validity against the current UTC clock.
	pub fn is_valid(&self) -> bool {
		self.is_valid_at(OffsetDateTime::now_utc())
	}

	/// Checks expiry against the current UTC clock.
	pub fn is_expired(&self) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc())
	}
}
impl Debug for Token {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Token")
			.field("secret", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn token() -> Token {
		Token::new(
			"user-token",
			macros::datetime!(2025-01-01 00:00 UTC),
			macros::datetime!(2025-01-15 00:00 UTC),
		)
	}

	#[test]
	fn validity_is_a_function_of_expiry_and_instant() {
		let token = token();

		for instant in [
			macros::datetime!(2024-12-31 00:00 UTC),
			macros::datetime!(2025-01-14 23:59:59 UTC),
			macros::datetime!(2025-01-15 00:00 UTC),
			macros::datetime!(2025-02-01 00:00 UTC),
		] {
			assert_eq!(token.is_valid_at(instant), !token.is_expired_at(instant));
			assert_eq!(token.is_valid_at(instant), instant < token.expires_at);
		}

		assert_eq!(token.status_at(macros::datetime!(2025-01-15 00:00 UTC)), TokenStatus::Expired);
		assert_eq!(token.status_at(macros::datetime!(2025-01-10 00:00 UTC)), TokenStatus::Active);
	}

	#[test]
	fn lasting_adds_lifetime_to_issue_instant() {
		let token =
			Token::lasting("access", macros::datetime!(2025-01-01 00:00 UTC), Duration::hours(24));

		assert_eq!(token.expires_at, macros::datetime!(2025-01-02 00:00 UTC));
	}

	#[test]
	fn parses_xbox_live_timestamps() {
		let token = Token::from_xbl_response(
			Stage::Authenticate,
			"eyJlbmMiOiJBMTI4".into(),
			"2025-03-01T10:00:00.1234567Z",
			"2025-03-15T10:00:00.1234567Z",
		)
		.expect("Xbox Live timestamps should parse.");

		assert_eq!(token.expose(), "eyJlbmMiOiJBMTI4");
		assert_eq!(token.expires_at - token.issued_at, Duration::days(14));

		let err = Token::from_xbl_response(
			Stage::Authorize,
			"xsts".into(),
			"yesterday",
			"2025-03-15T10:00:00Z",
		)
		.expect_err("Garbage timestamps must be rejected.");

		assert!(matches!(err, DecodeError::Timestamp { field: "IssueInstant", .. }));
	}

	#[test]
	fn persisted_shape_matches_session_layout() {
		let payload = serde_json::to_value(token()).expect("Token should serialize.");

		assert_eq!(payload["token"], "user-token");
		assert_eq!(payload["created"], "2025-01-01T00:00:00Z");
		assert_eq!(payload["expire"], "2025-01-15T00:00:00Z");

		let restored: Token = serde_json::from_value(payload).expect("Token should deserialize.");

		assert_eq!(restored, token());
		assert!(!format!("{restored:?}").contains("user-token"));
	}
}
