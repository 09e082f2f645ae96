//! Broker-level error types shared across the token chain, profile lookups, and stores.

// self
use crate::{_prelude::*, obs::Stage};

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical broker error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem; callers should surface it as "service unavailable".
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeouts).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Provider answered with a payload the broker could not interpret.
	#[error(transparent)]
	Decode(#[from] DecodeError),
	/// Lookup identifier was rejected before any network activity.
	#[error(transparent)]
	InvalidLookup(#[from] crate::profile::LookupError),

	/// A refresh/authenticate/authorize exchange returned a non-success status.
	#[error("The {stage} stage returned HTTP {status}: {body}")]
	UpstreamAuth {
		/// Chain stage that failed.
		stage: Stage,
		/// HTTP status code returned by the provider.
		status: u16,
		/// Raw response body, kept for diagnostics.
		body: String,
	},
	/// The profile endpoint returned a non-success status other than 404.
	#[error("The profile endpoint returned HTTP {status}: {body}")]
	UpstreamProfile {
		/// HTTP status code returned by the provider.
		status: u16,
		/// Raw response body, kept for diagnostics.
		body: String,
	},
}
impl Error {
	/// Returns the HTTP status carried by upstream failures, if any.
	pub fn upstream_status(&self) -> Option<u16> {
		match self {
			Self::UpstreamAuth { status, .. } | Self::UpstreamProfile { status, .. } =>
				Some(*status),
			_ => None,
		}
	}
}

/// Configuration and validation failures raised by the broker.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Provider descriptor failed validation.
	#[error(transparent)]
	InvalidDescriptor(#[from] crate::provider::ProviderDescriptorError),
	/// Token endpoint URL was rejected by the OAuth client.
	#[error("Token endpoint URL is invalid.")]
	InvalidTokenEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Profile endpoint cannot carry path segments.
	#[error("Profile endpoint `{url}` cannot be used as a base URL.")]
	InvalidProfileEndpoint {
		/// Offending endpoint.
		url: String,
	},

	/// OAuth client identifier is missing.
	#[error("OAuth client identifier is missing.")]
	MissingClientId,
	/// OAuth client secret is missing.
	#[error("OAuth client secret is missing.")]
	MissingClientSecret,
	/// Neither a persisted chain nor bootstrap credentials are available.
	#[error("No persisted token chain or bootstrap refresh token is available.")]
	MissingCredentials,
	/// A configuration value could not be parsed.
	#[error("Configuration value `{key}` is invalid: {reason}.")]
	InvalidValue {
		/// Configuration key.
		key: &'static str,
		/// Parse failure summary.
		reason: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Provider payloads that could not be decoded.
#[derive(Debug, ThisError)]
pub enum DecodeError {
	/// Response body is not the JSON shape the stage expects.
	#[error("The {stage} stage returned malformed JSON.")]
	Json {
		/// Stage that produced the payload.
		stage: Stage,
		/// Structured parsing failure including the offending field path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// A timestamp in the response could not be parsed as RFC 3339.
	#[error("The {stage} stage returned an invalid `{field}` timestamp.")]
	Timestamp {
		/// Stage that produced the payload.
		stage: Stage,
		/// Field holding the timestamp.
		field: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: time::error::Parse,
	},
	/// A required field or claim is absent.
	#[error("The {stage} stage response is missing `{field}`.")]
	MissingField {
		/// Stage that produced the payload.
		stage: Stage,
		/// Missing field.
		field: &'static str,
	},
	/// The `expires_in` value cannot be represented.
	#[error("The {stage} stage returned an out-of-range expires_in value.")]
	ExpiresInOutOfRange {
		/// Stage that produced the payload.
		stage: Stage,
	},
	/// The OAuth client reported an unexpected response.
	#[error("The {stage} stage returned an unexpected response: {message}.")]
	Unexpected {
		/// Stage that produced the payload.
		stage: Stage,
		/// Client-supplied description.
		message: String,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred during the {stage} stage.")]
	Network {
		/// Stage in flight.
		stage: Stage,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The request did not complete in time.
	#[error("Request timed out during the {stage} stage.")]
	Timeout {
		/// Stage in flight.
		stage: Stage,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the provider.")]
	Io(#[from] std::io::Error),
	/// Transport failed in a way it could only describe as text.
	#[error("HTTP client error occurred during the {stage} stage: {message}.")]
	Other {
		/// Stage in flight.
		stage: Stage,
		/// Client-supplied description.
		message: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(stage: Stage, src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { stage, source: Box::new(src) }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn upstream_errors_expose_status() {
		let auth = Error::UpstreamAuth {
			stage: Stage::Authorize,
			status: 401,
			body: "{\"XErr\":2148916233}".into(),
		};

		assert_eq!(auth.upstream_status(), Some(401));
		assert_eq!(
			auth.to_string(),
			"The authorize stage returned HTTP 401: {\"XErr\":2148916233}"
		);

		let profile = Error::UpstreamProfile { status: 500, body: String::new() };

		assert_eq!(profile.upstream_status(), Some(500));
		assert_eq!(Error::from(ConfigError::MissingClientId).upstream_status(), None);
	}

	#[test]
	fn config_errors_stay_transparent() {
		let err = Error::from(ConfigError::MissingCredentials);

		assert!(matches!(err, Error::Config(ConfigError::MissingCredentials)));
		assert_eq!(
			err.to_string(),
			"No persisted token chain or bootstrap refresh token is available."
		);
	}
}
