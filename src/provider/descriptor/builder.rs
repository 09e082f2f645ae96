// self
use crate::{
	_prelude::*,
	provider::{ProviderDescriptor, ProviderEndpoints, ProviderQuirks},
};

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ProviderDescriptorError {
	/// A required endpoint was not configured.
	#[error("Missing {endpoint} endpoint.")]
	MissingEndpoint {
		/// Which endpoint is missing.
		endpoint: &'static str,
	},
	/// Endpoints must use HTTPS unless they point at a loopback host.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// The profile endpoint must be usable as a base URL.
	#[error("The profile endpoint cannot be a base URL: {url}.")]
	OpaqueProfileEndpoint {
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// The profile request must ask for at least one setting.
	#[error("At least one profile setting must be requested.")]
	NoProfileSettings,
}

/// Builder for [`ProviderDescriptor`] values.
#[derive(Debug, Default)]
pub struct ProviderDescriptorBuilder {
	/// OAuth token endpoint.
	pub token_endpoint: Option<Url>,
	/// User authentication endpoint.
	pub user_authenticate_endpoint: Option<Url>,
	/// XSTS authorization endpoint.
	pub xsts_authorize_endpoint: Option<Url>,
	/// Profile service base URL.
	pub profile_endpoint: Option<Url>,
	/// Request shaping toggles.
	pub quirks: ProviderQuirks,
}
impl ProviderDescriptorBuilder {
	/// Creates an empty builder.
	pub fn new() -> Self {
		Self::default()
	}

	/// Seeds the builder with an existing descriptor so single endpoints can be overridden.
	pub fn from_descriptor(descriptor: ProviderDescriptor) -> Self {
		let ProviderDescriptor { endpoints, quirks } = descriptor;

		Self {
			token_endpoint: Some(endpoints.token),
			user_authenticate_endpoint: Some(endpoints.user_authenticate),
			xsts_authorize_endpoint: Some(endpoints.xsts_authorize),
			profile_endpoint: Some(endpoints.profile),
			quirks,
		}
	}

	/// Sets the OAuth token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Sets the user authentication endpoint.
	pub fn user_authenticate_endpoint(mut self, url: Url) -> Self {
		self.user_authenticate_endpoint = Some(url);

		self
	}

	/// Sets the XSTS authorization endpoint.
	pub fn xsts_authorize_endpoint(mut self, url: Url) -> Self {
		self.xsts_authorize_endpoint = Some(url);

		self
	}

	/// Sets the profile service base URL.
	pub fn profile_endpoint(mut self, url: Url) -> Self {
		self.profile_endpoint = Some(url);

		self
	}

	/// Overrides the request quirks.
	pub fn quirks(mut self, quirks: ProviderQuirks) -> Self {
		self.quirks = quirks;

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<ProviderDescriptor, ProviderDescriptorError> {
		let required = |value: Option<Url>, endpoint: &'static str| {
			value.ok_or(ProviderDescriptorError::MissingEndpoint { endpoint })
		};
		let endpoints = ProviderEndpoints {
			token: required(self.token_endpoint, "token")?,
			user_authenticate: required(self.user_authenticate_endpoint, "user_authenticate")?,
			xsts_authorize: required(self.xsts_authorize_endpoint, "xsts_authorize")?,
			profile: required(self.profile_endpoint, "profile")?,
		};
		let descriptor = ProviderDescriptor { endpoints, quirks: self.quirks };

		descriptor.validate()?;

		Ok(descriptor)
	}
}

impl ProviderDescriptor {
	/// Validates invariants for the descriptor.
	pub(crate) fn validate(&self) -> Result<(), ProviderDescriptorError> {
		validate_endpoint("token", &self.endpoints.token)?;
		validate_endpoint("user_authenticate", &self.endpoints.user_authenticate)?;
		validate_endpoint("xsts_authorize", &self.endpoints.xsts_authorize)?;
		validate_endpoint("profile", &self.endpoints.profile)?;

		if self.endpoints.profile.cannot_be_a_base() {
			return Err(ProviderDescriptorError::OpaqueProfileEndpoint {
				url: self.endpoints.profile.to_string(),
			});
		}
		if self.quirks.profile_settings.is_empty() {
			return Err(ProviderDescriptorError::NoProfileSettings);
		}

		Ok(())
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ProviderDescriptorError> {
	match url.scheme() {
		"https" => Ok(()),
		"http" if is_loopback(url) => Ok(()),
		_ => Err(ProviderDescriptorError::InsecureEndpoint { endpoint: name, url: url.to_string() }),
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(url::Host::Ipv4(addr)) => addr.is_loopback(),
		Some(url::Host::Ipv6(addr)) => addr.is_loopback(),
		None => false,
	}
}
