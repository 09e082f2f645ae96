//! OAuth client facade for the refresh-token grant and transport error mapping.

pub use oauth2;

// crates.io
use oauth2::{
	AsyncHttpClient, AuthType, ClientId, ClientSecret, EndpointNotSet, EndpointSet,
	HttpClientError, HttpRequest, HttpResponse, RefreshToken, RequestTokenError, Scope,
	TokenResponse, TokenUrl,
	basic::{BasicClient, BasicRequestTokenError, BasicTokenResponse},
	http::{HeaderValue, StatusCode, header::USER_AGENT},
};
// self
use crate::{
	_prelude::*,
	auth::{REFRESH_TOKEN_LIFETIME, Token, TokenSecret},
	error::{ConfigError, DecodeError, TransportError},
	http::{ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	obs::Stage,
	provider::ProviderDescriptor,
};

type ConfiguredBasicClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Maps HTTP transport failures into broker [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted during `stage` into a broker error.
	fn map_transport_error(
		&self,
		stage: Stage,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		stage: Stage,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(stage, *inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => map_generic_transport_error(stage, meta, message),
			_ => map_generic_transport_error(stage, meta, "unrecognized transport failure"),
		}
	}
}

/// Tokens minted by one refresh-token exchange.
#[derive(Clone, Debug)]
pub struct RefreshGrant {
	/// New access token, valid for the provider-reported `expires_in`.
	pub access_token: Token,
	/// Rotated refresh token, when the provider returned one.
	pub refresh_token: Option<Token>,
}

/// `grant_type=refresh_token` exchange against the descriptor's token endpoint.
///
/// Client credentials travel in the form body together with the configured scopes.
pub(crate) struct RefreshFacade<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	oauth_client: ConfiguredBasicClient,
	scopes: Vec<String>,
	user_agent: HeaderValue,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
}
impl<C, M> RefreshFacade<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) fn from_descriptor(
		descriptor: &ProviderDescriptor,
		client_id: &str,
		client_secret: &TokenSecret,
		http_client: Arc<C>,
		error_mapper: Arc<M>,
	) -> Result<Self> {
		let token_url = TokenUrl::new(descriptor.endpoints.token.to_string())
			.map_err(|source| ConfigError::InvalidTokenEndpoint { source })?;
		let oauth_client = BasicClient::new(ClientId::new(client_id.to_owned()))
			.set_client_secret(ClientSecret::new(client_secret.expose().to_owned()))
			.set_token_uri(token_url)
			.set_auth_type(AuthType::RequestBody);
		let user_agent = HeaderValue::from_str(&descriptor.quirks.user_agent)
			.map_err(|e| ConfigError::HttpRequest(e.into()))?;

		Ok(Self {
			oauth_client,
			scopes: descriptor.quirks.refresh_scopes.clone(),
			user_agent,
			http_client,
			error_mapper,
		})
	}

	pub(crate) async fn refresh(&self, refresh_token: &Token) -> Result<RefreshGrant> {
		let meta = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(meta.clone());
		let rejected_body = Mutex::new(None);
		let client = RefreshHttpClient {
			inner: &handle,
			user_agent: &self.user_agent,
			rejected_body: &rejected_body,
		};
		let refresh_secret = RefreshToken::new(refresh_token.expose().to_owned());
		let mut request = self.oauth_client.exchange_refresh_token(&refresh_secret);

		for scope in &self.scopes {
			request = request.add_scope(Scope::new(scope.clone()));
		}

		let response = request
			.request_async(&client)
			.await
			.map_err(|err| {
				map_request_error(
					meta.take(),
					rejected_body.lock().take(),
					err,
					self.error_mapper.as_ref(),
				)
			})?;

		map_refresh_response(response, OffsetDateTime::now_utc())
	}
}

/// Adds the configured `User-Agent` to requests issued by the `oauth2` client and keeps the raw
/// body of non-200 responses, which `oauth2` would otherwise only hand back re-serialized.
struct RefreshHttpClient<'h, H> {
	inner: &'h H,
	user_agent: &'h HeaderValue,
	rejected_body: &'h Mutex<Option<Vec<u8>>>,
}
impl<'c, 'h, H> AsyncHttpClient<'c> for RefreshHttpClient<'h, H>
where
	'h: 'c,
	H: for<'a> AsyncHttpClient<'a, Future: Send>,
{
	type Error = <H as AsyncHttpClient<'c>>::Error;
	type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send>>;

	fn call(&'c self, mut request: HttpRequest) -> Self::Future {
		request.headers_mut().insert(USER_AGENT, self.user_agent.clone());

		let future = self.inner.call(request);
		let rejected_body = self.rejected_body;

		Box::pin(async move {
			let response = future.await?;

			if response.status() != StatusCode::OK {
				*rejected_body.lock() = Some(response.body().clone());
			}

			Ok(response)
		})
	}
}

fn map_refresh_response(response: BasicTokenResponse, now: OffsetDateTime) -> Result<RefreshGrant> {
	const STAGE: Stage = Stage::Refresh;

	let expires_in = response
		.expires_in()
		.ok_or(DecodeError::MissingField { stage: STAGE, field: "expires_in" })?
		.as_secs();
	let expires_in =
		i64::try_from(expires_in).map_err(|_| DecodeError::ExpiresInOutOfRange { stage: STAGE })?;
	let lifetime = Duration::seconds(expires_in);

	if now.checked_add(lifetime).is_none() {
		return Err(DecodeError::ExpiresInOutOfRange { stage: STAGE }.into());
	}

	let access_token = Token::lasting(response.access_token().secret().as_str(), now, lifetime);
	let refresh_token = response
		.refresh_token()
		.map(|secret| Token::lasting(secret.secret().as_str(), now, REFRESH_TOKEN_LIFETIME));

	Ok(RefreshGrant { access_token, refresh_token })
}

fn map_request_error<E, M>(
	meta: Option<ResponseMetadata>,
	rejected_body: Option<Vec<u8>>,
	err: BasicRequestTokenError<HttpClientError<E>>,
	mapper: &M,
) -> Error
where
	E: 'static + Send + Sync + StdError,
	M: ?Sized + TransportErrorMapper<E>,
{
	const STAGE: Stage = Stage::Refresh;

	let rejected = meta.as_ref().and_then(|value| value.status).filter(|status| *status != 200);
	let raw_body = rejected_body.map(|body| String::from_utf8_lossy(&body).into_owned());

	match (err, rejected) {
		(RequestTokenError::Request(error), _) =>
			mapper.map_transport_error(STAGE, meta.as_ref(), error),
		(RequestTokenError::ServerResponse(response), Some(status)) => Error::UpstreamAuth {
			stage: STAGE,
			status,
			body: raw_body.unwrap_or_else(|| serde_json::to_string(&response).unwrap_or_default()),
		},
		(RequestTokenError::Parse(_, body), Some(status)) =>
			Error::UpstreamAuth { stage: STAGE, status, body: String::from_utf8_lossy(&body).into() },
		(RequestTokenError::Other(_), Some(status)) =>
			Error::UpstreamAuth { stage: STAGE, status, body: raw_body.unwrap_or_default() },
		(RequestTokenError::Parse(source, _), None) =>
			DecodeError::Json { stage: STAGE, source }.into(),
		(RequestTokenError::ServerResponse(response), None) => DecodeError::Unexpected {
			stage: STAGE,
			message: format!("OAuth error `{}` without an HTTP status", response.error().as_ref()),
		}
		.into(),
		(RequestTokenError::Other(message), None) =>
			DecodeError::Unexpected { stage: STAGE, message }.into(),
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(stage: Stage, err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		return TransportError::Timeout { stage }.into();
	}

	TransportError::network(stage, err).into()
}

fn map_generic_transport_error(
	stage: Stage,
	meta: Option<&ResponseMetadata>,
	message: impl Display,
) -> Error {
	let message = match meta.and_then(|value| value.status) {
		Some(status) => format!("{message} (HTTP {status})"),
		None => message.to_string(),
	};

	TransportError::Other { stage, message }.into()
}
