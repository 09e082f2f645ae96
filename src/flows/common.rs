//! Shared helpers for the JSON stages (request building, sending, decoding, instrumentation).

// crates.io
use oauth2::{
	AsyncHttpClient, HttpRequest, HttpResponse,
	http::{
		Method,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT},
	},
};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	error::{ConfigError, DecodeError},
	http::{ResponseMetadataSlot, TokenHttpClient},
	oauth::TransportErrorMapper,
	obs::{Stage, StageMetrics, StageOutcome, StageSpan},
	provider::ProviderQuirks,
};

/// Header carrying the Xbox Live service contract version.
pub const CONTRACT_VERSION_HEADER: &str = "x-xbl-contract-version";

/// `Token`/`IssueInstant`/`NotAfter` envelope shared by the user and XSTS endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct XblTokenResponse {
	pub issue_instant: String,
	pub not_after: String,
	pub token: String,
	#[serde(default)]
	pub display_claims: Option<DisplayClaims>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DisplayClaims {
	#[serde(default)]
	pub xui: Vec<XuiClaim>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct XuiClaim {
	#[serde(default)]
	pub xid: Option<String>,
	#[serde(default)]
	pub gtg: Option<String>,
	#[serde(default)]
	pub uhs: Option<String>,
}

/// Runs one stage inside its span and records attempt/success/failure counters.
pub(crate) async fn run_stage<T, F>(
	metrics: &StageMetrics,
	stage: Stage,
	call_site: &'static str,
	fut: F,
) -> Result<T>
where
	F: Future<Output = Result<T>>,
{
	let span = StageSpan::new(stage, call_site);

	metrics.record(stage, StageOutcome::Attempt);

	let result = span.instrument(fut).await;

	match &result {
		Ok(_) => metrics.record(stage, StageOutcome::Success),
		Err(_) => metrics.record(stage, StageOutcome::Failure),
	}

	result
}

/// Builds an Xbox Live JSON request with the contract-version and user-agent headers.
pub(crate) fn xbl_request(
	method: Method,
	url: &Url,
	quirks: &ProviderQuirks,
	contract_version: &str,
	authorization: Option<&str>,
	body: Vec<u8>,
) -> Result<HttpRequest> {
	let mut builder = oauth2::http::Request::builder()
		.method(method)
		.uri(url.as_str())
		.header(ACCEPT, "application/json")
		.header(CONTENT_TYPE, "application/json")
		.header(USER_AGENT, quirks.user_agent.as_str())
		.header(CONTRACT_VERSION_HEADER, contract_version);

	if let Some(value) = authorization {
		builder = builder.header(AUTHORIZATION, value);
	}

	builder.body(body).map_err(|e| ConfigError::from(e).into())
}

/// Serializes a stage payload into a request body.
pub(crate) fn json_body<T>(stage: Stage, payload: &T) -> Result<Vec<u8>>
where
	T: Serialize,
{
	serde_json::to_vec(payload).map_err(|e| {
		DecodeError::Unexpected { stage, message: format!("request body did not serialize: {e}") }
			.into()
	})
}

/// Sends a request through a fresh metadata-tracking handle.
pub(crate) async fn send<C, M>(
	http_client: &C,
	mapper: &M,
	stage: Stage,
	request: HttpRequest,
) -> Result<HttpResponse>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let meta = ResponseMetadataSlot::default();
	let handle = http_client.with_metadata(meta.clone());

	handle
		.call(request)
		.await
		.map_err(|err| mapper.map_transport_error(stage, meta.take().as_ref(), err))
}

/// Returns the body of a successful auth-stage response or the matching upstream error.
pub(crate) fn expect_success(stage: Stage, response: HttpResponse) -> Result<Vec<u8>> {
	let status = response.status();
	let body = response.into_body();

	if status.is_success() {
		Ok(body)
	} else {
		Err(Error::UpstreamAuth {
			stage,
			status: status.as_u16(),
			body: String::from_utf8_lossy(&body).into_owned(),
		})
	}
}

/// Decodes a JSON body, keeping the failing field path in the error.
pub(crate) fn decode_json<T>(stage: Stage, body: &[u8]) -> Result<T, DecodeError>
where
	T: DeserializeOwned,
{
	let mut de = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut de).map_err(|source| DecodeError::Json { stage, source })
}
