//! `authorize` stage: turns the user token into an XSTS token plus identity claims.

// crates.io
use oauth2::http::Method;
// self
use crate::{
	_prelude::*,
	auth::{Identity, Token},
	error::DecodeError,
	flows::{
		TokenChainManager,
		common::{self, XblTokenResponse},
	},
	http::TokenHttpClient,
	oauth::TransportErrorMapper,
	obs::Stage,
};

const STAGE: Stage = Stage::Authorize;

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct AuthorizeRequest<'a> {
	relying_party: &'a str,
	token_type: &'a str,
	properties: AuthorizeProperties<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct AuthorizeProperties<'a> {
	sandbox_id: &'a str,
	user_tokens: [&'a str; 1],
}

impl<C, M> TokenChainManager<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Exchanges a user token for an XSTS token and the identity it was minted for.
	pub(crate) async fn authorize(&self, user_token: &Token) -> Result<(Token, Identity)> {
		common::run_stage(&self.metrics, STAGE, "ensure_authenticated", async {
			let quirks = &self.descriptor.quirks;
			let payload = AuthorizeRequest {
				relying_party: &quirks.xsts_relying_party,
				token_type: "JWT",
				properties: AuthorizeProperties {
					sandbox_id: &quirks.sandbox_id,
					user_tokens: [user_token.expose()],
				},
			};
			let request = common::xbl_request(
				Method::POST,
				&self.descriptor.endpoints.xsts_authorize,
				quirks,
				&quirks.auth_contract_version,
				None,
				common::json_body(STAGE, &payload)?,
			)?;
			let response = common::send(
				self.http_client.as_ref(),
				self.transport_mapper.as_ref(),
				STAGE,
				request,
			)
			.await?;
			let body = common::expect_success(STAGE, response)?;
			let decoded: XblTokenResponse = common::decode_json(STAGE, &body)?;

			Ok(decode_session(decoded)?)
		})
		.await
	}
}

fn decode_session(decoded: XblTokenResponse) -> Result<(Token, Identity), DecodeError> {
	let claims = decoded
		.display_claims
		.and_then(|claims| claims.xui.into_iter().next())
		.ok_or(DecodeError::MissingField { stage: STAGE, field: "DisplayClaims.xui[0]" })?;
	let id = claims.xid.ok_or(DecodeError::MissingField { stage: STAGE, field: "xid" })?;
	let display_name = claims.gtg.ok_or(DecodeError::MissingField { stage: STAGE, field: "gtg" })?;
	let hash = claims.uhs.ok_or(DecodeError::MissingField { stage: STAGE, field: "uhs" })?;
	let token =
		Token::from_xbl_response(STAGE, decoded.token, &decoded.issue_instant, &decoded.not_after)?;

	Ok((token, Identity::new(id, display_name, hash)))
}
