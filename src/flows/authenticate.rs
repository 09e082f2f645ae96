//! `authenticate` stage: turns the access token into a user token.

// crates.io
use oauth2::http::Method;
// self
use crate::{
	_prelude::*,
	auth::Token,
	flows::{
		TokenChainManager,
		common::{self, XblTokenResponse},
	},
	http::TokenHttpClient,
	oauth::TransportErrorMapper,
	obs::Stage,
};

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct AuthenticateRequest<'a> {
	relying_party: &'a str,
	token_type: &'a str,
	properties: AuthenticateProperties<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct AuthenticateProperties<'a> {
	auth_method: &'a str,
	site_name: &'a str,
	rps_ticket: String,
}

impl<C, M> TokenChainManager<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Exchanges an access token for a user token via RPS authentication.
	pub(crate) async fn authenticate(&self, access_token: &Token) -> Result<Token> {
		const STAGE: Stage = Stage::Authenticate;

		common::run_stage(&self.metrics, STAGE, "ensure_authenticated", async {
			let quirks = &self.descriptor.quirks;
			let payload = AuthenticateRequest {
				relying_party: &quirks.user_relying_party,
				token_type: "JWT",
				properties: AuthenticateProperties {
					auth_method: "RPS",
					site_name: &quirks.site_name,
					rps_ticket: format!("{}{}", quirks.rps_ticket_prefix, access_token.expose()),
				},
			};
			let request = common::xbl_request(
				Method::POST,
				&self.descriptor.endpoints.user_authenticate,
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

			Ok(Token::from_xbl_response(
				STAGE,
				decoded.token,
				&decoded.issue_instant,
				&decoded.not_after,
			)?)
		})
		.await
	}
}
