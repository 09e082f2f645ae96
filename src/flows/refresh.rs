//! `refresh` stage: mints a new access token from the refresh token.

// self
use crate::{
	_prelude::*,
	auth::Token,
	flows::{TokenChainManager, common},
	http::TokenHttpClient,
	oauth::{RefreshFacade, RefreshGrant, TransportErrorMapper},
	obs::Stage,
};

impl<C, M> TokenChainManager<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Exchanges `refresh_token` for a new access token (and possibly a rotated refresh token).
	///
	/// The exchange is attempted even when the locally assumed refresh-token lifetime has
	/// passed; the provider is the authority on whether it is still accepted.
	pub(crate) async fn refresh(&self, refresh_token: &Token) -> Result<RefreshGrant> {
		common::run_stage(&self.metrics, Stage::Refresh, "ensure_authenticated", async {
			let facade = <RefreshFacade<C, M>>::from_descriptor(
				&self.descriptor,
				&self.client_id,
				&self.client_secret,
				self.http_client.clone(),
				self.transport_mapper.clone(),
			)?;

			facade.refresh(refresh_token).await
		})
		.await
	}
}
