//! Token pair returned by the `/auth/login` and `/auth/refresh` endpoints.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Tokens issued by the API.
///
/// The access token is optional on the wire so a 2xx response that omits it can be detected
/// and rejected explicitly instead of failing as an opaque decode error.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenGrant {
	/// Newly issued access token.
	#[serde(default)]
	pub access_token: Option<TokenSecret>,
	/// Rotated refresh token, when the API issued one.
	#[serde(default)]
	pub refresh_token: Option<TokenSecret>,
}
impl TokenGrant {
	/// Creates a grant carrying only an access token.
	pub fn access(token: impl Into<TokenSecret>) -> Self {
		Self { access_token: Some(token.into()), refresh_token: None }
	}

	/// Attaches a rotated refresh token.
	pub fn with_refresh_token(mut self, token: impl Into<TokenSecret>) -> Self {
		self.refresh_token = Some(token.into());

		self
	}
}

/// Request body for `POST /auth/refresh`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest<'a> {
	/// Refresh token being exchanged.
	pub refresh_token: &'a str,
}
