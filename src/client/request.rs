//! Outgoing request descriptors and bearer decoration.

// crates.io
use ::http::{
	HeaderMap, HeaderValue, Method,
	header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderName},
};
// self
use crate::{
	_prelude::*, auth::TokenSecret, config::ClientConfig, error::ConfigError,
	transport::HttpRequest,
};

const JSON: &str = "application/json";

/// Transport-agnostic description of an API call.
///
/// The descriptor is kept separate from the wire request so it can be re-decorated with a new
/// token when replayed after a refresh. It remembers whether it has already been replayed;
/// a replayed request never enters the refresh path again.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Path relative to the configured base URL, optionally with a query string.
	pub path: String,
	/// Extra headers; `Authorization` is managed by the client.
	pub headers: HeaderMap,
	/// Serialized JSON body.
	pub body: Option<Vec<u8>>,
	retried: bool,
}
impl ApiRequest {
	/// Creates a body-less request.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self { method, path: path.into(), headers: HeaderMap::new(), body: None, retried: false }
	}

	/// Shorthand for a `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	/// Shorthand for a `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::POST, path)
	}

	/// Serializes `body` as the JSON payload.
	pub fn json<B>(mut self, body: &B) -> Result<Self, ConfigError>
	where
		B: ?Sized + Serialize,
	{
		let bytes =
			serde_json::to_vec(body).map_err(|source| ConfigError::RequestBody { source })?;

		self.body = Some(bytes);

		Ok(self)
	}

	/// Adds or replaces a header.
	pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Returns `true` once the request has been replayed after a 401.
	pub fn is_retried(&self) -> bool {
		self.retried
	}

	pub(crate) fn mark_retried(&mut self) {
		self.retried = true;
	}

	/// Builds the wire request, decorated with `token` unless the path is an auth endpoint.
	pub(crate) fn to_http(
		&self,
		config: &ClientConfig,
		token: Option<&TokenSecret>,
	) -> Result<HttpRequest, ConfigError> {
		let url = config
			.endpoint(&self.path)
			.map_err(|source| ConfigError::InvalidPath { path: self.path.clone(), source })?;
		let mut request = ::http::Request::builder()
			.method(self.method.clone())
			.uri(url.as_str())
			.body(self.body.clone().unwrap_or_default())?;
		let headers = request.headers_mut();

		headers.extend(self.headers.clone());
		headers.entry(ACCEPT).or_insert(HeaderValue::from_static(JSON));

		if self.body.is_some() {
			headers.entry(CONTENT_TYPE).or_insert(HeaderValue::from_static(JSON));
		}

		decorate(headers, &self.path, config, token);

		Ok(request)
	}
}

/// Attaches `Authorization: Bearer <token>` unless `path` is an auth endpoint or no token is
/// present. Never fails: a token that cannot be encoded as a header value is skipped.
pub fn decorate(
	headers: &mut HeaderMap,
	path: &str,
	config: &ClientConfig,
	token: Option<&TokenSecret>,
) {
	if config.is_auth_endpoint(path) {
		return;
	}

	let Some(token) = token else { return };

	if let Ok(mut value) = HeaderValue::from_str(&token.bearer()) {
		value.set_sensitive(true);
		headers.insert(AUTHORIZATION, value);
	}
}
