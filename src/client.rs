//! The authenticated API client and its public request surface.

pub mod refresh;
pub mod request;

mod classify;
mod intercept;

pub use refresh::*;
pub use request::*;

// self
use crate::{
	_prelude::*,
	auth::{TokenGrant, TokenSecret},
	config::ClientConfig,
	error::ConfigError,
	obs::{self, OperationKind, OperationOutcome, OperationSpan},
	session::Session,
	store::CredentialStore,
	transport::HttpTransport,
};
#[cfg(feature = "reqwest")] use crate::transport::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestApiClient = ApiClient<ReqwestTransport>;

/// REST client that attaches the session's bearer token, recovers from expired access tokens
/// with a single-flight refresh, and replays the requests that hit the expiry.
///
/// Cloning is cheap; clones share the session, transport, and refresh gate.
pub struct ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Validated configuration.
	pub config: Arc<ClientConfig>,
	/// Transport used for every outbound request, including the default refresh exchange.
	pub transport: Arc<T>,
	/// Endpoint that exchanges refresh tokens.
	pub refresher: Arc<dyn RefreshEndpoint>,
	/// Session holding tokens and the refresh gate.
	pub session: Arc<Session>,
	/// Shared counters for refresh outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
}
impl<T> ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a client that reuses the caller-provided transport.
	///
	/// The refresh exchange defaults to `POST {refresh_path}` over the same transport; swap it
	/// with [`ApiClient::with_refresh_endpoint`].
	pub fn with_transport(
		config: ClientConfig,
		store: Arc<dyn CredentialStore>,
		transport: impl Into<Arc<T>>,
	) -> Result<Self, ConfigError> {
		let transport = transport.into();
		let refresh_url = config.endpoint(&config.refresh_path).map_err(|source| {
			ConfigError::InvalidPath { path: config.refresh_path.clone(), source }
		})?;
		let refresher: Arc<dyn RefreshEndpoint> =
			Arc::new(HttpRefreshEndpoint::new(transport.clone(), refresh_url));
		let session = Arc::new(Session::new(store, config.storage_keys.clone()));

		Ok(Self {
			config: Arc::new(config),
			transport,
			refresher,
			session,
			refresh_metrics: Default::default(),
		})
	}

	/// Replaces the refresh exchange.
	pub fn with_refresh_endpoint(mut self, refresher: Arc<dyn RefreshEndpoint>) -> Self {
		self.refresher = refresher;

		self
	}

	/// Returns the shared session.
	pub fn session(&self) -> &Arc<Session> {
		&self.session
	}

	/// Loads persisted tokens. Requests also trigger this lazily before their first dispatch.
	pub async fn hydrate(&self) {
		self.session.hydrate().await;
	}

	/// Returns `true` while an access token is held in memory.
	pub fn is_authenticated(&self) -> bool {
		self.session.is_authenticated()
	}

	/// Returns the current access token.
	pub fn access_token(&self) -> Option<TokenSecret> {
		self.session.access_token()
	}

	/// Returns the current refresh token.
	pub fn refresh_token(&self) -> Option<TokenSecret> {
		self.session.refresh_token()
	}

	/// Stores a new access token (memory first, then durable storage).
	pub async fn set_access_token(&self, token: impl Into<TokenSecret>) {
		self.session.set_access_token(token).await;
	}

	/// Stores a new refresh token (memory first, then durable storage).
	pub async fn set_refresh_token(&self, token: impl Into<TokenSecret>) {
		self.session.set_refresh_token(token).await;
	}

	/// Clears both tokens from memory and durable storage. Never fails.
	pub async fn clear_session(&self) {
		self.session.clear().await;
	}

	/// Signs the user out locally.
	pub async fn logout(&self) {
		self.clear_session().await;
		obs::session_cleared("logout");
	}

	/// Exchanges credentials at the login endpoint and stores the issued tokens.
	pub async fn login<C>(&self, credentials: &C) -> Result<()>
	where
		C: ?Sized + Serialize + Sync,
	{
		const KIND: OperationKind = OperationKind::Login;

		let span = OperationSpan::new(KIND, "login");

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);

		let result = span
			.instrument(async move {
				let request = ApiRequest::post(&self.config.login_path).json(credentials)?;
				let grant: TokenGrant = self.send(request).await?;
				let access = grant
					.access_token
					.ok_or_else(|| Error::unknown("No access token received from login."))?;

				self.session.set_access_token(access).await;

				if let Some(refresh) = grant.refresh_token {
					self.session.set_refresh_token(refresh).await;
				}

				Ok::<_, Error>(())
			})
			.await;

		match &result {
			Ok(_) => obs::record_operation_outcome(KIND, OperationOutcome::Success),
			Err(_) => obs::record_operation_outcome(KIND, OperationOutcome::Failure),
		}

		result
	}

	/// Performs `GET path` and decodes the JSON response.
	pub async fn get<R>(&self, path: &str) -> Result<R>
	where
		R: DeserializeOwned,
	{
		self.send(ApiRequest::get(path)).await
	}

	/// Performs `POST path` with a JSON body and decodes the JSON response.
	pub async fn post<R, B>(&self, path: &str, body: &B) -> Result<R>
	where
		R: DeserializeOwned,
		B: ?Sized + Serialize,
	{
		self.send(ApiRequest::post(path).json(body)?).await
	}

	/// Performs `PUT path` with a JSON body and decodes the JSON response.
	pub async fn put<R, B>(&self, path: &str, body: &B) -> Result<R>
	where
		R: DeserializeOwned,
		B: ?Sized + Serialize,
	{
		self.send(ApiRequest::new(::http::Method::PUT, path).json(body)?).await
	}

	/// Performs `PATCH path` with a JSON body and decodes the JSON response.
	pub async fn patch<R, B>(&self, path: &str, body: &B) -> Result<R>
	where
		R: DeserializeOwned,
		B: ?Sized + Serialize,
	{
		self.send(ApiRequest::new(::http::Method::PATCH, path).json(body)?).await
	}

	/// Performs `DELETE path` and decodes the JSON response (use `()` for empty bodies).
	pub async fn delete<R>(&self, path: &str) -> Result<R>
	where
		R: DeserializeOwned,
	{
		self.send(ApiRequest::new(::http::Method::DELETE, path)).await
	}
}
#[cfg(feature = "reqwest")]
impl ApiClient<ReqwestTransport> {
	/// Creates a new client backed by a reqwest transport honoring `config.timeout`.
	pub fn new(config: ClientConfig, store: Arc<dyn CredentialStore>) -> Result<Self, ConfigError> {
		let transport = ReqwestTransport::with_timeout(config.timeout)?;

		Self::with_transport(config, store, transport)
	}
}
impl<T> Clone for ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			config: self.config.clone(),
			transport: self.transport.clone(),
			refresher: self.refresher.clone(),
			session: self.session.clone(),
			refresh_metrics: self.refresh_metrics.clone(),
		}
	}
}
impl<T> Debug for ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("base_url", &self.config.base_url.as_str())
			.field("session", &self.session)
			.finish()
	}
}
