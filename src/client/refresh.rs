//! Refresh-token exchange with a single-flight gate and waiter replay.
//!
//! The first request to observe a 401 while the session's gate is idle leads the exchange:
//! it calls the [`RefreshEndpoint`], stores the new tokens, and releases every request that
//! queued behind it. Any failure of the exchange itself is terminal: the session is cleared and
//! the leader plus all waiters surface [`Error::Unauthorized`]. The exchange never goes through
//! interception, so a 401 from the refresh endpoint cannot recurse into another refresh.

mod metrics;

pub use metrics::RefreshMetrics;

// crates.io
use ::http::{
	HeaderValue, Method,
	header::{ACCEPT, CONTENT_TYPE},
};
// self
use crate::{
	_prelude::*,
	auth::{RefreshRequest, TokenGrant, TokenSecret},
	client::ApiClient,
	error::TransportError,
	obs::{self, OperationKind, OperationOutcome, OperationSpan},
	session::refresh::{RefreshLease, RefreshOutcome, RefreshTicket},
	transport::HttpTransport,
};

/// Boxed future returned by [`RefreshEndpoint::refresh`].
pub type RefreshFuture<'a> =
	Pin<Box<dyn Future<Output = Result<TokenGrant, RefreshError>> + 'a + Send>>;

/// Remote operation that exchanges a refresh token for a new access token.
pub trait RefreshEndpoint
where
	Self: Send + Sync,
{
	/// Exchanges `refresh_token`. A grant without an access token is treated as a failure by
	/// the caller.
	fn refresh<'a>(&'a self, refresh_token: &'a TokenSecret) -> RefreshFuture<'a>;
}

/// Failures of the refresh exchange. These never reach callers directly; they end the
/// session and surface as [`Error::Unauthorized`].
#[derive(Debug, ThisError)]
pub enum RefreshError {
	/// The session holds no refresh token.
	#[error("No refresh token available.")]
	MissingRefreshToken,
	/// The endpoint answered 2xx without an access token.
	#[error("No access token received from refresh.")]
	MissingAccessToken,
	/// The endpoint answered with a non-success status.
	#[error("Refresh endpoint rejected the exchange with HTTP {status}.")]
	Rejected {
		/// HTTP status code returned by the endpoint.
		status: u16,
	},
	/// No response was received.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// The exchange request could not be built.
	#[error("Refresh request could not be built.")]
	Request(#[from] ::http::Error),
	/// The exchange request body could not be serialized.
	#[error("Refresh request body could not be serialized.")]
	Encode {
		/// Underlying serialization failure.
		#[source]
		source: serde_json::Error,
	},
	/// The endpoint answered 2xx with an unreadable body.
	#[error("Refresh endpoint returned malformed JSON.")]
	Malformed {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}

/// Default [`RefreshEndpoint`] that posts `{"refreshToken": ...}` over an [`HttpTransport`].
pub struct HttpRefreshEndpoint<T>
where
	T: ?Sized + HttpTransport,
{
	transport: Arc<T>,
	url: Url,
}
impl<T> HttpRefreshEndpoint<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates an endpoint that posts to `url`.
	pub fn new(transport: Arc<T>, url: Url) -> Self {
		Self { transport, url }
	}

	/// Returns the absolute refresh URL.
	pub fn url(&self) -> &Url {
		&self.url
	}
}
impl<T> RefreshEndpoint for HttpRefreshEndpoint<T>
where
	T: ?Sized + HttpTransport,
{
	fn refresh<'a>(&'a self, refresh_token: &'a TokenSecret) -> RefreshFuture<'a> {
		Box::pin(async move {
			let body = serde_json::to_vec(&RefreshRequest { refresh_token: refresh_token.expose() })
				.map_err(|source| RefreshError::Encode { source })?;
			let request = ::http::Request::builder()
				.method(Method::POST)
				.uri(self.url.as_str())
				.header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
				.header(ACCEPT, HeaderValue::from_static("application/json"))
				.body(body)?;
			let response = self.transport.execute(request).await?;
			let status = response.status();

			if !status.is_success() {
				return Err(RefreshError::Rejected { status: status.as_u16() });
			}

			let mut deserializer = serde_json::Deserializer::from_slice(response.body());

			serde_path_to_error::deserialize(&mut deserializer)
				.map_err(|source| RefreshError::Malformed { source })
		})
	}
}
impl<T> Debug for HttpRefreshEndpoint<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("HttpRefreshEndpoint").field("url", &self.url.as_str()).finish()
	}
}

impl<T> ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Resolves the token a 401'd request should be replayed with.
	///
	/// `sent_with` is the access token the failed attempt carried.
	pub(crate) async fn recover_access_token(
		&self,
		sent_with: Option<&TokenSecret>,
	) -> Result<TokenSecret> {
		loop {
			let wait = match self.session.begin_refresh(sent_with) {
				RefreshTicket::Retry(token) => return Ok(token),
				RefreshTicket::Lead(lease) => return self.lead_refresh(lease).await,
				RefreshTicket::Wait(wait) => wait,
			};

			self.refresh_metrics.record_queued();

			match wait.outcome().await {
				RefreshOutcome::Refreshed(token) => return Ok(token),
				RefreshOutcome::Expired => return Err(Error::Unauthorized),
				// The leader was dropped mid-exchange; contend for the gate again.
				RefreshOutcome::Abandoned => continue,
			}
		}
	}

	async fn lead_refresh(&self, lease: RefreshLease<'_>) -> Result<TokenSecret> {
		const KIND: OperationKind = OperationKind::Refresh;

		let span = OperationSpan::new(KIND, "lead_refresh");

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);
		self.refresh_metrics.record_attempt();

		let exchanged = span.instrument(self.exchange_refresh_token()).await;

		match exchanged {
			Ok(access) => {
				lease.settle(RefreshOutcome::Refreshed(access.clone()));
				self.refresh_metrics.record_success();
				obs::record_operation_outcome(KIND, OperationOutcome::Success);

				Ok(access)
			},
			Err(e) => {
				obs::refresh_failed(&e);
				// Waiters must observe the cleared session before storage deletes can suspend.
				self.session.clear_memory();
				lease.settle(RefreshOutcome::Expired);
				self.refresh_metrics.record_failure();
				obs::record_operation_outcome(KIND, OperationOutcome::Failure);
				self.session.clear_storage().await;
				obs::session_cleared("refresh failed");

				Err(Error::Unauthorized)
			},
		}
	}

	/// Runs the exchange and stores the result; the gate stays closed throughout.
	async fn exchange_refresh_token(&self) -> Result<TokenSecret, RefreshError> {
		let refresh = self.session.refresh_token().ok_or(RefreshError::MissingRefreshToken)?;
		let grant = self.refresher.refresh(&refresh).await?;
		let access = grant.access_token.ok_or(RefreshError::MissingAccessToken)?;

		self.session.set_access_token(access.clone()).await;

		// Without a rotated refresh token the current one stays valid.
		if let Some(rotated) = grant.refresh_token {
			self.session.set_refresh_token(rotated).await;
		}

		Ok(access)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::transport::{HttpRequest, HttpResponse, TransportFuture};

	struct CannedTransport {
		status: u16,
		body: &'static str,
		seen: Mutex<Option<HttpRequest>>,
	}
	impl CannedTransport {
		fn new(status: u16, body: &'static str) -> Arc<Self> {
			Arc::new(Self { status, body, seen: Mutex::new(None) })
		}
	}
	impl HttpTransport for CannedTransport {
		fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
			let mut response = HttpResponse::new(self.body.as_bytes().to_vec());

			*response.status_mut() =
				::http::StatusCode::from_u16(self.status).expect("Fixture status should be valid.");
			*self.seen.lock() = Some(request);

			Box::pin(async move { Ok(response) })
		}
	}

	fn endpoint(transport: Arc<CannedTransport>) -> HttpRefreshEndpoint<CannedTransport> {
		let url = Url::parse("http://localhost:8080/api/auth/refresh")
			.expect("Fixture refresh URL should parse.");

		HttpRefreshEndpoint::new(transport, url)
	}

	#[tokio::test]
	async fn exchange_posts_the_refresh_token_as_json() {
		let transport = CannedTransport::new(200, r#"{"accessToken":"T2","refreshToken":"R2"}"#);
		let endpoint = endpoint(transport.clone());
		let grant = endpoint
			.refresh(&TokenSecret::new("R1"))
			.await
			.expect("Successful exchange should yield a grant.");

		assert_eq!(grant, TokenGrant::access("T2").with_refresh_token("R2"));

		let seen = transport.seen.lock().take().expect("Transport should see the exchange.");

		assert_eq!(seen.method(), Method::POST);
		assert_eq!(seen.uri().to_string(), endpoint.url().as_str());
		assert_eq!(seen.headers()[CONTENT_TYPE], "application/json");
		assert_eq!(seen.body().as_slice(), br#"{"refreshToken":"R1"}"#);
	}

	#[tokio::test]
	async fn non_success_and_malformed_bodies_are_failures() {
		let err = endpoint(CannedTransport::new(401, r#"{"message":"revoked"}"#))
			.refresh(&TokenSecret::new("R1"))
			.await
			.expect_err("Rejected exchange should fail.");

		assert!(matches!(err, RefreshError::Rejected { status: 401 }));

		let err = endpoint(CannedTransport::new(200, r#"{"accessToken":7}"#))
			.refresh(&TokenSecret::new("R1"))
			.await
			.expect_err("Malformed grant should fail.");

		match err {
			RefreshError::Malformed { source } => assert_eq!(source.path().to_string(), "accessToken"),
			other => panic!("Unexpected refresh error: {other:?}."),
		}
	}
}
