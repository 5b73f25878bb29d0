//! Transport primitives for API calls.
//!
//! [`HttpTransport`] is the client's only dependency on an HTTP stack. Requests and responses
//! use the `http` crate types with buffered bodies so the interception layer can inspect
//! statuses and replay requests without caring which client sends them.

// std
#[cfg(feature = "reqwest")] use std::{ops::Deref, time::Duration};
// self
use crate::{_prelude::*, error::TransportError};
#[cfg(feature = "reqwest")] use crate::error::ConfigError;

/// Buffered outbound request.
pub type HttpRequest = ::http::Request<Vec<u8>>;
/// Buffered inbound response.
pub type HttpResponse = ::http::Response<Vec<u8>>;
/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP clients capable of executing API requests.
///
/// Implementations must resolve with a response for every status code, including 4xx/5xx;
/// only failures that produced no response at all belong in [`TransportError`]. Return
/// [`TransportError::Dispatch`] when the request never reached the network so callers can tell
/// it apart from connectivity failures.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and buffers the full response body.
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client whose every request carries the provided timeout.
	pub fn with_timeout(timeout: Duration) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder().timeout(timeout).build()?;

		Ok(Self(client))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let request = reqwest::Request::try_from(request).map_err(TransportError::dispatch)?;
			let response = client.execute(request).await?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new = HttpResponse::new(response.bytes().await?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}
