// crates.io
use ::http::StatusCode;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	client::{ApiClient, ApiRequest, classify},
	obs::{self, OperationKind, OperationOutcome, OperationSpan},
	transport::{HttpResponse, HttpTransport},
};

impl<T> ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Sends `request` through decoration and 401 interception, then decodes the JSON body.
	///
	/// A 401 on a protected path triggers at most one refresh-and-replay. Errors are classified
	/// only after that cycle has settled.
	pub async fn send<R>(&self, request: ApiRequest) -> Result<R>
	where
		R: DeserializeOwned,
	{
		const KIND: OperationKind = OperationKind::Request;

		let span = OperationSpan::new(KIND, "send");

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);

		let result = span.instrument(self.execute(request)).await;

		match &result {
			Ok(_) => obs::record_operation_outcome(KIND, OperationOutcome::Success),
			Err(_) => obs::record_operation_outcome(KIND, OperationOutcome::Failure),
		}

		result
	}

	async fn execute<R>(&self, mut request: ApiRequest) -> Result<R>
	where
		R: DeserializeOwned,
	{
		self.session.hydrate().await;

		let sent_with = self.session.access_token();
		let mut response = self.dispatch(&request, sent_with.as_ref(), 1).await?;

		if response.status() == StatusCode::UNAUTHORIZED
			&& !request.is_retried()
			&& !self.config.is_auth_endpoint(&request.path)
		{
			let token = self.recover_access_token(sent_with.as_ref()).await?;

			request.mark_retried();
			response = self.dispatch(&request, Some(&token), 2).await?;
		}

		self.finalize(response).await
	}

	async fn dispatch(
		&self,
		request: &ApiRequest,
		token: Option<&TokenSecret>,
		attempt: u8,
	) -> Result<HttpResponse> {
		let wire = request.to_http(&self.config, token)?;

		obs::request_sent(&request.method, &request.path, attempt);

		let response = self.transport.execute(wire).await?;

		obs::response_received(&request.method, &request.path, response.status().as_u16());

		Ok(response)
	}

	async fn finalize<R>(&self, response: HttpResponse) -> Result<R>
	where
		R: DeserializeOwned,
	{
		let status = response.status();

		if status.is_success() {
			return classify::decode(&response);
		}
		if status == StatusCode::UNAUTHORIZED {
			self.session.clear().await;
			obs::session_cleared("unauthorized");
		}

		Err(classify::classify(status, response.body()))
	}
}
