//! Demonstrates plugging an in-process [`HttpTransport`] into the client.
//!
//! The transport below plays the Psinder API: it issues `T1`, rejects it as expired on the
//! first protected call, and accepts whatever `/auth/refresh` handed out afterward. Three
//! concurrent requests hit the expiry together and share one refresh exchange.

// std
use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};
// crates.io
use color_eyre::Result;
use serde::Deserialize;
// self
use psinder_api::{
	client::ApiClient,
	config::ClientConfig,
	http_types::{Method, StatusCode, header::AUTHORIZATION},
	store::MemoryStore,
	transport::{HttpRequest, HttpResponse, HttpTransport, TransportFuture},
	url::Url,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Match {
	dog_name: String,
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let transport = Arc::new(InProcessApi::default());
	let config = ClientConfig::builder(Url::parse("https://psinder.invalid/api")?).build()?;
	let client: ApiClient<InProcessApi> =
		ApiClient::with_transport(config, Arc::new(MemoryStore::default()), transport.clone())?;

	client.login(&serde_json::json!({ "username": "rex", "password": "woof" })).await?;

	let (a, b, c) = tokio::join!(
		client.get::<Match>("/matches/1"),
		client.get::<Match>("/matches/2"),
		client.get::<Match>("/matches/3"),
	);

	for m in [a?, b?, c?] {
		println!("Matched with {}.", m.dog_name);
	}

	println!(
		"Refresh exchanges performed: {}; requests queued behind it: {}.",
		transport.refreshes.load(Ordering::SeqCst),
		client.refresh_metrics.queued(),
	);

	client.logout().await;

	match client.get::<Match>("/matches/1").await {
		Ok(_) => println!("Signed-out request unexpectedly succeeded."),
		Err(e) => println!("Signed-out request failed as expected ({}): {e}", e.code()),
	}

	Ok(())
}

#[derive(Default)]
struct InProcessApi {
	refreshes: AtomicUsize,
}
impl InProcessApi {
	fn answer(&self, request: &HttpRequest) -> HttpResponse {
		let path = request.uri().path().trim_start_matches("/api");
		let bearer = request.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok());

		match (request.method(), path) {
			(&Method::POST, "/auth/login") =>
				respond(StatusCode::OK, r#"{"accessToken":"T1","refreshToken":"R1"}"#.into()),
			(&Method::POST, "/auth/refresh") => {
				let n = self.refreshes.fetch_add(1, Ordering::SeqCst) + 2;

				respond(StatusCode::OK, format!(r#"{{"accessToken":"T{n}"}}"#))
			},
			(_, path) if bearer.is_some_and(|b| b != "Bearer T1") => {
				let id = path.rsplit('/').next().unwrap_or_default();

				respond(StatusCode::OK, format!(r#"{{"dogName":"Dog #{id}"}}"#))
			},
			_ => respond(StatusCode::UNAUTHORIZED, r#"{"message":"jwt expired"}"#.into()),
		}
	}
}
impl HttpTransport for InProcessApi {
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
		let response = self.answer(&request);

		Box::pin(async move {
			tokio::task::yield_now().await;

			Ok(response)
		})
	}
}

fn respond(status: StatusCode, body: String) -> HttpResponse {
	let mut response = HttpResponse::new(body.into_bytes());

	*response.status_mut() = status;

	response
}
