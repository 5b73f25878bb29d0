//! Fakes shared by the integration tests.

#![allow(dead_code)]

// std
use std::{
	sync::{
		Arc, Mutex,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};
// self
use psinder_api::{
	auth::{TokenGrant, TokenSecret},
	client::{ApiClient, RefreshEndpoint, RefreshError, RefreshFuture},
	config::ClientConfig,
	error::TransportError,
	http_types::{StatusCode, header::AUTHORIZATION},
	store::{CredentialStore, MemoryStore, StoreError, StoreFuture},
	transport::{HttpRequest, HttpResponse, HttpTransport, TransportFuture},
	url::Url,
};

pub const BASE_URL: &str = "http://psinder.test/api";

pub type Responder =
	Box<dyn Fn(&Seen) -> Result<HttpResponse, TransportError> + 'static + Send + Sync>;

/// What the scripted transport observed for one request.
#[derive(Clone, Debug)]
pub struct Seen {
	pub method: String,
	pub path: String,
	pub authorization: Option<String>,
	pub body: Vec<u8>,
}
impl Seen {
	pub fn bearer(&self) -> Option<&str> {
		self.authorization.as_deref().and_then(|v| v.strip_prefix("Bearer "))
	}
}

/// Transport answering every request through a closure and recording what it saw.
pub struct ScriptedTransport {
	respond: Responder,
	seen: Mutex<Vec<Seen>>,
}
impl ScriptedTransport {
	pub fn new<F>(respond: F) -> Self
	where
		F: 'static + Send + Sync + Fn(&Seen) -> Result<HttpResponse, TransportError>,
	{
		Self { respond: Box::new(respond), seen: Mutex::new(Vec::new()) }
	}

	/// Answers `200 {"path": ...}` to requests carrying `Bearer {valid}` and 401 otherwise.
	pub fn accepting(valid: &'static str) -> Self {
		Self::new(move |seen| {
			if seen.bearer() == Some(valid) {
				Ok(json(200, &format!(r#"{{"path":"{}"}}"#, seen.path)))
			} else {
				Ok(json(401, r#"{"message":"jwt expired"}"#))
			}
		})
	}

	pub fn seen(&self) -> Vec<Seen> {
		self.seen.lock().expect("Transport log should not be poisoned.").clone()
	}
}
impl HttpTransport for ScriptedTransport {
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
		let seen = Seen {
			method: request.method().to_string(),
			path: request.uri().path().trim_start_matches("/api").to_owned(),
			authorization: request
				.headers()
				.get(AUTHORIZATION)
				.and_then(|v| v.to_str().ok())
				.map(str::to_owned),
			body: request.body().clone(),
		};
		let result = (self.respond)(&seen);

		self.seen.lock().expect("Transport log should not be poisoned.").push(seen);

		Box::pin(async move { result })
	}
}

/// Behavior of [`CountingRefresher`].
#[derive(Clone, Debug)]
pub enum RefreshBehavior {
	Grant(TokenGrant),
	Reject(u16),
	NoAccessToken,
	Network,
}

/// Refresh endpoint that counts exchanges and holds each one open for `delay`.
pub struct CountingRefresher {
	behavior: RefreshBehavior,
	delay: Duration,
	calls: AtomicUsize,
	presented: Mutex<Vec<String>>,
}
impl CountingRefresher {
	pub fn new(behavior: RefreshBehavior, delay: Duration) -> Arc<Self> {
		Arc::new(Self {
			behavior,
			delay,
			calls: AtomicUsize::new(0),
			presented: Mutex::new(Vec::new()),
		})
	}

	pub fn granting(access: &str, refresh: Option<&str>) -> Arc<Self> {
		let grant = TokenGrant::access(access);
		let grant = match refresh {
			Some(refresh) => grant.with_refresh_token(refresh),
			None => grant,
		};

		Self::new(RefreshBehavior::Grant(grant), Duration::from_millis(20))
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	pub fn presented(&self) -> Vec<String> {
		self.presented.lock().expect("Refresher log should not be poisoned.").clone()
	}
}
impl RefreshEndpoint for CountingRefresher {
	fn refresh<'a>(&'a self, refresh_token: &'a TokenSecret) -> RefreshFuture<'a> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		self.presented
			.lock()
			.expect("Refresher log should not be poisoned.")
			.push(refresh_token.expose().to_owned());

		Box::pin(async move {
			tokio::time::sleep(self.delay).await;

			match &self.behavior {
				RefreshBehavior::Grant(grant) => Ok(grant.clone()),
				RefreshBehavior::Reject(status) => Err(RefreshError::Rejected { status: *status }),
				RefreshBehavior::NoAccessToken => Ok(TokenGrant::default()),
				RefreshBehavior::Network => Err(RefreshError::Transport(TransportError::network(
					std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused"),
				))),
			}
		})
	}
}

/// Store whose every operation fails.
pub struct FailingStore;
impl CredentialStore for FailingStore {
	fn get<'a>(&'a self, _key: &'a str) -> StoreFuture<'a, Option<String>> {
		Box::pin(async { Err(StoreError::Backend { message: "keychain locked".into() }) })
	}

	fn set<'a>(&'a self, _key: &'a str, _value: String) -> StoreFuture<'a, ()> {
		Box::pin(async { Err(StoreError::Backend { message: "keychain locked".into() }) })
	}

	fn delete<'a>(&'a self, _key: &'a str) -> StoreFuture<'a, ()> {
		Box::pin(async { Err(StoreError::Backend { message: "keychain locked".into() }) })
	}
}

pub fn json(status: u16, body: &str) -> HttpResponse {
	let mut response = HttpResponse::new(body.as_bytes().to_vec());

	*response.status_mut() = StatusCode::from_u16(status).expect("Fixture status should be valid.");

	response
}

pub fn config() -> ClientConfig {
	ClientConfig::builder(Url::parse(BASE_URL).expect("Fixture base URL should parse."))
		.build()
		.expect("Fixture config should build.")
}

/// Builds a client over `transport` and `refresher`, seeded with the given tokens.
pub async fn client(
	transport: Arc<ScriptedTransport>,
	refresher: Arc<CountingRefresher>,
	access: Option<&str>,
	refresh: Option<&str>,
) -> (ApiClient<ScriptedTransport>, MemoryStore) {
	let store = MemoryStore::default();
	let client = ApiClient::with_transport(config(), Arc::new(store.clone()), transport)
		.expect("Client should build over the scripted transport.")
		.with_refresh_endpoint(refresher);

	client.hydrate().await;

	if let Some(access) = access {
		client.set_access_token(access).await;
	}
	if let Some(refresh) = refresh {
		client.set_refresh_token(refresh).await;
	}

	(client, store)
}
