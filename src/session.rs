//! Session state: the current token pair, its durable mirror, and the refresh gate.
//!
//! A [`Session`] is owned by one [`ApiClient`](crate::client::ApiClient) and shared by `Arc`
//! with anything that needs to read or write tokens. In-memory token state is authoritative:
//! storage writes are best effort, and a failed write never rolls a token back. Storage
//! failures are reported through [`obs::storage_failure`] and never returned.

pub mod refresh;

pub use refresh::RefreshPhase;

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	config::StorageKeys,
	obs::{self, OperationKind, OperationOutcome, OperationSpan},
	session::refresh::{RefreshLease, RefreshState, RefreshTicket, RefreshWait},
	store::{CredentialStore, StoreOp},
};

#[derive(Default)]
struct SessionTokens {
	access: Option<TokenSecret>,
	refresh: Option<TokenSecret>,
}

/// Token state for a single signed-in user.
pub struct Session {
	store: Arc<dyn CredentialStore>,
	keys: StorageKeys,
	tokens: RwLock<SessionTokens>,
	// Lock order: `refresh` before `tokens`. Never held across `.await`.
	refresh: Mutex<RefreshState>,
	hydration: OnceCell<()>,
}
impl Session {
	/// Creates an empty, not-yet-hydrated session over `store`.
	pub fn new(store: Arc<dyn CredentialStore>, keys: StorageKeys) -> Self {
		Self {
			store,
			keys,
			tokens: Default::default(),
			refresh: Default::default(),
			hydration: OnceCell::new(),
		}
	}

	/// Returns the current access token.
	pub fn access_token(&self) -> Option<TokenSecret> {
		self.tokens.read().access.clone()
	}

	/// Returns the current refresh token.
	pub fn refresh_token(&self) -> Option<TokenSecret> {
		self.tokens.read().refresh.clone()
	}

	/// Returns `true` while an access token is held in memory.
	pub fn is_authenticated(&self) -> bool {
		self.tokens.read().access.is_some()
	}

	/// Returns `true` once hydration from durable storage has completed.
	pub fn is_hydrated(&self) -> bool {
		self.hydration.is_initialized()
	}

	/// Returns a snapshot of the refresh gate.
	pub fn refresh_phase(&self) -> RefreshPhase {
		self.refresh.lock().phase()
	}

	/// Loads both tokens from durable storage, once.
	///
	/// Concurrent callers wait for the first load to settle. Tokens already set in memory are
	/// never overwritten, and any read failure leaves the session unauthenticated.
	pub async fn hydrate(&self) {
		self.hydration.get_or_init(|| self.load_from_store()).await;
	}

	async fn load_from_store(&self) {
		const KIND: OperationKind = OperationKind::Hydrate;

		let span = OperationSpan::new(KIND, "load_from_store");

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);

		let loaded = span
			.instrument(async {
				let access = self.read_key(&self.keys.access_token).await;
				let refresh = self.read_key(&self.keys.refresh_token).await;

				access.zip(refresh)
			})
			.await;
		let Some((access, refresh)) = loaded else {
			obs::record_operation_outcome(KIND, OperationOutcome::Failure);

			return;
		};
		let mut tokens = self.tokens.write();

		if tokens.access.is_none() {
			tokens.access = access.map(TokenSecret::new);
		}
		if tokens.refresh.is_none() {
			tokens.refresh = refresh.map(TokenSecret::new);
		}

		obs::record_operation_outcome(KIND, OperationOutcome::Success);
	}

	async fn read_key(&self, key: &str) -> Option<Option<String>> {
		match self.store.get(key).await {
			Ok(value) => Some(value),
			Err(e) => {
				obs::storage_failure(StoreOp::Read, key, &e);

				None
			},
		}
	}

	/// Replaces the access token in memory, then mirrors it to durable storage.
	pub async fn set_access_token(&self, token: impl Into<TokenSecret>) {
		let token = token.into();

		self.tokens.write().access = Some(token.clone());
		self.persist(&self.keys.access_token, token).await;
	}

	/// Replaces the refresh token in memory, then mirrors it to durable storage.
	pub async fn set_refresh_token(&self, token: impl Into<TokenSecret>) {
		let token = token.into();

		self.tokens.write().refresh = Some(token.clone());
		self.persist(&self.keys.refresh_token, token).await;
	}

	/// Drops both tokens from memory, then attempts to delete both storage entries.
	pub async fn clear(&self) {
		self.clear_memory();
		self.clear_storage().await;
	}

	pub(crate) fn clear_memory(&self) {
		let mut tokens = self.tokens.write();

		tokens.access = None;
		tokens.refresh = None;
	}

	pub(crate) async fn clear_storage(&self) {
		for key in [&self.keys.access_token, &self.keys.refresh_token] {
			if let Err(e) = self.store.delete(key).await {
				obs::storage_failure(StoreOp::Delete, key, &e);
			}
		}
	}

	async fn persist(&self, key: &str, token: TokenSecret) {
		if let Err(e) = self.store.set(key, token.expose().to_owned()).await {
			obs::storage_failure(StoreOp::Write, key, &e);
		}
	}

	/// Decides how a request that just received a 401 should recover.
	///
	/// `sent_with` is the access token the request carried. The check and the transition to
	/// `Refreshing` happen under one lock, so exactly one caller per expiry episode leads.
	pub(crate) fn begin_refresh(&self, sent_with: Option<&TokenSecret>) -> RefreshTicket<'_> {
		let mut state = self.refresh.lock();

		if let RefreshState::Refreshing { pending } = &mut *state {
			let waiter = Arc::new(OnceCell::new());

			pending.push_back(waiter.clone());

			return RefreshTicket::Wait(RefreshWait::new(waiter));
		}
		// A refresh settled after this request was sent; its token is already current.
		if let Some(current) = self.tokens.read().access.clone().filter(|c| Some(c) != sent_with)
		{
			return RefreshTicket::Retry(current);
		}

		*state = RefreshState::Refreshing { pending: VecDeque::new() };

		RefreshTicket::Lead(RefreshLease::new(&self.refresh))
	}
}
impl Debug for Session {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let tokens = self.tokens.read();

		f.debug_struct("Session")
			.field("keys", &self.keys)
			.field("access_token", &tokens.access.as_ref().map(|_| "<redacted>"))
			.field("refresh_token", &tokens.refresh.as_ref().map(|_| "<redacted>"))
			.field("hydrated", &self.is_hydrated())
			.finish()
	}
}
