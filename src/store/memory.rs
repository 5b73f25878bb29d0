//! Thread-safe in-memory [`CredentialStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	store::{CredentialStore, StoreError, StoreFuture},
};

type StoreMap = Arc<RwLock<HashMap<String, String>>>;

/// Storage backend that keeps credentials in-process for tests and demos.
///
/// Clones share the same map, which lets a test simulate a process restart by handing the
/// same store to a fresh client.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Returns a copy of the value under `key` without going through the async contract.
	pub fn peek(&self, key: &str) -> Option<String> {
		self.0.read().get(key).cloned()
	}

	/// Returns the number of stored entries.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl CredentialStore for MemoryStore {
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
		let map = self.0.clone();

		Box::pin(async move { Ok::<_, StoreError>(map.read().get(key).cloned()) })
	}

	fn set<'a>(&'a self, key: &'a str, value: String) -> StoreFuture<'a, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().insert(key.to_owned(), value);

			Ok(())
		})
	}

	fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().remove(key);

			Ok(())
		})
	}
}
