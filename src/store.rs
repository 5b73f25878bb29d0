//! Durable credential storage contracts and built-in store implementations.
//!
//! The session treats a [`CredentialStore`] as an opaque string key/value capability. A missing
//! key is an expected state (unauthenticated), and every failure is reported as a
//! [`StoreError`] that the session contains locally.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::_prelude::*;

/// Boxed future returned by [`CredentialStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Secure key/value backend that survives process restarts.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Reads the value stored under `key`, if present.
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>>;

	/// Persists or replaces the value stored under `key`.
	fn set<'a>(&'a self, key: &'a str, value: String) -> StoreFuture<'a, ()>;

	/// Removes the value stored under `key`; deleting a missing key succeeds.
	fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()>;
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Storage operation labels used when reporting contained failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreOp {
	/// `get`
	Read,
	/// `set`
	Write,
	/// `delete`
	Delete,
}
impl StoreOp {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			StoreOp::Read => "read",
			StoreOp::Write => "write",
			StoreOp::Delete => "delete",
		}
	}
}
impl Display for StoreOp {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
