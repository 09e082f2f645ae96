//! Storage contracts for the persisted token chain and the profile response cache, plus the
//! built-in implementations.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::_prelude::*;

/// Key under which the serialized [`TokenChain`](crate::auth::TokenChain) is stored.
pub const TOKEN_CHAIN_KEY: &str = "cache";

/// Boxed future returned by store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Durable string storage for the serialized token chain.
///
/// Whole values are replaced on every `put`; concurrent writers race and the last one wins.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Returns the value stored under `key`, if any.
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>>;

	/// Stores or replaces the value under `key`.
	fn put<'a>(&'a self, key: &'a str, value: String) -> StoreFuture<'a, ()>;
}

/// Expiring string storage for profile lookup results.
pub trait ProfileCache
where
	Self: Send + Sync,
{
	/// Returns the unexpired value stored under `key`, if any.
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>>;

	/// Stores or replaces the value under `key` for `ttl`.
	fn put<'a>(&'a self, key: &'a str, value: String, ttl: Duration) -> StoreFuture<'a, ()>;
}

/// Error type produced by [`TokenStore`] and [`ProfileCache`] implementations.
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
