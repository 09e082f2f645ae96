//! Thread-safe in-memory store implementing both [`TokenStore`] and [`ProfileCache`].

// self
use crate::{
	_prelude::*,
	store::{ProfileCache, StoreError, StoreFuture, TokenStore},
};

type StoreMap = Arc<RwLock<HashMap<String, MemoryEntry>>>;

#[derive(Clone, Debug)]
struct MemoryEntry {
	value: String,
	expires_at: Option<OffsetDateTime>,
}
impl MemoryEntry {
	fn is_live_at(&self, now: OffsetDateTime) -> bool {
		self.expires_at.is_none_or(|expires_at| now < expires_at)
	}
}

/// Storage backend that keeps values in-process for tests, demos, and single-node deployments.
///
/// Clones share the same map. Entries written through [`ProfileCache::put`] expire against the
/// wall clock; an expired entry is dropped when it is read, and every write sweeps all expired
/// entries so keys that are never read again do not accumulate.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Returns the number of entries currently held, including expired ones not yet evicted.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when the store holds no entries.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	fn get_now(map: &StoreMap, key: &str, now: OffsetDateTime) -> Option<String> {
		{
			let guard = map.read();

			match guard.get(key) {
				Some(entry) if entry.is_live_at(now) => return Some(entry.value.clone()),
				Some(_) => {},
				None => return None,
			}
		}

		let mut guard = map.write();

		// Another writer may have replaced the entry between the two locks.
		if guard.get(key).is_some_and(|entry| !entry.is_live_at(now)) {
			guard.remove(key);
		}

		guard.get(key).map(|entry| entry.value.clone())
	}

	fn put_now(
		map: &StoreMap,
		key: &str,
		value: String,
		expires_at: Option<OffsetDateTime>,
		now: OffsetDateTime,
	) {
		let mut guard = map.write();

		guard.retain(|_, entry| entry.is_live_at(now));
		guard.insert(key.to_owned(), MemoryEntry { value, expires_at });
	}
}
impl TokenStore for MemoryStore {
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
		Box::pin(async move { Ok(Self::get_now(&self.0, key, OffsetDateTime::now_utc())) })
	}

	fn put<'a>(&'a self, key: &'a str, value: String) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			Self::put_now(&self.0, key, value, None, OffsetDateTime::now_utc());

			Ok(())
		})
	}
}
impl ProfileCache for MemoryStore {
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
		Box::pin(async move { Ok(Self::get_now(&self.0, key, OffsetDateTime::now_utc())) })
	}

	fn put<'a>(&'a self, key: &'a str, value: String, ttl: Duration) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			let now = OffsetDateTime::now_utc();
			let expires_at = now.checked_add(ttl).ok_or_else(|| StoreError::Backend {
				message: format!("TTL {ttl} overflows the clock"),
			})?;

			Self::put_now(&self.0, key, value, Some(expires_at), now);

			Ok(())
		})
	}
}
