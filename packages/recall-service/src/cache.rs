//! Semantic result cache keyed by `(owner_id, query fingerprint)`.
//!
//! Bounded capacity with least-recently-accessed eviction; both hits and
//! inserts bump recency. An optional TTL expires entries independently of
//! capacity. The cache never decides consistency on its own: the lifecycle
//! operations call [`SemanticCache::invalidate_all`] before acknowledging a
//! deletion.
//!
//! Each owner carries an invalidation generation. Readers snapshot it with
//! [`SemanticCache::generation`] before hitting the store and hand it back
//! to [`SemanticCache::put`]; an invalidation in between bumps the counter
//! and the stale insert is dropped, so a query racing a deletion can never
//! re-cache hits for already-deleted memories.

use std::{
	collections::HashMap,
	sync::Mutex,
	time::{Duration, Instant},
};

use recall_storage::models::SearchHit;

type Key = (String, String);

struct Entry {
	hits: Vec<SearchHit>,
	inserted_at: Instant,
	last_access: u64,
}

struct Inner {
	entries: HashMap<Key, Entry>,
	generations: HashMap<String, u64>,
	tick: u64,
}

pub struct SemanticCache {
	inner: Mutex<Inner>,
	enabled: bool,
	capacity: usize,
	ttl: Option<Duration>,
}
impl SemanticCache {
	pub fn new(cfg: &recall_config::Cache) -> Self {
		Self {
			inner: Mutex::new(Inner {
				entries: HashMap::new(),
				generations: HashMap::new(),
				tick: 0,
			}),
			enabled: cfg.enabled,
			capacity: cfg.capacity as usize,
			ttl: (cfg.ttl_secs > 0).then(|| Duration::from_secs(cfg.ttl_secs)),
		}
	}

	pub fn get(&self, owner_id: &str, fingerprint: &str) -> Option<Vec<SearchHit>> {
		if !self.enabled {
			return None;
		}

		let key = (owner_id.to_string(), fingerprint.to_string());
		let mut inner = self.lock();

		if let Some(entry) = inner.entries.get(&key)
			&& let Some(ttl) = self.ttl
			&& entry.inserted_at.elapsed() >= ttl
		{
			inner.entries.remove(&key);

			return None;
		}

		inner.tick += 1;

		let tick = inner.tick;
		let entry = inner.entries.get_mut(&key)?;

		entry.last_access = tick;

		Some(entry.hits.clone())
	}

	/// The owner's current invalidation generation. Snapshot it before the
	/// store read that produces the hits handed to [`SemanticCache::put`].
	pub fn generation(&self, owner_id: &str) -> u64 {
		self.lock().generations.get(owner_id).copied().unwrap_or(0)
	}

	pub fn put(&self, owner_id: &str, fingerprint: &str, hits: Vec<SearchHit>, generation: u64) {
		if !self.enabled || self.capacity == 0 {
			return;
		}

		let key = (owner_id.to_string(), fingerprint.to_string());
		let mut inner = self.lock();

		// The hits predate an invalidation for this owner; caching them
		// would resurrect deleted memories.
		if inner.generations.get(owner_id).copied().unwrap_or(0) != generation {
			return;
		}
		if !inner.entries.contains_key(&key) && inner.entries.len() >= self.capacity {
			let victim = inner
				.entries
				.iter()
				.min_by_key(|(_, entry)| entry.last_access)
				.map(|(key, _)| key.clone());

			if let Some(victim) = victim {
				inner.entries.remove(&victim);
			}
		}

		inner.tick += 1;

		let entry = Entry { hits, inserted_at: Instant::now(), last_access: inner.tick };

		inner.entries.insert(key, entry);
	}

	/// Drops one cached query for the owner.
	pub fn invalidate(&self, owner_id: &str, fingerprint: &str) -> bool {
		let key = (owner_id.to_string(), fingerprint.to_string());
		let mut inner = self.lock();

		*inner.generations.entry(owner_id.to_string()).or_insert(0) += 1;

		inner.entries.remove(&key).is_some()
	}

	/// Drops every cached entry for the owner; returns how many were held.
	pub fn invalidate_all(&self, owner_id: &str) -> usize {
		let mut inner = self.lock();
		let before = inner.entries.len();

		inner.entries.retain(|(owner, _), _| owner != owner_id);
		*inner.generations.entry(owner_id.to_string()).or_insert(0) += 1;

		before - inner.entries.len()
	}

	pub fn owner_entries(&self, owner_id: &str) -> usize {
		self.lock().entries.keys().filter(|(owner, _)| owner == owner_id).count()
	}

	pub fn len(&self) -> usize {
		self.lock().entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
		self.inner.lock().unwrap_or_else(|err| err.into_inner())
	}

	#[cfg(test)]
	fn backdate(&self, owner_id: &str, fingerprint: &str, by: Duration) {
		let key = (owner_id.to_string(), fingerprint.to_string());
		let mut inner = self.lock();

		if let Some(entry) = inner.entries.get_mut(&key) {
			entry.inserted_at -= by;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn cache(capacity: u32, ttl_secs: u64) -> SemanticCache {
		SemanticCache::new(&recall_config::Cache { enabled: true, capacity, ttl_secs })
	}

	#[test]
	fn overflow_evicts_the_least_recently_accessed_entry() {
		let cache = cache(2, 0);

		cache.put("alice", "a", Vec::new(), 0);
		cache.put("alice", "b", Vec::new(), 0);

		// Touch "a" so "b" becomes the eviction candidate.
		assert!(cache.get("alice", "a").is_some());

		cache.put("alice", "c", Vec::new(), 0);

		assert!(cache.get("alice", "a").is_some());
		assert!(cache.get("alice", "b").is_none());
		assert!(cache.get("alice", "c").is_some());
		assert_eq!(cache.len(), 2);
	}

	#[test]
	fn reinserting_an_existing_key_does_not_evict() {
		let cache = cache(2, 0);

		cache.put("alice", "a", Vec::new(), 0);
		cache.put("alice", "b", Vec::new(), 0);
		cache.put("alice", "a", Vec::new(), 0);

		assert_eq!(cache.len(), 2);
		assert!(cache.get("alice", "b").is_some());
	}

	#[test]
	fn ttl_expires_entries_independently_of_capacity() {
		let cache = cache(8, 60);

		cache.put("alice", "a", Vec::new(), 0);
		cache.backdate("alice", "a", Duration::from_secs(61));

		assert!(cache.get("alice", "a").is_none());
		assert_eq!(cache.len(), 0);
	}

	#[test]
	fn single_entry_invalidation_leaves_the_rest() {
		let cache = cache(8, 0);

		cache.put("alice", "a", Vec::new(), 0);
		cache.put("alice", "b", Vec::new(), 0);

		assert!(cache.invalidate("alice", "a"));
		assert!(!cache.invalidate("alice", "a"));
		assert!(cache.get("alice", "b").is_some());
	}

	#[test]
	fn invalidation_is_scoped_to_the_owner() {
		let cache = cache(8, 0);

		cache.put("alice", "a", Vec::new(), 0);
		cache.put("alice", "b", Vec::new(), 0);
		cache.put("bob", "a", Vec::new(), 0);

		assert_eq!(cache.invalidate_all("alice"), 2);
		assert_eq!(cache.owner_entries("alice"), 0);
		assert!(cache.get("bob", "a").is_some());
	}

	#[test]
	fn a_put_from_before_an_invalidation_is_discarded() {
		let cache = cache(8, 0);
		let stale = cache.generation("alice");

		cache.invalidate_all("alice");
		cache.put("alice", "a", Vec::new(), stale);

		assert!(cache.get("alice", "a").is_none());

		cache.put("alice", "a", Vec::new(), cache.generation("alice"));

		assert!(cache.get("alice", "a").is_some());
	}

	#[test]
	fn disabled_cache_never_stores() {
		let cache =
			SemanticCache::new(&recall_config::Cache { enabled: false, capacity: 8, ttl_secs: 0 });

		cache.put("alice", "a", Vec::new(), 0);

		assert!(cache.get("alice", "a").is_none());
		assert!(cache.is_empty());
	}
}
