//! Size- and TTL-bounded cache of ranked query results.
//!
//! The sum of stored entry sizes never exceeds the configured capacity. Expired entries read as
//! absent before they are physically removed. When room is needed, expired entries go first and
//! then the oldest insertions.

use std::{
	collections::{BTreeMap, HashMap},
	mem,
	sync::{Arc, RwLock},
	time::Duration,
};

use tokio::time::Instant;

use costar_domain::{Appearance, ParticipantSummary};

pub type CachedResult = Arc<Vec<ParticipantSummary>>;

struct Entry {
	value: CachedResult,
	expires_at: Instant,
	size: usize,
	seq: u64,
}
impl Entry {
	fn is_expired(&self, now: Instant) -> bool {
		self.expires_at <= now
	}
}

#[derive(Default)]
struct Inner {
	entries: HashMap<String, Entry>,
	/// Insertion sequence to key; the first entry is the oldest insertion.
	order: BTreeMap<u64, String>,
	total_size: usize,
	next_seq: u64,
}
impl Inner {
	fn remove(&mut self, key: &str) -> Option<Entry> {
		let entry = self.entries.remove(key)?;

		self.order.remove(&entry.seq);
		self.total_size -= entry.size;

		Some(entry)
	}

	fn remove_expired(&mut self, now: Instant) -> usize {
		let expired: Vec<String> = self
			.entries
			.iter()
			.filter(|(_, entry)| entry.is_expired(now))
			.map(|(key, _)| key.clone())
			.collect();

		for key in &expired {
			self.remove(key);
		}

		expired.len()
	}

	fn remove_oldest(&mut self) -> Option<Entry> {
		let (_, key) = self.order.pop_first()?;
		let entry = self.entries.remove(&key)?;

		self.total_size -= entry.size;

		Some(entry)
	}
}

pub struct QueryCache {
	inner: RwLock<Inner>,
	capacity: usize,
}
impl QueryCache {
	pub fn new(capacity: usize) -> Self {
		Self { inner: RwLock::new(Inner::default()), capacity }
	}

	pub fn capacity(&self) -> usize {
		self.capacity
	}

	/// Stores `value` for `ttl`, returning false when the value alone is larger than the capacity.
	pub fn set(&self, key: String, value: CachedResult, ttl: Duration) -> bool {
		let size = approximate_size(&value);

		if size > self.capacity {
			tracing::info!(key = %key, size, capacity = self.capacity, "Value too large for query cache.");

			return false;
		}

		let mut inner = self.inner.write().unwrap_or_else(|err| err.into_inner());
		let now = Instant::now();

		inner.remove(&key);

		if inner.total_size + size > self.capacity {
			let expired = inner.remove_expired(now);

			tracing::debug!(expired, "Evicted expired query cache entries to make room.");
		}

		while inner.total_size + size > self.capacity {
			let Some(evicted) = inner.remove_oldest() else {
				break;
			};

			tracing::debug!(size = evicted.size, "Evicted oldest query cache entry to make room.");
		}

		let seq = inner.next_seq;

		inner.next_seq += 1;
		inner.order.insert(seq, key.clone());
		inner.entries.insert(key, Entry { value, expires_at: now + ttl, size, seq });
		inner.total_size += size;

		tracing::info!(
			items = inner.entries.len(),
			total_size = inner.total_size,
			"Query cache updated."
		);

		true
	}

	pub fn get(&self, key: &str) -> Option<CachedResult> {
		let inner = self.inner.read().unwrap_or_else(|err| err.into_inner());
		let entry = inner.entries.get(key)?;

		if entry.is_expired(Instant::now()) {
			return None;
		}

		Some(entry.value.clone())
	}

	/// Removes every expired entry and returns how many were dropped.
	pub fn evict(&self) -> usize {
		let mut inner = self.inner.write().unwrap_or_else(|err| err.into_inner());

		inner.remove_expired(Instant::now())
	}

	pub fn clear(&self) {
		*self.inner.write().unwrap_or_else(|err| err.into_inner()) = Inner::default();
	}

	pub fn len(&self) -> usize {
		self.inner.read().unwrap_or_else(|err| err.into_inner()).entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn total_size(&self) -> usize {
		self.inner.read().unwrap_or_else(|err| err.into_inner()).total_size
	}

	pub fn contains(&self, key: &str) -> bool {
		self.inner.read().unwrap_or_else(|err| err.into_inner()).entries.contains_key(key)
	}
}

/// Fixed per-record overhead plus the length of every string, summed over nested records.
pub fn approximate_size(value: &[ParticipantSummary]) -> usize {
	value
		.iter()
		.map(|summary| {
			let appearances: usize = summary
				.appearances
				.iter()
				.map(|appearance| {
					mem::size_of::<Appearance>()
						+ appearance.identifier.len()
						+ appearance.title.len()
						+ appearance.role.len()
				})
				.sum();

			mem::size_of::<ParticipantSummary>() + summary.name.len() + appearances
		})
		.sum()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn summaries(name: &str, appearances: usize) -> CachedResult {
		let appearances = (0..appearances)
			.map(|index| Appearance {
				identifier: format!("film-{index}"),
				title: format!("Film {index}"),
				role: "Lead".to_string(),
			})
			.collect();

		Arc::new(vec![ParticipantSummary { name: name.to_string(), appearances }])
	}

	#[test]
	fn size_counts_every_string() {
		let value = summaries("Ab", 1);
		let expected = mem::size_of::<ParticipantSummary>()
			+ 2 + mem::size_of::<Appearance>()
			+ "film-0".len()
			+ "Film 0".len()
			+ "Lead".len();

		assert_eq!(approximate_size(&value), expected);
		assert_eq!(approximate_size(&[]), 0);
	}

	#[test]
	fn rejects_value_larger_than_capacity() {
		let value = summaries("X", 3);
		let cache = QueryCache::new(approximate_size(&value) - 1);

		assert!(!cache.set("k".to_string(), value, Duration::from_secs(60)));
		assert!(cache.is_empty());
		assert_eq!(cache.total_size(), 0);
	}

	#[test]
	fn accepts_value_exactly_at_capacity() {
		let value = summaries("X", 3);
		let cache = QueryCache::new(approximate_size(&value));

		assert!(cache.set("k".to_string(), value, Duration::from_secs(60)));
		assert_eq!(cache.total_size(), cache.capacity());
	}

	#[test]
	fn overwrite_replaces_size_accounting() {
		let small = summaries("X", 1);
		let large = summaries("X", 4);
		let cache = QueryCache::new(10_000);

		cache.set("k".to_string(), small, Duration::from_secs(60));
		cache.set("k".to_string(), large.clone(), Duration::from_secs(60));

		assert_eq!(cache.len(), 1);
		assert_eq!(cache.total_size(), approximate_size(&large));
	}

	#[test]
	fn evicts_oldest_insertion_when_nothing_expired() {
		let value = summaries("X", 1);
		let size = approximate_size(&value);
		let cache = QueryCache::new(size * 2);

		cache.set("a".to_string(), value.clone(), Duration::from_secs(60));
		cache.set("b".to_string(), value.clone(), Duration::from_secs(60));
		cache.set("c".to_string(), value, Duration::from_secs(60));

		assert!(!cache.contains("a"));
		assert!(cache.get("b").is_some());
		assert!(cache.get("c").is_some());
		assert_eq!(cache.total_size(), size * 2);
	}

	#[test]
	fn zero_ttl_entry_reads_as_absent_until_evicted() {
		let cache = QueryCache::new(10_000);

		cache.set("k".to_string(), summaries("X", 1), Duration::ZERO);

		assert!(cache.get("k").is_none());
		assert!(cache.contains("k"));
		assert_eq!(cache.evict(), 1);
		assert!(!cache.contains("k"));
		assert_eq!(cache.total_size(), 0);
	}
}
