use std::sync::{
	Mutex,
	atomic::{AtomicUsize, Ordering},
};

use costar_domain::ResolvedItem;
use costar_storage::{BoxFuture, Error, ItemStore, Result, memory::MemoryStore};

/// In-memory [`ItemStore`] that records every call and can fail on demand.
#[derive(Default)]
pub struct CountingStore {
	inner: MemoryStore,
	fail_chunk_containing: Option<String>,
	unavailable: bool,
	chunk_sizes: Mutex<Vec<usize>>,
	fetch_one_calls: AtomicUsize,
	insert_calls: AtomicUsize,
}
impl CountingStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_items(items: impl IntoIterator<Item = ResolvedItem>) -> Self {
		Self { inner: MemoryStore::with_items(items), ..Self::default() }
	}

	/// Fails every `fetch_many` whose chunk includes `identifier`.
	pub fn fail_chunk_containing(mut self, identifier: &str) -> Self {
		self.fail_chunk_containing = Some(identifier.to_string());

		self
	}

	/// Fails every call.
	pub fn unavailable(mut self) -> Self {
		self.unavailable = true;

		self
	}

	/// Sizes of the identifier slices passed to `fetch_many`, in call order.
	pub fn chunk_sizes(&self) -> Vec<usize> {
		self.chunk_sizes.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}

	pub fn fetch_many_calls(&self) -> usize {
		self.chunk_sizes.lock().unwrap_or_else(|err| err.into_inner()).len()
	}

	pub fn fetch_one_calls(&self) -> usize {
		self.fetch_one_calls.load(Ordering::SeqCst)
	}

	pub fn insert_calls(&self) -> usize {
		self.insert_calls.load(Ordering::SeqCst)
	}

	/// Total store calls of any kind.
	pub fn calls(&self) -> usize {
		self.fetch_many_calls() + self.fetch_one_calls() + self.insert_calls()
	}

	pub fn contains(&self, identifier: &str) -> bool {
		self.inner.contains(identifier)
	}

	pub fn len(&self) -> usize {
		self.inner.len()
	}

	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}
}
impl ItemStore for CountingStore {
	fn fetch_many<'a>(&'a self, identifiers: &'a [String]) -> BoxFuture<'a, Result<Vec<ResolvedItem>>> {
		Box::pin(async move {
			self.chunk_sizes.lock().unwrap_or_else(|err| err.into_inner()).push(identifiers.len());

			if self.unavailable {
				return Err(Error::Unavailable("store is down".to_string()));
			}
			if let Some(poison) = self.fail_chunk_containing.as_ref()
				&& identifiers.contains(poison)
			{
				return Err(Error::Unavailable(format!("chunk containing {poison} failed")));
			}

			self.inner.fetch_many(identifiers).await
		})
	}

	fn fetch_one<'a>(&'a self, identifier: &'a str) -> BoxFuture<'a, Result<Option<ResolvedItem>>> {
		Box::pin(async move {
			self.fetch_one_calls.fetch_add(1, Ordering::SeqCst);

			if self.unavailable {
				return Err(Error::Unavailable("store is down".to_string()));
			}

			self.inner.fetch_one(identifier).await
		})
	}

	fn insert<'a>(&'a self, item: &'a ResolvedItem) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			self.insert_calls.fetch_add(1, Ordering::SeqCst);

			if self.unavailable {
				return Err(Error::Unavailable("store is down".to_string()));
			}

			self.inner.insert(item).await
		})
	}
}
