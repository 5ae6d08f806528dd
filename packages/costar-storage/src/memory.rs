use std::{
	collections::{HashMap, hash_map::Entry},
	sync::RwLock,
};

use costar_domain::ResolvedItem;

use crate::{BoxFuture, ItemStore, Result};

/// Process-local store, used when no database is configured and in tests.
#[derive(Default)]
pub struct MemoryStore {
	items: RwLock<HashMap<String, ResolvedItem>>,
}
impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_items(items: impl IntoIterator<Item = ResolvedItem>) -> Self {
		let items = items.into_iter().map(|item| (item.identifier.clone(), item)).collect();

		Self { items: RwLock::new(items) }
	}

	pub fn len(&self) -> usize {
		self.items.read().unwrap_or_else(|err| err.into_inner()).len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn contains(&self, identifier: &str) -> bool {
		self.items.read().unwrap_or_else(|err| err.into_inner()).contains_key(identifier)
	}
}
impl ItemStore for MemoryStore {
	fn fetch_many<'a>(&'a self, identifiers: &'a [String]) -> BoxFuture<'a, Result<Vec<ResolvedItem>>> {
		let items = self.items.read().unwrap_or_else(|err| err.into_inner());
		let hits = identifiers.iter().filter_map(|identifier| items.get(identifier).cloned()).collect();

		Box::pin(async move { Ok(hits) })
	}

	fn fetch_one<'a>(&'a self, identifier: &'a str) -> BoxFuture<'a, Result<Option<ResolvedItem>>> {
		let hit = self.items.read().unwrap_or_else(|err| err.into_inner()).get(identifier).cloned();

		Box::pin(async move { Ok(hit) })
	}

	fn insert<'a>(&'a self, item: &'a ResolvedItem) -> BoxFuture<'a, Result<()>> {
		let mut items = self.items.write().unwrap_or_else(|err| err.into_inner());

		if let Entry::Vacant(entry) = items.entry(item.identifier.clone()) {
			entry.insert(item.clone());
		}

		Box::pin(async move { Ok(()) })
	}
}
