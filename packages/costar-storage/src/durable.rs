use std::{collections::HashMap, sync::Arc};

use costar_config::{Storage, StorageBackend};
use costar_domain::ResolvedItem;

use crate::{Error, ItemStore, Result, db::Db, memory::MemoryStore, postgres::PgItemStore};

pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Cross-request item cache over an optional [`ItemStore`].
///
/// Every operation degrades instead of failing: a disabled cache always misses and drops writes,
/// and a failing store behaves like a miss for the affected chunk only.
#[derive(Clone)]
pub struct DurableCache {
	store: Option<Arc<dyn ItemStore>>,
	batch_size: usize,
}
impl DurableCache {
	pub fn new(store: Arc<dyn ItemStore>, batch_size: usize) -> Self {
		Self { store: Some(store), batch_size: batch_size.max(1) }
	}

	/// Builds the cache for the configured backend. A Postgres store that cannot be reached yields
	/// a disabled cache so the service still answers from the source.
	pub async fn open(cfg: &Storage) -> Self {
		match cfg.backend {
			StorageBackend::None => {
				tracing::info!("Durable cache disabled.");

				Self::disabled()
			},
			StorageBackend::Memory => {
				tracing::info!("Using in-memory durable cache.");

				Self::new(Arc::new(MemoryStore::new()), cfg.batch_size)
			},
			StorageBackend::Postgres => match connect_postgres(cfg).await {
				Ok(store) => {
					tracing::info!("Using Postgres durable cache.");

					Self::new(Arc::new(store), cfg.batch_size)
				},
				Err(err) => {
					tracing::error!(error = %err, "Failed to open Postgres, durable cache disabled.");

					Self::disabled()
				},
			},
		}
	}

	pub fn disabled() -> Self {
		Self { store: None, batch_size: DEFAULT_BATCH_SIZE }
	}

	pub fn is_enabled(&self) -> bool {
		self.store.is_some()
	}

	pub fn batch_size(&self) -> usize {
		self.batch_size
	}

	pub async fn batch_get(&self, identifiers: &[String]) -> HashMap<String, ResolvedItem> {
		self.batch_get_with(identifiers, |_| {}).await
	}

	/// Looks identifiers up in chunks of at most `batch_size`, calling `on_chunk` after each chunk
	/// with the number of positions in that chunk that are hits, duplicates included.
	pub async fn batch_get_with<F>(
		&self,
		identifiers: &[String],
		mut on_chunk: F,
	) -> HashMap<String, ResolvedItem>
	where
		F: FnMut(usize),
	{
		let mut hits = HashMap::new();
		let Some(store) = self.store.as_ref() else {
			return hits;
		};

		for (index, chunk) in identifiers.chunks(self.batch_size).enumerate() {
			match store.fetch_many(chunk).await {
				Ok(items) =>
					for item in items {
						hits.insert(item.identifier.clone(), item);
					},
				Err(err) => {
					tracing::warn!(error = %err, chunk = index, size = chunk.len(), "Durable cache chunk lookup failed.");
				},
			}

			on_chunk(chunk.iter().filter(|identifier| hits.contains_key(*identifier)).count());
		}

		tracing::info!(requested = identifiers.len(), hits = hits.len(), "Finished durable cache lookup.");

		hits
	}

	pub async fn get(&self, identifier: &str) -> Option<ResolvedItem> {
		let store = self.store.as_ref()?;

		match store.fetch_one(identifier).await {
			Ok(Some(item)) => {
				tracing::debug!(identifier, "Durable cache hit.");

				Some(item)
			},
			Ok(None) => None,
			Err(err) => {
				tracing::warn!(error = %err, identifier, "Durable cache lookup failed.");

				None
			},
		}
	}

	pub async fn put(&self, item: &ResolvedItem) {
		let Some(store) = self.store.as_ref() else {
			return;
		};

		tracing::debug!(identifier = %item.identifier, "Saving item to durable cache.");

		if let Err(err) = store.insert(item).await {
			tracing::warn!(error = %err, identifier = %item.identifier, "Durable cache write failed.");
		}
	}
}

async fn connect_postgres(cfg: &Storage) -> Result<PgItemStore> {
	let pg = cfg.postgres.as_ref().ok_or_else(|| {
		Error::InvalidArgument("storage.postgres is required for the postgres backend.".to_string())
	})?;
	let db = Db::connect(pg).await?;

	db.ensure_schema().await?;

	Ok(PgItemStore::new(db))
}
