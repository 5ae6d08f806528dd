use std::{collections::HashMap, pin::pin, sync::Arc, time::Instant};

use futures::{StreamExt, stream};

use costar_domain::ResolvedItem;
use costar_storage::DurableCache;

use crate::{ItemSource, Progress, ProgressSink};

/// Turns identifiers into items, durable cache first, source second.
#[derive(Clone)]
pub struct ItemResolver {
	durable: DurableCache,
	source: Arc<dyn ItemSource>,
	max_concurrent_fetches: usize,
}
impl ItemResolver {
	pub fn new(durable: DurableCache, source: Arc<dyn ItemSource>, max_concurrent_fetches: usize) -> Self {
		Self { durable, source, max_concurrent_fetches: max_concurrent_fetches.max(1) }
	}

	/// Resolves `identifiers` and returns items in the same order.
	///
	/// Misses are fetched from the source and written through to the durable cache. An item the
	/// source cannot produce is returned as a placeholder and is not cached. When `progress` is
	/// given it receives the total and a running count of resolved input positions, updated after
	/// every cache chunk and every fresh fetch. The last update equals the total.
	pub async fn resolve(
		&self,
		identifiers: &[String],
		progress: Option<&dyn ProgressSink>,
	) -> Vec<ResolvedItem> {
		let started = Instant::now();
		let mut done = 0;

		if let Some(sink) = progress {
			sink.emit(Progress::Total(identifiers.len()));
		}

		let mut resolved = self
			.durable
			.batch_get_with(identifiers, |hits| {
				done += hits;

				if let Some(sink) = progress {
					sink.emit(Progress::Progress(done));
				}
			})
			.await;
		// Missed identifier to the number of input positions it fills.
		let mut positions: HashMap<&str, usize> = HashMap::new();
		let mut misses = Vec::new();

		for identifier in identifiers.iter().filter(|identifier| !resolved.contains_key(*identifier)) {
			let count = positions.entry(identifier.as_str()).or_default();

			if *count == 0 {
				misses.push(identifier.clone());
			}

			*count += 1;
		}

		tracing::info!(
			requested = identifiers.len(),
			hits = resolved.len(),
			misses = misses.len(),
			"Resolving items."
		);

		let source = self.source.as_ref();
		let durable = &self.durable;
		let mut fetches = pin!(
			stream::iter(misses.into_iter().map(|identifier| async move {
				let item = fetch_and_store(source, durable, &identifier).await;

				(identifier, item)
			}))
			.buffer_unordered(self.max_concurrent_fetches)
		);

		while let Some((identifier, item)) = fetches.next().await {
			done += positions.get(identifier.as_str()).copied().unwrap_or(1);

			resolved.insert(identifier, item);

			if let Some(sink) = progress {
				sink.emit(Progress::Progress(done));
			}
		}

		tracing::info!(elapsed_ms = started.elapsed().as_millis() as u64, "Finished resolving items.");

		identifiers
			.iter()
			.map(|identifier| {
				resolved.get(identifier).cloned().unwrap_or_else(|| ResolvedItem::placeholder(identifier))
			})
			.collect()
	}
}

async fn fetch_and_store(
	source: &dyn ItemSource,
	durable: &DurableCache,
	identifier: &str,
) -> ResolvedItem {
	match source.fetch_item(identifier).await {
		Ok(mut item) => {
			tracing::info!(identifier, "Item cache miss, fetched from source.");

			if item.identifier != identifier {
				item.identifier = identifier.to_string();
			}

			durable.put(&item).await;

			item
		},
		Err(err) => {
			tracing::warn!(error = %err, identifier, "Item fetch failed, using placeholder.");

			ResolvedItem::placeholder(identifier)
		},
	}
}
