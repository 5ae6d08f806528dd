use std::{collections::BTreeMap, future::Future, ops::RangeInclusive, sync::Arc};

use futures::{StreamExt, stream};

use crate::{ItemSource, ListPage};

/// Collects every identifier a user has listed under one sort key.
#[derive(Clone)]
pub struct PaginationFetcher {
	source: Arc<dyn ItemSource>,
	max_parallel_pages: usize,
	max_pages: u32,
}
impl PaginationFetcher {
	pub fn new(source: Arc<dyn ItemSource>, max_parallel_pages: usize, max_pages: u32) -> Self {
		Self { source, max_parallel_pages: max_parallel_pages.max(1), max_pages: max_pages.max(1) }
	}

	/// Returns identifiers ordered by page number, then by position within the page.
	///
	/// Pages `2..=N` are fetched concurrently, where `N` is the count advertised on page 1. Pages
	/// past `N` are then fetched one at a time until an empty page, since the advertised count can
	/// be stale. A failed fetch counts as an empty page.
	pub async fn fetch_all_identifiers(&self, user: &str, sort: &str) -> Vec<String> {
		let first = self.first_page(user, sort).await;
		let advertised = self.advertised_pages(&first);
		let mut pages = BTreeMap::from([(1, first.identifiers)]);

		if advertised > 1 {
			self.fetch_pages_concurrently(user, sort, 2..=advertised, &mut pages).await;
		}

		let mut page = advertised + 1;

		while page <= self.max_pages {
			let identifiers = fetch_page(self.source.as_ref(), user, sort, page).await;

			if identifiers.is_empty() {
				tracing::info!(user, page, "No more identifiers found.");

				break;
			}

			pages.insert(page, identifiers);

			page += 1;
		}

		if page > self.max_pages {
			tracing::warn!(user, max_pages = self.max_pages, "Stopped paging at the page ceiling.");
		}

		pages.into_values().flatten().collect()
	}

	/// Same result as [`Self::fetch_all_identifiers`], but pages are fetched one at a time and
	/// `gate` is awaited before every fetch.
	pub async fn fetch_all_identifiers_gated<G, Fut>(
		&self,
		user: &str,
		sort: &str,
		mut gate: G,
	) -> Vec<String>
	where
		G: FnMut() -> Fut,
		Fut: Future<Output = ()>,
	{
		gate().await;

		let first = self.first_page(user, sort).await;
		let advertised = self.advertised_pages(&first);
		let mut identifiers = first.identifiers;
		let mut page = 2;

		while page <= self.max_pages {
			gate().await;

			let listed = fetch_page(self.source.as_ref(), user, sort, page).await;

			// Within the advertised count an empty page keeps its place; past it, paging ends.
			if listed.is_empty() && page > advertised {
				tracing::info!(user, page, "No more identifiers found.");

				break;
			}

			identifiers.extend(listed);

			page += 1;
		}

		if page > self.max_pages {
			tracing::warn!(user, max_pages = self.max_pages, "Stopped paging at the page ceiling.");
		}

		identifiers
	}

	async fn first_page(&self, user: &str, sort: &str) -> ListPage {
		match self.source.list_page(user, sort, 1).await {
			Ok(page) => page,
			Err(err) => {
				tracing::warn!(error = %err, user, page = 1, "Page fetch failed.");

				ListPage::default()
			},
		}
	}

	fn advertised_pages(&self, first: &ListPage) -> u32 {
		first.total_pages.unwrap_or(1).clamp(1, self.max_pages)
	}

	async fn fetch_pages_concurrently(
		&self,
		user: &str,
		sort: &str,
		range: RangeInclusive<u32>,
		pages: &mut BTreeMap<u32, Vec<String>>,
	) {
		let source = self.source.as_ref();
		let fetched: Vec<(u32, Vec<String>)> = stream::iter(range.map(|page| async move {
			(page, fetch_page(source, user, sort, page).await)
		}))
		.buffer_unordered(self.max_parallel_pages)
		.collect()
		.await;

		pages.extend(fetched);
	}
}

async fn fetch_page(source: &dyn ItemSource, user: &str, sort: &str, page: u32) -> Vec<String> {
	match source.list_page(user, sort, page).await {
		Ok(listed) => listed.identifiers,
		Err(err) => {
			tracing::warn!(error = %err, user, page, "Page fetch failed.");

			Vec::new()
		},
	}
}
