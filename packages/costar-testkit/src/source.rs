use std::{
	collections::{HashMap, HashSet},
	sync::{
		Mutex,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};

use color_eyre::eyre;

use costar_domain::{Credit, ResolvedItem};
use costar_service::{BoxFuture, ItemSource, ListPage};

/// Scripted [`ItemSource`] with per-page latency, injected failures, and call counters.
#[derive(Default)]
pub struct FakeSource {
	pages: HashMap<String, Vec<Vec<String>>>,
	advertised: HashMap<String, u32>,
	page_delays: HashMap<(String, u32), Duration>,
	items: HashMap<String, ResolvedItem>,
	item_delay: Option<Duration>,
	failing_items: HashSet<String>,
	failing_pages: HashSet<(String, u32)>,
	related: HashMap<String, Vec<String>>,
	page_calls: AtomicUsize,
	item_calls: AtomicUsize,
	related_calls: AtomicUsize,
	fetched_items: Mutex<Vec<String>>,
}
impl FakeSource {
	pub fn new() -> Self {
		Self::default()
	}

	/// Lists `pages` for `user`; page 1 advertises `pages.len()` unless [`Self::advertise`] says
	/// otherwise.
	pub fn with_pages(mut self, user: &str, pages: &[&[&str]]) -> Self {
		let pages = pages
			.iter()
			.map(|page| page.iter().map(|identifier| identifier.to_string()).collect())
			.collect();

		self.pages.insert(user.to_string(), pages);

		self
	}

	pub fn advertise(mut self, user: &str, total_pages: u32) -> Self {
		self.advertised.insert(user.to_string(), total_pages);

		self
	}

	pub fn delay_page(mut self, user: &str, page: u32, delay: Duration) -> Self {
		self.page_delays.insert((user.to_string(), page), delay);

		self
	}

	pub fn fail_page(mut self, user: &str, page: u32) -> Self {
		self.failing_pages.insert((user.to_string(), page));

		self
	}

	pub fn with_item(mut self, identifier: &str, title: &str, credits: &[(&str, &str)]) -> Self {
		let credits = credits.iter().map(|(name, role)| Credit::new(*name, *role)).collect();

		self.items.insert(identifier.to_string(), ResolvedItem::new(identifier, title, credits));

		self
	}

	pub fn delay_items(mut self, delay: Duration) -> Self {
		self.item_delay = Some(delay);

		self
	}

	pub fn fail_item(mut self, identifier: &str) -> Self {
		self.failing_items.insert(identifier.to_string());

		self
	}

	pub fn with_related(mut self, user: &str, related: &[&str]) -> Self {
		self.related
			.insert(user.to_string(), related.iter().map(|user| user.to_string()).collect());

		self
	}

	pub fn page_calls(&self) -> usize {
		self.page_calls.load(Ordering::SeqCst)
	}

	pub fn item_calls(&self) -> usize {
		self.item_calls.load(Ordering::SeqCst)
	}

	pub fn related_calls(&self) -> usize {
		self.related_calls.load(Ordering::SeqCst)
	}

	/// Identifiers passed to `fetch_item`, in call order.
	pub fn fetched_items(&self) -> Vec<String> {
		self.fetched_items.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}
}
impl ItemSource for FakeSource {
	fn list_page<'a>(
		&'a self,
		user: &'a str,
		_sort: &'a str,
		page: u32,
	) -> BoxFuture<'a, color_eyre::Result<ListPage>> {
		Box::pin(async move {
			self.page_calls.fetch_add(1, Ordering::SeqCst);

			if let Some(delay) = self.page_delays.get(&(user.to_string(), page)) {
				tokio::time::sleep(*delay).await;
			}
			if self.failing_pages.contains(&(user.to_string(), page)) {
				return Err(eyre::eyre!("Page {page} for {user} is unavailable."));
			}

			let pages = self.pages.get(user);
			let identifiers = pages
				.and_then(|pages| pages.get(page as usize - 1))
				.cloned()
				.unwrap_or_default();
			let total_pages = (page == 1).then(|| {
				self.advertised
					.get(user)
					.copied()
					.unwrap_or_else(|| pages.map_or(0, |pages| pages.len() as u32))
			});

			Ok(ListPage { identifiers, total_pages })
		})
	}

	fn fetch_item<'a>(&'a self, identifier: &'a str) -> BoxFuture<'a, color_eyre::Result<ResolvedItem>> {
		Box::pin(async move {
			self.item_calls.fetch_add(1, Ordering::SeqCst);
			self.fetched_items
				.lock()
				.unwrap_or_else(|err| err.into_inner())
				.push(identifier.to_string());

			if let Some(delay) = self.item_delay {
				tokio::time::sleep(delay).await;
			}
			if self.failing_items.contains(identifier) {
				return Err(eyre::eyre!("Item {identifier} is unavailable."));
			}

			self.items
				.get(identifier)
				.cloned()
				.ok_or_else(|| eyre::eyre!("Item {identifier} is unknown."))
		})
	}

	fn list_related_users<'a>(&'a self, user: &'a str) -> BoxFuture<'a, color_eyre::Result<Vec<String>>> {
		Box::pin(async move {
			self.related_calls.fetch_add(1, Ordering::SeqCst);

			Ok(self.related.get(user).cloned().unwrap_or_default())
		})
	}
}
