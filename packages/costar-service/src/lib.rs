pub mod fingerprint;
pub mod pagination;
pub mod precache;
pub mod query;
pub mod query_cache;
pub mod resolver;

mod error;

pub use costar_providers::ListPage;
pub use costar_storage::BoxFuture;
pub use error::{Error, Result};
pub use pagination::PaginationFetcher;
pub use precache::{Precache, RequestGuard};
pub use query::{QueryRequest, QueryResponse};
pub use query_cache::QueryCache;
pub use resolver::ItemResolver;

use std::{sync::Arc, time::Duration};

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use costar_config::Config;
use costar_domain::ResolvedItem;
use costar_providers::LetterboxdClient;
use costar_storage::DurableCache;

/// Where identifiers and participant credits come from.
pub trait ItemSource
where
	Self: Send + Sync,
{
	fn list_page<'a>(
		&'a self,
		user: &'a str,
		sort: &'a str,
		page: u32,
	) -> BoxFuture<'a, color_eyre::Result<ListPage>>;

	fn fetch_item<'a>(&'a self, identifier: &'a str) -> BoxFuture<'a, color_eyre::Result<ResolvedItem>>;

	fn list_related_users<'a>(&'a self, user: &'a str) -> BoxFuture<'a, color_eyre::Result<Vec<String>>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Progress {
	Total(usize),
	Progress(usize),
}

/// Receives one `Total` followed by non-decreasing `Progress` counts.
pub trait ProgressSink
where
	Self: Send + Sync,
{
	fn emit(&self, event: Progress);
}
impl ProgressSink for UnboundedSender<Progress> {
	fn emit(&self, event: Progress) {
		// A closed receiver means the caller stopped listening; the query still completes.
		let _ = self.send(event);
	}
}

pub struct DefaultSource {
	client: LetterboxdClient,
}
impl DefaultSource {
	pub fn new(cfg: &costar_config::Source) -> Result<Self> {
		Ok(Self { client: LetterboxdClient::new(cfg)? })
	}
}
impl ItemSource for DefaultSource {
	fn list_page<'a>(
		&'a self,
		user: &'a str,
		sort: &'a str,
		page: u32,
	) -> BoxFuture<'a, color_eyre::Result<ListPage>> {
		Box::pin(async move { Ok(self.client.list_page(user, sort, page).await?) })
	}

	fn fetch_item<'a>(&'a self, identifier: &'a str) -> BoxFuture<'a, color_eyre::Result<ResolvedItem>> {
		Box::pin(async move {
			let film = self.client.fetch_film(identifier).await?;

			Ok(ResolvedItem::new(identifier, film.title, film.credits))
		})
	}

	fn list_related_users<'a>(&'a self, user: &'a str) -> BoxFuture<'a, color_eyre::Result<Vec<String>>> {
		Box::pin(async move { Ok(self.client.list_following(user).await?) })
	}
}

pub struct CostarService {
	pub cfg: Config,
	pub durable: DurableCache,
	pub query_cache: Option<QueryCache>,
	pub source: Arc<dyn ItemSource>,
	pub pagination: PaginationFetcher,
	pub resolver: ItemResolver,
	pub precache: Precache,
}
impl CostarService {
	pub fn new(cfg: Config, durable: DurableCache) -> Result<Self> {
		let source = Arc::new(DefaultSource::new(&cfg.source)?);

		Ok(Self::with_source(cfg, durable, source))
	}

	pub fn with_source(cfg: Config, durable: DurableCache, source: Arc<dyn ItemSource>) -> Self {
		let pagination = PaginationFetcher::new(
			source.clone(),
			cfg.pagination.max_parallel_pages,
			cfg.pagination.max_pages,
		);
		let resolver =
			ItemResolver::new(durable.clone(), source.clone(), cfg.resolver.max_concurrent_fetches);
		let query_cache = cfg
			.query_cache
			.enabled
			.then(|| QueryCache::new(cfg.query_cache.capacity_bytes));
		let precache = Precache::new(
			durable.clone(),
			source.clone(),
			pagination.clone(),
			cfg.precache.sort.clone(),
			cfg.precache.enabled,
		);

		Self { cfg, durable, query_cache, source, pagination, resolver, precache }
	}

	pub fn query_cache_ttl(&self) -> Duration {
		Duration::from_secs(self.cfg.query_cache.ttl_seconds)
	}
}
