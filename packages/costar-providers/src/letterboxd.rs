use std::{sync::Arc, time::Duration};

use reqwest::{
	Client,
	header::{HeaderMap, HeaderValue, USER_AGENT},
};
use tokio::sync::Semaphore;

use costar_domain::Credit;

use crate::{Error, Result, html::Extractor};

const DEFAULT_USER_AGENT: &str = concat!("costar/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
	pub identifiers: Vec<String>,
	/// Only meaningful on the first page, and possibly stale by the time later pages are read.
	pub total_pages: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Film {
	pub title: String,
	pub credits: Vec<Credit>,
}

pub struct LetterboxdClient {
	http: Client,
	base_url: String,
	permits: Arc<Semaphore>,
	extractor: Extractor,
}
impl LetterboxdClient {
	pub fn new(cfg: &costar_config::Source) -> Result<Self> {
		let mut headers = HeaderMap::new();
		let agent = cfg.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);

		headers.insert(USER_AGENT, HeaderValue::from_str(agent)?);

		let http = Client::builder()
			.timeout(Duration::from_millis(cfg.timeout_ms))
			.default_headers(headers)
			.build()?;
		let extractor = Extractor::new()
			.map_err(|err| Error::InvalidConfig { message: format!("Invalid pattern: {err}") })?;

		Ok(Self {
			http,
			base_url: cfg.base_url.trim_end_matches('/').to_string(),
			permits: Arc::new(Semaphore::new(cfg.max_concurrent_requests.max(1))),
			extractor,
		})
	}

	pub async fn list_page(&self, user: &str, sort: &str, page: u32) -> Result<ListPage> {
		let url = format!("{}/{user}/films/by/{sort}/page/{page}/", self.base_url);
		let html = self.fetch_html(&url).await?;
		let identifiers = self.extractor.film_slugs(&html);
		let total_pages = if page == 1 { self.extractor.page_count(&html) } else { None };

		Ok(ListPage { identifiers, total_pages })
	}

	pub async fn fetch_film(&self, slug: &str) -> Result<Film> {
		let url = format!("{}/film/{slug}/", self.base_url);
		let html = self.fetch_html(&url).await?;
		let title = self.extractor.film_title(&html).unwrap_or_else(|| slug.to_string());
		let credits = self.extractor.credits(&html);

		Ok(Film { title, credits })
	}

	pub async fn list_following(&self, user: &str) -> Result<Vec<String>> {
		let url = format!("{}/{user}/following/", self.base_url);
		let html = self.fetch_html(&url).await?;

		Ok(self.extractor.following(&html))
	}

	async fn fetch_html(&self, url: &str) -> Result<String> {
		let _permit = self.permits.acquire().await.map_err(|_| Error::LimiterClosed)?;

		tracing::debug!(url, "Fetching source page.");

		let res = self.http.get(url).send().await?;
		let body = res.error_for_status()?.text().await?;

		Ok(body)
	}
}
