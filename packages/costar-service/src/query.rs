use std::{sync::Arc, time::Instant};

use serde::{Deserialize, Serialize};

use costar_domain::{DEFAULT_SORT, ParticipantSummary, QueryConfig};

use crate::{CostarService, Error, ProgressSink, Result, fingerprint};

#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
	pub user: String,
	#[serde(default)]
	pub config: QueryConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
	pub user: String,
	/// Identifiers fed to the aggregator after the item cutoff.
	pub total_items: usize,
	pub cached: bool,
	pub participants: Vec<ParticipantSummary>,
}

impl CostarService {
	/// Ranks the participants credited across a user's history.
	///
	/// Source and cache failures degrade the result instead of failing the call; only an invalid
	/// request is an error.
	pub async fn query(
		&self,
		req: QueryRequest,
		progress: Option<&dyn ProgressSink>,
	) -> Result<QueryResponse> {
		let user = req.user.trim().to_string();

		if user.is_empty() {
			return Err(Error::InvalidRequest { message: "username must be non-empty.".to_string() });
		}

		let mut cfg = req.config;

		cfg.sort = cfg.sort.trim().to_string();

		if cfg.sort.is_empty() {
			cfg.sort = DEFAULT_SORT.to_string();
		}

		let started = Instant::now();
		let guard = self.precache.begin_request();

		if let Some(cache) = self.query_cache.as_ref() {
			let evicted = cache.evict();

			if evicted > 0 {
				tracing::debug!(evicted, "Evicted expired query results.");
			}
		}

		let identifiers = self.pagination.fetch_all_identifiers(&user, &cfg.sort).await;
		let key = match fingerprint::query_fingerprint(&user, &cfg, &identifiers) {
			Ok(key) => Some(key),
			Err(err) => {
				tracing::warn!(error = %err, user = %user, "Failed to fingerprint query.");

				None
			},
		};

		if let (Some(cache), Some(key)) = (self.query_cache.as_ref(), key.as_deref())
			&& let Some(participants) = cache.get(key)
		{
			tracing::info!(
				user = %user,
				key_prefix = fingerprint::cache_key_prefix(key),
				"Query cache hit."
			);

			drop(guard);

			return Ok(QueryResponse {
				total_items: cfg.truncate(&identifiers).len(),
				user,
				cached: true,
				participants: participants.as_ref().clone(),
			});
		}

		let selected = cfg.truncate(&identifiers);
		let items = self.resolver.resolve(selected, progress).await;
		let participants = costar_domain::aggregate(&items, &cfg.role_filters);

		if let (Some(cache), Some(key)) = (self.query_cache.as_ref(), key) {
			cache.set(key, Arc::new(participants.clone()), self.query_cache_ttl());
		}

		tracing::info!(
			user = %user,
			items = items.len(),
			participants = participants.len(),
			elapsed_ms = started.elapsed().as_millis() as u64,
			"Query finished."
		);

		self.schedule_precache(&user).await;

		drop(guard);

		self.precache.trigger();

		Ok(QueryResponse { user, total_items: items.len(), cached: false, participants })
	}

	async fn schedule_precache(&self, user: &str) {
		if !self.cfg.precache.enabled || !self.durable.is_enabled() {
			return;
		}

		match self.source.list_related_users(user).await {
			Ok(related) => {
				let added = self.precache.enqueue_users(related);

				tracing::debug!(user, added, "Queued related users for precache.");
			},
			Err(err) => tracing::warn!(error = %err, user, "Failed to list related users."),
		}
	}
}
