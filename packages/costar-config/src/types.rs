use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub source: Source,
	#[serde(default)]
	pub pagination: Pagination,
	#[serde(default)]
	pub resolver: Resolver,
	#[serde(default)]
	pub query_cache: QueryCache,
	#[serde(default)]
	pub precache: Precache,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
	Postgres,
	Memory,
	None,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub backend: StorageBackend,
	/// Upper bound on identifiers per durable-cache lookup query.
	#[serde(default = "default_batch_size")]
	pub batch_size: usize,
	pub postgres: Option<Postgres>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Source {
	pub base_url: String,
	pub timeout_ms: u64,
	/// Global cap on simultaneous outbound requests, shared by every caller of the client.
	pub max_concurrent_requests: usize,
	pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Pagination {
	pub max_parallel_pages: usize,
	/// Ceiling for sequential paging past the advertised page count.
	pub max_pages: u32,
}
impl Default for Pagination {
	fn default() -> Self {
		Self { max_parallel_pages: 8, max_pages: 1_000 }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Resolver {
	pub max_concurrent_fetches: usize,
}
impl Default for Resolver {
	fn default() -> Self {
		Self { max_concurrent_fetches: 8 }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueryCache {
	pub enabled: bool,
	pub capacity_bytes: usize,
	pub ttl_seconds: u64,
}
impl Default for QueryCache {
	fn default() -> Self {
		Self { enabled: true, capacity_bytes: 100 * 1024 * 1024, ttl_seconds: 600 }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Precache {
	pub enabled: bool,
	pub sort: String,
}
impl Default for Precache {
	fn default() -> Self {
		Self { enabled: true, sort: "release".to_string() }
	}
}

fn default_batch_size() -> usize {
	500
}
