mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, Pagination, Postgres, Precache, QueryCache, Resolver, Service, Source, Storage,
	StorageBackend,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	parse(path, &raw)
}

pub fn parse(path: &Path, raw: &str) -> Result<Config> {
	let mut cfg: Config = toml::from_str(raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.storage.batch_size == 0 {
		return Err(Error::Validation {
			message: "storage.batch_size must be greater than zero.".to_string(),
		});
	}

	match (cfg.storage.backend, cfg.storage.postgres.as_ref()) {
		(StorageBackend::Postgres, None) => {
			return Err(Error::Validation {
				message: "storage.postgres is required when storage.backend is postgres."
					.to_string(),
			});
		},
		(StorageBackend::Postgres, Some(postgres)) => {
			if postgres.dsn.trim().is_empty() {
				return Err(Error::Validation {
					message: "storage.postgres.dsn must be non-empty.".to_string(),
				});
			}
			if postgres.pool_max_conns == 0 {
				return Err(Error::Validation {
					message: "storage.postgres.pool_max_conns must be greater than zero."
						.to_string(),
				});
			}
		},
		_ => {},
	}

	if !cfg.source.base_url.starts_with("http://") && !cfg.source.base_url.starts_with("https://")
	{
		return Err(Error::Validation {
			message: "source.base_url must be an http or https URL.".to_string(),
		});
	}
	if cfg.source.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "source.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.source.max_concurrent_requests == 0 {
		return Err(Error::Validation {
			message: "source.max_concurrent_requests must be greater than zero.".to_string(),
		});
	}
	if cfg.pagination.max_parallel_pages == 0 {
		return Err(Error::Validation {
			message: "pagination.max_parallel_pages must be greater than zero.".to_string(),
		});
	}
	if cfg.pagination.max_pages == 0 {
		return Err(Error::Validation {
			message: "pagination.max_pages must be greater than zero.".to_string(),
		});
	}
	if cfg.resolver.max_concurrent_fetches == 0 {
		return Err(Error::Validation {
			message: "resolver.max_concurrent_fetches must be greater than zero.".to_string(),
		});
	}
	if cfg.query_cache.enabled {
		if cfg.query_cache.capacity_bytes == 0 {
			return Err(Error::Validation {
				message: "query_cache.capacity_bytes must be greater than zero.".to_string(),
			});
		}
		if cfg.query_cache.ttl_seconds == 0 {
			return Err(Error::Validation {
				message: "query_cache.ttl_seconds must be greater than zero.".to_string(),
			});
		}
	}
	if cfg.precache.enabled && cfg.precache.sort.trim().is_empty() {
		return Err(Error::Validation {
			message: "precache.sort must be non-empty when precache is enabled.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.source.user_agent.as_deref().map(|agent| agent.trim().is_empty()).unwrap_or(false) {
		cfg.source.user_agent = None;
	}

	let trimmed = cfg.source.base_url.trim().trim_end_matches('/').to_string();

	cfg.source.base_url = trimmed;
}
