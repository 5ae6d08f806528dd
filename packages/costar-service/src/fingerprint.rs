use serde_json::Value;

use costar_domain::QueryConfig;

use crate::{Error, Result};

const QUERY_FINGERPRINT_SCHEMA_VERSION: i32 = 1;

pub fn hash_cache_key(payload: &Value) -> Result<String> {
	let raw = serde_json::to_vec(payload).map_err(|err| Error::Cache {
		message: format!("Failed to encode cache key payload: {err}"),
	})?;

	Ok(blake3::hash(&raw).to_hex().to_string())
}

pub fn cache_key_prefix(key: &str) -> &str {
	let len = key.len().min(12);

	&key[..len]
}

/// Key for a ranked result: the user, every option that shapes the ranking, and the full list of
/// identifiers fetched for the user (before any cutoff), so a changed history changes the key.
pub fn query_fingerprint(user: &str, cfg: &QueryConfig, identifiers: &[String]) -> Result<String> {
	let payload = serde_json::json!({
		"kind": "participants",
		"schema_version": QUERY_FINGERPRINT_SCHEMA_VERSION,
		"user": user,
		"sort": cfg.sort,
		"max_items": cfg.max_items,
		"role_filters": cfg.role_filters,
		"identifiers": identifiers,
	});

	hash_cache_key(&payload)
}
