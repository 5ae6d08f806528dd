use std::sync::Arc;

use axum::{
	Router,
	body::{self, Body},
	http::{Request, StatusCode},
};
use serde_json::Value;
use tower::util::ServiceExt;

use costar_api::{routes, state::AppState};
use costar_domain::{Credit, ResolvedItem};
use costar_service::CostarService;
use costar_storage::{DurableCache, memory::MemoryStore};
use costar_testkit::FakeSource;

fn app() -> Router {
	let store = MemoryStore::with_items([
		ResolvedItem::new("s1", "S1", vec![Credit::new("X", "lead")]),
		ResolvedItem::new("s2", "S2", vec![Credit::new("X", "support"), Credit::new("Y", "lead")]),
	]);
	let source = FakeSource::new()
		.with_pages("alice", &[&["s1"], &["s2"], &["s3"]])
		.with_item("s3", "S3", &[("X", "lead")]);
	let mut cfg = costar_testkit::test_config();

	cfg.precache.enabled = false;

	let service =
		CostarService::with_source(cfg, DurableCache::new(Arc::new(store), 500), Arc::new(source));

	routes::router(AppState::from_service(service))
}

async fn get(app: Router, uri: &str) -> (StatusCode, String) {
	let response = app
		.oneshot(Request::builder().uri(uri).body(Body::empty()).expect("Failed to build request."))
		.await
		.expect("Failed to call router.");
	let status = response.status();
	let body = body::to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Failed to read response body.");

	(status, String::from_utf8(body.to_vec()).expect("Body is not UTF-8."))
}

#[tokio::test]
async fn health_ok() {
	let (status, _) = get(app(), "/health").await;

	assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn participants_returns_ranked_json() {
	let (status, body) = get(app(), "/v1/participants?username=alice").await;

	assert_eq!(status, StatusCode::OK);

	let json: Value = serde_json::from_str(&body).expect("Response is not JSON.");

	assert_eq!(json["user"], "alice");
	assert_eq!(json["total_items"], 3);
	assert_eq!(json["cached"], false);
	assert_eq!(json["participants"][0]["name"], "X");
	assert_eq!(json["participants"][0]["appearances"].as_array().map(Vec::len), Some(3));
	assert_eq!(json["participants"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn bad_top_n_means_every_item() {
	let (status, body) = get(app(), "/v1/participants?username=alice&top_n=lots").await;

	assert_eq!(status, StatusCode::OK);

	let json: Value = serde_json::from_str(&body).expect("Response is not JSON.");

	assert_eq!(json["total_items"], 3);
}

#[tokio::test]
async fn missing_username_is_a_bad_request() {
	let (status, body) = get(app(), "/v1/participants").await;

	assert_eq!(status, StatusCode::BAD_REQUEST);

	let json: Value = serde_json::from_str(&body).expect("Response is not JSON.");

	assert_eq!(json["error_code"], "invalid_request");

	let (status, _) = get(app(), "/v1/participants/stream?username=%20").await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stream_sends_total_progress_then_participants() {
	let (status, body) = get(app(), "/v1/participants/stream?username=alice").await;

	assert_eq!(status, StatusCode::OK);

	let events: Vec<Value> = body
		.lines()
		.filter_map(|line| line.strip_prefix("data:").map(str::trim_start))
		.map(|data| serde_json::from_str(data).expect("Event data is not JSON."))
		.collect();

	assert_eq!(events.first().map(|event| event["total"].clone()), Some(Value::from(3)));

	let progress: Vec<u64> =
		events.iter().filter_map(|event| event["progress"].as_u64()).collect();

	assert!(progress.windows(2).all(|pair| pair[0] <= pair[1]));
	assert_eq!(progress.last(), Some(&3));

	let last = events.last().expect("Expected a final event.");

	assert_eq!(last["participants"][0]["name"], "X");
}
