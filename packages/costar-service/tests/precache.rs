use std::{sync::Arc, time::Duration};

use costar_domain::{Credit, ResolvedItem};
use costar_service::{PaginationFetcher, Precache};
use costar_storage::DurableCache;
use costar_testkit::{CountingStore, FakeSource};

fn bob_source() -> Arc<FakeSource> {
	Arc::new(
		FakeSource::new()
			.with_pages("bob", &[&["b1", "b2"]])
			.with_item("b1", "B One", &[("X", "Lead")])
			.with_item("b2", "B Two", &[("Y", "Lead")]),
	)
}

fn precache(store: &Arc<CountingStore>, source: &Arc<FakeSource>) -> Precache {
	let pagination = PaginationFetcher::new(source.clone(), 4, 20);

	Precache::new(
		DurableCache::new(store.clone(), 500),
		source.clone(),
		pagination,
		"release".to_string(),
		true,
	)
}

#[tokio::test(start_paused = true)]
async fn worker_stays_idle_while_a_request_is_in_flight() {
	let store = Arc::new(CountingStore::new());
	let source = bob_source();
	let precache = precache(&store, &source);
	let guard = precache.begin_request();

	assert_eq!(precache.enqueue_users(["bob".to_string()]), 1);

	let handle = precache.trigger().expect("Worker should start.");

	tokio::time::sleep(Duration::from_secs(5)).await;

	assert_eq!(precache.in_flight(), 1);
	assert!(precache.is_running());
	assert_eq!(source.page_calls(), 0);
	assert_eq!(source.item_calls(), 0);
	assert_eq!(store.calls(), 0);

	drop(guard);

	handle.await.expect("Worker panicked.");

	assert_eq!(precache.in_flight(), 0);
	assert!(!precache.is_running());
	assert_eq!(precache.queued(), (0, 0));
	assert!(store.contains("b1"));
	assert!(store.contains("b2"));
}

#[tokio::test(start_paused = true)]
async fn only_one_worker_runs_at_a_time() {
	let store = Arc::new(CountingStore::new());
	let source = bob_source();
	let precache = precache(&store, &source);
	let guard = precache.begin_request();

	precache.enqueue_users(["bob".to_string()]);

	let handle = precache.trigger().expect("Worker should start.");

	assert!(precache.trigger().is_none());

	drop(guard);

	handle.await.expect("Worker panicked.");

	let again = precache.trigger().expect("Worker should restart once idle.");

	again.await.expect("Worker panicked.");
}

#[tokio::test]
async fn cached_items_are_not_fetched_again() {
	let cached = ResolvedItem::new("b1", "Cached", vec![Credit::new("X", "Lead")]);
	let store = Arc::new(CountingStore::with_items([cached]));
	let source = bob_source();
	let precache = precache(&store, &source);

	precache.enqueue_identifiers(["b1".to_string(), "b2".to_string()]);
	precache.trigger().expect("Worker should start.").await.expect("Worker panicked.");

	assert_eq!(source.fetched_items(), vec!["b2"]);
	assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn failed_items_are_skipped() {
	let store = Arc::new(CountingStore::new());
	let source = Arc::new(FakeSource::new().fail_item("bad"));
	let precache = precache(&store, &source);

	precache.enqueue_identifiers(["bad".to_string()]);
	precache.trigger().expect("Worker should start.").await.expect("Worker panicked.");

	assert!(store.is_empty());
	assert_eq!(precache.queued(), (0, 0));
}

#[tokio::test]
async fn queued_users_are_deduplicated() {
	let store = Arc::new(CountingStore::new());
	let source = bob_source();
	let precache = precache(&store, &source);

	assert_eq!(precache.enqueue_users(["bob".to_string(), "carol".to_string()]), 2);
	assert_eq!(precache.enqueue_users(["bob".to_string(), "dave".to_string()]), 1);
	assert_eq!(precache.queued(), (0, 3));
}

#[tokio::test]
async fn no_worker_without_durable_cache() {
	let source = bob_source();
	let pagination = PaginationFetcher::new(source.clone(), 4, 20);
	let precache =
		Precache::new(DurableCache::disabled(), source, pagination, "release".to_string(), true);

	precache.enqueue_users(["bob".to_string()]);

	assert!(precache.trigger().is_none());
	assert!(!precache.is_running());
}

#[tokio::test]
async fn no_worker_when_disabled() {
	let store = Arc::new(CountingStore::new());
	let source = bob_source();
	let pagination = PaginationFetcher::new(source.clone(), 4, 20);
	let precache = Precache::new(
		DurableCache::new(store, 500),
		source,
		pagination,
		"release".to_string(),
		false,
	);

	precache.enqueue_users(["bob".to_string()]);

	assert!(precache.trigger().is_none());
}

#[tokio::test(start_paused = true)]
async fn request_arriving_mid_pagination_pauses_remaining_pages() {
	let store = Arc::new(CountingStore::new());
	let source = Arc::new(
		FakeSource::new()
			.with_pages("bob", &[&["b1"], &["b2"], &["b3"]])
			.advertise("bob", 1)
			.delay_page("bob", 1, Duration::from_millis(100))
			.delay_page("bob", 2, Duration::from_millis(100))
			.delay_page("bob", 3, Duration::from_millis(100))
			.with_item("b1", "B1", &[("X", "Lead")])
			.with_item("b2", "B2", &[("X", "Lead")])
			.with_item("b3", "B3", &[("X", "Lead")]),
	);
	let precache = precache(&store, &source);

	precache.enqueue_users(["bob".to_string()]);

	let handle = precache.trigger().expect("Worker should start.");

	tokio::time::sleep(Duration::from_millis(50)).await;

	let guard = precache.begin_request();

	assert_eq!(source.page_calls(), 1);

	tokio::time::sleep(Duration::from_secs(10)).await;

	assert_eq!(source.page_calls(), 1);
	assert_eq!(source.item_calls(), 0);
	assert_eq!(store.calls(), 0);

	drop(guard);

	handle.await.expect("Worker panicked.");

	// Pages 1..=3 plus the empty page that ends paging.
	assert_eq!(source.page_calls(), 4);
	assert!(store.contains("b1"));
	assert!(store.contains("b2"));
	assert!(store.contains("b3"));
}

#[tokio::test(start_paused = true)]
async fn request_arriving_mid_item_fetch_defers_the_write() {
	let store = Arc::new(CountingStore::new());
	let source = Arc::new(
		FakeSource::new()
			.with_item("b1", "B1", &[("X", "Lead")])
			.with_item("b2", "B2", &[("Y", "Lead")])
			.delay_items(Duration::from_millis(100)),
	);
	let precache = precache(&store, &source);

	precache.enqueue_identifiers(["b1".to_string(), "b2".to_string()]);

	let handle = precache.trigger().expect("Worker should start.");

	tokio::time::sleep(Duration::from_millis(50)).await;

	let guard = precache.begin_request();

	tokio::time::sleep(Duration::from_secs(10)).await;

	assert_eq!(source.item_calls(), 1);
	assert_eq!(store.fetch_one_calls(), 1);
	assert_eq!(store.insert_calls(), 0);

	drop(guard);

	handle.await.expect("Worker panicked.");

	assert_eq!(source.item_calls(), 2);
	assert_eq!(store.insert_calls(), 2);
	assert_eq!(store.len(), 2);
}
