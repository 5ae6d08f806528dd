//! Background warming of the durable cache for users related to recent queries.
//!
//! At most one worker runs per [`Precache`]. It waits for zero in-flight foreground requests before
//! every page fetch, item fetch and durable cache access, and it stops once both queues are
//! drained.

use std::{
	collections::VecDeque,
	sync::{
		Arc, Mutex,
		atomic::{AtomicBool, Ordering},
	},
};

use tokio::{sync::watch, task::JoinHandle};

use costar_storage::DurableCache;

use crate::{ItemSource, PaginationFetcher};

#[derive(Default)]
struct Queues {
	identifiers: VecDeque<String>,
	users: VecDeque<String>,
}

enum Job {
	Item(String),
	User(String),
}

struct Shared {
	durable: DurableCache,
	source: Arc<dyn ItemSource>,
	pagination: PaginationFetcher,
	sort: String,
	enabled: bool,
	running: AtomicBool,
	in_flight: watch::Sender<usize>,
	queues: Mutex<Queues>,
}
impl Shared {
	fn queues(&self) -> std::sync::MutexGuard<'_, Queues> {
		self.queues.lock().unwrap_or_else(|err| err.into_inner())
	}

	fn next_job(&self) -> Option<Job> {
		let mut queues = self.queues();

		if let Some(identifier) = queues.identifiers.pop_front() {
			return Some(Job::Item(identifier));
		}

		queues.users.pop_front().map(Job::User)
	}

	fn has_work(&self) -> bool {
		let queues = self.queues();

		!queues.identifiers.is_empty() || !queues.users.is_empty()
	}

	async fn wait_idle(&self) {
		let mut rx = self.in_flight.subscribe();

		// The sender lives as long as `self`, so this only returns once the count is zero.
		let _ = rx.wait_for(|count| *count == 0).await;
	}

	async fn precache_item(&self, identifier: &str) {
		if self.durable.get(identifier).await.is_some() {
			return;
		}

		self.wait_idle().await;

		tracing::info!(identifier, "Precaching item.");

		match self.source.fetch_item(identifier).await {
			Ok(mut item) => {
				item.identifier = identifier.to_string();

				self.wait_idle().await;
				self.durable.put(&item).await;
			},
			Err(err) => tracing::warn!(error = %err, identifier, "Precache item fetch failed."),
		}
	}

	async fn precache_user(&self, user: &str) {
		tracing::info!(user, sort = %self.sort, "Fetching identifiers for precache.");

		let identifiers = self
			.pagination
			.fetch_all_identifiers_gated(user, &self.sort, move || self.wait_idle())
			.await;

		self.queues().identifiers.extend(identifiers);
	}

	async fn run(self: Arc<Self>) {
		tracing::info!("Precache worker started.");

		loop {
			self.wait_idle().await;

			match self.next_job() {
				Some(Job::Item(identifier)) => self.precache_item(&identifier).await,
				Some(Job::User(user)) => self.precache_user(&user).await,
				None => {
					self.running.store(false, Ordering::SeqCst);

					// Work queued after the last pop would otherwise wait for the next trigger.
					if self.has_work()
						&& self
							.running
							.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
							.is_ok()
					{
						continue;
					}

					break;
				},
			}
		}

		tracing::info!("Precache worker stopped.");
	}
}

/// Marks one foreground request as in flight until dropped.
pub struct RequestGuard {
	shared: Arc<Shared>,
}
impl Drop for RequestGuard {
	fn drop(&mut self) {
		self.shared.in_flight.send_modify(|count| *count = count.saturating_sub(1));
	}
}

#[derive(Clone)]
pub struct Precache {
	shared: Arc<Shared>,
}
impl Precache {
	pub fn new(
		durable: DurableCache,
		source: Arc<dyn ItemSource>,
		pagination: PaginationFetcher,
		sort: String,
		enabled: bool,
	) -> Self {
		let (in_flight, _) = watch::channel(0);

		Self {
			shared: Arc::new(Shared {
				durable,
				source,
				pagination,
				sort,
				enabled,
				running: AtomicBool::new(false),
				in_flight,
				queues: Mutex::new(Queues::default()),
			}),
		}
	}

	pub fn begin_request(&self) -> RequestGuard {
		self.shared.in_flight.send_modify(|count| *count += 1);

		RequestGuard { shared: self.shared.clone() }
	}

	pub fn in_flight(&self) -> usize {
		*self.shared.in_flight.borrow()
	}

	/// Queues users that are not already waiting; returns how many were added.
	pub fn enqueue_users<I>(&self, users: I) -> usize
	where
		I: IntoIterator<Item = String>,
	{
		let mut queues = self.shared.queues();
		let mut added = 0;

		for user in users {
			if queues.users.contains(&user) {
				continue;
			}

			queues.users.push_back(user);

			added += 1;
		}

		added
	}

	pub fn enqueue_identifiers<I>(&self, identifiers: I)
	where
		I: IntoIterator<Item = String>,
	{
		self.shared.queues().identifiers.extend(identifiers);
	}

	/// Returns `(identifiers, users)` waiting to be processed.
	pub fn queued(&self) -> (usize, usize) {
		let queues = self.shared.queues();

		(queues.identifiers.len(), queues.users.len())
	}

	pub fn is_running(&self) -> bool {
		self.shared.running.load(Ordering::SeqCst)
	}

	/// Starts the worker unless it is disabled, has no durable cache to fill, or already runs.
	pub fn trigger(&self) -> Option<JoinHandle<()>> {
		if !self.shared.enabled || !self.shared.durable.is_enabled() {
			return None;
		}
		if self
			.shared
			.running
			.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
			.is_err()
		{
			return None;
		}

		Some(tokio::spawn(self.shared.clone().run()))
	}
}
