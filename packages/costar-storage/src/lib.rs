pub mod db;
pub mod durable;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod schema;

mod error;

pub use durable::DurableCache;
pub use error::Error;

use std::{future::Future, pin::Pin};

use costar_domain::ResolvedItem;

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Backing store for resolved items. Items are immutable once written; `insert` keeps the first
/// write for an identifier.
pub trait ItemStore
where
	Self: Send + Sync,
{
	fn fetch_many<'a>(&'a self, identifiers: &'a [String]) -> BoxFuture<'a, Result<Vec<ResolvedItem>>>;

	fn fetch_one<'a>(&'a self, identifier: &'a str) -> BoxFuture<'a, Result<Option<ResolvedItem>>>;

	fn insert<'a>(&'a self, item: &'a ResolvedItem) -> BoxFuture<'a, Result<()>>;
}
