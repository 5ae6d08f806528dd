use std::collections::HashMap;

use sqlx::QueryBuilder;

use costar_domain::{Credit, ResolvedItem};

use crate::{
	BoxFuture, Error, ItemStore, Result,
	db::Db,
	models::{CreditRow, ItemRow},
};

pub struct PgItemStore {
	db: Db,
}
impl PgItemStore {
	pub fn new(db: Db) -> Self {
		Self { db }
	}

	async fn fetch_many_inner(&self, identifiers: &[String]) -> Result<Vec<ResolvedItem>> {
		if identifiers.is_empty() {
			return Ok(Vec::new());
		}

		let items: Vec<ItemRow> = sqlx::query_as(
			"\
SELECT identifier, title, created_at
FROM items
WHERE identifier = ANY($1)",
		)
		.bind(identifiers)
		.fetch_all(&self.db.pool)
		.await?;

		if items.is_empty() {
			return Ok(Vec::new());
		}

		let credits: Vec<CreditRow> = sqlx::query_as(
			"\
SELECT identifier, position, name, role
FROM item_credits
WHERE identifier = ANY($1)
ORDER BY identifier, position",
		)
		.bind(identifiers)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(assemble(items, credits))
	}

	async fn insert_inner(&self, item: &ResolvedItem) -> Result<()> {
		if item.identifier.trim().is_empty() {
			return Err(Error::InvalidArgument("identifier must be non-empty.".to_string()));
		}

		let mut tx = self.db.pool.begin().await?;
		let inserted = sqlx::query(
			"\
INSERT INTO items (identifier, title)
VALUES ($1, $2)
ON CONFLICT (identifier) DO NOTHING",
		)
		.bind(item.identifier.as_str())
		.bind(item.title.as_str())
		.execute(&mut *tx)
		.await?
		.rows_affected();

		if inserted == 0 {
			tx.commit().await?;

			return Ok(());
		}
		if !item.credits.is_empty() {
			let mut builder =
				QueryBuilder::new("INSERT INTO item_credits (identifier, position, name, role) ");

			builder.push_values(item.credits.iter().enumerate(), |mut row, (position, credit)| {
				row.push_bind(item.identifier.as_str())
					.push_bind(position as i32)
					.push_bind(credit.name.as_str())
					.push_bind(credit.role.as_str());
			});
			builder.build().execute(&mut *tx).await?;
		}

		tx.commit().await?;

		Ok(())
	}
}
impl ItemStore for PgItemStore {
	fn fetch_many<'a>(&'a self, identifiers: &'a [String]) -> BoxFuture<'a, Result<Vec<ResolvedItem>>> {
		Box::pin(self.fetch_many_inner(identifiers))
	}

	fn fetch_one<'a>(&'a self, identifier: &'a str) -> BoxFuture<'a, Result<Option<ResolvedItem>>> {
		Box::pin(async move {
			let identifiers = [identifier.to_string()];
			let mut items = self.fetch_many_inner(&identifiers).await?;

			Ok(items.pop())
		})
	}

	fn insert<'a>(&'a self, item: &'a ResolvedItem) -> BoxFuture<'a, Result<()>> {
		Box::pin(self.insert_inner(item))
	}
}

fn assemble(items: Vec<ItemRow>, credits: Vec<CreditRow>) -> Vec<ResolvedItem> {
	let mut by_identifier: HashMap<String, Vec<Credit>> = HashMap::new();

	// Rows arrive ordered by position within each identifier.
	for row in credits {
		by_identifier.entry(row.identifier).or_default().push(Credit::new(row.name, row.role));
	}

	items
		.into_iter()
		.map(|row| {
			let credits = by_identifier.remove(&row.identifier).unwrap_or_default();

			ResolvedItem { identifier: row.identifier, title: row.title, credits }
		})
		.collect()
}
