use time::OffsetDateTime;

#[derive(Debug, sqlx::FromRow)]
pub struct ItemRow {
	pub identifier: String,
	pub title: String,
	pub created_at: OffsetDateTime,
}

#[derive(Debug, sqlx::FromRow)]
pub struct CreditRow {
	pub identifier: String,
	pub position: i32,
	pub name: String,
	pub role: String,
}
