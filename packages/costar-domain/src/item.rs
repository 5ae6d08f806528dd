use serde::{Deserialize, Serialize};

use crate::RoleFilter;

pub const DEFAULT_SORT: &str = "date";

/// One credited participant on an item. `role` is free text from the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credit {
	pub name: String,
	pub role: String,
}
impl Credit {
	pub fn new(name: impl Into<String>, role: impl Into<String>) -> Self {
		Self { name: name.into(), role: role.into() }
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedItem {
	pub identifier: String,
	pub title: String,
	pub credits: Vec<Credit>,
}
impl ResolvedItem {
	pub fn new(identifier: impl Into<String>, title: impl Into<String>, credits: Vec<Credit>) -> Self {
		Self { identifier: identifier.into(), title: title.into(), credits }
	}

	/// Stand-in for an item that could not be resolved: titled by its own identifier, no credits.
	pub fn placeholder(identifier: &str) -> Self {
		Self { identifier: identifier.to_string(), title: identifier.to_string(), credits: Vec::new() }
	}

	pub fn is_placeholder(&self) -> bool {
		self.credits.is_empty() && self.title == self.identifier
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
	pub sort: String,
	/// `None` means every fetched item is used.
	pub max_items: Option<usize>,
	pub role_filters: Vec<RoleFilter>,
}
impl QueryConfig {
	/// Applies the item cutoff. Zero behaves like no cutoff.
	pub fn truncate<'a>(&self, identifiers: &'a [String]) -> &'a [String] {
		match self.max_items {
			Some(max) if max > 0 && max < identifiers.len() => &identifiers[..max],
			_ => identifiers,
		}
	}
}
impl Default for QueryConfig {
	fn default() -> Self {
		Self { sort: DEFAULT_SORT.to_string(), max_items: None, role_filters: Vec::new() }
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appearance {
	pub identifier: String,
	pub title: String,
	pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantSummary {
	pub name: String,
	pub appearances: Vec<Appearance>,
}
impl ParticipantSummary {
	pub fn count(&self) -> usize {
		self.appearances.len()
	}
}
