use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleFilter {
	AdditionalVoices,
	Voice,
	Uncredited,
}
impl RoleFilter {
	pub const ALL: [Self; 3] = [Self::AdditionalVoices, Self::Voice, Self::Uncredited];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::AdditionalVoices => "additional_voices",
			Self::Voice => "voice",
			Self::Uncredited => "uncredited",
		}
	}

	/// Returns true when a credit with this role should be dropped.
	pub fn matches(self, role: &str) -> bool {
		match self {
			Self::AdditionalVoices =>
				role == "Additional Voices" || role == "Additional Voices (voice)",
			Self::Voice => role.ends_with("(voice)"),
			Self::Uncredited => role.ends_with("(uncredited)"),
		}
	}

	/// Parses policy names in order, skipping unknown and repeated ones.
	pub fn parse_list<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<Self> {
		let mut filters = Vec::new();

		for name in names {
			let name = name.trim();

			if name.is_empty() {
				continue;
			}

			match name.parse::<Self>() {
				Ok(filter) if !filters.contains(&filter) => filters.push(filter),
				Ok(_) => {},
				Err(_) => tracing::debug!(name, "Ignoring unknown role filter."),
			}
		}

		filters
	}
}
impl fmt::Display for RoleFilter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
impl FromStr for RoleFilter {
	type Err = UnknownRoleFilter;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.into_iter()
			.find(|filter| filter.as_str() == value)
			.ok_or_else(|| UnknownRoleFilter(value.to_string()))
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRoleFilter(pub String);
impl fmt::Display for UnknownRoleFilter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Unknown role filter {:?}.", self.0)
	}
}
impl std::error::Error for UnknownRoleFilter {}
