use std::collections::HashMap;

use crate::{Appearance, ParticipantSummary, ResolvedItem, RoleFilter};

/// Folds credits into per-participant appearances and ranks participants seen more than once.
///
/// A credit whose role matches any of `filters` contributes nothing. Singletons are dropped only
/// after every item has been folded, so the threshold applies to surviving credits. Output is
/// ordered by descending appearance count, then ascending name.
pub fn aggregate(items: &[ResolvedItem], filters: &[RoleFilter]) -> Vec<ParticipantSummary> {
	let mut by_name: HashMap<&str, Vec<Appearance>> = HashMap::new();

	for item in items {
		for credit in &item.credits {
			if filters.iter().any(|filter| filter.matches(&credit.role)) {
				continue;
			}

			by_name.entry(credit.name.as_str()).or_default().push(Appearance {
				identifier: item.identifier.clone(),
				title: item.title.clone(),
				role: credit.role.clone(),
			});
		}
	}

	let mut summaries: Vec<ParticipantSummary> = by_name
		.into_iter()
		.filter(|(_, appearances)| appearances.len() > 1)
		.map(|(name, appearances)| ParticipantSummary { name: name.to_string(), appearances })
		.collect();

	summaries.sort_by(|a, b| b.count().cmp(&a.count()).then_with(|| a.name.cmp(&b.name)));

	summaries
}
