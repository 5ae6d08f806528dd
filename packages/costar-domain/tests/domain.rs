use costar_domain::{Credit, ResolvedItem, RoleFilter, aggregate};

fn item(identifier: &str, credits: &[(&str, &str)]) -> ResolvedItem {
	ResolvedItem::new(
		identifier,
		identifier.to_uppercase(),
		credits.iter().map(|(name, role)| Credit::new(*name, *role)).collect(),
	)
}

fn names(items: &[ResolvedItem], filters: &[RoleFilter]) -> Vec<(String, usize)> {
	aggregate(items, filters).into_iter().map(|summary| (summary.name.clone(), summary.count())).collect()
}

#[test]
fn single_surviving_credit_is_excluded() {
	let items = vec![
		item("a", &[("Solo", "Lead"), ("Pair", "Lead")]),
		item("b", &[("Pair", "Support")]),
	];

	assert_eq!(names(&items, &[]), vec![("Pair".to_string(), 2)]);
}

#[test]
fn threshold_applies_after_filtering() {
	let items = vec![
		item("a", &[("Voice Actor", "Woody (voice)"), ("Kept", "Lead")]),
		item("b", &[("Voice Actor", "Buzz (voice)"), ("Kept", "Lead")]),
		item("c", &[("Voice Actor", "Rex")]),
	];

	assert_eq!(names(&items, &[]), vec![("Voice Actor".to_string(), 3), ("Kept".to_string(), 2)]);
	assert_eq!(names(&items, &[RoleFilter::Voice]), vec![("Kept".to_string(), 2)]);
}

#[test]
fn orders_by_count_then_name() {
	let items = vec![
		item("1", &[("C", "r"), ("B", "r"), ("A", "r")]),
		item("2", &[("B", "r"), ("C", "r"), ("A", "r")]),
		item("3", &[("B", "r")]),
	];

	assert_eq!(
		names(&items, &[]),
		vec![("B".to_string(), 3), ("A".to_string(), 2), ("C".to_string(), 2)]
	);
}

#[test]
fn names_are_case_sensitive() {
	let items = vec![item("1", &[("Tom Hanks", "r")]), item("2", &[("tom hanks", "r")])];

	assert!(aggregate(&items, &[]).is_empty());
}

#[test]
fn appearances_keep_item_order_and_roles() {
	let items = vec![
		item("s1", &[("X", "lead")]),
		item("s2", &[("X", "support"), ("Y", "lead")]),
		item("s3", &[("X", "lead")]),
	];
	let summaries = aggregate(&items, &[]);

	assert_eq!(summaries.len(), 1);

	let summary = &summaries[0];
	let identifiers: Vec<&str> =
		summary.appearances.iter().map(|appearance| appearance.identifier.as_str()).collect();

	assert_eq!(summary.name, "X");
	assert_eq!(identifiers, vec!["s1", "s2", "s3"]);
	assert_eq!(summary.appearances[1].role, "support");
	assert_eq!(summary.appearances[1].title, "S2");
}

#[test]
fn summaries_serialize_with_plain_field_names() {
	let items = vec![item("s1", &[("X", "lead")]), item("s2", &[("X", "lead")])];
	let json = serde_json::to_value(aggregate(&items, &[])).expect("Failed to encode summaries.");

	assert_eq!(json[0]["name"], "X");
	assert_eq!(json[0]["appearances"][1]["identifier"], "s2");
}
