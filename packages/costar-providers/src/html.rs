//! Regex-based extraction of the few page structures the source exposes.

use regex::Regex;

use costar_domain::Credit;

pub struct Extractor {
	film_slug: Regex,
	paginate_page: Regex,
	film_title: Regex,
	anchor: Regex,
	attr_title: Regex,
	table_person: Regex,
	tag: Regex,
}
impl Extractor {
	pub fn new() -> Result<Self, regex::Error> {
		Ok(Self {
			film_slug: Regex::new(r#"data-film-slug="([^"]+)""#)?,
			paginate_page: Regex::new(
				r#"(?s)<li[^>]*class="[^"]*\bpaginate-page\b[^"]*"[^>]*>(.*?)</li>"#,
			)?,
			film_title: Regex::new(r#"(?s)<h1[^>]*class="[^"]*\bfilmtitle\b[^"]*"[^>]*>(.*?)</h1>"#)?,
			anchor: Regex::new(r#"(?s)<a\s([^>]*)>(.*?)</a>"#)?,
			attr_title: Regex::new(r#"\btitle="([^"]*)""#)?,
			table_person: Regex::new(
				r#"(?s)<td[^>]*class="[^"]*\btable-person\b[^"]*"[^>]*>.*?<h3[^>]*>.*?<a[^>]*href="([^"]+)""#,
			)?,
			tag: Regex::new(r"<[^>]+>")?,
		})
	}

	/// Identifiers on a listing page, in document order.
	pub fn film_slugs(&self, html: &str) -> Vec<String> {
		self.film_slug.captures_iter(html).map(|caps| decode_entities(&caps[1])).collect()
	}

	/// Page count advertised by the last pagination element. `None` when absent or non-numeric.
	pub fn page_count(&self, html: &str) -> Option<u32> {
		let last = self.paginate_page.captures_iter(html).last()?;

		self.text(&last[1]).parse().ok()
	}

	pub fn film_title(&self, html: &str) -> Option<String> {
		let caps = self.film_title.captures(html)?;
		let title = self.text(&caps[1]);

		(!title.is_empty()).then_some(title)
	}

	/// Cast credits from actor links. Each participant appears once, in first-seen order, with
	/// their distinct roles joined by `" / "`.
	pub fn credits(&self, html: &str) -> Vec<Credit> {
		let mut names: Vec<String> = Vec::new();
		let mut roles: Vec<Vec<String>> = Vec::new();

		for caps in self.anchor.captures_iter(html) {
			let attrs = &caps[1];

			if !attrs.contains(r#"href="/actor/"#) {
				continue;
			}

			let name = self.text(&caps[2]);

			if name.is_empty() {
				continue;
			}

			let index = match names.iter().position(|existing| existing == &name) {
				Some(index) => index,
				None => {
					names.push(name);
					roles.push(Vec::new());

					names.len() - 1
				},
			};

			if let Some(role) = self.attr_title.captures(attrs).map(|caps| decode_entities(&caps[1]))
				&& !roles[index].contains(&role)
			{
				roles[index].push(role);
			}
		}

		names.into_iter().zip(roles).map(|(name, roles)| Credit::new(name, roles.join(" / "))).collect()
	}

	/// Usernames linked from a following table.
	pub fn following(&self, html: &str) -> Vec<String> {
		self.table_person
			.captures_iter(html)
			.map(|caps| caps[1].trim_matches('/').to_string())
			.filter(|user| !user.is_empty())
			.collect()
	}

	fn text(&self, fragment: &str) -> String {
		decode_entities(self.tag.replace_all(fragment, "").trim())
	}
}

pub fn decode_entities(raw: &str) -> String {
	if !raw.contains('&') {
		return raw.to_string();
	}

	let mut out = String::with_capacity(raw.len());
	let mut rest = raw;

	while let Some(start) = rest.find('&') {
		out.push_str(&rest[..start]);

		let tail = &rest[start..];
		let decoded = tail.find(';').filter(|end| *end <= 10).and_then(|end| {
			let entity = &tail[1..end];
			let ch = match entity {
				"amp" => Some('&'),
				"lt" => Some('<'),
				"gt" => Some('>'),
				"quot" => Some('"'),
				"apos" => Some('\''),
				"nbsp" => Some('\u{a0}'),
				_ => entity
					.strip_prefix("#x")
					.or_else(|| entity.strip_prefix("#X"))
					.and_then(|hex| u32::from_str_radix(hex, 16).ok())
					.or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
					.and_then(char::from_u32),
			};

			ch.map(|ch| (ch, end))
		});

		match decoded {
			Some((ch, end)) => {
				out.push(ch);
				rest = &tail[end + 1..];
			},
			None => {
				out.push('&');
				rest = &tail[1..];
			},
		}
	}

	out.push_str(rest);

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	fn extractor() -> Extractor {
		Extractor::new().expect("Patterns must compile.")
	}

	#[test]
	fn extracts_slugs_and_last_page_number() {
		let html = r#"<div data-film-slug="toy-story" /><div data-film-slug="heat" />
<ul><li class="paginate-page"><a href="/u/films/page/2/">2</a></li>
<li class="paginate-page">…</li><li class="paginate-page"><a>14</a></li></ul>"#;
		let extractor = extractor();

		assert_eq!(extractor.film_slugs(html), vec!["toy-story", "heat"]);
		assert_eq!(extractor.page_count(html), Some(14));
	}

	#[test]
	fn missing_or_garbled_page_count_is_none() {
		let extractor = extractor();

		assert_eq!(extractor.page_count(r#"<div data-film-slug="a" />"#), None);
		assert_eq!(extractor.page_count(r#"<li class="paginate-page">next</li>"#), None);
	}

	#[test]
	fn collapses_repeated_actor_links() {
		let html = r#"<h1 class="headline-1 filmtitle"><span>Toy Story</span></h1>
<a href="/actor/tom-hanks/" title="Woody (voice)">Tom Hanks</a>
<a href="/actor/tim-allen/" title="Buzz Lightyear (voice)">Tim Allen</a>
<a href="/actor/tom-hanks/" title="Narrator">Tom Hanks</a>
<a href="/actor/tom-hanks/" title="Woody (voice)">Tom Hanks</a>
<a href="/director/john-lasseter/">John Lasseter</a>"#;
		let extractor = extractor();

		assert_eq!(extractor.film_title(html).as_deref(), Some("Toy Story"));
		assert_eq!(
			extractor.credits(html),
			vec![
				Credit::new("Tom Hanks", "Woody (voice) / Narrator"),
				Credit::new("Tim Allen", "Buzz Lightyear (voice)"),
			]
		);
	}

	#[test]
	fn extracts_following_usernames() {
		let html = r#"<table><tr><td class="table-person"><div><h3 class="title-3"><a href="/alice/">Alice</a></h3></div></td></tr>
<tr><td class="table-person"><h3><a href="/bob/">Bob</a></h3></td></tr></table>"#;

		assert_eq!(extractor().following(html), vec!["alice", "bob"]);
	}

	#[test]
	fn decodes_common_entities() {
		assert_eq!(decode_entities("Thor: Ragnarok &amp; more"), "Thor: Ragnarok & more");
		assert_eq!(decode_entities("Am&#233;lie &#x27;01&#x27;"), "Amélie '01'");
		assert_eq!(decode_entities("AT&T"), "AT&T");
	}
}
