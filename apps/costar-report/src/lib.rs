use std::{fmt::Write, path::PathBuf};

use clap::Parser;

use costar_domain::{DEFAULT_SORT, ParticipantSummary, QueryConfig, RoleFilter};
use costar_service::{CostarService, QueryRequest};
use costar_storage::DurableCache;

#[derive(Debug, Parser)]
#[command(
	version = costar_cli::VERSION,
	rename_all = "kebab",
	styles = costar_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[arg(long, short = 'u', value_name = "NAME")]
	pub username: String,
	#[arg(long, value_name = "KEY", default_value = DEFAULT_SORT)]
	pub sort: String,
	/// Only rank the first N items of the history.
	#[arg(long, value_name = "N")]
	pub top_n: Option<usize>,
	/// Drop credits matching this policy; repeatable.
	#[arg(long = "role-filter", value_name = "NAME")]
	pub role_filters: Vec<String>,
	#[arg(long, value_name = "N", default_value_t = 10)]
	pub limit: usize,
	/// Print the full response as JSON instead of the table.
	#[arg(long)]
	pub json: bool,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = costar_config::load(&args.config)?;

	costar_cli::init_tracing(&config.service.log_level);

	let durable = DurableCache::open(&config.storage).await;
	let service = CostarService::new(config, durable)?;
	let request = QueryRequest {
		user: args.username,
		config: QueryConfig {
			sort: args.sort,
			max_items: args.top_n,
			role_filters: RoleFilter::parse_list(args.role_filters.iter().map(String::as_str)),
		},
	};
	let response = service.query(request, None).await?;

	if args.json {
		println!("{}", serde_json::to_string_pretty(&response)?);
	} else {
		print!("{}", render_top(&response.participants, args.limit));
	}

	Ok(())
}

/// One `name: count` line per participant, at most `limit` lines.
pub fn render_top(participants: &[ParticipantSummary], limit: usize) -> String {
	let mut out = format!("Top {limit} participant appearance counts:\n");

	if participants.is_empty() {
		out.push_str("No participant appears more than once.\n");
	}

	for summary in participants.iter().take(limit) {
		let _ = writeln!(out, "{}: {}", summary.name, summary.count());
	}

	out
}
