use clap::Parser;

use costar_report::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = Args::parse();

	costar_report::run(args).await
}
