use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = costar_api::Args::parse();

	costar_api::run(args).await
}
