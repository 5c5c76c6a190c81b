use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = stash_backfill::Args::parse();

	stash_backfill::run(args).await
}
