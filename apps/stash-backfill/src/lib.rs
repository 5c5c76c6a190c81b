use std::path::PathBuf;

use clap::{
	Parser,
	builder::{
		Styles,
		styling::{AnsiColor, Effects},
	},
};
use tracing_subscriber::EnvFilter;

use stash_service::StashService;
use stash_storage::db::Db;

/// Embeds items that have no embedding with the active model.
#[derive(Debug, Parser)]
#[command(version, rename_all = "kebab", styles = styles())]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// Re-embed every item, not only those missing an embedding.
	#[arg(long)]
	pub force: bool,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = stash_config::load(&args.config)?;

	init_tracing(&config);

	let db = Db::connect(&config.storage.sqlite).await?;

	db.ensure_schema().await?;

	let service = StashService::new(config, db).await?;

	tracing::info!(
		model_id = %service.semantic.active_model_id(),
		force = args.force,
		"Starting embedding backfill."
	);

	let report = service.backfill_embeddings(args.force).await?;

	tracing::info!(
		processed = report.processed,
		failed = report.failed,
		skipped_total = report.skipped_total,
		"Embedding backfill complete."
	);

	service.db.pool.close().await;

	Ok(())
}

fn init_tracing(config: &stash_config::Config) {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Red.on_default() | Effects::BOLD)
		.usage(AnsiColor::Red.on_default() | Effects::BOLD)
		.literal(AnsiColor::Blue.on_default() | Effects::BOLD)
		.placeholder(AnsiColor::Green.on_default())
}
