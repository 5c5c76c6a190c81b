pub mod aliases;
pub mod backfill;
pub mod categories;
pub mod containers;
pub mod hierarchy;
pub mod items;
pub mod locations;
pub mod search;
pub mod semantic;

mod error;

pub use backfill::BackfillReport;
pub use categories::{CategoryDeletion, CategoryNode, CreateCategory, UpdateCategory};
pub use containers::{
	ContainerDetail, CreateContainer, LocationRef, ParentUpdate, PathPart, PathPartKind,
	UpdateContainer,
};
pub use error::{Error, ErrorKind, ErrorReport, Result};
pub use hierarchy::TreeRequest;
pub use items::{CreateItem, ItemDetail, UpdateItem};
pub use locations::{CreateLocation, UpdateLocation};
pub use search::{MatchSource, SearchResult};
pub use semantic::{
	EmbeddingModelInfo, SemanticIndex,
	reembed::{JobState, ModelChange, ReembedHandle, ReembedStatus},
};

use std::sync::Arc;

use stash_config::Config;
use stash_providers::{EmbeddingLoader, embedding::HttpEmbeddingLoader};
use stash_storage::{db::Db, queries};

/// Settings key holding the id of the active embedding model.
pub const ACTIVE_MODEL_SETTING: &str = "embedding_model";

pub struct StashService {
	pub cfg: Config,
	pub db: Db,
	pub semantic: Arc<SemanticIndex>,
}
impl StashService {
	pub async fn new(cfg: Config, db: Db) -> Result<Self> {
		let loader = Arc::new(HttpEmbeddingLoader::new(cfg.providers.embedding.clone()));

		Self::with_loader(cfg, db, loader).await
	}

	pub async fn with_loader(
		cfg: Config,
		db: Db,
		loader: Arc<dyn EmbeddingLoader>,
	) -> Result<Self> {
		let active_model = resolve_active_model(&cfg, &db).await?;
		let semantic =
			Arc::new(SemanticIndex::new(&cfg.providers.embedding, active_model, loader));

		Ok(Self { cfg, db, semantic })
	}
}

// A persisted model wins while the catalog still lists it.
async fn resolve_active_model(cfg: &Config, db: &Db) -> Result<String> {
	let configured = cfg.providers.embedding.model.clone();
	let Some(persisted) = queries::get_setting(&db.pool, ACTIVE_MODEL_SETTING).await? else {
		return Ok(configured);
	};

	if cfg.embedding_model(&persisted).is_some() {
		return Ok(persisted);
	}

	tracing::warn!(
		persisted_model = %persisted,
		configured_model = %configured,
		"Persisted embedding model is not in the catalog. Using the configured model."
	);

	Ok(configured)
}

pub(crate) fn required_name(value: &str, field: &str) -> Result<String> {
	let trimmed = value.trim();

	if trimmed.is_empty() {
		return Err(Error::invalid(format!("{field} must be non-empty.")));
	}

	Ok(trimmed.to_string())
}

pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
	value.map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}
