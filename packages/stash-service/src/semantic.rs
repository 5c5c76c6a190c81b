pub mod reembed;

use std::{
	collections::HashMap,
	sync::{Arc, RwLock, atomic::AtomicBool},
};

use serde::Serialize;
use tokio::sync::{OnceCell, watch};
use uuid::Uuid;

use stash_config::{EmbeddingModel, EmbeddingProviderConfig};
use stash_domain::{text, vector};
use stash_providers::{Embedder, EmbeddingLoader};
use stash_storage::{
	db::Db,
	models::{Item, ItemFilter},
	queries,
};

use crate::{Result, StashService, semantic::reembed::ReembedStatus};

type ModelSlot = Arc<OnceCell<Option<Arc<dyn Embedder>>>>;

const REFRESH_ATTEMPTS: usize = 3;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EmbeddingModelInfo {
	pub id: String,
	pub name: Option<String>,
	pub dimensions: u32,
	pub active: bool,
}

#[derive(Debug)]
pub struct SemanticCandidate {
	pub item: Item,
	pub similarity: f32,
}

pub struct SemanticIndex {
	enabled: bool,
	catalog: Vec<EmbeddingModel>,
	loader: Arc<dyn EmbeddingLoader>,
	slots: HashMap<String, ModelSlot>,
	active: RwLock<String>,
	status: watch::Sender<ReembedStatus>,
	running: AtomicBool,
}
impl SemanticIndex {
	pub fn new(
		cfg: &EmbeddingProviderConfig,
		active_model: String,
		loader: Arc<dyn EmbeddingLoader>,
	) -> Self {
		let slots =
			cfg.models.iter().map(|model| (model.id.clone(), ModelSlot::default())).collect();
		let (status, _) = watch::channel(ReembedStatus::idle());

		Self {
			enabled: cfg.enabled,
			catalog: cfg.models.clone(),
			loader,
			slots,
			active: RwLock::new(active_model),
			status,
			running: AtomicBool::new(false),
		}
	}

	pub fn active_model_id(&self) -> String {
		self.active.read().unwrap_or_else(|err| err.into_inner()).clone()
	}

	pub fn catalog_model(&self, id: &str) -> Option<&EmbeddingModel> {
		self.catalog.iter().find(|model| model.id == id)
	}

	pub fn models(&self) -> Vec<EmbeddingModelInfo> {
		let active = self.active_model_id();

		self.catalog
			.iter()
			.map(|model| EmbeddingModelInfo {
				id: model.id.clone(),
				name: model.name.clone(),
				dimensions: model.dimensions,
				active: model.id == active,
			})
			.collect()
	}

	/// The active model, loading it on first use. `None` when it cannot be loaded.
	pub async fn embedder(&self) -> Option<Arc<dyn Embedder>> {
		let active = self.active_model_id();

		self.embedder_for(&active).await
	}

	pub async fn is_available(&self) -> bool {
		self.embedder().await.is_some()
	}

	// A failed load is cached too.
	pub(crate) async fn embedder_for(&self, model_id: &str) -> Option<Arc<dyn Embedder>> {
		if !self.enabled {
			return None;
		}

		let slot = self.slots.get(model_id)?;
		let model = self.catalog_model(model_id)?;

		slot.get_or_init(|| async {
			match self.loader.load(model).await {
				Ok(embedder) => {
					tracing::info!(model_id = %model.id, "Embedding model ready.");

					Some(embedder)
				},
				Err(err) => {
					tracing::warn!(
						model_id = %model.id,
						error = %err,
						"Embedding model failed to load. Semantic search is disabled."
					);

					None
				},
			}
		})
		.await
		.clone()
	}

	pub async fn embed_text(&self, text: &str) -> Option<Vec<f32>> {
		let embedder = self.embedder().await?;

		embed_one(embedder.as_ref(), text).await
	}

	/// Items whose stored embedding is at least `min_similarity` to the query, in storage order.
	///
	/// Returns nothing when the model is unavailable or the query cannot be embedded. Stored
	/// vectors whose length differs from the query vector are skipped; that only happens while a
	/// model swap is still re-embedding.
	pub async fn candidates(
		&self,
		db: &Db,
		query: &str,
		filter: &ItemFilter,
		min_similarity: f32,
	) -> Result<Vec<SemanticCandidate>> {
		let Some(embedder) = self.embedder().await else {
			return Ok(Vec::new());
		};
		let Some(query_vec) = embed_one(embedder.as_ref(), query).await else {
			return Ok(Vec::new());
		};
		let rows = queries::items_with_embeddings(&db.pool, filter).await?;
		let mut items = Vec::with_capacity(rows.len());
		let mut vectors = Vec::with_capacity(rows.len());

		for row in rows {
			let Some(stored) = vector::from_bytes(&row.embedding) else {
				tracing::warn!(item_id = %row.item.id, "Stored embedding is malformed. Skipping.");

				continue;
			};

			if stored.len() != query_vec.len() {
				tracing::debug!(
					item_id = %row.item.id,
					stored_dim = stored.len(),
					query_dim = query_vec.len(),
					"Stored embedding dimension differs from the active model. Skipping."
				);

				continue;
			}

			items.push(row.item);
			vectors.push(stored);
		}

		let similarities = vector::batch_cosine_similarity(&query_vec, &vectors);
		let candidates = items
			.into_iter()
			.zip(similarities)
			.filter(|(_, similarity)| *similarity >= min_similarity)
			.map(|(item, similarity)| SemanticCandidate { item, similarity })
			.collect();

		Ok(candidates)
	}

	pub fn status(&self) -> ReembedStatus {
		self.status.borrow().clone()
	}

	pub fn subscribe(&self) -> watch::Receiver<ReembedStatus> {
		self.status.subscribe()
	}

	fn set_active(&self, model_id: &str) {
		*self.active.write().unwrap_or_else(|err| err.into_inner()) = model_id.to_string();
	}
}

pub(crate) async fn embed_one(embedder: &dyn Embedder, text: &str) -> Option<Vec<f32>> {
	let texts = [text.to_string()];
	let vector = match embedder.embed(&texts).await {
		Ok(vectors) => vectors.into_iter().next(),
		Err(err) => {
			tracing::warn!(model_id = %embedder.model_id(), error = %err, "Embedding failed.");

			return None;
		},
	};

	match vector {
		Some(vector) if vector.len() == embedder.dimensions() => Some(vector),
		Some(vector) => {
			tracing::warn!(
				model_id = %embedder.model_id(),
				expected = embedder.dimensions(),
				actual = vector.len(),
				"Embedding dimension mismatch."
			);

			None
		},
		None => {
			tracing::warn!(model_id = %embedder.model_id(), "Embedding provider returned no vectors.");

			None
		},
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Refresh {
	Stored,
	Gone,
	Failed,
}

/// Stores the vector only while the embedded text is still the row's text.
pub(crate) async fn refresh_item_embedding(
	db: &Db,
	embedder: &dyn Embedder,
	item_id: Uuid,
) -> stash_storage::Result<Refresh> {
	for _ in 0..REFRESH_ATTEMPTS {
		let Some(item) = queries::get_item(&db.pool, item_id).await? else {
			return Ok(Refresh::Gone);
		};
		let text = text::item_text(&item.name, item.description.as_deref(), item.notes.as_deref());
		let Some(vec) = embed_one(embedder, &text).await else {
			return Ok(Refresh::Failed);
		};

		if queries::store_embedding_for_text(&db.pool, &item, &vector::to_bytes(&vec)).await? {
			return Ok(Refresh::Stored);
		}

		tracing::debug!(%item_id, "Item text changed while embedding. Retrying.");
	}

	tracing::warn!(%item_id, "Item text kept changing. Embedding not stored.");

	Ok(Refresh::Failed)
}

impl StashService {
	pub fn embedding_models(&self) -> Vec<EmbeddingModelInfo> {
		self.semantic.models()
	}

	pub async fn semantic_available(&self) -> bool {
		self.semantic.is_available().await
	}

	pub(crate) async fn item_embedding(
		&self,
		name: &str,
		description: Option<&str>,
		notes: Option<&str>,
	) -> Option<Vec<u8>> {
		let text = text::item_text(name, description, notes);

		self.semantic.embed_text(&text).await.map(|vector| vector::to_bytes(&vector))
	}
}
