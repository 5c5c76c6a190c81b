use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub search: Search,
	#[serde(default)]
	pub hierarchy: Hierarchy,
	#[serde(default)]
	pub reembed: Reembed,
}
impl Config {
	/// Looks up a model in the embedding catalog.
	pub fn embedding_model(&self, id: &str) -> Option<&EmbeddingModel> {
		self.providers.embedding.models.iter().find(|model| model.id == id)
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub sqlite: Sqlite,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sqlite {
	pub path: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingProviderConfig {
	#[serde(default = "default_true")]
	pub enabled: bool,
	pub provider_id: String,
	pub api_base: String,
	#[serde(default)]
	pub api_key: String,
	pub path: String,
	/// Default model id. A model persisted through a model swap takes precedence.
	pub model: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
	pub models: Vec<EmbeddingModel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EmbeddingModel {
	pub id: String,
	#[serde(default)]
	pub name: Option<String>,
	pub dimensions: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Search {
	pub lexical_weight: f32,
	pub semantic_weight: f32,
	/// Soft inclusion threshold for every semantic candidate.
	pub semantic_min_similarity: f32,
	/// Stricter threshold for items the lexical probes did not find.
	pub semantic_only_min_similarity: f32,
	pub alias_discount: f32,
	/// Raw lexical rank magnitude that maps to a normalized score of 1.0.
	pub lexical_rank_scale: f32,
	pub max_results: u32,
	pub lexical_candidate_limit: u32,
}
impl Default for Search {
	fn default() -> Self {
		Self {
			lexical_weight: 0.5,
			semantic_weight: 0.5,
			semantic_min_similarity: 0.3,
			semantic_only_min_similarity: 0.4,
			alias_discount: 0.9,
			lexical_rank_scale: 10.0,
			max_results: 50,
			lexical_candidate_limit: 100,
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Hierarchy {
	pub max_tree_depth: u32,
	pub path_separator: String,
}
impl Default for Hierarchy {
	fn default() -> Self {
		Self { max_tree_depth: 10, path_separator: "/".to_string() }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Reembed {
	/// Publish job progress every N processed items.
	pub progress_every: u32,
}
impl Default for Reembed {
	fn default() -> Self {
		Self { progress_every: 10 }
	}
}

fn default_true() -> bool {
	true
}
