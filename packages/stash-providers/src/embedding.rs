use std::{sync::Arc, time::Duration};

use reqwest::Client;
use serde_json::Value;

use stash_config::{EmbeddingModel, EmbeddingProviderConfig};

use crate::{BoxFuture, Embedder, EmbeddingLoader, Error, Result};

const PROBE_TEXT: &str = "ping";

/// Calls an OpenAI-compatible `/embeddings` endpoint for `model`.
pub async fn embed(
	client: &Client,
	cfg: &EmbeddingProviderConfig,
	model: &EmbeddingModel,
	texts: &[String],
) -> Result<Vec<Vec<f32>>> {
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": model.id,
		"input": texts,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;
	let vectors = parse_embedding_response(json)?;

	check_shape(&vectors, texts.len(), model.dimensions as usize)?;

	Ok(vectors)
}

pub fn build_client(cfg: &EmbeddingProviderConfig) -> Result<Client> {
	Ok(Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?)
}

fn parse_embedding_response(json: Value) -> Result<Vec<Vec<f32>>> {
	let data = json.get("data").and_then(|v| v.as_array()).ok_or_else(|| {
		Error::InvalidResponse { message: "Embedding response is missing data array.".to_string() }
	})?;
	let mut indexed: Vec<(usize, Vec<f32>)> = Vec::with_capacity(data.len());

	for (fallback_index, item) in data.iter().enumerate() {
		let index = item
			.get("index")
			.and_then(|v| v.as_u64())
			.map(|v| v as usize)
			.unwrap_or(fallback_index);
		let embedding = item.get("embedding").and_then(|v| v.as_array()).ok_or_else(|| {
			Error::InvalidResponse {
				message: "Embedding item missing embedding array.".to_string(),
			}
		})?;
		let mut vec = Vec::with_capacity(embedding.len());

		for value in embedding {
			let number = value.as_f64().ok_or_else(|| Error::InvalidResponse {
				message: "Embedding value must be numeric.".to_string(),
			})?;

			vec.push(number as f32);
		}

		indexed.push((index, vec));
	}

	indexed.sort_by_key(|(index, _)| *index);

	Ok(indexed.into_iter().map(|(_, vec)| vec).collect())
}

fn check_shape(vectors: &[Vec<f32>], expected_len: usize, dimensions: usize) -> Result<()> {
	if vectors.len() != expected_len {
		return Err(Error::InvalidResponse {
			message: format!(
				"Embedding response returned {} vectors for {expected_len} inputs.",
				vectors.len()
			),
		});
	}
	if let Some(vector) = vectors.iter().find(|vector| vector.len() != dimensions) {
		return Err(Error::InvalidResponse {
			message: format!(
				"Embedding dimension mismatch: expected {dimensions}, got {}.",
				vector.len()
			),
		});
	}

	Ok(())
}

/// Loads models served by the configured HTTP embedding provider.
///
/// Loading sends one probe request, so an unreachable endpoint or a model with the wrong
/// dimensionality is reported at load time instead of on the first search.
pub struct HttpEmbeddingLoader {
	cfg: EmbeddingProviderConfig,
}
impl HttpEmbeddingLoader {
	pub fn new(cfg: EmbeddingProviderConfig) -> Self {
		Self { cfg }
	}

	async fn load_model(&self, model: &EmbeddingModel) -> Result<HttpEmbedder> {
		if !self.cfg.enabled {
			return Err(Error::InvalidConfig {
				message: "Embedding provider is disabled.".to_string(),
			});
		}

		let client = build_client(&self.cfg)?;

		embed(&client, &self.cfg, model, &[PROBE_TEXT.to_string()]).await?;

		Ok(HttpEmbedder { client, cfg: self.cfg.clone(), model: model.clone() })
	}
}
impl EmbeddingLoader for HttpEmbeddingLoader {
	fn load<'a>(
		&'a self,
		model: &'a EmbeddingModel,
	) -> BoxFuture<'a, color_eyre::Result<Arc<dyn Embedder>>> {
		Box::pin(async move {
			let embedder = self.load_model(model).await?;

			tracing::info!(
				provider_id = %self.cfg.provider_id,
				model_id = %model.id,
				dimensions = model.dimensions,
				"Embedding model loaded."
			);

			Ok(Arc::new(embedder) as Arc<dyn Embedder>)
		})
	}
}

pub struct HttpEmbedder {
	client: Client,
	cfg: EmbeddingProviderConfig,
	model: EmbeddingModel,
}
impl Embedder for HttpEmbedder {
	fn model_id(&self) -> &str {
		&self.model.id
	}

	fn dimensions(&self) -> usize {
		self.model.dimensions as usize
	}

	fn embed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(async move { Ok(embed(&self.client, &self.cfg, &self.model, texts).await?) })
	}
}
