pub mod embedding;

mod error;

pub use error::{Error, Result};

use std::{future::Future, pin::Pin, sync::Arc};

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName};
use serde_json::{Map, Value};

use stash_config::EmbeddingModel;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A loaded embedding model with a fixed output dimensionality.
pub trait Embedder
where
	Self: Send + Sync,
{
	fn model_id(&self) -> &str;

	fn dimensions(&self) -> usize;

	fn embed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>>;
}

/// Produces an [`Embedder`] for a catalog entry. A failed load means the model is unavailable.
pub trait EmbeddingLoader
where
	Self: Send + Sync,
{
	fn load<'a>(
		&'a self,
		model: &'a EmbeddingModel,
	) -> BoxFuture<'a, color_eyre::Result<Arc<dyn Embedder>>>;
}

/// Builds request headers. An empty key sends no `Authorization` header.
pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	if !api_key.is_empty() {
		headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);
	}

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: "Default header values must be strings.".to_string(),
			});
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}
