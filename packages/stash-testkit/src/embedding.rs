use std::{
	collections::HashSet,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};

use color_eyre::eyre;

use stash_config::EmbeddingModel;
use stash_providers::{BoxFuture, Embedder, EmbeddingLoader};

/// Deterministic bag-of-words embedding.
///
/// Each lowercase alphanumeric token is hashed with blake3 into one signed bucket, so texts that
/// share words have positive cosine similarity and texts that share none are close to zero.
pub struct HashedEmbedding {
	model_id: String,
	dimensions: usize,
	delay: Duration,
	fail_marker: Option<String>,
}
impl HashedEmbedding {
	pub fn new(model_id: impl Into<String>, dimensions: usize) -> Self {
		Self { model_id: model_id.into(), dimensions, delay: Duration::ZERO, fail_marker: None }
	}

	pub fn vector(&self, text: &str) -> Vec<f32> {
		let mut vector = vec![0.0; self.dimensions];

		for token in tokens(text) {
			let hash = blake3::hash(token.as_bytes());
			let bytes = hash.as_bytes();
			let bucket = u64::from_le_bytes([
				bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
			]) % self.dimensions as u64;
			let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };

			vector[bucket as usize] += sign;
		}

		vector
	}
}
impl Embedder for HashedEmbedding {
	fn model_id(&self) -> &str {
		&self.model_id
	}

	fn dimensions(&self) -> usize {
		self.dimensions
	}

	fn embed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(async move {
			if !self.delay.is_zero() {
				tokio::time::sleep(self.delay).await;
			}
			if let Some(marker) = self.fail_marker.as_deref()
				&& texts.iter().any(|text| text.contains(marker))
			{
				return Err(eyre::eyre!("Embedding rejected input containing {marker:?}."));
			}

			Ok(texts.iter().map(|text| self.vector(text)).collect())
		})
	}
}

/// Loads a [`HashedEmbedding`] for any catalog entry and counts how often it was asked to.
#[derive(Default)]
pub struct HashedLoader {
	delay: Duration,
	fail_marker: Option<String>,
	unavailable: HashSet<String>,
	loads: Arc<AtomicUsize>,
}
impl HashedLoader {
	pub fn new() -> Self {
		Self::default()
	}

	/// Every embed call sleeps this long first.
	pub fn with_delay(mut self, delay: Duration) -> Self {
		self.delay = delay;

		self
	}

	/// Embed calls fail when any input contains `marker`.
	pub fn failing_on(mut self, marker: impl Into<String>) -> Self {
		self.fail_marker = Some(marker.into());

		self
	}

	/// Loading `model_id` fails.
	pub fn unavailable(mut self, model_id: impl Into<String>) -> Self {
		self.unavailable.insert(model_id.into());

		self
	}

	pub fn load_count(&self) -> usize {
		self.loads.load(Ordering::SeqCst)
	}
}
impl EmbeddingLoader for HashedLoader {
	fn load<'a>(
		&'a self,
		model: &'a EmbeddingModel,
	) -> BoxFuture<'a, color_eyre::Result<Arc<dyn Embedder>>> {
		Box::pin(async move {
			self.loads.fetch_add(1, Ordering::SeqCst);

			if self.unavailable.contains(&model.id) {
				return Err(eyre::eyre!("Model {:?} is not installed.", model.id));
			}

			let embedder = HashedEmbedding {
				model_id: model.id.clone(),
				dimensions: model.dimensions as usize,
				delay: self.delay,
				fail_marker: self.fail_marker.clone(),
			};

			Ok(Arc::new(embedder) as Arc<dyn Embedder>)
		})
	}
}

/// A loader whose every load fails, standing in for a model that is not installed.
pub struct FailingLoader;
impl EmbeddingLoader for FailingLoader {
	fn load<'a>(
		&'a self,
		model: &'a EmbeddingModel,
	) -> BoxFuture<'a, color_eyre::Result<Arc<dyn Embedder>>> {
		Box::pin(async move { Err(eyre::eyre!("Model {:?} failed to load.", model.id)) })
	}
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
	text.split(|c: char| !c.is_alphanumeric())
		.filter(|token| !token.is_empty())
		.map(str::to_lowercase)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn cosine(a: &[f32], b: &[f32]) -> f32 {
		let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
		let norm = |v: &[f32]| v.iter().map(|x| x * x).sum::<f32>().sqrt();

		dot / (norm(a) * norm(b))
	}

	#[test]
	fn shared_words_are_similar() {
		let model = HashedEmbedding::new("m", 256);
		let hammer = model.vector("Hammer");

		assert_eq!(hammer.len(), 256);
		assert!((cosine(&hammer, &model.vector("hammer")) - 1.0).abs() < 1e-6);
		assert!(cosine(&hammer, &model.vector("Claw hammer, steel head")) > 0.3);
	}

	#[test]
	fn vectors_are_deterministic() {
		let a = HashedEmbedding::new("m", 64);
		let b = HashedEmbedding::new("other", 64);

		assert_eq!(a.vector("socket wrench"), b.vector("socket wrench"));
	}
}
