mod embedding;
mod error;

pub use embedding::{FailingLoader, HashedEmbedding, HashedLoader};
pub use error::{Error, Result};

use std::{
	env, fs, io,
	path::{Path, PathBuf},
};

use serde_json::Map;
use uuid::Uuid;

use stash_config::{
	Config, EmbeddingModel, EmbeddingProviderConfig, Hierarchy, Providers, Reembed, Search,
	Service, Sqlite, Storage,
};

pub const SMALL_MODEL: &str = "hash-small";
pub const LARGE_MODEL: &str = "hash-large";

/// A SQLite database file unique to one test. Removed on [`TestDatabase::cleanup`] or drop.
pub struct TestDatabase {
	path: PathBuf,
	cleaned: bool,
}
impl TestDatabase {
	pub fn new() -> Result<Self> {
		let dir = env::temp_dir().join("stash-tests");

		fs::create_dir_all(&dir)?;

		let path = dir.join(format!("stash_test_{}.db", Uuid::new_v4().simple()));

		Ok(Self { path, cleaned: false })
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn sqlite(&self) -> Sqlite {
		Sqlite { path: self.path.to_string_lossy().into_owned(), pool_max_conns: 4 }
	}

	/// A complete config pointing at this database with a two-entry hashed model catalog.
	pub fn config(&self) -> Config {
		test_config(self.sqlite())
	}

	pub fn cleanup(mut self) -> Result<()> {
		self.cleanup_inner()
	}

	fn cleanup_inner(&mut self) -> Result<()> {
		if self.cleaned {
			return Ok(());
		}

		for suffix in ["", "-wal", "-shm"] {
			let mut path = self.path.clone().into_os_string();

			path.push(suffix);

			match fs::remove_file(&path) {
				Ok(()) => {},
				Err(err) if err.kind() == io::ErrorKind::NotFound => {},
				Err(err) => return Err(err.into()),
			}
		}

		self.cleaned = true;

		Ok(())
	}
}
impl Drop for TestDatabase {
	fn drop(&mut self) {
		if let Err(err) = self.cleanup_inner() {
			eprintln!("Test database cleanup failed: {err}.");
		}
	}
}

pub fn test_config(sqlite: Sqlite) -> Config {
	Config {
		service: Service { log_level: "info".to_string() },
		storage: Storage { sqlite },
		providers: Providers {
			embedding: EmbeddingProviderConfig {
				enabled: true,
				provider_id: "hashed".to_string(),
				api_base: "http://127.0.0.1:9".to_string(),
				api_key: String::new(),
				path: "/v1/embeddings".to_string(),
				model: SMALL_MODEL.to_string(),
				timeout_ms: 1_000,
				default_headers: Map::new(),
				models: vec![
					EmbeddingModel {
						id: SMALL_MODEL.to_string(),
						name: Some("Hashed (Small)".to_string()),
						dimensions: 256,
					},
					EmbeddingModel {
						id: LARGE_MODEL.to_string(),
						name: Some("Hashed (Large)".to_string()),
						dimensions: 512,
					},
				],
			},
		},
		search: Search::default(),
		hierarchy: Hierarchy::default(),
		reembed: Reembed { progress_every: 1 },
	}
}
