mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, EmbeddingModel, EmbeddingProviderConfig, Hierarchy, Providers, Reembed, Search,
	Service, Sqlite, Storage,
};

use std::{collections::HashSet, fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	parse(&raw).map_err(|err| match err {
		Error::ParseConfig { source, .. } =>
			Error::ParseConfig { path: path.to_path_buf(), source },
		other => other,
	})
}

/// Parses, normalizes and validates a config document.
pub fn parse(raw: &str) -> Result<Config> {
	let mut cfg: Config = toml::from_str(raw)
		.map_err(|err| Error::ParseConfig { path: Default::default(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}
	if cfg.storage.sqlite.path.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.sqlite.path must be non-empty.".to_string(),
		});
	}
	if cfg.storage.sqlite.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.sqlite.pool_max_conns must be greater than zero.".to_string(),
		});
	}

	validate_embedding(&cfg.providers.embedding)?;
	validate_search(&cfg.search)?;

	if cfg.hierarchy.max_tree_depth == 0 {
		return Err(Error::Validation {
			message: "hierarchy.max_tree_depth must be greater than zero.".to_string(),
		});
	}
	if cfg.hierarchy.path_separator.is_empty() {
		return Err(Error::Validation {
			message: "hierarchy.path_separator must be non-empty.".to_string(),
		});
	}
	if cfg.reembed.progress_every == 0 {
		return Err(Error::Validation {
			message: "reembed.progress_every must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn validate_embedding(embedding: &EmbeddingProviderConfig) -> Result<()> {
	if embedding.models.is_empty() {
		return Err(Error::Validation {
			message: "providers.embedding.models must list at least one model.".to_string(),
		});
	}

	let mut seen = HashSet::new();

	for model in &embedding.models {
		if model.id.trim().is_empty() {
			return Err(Error::Validation {
				message: "providers.embedding.models.id must be non-empty.".to_string(),
			});
		}
		if !seen.insert(model.id.as_str()) {
			return Err(Error::Validation {
				message: format!("providers.embedding.models contains duplicate id {:?}.", model.id),
			});
		}
		if model.dimensions == 0 {
			return Err(Error::Validation {
				message: format!(
					"providers.embedding.models[{:?}].dimensions must be greater than zero.",
					model.id
				),
			});
		}
	}

	if !seen.contains(embedding.model.as_str()) {
		return Err(Error::Validation {
			message: "providers.embedding.model must be listed in providers.embedding.models."
				.to_string(),
		});
	}
	if embedding.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.timeout_ms must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn validate_search(search: &Search) -> Result<()> {
	for (label, weight) in [
		("search.lexical_weight", search.lexical_weight),
		("search.semantic_weight", search.semantic_weight),
	] {
		if !weight.is_finite() {
			return Err(Error::Validation { message: format!("{label} must be a finite number.") });
		}
		if weight < 0.0 {
			return Err(Error::Validation { message: format!("{label} must be zero or greater.") });
		}
	}
	for (label, threshold) in [
		("search.semantic_min_similarity", search.semantic_min_similarity),
		("search.semantic_only_min_similarity", search.semantic_only_min_similarity),
	] {
		if !threshold.is_finite() || !(-1.0..=1.0).contains(&threshold) {
			return Err(Error::Validation {
				message: format!("{label} must be in the range -1.0-1.0."),
			});
		}
	}

	if search.semantic_only_min_similarity < search.semantic_min_similarity {
		return Err(Error::Validation {
			message: "search.semantic_only_min_similarity must not be lower than search.semantic_min_similarity."
				.to_string(),
		});
	}
	if !search.alias_discount.is_finite() || !(0.0..=1.0).contains(&search.alias_discount) {
		return Err(Error::Validation {
			message: "search.alias_discount must be in the range 0.0-1.0.".to_string(),
		});
	}
	if !search.lexical_rank_scale.is_finite() || search.lexical_rank_scale <= 0.0 {
		return Err(Error::Validation {
			message: "search.lexical_rank_scale must be greater than zero.".to_string(),
		});
	}
	if search.max_results == 0 {
		return Err(Error::Validation {
			message: "search.max_results must be greater than zero.".to_string(),
		});
	}
	if search.lexical_candidate_limit == 0 {
		return Err(Error::Validation {
			message: "search.lexical_candidate_limit must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	let embedding = &mut cfg.providers.embedding;

	embedding.api_key = embedding.api_key.trim().to_string();
	embedding.default_headers.retain(|key, _| !key.trim().is_empty());
}
