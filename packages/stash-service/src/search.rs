pub mod lexical;
pub mod ranking;

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use stash_storage::models::{Container, Item, ItemFilter, Location};

use crate::{
	Result, StashService,
	search::ranking::{LexicalHit, RankingParams, SemanticHit},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
	Text,
	Alias,
}

#[derive(Clone, Debug, Serialize)]
pub struct SearchResult {
	pub item: Item,
	pub container: Container,
	pub location: Location,
	pub score: f32,
	/// Full container path, prefixed by the location name.
	pub path: String,
	pub lexical_score: Option<f32>,
	pub semantic_score: Option<f32>,
	pub matched_via: Option<MatchSource>,
}

impl StashService {
	/// A blank query returns nothing without touching storage.
	pub async fn search(&self, query: &str, filter: &ItemFilter) -> Result<Vec<SearchResult>> {
		let query = query.trim();

		if query.is_empty() {
			return Ok(Vec::new());
		}

		let search_cfg = &self.cfg.search;
		let lexical_rows =
			lexical::candidates(&self.db, query, filter, search_cfg.lexical_candidate_limit).await?;
		let semantic_rows = self
			.semantic
			.candidates(&self.db, query, filter, search_cfg.semantic_min_similarity)
			.await?;
		let mut items: HashMap<Uuid, Item> = HashMap::new();
		let mut lexical_hits = Vec::with_capacity(lexical_rows.len());
		let mut semantic_hits = Vec::with_capacity(semantic_rows.len());

		for row in lexical_rows {
			lexical_hits.push(LexicalHit {
				item_id: row.item.id,
				raw_rank: row.raw_rank,
				source: row.source,
			});
			items.entry(row.item.id).or_insert(row.item);
		}
		for row in semantic_rows {
			semantic_hits.push(SemanticHit { item_id: row.item.id, similarity: row.similarity });
			items.entry(row.item.id).or_insert(row.item);
		}

		let ranked =
			ranking::rank(&lexical_hits, &semantic_hits, &RankingParams::from(search_cfg));

		tracing::debug!(
			lexical = lexical_hits.len(),
			semantic = semantic_hits.len(),
			ranked = ranked.len(),
			"Search candidates merged."
		);

		if ranked.is_empty() {
			return Ok(Vec::new());
		}

		let snapshot = self.hierarchy_snapshot().await?;
		let mut results = Vec::with_capacity(ranked.len());

		for hit in ranked {
			let Some(item) = items.remove(&hit.item_id) else {
				continue;
			};
			let Some(container) = snapshot.containers.get(&item.container_id) else {
				tracing::warn!(
					item_id = %item.id,
					container_id = %item.container_id,
					"Search hit references a missing container. Skipping."
				);

				continue;
			};
			let Some(location) = snapshot.locations.get(&container.location_id) else {
				tracing::warn!(
					container_id = %container.id,
					location_id = %container.location_id,
					"Container references a missing location. Skipping."
				);

				continue;
			};

			results.push(SearchResult {
				path: snapshot.index.build_path(container.id, true),
				container: container.clone(),
				location: location.clone(),
				item,
				score: hit.score,
				lexical_score: hit.lexical,
				semantic_score: hit.semantic,
				matched_via: hit.source,
			});
		}

		Ok(results)
	}
}
