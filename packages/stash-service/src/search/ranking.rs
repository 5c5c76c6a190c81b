use std::{cmp::Ordering, collections::HashMap};

use uuid::Uuid;

use stash_config::Search;

use crate::search::MatchSource;

#[derive(Clone, Copy, Debug)]
pub struct LexicalHit {
	pub item_id: Uuid,
	pub raw_rank: f64,
	pub source: MatchSource,
}

#[derive(Clone, Copy, Debug)]
pub struct SemanticHit {
	pub item_id: Uuid,
	pub similarity: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ranked {
	pub item_id: Uuid,
	pub score: f32,
	/// Normalized lexical score after the alias discount.
	pub lexical: Option<f32>,
	pub semantic: Option<f32>,
	pub source: Option<MatchSource>,
}

#[derive(Clone, Copy, Debug)]
pub struct RankingParams {
	pub lexical_weight: f32,
	pub semantic_weight: f32,
	pub semantic_only_min_similarity: f32,
	pub alias_discount: f32,
	pub lexical_rank_scale: f32,
	pub max_results: usize,
}
impl From<&Search> for RankingParams {
	fn from(search: &Search) -> Self {
		Self {
			lexical_weight: search.lexical_weight,
			semantic_weight: search.semantic_weight,
			semantic_only_min_similarity: search.semantic_only_min_similarity,
			alias_discount: search.alias_discount,
			lexical_rank_scale: search.lexical_rank_scale,
			max_results: search.max_results as usize,
		}
	}
}

/// Maps a raw FTS rank (negative, larger magnitude is better) onto `0.0..=1.0`.
pub fn normalize_rank(raw_rank: f64, scale: f32) -> f32 {
	if !raw_rank.is_finite() || scale <= 0.0 {
		return 0.0;
	}

	((raw_rank.abs() / f64::from(scale)).min(1.0)) as f32
}

/// Merges lexical and semantic hits into one list, best first.
///
/// Lexical hits for the same item collapse to the strongest discounted score. Items only found
/// semantically must clear the vector-only threshold. Ties break on item id.
pub fn rank(lexical: &[LexicalHit], semantic: &[SemanticHit], params: &RankingParams) -> Vec<Ranked> {
	let mut lexical_best: HashMap<Uuid, (f32, MatchSource)> = HashMap::new();

	for hit in lexical {
		let mut score = normalize_rank(hit.raw_rank, params.lexical_rank_scale);

		if hit.source == MatchSource::Alias {
			score *= params.alias_discount;
		}

		lexical_best
			.entry(hit.item_id)
			.and_modify(|best| {
				let stronger = score > best.0
					|| (score == best.0 && hit.source == MatchSource::Text);

				if stronger {
					*best = (score, hit.source);
				}
			})
			.or_insert((score, hit.source));
	}

	let mut semantic_best: HashMap<Uuid, f32> = HashMap::new();

	for hit in semantic {
		semantic_best
			.entry(hit.item_id)
			.and_modify(|best| *best = best.max(hit.similarity))
			.or_insert(hit.similarity);
	}

	let mut ranked: Vec<Ranked> = lexical_best
		.iter()
		.map(|(item_id, (lexical, source))| {
			let semantic = semantic_best.get(item_id).copied();

			Ranked {
				item_id: *item_id,
				score: lexical * params.lexical_weight
					+ semantic.unwrap_or(0.0) * params.semantic_weight,
				lexical: Some(*lexical),
				semantic,
				source: Some(*source),
			}
		})
		.collect();

	for (item_id, similarity) in &semantic_best {
		if lexical_best.contains_key(item_id) || *similarity < params.semantic_only_min_similarity {
			continue;
		}

		ranked.push(Ranked {
			item_id: *item_id,
			score: similarity * params.semantic_weight,
			lexical: None,
			semantic: Some(*similarity),
			source: None,
		});
	}

	ranked.sort_by(|a, b| {
		b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal).then(a.item_id.cmp(&b.item_id))
	});
	ranked.truncate(params.max_results);

	ranked
}
