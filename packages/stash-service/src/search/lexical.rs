use stash_storage::{
	db::Db,
	models::{Item, ItemFilter},
	search,
};

use crate::{Result, search::MatchSource};

#[derive(Debug)]
pub struct LexicalCandidate {
	pub item: Item,
	pub raw_rank: f64,
	pub source: MatchSource,
}

/// Turns free text into an FTS5 expression: every whitespace token becomes a quoted prefix term,
/// joined by implicit AND.
///
/// Quoting keeps punctuation in user input from being read as query syntax. Tokens without any
/// alphanumeric character cannot match anything and are dropped. `None` means there is nothing to
/// search for.
pub fn match_expression(query: &str) -> Option<String> {
	let terms: Vec<String> = query
		.split_whitespace()
		.filter(|token| token.chars().any(char::is_alphanumeric))
		.map(|token| format!("\"{}\"*", token.replace('"', "\"\"")))
		.collect();

	if terms.is_empty() { None } else { Some(terms.join(" ")) }
}

pub async fn candidates(
	db: &Db,
	query: &str,
	filter: &ItemFilter,
	limit: u32,
) -> Result<Vec<LexicalCandidate>> {
	let Some(expr) = match_expression(query) else {
		return Ok(Vec::new());
	};
	let text_rows = search::search_item_text(&db.pool, &expr, filter, limit).await?;
	let alias_rows = search::search_alias_text(&db.pool, &expr, filter, limit).await?;
	let text = text_rows.into_iter().map(|row| LexicalCandidate {
		item: row.item,
		raw_rank: row.rank,
		source: MatchSource::Text,
	});
	let alias = alias_rows.into_iter().map(|row| LexicalCandidate {
		item: row.item,
		raw_rank: row.rank,
		source: MatchSource::Alias,
	});

	Ok(text.chain(alias).collect())
}
