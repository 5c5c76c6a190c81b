//! FTS5 probes over item text and alias text.
//!
//! Both probes take a ready-made FTS5 match expression; building it from user input is the
//! caller's job.

use sqlx::{QueryBuilder, Sqlite, SqliteExecutor};

use crate::{
	Error, Result,
	models::{ItemFilter, TextMatch},
	queries::{ITEM_COLUMNS, push_item_filter},
};

/// Probes item name and description. One row per matching item, best rank first.
pub async fn search_item_text<'e, E>(
	executor: E,
	match_expr: &str,
	filter: &ItemFilter,
	limit: u32,
) -> Result<Vec<TextMatch>>
where
	E: SqliteExecutor<'e>,
{
	ensure_expression(match_expr)?;

	let mut builder = QueryBuilder::<Sqlite>::new(format!(
		"\
SELECT {ITEM_COLUMNS}, items_fts.rank AS rank
FROM items_fts
JOIN items i ON i.seq = items_fts.rowid
JOIN containers c ON c.id = i.container_id
WHERE items_fts MATCH "
	));

	builder.push_bind(match_expr);
	push_item_filter(&mut builder, filter);
	builder.push(" ORDER BY items_fts.rank, i.id LIMIT ");
	builder.push_bind(i64::from(limit));

	let rows = builder.build_query_as::<TextMatch>().fetch_all(executor).await?;

	Ok(rows)
}

/// Probes alias text. An item with several matching aliases appears once per alias.
pub async fn search_alias_text<'e, E>(
	executor: E,
	match_expr: &str,
	filter: &ItemFilter,
	limit: u32,
) -> Result<Vec<TextMatch>>
where
	E: SqliteExecutor<'e>,
{
	ensure_expression(match_expr)?;

	let mut builder = QueryBuilder::<Sqlite>::new(format!(
		"\
SELECT {ITEM_COLUMNS}, aliases_fts.rank AS rank
FROM aliases_fts
JOIN item_aliases a ON a.seq = aliases_fts.rowid
JOIN items i ON i.id = a.item_id
JOIN containers c ON c.id = i.container_id
WHERE aliases_fts MATCH "
	));

	builder.push_bind(match_expr);
	push_item_filter(&mut builder, filter);
	builder.push(" ORDER BY aliases_fts.rank, i.id LIMIT ");
	builder.push_bind(i64::from(limit));

	let rows = builder.build_query_as::<TextMatch>().fetch_all(executor).await?;

	Ok(rows)
}

fn ensure_expression(match_expr: &str) -> Result<()> {
	if match_expr.trim().is_empty() {
		return Err(Error::InvalidArgument("FTS match expression must be non-empty.".to_string()));
	}

	Ok(())
}
