use std::collections::HashMap;

use sqlx::{QueryBuilder, Sqlite, SqliteExecutor};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	Error, Result,
	models::{
		Category, Container, ContainerFilter, EmbeddedItem, Item, ItemAlias, ItemFilter, Location,
	},
};

pub(crate) const ITEM_COLUMNS: &str = "\
i.id, i.container_id, i.category_id, i.name, i.description, i.notes, i.quantity_type, \
i.quantity_value, i.quantity_label, i.created_at, i.updated_at";

pub async fn insert_location<'e, E>(executor: E, location: &Location) -> Result<()>
where
	E: SqliteExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO locations (id, name, description, created_at, updated_at)
VALUES (?, ?, ?, ?, ?)",
	)
	.bind(location.id)
	.bind(location.name.as_str())
	.bind(location.description.as_deref())
	.bind(location.created_at)
	.bind(location.updated_at)
	.execute(executor)
	.await
	.map_err(|err| Error::conflict_on_unique(err, format!("location {:?}", location.name)))?;

	Ok(())
}

pub async fn get_location<'e, E>(executor: E, id: Uuid) -> Result<Option<Location>>
where
	E: SqliteExecutor<'e>,
{
	let location = sqlx::query_as::<_, Location>(
		"SELECT id, name, description, created_at, updated_at FROM locations WHERE id = ?",
	)
	.bind(id)
	.fetch_optional(executor)
	.await?;

	Ok(location)
}

pub async fn get_location_by_name<'e, E>(executor: E, name: &str) -> Result<Option<Location>>
where
	E: SqliteExecutor<'e>,
{
	let location = sqlx::query_as::<_, Location>(
		"SELECT id, name, description, created_at, updated_at FROM locations WHERE name = ?",
	)
	.bind(name)
	.fetch_optional(executor)
	.await?;

	Ok(location)
}

pub async fn list_locations<'e, E>(executor: E) -> Result<Vec<Location>>
where
	E: SqliteExecutor<'e>,
{
	let locations = sqlx::query_as::<_, Location>(
		"SELECT id, name, description, created_at, updated_at FROM locations ORDER BY name",
	)
	.fetch_all(executor)
	.await?;

	Ok(locations)
}

pub async fn update_location<'e, E>(executor: E, location: &Location) -> Result<()>
where
	E: SqliteExecutor<'e>,
{
	let result = sqlx::query(
		"\
UPDATE locations
SET name = ?, description = ?, updated_at = ?
WHERE id = ?",
	)
	.bind(location.name.as_str())
	.bind(location.description.as_deref())
	.bind(location.updated_at)
	.bind(location.id)
	.execute(executor)
	.await
	.map_err(|err| Error::conflict_on_unique(err, format!("location {:?}", location.name)))?;

	if result.rows_affected() == 0 {
		return Err(Error::NotFound(format!("location {}", location.id)));
	}

	Ok(())
}

pub async fn delete_location<'e, E>(executor: E, id: Uuid) -> Result<bool>
where
	E: SqliteExecutor<'e>,
{
	let result = sqlx::query("DELETE FROM locations WHERE id = ?").bind(id).execute(executor).await?;

	Ok(result.rows_affected() > 0)
}

pub async fn count_location_containers<'e, E>(executor: E, location_id: Uuid) -> Result<i64>
where
	E: SqliteExecutor<'e>,
{
	let count = sqlx::query_scalar("SELECT COUNT(*) FROM containers WHERE location_id = ?")
		.bind(location_id)
		.fetch_one(executor)
		.await?;

	Ok(count)
}

pub async fn insert_container<'e, E>(executor: E, container: &Container) -> Result<()>
where
	E: SqliteExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO containers (id, location_id, parent_id, name, description, created_at, updated_at)
VALUES (?, ?, ?, ?, ?, ?, ?)",
	)
	.bind(container.id)
	.bind(container.location_id)
	.bind(container.parent_id)
	.bind(container.name.as_str())
	.bind(container.description.as_deref())
	.bind(container.created_at)
	.bind(container.updated_at)
	.execute(executor)
	.await
	.map_err(|err| Error::conflict_on_unique(err, format!("container {:?}", container.name)))?;

	Ok(())
}

pub async fn get_container<'e, E>(executor: E, id: Uuid) -> Result<Option<Container>>
where
	E: SqliteExecutor<'e>,
{
	let container = sqlx::query_as::<_, Container>(
		"\
SELECT id, location_id, parent_id, name, description, created_at, updated_at
FROM containers
WHERE id = ?",
	)
	.bind(id)
	.fetch_optional(executor)
	.await?;

	Ok(container)
}

/// Lists containers ordered by location name, then container name.
pub async fn list_containers<'e, E>(executor: E, filter: &ContainerFilter) -> Result<Vec<Container>>
where
	E: SqliteExecutor<'e>,
{
	let mut builder = QueryBuilder::<Sqlite>::new(
		"\
SELECT c.id, c.location_id, c.parent_id, c.name, c.description, c.created_at, c.updated_at
FROM containers c
JOIN locations l ON l.id = c.location_id
WHERE 1 = 1",
	);

	if let Some(location_id) = filter.location_id {
		builder.push(" AND c.location_id = ");
		builder.push_bind(location_id);
	}
	if let Some(parent_id) = filter.parent_id {
		builder.push(" AND c.parent_id = ");
		builder.push_bind(parent_id);
	} else if filter.root_only {
		builder.push(" AND c.parent_id IS NULL");
	}

	builder.push(" ORDER BY l.name, c.name, c.id");

	let containers = builder.build_query_as::<Container>().fetch_all(executor).await?;

	Ok(containers)
}

/// Looks for another container named `name` at the given level.
pub async fn find_sibling<'e, E>(
	executor: E,
	location_id: Uuid,
	parent_id: Option<Uuid>,
	name: &str,
	exclude_id: Option<Uuid>,
) -> Result<Option<Uuid>>
where
	E: SqliteExecutor<'e>,
{
	let mut builder = QueryBuilder::<Sqlite>::new("SELECT id FROM containers WHERE location_id = ");

	builder.push_bind(location_id);
	builder.push(" AND name = ");
	builder.push_bind(name);

	match parent_id {
		Some(parent_id) => {
			builder.push(" AND parent_id = ");
			builder.push_bind(parent_id);
		},
		None => {
			builder.push(" AND parent_id IS NULL");
		},
	}

	if let Some(exclude_id) = exclude_id {
		builder.push(" AND id <> ");
		builder.push_bind(exclude_id);
	}

	builder.push(" LIMIT 1");

	let id = builder.build_query_scalar::<Uuid>().fetch_optional(executor).await?;

	Ok(id)
}

pub async fn update_container<'e, E>(executor: E, container: &Container) -> Result<()>
where
	E: SqliteExecutor<'e>,
{
	let result = sqlx::query(
		"\
UPDATE containers
SET location_id = ?, parent_id = ?, name = ?, description = ?, updated_at = ?
WHERE id = ?",
	)
	.bind(container.location_id)
	.bind(container.parent_id)
	.bind(container.name.as_str())
	.bind(container.description.as_deref())
	.bind(container.updated_at)
	.bind(container.id)
	.execute(executor)
	.await
	.map_err(|err| Error::conflict_on_unique(err, format!("container {:?}", container.name)))?;

	if result.rows_affected() == 0 {
		return Err(Error::NotFound(format!("container {}", container.id)));
	}

	Ok(())
}

pub async fn delete_container<'e, E>(executor: E, id: Uuid) -> Result<bool>
where
	E: SqliteExecutor<'e>,
{
	let result =
		sqlx::query("DELETE FROM containers WHERE id = ?").bind(id).execute(executor).await?;

	Ok(result.rows_affected() > 0)
}

pub async fn count_child_containers<'e, E>(executor: E, container_id: Uuid) -> Result<i64>
where
	E: SqliteExecutor<'e>,
{
	let count = sqlx::query_scalar("SELECT COUNT(*) FROM containers WHERE parent_id = ?")
		.bind(container_id)
		.fetch_one(executor)
		.await?;

	Ok(count)
}

pub async fn count_container_items<'e, E>(executor: E, container_id: Uuid) -> Result<i64>
where
	E: SqliteExecutor<'e>,
{
	let count = sqlx::query_scalar("SELECT COUNT(*) FROM items WHERE container_id = ?")
		.bind(container_id)
		.fetch_one(executor)
		.await?;

	Ok(count)
}

/// Item counts keyed by container. Containers without items are absent.
pub async fn container_item_counts<'e, E>(executor: E) -> Result<HashMap<Uuid, i64>>
where
	E: SqliteExecutor<'e>,
{
	let rows: Vec<(Uuid, i64)> =
		sqlx::query_as("SELECT container_id, COUNT(*) FROM items GROUP BY container_id")
			.fetch_all(executor)
			.await?;

	Ok(rows.into_iter().collect())
}

pub async fn insert_category<'e, E>(executor: E, category: &Category) -> Result<()>
where
	E: SqliteExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO categories (id, parent_id, name, created_at, updated_at)
VALUES (?, ?, ?, ?, ?)",
	)
	.bind(category.id)
	.bind(category.parent_id)
	.bind(category.name.as_str())
	.bind(category.created_at)
	.bind(category.updated_at)
	.execute(executor)
	.await
	.map_err(|err| Error::conflict_on_unique(err, format!("category {:?}", category.name)))?;

	Ok(())
}

pub async fn get_category<'e, E>(executor: E, id: Uuid) -> Result<Option<Category>>
where
	E: SqliteExecutor<'e>,
{
	let category = sqlx::query_as::<_, Category>(
		"SELECT id, parent_id, name, created_at, updated_at FROM categories WHERE id = ?",
	)
	.bind(id)
	.fetch_optional(executor)
	.await?;

	Ok(category)
}

pub async fn list_categories<'e, E>(executor: E) -> Result<Vec<Category>>
where
	E: SqliteExecutor<'e>,
{
	let categories = sqlx::query_as::<_, Category>(
		"SELECT id, parent_id, name, created_at, updated_at FROM categories ORDER BY name, id",
	)
	.fetch_all(executor)
	.await?;

	Ok(categories)
}

/// Looks for another category named `name` under the same parent.
pub async fn find_category_sibling<'e, E>(
	executor: E,
	parent_id: Option<Uuid>,
	name: &str,
	exclude_id: Option<Uuid>,
) -> Result<Option<Uuid>>
where
	E: SqliteExecutor<'e>,
{
	let mut builder = QueryBuilder::<Sqlite>::new("SELECT id FROM categories WHERE name = ");

	builder.push_bind(name);

	match parent_id {
		Some(parent_id) => {
			builder.push(" AND parent_id = ");
			builder.push_bind(parent_id);
		},
		None => {
			builder.push(" AND parent_id IS NULL");
		},
	}

	if let Some(exclude_id) = exclude_id {
		builder.push(" AND id <> ");
		builder.push_bind(exclude_id);
	}

	builder.push(" LIMIT 1");

	let id = builder.build_query_scalar::<Uuid>().fetch_optional(executor).await?;

	Ok(id)
}

pub async fn update_category<'e, E>(executor: E, category: &Category) -> Result<()>
where
	E: SqliteExecutor<'e>,
{
	let result = sqlx::query(
		"\
UPDATE categories
SET parent_id = ?, name = ?, updated_at = ?
WHERE id = ?",
	)
	.bind(category.parent_id)
	.bind(category.name.as_str())
	.bind(category.updated_at)
	.bind(category.id)
	.execute(executor)
	.await
	.map_err(|err| Error::conflict_on_unique(err, format!("category {:?}", category.name)))?;

	if result.rows_affected() == 0 {
		return Err(Error::NotFound(format!("category {}", category.id)));
	}

	Ok(())
}

/// Deletes the given categories in one statement, so parent links among them never dangle.
pub async fn delete_categories<'e, E>(executor: E, ids: &[Uuid]) -> Result<u64>
where
	E: SqliteExecutor<'e>,
{
	if ids.is_empty() {
		return Ok(0);
	}

	let mut builder = QueryBuilder::<Sqlite>::new("DELETE FROM categories WHERE id IN (");
	let mut list = builder.separated(", ");

	for id in ids {
		list.push_bind(*id);
	}

	builder.push(")");

	let result = builder.build().execute(executor).await?;

	Ok(result.rows_affected())
}

/// Item counts keyed by category. Categories without items are absent.
pub async fn category_item_counts<'e, E>(executor: E) -> Result<HashMap<Uuid, i64>>
where
	E: SqliteExecutor<'e>,
{
	let rows: Vec<(Uuid, i64)> = sqlx::query_as(
		"\
SELECT category_id, COUNT(*)
FROM items
WHERE category_id IS NOT NULL
GROUP BY category_id",
	)
	.fetch_all(executor)
	.await?;

	Ok(rows.into_iter().collect())
}

pub async fn insert_item<'e, E>(executor: E, item: &Item, embedding: Option<&[u8]>) -> Result<()>
where
	E: SqliteExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO items (
	id,
	container_id,
	category_id,
	name,
	description,
	notes,
	quantity_type,
	quantity_value,
	quantity_label,
	embedding,
	created_at,
	updated_at
)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
	)
	.bind(item.id)
	.bind(item.container_id)
	.bind(item.category_id)
	.bind(item.name.as_str())
	.bind(item.description.as_deref())
	.bind(item.notes.as_deref())
	.bind(item.quantity_type)
	.bind(item.quantity_value)
	.bind(item.quantity_label.as_deref())
	.bind(embedding)
	.bind(item.created_at)
	.bind(item.updated_at)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn get_item<'e, E>(executor: E, id: Uuid) -> Result<Option<Item>>
where
	E: SqliteExecutor<'e>,
{
	let sql = format!("SELECT {ITEM_COLUMNS} FROM items i WHERE i.id = ?");
	let item = sqlx::query_as::<_, Item>(&sql).bind(id).fetch_optional(executor).await?;

	Ok(item)
}

/// Lists items ordered by name.
pub async fn list_items<'e, E>(executor: E, filter: &ItemFilter) -> Result<Vec<Item>>
where
	E: SqliteExecutor<'e>,
{
	let mut builder = QueryBuilder::<Sqlite>::new(format!(
		"SELECT {ITEM_COLUMNS} FROM items i JOIN containers c ON c.id = i.container_id WHERE 1 = 1"
	));

	push_item_filter(&mut builder, filter);
	builder.push(" ORDER BY i.name, i.id");

	let items = builder.build_query_as::<Item>().fetch_all(executor).await?;

	Ok(items)
}

/// Updates every column except the embedding.
pub async fn update_item<'e, E>(executor: E, item: &Item) -> Result<()>
where
	E: SqliteExecutor<'e>,
{
	let mut builder = QueryBuilder::<Sqlite>::new("UPDATE items SET ");

	push_item_assignments(&mut builder, item);
	finish_item_update(builder, executor, item.id).await
}

/// Updates every column and replaces the embedding in the same statement. `None` clears it.
pub async fn update_item_with_embedding<'e, E>(
	executor: E,
	item: &Item,
	embedding: Option<&[u8]>,
) -> Result<()>
where
	E: SqliteExecutor<'e>,
{
	let mut builder = QueryBuilder::<Sqlite>::new("UPDATE items SET embedding = ");

	builder.push_bind(embedding);
	builder.push(", ");
	push_item_assignments(&mut builder, item);
	finish_item_update(builder, executor, item.id).await
}

/// Single-row embedding write. `None` clears the stored embedding.
pub async fn update_item_embedding<'e, E>(
	executor: E,
	item_id: Uuid,
	embedding: Option<&[u8]>,
) -> Result<()>
where
	E: SqliteExecutor<'e>,
{
	let result = sqlx::query("UPDATE items SET embedding = ? WHERE id = ?")
		.bind(embedding)
		.bind(item_id)
		.execute(executor)
		.await?;

	if result.rows_affected() == 0 {
		return Err(Error::NotFound(format!("item {item_id}")));
	}

	Ok(())
}

/// Stores an embedding computed from `item`'s text, but only while the row still carries that
/// text. Returns `false` when the item was edited or removed in the meantime.
pub async fn store_embedding_for_text<'e, E>(
	executor: E,
	item: &Item,
	embedding: &[u8],
) -> Result<bool>
where
	E: SqliteExecutor<'e>,
{
	let result = sqlx::query(
		"\
UPDATE items
SET embedding = ?
WHERE id = ? AND name = ? AND description IS ? AND notes IS ?",
	)
	.bind(embedding)
	.bind(item.id)
	.bind(item.name.as_str())
	.bind(item.description.as_deref())
	.bind(item.notes.as_deref())
	.execute(executor)
	.await?;

	Ok(result.rows_affected() > 0)
}

pub async fn get_item_embedding<'e, E>(executor: E, item_id: Uuid) -> Result<Option<Vec<u8>>>
where
	E: SqliteExecutor<'e>,
{
	let embedding: Option<Option<Vec<u8>>> =
		sqlx::query_scalar("SELECT embedding FROM items WHERE id = ?")
			.bind(item_id)
			.fetch_optional(executor)
			.await?;

	Ok(embedding.flatten())
}

/// Removes an item. Its aliases go with it through the cascading foreign key.
pub async fn delete_item<'e, E>(executor: E, id: Uuid) -> Result<bool>
where
	E: SqliteExecutor<'e>,
{
	let result = sqlx::query("DELETE FROM items WHERE id = ?").bind(id).execute(executor).await?;

	Ok(result.rows_affected() > 0)
}

/// Items carrying a stored embedding, narrowed by the filter.
pub async fn items_with_embeddings<'e, E>(
	executor: E,
	filter: &ItemFilter,
) -> Result<Vec<EmbeddedItem>>
where
	E: SqliteExecutor<'e>,
{
	let mut builder = QueryBuilder::<Sqlite>::new(format!(
		"\
SELECT {ITEM_COLUMNS}, i.embedding
FROM items i
JOIN containers c ON c.id = i.container_id
WHERE i.embedding IS NOT NULL"
	));

	push_item_filter(&mut builder, filter);
	builder.push(" ORDER BY i.id");

	let rows = builder.build_query_as::<EmbeddedItem>().fetch_all(executor).await?;

	Ok(rows)
}

/// Ids of items to (re)embed, in id order. `only_missing` restricts to items without an
/// embedding.
pub async fn item_ids_for_embedding<'e, E>(executor: E, only_missing: bool) -> Result<Vec<Uuid>>
where
	E: SqliteExecutor<'e>,
{
	let sql = if only_missing {
		"SELECT id FROM items WHERE embedding IS NULL ORDER BY id"
	} else {
		"SELECT id FROM items ORDER BY id"
	};
	let ids = sqlx::query_scalar::<_, Uuid>(sql).fetch_all(executor).await?;

	Ok(ids)
}

pub async fn count_items<'e, E>(executor: E) -> Result<i64>
where
	E: SqliteExecutor<'e>,
{
	let count = sqlx::query_scalar("SELECT COUNT(*) FROM items").fetch_one(executor).await?;

	Ok(count)
}

pub async fn insert_alias<'e, E>(executor: E, alias: &ItemAlias) -> Result<()>
where
	E: SqliteExecutor<'e>,
{
	sqlx::query("INSERT INTO item_aliases (id, item_id, alias, created_at) VALUES (?, ?, ?, ?)")
		.bind(alias.id)
		.bind(alias.item_id)
		.bind(alias.alias.as_str())
		.bind(alias.created_at)
		.execute(executor)
		.await
		.map_err(|err| Error::conflict_on_unique(err, format!("alias {:?}", alias.alias)))?;

	Ok(())
}

pub async fn get_alias<'e, E>(executor: E, id: Uuid) -> Result<Option<ItemAlias>>
where
	E: SqliteExecutor<'e>,
{
	let alias = sqlx::query_as::<_, ItemAlias>(
		"SELECT id, item_id, alias, created_at FROM item_aliases WHERE id = ?",
	)
	.bind(id)
	.fetch_optional(executor)
	.await?;

	Ok(alias)
}

pub async fn list_aliases<'e, E>(executor: E, item_id: Uuid) -> Result<Vec<ItemAlias>>
where
	E: SqliteExecutor<'e>,
{
	let aliases = sqlx::query_as::<_, ItemAlias>(
		"SELECT id, item_id, alias, created_at FROM item_aliases WHERE item_id = ? ORDER BY alias",
	)
	.bind(item_id)
	.fetch_all(executor)
	.await?;

	Ok(aliases)
}

pub async fn delete_alias<'e, E>(executor: E, id: Uuid) -> Result<bool>
where
	E: SqliteExecutor<'e>,
{
	let result =
		sqlx::query("DELETE FROM item_aliases WHERE id = ?").bind(id).execute(executor).await?;

	Ok(result.rows_affected() > 0)
}

pub async fn get_setting<'e, E>(executor: E, key: &str) -> Result<Option<String>>
where
	E: SqliteExecutor<'e>,
{
	let value = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
		.bind(key)
		.fetch_optional(executor)
		.await?;

	Ok(value)
}

pub async fn set_setting<'e, E>(executor: E, key: &str, value: &str) -> Result<()>
where
	E: SqliteExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO settings (key, value, updated_at)
VALUES (?, ?, ?)
ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
	)
	.bind(key)
	.bind(value)
	.bind(OffsetDateTime::now_utc())
	.execute(executor)
	.await?;

	Ok(())
}

/// Appends ` AND ...` clauses. Expects `i` (items) and `c` (containers) in scope.
pub(crate) fn push_item_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &ItemFilter) {
	if let Some(location_id) = filter.location_id {
		builder.push(" AND c.location_id = ");
		builder.push_bind(location_id);
	}
	if let Some(container_id) = filter.container_id {
		builder.push(" AND i.container_id = ");
		builder.push_bind(container_id);
	}
	if let Some(category_id) = filter.category_id {
		if filter.include_subcategories {
			// UNION (not UNION ALL) stops at rows already seen, so a parent cycle terminates.
			builder.push(" AND i.category_id IN (WITH RECURSIVE subtree(id) AS (SELECT ");
			builder.push_bind(category_id);
			builder.push(
				" UNION SELECT cat.id FROM categories cat JOIN subtree ON cat.parent_id = subtree.id) \
SELECT id FROM subtree)",
			);
		} else {
			builder.push(" AND i.category_id = ");
			builder.push_bind(category_id);
		}
	}
}

fn push_item_assignments<'a>(builder: &mut QueryBuilder<'a, Sqlite>, item: &'a Item) {
	let mut set = builder.separated(", ");

	set.push("container_id = ").push_bind_unseparated(item.container_id);
	set.push("category_id = ").push_bind_unseparated(item.category_id);
	set.push("name = ").push_bind_unseparated(item.name.as_str());
	set.push("description = ").push_bind_unseparated(item.description.as_deref());
	set.push("notes = ").push_bind_unseparated(item.notes.as_deref());
	set.push("quantity_type = ").push_bind_unseparated(item.quantity_type);
	set.push("quantity_value = ").push_bind_unseparated(item.quantity_value);
	set.push("quantity_label = ").push_bind_unseparated(item.quantity_label.as_deref());
	set.push("updated_at = ").push_bind_unseparated(item.updated_at);
}

async fn finish_item_update<'e, E>(
	mut builder: QueryBuilder<'_, Sqlite>,
	executor: E,
	id: Uuid,
) -> Result<()>
where
	E: SqliteExecutor<'e>,
{
	builder.push(" WHERE id = ");
	builder.push_bind(id);

	let result = builder.build().execute(executor).await?;

	if result.rows_affected() == 0 {
		return Err(Error::NotFound(format!("item {id}")));
	}

	Ok(())
}
