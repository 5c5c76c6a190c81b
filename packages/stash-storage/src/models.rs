use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
pub struct Location {
	pub id: Uuid,
	pub name: String,
	pub description: Option<String>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
pub struct Container {
	pub id: Uuid,
	pub location_id: Uuid,
	pub parent_id: Option<Uuid>,
	pub name: String,
	pub description: Option<String>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
pub struct Category {
	pub id: Uuid,
	pub parent_id: Option<Uuid>,
	pub name: String,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum QuantityType {
	Exact,
	Approximate,
	#[default]
	Boolean,
}

#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
pub struct Item {
	pub id: Uuid,
	pub container_id: Uuid,
	pub category_id: Option<Uuid>,
	pub name: String,
	pub description: Option<String>,
	pub notes: Option<String>,
	pub quantity_type: QuantityType,
	pub quantity_value: Option<i64>,
	pub quantity_label: Option<String>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

/// An item row together with its stored embedding bytes.
#[derive(Debug, sqlx::FromRow)]
pub struct EmbeddedItem {
	#[sqlx(flatten)]
	pub item: Item,
	pub embedding: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
pub struct ItemAlias {
	pub id: Uuid,
	pub item_id: Uuid,
	pub alias: String,
	pub created_at: OffsetDateTime,
}

/// Row-level filters shared by item listing and both search probes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ItemFilter {
	pub location_id: Option<Uuid>,
	pub container_id: Option<Uuid>,
	pub category_id: Option<Uuid>,
	/// Widens `category_id` to the whole category subtree.
	#[serde(default)]
	pub include_subcategories: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ContainerFilter {
	pub location_id: Option<Uuid>,
	pub parent_id: Option<Uuid>,
	/// Only root-level containers. Ignored when `parent_id` is set.
	pub root_only: bool,
}

/// A full-text probe hit. `rank` is the raw FTS5 bm25 value: negative, more negative is better.
#[derive(Debug, sqlx::FromRow)]
pub struct TextMatch {
	#[sqlx(flatten)]
	pub item: Item,
	pub rank: f64,
}
