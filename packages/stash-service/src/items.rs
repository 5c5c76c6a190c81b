use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use stash_storage::{
	models::{Container, Item, ItemAlias, ItemFilter, Location, QuantityType},
	queries,
};

use crate::{
	Error, Result, StashService, containers::container_missing, locations::location_missing,
	optional_text, required_name,
};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CreateItem {
	pub container_id: Uuid,
	pub name: String,
	pub description: Option<String>,
	pub notes: Option<String>,
	pub category_id: Option<Uuid>,
	#[serde(default)]
	pub quantity_type: QuantityType,
	pub quantity_value: Option<i64>,
	pub quantity_label: Option<String>,
}

/// Fields left as `None` keep their value. Blank optional text clears it.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UpdateItem {
	pub name: Option<String>,
	pub description: Option<String>,
	pub notes: Option<String>,
	pub category_id: Option<Uuid>,
	pub quantity_type: Option<QuantityType>,
	pub quantity_value: Option<i64>,
	pub quantity_label: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ItemDetail {
	pub item: Item,
	pub container: Container,
	pub location: Location,
	pub path: String,
	pub aliases: Vec<ItemAlias>,
}

impl StashService {
	pub async fn add_item(&self, req: CreateItem) -> Result<Item> {
		let name = required_name(&req.name, "name")?;

		self.container(req.container_id).await?;
		self.ensure_category(req.category_id).await?;

		let now = OffsetDateTime::now_utc();
		let mut item = Item {
			id: Uuid::new_v4(),
			container_id: req.container_id,
			category_id: req.category_id,
			name,
			description: optional_text(req.description),
			notes: optional_text(req.notes),
			quantity_type: req.quantity_type,
			quantity_value: req.quantity_value,
			quantity_label: optional_text(req.quantity_label),
			created_at: now,
			updated_at: now,
		};

		normalize_quantity(&mut item)?;

		let embedding = self
			.item_embedding(&item.name, item.description.as_deref(), item.notes.as_deref())
			.await;

		if embedding.is_none() {
			tracing::warn!(item_id = %item.id, "Item stored without an embedding.");
		}

		queries::insert_item(&self.db.pool, &item, embedding.as_deref()).await?;

		tracing::info!(item_id = %item.id, container_id = %item.container_id, "Item added.");

		Ok(item)
	}

	pub async fn get_item(&self, id: Uuid) -> Result<ItemDetail> {
		let item = self.item(id).await?;
		let snapshot = self.hierarchy_snapshot().await?;
		let container = snapshot
			.containers
			.get(&item.container_id)
			.cloned()
			.ok_or_else(|| container_missing(item.container_id))?;
		let location = snapshot
			.locations
			.get(&container.location_id)
			.cloned()
			.ok_or_else(|| location_missing(container.location_id))?;
		let path = snapshot.index.build_path(container.id, true);
		let aliases = queries::list_aliases(&self.db.pool, id).await?;

		Ok(ItemDetail { item, container, location, path, aliases })
	}

	pub async fn list_items(&self, filter: &ItemFilter) -> Result<Vec<Item>> {
		Ok(queries::list_items(&self.db.pool, filter).await?)
	}

	/// Applies field updates. When name, description or notes change, the new embedding is
	/// computed first and written together with the row.
	pub async fn update_item(&self, id: Uuid, req: UpdateItem) -> Result<Item> {
		let mut item = self.item(id).await?;
		let before = (item.name.clone(), item.description.clone(), item.notes.clone());

		if let Some(name) = req.name.as_deref() {
			item.name = required_name(name, "name")?;
		}
		if req.description.is_some() {
			item.description = optional_text(req.description);
		}
		if req.notes.is_some() {
			item.notes = optional_text(req.notes);
		}
		if req.category_id.is_some() {
			item.category_id = req.category_id;
		}
		if let Some(quantity_type) = req.quantity_type {
			item.quantity_type = quantity_type;
		}
		if req.quantity_value.is_some() {
			item.quantity_value = req.quantity_value;
		}
		if req.quantity_label.is_some() {
			item.quantity_label = optional_text(req.quantity_label);
		}

		normalize_quantity(&mut item)?;
		self.ensure_category(req.category_id).await?;

		item.updated_at = OffsetDateTime::now_utc();

		if before == (item.name.clone(), item.description.clone(), item.notes.clone()) {
			queries::update_item(&self.db.pool, &item).await?;

			return Ok(item);
		}

		// A stale vector would keep matching the old text, so a failed embed clears it.
		let embedding = self
			.item_embedding(&item.name, item.description.as_deref(), item.notes.as_deref())
			.await;

		if embedding.is_none() {
			tracing::warn!(item_id = %id, "Item text changed but could not be re-embedded.");
		}

		queries::update_item_with_embedding(&self.db.pool, &item, embedding.as_deref()).await?;

		Ok(item)
	}

	/// Moves the whole item to another container. The embedding is kept.
	pub async fn move_item(&self, id: Uuid, container_id: Uuid) -> Result<Item> {
		let mut item = self.item(id).await?;

		self.container(container_id).await?;

		if item.container_id == container_id {
			return Ok(item);
		}

		let from = item.container_id;

		item.container_id = container_id;
		item.updated_at = OffsetDateTime::now_utc();

		queries::update_item(&self.db.pool, &item).await?;

		tracing::info!(
			item_id = %id,
			from_container_id = %from,
			to_container_id = %container_id,
			"Item moved."
		);

		Ok(item)
	}

	pub async fn remove_item(&self, id: Uuid) -> Result<()> {
		if !queries::delete_item(&self.db.pool, id).await? {
			return Err(item_missing(id));
		}

		tracing::info!(item_id = %id, "Item removed.");

		Ok(())
	}

	pub(crate) async fn item(&self, id: Uuid) -> Result<Item> {
		queries::get_item(&self.db.pool, id).await?.ok_or_else(|| item_missing(id))
	}
}

pub(crate) fn item_missing(id: Uuid) -> Error {
	Error::not_found(format!("Item {id} does not exist."))
}

fn normalize_quantity(item: &mut Item) -> Result<()> {
	if item.quantity_type == QuantityType::Boolean {
		item.quantity_value = Some(1);
	}
	if item.quantity_value.is_some_and(|value| value < 0) {
		return Err(Error::invalid("quantity_value must be zero or greater."));
	}

	Ok(())
}
