use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use time::OffsetDateTime;
use uuid::Uuid;

use stash_storage::{models::Category, queries};

use crate::{Error, ParentUpdate, Result, StashService, required_name};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CreateCategory {
	pub name: String,
	pub parent_id: Option<Uuid>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UpdateCategory {
	pub name: Option<String>,
	#[serde(default)]
	pub parent: ParentUpdate,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CategoryNode {
	pub id: Uuid,
	pub name: String,
	pub children: Vec<CategoryNode>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CategoryDeletion {
	pub id: Uuid,
	/// Descendants removed along with the category, deepest first.
	pub deleted_children: Vec<Uuid>,
}

impl StashService {
	pub async fn create_category(&self, req: CreateCategory) -> Result<Category> {
		let name = required_name(&req.name, "name")?;
		let mut tx = self.db.begin_write().await?;

		if let Some(parent_id) = req.parent_id
			&& queries::get_category(&mut *tx, parent_id).await?.is_none()
		{
			return Err(parent_missing(parent_id));
		}

		ensure_unique_category(&mut tx, req.parent_id, &name, None).await?;

		let now = OffsetDateTime::now_utc();
		let category = Category {
			id: Uuid::new_v4(),
			parent_id: req.parent_id,
			name,
			created_at: now,
			updated_at: now,
		};

		queries::insert_category(&mut *tx, &category).await?;

		tx.commit().await?;

		tracing::info!(category_id = %category.id, "Category created.");

		Ok(category)
	}

	pub async fn get_category(&self, id: Uuid) -> Result<Category> {
		queries::get_category(&self.db.pool, id).await?.ok_or_else(|| category_missing(id))
	}

	pub async fn list_categories(&self) -> Result<Vec<Category>> {
		Ok(queries::list_categories(&self.db.pool).await?)
	}

	/// A category whose parent is gone is shown as a root.
	pub async fn category_tree(&self) -> Result<Vec<CategoryNode>> {
		let categories = queries::list_categories(&self.db.pool).await?;
		let known: HashSet<Uuid> = categories.iter().map(|category| category.id).collect();
		let mut children: HashMap<Option<Uuid>, Vec<&Category>> = HashMap::new();

		for category in &categories {
			let parent = category.parent_id.filter(|parent_id| known.contains(parent_id));

			children.entry(parent).or_default().push(category);
		}

		let mut visited = HashSet::new();

		Ok(category_nodes(&children, None, &mut visited))
	}

	/// Renames or re-parents a category. Moving it under itself or its own subtree is a
	/// `CIRCULAR_REFERENCE`.
	pub async fn update_category(&self, id: Uuid, req: UpdateCategory) -> Result<Category> {
		if req.name.is_none() && req.parent == ParentUpdate::Keep {
			return Err(Error::invalid("No updates provided."));
		}

		let mut tx = self.db.begin_write().await?;
		let mut category =
			queries::get_category(&mut *tx, id).await?.ok_or_else(|| category_missing(id))?;
		let parent_id = match req.parent {
			ParentUpdate::Keep => category.parent_id,
			ParentUpdate::Root => None,
			ParentUpdate::Set(parent_id) => Some(parent_id),
		};

		if let Some(parent_id) = parent_id
			&& Some(parent_id) != category.parent_id
		{
			if parent_id == id {
				return Err(Error::CircularReference {
					message: "A category cannot be its own parent.".to_string(),
				});
			}
			if queries::get_category(&mut *tx, parent_id).await?.is_none() {
				return Err(parent_missing(parent_id));
			}

			let categories = queries::list_categories(&mut *tx).await?;

			if subtree(&categories, id).contains(&parent_id) {
				return Err(Error::CircularReference {
					message: "A category cannot move into its own subtree.".to_string(),
				});
			}
		}

		let name = match req.name.as_deref() {
			Some(name) => required_name(name, "name")?,
			None => category.name.clone(),
		};

		if name != category.name || parent_id != category.parent_id {
			ensure_unique_category(&mut tx, parent_id, &name, Some(id)).await?;
		}

		category.name = name;
		category.parent_id = parent_id;
		category.updated_at = OffsetDateTime::now_utc();

		queries::update_category(&mut *tx, &category).await?;

		tx.commit().await?;

		tracing::info!(category_id = %id, "Category updated.");

		Ok(category)
	}

	/// Deletes a category and its empty descendants. Refused while any of them still holds
	/// items.
	pub async fn delete_category(&self, id: Uuid) -> Result<CategoryDeletion> {
		let mut tx = self.db.begin_write().await?;
		let category =
			queries::get_category(&mut *tx, id).await?.ok_or_else(|| category_missing(id))?;
		let counts = queries::category_item_counts(&mut *tx).await?;

		if let Some(&item_count) = counts.get(&id) {
			return Err(Error::HasDependencies {
				message: format!(
					"Category {:?} has {item_count} items. Reassign them first.",
					category.name
				),
				details: serde_json::json!({ "item_count": item_count }),
			});
		}

		let categories = queries::list_categories(&mut *tx).await?;
		let descendants = subtree(&categories, id);

		for child_id in &descendants {
			if let Some(&item_count) = counts.get(child_id) {
				return Err(Error::HasDependencies {
					message: format!(
						"Category {:?} has a subcategory with {item_count} items.",
						category.name
					),
					details: serde_json::json!({
						"child_category_id": child_id,
						"item_count": item_count,
					}),
				});
			}
		}

		let mut doomed = descendants.clone();

		doomed.push(id);
		queries::delete_categories(&mut *tx, &doomed).await?;

		tx.commit().await?;

		let deleted_children: Vec<Uuid> = descendants.into_iter().rev().collect();

		tracing::info!(category_id = %id, children = deleted_children.len(), "Category deleted.");

		Ok(CategoryDeletion { id, deleted_children })
	}

	pub(crate) async fn ensure_category(&self, category_id: Option<Uuid>) -> Result<()> {
		let Some(category_id) = category_id else {
			return Ok(());
		};

		if queries::get_category(&self.db.pool, category_id).await?.is_none() {
			return Err(Error::NotFound {
				message: "Category not found.".to_string(),
				details: Some(serde_json::json!({ "category_id": category_id })),
			});
		}

		Ok(())
	}
}

fn subtree(categories: &[Category], root: Uuid) -> Vec<Uuid> {
	let mut by_parent: HashMap<Uuid, Vec<Uuid>> = HashMap::new();

	for category in categories {
		if let Some(parent_id) = category.parent_id {
			by_parent.entry(parent_id).or_default().push(category.id);
		}
	}

	let mut seen = HashSet::from([root]);
	let mut out = Vec::new();
	let mut idx = 0;
	let mut frontier = vec![root];

	while idx < frontier.len() {
		let current = frontier[idx];

		idx += 1;

		for &child in by_parent.get(&current).into_iter().flatten() {
			if seen.insert(child) {
				out.push(child);
				frontier.push(child);
			}
		}
	}

	out
}

fn category_nodes(
	children: &HashMap<Option<Uuid>, Vec<&Category>>,
	parent: Option<Uuid>,
	visited: &mut HashSet<Uuid>,
) -> Vec<CategoryNode> {
	let mut nodes = Vec::new();

	for category in children.get(&parent).into_iter().flatten() {
		if !visited.insert(category.id) {
			tracing::warn!(category_id = %category.id, "Category cycle detected. Truncating tree.");

			continue;
		}

		nodes.push(CategoryNode {
			id: category.id,
			name: category.name.clone(),
			children: category_nodes(children, Some(category.id), visited),
		});
	}

	nodes
}

async fn ensure_unique_category(
	conn: &mut SqliteConnection,
	parent_id: Option<Uuid>,
	name: &str,
	exclude_id: Option<Uuid>,
) -> Result<()> {
	if queries::find_category_sibling(conn, parent_id, name, exclude_id).await?.is_some() {
		return Err(Error::AlreadyExists {
			message: format!("Category {name:?} already exists at this level."),
		});
	}

	Ok(())
}

fn category_missing(id: Uuid) -> Error {
	Error::NotFound {
		message: "Category not found.".to_string(),
		details: Some(serde_json::json!({ "category_id": id })),
	}
}

fn parent_missing(parent_id: Uuid) -> Error {
	Error::NotFound {
		message: "Parent category not found.".to_string(),
		details: Some(serde_json::json!({ "parent_id": parent_id })),
	}
}
