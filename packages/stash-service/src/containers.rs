use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use time::OffsetDateTime;
use uuid::Uuid;

use stash_domain::hierarchy::ContainerIndex;
use stash_storage::{
	models::{Container, ContainerFilter, Location},
	queries,
};

use crate::{
	Error, Result, StashService, hierarchy::record, locations::location_missing, optional_text,
	required_name,
};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CreateContainer {
	pub location_id: Uuid,
	pub parent_id: Option<Uuid>,
	pub name: String,
	pub description: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentUpdate {
	#[default]
	Keep,
	/// Move to the root level of the (new) location.
	Root,
	Set(Uuid),
}

/// Fields left as `None` keep their value. A blank description clears it.
///
/// Changing the location requires a parent in the new location or a move to its root level.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UpdateContainer {
	pub name: Option<String>,
	pub description: Option<String>,
	pub location_id: Option<Uuid>,
	#[serde(default)]
	pub parent: ParentUpdate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathPartKind {
	Location,
	Container,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PathPart {
	pub id: Uuid,
	pub name: String,
	pub kind: PathPartKind,
}

#[derive(Clone, Debug, Serialize)]
pub struct ContainerDetail {
	pub container: Container,
	pub location: Location,
	pub parent: Option<Container>,
	pub children: Vec<Container>,
	pub item_count: i64,
	/// The location followed by every ancestor container, root first.
	pub ancestors: Vec<PathPart>,
	pub path: String,
}

/// How a relative container path names its location.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationRef {
	Id(Uuid),
	Name(String),
}

impl StashService {
	pub async fn create_container(&self, req: CreateContainer) -> Result<Container> {
		let name = required_name(&req.name, "name")?;
		let mut tx = self.db.begin_write().await?;

		if queries::get_location(&mut *tx, req.location_id).await?.is_none() {
			return Err(location_missing(req.location_id));
		}
		if let Some(parent_id) = req.parent_id {
			let parent = queries::get_container(&mut *tx, parent_id)
				.await?
				.ok_or_else(|| container_missing(parent_id))?;

			if parent.location_id != req.location_id {
				return Err(Error::invalid("Parent container must be in the same location."));
			}
		}

		ensure_unique_sibling(&mut tx, req.location_id, req.parent_id, &name, None).await?;

		let now = OffsetDateTime::now_utc();
		let container = Container {
			id: Uuid::new_v4(),
			location_id: req.location_id,
			parent_id: req.parent_id,
			name,
			description: optional_text(req.description),
			created_at: now,
			updated_at: now,
		};

		queries::insert_container(&mut *tx, &container).await?;

		tx.commit().await?;

		tracing::info!(
			container_id = %container.id,
			location_id = %container.location_id,
			"Container created."
		);

		Ok(container)
	}

	pub async fn get_container(&self, id: Uuid) -> Result<ContainerDetail> {
		let snapshot = self.hierarchy_snapshot().await?;
		let Some(container) = snapshot.containers.get(&id).cloned() else {
			return Err(container_missing(id));
		};
		let location = snapshot
			.locations
			.get(&container.location_id)
			.cloned()
			.ok_or_else(|| location_missing(container.location_id))?;
		let parent =
			container.parent_id.and_then(|parent_id| snapshot.containers.get(&parent_id).cloned());
		let children = snapshot
			.index
			.children(id)
			.filter_map(|child| snapshot.containers.get(&child.id).cloned())
			.collect();
		let mut ancestors = vec![PathPart {
			id: location.id,
			name: location.name.clone(),
			kind: PathPartKind::Location,
		}];

		ancestors.extend(snapshot.index.ancestors(id).into_iter().map(|ancestor| PathPart {
			id: ancestor.id,
			name: ancestor.name.clone(),
			kind: PathPartKind::Container,
		}));

		let item_count = queries::count_container_items(&self.db.pool, id).await?;
		let path = snapshot.index.build_path(id, true);

		Ok(ContainerDetail { container, location, parent, children, item_count, ancestors, path })
	}

	pub async fn list_containers(&self, filter: &ContainerFilter) -> Result<Vec<Container>> {
		Ok(queries::list_containers(&self.db.pool, filter).await?)
	}

	/// A move onto itself or into its own subtree is a `CIRCULAR_REFERENCE`. The checks run in
	/// the same write transaction as the update.
	pub async fn update_container(&self, id: Uuid, req: UpdateContainer) -> Result<Container> {
		if req.name.is_none()
			&& req.description.is_none()
			&& req.location_id.is_none()
			&& req.parent == ParentUpdate::Keep
		{
			return Err(Error::invalid("No updates provided."));
		}

		let mut tx = self.db.begin_write().await?;
		let mut container =
			queries::get_container(&mut *tx, id).await?.ok_or_else(|| container_missing(id))?;
		let location_id = req.location_id.unwrap_or(container.location_id);
		let parent_id = match req.parent {
			ParentUpdate::Keep => container.parent_id,
			ParentUpdate::Root => None,
			ParentUpdate::Set(parent_id) => Some(parent_id),
		};

		if location_id != container.location_id {
			if queries::get_location(&mut *tx, location_id).await?.is_none() {
				return Err(location_missing(location_id));
			}
			if queries::count_child_containers(&mut *tx, id).await? > 0 {
				return Err(Error::invalid(
					"A container with child containers cannot change location.",
				));
			}
		}
		if let Some(parent_id) = parent_id {
			if parent_id == id {
				return Err(Error::CircularReference {
					message: "A container cannot be its own parent.".to_string(),
				});
			}

			let parent = queries::get_container(&mut *tx, parent_id)
				.await?
				.ok_or_else(|| container_missing(parent_id))?;

			if parent.location_id != location_id {
				return Err(Error::invalid("Parent container must be in the same location."));
			}

			let filter = ContainerFilter { location_id: Some(location_id), ..Default::default() };
			let containers = queries::list_containers(&mut *tx, &filter).await?;
			let index = ContainerIndex::new(containers.iter().map(record).collect());

			if index.is_descendant(id, parent_id) {
				return Err(Error::CircularReference {
					message: "A container cannot move into its own subtree.".to_string(),
				});
			}
		}

		let name = match req.name.as_deref() {
			Some(name) => required_name(name, "name")?,
			None => container.name.clone(),
		};

		if name != container.name
			|| location_id != container.location_id
			|| parent_id != container.parent_id
		{
			ensure_unique_sibling(&mut tx, location_id, parent_id, &name, Some(id)).await?;
		}

		container.name = name;
		container.location_id = location_id;
		container.parent_id = parent_id;

		if req.description.is_some() {
			container.description = optional_text(req.description);
		}

		container.updated_at = OffsetDateTime::now_utc();

		queries::update_container(&mut *tx, &container).await?;

		tx.commit().await?;

		tracing::info!(container_id = %id, "Container updated.");

		Ok(container)
	}

	pub async fn delete_container(&self, id: Uuid) -> Result<()> {
		let mut tx = self.db.begin_write().await?;
		let container =
			queries::get_container(&mut *tx, id).await?.ok_or_else(|| container_missing(id))?;
		let child_count = queries::count_child_containers(&mut *tx, id).await?;

		if child_count > 0 {
			return Err(Error::HasDependencies {
				message: format!(
					"Container {:?} has {child_count} child containers. Remove or move them first.",
					container.name
				),
				details: serde_json::json!({ "child_count": child_count }),
			});
		}

		let item_count = queries::count_container_items(&mut *tx, id).await?;

		if item_count > 0 {
			return Err(Error::HasDependencies {
				message: format!(
					"Container {:?} holds {item_count} items. Remove or move them first.",
					container.name
				),
				details: serde_json::json!({ "item_count": item_count }),
			});
		}

		if !queries::delete_container(&mut *tx, id).await? {
			return Err(container_missing(id));
		}

		tx.commit().await?;

		tracing::info!(container_id = %id, "Container deleted.");

		Ok(())
	}

	/// Resolves a container from a separator-joined path.
	///
	/// Without `location` the first segment names the location, as in `Garage/Tool Chest/Drawer
	/// 9`. With it, the path starts at the location's root containers.
	pub async fn container_by_path(
		&self,
		path: &str,
		location: Option<LocationRef>,
	) -> Result<ContainerDetail> {
		let separator = self.cfg.hierarchy.path_separator.as_str();
		let mut segments: Vec<&str> =
			path.split(separator).map(str::trim).filter(|part| !part.is_empty()).collect();

		if segments.is_empty() {
			return Err(Error::invalid("Container path must be non-empty."));
		}

		let location = match location {
			Some(LocationRef::Id(id)) => queries::get_location(&self.db.pool, id).await?,
			Some(LocationRef::Name(name)) =>
				queries::get_location_by_name(&self.db.pool, name.trim()).await?,
			None => queries::get_location_by_name(&self.db.pool, segments.remove(0)).await?,
		};
		let Some(location) = location else {
			return Err(Error::NotFound {
				message: "Location not found.".to_string(),
				details: Some(serde_json::json!({ "path": path })),
			});
		};

		if segments.is_empty() {
			return Err(Error::invalid("Container path names no container."));
		}

		let index = self.hierarchy_snapshot().await?.index;
		let mut current: Option<Uuid> = None;

		for segment in segments {
			let Some(next) = index.child_named(location.id, current, segment) else {
				return Err(Error::NotFound {
					message: format!("Container {segment:?} not found in path."),
					details: Some(serde_json::json!({ "path": path, "missing_segment": segment })),
				});
			};

			current = Some(next.id);
		}

		match current {
			Some(id) => self.get_container(id).await,
			None => Err(Error::invalid("Container path names no container.")),
		}
	}

	pub(crate) async fn container(&self, id: Uuid) -> Result<Container> {
		queries::get_container(&self.db.pool, id).await?.ok_or_else(|| container_missing(id))
	}
}

pub(crate) fn container_missing(id: Uuid) -> Error {
	Error::not_found(format!("Container {id} does not exist."))
}

async fn ensure_unique_sibling(
	conn: &mut SqliteConnection,
	location_id: Uuid,
	parent_id: Option<Uuid>,
	name: &str,
	exclude_id: Option<Uuid>,
) -> Result<()> {
	if queries::find_sibling(conn, location_id, parent_id, name, exclude_id).await?.is_some() {
		return Err(Error::AlreadyExists {
			message: format!("A container named {name:?} already exists at this level."),
		});
	}

	Ok(())
}
