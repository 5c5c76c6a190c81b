use std::collections::HashMap;

use serde::Deserialize;
use uuid::Uuid;

use stash_domain::hierarchy::{ContainerIndex, ContainerRecord, TreeNode};
use stash_storage::{
	models::{Container, ContainerFilter, Location},
	queries,
};

use crate::{Error, Result, StashService};

#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct TreeRequest {
	pub root_id: Option<Uuid>,
	pub location_id: Option<Uuid>,
	/// Defaults to `hierarchy.max_tree_depth`.
	pub max_depth: Option<u32>,
}

pub(crate) struct HierarchySnapshot {
	pub index: ContainerIndex,
	pub containers: HashMap<Uuid, Container>,
	pub locations: HashMap<Uuid, Location>,
}

impl StashService {
	pub(crate) async fn hierarchy_snapshot(&self) -> Result<HierarchySnapshot> {
		let containers =
			queries::list_containers(&self.db.pool, &ContainerFilter::default()).await?;
		let locations = queries::list_locations(&self.db.pool).await?;
		let records = containers.iter().map(record).collect();
		let index = ContainerIndex::new(records)
			.with_location_names(
				locations.iter().map(|location| (location.id, location.name.clone())),
			)
			.with_separator(self.cfg.hierarchy.path_separator.as_str());

		Ok(HierarchySnapshot {
			index,
			containers: containers.into_iter().map(|container| (container.id, container)).collect(),
			locations: locations.into_iter().map(|location| (location.id, location)).collect(),
		})
	}

	pub async fn container_index(&self) -> Result<ContainerIndex> {
		let snapshot = self.hierarchy_snapshot().await?;
		let counts = queries::container_item_counts(&self.db.pool).await?;

		Ok(snapshot.index.with_item_counts(counts))
	}

	/// Full path of a container, such as `Garage/Tool Chest/Drawer 9`.
	pub async fn resolve_path(&self, container_id: Uuid, include_location: bool) -> Result<String> {
		let index = self.hierarchy_snapshot().await?.index;

		if index.get(container_id).is_none() {
			return Err(Error::not_found(format!("Container {container_id} does not exist.")));
		}

		Ok(index.build_path(container_id, include_location))
	}

	/// Root first.
	pub async fn container_ancestors(&self, container_id: Uuid) -> Result<Vec<Container>> {
		let snapshot = self.hierarchy_snapshot().await?;

		if snapshot.index.get(container_id).is_none() {
			return Err(Error::not_found(format!("Container {container_id} does not exist.")));
		}

		let ancestors = snapshot
			.index
			.ancestors(container_id)
			.into_iter()
			.filter_map(|ancestor| snapshot.containers.get(&ancestor.id).cloned())
			.collect();

		Ok(ancestors)
	}

	pub async fn is_descendant(&self, ancestor_id: Uuid, node_id: Uuid) -> Result<bool> {
		let index = self.hierarchy_snapshot().await?.index;

		Ok(index.is_descendant(ancestor_id, node_id))
	}

	pub async fn build_tree(&self, req: &TreeRequest) -> Result<Vec<TreeNode>> {
		let max_depth = req.max_depth.unwrap_or(self.cfg.hierarchy.max_tree_depth);

		if max_depth == 0 {
			return Err(Error::invalid("max_depth must be greater than zero."));
		}
		if let Some(location_id) = req.location_id
			&& queries::get_location(&self.db.pool, location_id).await?.is_none()
		{
			return Err(Error::not_found(format!("Location {location_id} does not exist.")));
		}

		let index = self.container_index().await?;

		if let Some(root_id) = req.root_id
			&& index.get(root_id).is_none()
		{
			return Err(Error::not_found(format!("Container {root_id} does not exist.")));
		}

		Ok(index.build_tree(req.root_id, req.location_id, max_depth))
	}
}

pub(crate) fn record(container: &Container) -> ContainerRecord {
	ContainerRecord {
		id: container.id,
		location_id: container.location_id,
		parent_id: container.parent_id,
		name: container.name.clone(),
		description: container.description.clone(),
	}
}
