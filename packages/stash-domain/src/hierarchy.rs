//! Container hierarchy resolution over flat records.
//!
//! Containers are stored as flat rows with a nullable parent id. The index below is an arena of
//! those rows plus id lookups; every traversal walks ids with a visited set, so corrupt data that
//! already contains a cycle terminates instead of looping.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use uuid::Uuid;

pub const DEFAULT_SEPARATOR: &str = "/";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerRecord {
	pub id: Uuid,
	pub location_id: Uuid,
	pub parent_id: Option<Uuid>,
	pub name: String,
	pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TreeNode {
	pub id: Uuid,
	pub name: String,
	pub description: Option<String>,
	pub parent_id: Option<Uuid>,
	pub item_count: i64,
	pub child_count: usize,
	pub children: Vec<TreeNode>,
}

#[derive(Debug, Default)]
pub struct ContainerIndex {
	containers: Vec<ContainerRecord>,
	by_id: HashMap<Uuid, usize>,
	children: HashMap<Uuid, Vec<usize>>,
	roots: Vec<usize>,
	location_names: HashMap<Uuid, String>,
	item_counts: HashMap<Uuid, i64>,
	separator: String,
}
impl ContainerIndex {
	pub fn new(containers: Vec<ContainerRecord>) -> Self {
		let mut by_id = HashMap::with_capacity(containers.len());
		let mut children: HashMap<Uuid, Vec<usize>> = HashMap::new();
		let mut roots = Vec::new();

		for (idx, container) in containers.iter().enumerate() {
			by_id.insert(container.id, idx);

			match container.parent_id {
				Some(parent_id) => children.entry(parent_id).or_default().push(idx),
				None => roots.push(idx),
			}
		}

		let by_name = |a: &usize, b: &usize| {
			let (a, b) = (&containers[*a], &containers[*b]);

			a.name.cmp(&b.name).then(a.id.cmp(&b.id))
		};

		for siblings in children.values_mut() {
			siblings.sort_by(by_name);
		}

		roots.sort_by(by_name);

		Self {
			containers,
			by_id,
			children,
			roots,
			location_names: HashMap::new(),
			item_counts: HashMap::new(),
			separator: DEFAULT_SEPARATOR.to_string(),
		}
	}

	pub fn with_location_names<I>(mut self, names: I) -> Self
	where
		I: IntoIterator<Item = (Uuid, String)>,
	{
		self.location_names = names.into_iter().collect();

		self
	}

	pub fn with_item_counts(mut self, counts: HashMap<Uuid, i64>) -> Self {
		self.item_counts = counts;

		self
	}

	pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
		self.separator = separator.into();

		self
	}

	pub fn len(&self) -> usize {
		self.containers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.containers.is_empty()
	}

	pub fn get(&self, id: Uuid) -> Option<&ContainerRecord> {
		self.by_id.get(&id).map(|idx| &self.containers[*idx])
	}

	/// Direct children of a container, ordered by name.
	pub fn children(&self, id: Uuid) -> impl Iterator<Item = &ContainerRecord> {
		self.children.get(&id).into_iter().flatten().map(|idx| &self.containers[*idx])
	}

	/// Root-level containers, optionally restricted to one location, ordered by name.
	pub fn roots(&self, location_id: Option<Uuid>) -> impl Iterator<Item = &ContainerRecord> {
		self.roots
			.iter()
			.map(|idx| &self.containers[*idx])
			.filter(move |container| location_id.is_none_or(|id| container.location_id == id))
	}

	/// Finds the container named `name` directly under `parent_id` (or at root level of the
	/// location when `parent_id` is `None`).
	pub fn child_named(
		&self,
		location_id: Uuid,
		parent_id: Option<Uuid>,
		name: &str,
	) -> Option<&ContainerRecord> {
		match parent_id {
			Some(parent_id) => self
				.children(parent_id)
				.find(|child| child.location_id == location_id && child.name == name),
			None => self.roots(Some(location_id)).find(|root| root.name == name),
		}
	}

	/// Ancestors of `id`, root first, excluding `id` itself.
	///
	/// Stops at a missing parent or at the first revisited id.
	pub fn ancestors(&self, id: Uuid) -> Vec<&ContainerRecord> {
		let mut chain = Vec::new();
		let Some(mut current) = self.get(id) else {
			return chain;
		};
		let mut visited = HashSet::from([id]);

		while let Some(parent_id) = current.parent_id {
			if !visited.insert(parent_id) {
				tracing::warn!(
					container_id = %id,
					revisited_id = %parent_id,
					"Container hierarchy cycle detected. Ancestor chain truncated."
				);

				break;
			}

			let Some(parent) = self.get(parent_id) else {
				break;
			};

			chain.push(parent);

			current = parent;
		}

		chain.reverse();

		chain
	}

	/// Ancestor names plus the container's own name, joined with the separator. Prefixed by the
	/// location name when requested. Empty when the container does not exist.
	pub fn build_path(&self, id: Uuid, include_location: bool) -> String {
		let Some(container) = self.get(id) else {
			return String::new();
		};
		let mut parts: Vec<&str> = Vec::new();

		if include_location
			&& let Some(location_name) = self.location_names.get(&container.location_id)
		{
			parts.push(location_name);
		}

		parts.extend(self.ancestors(id).into_iter().map(|ancestor| ancestor.name.as_str()));
		parts.push(&container.name);

		parts.join(&self.separator)
	}

	/// Whether `ancestor_id` appears on the parent chain of `node_id`. Never true for the same id.
	pub fn is_descendant(&self, ancestor_id: Uuid, node_id: Uuid) -> bool {
		if ancestor_id == node_id {
			return false;
		}

		self.ancestors(node_id).iter().any(|ancestor| ancestor.id == ancestor_id)
	}

	/// Builds the subtree under `root_id`, or under every root container of `location_id` (all
	/// locations when both are `None`).
	///
	/// Nodes at depth `max_depth - 1` are reported as leaves.
	pub fn build_tree(
		&self,
		root_id: Option<Uuid>,
		location_id: Option<Uuid>,
		max_depth: u32,
	) -> Vec<TreeNode> {
		if max_depth == 0 {
			return Vec::new();
		}

		let mut on_path = HashSet::new();

		match root_id {
			Some(root_id) => self
				.get(root_id)
				.map(|root| self.tree_node(root, 0, max_depth, &mut on_path))
				.into_iter()
				.collect(),
			None => self
				.roots(location_id)
				.map(|root| self.tree_node(root, 0, max_depth, &mut on_path))
				.collect(),
		}
	}

	fn tree_node(
		&self,
		container: &ContainerRecord,
		depth: u32,
		max_depth: u32,
		on_path: &mut HashSet<Uuid>,
	) -> TreeNode {
		on_path.insert(container.id);

		let mut children = Vec::new();

		if depth + 1 < max_depth {
			for child in self.children(container.id) {
				if on_path.contains(&child.id) {
					tracing::warn!(
						container_id = %container.id,
						revisited_id = %child.id,
						"Container hierarchy cycle detected. Subtree truncated."
					);

					continue;
				}

				children.push(self.tree_node(child, depth + 1, max_depth, on_path));
			}
		}

		on_path.remove(&container.id);

		TreeNode {
			id: container.id,
			name: container.name.clone(),
			description: container.description.clone(),
			parent_id: container.parent_id,
			item_count: self.item_counts.get(&container.id).copied().unwrap_or(0),
			child_count: children.len(),
			children,
		}
	}
}
