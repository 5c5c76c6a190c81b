use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use stash_storage::{models::Location, queries};

use crate::{Error, Result, StashService, optional_text, required_name};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CreateLocation {
	pub name: String,
	pub description: Option<String>,
}

/// Fields left as `None` keep their value. A blank description clears it.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UpdateLocation {
	pub name: Option<String>,
	pub description: Option<String>,
}

impl StashService {
	pub async fn create_location(&self, req: CreateLocation) -> Result<Location> {
		let now = OffsetDateTime::now_utc();
		let location = Location {
			id: Uuid::new_v4(),
			name: required_name(&req.name, "name")?,
			description: optional_text(req.description),
			created_at: now,
			updated_at: now,
		};

		queries::insert_location(&self.db.pool, &location).await?;

		tracing::info!(location_id = %location.id, name = %location.name, "Location created.");

		Ok(location)
	}

	pub async fn get_location(&self, id: Uuid) -> Result<Location> {
		queries::get_location(&self.db.pool, id).await?.ok_or_else(|| location_missing(id))
	}

	pub async fn list_locations(&self) -> Result<Vec<Location>> {
		Ok(queries::list_locations(&self.db.pool).await?)
	}

	pub async fn update_location(&self, id: Uuid, req: UpdateLocation) -> Result<Location> {
		if req.name.is_none() && req.description.is_none() {
			return Err(Error::invalid("No updates provided."));
		}

		let mut location = self.get_location(id).await?;

		if let Some(name) = req.name.as_deref() {
			location.name = required_name(name, "name")?;
		}
		if req.description.is_some() {
			location.description = optional_text(req.description);
		}

		location.updated_at = OffsetDateTime::now_utc();

		queries::update_location(&self.db.pool, &location).await?;

		Ok(location)
	}

	pub async fn delete_location(&self, id: Uuid) -> Result<()> {
		let location = self.get_location(id).await?;
		let container_count = queries::count_location_containers(&self.db.pool, id).await?;

		if container_count > 0 {
			return Err(Error::HasDependencies {
				message: format!(
					"Location {:?} still owns {container_count} containers.",
					location.name
				),
				details: serde_json::json!({ "container_count": container_count }),
			});
		}

		if !queries::delete_location(&self.db.pool, id).await? {
			return Err(location_missing(id));
		}

		tracing::info!(location_id = %id, "Location deleted.");

		Ok(())
	}
}

pub(crate) fn location_missing(id: Uuid) -> Error {
	Error::not_found(format!("Location {id} does not exist."))
}
