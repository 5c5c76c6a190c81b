use time::OffsetDateTime;
use uuid::Uuid;

use stash_storage::{models::ItemAlias, queries};

use crate::{Error, Result, StashService, required_name};

impl StashService {
	pub async fn add_alias(&self, item_id: Uuid, alias: &str) -> Result<ItemAlias> {
		let alias = required_name(alias, "alias")?;

		self.item(item_id).await?;

		let alias = ItemAlias {
			id: Uuid::new_v4(),
			item_id,
			alias,
			created_at: OffsetDateTime::now_utc(),
		};

		queries::insert_alias(&self.db.pool, &alias).await?;

		tracing::debug!(item_id = %item_id, alias_id = %alias.id, "Alias added.");

		Ok(alias)
	}

	pub async fn list_aliases(&self, item_id: Uuid) -> Result<Vec<ItemAlias>> {
		self.item(item_id).await?;

		Ok(queries::list_aliases(&self.db.pool, item_id).await?)
	}

	pub async fn remove_alias(&self, alias_id: Uuid) -> Result<()> {
		if !queries::delete_alias(&self.db.pool, alias_id).await? {
			return Err(Error::not_found(format!("Alias {alias_id} does not exist.")));
		}

		Ok(())
	}
}
