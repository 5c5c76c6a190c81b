mod acceptance {
	mod backfill;
	mod degraded_semantic;
	mod hammer_ranking;
	mod hierarchy_paths;
	mod model_swap;

	use std::sync::Arc;

	use stash_providers::EmbeddingLoader;
	use stash_service::{CreateContainer, CreateItem, CreateLocation, StashService};
	use stash_storage::{
		db::Db,
		models::{Container, Item, Location},
	};
	use stash_testkit::{HashedLoader, TestDatabase};

	pub struct Harness {
		pub test_db: TestDatabase,
		pub service: StashService,
	}
	impl Harness {
		pub async fn finish(self) {
			self.service.db.pool.close().await;
			self.test_db.cleanup().expect("Failed to cleanup test database.");
		}
	}

	/// Garage / Tool Chest / Drawer 9, with a Shelf next to the chest.
	pub struct Garage {
		pub location: Location,
		pub chest: Container,
		pub drawer: Container,
		pub shelf: Container,
	}

	pub async fn harness() -> Harness {
		harness_with(Arc::new(HashedLoader::new())).await
	}

	pub async fn harness_with(loader: Arc<dyn EmbeddingLoader>) -> Harness {
		let test_db = TestDatabase::new().expect("Failed to create test database.");
		let cfg = test_db.config();
		let service = build_service(&test_db, cfg, loader).await;

		Harness { test_db, service }
	}

	pub async fn build_service(
		test_db: &TestDatabase,
		cfg: stash_config::Config,
		loader: Arc<dyn EmbeddingLoader>,
	) -> StashService {
		let db = Db::connect(&test_db.sqlite()).await.expect("Failed to open SQLite.");

		db.ensure_schema().await.expect("Failed to ensure schema.");

		StashService::with_loader(cfg, db, loader).await.expect("Failed to build service.")
	}

	pub async fn seed_garage(service: &StashService) -> Garage {
		let location = service
			.create_location(CreateLocation { name: "Garage".to_string(), description: None })
			.await
			.expect("Failed to create location.");
		let chest = service
			.create_container(CreateContainer {
				location_id: location.id,
				parent_id: None,
				name: "Tool Chest".to_string(),
				description: Some("Red rolling chest".to_string()),
			})
			.await
			.expect("Failed to create container.");
		let drawer = service
			.create_container(CreateContainer {
				location_id: location.id,
				parent_id: Some(chest.id),
				name: "Drawer 9".to_string(),
				description: None,
			})
			.await
			.expect("Failed to create container.");
		let shelf = service
			.create_container(CreateContainer {
				location_id: location.id,
				parent_id: None,
				name: "Shelf".to_string(),
				description: None,
			})
			.await
			.expect("Failed to create container.");

		Garage { location, chest, drawer, shelf }
	}

	pub async fn add_item(
		service: &StashService,
		container: &Container,
		name: &str,
		description: Option<&str>,
		notes: Option<&str>,
	) -> Item {
		service
			.add_item(CreateItem {
				container_id: container.id,
				name: name.to_string(),
				description: description.map(str::to_string),
				notes: notes.map(str::to_string),
				..Default::default()
			})
			.await
			.expect("Failed to add item.")
	}
}
