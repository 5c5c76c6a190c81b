use std::{sync::Arc, time::Duration};

use stash_domain::{text::item_text, vector};
use stash_service::{ACTIVE_MODEL_SETTING, ErrorKind, JobState, ModelChange, UpdateItem};
use stash_storage::{models::ItemFilter, queries};
use stash_testkit::{HashedEmbedding, HashedLoader, LARGE_MODEL, SMALL_MODEL};

#[tokio::test]
async fn swapping_models_re_embeds_every_item() {
	let harness = super::harness().await;
	let service = &harness.service;
	let garage = super::seed_garage(service).await;
	let hammer = super::add_item(service, &garage.drawer, "Hammer", None, None).await;

	super::add_item(service, &garage.shelf, "Adjustable wrench", None, None).await;
	super::add_item(service, &garage.shelf, "Tape measure", None, None).await;

	let ModelChange::Started(handle) =
		service.change_embedding_model(LARGE_MODEL).await.expect("Model change must start.")
	else {
		panic!("Expected a re-embedding job.");
	};

	assert_eq!(handle.model_id, LARGE_MODEL);

	let status = handle.wait().await;

	assert_eq!(status.status, JobState::Completed);
	assert_eq!((status.processed, status.total, status.failed), (3, 3, 0));
	assert_eq!(service.reembed_status(), status);
	assert_eq!(service.semantic.active_model_id(), LARGE_MODEL);
	assert_eq!(
		queries::get_setting(&service.db.pool, ACTIVE_MODEL_SETTING).await.expect("Failed to read."),
		Some(LARGE_MODEL.to_string())
	);

	let embedding = queries::get_item_embedding(&service.db.pool, hammer.id)
		.await
		.expect("Failed to read embedding.")
		.expect("Item must carry an embedding.");

	assert_eq!(embedding.len(), 512 * 4);

	let results =
		service.search("hammer", &ItemFilter::default()).await.expect("Search must succeed.");

	assert_eq!(results[0].item.id, hammer.id);
	assert!(results[0].semantic_score.is_some());

	let models = service.embedding_models();

	assert!(models.iter().any(|model| model.id == LARGE_MODEL && model.active));
	assert!(models.iter().any(|model| model.id == SMALL_MODEL && !model.active));

	// A restarted service picks the persisted model over the configured default.
	let restarted = super::build_service(
		&harness.test_db,
		harness.test_db.config(),
		Arc::new(HashedLoader::new()),
	)
	.await;

	assert_eq!(restarted.semantic.active_model_id(), LARGE_MODEL);

	restarted.db.pool.close().await;
	harness.finish().await;
}

#[tokio::test]
async fn only_one_swap_runs_at_a_time() {
	let loader = HashedLoader::new().with_delay(Duration::from_millis(50));
	let harness = super::harness_with(Arc::new(loader)).await;
	let service = &harness.service;
	let garage = super::seed_garage(service).await;

	for name in ["Hammer", "Chisel", "Mallet", "File"] {
		super::add_item(service, &garage.drawer, name, None, None).await;
	}

	let ModelChange::Started(handle) =
		service.change_embedding_model(LARGE_MODEL).await.expect("Model change must start.")
	else {
		panic!("Expected a re-embedding job.");
	};

	assert!(service.reembed_status().is_running());

	let err = service
		.change_embedding_model(SMALL_MODEL)
		.await
		.expect_err("A second swap must be rejected.");

	assert_eq!(err.kind(), ErrorKind::JobRunning);

	let status = handle.wait().await;

	assert_eq!(status.status, JobState::Completed);

	// The flag is released once the job ends.
	let ModelChange::Started(handle) =
		service.change_embedding_model(SMALL_MODEL).await.expect("Swap back must start.")
	else {
		panic!("Expected a re-embedding job.");
	};

	assert_eq!(handle.wait().await.status, JobState::Completed);

	harness.finish().await;
}

#[tokio::test]
async fn invalid_or_redundant_swaps_do_not_start_jobs() {
	let harness = super::harness().await;
	let service = &harness.service;
	let err = service
		.change_embedding_model("not-in-catalog")
		.await
		.expect_err("Unknown model must be rejected.");

	assert_eq!(err.kind(), ErrorKind::InvalidInput);

	let change =
		service.change_embedding_model(SMALL_MODEL).await.expect("Same model must not fail.");

	assert!(matches!(change, ModelChange::Unchanged { model_id } if model_id == SMALL_MODEL));
	assert_eq!(service.reembed_status().status, JobState::Idle);

	harness.finish().await;
}

#[tokio::test]
async fn failed_model_load_keeps_the_active_model() {
	let loader = HashedLoader::new().unavailable(LARGE_MODEL);
	let harness = super::harness_with(Arc::new(loader)).await;
	let service = &harness.service;
	let garage = super::seed_garage(service).await;
	let hammer = super::add_item(service, &garage.drawer, "Hammer", None, None).await;
	let ModelChange::Started(handle) =
		service.change_embedding_model(LARGE_MODEL).await.expect("Model change must start.")
	else {
		panic!("Expected a re-embedding job.");
	};
	let status = handle.wait().await;

	assert_eq!(status.status, JobState::Failed);
	assert_eq!(service.semantic.active_model_id(), SMALL_MODEL);
	assert_eq!(
		queries::get_setting(&service.db.pool, ACTIVE_MODEL_SETTING).await.expect("Failed to read."),
		None
	);

	let embedding = queries::get_item_embedding(&service.db.pool, hammer.id)
		.await
		.expect("Failed to read embedding.")
		.expect("Item must keep its embedding.");

	assert_eq!(embedding.len(), 256 * 4);

	harness.finish().await;
}

#[tokio::test]
async fn edits_during_a_swap_keep_their_new_text() {
	let loader = HashedLoader::new().with_delay(Duration::from_millis(40));
	let harness = super::harness_with(Arc::new(loader)).await;
	let service = &harness.service;
	let garage = super::seed_garage(service).await;
	let mut items = Vec::new();

	for name in ["Hammer", "Chisel", "Mallet", "File", "Awl", "Level"] {
		items.push(super::add_item(service, &garage.drawer, name, None, None).await);
	}

	// The job walks items in id order, so the highest id is embedded last.
	let last = items.iter().map(|item| item.id).max().expect("Items were added.");
	let ModelChange::Started(handle) =
		service.change_embedding_model(LARGE_MODEL).await.expect("Model change must start.")
	else {
		panic!("Expected a re-embedding job.");
	};

	while service.reembed_status().total == 0 {
		tokio::time::sleep(Duration::from_millis(5)).await;
	}

	let rename = UpdateItem { name: Some("Screwdriver".to_string()), ..Default::default() };

	service.update_item(last, rename).await.expect("Failed to rename item.");

	let status = handle.wait().await;

	assert_eq!(status.status, JobState::Completed);
	assert_eq!((status.processed, status.failed), (6, 0));

	let stored = queries::get_item_embedding(&service.db.pool, last)
		.await
		.expect("Failed to read embedding.")
		.expect("Item must carry an embedding.");
	let expected =
		HashedEmbedding::new(LARGE_MODEL, 512).vector(&item_text("Screwdriver", None, None));

	assert_eq!(stored, vector::to_bytes(&expected));

	harness.finish().await;
}
