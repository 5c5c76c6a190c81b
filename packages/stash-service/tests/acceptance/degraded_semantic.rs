use std::sync::Arc;

use stash_service::ErrorKind;
use stash_storage::{models::ItemFilter, queries};
use stash_testkit::{FailingLoader, HashedLoader, SMALL_MODEL};

#[tokio::test]
async fn unloadable_model_degrades_to_lexical_search() {
	let harness = super::harness_with(Arc::new(FailingLoader)).await;
	let service = &harness.service;
	let garage = super::seed_garage(service).await;
	let hammer = super::add_item(service, &garage.drawer, "Hammer", None, None).await;

	assert!(!service.semantic_available().await);
	assert_eq!(
		queries::get_item_embedding(&service.db.pool, hammer.id).await.expect("Failed to read."),
		None
	);

	let results =
		service.search("hammer", &ItemFilter::default()).await.expect("Search must not fail.");

	assert_eq!(results.len(), 1);
	assert_eq!(results[0].item.id, hammer.id);
	assert_eq!(results[0].semantic_score, None);
	assert!(results[0].lexical_score.is_some());

	let err = service.backfill_embeddings(false).await.expect_err("Backfill needs a model.");

	assert_eq!(err.kind(), ErrorKind::Internal);

	harness.finish().await;
}

#[tokio::test]
async fn model_loads_once_and_a_failed_load_is_remembered() {
	let healthy = Arc::new(HashedLoader::new());
	let harness = super::harness_with(healthy.clone()).await;
	let service = &harness.service;
	let garage = super::seed_garage(service).await;

	super::add_item(service, &garage.drawer, "Hammer", None, None).await;
	service.search("hammer", &ItemFilter::default()).await.expect("Search must succeed.");
	service.search("wrench", &ItemFilter::default()).await.expect("Search must succeed.");

	assert_eq!(healthy.load_count(), 1);

	harness.finish().await;

	let broken = Arc::new(HashedLoader::new().unavailable(SMALL_MODEL));
	let harness = super::harness_with(broken.clone()).await;
	let service = &harness.service;

	assert!(!service.semantic_available().await);
	assert!(!service.semantic_available().await);
	service.search("hammer", &ItemFilter::default()).await.expect("Search must not fail.");

	assert_eq!(broken.load_count(), 1);

	harness.finish().await;
}
