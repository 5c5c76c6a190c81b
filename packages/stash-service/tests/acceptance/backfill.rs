use std::{sync::Arc, time::Duration};

use stash_domain::{text::item_text, vector};
use stash_service::{BackfillReport, UpdateItem};
use stash_storage::queries;
use stash_testkit::{HashedEmbedding, HashedLoader, SMALL_MODEL};

#[tokio::test]
async fn backfill_fills_gaps_and_counts_failures() {
	let harness = super::harness_with(Arc::new(HashedLoader::new().failing_on("broken"))).await;
	let service = &harness.service;
	let garage = super::seed_garage(service).await;
	let hammer = super::add_item(service, &garage.drawer, "Hammer", None, None).await;
	let widget = super::add_item(service, &garage.shelf, "broken widget", None, None).await;

	assert_eq!(
		queries::get_item_embedding(&service.db.pool, widget.id).await.expect("Failed to read."),
		None
	);

	let report = service.backfill_embeddings(false).await.expect("Backfill must run.");

	assert_eq!(report, BackfillReport { processed: 0, failed: 1, skipped_total: 1 });

	queries::update_item_embedding(&service.db.pool, hammer.id, None)
		.await
		.expect("Failed to clear embedding.");

	let report = service.backfill_embeddings(false).await.expect("Backfill must run.");

	assert_eq!(report, BackfillReport { processed: 1, failed: 1, skipped_total: 0 });
	assert!(
		queries::get_item_embedding(&service.db.pool, hammer.id)
			.await
			.expect("Failed to read.")
			.is_some()
	);

	let report = service.backfill_embeddings(true).await.expect("Backfill must run.");

	assert_eq!(report, BackfillReport { processed: 1, failed: 1, skipped_total: 0 });

	harness.finish().await;
}

#[tokio::test]
async fn backfill_embeds_the_text_current_at_write_time() {
	let loader = HashedLoader::new().with_delay(Duration::from_millis(40));
	let harness = super::harness_with(Arc::new(loader)).await;
	let service = &harness.service;
	let garage = super::seed_garage(service).await;
	let mut ids = Vec::new();

	for name in ["Hammer", "Chisel", "Mallet", "File", "Awl", "Level"] {
		let item = super::add_item(service, &garage.drawer, name, None, None).await;

		queries::update_item_embedding(&service.db.pool, item.id, None)
			.await
			.expect("Failed to clear embedding.");
		ids.push(item.id);
	}

	// Backfill walks items in id order, so the highest id is embedded last.
	let last = ids.into_iter().max().expect("Items were added.");
	let rename = async {
		tokio::time::sleep(Duration::from_millis(10)).await;

		service
			.update_item(last, UpdateItem {
				name: Some("Screwdriver".to_string()),
				..Default::default()
			})
			.await
			.expect("Failed to rename item.");
	};
	let (report, ()) = tokio::join!(service.backfill_embeddings(false), rename);
	let report = report.expect("Backfill must run.");

	assert_eq!(report, BackfillReport { processed: 6, failed: 0, skipped_total: 0 });

	let stored = queries::get_item_embedding(&service.db.pool, last)
		.await
		.expect("Failed to read embedding.")
		.expect("Item must carry an embedding.");
	let expected =
		HashedEmbedding::new(SMALL_MODEL, 256).vector(&item_text("Screwdriver", None, None));

	assert_eq!(stored, vector::to_bytes(&expected));

	harness.finish().await;
}
