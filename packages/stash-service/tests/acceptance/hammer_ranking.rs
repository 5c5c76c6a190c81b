use stash_service::{MatchSource, UpdateItem};
use stash_storage::models::ItemFilter;

#[tokio::test]
async fn exact_name_outranks_a_description_mention_until_the_mention_is_gone() {
	let harness = super::harness().await;
	let service = &harness.service;
	let garage = super::seed_garage(service).await;
	let hammer = super::add_item(service, &garage.drawer, "Hammer", None, None).await;
	let striker = super::add_item(
		service,
		&garage.shelf,
		"Striking Tool",
		Some("Claw hammer, steel head"),
		None,
	)
	.await;

	super::add_item(service, &garage.shelf, "Adjustable wrench", None, None).await;

	let results =
		service.search("hammer", &ItemFilter::default()).await.expect("Search must succeed.");
	let ids: Vec<_> = results.iter().map(|result| result.item.id).collect();

	assert_eq!(ids, vec![hammer.id, striker.id]);
	assert!(results[0].score > results[1].score);
	assert_eq!(results[0].path, "Garage/Tool Chest/Drawer 9");
	assert_eq!(results[0].location.name, "Garage");
	assert_eq!(results[0].matched_via, Some(MatchSource::Text));
	assert!(results[0].semantic_score.is_some_and(|score| score > 0.99));
	assert_eq!(results[1].path, "Garage/Shelf");

	service
		.update_item(
			striker.id,
			UpdateItem {
				description: Some("Pry bar, steel head".to_string()),
				..Default::default()
			},
		)
		.await
		.expect("Failed to update item.");

	let results =
		service.search("hammer", &ItemFilter::default()).await.expect("Search must succeed.");
	let ids: Vec<_> = results.iter().map(|result| result.item.id).collect();

	assert_eq!(ids, vec![hammer.id]);

	harness.finish().await;
}

#[tokio::test]
async fn filters_narrow_both_candidate_sources() {
	let harness = super::harness().await;
	let service = &harness.service;
	let garage = super::seed_garage(service).await;

	super::add_item(service, &garage.drawer, "Hammer", None, None).await;

	let striker = super::add_item(
		service,
		&garage.shelf,
		"Striking Tool",
		Some("Claw hammer, steel head"),
		None,
	)
	.await;
	let filter = ItemFilter { container_id: Some(garage.shelf.id), ..Default::default() };
	let results = service.search("hammer", &filter).await.expect("Search must succeed.");

	assert_eq!(results.iter().map(|result| result.item.id).collect::<Vec<_>>(), vec![striker.id]);

	harness.finish().await;
}

#[tokio::test]
async fn vector_only_matches_need_the_stricter_threshold() {
	let harness = super::harness().await;
	let service = &harness.service;
	let garage = super::seed_garage(service).await;
	// Notes are embedded but not indexed for full-text search.
	let drill = super::add_item(service, &garage.shelf, "Drill", None, Some("cordless")).await;

	super::add_item(
		service,
		&garage.shelf,
		"Parts bin",
		None,
		Some("spare screws washers cordless nuts bolts"),
	)
	.await;

	let results =
		service.search("cordless", &ItemFilter::default()).await.expect("Search must succeed.");

	assert_eq!(results.len(), 1);
	assert_eq!(results[0].item.id, drill.id);
	assert_eq!(results[0].matched_via, None);
	assert_eq!(results[0].lexical_score, None);

	harness.finish().await;
}

#[tokio::test]
async fn alias_text_finds_the_item() {
	let harness = super::harness().await;
	let service = &harness.service;
	let garage = super::seed_garage(service).await;
	let wrench = super::add_item(service, &garage.drawer, "Adjustable wrench", None, None).await;

	service.add_alias(wrench.id, "Crescent").await.expect("Failed to add alias.");

	let results =
		service.search("cresc", &ItemFilter::default()).await.expect("Search must succeed.");

	assert_eq!(results.len(), 1);
	assert_eq!(results[0].item.id, wrench.id);
	assert_eq!(results[0].matched_via, Some(MatchSource::Alias));
	assert_eq!(results[0].path, "Garage/Tool Chest/Drawer 9");

	harness.finish().await;
}

#[tokio::test]
async fn blank_queries_return_nothing_without_touching_storage() {
	let harness = super::harness().await;

	harness.service.db.pool.close().await;

	let results = harness
		.service
		.search(" \t\n ", &ItemFilter::default())
		.await
		.expect("Blank query must not fail.");

	assert!(results.is_empty());
	assert!(harness.service.search("hammer", &ItemFilter::default()).await.is_err());

	harness.finish().await;
}
