use stash_service::{
	CreateContainer, ErrorKind, LocationRef, ParentUpdate, TreeRequest, UpdateContainer,
};

#[tokio::test]
async fn nested_container_resolves_to_full_path() {
	let harness = super::harness().await;
	let service = &harness.service;
	let garage = super::seed_garage(service).await;

	assert_eq!(
		service.resolve_path(garage.drawer.id, true).await.expect("Failed to resolve path."),
		"Garage/Tool Chest/Drawer 9"
	);
	assert_eq!(
		service.resolve_path(garage.drawer.id, false).await.expect("Failed to resolve path."),
		"Tool Chest/Drawer 9"
	);

	let ancestors =
		service.container_ancestors(garage.drawer.id).await.expect("Failed to load ancestors.");

	assert_eq!(ancestors.iter().map(|c| c.id).collect::<Vec<_>>(), vec![garage.chest.id]);
	assert!(service.is_descendant(garage.chest.id, garage.drawer.id).await.expect("Lookup failed."));
	assert!(!service.is_descendant(garage.drawer.id, garage.chest.id).await.expect("Lookup failed."));
	assert!(!service.is_descendant(garage.chest.id, garage.chest.id).await.expect("Lookup failed."));

	let detail = service
		.container_by_path("Garage/Tool Chest/Drawer 9", None)
		.await
		.expect("Failed to resolve by path.");

	assert_eq!(detail.container.id, garage.drawer.id);
	assert_eq!(detail.path, "Garage/Tool Chest/Drawer 9");
	assert_eq!(
		detail.ancestors.iter().map(|part| part.name.as_str()).collect::<Vec<_>>(),
		vec!["Garage", "Tool Chest"]
	);

	let relative = service
		.container_by_path("Tool Chest / Drawer 9", Some(LocationRef::Name("Garage".to_string())))
		.await
		.expect("Failed to resolve relative path.");

	assert_eq!(relative.container.id, garage.drawer.id);

	harness.finish().await;
}

#[tokio::test]
async fn moves_that_would_form_a_cycle_are_rejected_without_mutation() {
	let harness = super::harness().await;
	let service = &harness.service;
	let garage = super::seed_garage(service).await;
	let err = service
		.update_container(
			garage.chest.id,
			UpdateContainer { parent: ParentUpdate::Set(garage.drawer.id), ..Default::default() },
		)
		.await
		.expect_err("Moving a container under its child must fail.");

	assert_eq!(err.kind(), ErrorKind::CircularReference);

	let err = service
		.update_container(
			garage.chest.id,
			UpdateContainer { parent: ParentUpdate::Set(garage.chest.id), ..Default::default() },
		)
		.await
		.expect_err("A container cannot be its own parent.");

	assert_eq!(err.kind(), ErrorKind::CircularReference);

	let chest = service.get_container(garage.chest.id).await.expect("Failed to load container.");

	assert_eq!(chest.container.parent_id, None);
	assert_eq!(
		service.resolve_path(garage.drawer.id, true).await.expect("Failed to resolve path."),
		"Garage/Tool Chest/Drawer 9"
	);

	// A legal move still works and shows up in the path.
	service
		.update_container(
			garage.drawer.id,
			UpdateContainer { parent: ParentUpdate::Set(garage.shelf.id), ..Default::default() },
		)
		.await
		.expect("Failed to move container.");

	assert_eq!(
		service.resolve_path(garage.drawer.id, true).await.expect("Failed to resolve path."),
		"Garage/Shelf/Drawer 9"
	);

	harness.finish().await;
}

#[tokio::test]
async fn tree_reports_counts_and_honours_depth() {
	let harness = super::harness().await;
	let service = &harness.service;
	let garage = super::seed_garage(service).await;

	super::add_item(service, &garage.drawer, "Hammer", None, None).await;

	let tree = service
		.build_tree(&TreeRequest { location_id: Some(garage.location.id), ..Default::default() })
		.await
		.expect("Failed to build tree.");

	assert_eq!(tree.iter().map(|node| node.name.as_str()).collect::<Vec<_>>(), vec![
		"Shelf",
		"Tool Chest"
	]);

	let chest = &tree[1];

	assert_eq!(chest.child_count, 1);
	assert_eq!(chest.children[0].name, "Drawer 9");
	assert_eq!(chest.children[0].item_count, 1);

	let shallow = service
		.build_tree(&TreeRequest {
			root_id: Some(garage.chest.id),
			max_depth: Some(1),
			..Default::default()
		})
		.await
		.expect("Failed to build tree.");

	assert_eq!(shallow.len(), 1);
	assert!(shallow[0].children.is_empty());

	let err = service
		.build_tree(&TreeRequest { max_depth: Some(0), ..Default::default() })
		.await
		.expect_err("Zero depth must fail.");

	assert_eq!(err.kind(), ErrorKind::InvalidInput);

	let err = service
		.build_tree(&TreeRequest { root_id: Some(uuid::Uuid::new_v4()), ..Default::default() })
		.await
		.expect_err("Unknown root must fail.");

	assert_eq!(err.kind(), ErrorKind::NotFound);

	harness.finish().await;
}

#[tokio::test]
async fn path_resolution_reports_the_missing_segment() {
	let harness = super::harness().await;
	let service = &harness.service;

	super::seed_garage(service).await;

	let err = service.container_by_path(" / ", None).await.expect_err("Empty path must fail.");

	assert_eq!(err.kind(), ErrorKind::InvalidInput);

	let err = service
		.container_by_path("Garage/Tool Chest/Drawer 10", None)
		.await
		.expect_err("Unknown segment must fail.");
	let report = err.report();

	assert_eq!(report.kind, ErrorKind::NotFound);
	assert_eq!(
		report.details,
		Some(serde_json::json!({
			"path": "Garage/Tool Chest/Drawer 10",
			"missing_segment": "Drawer 10",
		}))
	);

	let err = service.container_by_path("Attic/Box", None).await.expect_err("Unknown location.");

	assert_eq!(err.kind(), ErrorKind::NotFound);

	let err = service.container_by_path("Garage", None).await.expect_err("No container named.");

	assert_eq!(err.kind(), ErrorKind::InvalidInput);

	let err = service
		.resolve_path(uuid::Uuid::new_v4(), true)
		.await
		.expect_err("Unknown container must fail.");

	assert_eq!(err.kind(), ErrorKind::NotFound);

	harness.finish().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_cross_moves_never_form_a_cycle() {
	let harness = super::harness().await;
	let service = &harness.service;
	let garage = super::seed_garage(service).await;

	for round in 0..8 {
		let crate_a = service
			.create_container(CreateContainer {
				location_id: garage.location.id,
				parent_id: None,
				name: format!("Crate A{round}"),
				description: None,
			})
			.await
			.expect("Failed to create container.");
		let crate_b = service
			.create_container(CreateContainer {
				location_id: garage.location.id,
				parent_id: None,
				name: format!("Crate B{round}"),
				description: None,
			})
			.await
			.expect("Failed to create container.");
		let (a_into_b, b_into_a) = tokio::join!(
			service.update_container(crate_a.id, UpdateContainer {
				parent: ParentUpdate::Set(crate_b.id),
				..Default::default()
			}),
			service.update_container(crate_b.id, UpdateContainer {
				parent: ParentUpdate::Set(crate_a.id),
				..Default::default()
			}),
		);
		let errors: Vec<_> =
			[a_into_b.err(), b_into_a.err()].into_iter().flatten().map(|err| err.kind()).collect();

		assert_eq!(errors, vec![ErrorKind::CircularReference], "round {round}");

		let a_under_b =
			service.is_descendant(crate_b.id, crate_a.id).await.expect("Lookup failed.");
		let b_under_a =
			service.is_descendant(crate_a.id, crate_b.id).await.expect("Lookup failed.");

		assert!(a_under_b != b_under_a, "round {round}");
	}

	harness.finish().await;
}
