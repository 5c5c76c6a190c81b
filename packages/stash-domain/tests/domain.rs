use std::collections::HashMap;

use uuid::Uuid;

use stash_domain::{
	hierarchy::{ContainerIndex, ContainerRecord},
	text, vector,
};

struct Fixture {
	location_id: Uuid,
	garage_chest: Uuid,
	drawer: Uuid,
	shelf: Uuid,
	index: ContainerIndex,
}

fn record(id: Uuid, location_id: Uuid, parent_id: Option<Uuid>, name: &str) -> ContainerRecord {
	ContainerRecord { id, location_id, parent_id, name: name.to_string(), description: None }
}

fn garage() -> Fixture {
	let location_id = Uuid::new_v4();
	let garage_chest = Uuid::new_v4();
	let drawer = Uuid::new_v4();
	let shelf = Uuid::new_v4();
	let containers = vec![
		record(drawer, location_id, Some(garage_chest), "Drawer 9"),
		record(shelf, location_id, None, "Shelf"),
		record(garage_chest, location_id, None, "Tool Chest"),
	];
	let index = ContainerIndex::new(containers)
		.with_location_names([(location_id, "Garage".to_string())])
		.with_item_counts(HashMap::from([(drawer, 3)]));

	Fixture { location_id, garage_chest, drawer, shelf, index }
}

#[test]
fn builds_full_path_with_and_without_location() {
	let fixture = garage();

	assert_eq!(fixture.index.build_path(fixture.drawer, true), "Garage/Tool Chest/Drawer 9");
	assert_eq!(fixture.index.build_path(fixture.drawer, false), "Tool Chest/Drawer 9");
	assert_eq!(fixture.index.build_path(fixture.garage_chest, true), "Garage/Tool Chest");
	assert_eq!(fixture.index.build_path(Uuid::new_v4(), true), "");
}

#[test]
fn custom_separator_is_used_for_paths() {
	let fixture = garage();
	let index = fixture.index.with_separator(" > ");

	assert_eq!(index.build_path(fixture.drawer, true), "Garage > Tool Chest > Drawer 9");
}

#[test]
fn ancestors_are_root_first_and_exclude_self() {
	let location_id = Uuid::new_v4();
	let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
	let containers = ids
		.iter()
		.enumerate()
		.map(|(depth, id)| {
			let parent = if depth == 0 { None } else { Some(ids[depth - 1]) };

			record(*id, location_id, parent, &format!("level-{depth}"))
		})
		.collect();
	let index = ContainerIndex::new(containers);
	let ancestors: Vec<Uuid> = index.ancestors(ids[3]).iter().map(|c| c.id).collect();

	assert_eq!(ancestors, ids[..3].to_vec());
	assert!(index.ancestors(ids[0]).is_empty());
	assert!(index.ancestors(Uuid::new_v4()).is_empty());
}

#[test]
fn descendant_checks_follow_the_parent_chain() {
	let fixture = garage();
	let index = &fixture.index;

	assert!(index.is_descendant(fixture.garage_chest, fixture.drawer));
	assert!(!index.is_descendant(fixture.drawer, fixture.garage_chest));
	assert!(!index.is_descendant(fixture.shelf, fixture.drawer));
	assert!(!index.is_descendant(fixture.drawer, fixture.drawer));
}

#[test]
fn cyclic_records_terminate() {
	let location_id = Uuid::new_v4();
	let a = Uuid::new_v4();
	let b = Uuid::new_v4();
	let c = Uuid::new_v4();
	let index = ContainerIndex::new(vec![
		record(a, location_id, Some(c), "A"),
		record(b, location_id, Some(a), "B"),
		record(c, location_id, Some(b), "C"),
	])
	.with_location_names([(location_id, "Loop".to_string())]);
	let ancestors: Vec<Uuid> = index.ancestors(a).iter().map(|c| c.id).collect();

	assert_eq!(ancestors, vec![b, c]);
	assert_eq!(index.build_path(a, true), "Loop/B/C/A");
	assert!(index.is_descendant(b, a));
	assert!(!index.is_descendant(a, a));

	let tree = index.build_tree(Some(a), None, 10);

	assert_eq!(tree.len(), 1);
	assert_eq!(tree[0].children[0].id, b);
	assert_eq!(tree[0].children[0].children[0].id, c);
	assert!(tree[0].children[0].children[0].children.is_empty());
}

#[test]
fn self_parented_record_terminates() {
	let location_id = Uuid::new_v4();
	let id = Uuid::new_v4();
	let index = ContainerIndex::new(vec![record(id, location_id, Some(id), "Ouroboros")]);

	assert!(index.ancestors(id).is_empty());
	assert_eq!(index.build_path(id, false), "Ouroboros");
}

#[test]
fn tree_orders_children_and_reports_counts() {
	let fixture = garage();
	let tree = fixture.index.build_tree(None, Some(fixture.location_id), 10);
	let names: Vec<&str> = tree.iter().map(|node| node.name.as_str()).collect();

	assert_eq!(names, vec!["Shelf", "Tool Chest"]);

	let chest = &tree[1];

	assert_eq!(chest.child_count, 1);
	assert_eq!(chest.item_count, 0);
	assert_eq!(chest.children[0].id, fixture.drawer);
	assert_eq!(chest.children[0].item_count, 3);
	assert_eq!(chest.children[0].parent_id, Some(fixture.garage_chest));
}

#[test]
fn tree_depth_cap_reports_leaves() {
	let fixture = garage();
	let tree = fixture.index.build_tree(Some(fixture.garage_chest), None, 1);

	assert_eq!(tree.len(), 1);
	assert_eq!(tree[0].child_count, 0);
	assert!(tree[0].children.is_empty());
	assert!(fixture.index.build_tree(Some(Uuid::new_v4()), None, 10).is_empty());
	assert!(fixture.index.build_tree(None, Some(Uuid::new_v4()), 10).is_empty());
}

#[test]
fn tree_serializes_with_snake_case_fields() {
	let fixture = garage();
	let tree = fixture.index.build_tree(Some(fixture.drawer), None, 10);
	let value = serde_json::to_value(&tree[0]).expect("Tree node must serialize.");

	assert_eq!(value["name"], "Drawer 9");
	assert_eq!(value["item_count"], 3);
	assert_eq!(value["child_count"], 0);
}

#[test]
fn child_lookup_respects_level() {
	let fixture = garage();
	let index = &fixture.index;

	assert_eq!(
		index.child_named(fixture.location_id, None, "Tool Chest").map(|c| c.id),
		Some(fixture.garage_chest)
	);
	assert_eq!(
		index.child_named(fixture.location_id, Some(fixture.garage_chest), "Drawer 9").map(|c| c.id),
		Some(fixture.drawer)
	);
	assert!(index.child_named(fixture.location_id, None, "Drawer 9").is_none());
}

#[test]
fn vector_codec_round_trips() {
	let vector = vec![0.25_f32, -1.5, 3.0e-7, f32::MAX];
	let bytes = vector::to_bytes(&vector);

	assert_eq!(bytes.len(), 16);
	assert_eq!(&bytes[..4], &0.25_f32.to_le_bytes());
	assert_eq!(vector::from_bytes(&bytes), Some(vector));
	assert_eq!(vector::to_bytes(&vector::from_bytes(&bytes).expect("Valid buffer.")), bytes);
	assert_eq!(vector::from_bytes(&bytes[..3]), None);
	assert_eq!(vector::from_bytes(&[]), Some(Vec::new()));
}

#[test]
fn cosine_similarity_identities() {
	let v = [1.0_f32, 2.0, 3.0];
	let negated = [-1.0_f32, -2.0, -3.0];
	let orthogonal = [3.0_f32, 0.0, -1.0];
	let zero = [0.0_f32; 3];

	assert!((vector::cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
	assert!((vector::cosine_similarity(&v, &negated) + 1.0).abs() < 1e-6);
	assert!(vector::cosine_similarity(&v, &orthogonal).abs() < 1e-6);
	assert_eq!(vector::cosine_similarity(&v, &zero), 0.0);
	assert_eq!(vector::cosine_similarity(&zero, &v), 0.0);
	assert_eq!(vector::cosine_similarity(&v, &[1.0, 2.0]), 0.0);
}

#[test]
fn batch_similarity_preserves_candidate_order() {
	let query = [1.0_f32, 0.0];
	let candidates = vec![vec![0.0_f32, 1.0], vec![1.0, 0.0], vec![-1.0, 0.0], vec![1.0, 1.0]];
	let scores = vector::batch_cosine_similarity(&query, &candidates);

	assert_eq!(scores.len(), 4);
	assert!(scores[0].abs() < 1e-6);
	assert!((scores[1] - 1.0).abs() < 1e-6);
	assert!((scores[2] + 1.0).abs() < 1e-6);
	assert!((scores[3] - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
	assert!(vector::batch_cosine_similarity(&query, &Vec::<Vec<f32>>::new()).is_empty());
}

#[test]
fn item_text_joins_present_fields() {
	assert_eq!(text::item_text("Hammer", None, None), "Hammer");
	assert_eq!(
		text::item_text("Claw Hammer", Some("steel head"), Some("left drawer")),
		"Claw Hammer steel head left drawer"
	);
	assert_eq!(text::item_text("Tape", None, Some("blue")), "Tape blue");
	assert_eq!(text::item_text("Tape", Some(""), None), "Tape");
}
