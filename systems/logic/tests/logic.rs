use proptest::prelude::*;

use spiritfield_system_logic::{
    assumed_fill, collect_until_stable, reachable, Inventory, LogicError, LogicGraph,
};

const GRAPH: &str = r#"{"nodes": [
    {
        "key": "shrine",
        "zone": "plateau",
        "checks": [{"key": "shrine_gift"}],
        "paths": [
            {"to": "ruins", "requires": {"item": {"key": "glove"}}},
            {"to": "marsh", "requires": {"any": [{"item": {"key": "boots"}}, {"item": {"key": "cape"}}]}}
        ]
    },
    {
        "key": "ruins",
        "zone": "plateau",
        "checks": [
            {"key": "ruins_chest"},
            {"key": "ruins_vault", "requires": {"item": {"key": "small_key", "count": 2}}}
        ],
        "paths": [{"to": "shrine"}]
    },
    {
        "key": "marsh",
        "zone": "wetlands",
        "checks": [{"key": "marsh_idol"}, {"key": "marsh_nest"}],
        "paths": [
            {"to": "spire", "requires": {"all": [{"flag": "marsh_idol"}, {"item": {"key": "glove"}}]}}
        ]
    },
    {
        "key": "spire",
        "zone": "wetlands",
        "checks": [{"key": "spire_top"}]
    }
],
"items": ["glove", "boots", "small_key", "small_key", "cape"]}"#;

fn graph() -> LogicGraph {
    LogicGraph::from_json(GRAPH).expect("graph parses")
}

fn items(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|key| (*key).to_owned()).collect()
}

#[test]
fn any_requirement_opens_with_either_item() {
    let graph = graph();
    for item in ["boots", "cape"] {
        let inventory: Inventory = [item].into_iter().collect();
        let reach = reachable(&graph, "shrine", &inventory).expect("start exists");
        assert!(reach.nodes.contains("marsh"), "{item} should open the marsh");
        assert!(reach.zones.contains("wetlands"));
        assert!(!reach.nodes.contains("spire"));
    }
}

#[test]
fn counted_items_gate_checks() {
    let graph = graph();
    let mut inventory: Inventory = ["glove", "small_key"].into_iter().collect();
    let reach = reachable(&graph, "shrine", &inventory).expect("start exists");
    assert!(reach.checks.contains("ruins_chest"));
    assert!(!reach.checks.contains("ruins_vault"));

    inventory.add_item("small_key");
    let reach = reachable(&graph, "shrine", &inventory).expect("start exists");
    assert!(reach.checks.contains("ruins_vault"));
}

#[test]
fn collected_checks_raise_flags() {
    let graph = graph();
    let inventory: Inventory = ["glove", "boots"].into_iter().collect();

    let before = reachable(&graph, "shrine", &inventory).expect("start exists");
    assert!(!before.nodes.contains("spire"));

    let (after_inventory, after) =
        collect_until_stable(&graph, "shrine", &inventory, &Default::default())
            .expect("start exists");
    assert!(after_inventory.has_flag("marsh_idol"));
    assert!(after.checks.contains("spire_top"));
}

#[test]
fn unknown_start_is_reported() {
    assert!(matches!(
        reachable(&graph(), "moon", &Inventory::new()),
        Err(LogicError::UnknownStart(start)) if start == "moon"
    ));
}

#[test]
fn same_seed_places_items_identically() {
    let graph = graph();
    let pool = items(&["glove", "boots", "small_key", "small_key"]);
    let first = assumed_fill(&graph, "shrine", &pool, 42).expect("fill succeeds");
    let second = assumed_fill(&graph, "shrine", &pool, 42).expect("fill succeeds");
    assert_eq!(first, second);
    assert_eq!(first.len(), pool.len());
}

#[test]
fn sealed_graphs_cannot_be_filled() {
    let graph = LogicGraph::from_json(
        r#"{"nodes": [
            {"key": "cell", "paths": [{"to": "yard", "requires": "never"}]},
            {"key": "yard", "checks": [{"key": "yard_crate"}]}
        ]}"#,
    )
    .expect("graph parses");

    assert!(matches!(
        assumed_fill(&graph, "cell", &items(&["lockpick"]), 3),
        Err(LogicError::Unplaceable(item)) if item == "lockpick"
    ));
}

proptest! {
    #[test]
    fn every_fill_is_beatable(seed in any::<u64>()) {
        let graph = graph();
        let placement =
            assumed_fill(&graph, "shrine", graph.items(), seed).expect("fill succeeds");

        let (inventory, reach) =
            collect_until_stable(&graph, "shrine", &Inventory::new(), &placement)
                .expect("start exists");
        prop_assert_eq!(inventory.count("small_key"), 2);
        prop_assert_eq!(inventory.count("glove"), 1);
        prop_assert!(reach.nodes.contains("spire"));
    }
}
