use std::process::{Command, Output};

use serde_json::Value;

fn demo(name: &str) -> String {
    format!("{}/../../demos/{name}", env!("CARGO_MANIFEST_DIR"))
}

fn spiritfield(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_spiritfield"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to launch the spiritfield binary")
}

fn stdout_of(output: &Output) -> String {
    assert!(
        output.status.success(),
        "spiritfield failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout.clone()).expect("stdout is utf-8")
}

#[test]
fn simulate_prints_one_json_event_per_line() {
    let scenario = demo("meadow.toml");
    let stdout = stdout_of(&spiritfield(&["simulate", &scenario, "--ticks", "12"]));

    let events: Vec<Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("every line is json"))
        .collect();
    let ticks = events
        .iter()
        .filter(|event| event.get("TimeAdvanced").is_some())
        .count();
    assert_eq!(ticks, 12);
    assert!(events.iter().any(|event| event.get("TileDestroyed").is_some()));
    assert!(events.iter().any(|event| event.get("EffectSpawned").is_some()));
}

#[test]
fn simulate_is_deterministic() {
    let scenario = demo("meadow.toml");
    let first = stdout_of(&spiritfield(&["simulate", &scenario, "--seed", "9"]));
    let second = stdout_of(&spiritfield(&["simulate", &scenario, "--seed", "9"]));
    assert_eq!(first, second);
}

#[test]
fn reach_lists_what_the_items_open() {
    let graph = demo("overworld.json");
    let stdout = stdout_of(&spiritfield(&[
        "reach", &graph, "--start", "village", "--item", "sword",
    ]));

    let reach: Value = serde_json::from_str(&stdout).expect("reach prints json");
    let nodes: Vec<&str> = reach["nodes"]
        .as_array()
        .expect("nodes array")
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(nodes.contains(&"forest"));
    assert!(!nodes.contains(&"lake"));
    assert!(!nodes.contains(&"shrine"));
}

#[test]
fn place_fills_the_pool_reproducibly() {
    let graph = demo("overworld.json");
    let args = ["place", graph.as_str(), "--start", "village", "--seed", "5"];
    let first = stdout_of(&spiritfield(&args));
    let second = stdout_of(&spiritfield(&args));
    assert_eq!(first, second);

    let placement: Value = serde_json::from_str(&first).expect("place prints json");
    assert_eq!(placement.as_object().map(|map| map.len()), Some(6));
}

#[test]
fn missing_files_are_reported() {
    let output = spiritfield(&["simulate", "no/such/scenario.toml"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no/such/scenario.toml"), "{stderr}");
}
