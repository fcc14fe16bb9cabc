use std::collections::HashMap;
use std::fs;

use evetour_lib::{Snapshot, System, SystemId};
use tempfile::tempdir;

fn fixture_snapshot() -> Snapshot {
    let nodes = HashMap::from([
        (
            1,
            System {
                name: "Alpha".to_string(),
                region: "Heimatar".to_string(),
                stations: vec![11, 12],
                security_status: 0.9,
            },
        ),
        (
            2,
            System {
                name: "Beta".to_string(),
                region: "Metropolis".to_string(),
                stations: Vec::new(),
                security_status: 0.4,
            },
        ),
    ]);
    let edges: HashMap<SystemId, Vec<SystemId>> =
        HashMap::from([(1, vec![2]), (2, vec![1])]);
    Snapshot::from_parts(nodes, edges, 1, false)
}

#[test]
fn store_then_load_round_trips() {
    let snapshot = fixture_snapshot();
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join(Snapshot::file_name(false));

    snapshot.store(&path).expect("store snapshot");
    let loaded = Snapshot::load(&path).expect("load snapshot");

    assert_eq!(loaded, snapshot);
}

#[test]
fn snapshot_json_uses_the_stable_field_names() {
    let snapshot = fixture_snapshot();
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join(Snapshot::file_name(false));
    snapshot.store(&path).expect("store snapshot");

    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).expect("read snapshot")).expect("json");
    let object = value.as_object().expect("object");

    for field in [
        "Nodes",
        "Edges",
        "Reachable",
        "MatrixIndexesToIds",
        "IdsToMatrixIndexes",
        "Matrix",
    ] {
        assert!(object.contains_key(field), "missing field {field}");
    }

    let matrix = value["Matrix"].as_object().expect("matrix object");
    assert!(matrix.contains_key("RowSize"));
    assert!(matrix.contains_key("Arr"));
    assert_eq!(value["Matrix"]["RowSize"], 2);

    let node = value["Nodes"]["1"].as_object().expect("node object");
    for field in ["Name", "Region", "Stations", "SecurityStatus"] {
        assert!(node.contains_key(field), "missing node field {field}");
    }
}

#[test]
fn variant_file_names_differ() {
    assert_eq!(Snapshot::file_name(false), "graph.json");
    assert_eq!(Snapshot::file_name(true), "highsec-graph.json");
}

#[test]
fn truncated_snapshot_fails_to_load() {
    let snapshot = fixture_snapshot();
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join(Snapshot::file_name(false));
    snapshot.store(&path).expect("store snapshot");

    let text = fs::read_to_string(&path).expect("read snapshot");
    fs::write(&path, &text[..text.len() / 2]).expect("truncate");

    assert!(Snapshot::load(&path).is_err());
}

#[test]
fn missing_snapshot_fails_to_load() {
    let dir = tempdir().expect("tempdir");
    assert!(Snapshot::load(&dir.path().join("graph.json")).is_err());
}
