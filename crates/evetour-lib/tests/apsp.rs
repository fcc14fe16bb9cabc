use std::collections::{HashMap, HashSet, VecDeque};

use rand::{Rng, SeedableRng};

use evetour_lib::{Snapshot, System, SystemId, UNREACHABLE};

fn system(name: &str, security_status: f32) -> System {
    System {
        name: name.to_string(),
        region: "Test Region".to_string(),
        stations: Vec::new(),
        security_status,
    }
}

fn line_graph(security: &[f32]) -> (HashMap<SystemId, System>, HashMap<SystemId, Vec<SystemId>>) {
    let mut nodes = HashMap::new();
    let mut edges: HashMap<SystemId, Vec<SystemId>> = HashMap::new();
    for (i, &sec) in security.iter().enumerate() {
        let id = i as SystemId + 1;
        nodes.insert(id, system(&format!("Sys-{id}"), sec));
        let mut neighbours = Vec::new();
        if i > 0 {
            neighbours.push(id - 1);
        }
        if i + 1 < security.len() {
            neighbours.push(id + 1);
        }
        edges.insert(id, neighbours);
    }
    (nodes, edges)
}

#[test]
fn four_node_line_yields_hop_distances() {
    let (nodes, edges) = line_graph(&[1.0, 1.0, 1.0, 1.0]);
    let snapshot = Snapshot::from_parts(nodes, edges, 1, false);

    assert_eq!(snapshot.matrix_indexes_to_ids, vec![1, 2, 3, 4]);
    let expected = [[0, 1, 2, 3], [1, 0, 1, 2], [2, 1, 0, 1], [3, 2, 1, 0]];
    for (i, row) in expected.iter().enumerate() {
        for (j, &distance) in row.iter().enumerate() {
            assert_eq!(snapshot.matrix.at(i, j), distance, "cell ({i}, {j})");
        }
    }
}

#[test]
fn lowsec_midpoint_cuts_the_highsec_closure_to_the_root() {
    let (nodes, edges) = line_graph(&[1.0, 0.3, 1.0, 1.0]);
    let snapshot = Snapshot::from_parts(nodes, edges, 1, true);

    assert_eq!(snapshot.reachable, HashSet::from([1]));
    assert_eq!(snapshot.matrix_indexes_to_ids, vec![1]);
    assert_eq!(snapshot.matrix.len(), 1);
    assert_eq!(snapshot.matrix.at(0, 0), 0);
}

#[test]
fn highsec_closure_never_admits_a_lowsec_system() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(7);
    let (nodes, edges) = random_graph(&mut rng, 40);
    let snapshot = Snapshot::from_parts(nodes.clone(), edges, 1, true);

    for id in &snapshot.reachable {
        assert!(nodes[id].security_status >= 0.5, "system {id} is lowsec");
    }
}

#[test]
fn matrix_matches_breadth_first_distances() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(42);
    let (nodes, edges) = random_graph(&mut rng, 60);
    let snapshot = Snapshot::from_parts(nodes, edges.clone(), 1, false);

    for (i, &from) in snapshot.matrix_indexes_to_ids.iter().enumerate() {
        let distances = bfs_distances(&edges, &snapshot.reachable, from);
        for (j, &to) in snapshot.matrix_indexes_to_ids.iter().enumerate() {
            match distances.get(&to) {
                Some(&hops) => assert_eq!(
                    u32::from(snapshot.matrix.at(i, j)),
                    hops.min(254),
                    "distance {from} -> {to}"
                ),
                None => assert_eq!(
                    snapshot.matrix.at(i, j),
                    UNREACHABLE,
                    "distance {from} -> {to}"
                ),
            }
        }
    }
}

#[test]
fn matrix_satisfies_the_triangle_inequality() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(9);
    let (nodes, edges) = random_graph(&mut rng, 30);
    let snapshot = Snapshot::from_parts(nodes, edges, 1, false);

    let n = snapshot.matrix.len();
    for i in 0..n {
        for j in 0..n {
            for k in 0..n {
                let via = u16::from(snapshot.matrix.at(i, k)) + u16::from(snapshot.matrix.at(k, j));
                if via < u16::from(UNREACHABLE) {
                    assert!(
                        u16::from(snapshot.matrix.at(i, j)) <= via,
                        "triangle violated at ({i}, {j}) via {k}"
                    );
                }
            }
        }
    }
}

#[test]
fn direct_gates_have_distance_one() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(3);
    let (nodes, edges) = random_graph(&mut rng, 25);
    let snapshot = Snapshot::from_parts(nodes, edges.clone(), 1, false);

    for (from, neighbours) in &edges {
        let Some(i) = snapshot.matrix_index(*from) else {
            continue;
        };
        for to in neighbours {
            if let Some(j) = snapshot.matrix_index(*to) {
                if i != j {
                    assert_eq!(snapshot.matrix.at(i, j), 1, "gate {from} -> {to}");
                }
            }
        }
    }
}

/// Sparse directed graph with a mix of security bands; node 1 always exists.
fn random_graph(
    rng: &mut impl Rng,
    n: u32,
) -> (HashMap<SystemId, System>, HashMap<SystemId, Vec<SystemId>>) {
    let mut nodes = HashMap::new();
    let mut edges: HashMap<SystemId, Vec<SystemId>> = HashMap::new();
    for id in 1..=n {
        let sec = rng.random_range(-0.5..1.0);
        nodes.insert(id, system(&format!("Sys-{id}"), sec));
        edges.insert(id, Vec::new());
    }
    for _ in 0..(n * 3) {
        let from = rng.random_range(1..=n);
        let to = rng.random_range(1..=n);
        if from != to {
            edges.entry(from).or_default().push(to);
        }
    }
    (nodes, edges)
}

fn bfs_distances(
    edges: &HashMap<SystemId, Vec<SystemId>>,
    reachable: &HashSet<SystemId>,
    start: SystemId,
) -> HashMap<SystemId, u32> {
    let mut distances = HashMap::from([(start, 0)]);
    let mut queue = VecDeque::from([start]);
    while let Some(current) = queue.pop_front() {
        let next_distance = distances[&current] + 1;
        for next in edges.get(&current).into_iter().flatten() {
            if reachable.contains(next) && !distances.contains_key(next) {
                distances.insert(*next, next_distance);
                queue.push_back(*next);
            }
        }
    }
    distances
}
