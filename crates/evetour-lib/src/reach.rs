use std::collections::{HashMap, HashSet};

use crate::snapshot::{System, SystemId};

/// Systems at or above this security status count as highsec.
pub const HIGHSEC_THRESHOLD: f32 = 0.5;

/// Compute the closure of systems reachable from `root` by stargate.
///
/// With `only_highsec`, a system below [`HIGHSEC_THRESHOLD`] is a non-visit:
/// the traversal neither marks it nor follows its outgoing gates, so the
/// predicate shapes the closure itself rather than filtering it afterwards.
/// The traversal keeps an explicit stack; the cluster's diameter is modest
/// but the recursion depth of a pathological graph is not.
pub fn reachable_from(
    nodes: &HashMap<SystemId, System>,
    edges: &HashMap<SystemId, Vec<SystemId>>,
    root: SystemId,
    only_highsec: bool,
) -> HashSet<SystemId> {
    let visitable = |id: SystemId| {
        !only_highsec
            || nodes
                .get(&id)
                .is_some_and(|system| system.security_status >= HIGHSEC_THRESHOLD)
    };

    let mut reachable = HashSet::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if !visitable(id) || !reachable.insert(id) {
            continue;
        }
        if let Some(neighbours) = edges.get(&id) {
            stack.extend(neighbours.iter().copied());
        }
    }

    reachable
}

#[cfg(test)]
mod tests {
    use super::{reachable_from, HIGHSEC_THRESHOLD};
    use crate::snapshot::System;
    use std::collections::HashMap;

    fn system(name: &str, security_status: f32) -> System {
        System {
            name: name.to_string(),
            region: "Test Region".to_string(),
            stations: Vec::new(),
            security_status,
        }
    }

    #[test]
    fn closure_follows_gates_both_ways_only_if_present() {
        let nodes = HashMap::from([
            (1, system("A", 1.0)),
            (2, system("B", 1.0)),
            (3, system("C", 1.0)),
        ]);
        // 3 points at 1 but nothing points at 3.
        let edges = HashMap::from([(1, vec![2]), (2, vec![1]), (3, vec![1])]);

        let reachable = reachable_from(&nodes, &edges, 1, false);
        assert!(reachable.contains(&1));
        assert!(reachable.contains(&2));
        assert!(!reachable.contains(&3));
    }

    #[test]
    fn lowsec_gate_prunes_everything_behind_it() {
        let nodes = HashMap::from([
            (1, system("A", 1.0)),
            (2, system("B", HIGHSEC_THRESHOLD - 0.2)),
            (3, system("C", 1.0)),
        ]);
        let edges = HashMap::from([(1, vec![2]), (2, vec![1, 3]), (3, vec![2])]);

        let reachable = reachable_from(&nodes, &edges, 1, true);
        assert_eq!(reachable.len(), 1);
        assert!(reachable.contains(&1));
    }

    #[test]
    fn lowsec_root_reaches_nothing_in_highsec_mode() {
        let nodes = HashMap::from([(1, system("A", 0.1)), (2, system("B", 1.0))]);
        let edges = HashMap::from([(1, vec![2]), (2, vec![1])]);

        let reachable = reachable_from(&nodes, &edges, 1, true);
        assert!(reachable.is_empty());
    }
}
