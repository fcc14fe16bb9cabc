use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use regex::Regex;
use tracing::info;

use crate::error::{Error, Result};
use crate::snapshot::{Snapshot, SystemId, FILE_BUF_CAPACITY};

/// Build the jump-line matcher over every known system name.
///
/// Names are escaped so metacharacters cannot warp the pattern, and sorted
/// longest-first so the alternation can never stop short on a name that
/// prefixes another.
fn jump_pattern(snapshot: &Snapshot) -> Result<Regex> {
    let mut names: Vec<&str> = snapshot
        .nodes
        .values()
        .map(|system| system.name.as_str())
        .collect();
    names.sort_unstable_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));

    let alternation = names
        .iter()
        .map(|name| regex::escape(name))
        .collect::<Vec<_>>()
        .join("|");
    Ok(Regex::new(&format!(
        "Jumping from ({alternation}) to ({alternation})"
    ))?)
}

/// Scan game logs for jump lines and collect the systems already traversed.
///
/// Only reachable systems enter the visited set. A captured name missing
/// from the graph aborts the scan: the logs belong to a different universe
/// version than the snapshot.
pub fn parse_visited_logs<P: AsRef<Path>>(
    snapshot: &Snapshot,
    logs: &[P],
) -> Result<HashSet<SystemId>> {
    let pattern = jump_pattern(snapshot)?;
    let name_to_id: HashMap<&str, SystemId> = snapshot
        .nodes
        .iter()
        .map(|(&id, system)| (system.name.as_str(), id))
        .collect();

    let mut visited = HashSet::new();
    for log in logs {
        let log = log.as_ref();
        info!(file = %log.display(), "scanning jump log");
        let file = File::open(log).map_err(|source| Error::LogRead {
            path: log.to_path_buf(),
            source,
        })?;
        let reader = BufReader::with_capacity(FILE_BUF_CAPACITY, file);
        for line in reader.lines() {
            let line = line.map_err(|source| Error::LogRead {
                path: log.to_path_buf(),
                source,
            })?;
            let Some(captures) = pattern.captures(&line) else {
                continue;
            };
            for endpoint in [&captures[1], &captures[2]] {
                let &id = name_to_id
                    .get(endpoint)
                    .ok_or_else(|| Error::UnknownSystem {
                        name: endpoint.to_string(),
                    })?;
                if snapshot.reachable.contains(&id) {
                    visited.insert(id);
                }
            }
        }
    }

    Ok(visited)
}
