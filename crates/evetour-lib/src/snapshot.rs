use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::matrix::{self, DistanceMatrix};
use crate::reach;
use crate::universe::UniverseClient;

/// Numeric identifier for a solar system.
pub type SystemId = u32;

/// Reachability root: Jita, the cluster's trade hub.
pub const ROOT_SYSTEM: SystemId = 30_000_142;

/// Buffer size shared by the snapshot, instance, and log readers/writers.
/// Large enough that multi-megabyte artifacts stream in a handful of syscalls.
pub(crate) const FILE_BUF_CAPACITY: usize = 4 << 20;

/// One solar system as tracked in the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct System {
    pub name: String,
    pub region: String,
    pub stations: Vec<u32>,
    pub security_status: f32,
}

/// The cached graph artifact: adjacency, reachability closure, and the dense
/// all-pairs distance matrix over the reachable set.
///
/// Built once, written to disk, and loaded read-only on later runs. The
/// index maps give every reachable system a stable row in the matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "Nodes")]
    pub nodes: HashMap<SystemId, System>,
    #[serde(rename = "Edges")]
    pub edges: HashMap<SystemId, Vec<SystemId>>,
    #[serde(rename = "Reachable")]
    pub reachable: HashSet<SystemId>,
    #[serde(rename = "MatrixIndexesToIds")]
    pub matrix_indexes_to_ids: Vec<SystemId>,
    #[serde(rename = "IdsToMatrixIndexes")]
    pub ids_to_matrix_indexes: HashMap<SystemId, usize>,
    #[serde(rename = "Matrix")]
    pub matrix: DistanceMatrix,
}

impl Snapshot {
    /// Snapshot filename for the given variant.
    pub fn file_name(only_highsec: bool) -> &'static str {
        if only_highsec {
            "highsec-graph.json"
        } else {
            "graph.json"
        }
    }

    /// Load a cached snapshot, or build one from the remote source and
    /// persist it. Any load failure (missing file, interrupted write,
    /// incompatible contents) counts as a cache miss.
    pub fn ensure(dir: &Path, client: &UniverseClient, only_highsec: bool) -> Result<Self> {
        let path = dir.join(Self::file_name(only_highsec));
        match Self::load(&path) {
            Ok(snapshot) => {
                info!(
                    file = %path.display(),
                    systems = snapshot.nodes.len(),
                    reachable = snapshot.reachable.len(),
                    "loaded cached snapshot"
                );
                Ok(snapshot)
            }
            Err(error) => {
                info!(
                    file = %path.display(),
                    %error,
                    "no usable snapshot; seeding the graph from the remote source"
                );
                let (nodes, edges) = client.fetch_universe(only_highsec)?;
                let snapshot = Self::from_parts(nodes, edges, ROOT_SYSTEM, only_highsec);
                snapshot.store(&path)?;
                Ok(snapshot)
            }
        }
    }

    /// Assemble a snapshot from adjacency data: compute the reachability
    /// closure from `root`, assign matrix rows to the reachable systems in
    /// ascending id order, seed direct gates at distance 1, and relax to
    /// all-pairs shortest paths.
    pub fn from_parts(
        nodes: HashMap<SystemId, System>,
        edges: HashMap<SystemId, Vec<SystemId>>,
        root: SystemId,
        only_highsec: bool,
    ) -> Self {
        let reachable = reach::reachable_from(&nodes, &edges, root, only_highsec);

        let mut matrix_indexes_to_ids: Vec<SystemId> = reachable.iter().copied().collect();
        matrix_indexes_to_ids.sort_unstable();
        let ids_to_matrix_indexes: HashMap<SystemId, usize> = matrix_indexes_to_ids
            .iter()
            .enumerate()
            .map(|(index, &id)| (id, index))
            .collect();

        let n = matrix_indexes_to_ids.len();
        let mut matrix = DistanceMatrix::unreachable(n);
        for i in 0..n {
            matrix.set(i, i, 0);
        }
        for (from, neighbours) in &edges {
            let Some(&from_index) = ids_to_matrix_indexes.get(from) else {
                continue;
            };
            for to in neighbours {
                match ids_to_matrix_indexes.get(to) {
                    Some(&to_index) => matrix.set(from_index, to_index, 1),
                    // Expected in highsec mode where the closure prunes the
                    // destination; unexpected otherwise but not asserted.
                    None => debug!(from, to, "gate leads out of the reachable set; dropped"),
                }
            }
        }

        info!(systems = n, "relaxing the full distance matrix");
        matrix::shortest_paths(&mut matrix);

        Self {
            nodes,
            edges,
            reachable,
            matrix_indexes_to_ids,
            ids_to_matrix_indexes,
            matrix,
        }
    }

    /// Read a snapshot back from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::with_capacity(FILE_BUF_CAPACITY, File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Persist the snapshot. The buffered flush must complete before the
    /// write counts as successful; an interrupted write fails to decode and
    /// is rebuilt on the next run.
    pub fn store(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::with_capacity(FILE_BUF_CAPACITY, File::create(path)?);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        info!(file = %path.display(), "snapshot written");
        Ok(())
    }

    /// Matrix row assigned to a reachable system.
    pub fn matrix_index(&self, id: SystemId) -> Option<usize> {
        self.ids_to_matrix_indexes.get(&id).copied()
    }

    /// Jump distance between two reachable systems.
    pub fn distance(&self, from: SystemId, to: SystemId) -> Option<u8> {
        let from = self.matrix_index(from)?;
        let to = self.matrix_index(to)?;
        Some(self.matrix.at(from, to))
    }

    /// Name of a system, when known.
    pub fn system_name(&self, id: SystemId) -> Option<&str> {
        self.nodes.get(&id).map(|system| system.name.as_str())
    }
}
