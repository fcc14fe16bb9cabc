use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::error::Result;
use crate::matrix::DistanceMatrix;
use crate::snapshot::{Snapshot, SystemId, FILE_BUF_CAPACITY};

/// Which systems survive into the planning subset.
#[derive(Debug, Clone, Default)]
pub struct SubsetFilter {
    /// Keep only systems in these regions (case-insensitive, trimmed).
    pub regions: Vec<String>,
    /// Drop systems in these regions (case-insensitive, trimmed).
    pub skip_regions: Vec<String>,
    /// Keep only systems with at least one station.
    pub only_with_stations: bool,
    /// Also bucket the surviving systems by region.
    pub group_by_region: bool,
}

/// The projected planning subset: surviving ids in snapshot index order, the
/// dense submatrix over them, and optional region buckets of 0-based subset
/// indices in first-seen order.
#[derive(Debug, Clone)]
pub struct Subset {
    pub ids: Vec<SystemId>,
    pub matrix: DistanceMatrix,
    pub buckets: Option<Vec<Vec<usize>>>,
}

impl Subset {
    /// Persist the index→id mapping so a later run can translate a solver
    /// tour back to systems.
    pub fn store_ids(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::with_capacity(FILE_BUF_CAPACITY, File::create(path)?);
        serde_json::to_writer(&mut writer, &self.ids)?;
        writer.flush()?;
        info!(file = %path.display(), "index mapping written");
        Ok(())
    }

    /// Read back an index→id mapping written by [`Subset::store_ids`].
    pub fn load_ids(path: &Path) -> Result<Vec<SystemId>> {
        let reader = BufReader::with_capacity(FILE_BUF_CAPACITY, File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

fn normalize_regions(regions: &[String]) -> HashSet<String> {
    regions
        .iter()
        .map(|region| region.trim().to_lowercase())
        .filter(|region| !region.is_empty())
        .collect()
}

/// Project the snapshot down to the systems worth routing through.
///
/// The submatrix is a straight gather from the full matrix: for surviving
/// ids `a` and `b`, `sub[a][b]` equals the snapshot distance between them.
pub fn project(snapshot: &Snapshot, visited: &HashSet<SystemId>, filter: &SubsetFilter) -> Subset {
    let include = normalize_regions(&filter.regions);
    let exclude = normalize_regions(&filter.skip_regions);

    let mut ids = Vec::new();
    let mut regions = Vec::new();
    for &id in &snapshot.matrix_indexes_to_ids {
        if visited.contains(&id) {
            continue;
        }
        let Some(system) = snapshot.nodes.get(&id) else {
            continue;
        };
        let region = system.region.trim().to_lowercase();
        if !include.is_empty() && !include.contains(&region) {
            continue;
        }
        if exclude.contains(&region) {
            continue;
        }
        if filter.only_with_stations && system.stations.is_empty() {
            continue;
        }
        ids.push(id);
        regions.push(region);
    }

    let k = ids.len();
    let mut matrix = DistanceMatrix::filled(k, 0);
    for (a, &from) in ids.iter().enumerate() {
        for (b, &to) in ids.iter().enumerate() {
            if let Some(distance) = snapshot.distance(from, to) {
                matrix.set(a, b, distance);
            }
        }
    }

    let buckets = filter
        .group_by_region
        .then(|| region_buckets(&regions));

    Subset {
        ids,
        matrix,
        buckets,
    }
}

/// Group subset indices by region, buckets ordered by first appearance.
fn region_buckets(regions: &[String]) -> Vec<Vec<usize>> {
    let mut buckets: Vec<Vec<usize>> = Vec::new();
    let mut bucket_by_region: HashMap<&str, usize> = HashMap::new();
    for (index, region) in regions.iter().enumerate() {
        let bucket = *bucket_by_region.entry(region.as_str()).or_insert_with(|| {
            buckets.push(Vec::new());
            buckets.len() - 1
        });
        buckets[bucket].push(index);
    }
    buckets
}
