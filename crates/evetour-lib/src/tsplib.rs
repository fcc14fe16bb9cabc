//! TSPLIB instance writers and tour reader for the LKH solver family.
//!
//! Everything here is one-indexed on the wire: node ids start at 1, set
//! sections and tours terminate with `-1`, files end with `EOF`.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::error::{Error, Result};
use crate::matrix::DistanceMatrix;
use crate::snapshot::FILE_BUF_CAPACITY;

const TOUR_SECTION_HEADER: &str = "TOUR_SECTION";
const SECTION_END_MARKER: &str = "-1";

fn instance_writer(path: &Path) -> Result<BufWriter<File>> {
    Ok(BufWriter::with_capacity(
        FILE_BUF_CAPACITY,
        File::create(path)?,
    ))
}

fn write_matrix_rows<W: Write>(writer: &mut W, matrix: &DistanceMatrix) -> Result<()> {
    for i in 0..matrix.len() {
        for (j, distance) in matrix.row(i).iter().enumerate() {
            if j > 0 {
                write!(writer, " ")?;
            }
            write!(writer, "{distance}")?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

/// How a tour file's indices map back to the emitted instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TourKind {
    /// Every tour entry is a real node (TSP and GTSP instances).
    Plain,
    /// The instance wrapped the real nodes between a fake start at index 0
    /// and a fake end at index k+1; both must be stripped on import.
    Sop,
}

/// Write a plain TSP instance: just the dense matrix.
pub fn write_tsp(matrix: &DistanceMatrix, path: &Path) -> Result<()> {
    let mut writer = instance_writer(path)?;
    writeln!(writer, "NAME: graph")?;
    writeln!(writer, "TYPE: TSP")?;
    writeln!(writer, "DIMENSION: {}", matrix.len())?;
    writeln!(writer, "EDGE_WEIGHT_TYPE: EXPLICIT")?;
    writeln!(writer, "EDGE_WEIGHT_FORMAT: FULL_MATRIX")?;
    writeln!(writer, "EDGE_WEIGHT_SECTION")?;
    write_matrix_rows(&mut writer, matrix)?;
    writeln!(writer, "EOF")?;
    writer.flush()?;
    info!(file = %path.display(), nodes = matrix.len(), "TSP instance written");
    Ok(())
}

/// Write a clustered instance: the dense matrix plus one
/// `GTSP_SET_SECTION` line per bucket, members one-indexed and terminated
/// with `-1`.
pub fn write_gtsp(matrix: &DistanceMatrix, buckets: &[Vec<usize>], path: &Path) -> Result<()> {
    let mut writer = instance_writer(path)?;
    writeln!(writer, "NAME: graph")?;
    writeln!(writer, "TYPE: GTSP")?;
    writeln!(writer, "DIMENSION: {}", matrix.len())?;
    writeln!(writer, "GTSP_SETS: {}", buckets.len())?;
    writeln!(writer, "EDGE_WEIGHT_TYPE: EXPLICIT")?;
    writeln!(writer, "EDGE_WEIGHT_FORMAT: FULL_MATRIX")?;
    writeln!(writer, "EDGE_WEIGHT_SECTION")?;
    write_matrix_rows(&mut writer, matrix)?;
    writeln!(writer, "GTSP_SET_SECTION")?;
    for (bucket, members) in buckets.iter().enumerate() {
        write!(writer, "{}", bucket + 1)?;
        for &member in members {
            write!(writer, " {}", member + 1)?;
        }
        writeln!(writer, " {SECTION_END_MARKER}")?;
    }
    writeln!(writer, "EOF")?;
    writer.flush()?;
    info!(
        file = %path.display(),
        nodes = matrix.len(),
        sets = buckets.len(),
        "GTSP instance written"
    );
    Ok(())
}

/// Write a sequential-ordering instance that wraps the real matrix between a
/// fake start node and a fake end node.
///
/// In SOP cost rows `-1` marks a forbidden transition and `0` a free one.
/// The start row carries `start_costs` (or all zeroes) so the solver begins
/// wherever is cheapest from the caller's position, and its final `-1`
/// forbids jumping straight from start to end. Real rows cannot return to
/// the start and may always terminate; the end row is a pure sink.
pub fn write_sop(matrix: &DistanceMatrix, start_costs: Option<&[u8]>, path: &Path) -> Result<()> {
    let k = matrix.len();
    debug_assert!(start_costs.is_none_or(|costs| costs.len() == k));
    let dimension = k + 2;

    let mut writer = instance_writer(path)?;
    writeln!(writer, "NAME: graph")?;
    writeln!(writer, "TYPE: SOP")?;
    writeln!(writer, "DIMENSION: {dimension}")?;
    writeln!(writer, "EDGE_WEIGHT_TYPE: EXPLICIT")?;
    writeln!(writer, "EDGE_WEIGHT_FORMAT: FULL_MATRIX")?;
    writeln!(writer, "EDGE_WEIGHT_SECTION")?;
    // SOP data repeats the dimension ahead of the matrix; LKH insists on it.
    writeln!(writer, "{dimension}")?;

    write!(writer, "0")?;
    for i in 0..k {
        let cost = start_costs.map_or(0, |costs| costs[i]);
        write!(writer, " {cost}")?;
    }
    writeln!(writer, " -1")?;

    for i in 0..k {
        write!(writer, "-1")?;
        for j in 0..k {
            write!(writer, " {}", matrix.at(i, j))?;
        }
        writeln!(writer, " 0")?;
    }

    let mut sink: Vec<&str> = vec!["-1"; k + 1];
    sink.push("0");
    writeln!(writer, "{}", sink.join(" "))?;

    writeln!(writer, "EOF")?;
    writer.flush()?;
    info!(file = %path.display(), nodes = k, "SOP instance written");
    Ok(())
}

/// Read a solver tour back as 0-based indices into the projected subset.
///
/// Header lines before `TOUR_SECTION` are ignored; the integer sequence runs
/// until `-1`. Entries are one-indexed on the wire. For [`TourKind::Sop`]
/// the first and last entries are the fake start and end and are dropped,
/// and the survivors shift down once more to account for the fake start
/// occupying index 0 of the instance.
pub fn read_tour(path: &Path, kind: TourKind) -> Result<Vec<usize>> {
    let reader = BufReader::with_capacity(FILE_BUF_CAPACITY, File::open(path)?);

    let mut in_tour_section = false;
    let mut entries: Vec<usize> = Vec::new();
    'scan: for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if !in_tour_section {
            if line == TOUR_SECTION_HEADER {
                in_tour_section = true;
            }
            continue;
        }
        for token in line.split_whitespace() {
            if token == SECTION_END_MARKER {
                break 'scan;
            }
            let id: usize = token.parse().map_err(|_| Error::MalformedTour {
                path: path.to_path_buf(),
                detail: format!("bad tour entry {token:?}"),
            })?;
            if id == 0 {
                return Err(Error::MalformedTour {
                    path: path.to_path_buf(),
                    detail: "tour entries are one-indexed; found 0".to_string(),
                });
            }
            entries.push(id - 1);
        }
    }

    if !in_tour_section {
        return Err(Error::MissingTourSection {
            path: path.to_path_buf(),
        });
    }

    match kind {
        TourKind::Plain => Ok(entries),
        TourKind::Sop => {
            if entries.len() < 2 {
                return Err(Error::MalformedTour {
                    path: path.to_path_buf(),
                    detail: "sequential tour is missing its start/end sentinels".to_string(),
                });
            }
            let interior = &entries[1..entries.len() - 1];
            interior
                .iter()
                .map(|&entry| {
                    entry.checked_sub(1).ok_or_else(|| Error::MalformedTour {
                        path: path.to_path_buf(),
                        detail: "interior tour entry collides with the start sentinel".to_string(),
                    })
                })
                .collect()
        }
    }
}
