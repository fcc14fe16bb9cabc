//! Tour planning over the stargate graph.
//!
//! This crate exposes the full pipeline for routing a pilot through every
//! system worth visiting: seed the universe graph from the remote source (or
//! a cached snapshot), compute the all-pairs jump-distance matrix, project
//! the systems still worth visiting into a dense subproblem, emit it as a
//! TSPLIB instance for the LKH solver family, and map the resulting tour
//! back to systems.
//!
//! The typical workflow:
//!
//! 1. **Obtain a snapshot** with [`Snapshot::ensure`] (cached on disk per
//!    variant, rebuilt from the remote source on a miss).
//! 2. **Collect visited systems** from game logs via [`parse_visited_logs`].
//! 3. **Project the planning subset** with [`project`] and a
//!    [`SubsetFilter`].
//! 4. **Emit an instance** ([`write_tsp`], [`write_gtsp`], [`write_sop`])
//!    and drive the external solver through [`SolverRun`].
//! 5. **Import the tour** with [`read_tour`] and hand it to the output
//!    sink in [`autopilot`].
//!
//! Everything is single-threaded and blocking; the only suspension points
//! are disk and network IO and the solver subprocess.

#![deny(warnings)]

pub mod autopilot;
pub mod error;
pub mod matrix;
pub mod project;
pub mod reach;
pub mod snapshot;
pub mod solver;
pub mod sso;
pub mod tsplib;
pub mod universe;
pub mod visited;

pub use error::{Error, Result};
pub use matrix::{DistanceMatrix, UNREACHABLE};
pub use project::{project, Subset, SubsetFilter};
pub use snapshot::{Snapshot, System, SystemId, ROOT_SYSTEM};
pub use solver::{SolverKind, SolverRun, PARAMETER_FILE};
pub use sso::Session;
pub use tsplib::{read_tour, write_gtsp, write_sop, write_tsp, TourKind};
pub use universe::UniverseClient;
pub use visited::parse_visited_logs;
