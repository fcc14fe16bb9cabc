use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::info;

use crate::error::{Error, Result};

/// Name the shared parameter file keeps in every working directory.
pub const PARAMETER_FILE: &str = "graph.par";

/// Tour file the solver is expected to leave behind.
const TOUR_FILE: &str = "output.tour";

/// Which external solver binary consumes the instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverKind {
    /// Plain and sequential-ordering instances.
    Lkh,
    /// Clustered instances.
    Glkh,
}

impl SolverKind {
    fn default_binary(self) -> &'static str {
        match self {
            SolverKind::Lkh => "LKH",
            SolverKind::Glkh => "GLKH",
        }
    }

    fn env_override(self) -> &'static str {
        match self {
            SolverKind::Lkh => "EVETOUR_LKH",
            SolverKind::Glkh => "EVETOUR_GLKH",
        }
    }

    /// Resolve the binary: env override first, then PATH lookup by name.
    pub fn binary(self) -> PathBuf {
        env::var_os(self.env_override())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(self.default_binary()))
    }
}

/// One solver invocation over a dedicated working directory.
///
/// The directory is assumed exclusive to this process. The caller writes the
/// instance file into it (via [`SolverRun::instance_path`]) before calling
/// [`SolverRun::run`].
#[derive(Debug)]
pub struct SolverRun {
    kind: SolverKind,
    workdir: PathBuf,
}

impl SolverRun {
    pub fn new(kind: SolverKind, workdir: impl Into<PathBuf>) -> Result<Self> {
        let workdir = workdir.into();
        fs::create_dir_all(&workdir)?;
        Ok(Self { kind, workdir })
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Where to write an instance file for this run.
    pub fn instance_path(&self, file_name: &str) -> PathBuf {
        self.workdir.join(file_name)
    }

    /// Copy the shared parameter file in, run the solver over it, and return
    /// the path of the tour it produced. A nonzero exit is fatal and carries
    /// the solver's stderr.
    pub fn run(&self, parameter_file: &Path) -> Result<PathBuf> {
        fs::copy(parameter_file, self.workdir.join(PARAMETER_FILE))?;

        let binary = self.kind.binary();
        info!(
            binary = %binary.display(),
            workdir = %self.workdir.display(),
            "running solver"
        );
        let output = Command::new(&binary)
            .arg(PARAMETER_FILE)
            .current_dir(&self.workdir)
            .output()?;

        if !output.status.success() {
            return Err(Error::SolverFailed {
                binary: binary.display().to_string(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(self.workdir.join(TOUR_FILE))
    }
}
