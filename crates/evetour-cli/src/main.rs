use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use evetour_lib::{
    autopilot, parse_visited_logs, project, read_tour, sso, write_gtsp, write_sop, write_tsp,
    Snapshot, SolverKind, SolverRun, Subset, SubsetFilter, SystemId, TourKind, UniverseClient,
    PARAMETER_FILE,
};

/// Projected index→system-id mapping left behind for tour import.
const INDEX_MAP_FILE: &str = "matrixToSystemIds.json";

/// Tour file an out-of-band solver run leaves at the top level.
const STANDALONE_TOUR_FILE: &str = "output.tour";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Plan a minimal-jump tour through the star cluster"
)]
struct Cli {
    /// Only include systems in these regions (comma-separated, case-insensitive).
    #[arg(long, value_delimiter = ',')]
    regions: Vec<String>,

    /// Exclude systems in these regions (comma-separated, case-insensitive).
    #[arg(long = "skip-regions", value_delimiter = ',')]
    skip_regions: Vec<String>,

    /// Build and use the highsec-only snapshot variant.
    #[arg(long)]
    highsec: bool,

    /// Cluster candidates by region: order the regions first, then refine
    /// the tour through the sequential variant.
    #[arg(long)]
    gtsp: bool,

    /// Log in and bias the tour to start near the pilot's current system.
    #[arg(long)]
    start: bool,

    /// Only include systems with at least one station.
    #[arg(long)]
    stations: bool,

    /// Game log files to scan for already-visited systems.
    #[arg(value_name = "LOG")]
    logs: Vec<PathBuf>,
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let workdir = Path::new(".");

    let client = UniverseClient::from_env().context("failed to build the API client")?;
    let snapshot = Snapshot::ensure(workdir, &client, cli.highsec)
        .context("failed to prepare the universe snapshot")?;

    // Interactive login is only worth the browser round-trip when the pilot
    // asked to anchor the tour at their seat; the session then also feeds
    // the autopilot push. Login trouble never sinks the planning run.
    let session = if cli.start {
        match sso::login(&client) {
            Ok(session) => Some(session),
            Err(error) => {
                warn!(%error, "login failed; continuing without a session");
                None
            }
        }
    } else {
        None
    };

    // A tour left behind by an out-of-band solver run completes first.
    let standalone_tour = workdir.join(STANDALONE_TOUR_FILE);
    if standalone_tour.exists() {
        info!(file = %standalone_tour.display(), "importing existing tour");
        let tour = read_tour(&standalone_tour, TourKind::Plain)
            .context("failed to import the existing tour")?;
        let ids = Subset::load_ids(&workdir.join(INDEX_MAP_FILE))
            .context("failed to load the projected index mapping")?;
        let route = map_tour(&tour, &ids)?;
        return finish(&snapshot, &client, session.as_ref(), &route, workdir);
    }

    let visited = parse_visited_logs(&snapshot, &cli.logs)
        .context("failed to parse visited systems from the logs")?;
    info!(visited = visited.len(), "systems already traversed");

    let filter = SubsetFilter {
        regions: cli.regions.clone(),
        skip_regions: cli.skip_regions.clone(),
        only_with_stations: cli.stations,
        group_by_region: cli.gtsp,
    };
    let subset = project(&snapshot, &visited, &filter);
    if subset.ids.is_empty() {
        bail!("no systems left to route after filtering");
    }
    info!(candidates = subset.ids.len(), "projected planning subset");
    subset
        .store_ids(&workdir.join(INDEX_MAP_FILE))
        .context("failed to write the projected index mapping")?;

    let parameter_file = workdir.join(PARAMETER_FILE);
    if !parameter_file.exists() {
        bail!("solver parameter file {PARAMETER_FILE} not found");
    }

    let mut start_costs = session
        .as_ref()
        .map(|session| locate_start_costs(&client, &snapshot, &subset, session))
        .unwrap_or_default();

    if cli.gtsp {
        let anchor = solve_clustered(&subset, &parameter_file, workdir)?;
        if start_costs.is_none() {
            start_costs = anchor_costs(&snapshot, &subset, anchor);
        }
    }

    let route = if cli.gtsp || cli.start {
        let run = SolverRun::new(SolverKind::Lkh, workdir.join("solve-sop"))
            .context("failed to prepare the sequential solver directory")?;
        write_sop(
            &subset.matrix,
            start_costs.as_deref(),
            &run.instance_path("graph.sop"),
        )
        .context("failed to write the sequential instance")?;
        let tour_file = run.run(&parameter_file).context("sequential solver failed")?;
        let tour = read_tour(&tour_file, TourKind::Sop)
            .context("failed to import the sequential tour")?;
        map_tour(&tour, &subset.ids)?
    } else {
        let run = SolverRun::new(SolverKind::Lkh, workdir.join("solve-tsp"))
            .context("failed to prepare the solver directory")?;
        write_tsp(&subset.matrix, &run.instance_path("graph.tsp"))
            .context("failed to write the instance")?;
        let tour_file = run.run(&parameter_file).context("solver failed")?;
        let tour = read_tour(&tour_file, TourKind::Plain).context("failed to import the tour")?;
        map_tour(&tour, &subset.ids)?
    };

    finish(&snapshot, &client, session.as_ref(), &route, workdir)
}

/// Order the region clusters and return the subset index the winning tour
/// starts at, to anchor the sequential refinement.
fn solve_clustered(
    subset: &Subset,
    parameter_file: &Path,
    workdir: &Path,
) -> Result<Option<usize>> {
    let buckets = subset
        .buckets
        .as_deref()
        .context("clustered run without region buckets")?;
    let run = SolverRun::new(SolverKind::Glkh, workdir.join("solve-gtsp"))
        .context("failed to prepare the clustered solver directory")?;
    write_gtsp(&subset.matrix, buckets, &run.instance_path("graph.gtsp"))
        .context("failed to write the clustered instance")?;
    let tour_file = run.run(parameter_file).context("clustered solver failed")?;
    let tour =
        read_tour(&tour_file, TourKind::Plain).context("failed to import the clustered tour")?;
    info!(clusters = tour.len(), "region ordering complete");
    Ok(tour.first().copied())
}

/// Jump costs from the pilot's current system to every candidate, for the
/// fake-start row of the sequential instance.
fn locate_start_costs(
    client: &UniverseClient,
    snapshot: &Snapshot,
    subset: &Subset,
    session: &sso::Session,
) -> Option<Vec<u8>> {
    let location = match client.current_location(session) {
        Ok(location) => location,
        Err(error) => {
            warn!(%error, "could not resolve the pilot's location; starting anywhere");
            return None;
        }
    };
    let costs = costs_from(snapshot, subset, location);
    if costs.is_none() {
        warn!(location, "current system is outside the snapshot; starting anywhere");
    }
    costs
}

/// Jump costs from the first system of the cluster ordering.
fn anchor_costs(snapshot: &Snapshot, subset: &Subset, anchor: Option<usize>) -> Option<Vec<u8>> {
    let id = *subset.ids.get(anchor?)?;
    costs_from(snapshot, subset, id)
}

fn costs_from(snapshot: &Snapshot, subset: &Subset, from: SystemId) -> Option<Vec<u8>> {
    subset
        .ids
        .iter()
        .map(|&to| snapshot.distance(from, to))
        .collect()
}

/// Translate 0-based subset indices from a tour into system ids.
fn map_tour(tour: &[usize], ids: &[SystemId]) -> Result<Vec<SystemId>> {
    tour.iter()
        .map(|&index| {
            ids.get(index).copied().with_context(|| {
                format!(
                    "tour entry {index} is outside the projected subset of {}",
                    ids.len()
                )
            })
        })
        .collect()
}

fn finish(
    snapshot: &Snapshot,
    client: &UniverseClient,
    session: Option<&sso::Session>,
    route: &[SystemId],
    workdir: &Path,
) -> Result<()> {
    autopilot::write_route_names(snapshot, route, &workdir.join(autopilot::OUTPUT_FILE))
        .context("failed to write the route listing")?;
    if let Some(session) = session {
        autopilot::push_waypoints(client, session, route);
    }
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
