use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::snapshot::{Snapshot, SystemId, FILE_BUF_CAPACITY};
use crate::sso::Session;
use crate::universe::UniverseClient;

/// Default name for the ordered route listing.
pub const OUTPUT_FILE: &str = "output.txt";

/// Floor (and starting value) for the waypoint push backoff.
const MIN_BACKOFF: Duration = Duration::from_secs(1);

/// Write the route as one system name per line, in tour order.
pub fn write_route_names(snapshot: &Snapshot, route: &[SystemId], path: &Path) -> Result<()> {
    let mut writer = BufWriter::with_capacity(FILE_BUF_CAPACITY, File::create(path)?);
    for &id in route {
        let name = snapshot
            .system_name(id)
            .ok_or(Error::UnknownSystemId { id })?;
        writeln!(writer, "{name}")?;
    }
    writer.flush()?;
    info!(file = %path.display(), hops = route.len(), "route listing written");
    Ok(())
}

/// Queue the route on the in-game autopilot, one waypoint per hop.
///
/// The first hop clears whatever route was queued before; later hops append.
/// Failures are never fatal here: the hop is skipped with a warning and the
/// delay doubles, easing back toward the floor on success.
pub fn push_waypoints(client: &UniverseClient, session: &Session, route: &[SystemId]) {
    let mut backoff = MIN_BACKOFF;
    for (hop, &system) in route.iter().enumerate() {
        match client.set_waypoint(session, system, hop == 0) {
            Ok(()) => backoff = (backoff / 2).max(MIN_BACKOFF),
            Err(error) => {
                warn!(system, %error, "waypoint push failed; skipping hop");
                backoff *= 2;
            }
        }
        thread::sleep(backoff);
    }
    info!(hops = route.len(), "route handed to the autopilot");
}
