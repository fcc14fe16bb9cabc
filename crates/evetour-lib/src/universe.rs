use std::collections::HashMap;
use std::env;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::reach::HIGHSEC_THRESHOLD;
use crate::snapshot::{System, SystemId};
use crate::sso::Session;

/// Public game API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://esi.evetech.net";

/// Environment override for the API endpoint, mainly for tests.
const BASE_URL_ENV: &str = "EVETOUR_ESI_URL";

/// Hard deadline carried by every request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct SystemRecord {
    name: String,
    constellation_id: u32,
    security_status: f32,
    #[serde(default)]
    stations: Vec<u32>,
    #[serde(default)]
    stargates: Vec<u32>,
}

#[derive(Debug, Deserialize)]
struct ConstellationRecord {
    region_id: u32,
}

#[derive(Debug, Deserialize)]
struct RegionRecord {
    name: String,
}

#[derive(Debug, Deserialize)]
struct StargateRecord {
    destination: StargateDestination,
}

#[derive(Debug, Deserialize)]
struct StargateDestination {
    system_id: u32,
}

#[derive(Debug, Deserialize)]
struct LocationRecord {
    solar_system_id: u32,
}

/// Blocking client for the game API.
///
/// The upstream throttles bursty callers, and multiplexed connections make
/// that worse, so the transport pins HTTP/1.1 and every request carries a
/// 10-second deadline. All ingest traffic is strictly serial.
#[derive(Debug, Clone)]
pub struct UniverseClient {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl UniverseClient {
    /// Build a client against the default endpoint, or the `EVETOUR_ESI_URL`
    /// override when set.
    pub fn from_env() -> Result<Self> {
        let base_url = env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(base_url)
    }

    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .http1_only()
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn http(&self) -> &reqwest::blocking::Client {
        &self.http
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.http.get(&url).send()?;
        if !response.status().is_success() {
            return Err(Error::UpstreamStatus {
                url,
                status: response.status(),
            });
        }
        Ok(response.json()?)
    }

    /// Fetch every system and its stargate adjacency from the remote source.
    ///
    /// Transient per-entity failures are parked in a retry queue and the
    /// queue re-drained; a pass that shrinks nothing aborts the ingest.
    pub fn fetch_universe(
        &self,
        only_highsec: bool,
    ) -> Result<(HashMap<SystemId, System>, HashMap<SystemId, Vec<SystemId>>)> {
        let mut nodes = HashMap::new();
        let mut edges = HashMap::new();

        let mut pending: Vec<SystemId> = self.get_json("/v1/universe/systems/")?;
        info!(systems = pending.len(), "seeding the universe graph");

        let mut constellation_regions: HashMap<u32, u32> = HashMap::new();
        let mut region_names: HashMap<u32, String> = HashMap::new();

        while !pending.is_empty() {
            let mut failed = Vec::new();
            for (done, &id) in pending.iter().enumerate() {
                if done % 500 == 0 {
                    info!(done, total = pending.len(), "fetching systems");
                }
                let outcome = self.ingest_system(
                    id,
                    only_highsec,
                    &mut nodes,
                    &mut edges,
                    &mut constellation_regions,
                    &mut region_names,
                );
                match outcome {
                    Ok(()) => {}
                    Err(error) if error.is_transient() => {
                        warn!(system = id, %error, "fetch failed; will retry");
                        failed.push(id);
                    }
                    Err(error) => return Err(error),
                }
            }
            if failed.len() >= pending.len() {
                return Err(Error::IngestStalled {
                    pending: failed.len(),
                });
            }
            pending = failed;
        }

        Ok((nodes, edges))
    }

    /// Ingest one system and its stargates. Nothing is committed to the maps
    /// until every lookup for the system has succeeded, so a retried system
    /// never leaves half of its edges behind.
    fn ingest_system(
        &self,
        id: SystemId,
        only_highsec: bool,
        nodes: &mut HashMap<SystemId, System>,
        edges: &mut HashMap<SystemId, Vec<SystemId>>,
        constellation_regions: &mut HashMap<u32, u32>,
        region_names: &mut HashMap<u32, String>,
    ) -> Result<()> {
        let record: SystemRecord = self.get_json(&format!("/v4/universe/systems/{id}/"))?;

        if only_highsec && record.security_status < HIGHSEC_THRESHOLD {
            return Ok(());
        }

        let region_id = match constellation_regions.get(&record.constellation_id) {
            Some(&region_id) => region_id,
            None => {
                let constellation: ConstellationRecord = self.get_json(&format!(
                    "/v1/universe/constellations/{}/",
                    record.constellation_id
                ))?;
                constellation_regions.insert(record.constellation_id, constellation.region_id);
                constellation.region_id
            }
        };

        let region = match region_names.get(&region_id) {
            Some(name) => name.clone(),
            None => {
                let region: RegionRecord =
                    self.get_json(&format!("/v1/universe/regions/{region_id}/"))?;
                region_names.insert(region_id, region.name.clone());
                region.name
            }
        };

        let mut pending = record.stargates;
        let mut destinations = Vec::with_capacity(pending.len());
        while !pending.is_empty() {
            let mut failed = Vec::new();
            for &stargate in &pending {
                match self.get_json::<StargateRecord>(&format!("/v1/universe/stargates/{stargate}/"))
                {
                    Ok(gate) => destinations.push(gate.destination.system_id),
                    Err(error) if error.is_transient() => {
                        warn!(system = id, stargate, %error, "stargate fetch failed; will retry");
                        failed.push(stargate);
                    }
                    Err(error) => return Err(error),
                }
            }
            if failed.len() >= pending.len() {
                return Err(Error::IngestStalled {
                    pending: failed.len(),
                });
            }
            pending = failed;
        }

        nodes.insert(
            id,
            System {
                name: record.name,
                region,
                stations: record.stations,
                security_status: record.security_status,
            },
        );
        edges.insert(id, destinations);
        Ok(())
    }

    /// Solar system the logged-in character is currently in.
    pub fn current_location(&self, session: &Session) -> Result<SystemId> {
        let url = format!(
            "{}/v2/characters/{}/location/",
            self.base_url, session.character_id
        );
        let response = self
            .http
            .get(&url)
            .bearer_auth(&session.access_token)
            .send()?;
        if !response.status().is_success() {
            return Err(Error::UpstreamStatus {
                url,
                status: response.status(),
            });
        }
        let location: LocationRecord = response.json()?;
        Ok(location.solar_system_id)
    }

    /// Append one waypoint to the in-game autopilot route. The first hop of
    /// a tour passes `clear_route` to wipe whatever was queued before.
    pub fn set_waypoint(
        &self,
        session: &Session,
        destination: SystemId,
        clear_route: bool,
    ) -> Result<()> {
        let url = format!(
            "{}/v2/ui/autopilot/waypoint/?add_to_beginning=false&clear_other_waypoints={clear_route}&destination_id={destination}",
            self.base_url
        );
        let response = self
            .http
            .post(&url)
            .bearer_auth(&session.access_token)
            .send()?;
        if response.status() != reqwest::StatusCode::NO_CONTENT {
            return Err(Error::UpstreamStatus {
                url,
                status: response.status(),
            });
        }
        Ok(())
    }
}
