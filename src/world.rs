//! Simulation state: the TPG ship, the storage base, the two support
//! shuttles, and the ground-truth typhoon registry, advanced one tick at a
//! time by the systems.

use serde::{Deserialize, Serialize};

use crate::energy::{EnergyStore, StorageMedium};
use crate::forecast::Forecast;
use crate::geo::LatLon;
use crate::track::{TrackRegistry, TyphoonId};

/// Physical and decision parameters of the harvesting vessel, fixed for a
/// run once the scenario is loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipSpec {
    pub initial_position: LatLon,
    /// Loiter point when no typhoon is worth chasing.
    pub standby_position: LatLon,
    pub max_speed_kt: f64,
    pub return_speed_kt: f64,
    pub hull_num: u32,
    pub storage_medium: StorageMedium,
    pub max_storage_wh: f64,
    pub electric_propulsion_max_storage_wh: f64,
    pub elect_trust_efficiency: f64,
    pub elect_to_mch_efficiency: f64,
    pub mch_to_elect_efficiency: f64,
    pub generator_num: u32,
    pub generator_output_w: f64,
    pub generator_efficiency: f64,
    pub generator_drag_coefficient: f64,
    pub generator_pillar_max_thickness_m: f64,
    pub generator_pillar_width_m: f64,
    pub forecast_weight: f64,
    pub judge_time_times: f64,
    pub typhoon_effective_range_km: f64,
    pub govia_base_judge_energy_storage_per: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "target", rename_all = "snake_case")]
pub enum ShipState {
    Idle,
    Pursuing(TyphoonId),
    Generating(TyphoonId),
    ReturningToBase,
    AwaitingResupply,
}

impl ShipState {
    pub fn target(&self) -> Option<TyphoonId> {
        match self {
            ShipState::Pursuing(id) | ShipState::Generating(id) => Some(*id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TpgShip {
    pub spec: ShipSpec,
    pub position: LatLon,
    pub state: ShipState,
    pub store: EnergyStore,
    /// Precomputed from hull form and capacities at spawn.
    pub max_speed_power_w: f64,
    pub total_generated_wh: f64,
    pub total_delivered_wh: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageBase {
    pub position: LatLon,
    pub storage_wh: f64,
    pub max_storage_wh: f64,
    pub total_received_wh: f64,
    pub total_shipped_wh: f64,
}

impl StorageBase {
    pub fn percentage(&self) -> f64 {
        if self.max_storage_wh <= 0.0 {
            return 0.0;
        }
        self.storage_wh / self.max_storage_wh * 100.0
    }

    /// Accept energy up to capacity; the remainder stays with the sender.
    pub fn accept(&mut self, amount_wh: f64) -> f64 {
        let room = (self.max_storage_wh - self.storage_wh).max(0.0);
        let accepted = amount_wh.min(room);
        self.storage_wh += accepted;
        self.total_received_wh += accepted;
        amount_wh - accepted
    }

    pub fn withdraw(&mut self, amount_wh: f64) -> f64 {
        let taken = amount_wh.min(self.storage_wh).max(0.0);
        self.storage_wh -= taken;
        self.total_shipped_wh += taken;
        taken
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupportTask {
    Idle,
    SailingToPickup,
    SailingToSupply,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportShip {
    pub index: usize,
    pub position: LatLon,
    pub speed_kt: f64,
    pub storage_wh: f64,
    pub capacity_wh: f64,
    pub task: SupportTask,
    pub total_delivered_wh: f64,
}

/// Run-wide counters maintained by the bookkeeping system.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct BookkeepingState {
    pub curtailed_wh: f64,
    pub capacity_violations: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ShipSnapshot {
    pub lat: f64,
    pub lon: f64,
    pub state: ShipState,
    pub electric_wh: f64,
    pub mch_wh: f64,
    pub mch_percentage: f64,
    pub total_generated_wh: f64,
    pub total_delivered_wh: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BaseSnapshot {
    pub storage_wh: f64,
    pub percentage: f64,
    pub total_received_wh: f64,
    pub total_shipped_wh: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SupportShipSnapshot {
    pub index: usize,
    pub lat: f64,
    pub lon: f64,
    pub task: SupportTask,
    pub storage_wh: f64,
    pub total_delivered_wh: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub scenario: String,
    pub tick: u64,
    pub time_unix: i64,
    pub active_typhoons: Vec<TyphoonId>,
    pub ship: ShipSnapshot,
    pub base: BaseSnapshot,
    pub support_ships: Vec<SupportShipSnapshot>,
    pub curtailed_wh: f64,
    pub capacity_violations: u32,
}

#[derive(Debug)]
pub struct World {
    tick: u64,
    time_unix: i64,
    dt_hours: f64,
    pub(crate) tracks: TrackRegistry,
    pub(crate) forecast: Forecast,
    pub(crate) ship: TpgShip,
    pub(crate) base: StorageBase,
    pub(crate) supply_base_position: LatLon,
    pub(crate) support_ships: Vec<SupportShip>,
    pub(crate) bookkeeping: BookkeepingState,
}

impl World {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        start_time_unix: i64,
        dt_hours: f64,
        tracks: TrackRegistry,
        ship: TpgShip,
        base: StorageBase,
        supply_base_position: LatLon,
        support_ships: Vec<SupportShip>,
    ) -> Self {
        Self {
            tick: 0,
            time_unix: start_time_unix,
            dt_hours,
            tracks,
            forecast: Forecast::default(),
            ship,
            base,
            supply_base_position,
            support_ships,
            bookkeeping: BookkeepingState::default(),
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn time_unix(&self) -> i64 {
        self.time_unix
    }

    pub fn dt_hours(&self) -> f64 {
        self.dt_hours
    }

    pub fn advance_time(&mut self) {
        self.tick += 1;
        self.time_unix += (self.dt_hours * 3600.0) as i64;
    }

    pub fn ship(&self) -> &TpgShip {
        &self.ship
    }

    pub fn base(&self) -> &StorageBase {
        &self.base
    }

    pub fn support_ships(&self) -> &[SupportShip] {
        &self.support_ships
    }

    pub fn tracks(&self) -> &TrackRegistry {
        &self.tracks
    }

    pub fn forecast(&self) -> &Forecast {
        &self.forecast
    }

    pub fn bookkeeping(&self) -> &BookkeepingState {
        &self.bookkeeping
    }

    pub fn snapshot(&self, scenario: &str) -> WorldSnapshot {
        WorldSnapshot {
            scenario: scenario.to_string(),
            tick: self.tick,
            time_unix: self.time_unix,
            active_typhoons: self.tracks.active(self.time_unix),
            ship: ShipSnapshot {
                lat: self.ship.position.lat,
                lon: self.ship.position.lon,
                state: self.ship.state,
                electric_wh: self.ship.store.electric_wh,
                mch_wh: self.ship.store.mch_wh,
                mch_percentage: self.ship.store.mch_percentage(),
                total_generated_wh: self.ship.total_generated_wh,
                total_delivered_wh: self.ship.total_delivered_wh,
            },
            base: BaseSnapshot {
                storage_wh: self.base.storage_wh,
                percentage: self.base.percentage(),
                total_received_wh: self.base.total_received_wh,
                total_shipped_wh: self.base.total_shipped_wh,
            },
            support_ships: self
                .support_ships
                .iter()
                .map(|s| SupportShipSnapshot {
                    index: s.index,
                    lat: s.position.lat,
                    lon: s.position.lon,
                    task: s.task,
                    storage_wh: s.storage_wh,
                    total_delivered_wh: s.total_delivered_wh,
                })
                .collect(),
            curtailed_wh: self.bookkeeping.curtailed_wh,
            capacity_violations: self.bookkeeping.capacity_violations,
        }
    }
}
