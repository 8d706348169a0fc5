use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::energy::{self, EnergyStore, StorageMedium};
use crate::forecast::Forecaster;
use crate::geo::LatLon;
use crate::track::{TrackRegistry, TrackSample, TyphoonTrack};
use crate::world::{ShipSpec, ShipState, StorageBase, SupportShip, SupportTask, TpgShip, World};

/// Rejected configuration; fatal at startup.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },
    #[error("{field} must be within 0..=100, got {value}")]
    Percentage { field: &'static str, value: f64 },
    #[error("{field} must be an efficiency in (0, 1], got {value}")]
    Efficiency { field: &'static str, value: f64 },
    #[error("typhoon {id} has no track samples")]
    EmptyTrack { id: u32 },
    #[error("simulation window is empty: end_time {end} is not after start_time {start}")]
    Window {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

fn default_dt_hours() -> f64 {
    6.0
}

fn default_snapshot_interval_ticks() -> u64 {
    24
}

fn default_forecast_time_hours() -> f64 {
    120.0
}

fn default_error_slope() -> f64 {
    4.0
}

fn default_typhoon_effective_range_km() -> f64 {
    50.0
}

fn default_govia_per() -> f64 {
    40.0
}

fn default_call_per() -> f64 {
    60.0
}

fn default_hull_num() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub description: Option<String>,
    pub seed: u64,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default = "default_dt_hours")]
    pub dt_hours: f64,
    #[serde(default)]
    pub ticks: Option<u64>,
    #[serde(default = "default_snapshot_interval_ticks")]
    pub snapshot_interval_ticks: u64,
    #[serde(default)]
    pub forecast: ForecastConfig,
    pub ship: ShipConfig,
    pub storage_base: StorageBaseConfig,
    pub supply_base: SupplyBaseConfig,
    pub support_ships: Vec<SupportShipConfig>,
    #[serde(default = "default_call_per")]
    pub call_per: f64,
    #[serde(default)]
    pub typhoons: Vec<TyphoonConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastConfig {
    #[serde(default = "default_forecast_time_hours")]
    pub time_hours: f64,
    #[serde(default = "default_error_slope")]
    pub error_slope_km_per_h: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            time_hours: default_forecast_time_hours(),
            error_slope_km_per_h: default_error_slope(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShipConfig {
    pub initial_position: LatLon,
    /// Where the ship loiters with no viable target; defaults to the base.
    #[serde(default)]
    pub standby_position: Option<LatLon>,
    pub max_speed_kt: f64,
    pub return_speed_kt: f64,
    #[serde(default = "default_hull_num")]
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
    #[serde(default = "default_typhoon_effective_range_km")]
    pub typhoon_effective_range_km: f64,
    #[serde(default = "default_govia_per")]
    pub govia_base_judge_energy_storage_per: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageBaseConfig {
    pub position: LatLon,
    pub max_storage_wh: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SupplyBaseConfig {
    pub position: LatLon,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SupportShipConfig {
    pub speed_kt: f64,
    pub capacity_wh: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TyphoonConfig {
    pub id: u32,
    pub samples: Vec<TyphoonSampleConfig>,
}

/// Track sample relative to the simulation start.
#[derive(Debug, Clone, Deserialize)]
pub struct TyphoonSampleConfig {
    pub offset_hours: f64,
    pub lat: f64,
    pub lon: f64,
    pub intensity_kt: f64,
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let scenario: Scenario = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(scenario)
    }
}

fn require_positive(field: &'static str, value: f64) -> Result<(), ScenarioError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ScenarioError::NonPositive { field, value })
    }
}

fn require_percentage(field: &'static str, value: f64) -> Result<(), ScenarioError> {
    if (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(ScenarioError::Percentage { field, value })
    }
}

fn require_efficiency(field: &'static str, value: f64) -> Result<(), ScenarioError> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ScenarioError::Efficiency { field, value })
    }
}

impl Scenario {
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if let Some(end) = self.end_time {
            if end <= self.start_time {
                return Err(ScenarioError::Window {
                    start: self.start_time,
                    end,
                });
            }
        }
        require_positive("dt_hours", self.dt_hours)?;
        require_positive("ship.max_speed_kt", self.ship.max_speed_kt)?;
        require_positive("ship.return_speed_kt", self.ship.return_speed_kt)?;
        require_positive("ship.max_storage_wh", self.ship.max_storage_wh)?;
        require_positive(
            "ship.electric_propulsion_max_storage_wh",
            self.ship.electric_propulsion_max_storage_wh,
        )?;
        require_positive("ship.generator_output_w", self.ship.generator_output_w)?;
        require_positive("storage_base.max_storage_wh", self.storage_base.max_storage_wh)?;
        require_efficiency("ship.elect_trust_efficiency", self.ship.elect_trust_efficiency)?;
        require_efficiency("ship.elect_to_mch_efficiency", self.ship.elect_to_mch_efficiency)?;
        require_efficiency("ship.mch_to_elect_efficiency", self.ship.mch_to_elect_efficiency)?;
        require_efficiency("ship.generator_efficiency", self.ship.generator_efficiency)?;
        require_percentage("ship.forecast_weight", self.ship.forecast_weight)?;
        require_percentage(
            "ship.govia_base_judge_energy_storage_per",
            self.ship.govia_base_judge_energy_storage_per,
        )?;
        require_percentage("call_per", self.call_per)?;
        require_positive("ship.judge_time_times", self.ship.judge_time_times)?;
        require_positive(
            "ship.typhoon_effective_range_km",
            self.ship.typhoon_effective_range_km,
        )?;
        for support in &self.support_ships {
            require_positive("support_ships.speed_kt", support.speed_kt)?;
            require_positive("support_ships.capacity_wh", support.capacity_wh)?;
        }
        for typhoon in &self.typhoons {
            if typhoon.samples.is_empty() {
                return Err(ScenarioError::EmptyTrack { id: typhoon.id });
            }
        }
        Ok(())
    }

    pub fn start_time_unix(&self) -> i64 {
        self.start_time.timestamp()
    }

    pub fn forecaster(&self) -> Forecaster {
        Forecaster::new(
            self.forecast.time_hours,
            self.forecast.error_slope_km_per_h,
            self.seed,
        )
    }

    pub fn build_world(&self) -> Result<World, ScenarioError> {
        self.validate()?;
        let start = self.start_time_unix();
        let tracks = TrackRegistry::new(
            self.typhoons
                .iter()
                .map(|t| {
                    TyphoonTrack::new(
                        t.id,
                        t.samples
                            .iter()
                            .map(|s| TrackSample {
                                time_unix: start + (s.offset_hours * 3600.0) as i64,
                                lat: s.lat,
                                lon: s.lon,
                                intensity_kt: s.intensity_kt,
                            })
                            .collect(),
                    )
                })
                .collect(),
        );

        let spec = ShipSpec {
            initial_position: self.ship.initial_position,
            standby_position: self
                .ship
                .standby_position
                .unwrap_or(self.storage_base.position),
            max_speed_kt: self.ship.max_speed_kt,
            return_speed_kt: self.ship.return_speed_kt,
            hull_num: self.ship.hull_num,
            storage_medium: self.ship.storage_medium,
            max_storage_wh: self.ship.max_storage_wh,
            electric_propulsion_max_storage_wh: self.ship.electric_propulsion_max_storage_wh,
            elect_trust_efficiency: self.ship.elect_trust_efficiency,
            elect_to_mch_efficiency: self.ship.elect_to_mch_efficiency,
            mch_to_elect_efficiency: self.ship.mch_to_elect_efficiency,
            generator_num: self.ship.generator_num,
            generator_output_w: self.ship.generator_output_w,
            generator_efficiency: self.ship.generator_efficiency,
            generator_drag_coefficient: self.ship.generator_drag_coefficient,
            generator_pillar_max_thickness_m: self.ship.generator_pillar_max_thickness_m,
            generator_pillar_width_m: self.ship.generator_pillar_width_m,
            forecast_weight: self.ship.forecast_weight,
            judge_time_times: self.ship.judge_time_times,
            typhoon_effective_range_km: self.ship.typhoon_effective_range_km,
            govia_base_judge_energy_storage_per: self.ship.govia_base_judge_energy_storage_per,
        };
        let max_speed_power_w = energy::max_speed_power_w(
            spec.storage_medium,
            spec.max_storage_wh,
            spec.electric_propulsion_max_storage_wh,
            spec.max_speed_kt,
            spec.hull_num,
        );
        let mut store = EnergyStore::new(spec.electric_propulsion_max_storage_wh, spec.max_storage_wh);
        store.recharge_electric_full();
        let ship = TpgShip {
            position: spec.initial_position,
            state: ShipState::Idle,
            store,
            max_speed_power_w,
            total_generated_wh: 0.0,
            total_delivered_wh: 0.0,
            spec,
        };

        let base = StorageBase {
            position: self.storage_base.position,
            storage_wh: 0.0,
            max_storage_wh: self.storage_base.max_storage_wh,
            total_received_wh: 0.0,
            total_shipped_wh: 0.0,
        };

        let support_ships = self
            .support_ships
            .iter()
            .enumerate()
            .map(|(index, cfg)| SupportShip {
                index,
                position: self.supply_base.position,
                speed_kt: cfg.speed_kt,
                storage_wh: 0.0,
                capacity_wh: cfg.capacity_wh,
                task: SupportTask::Idle,
                total_delivered_wh: 0.0,
            })
            .collect();

        Ok(World::new(
            start,
            self.dt_hours,
            tracks,
            ship,
            base,
            self.supply_base.position,
            support_ships,
        ))
    }

    /// Tick count priority: CLI override, explicit `ticks`, the
    /// `end_time` window, then a 120-tick fallback.
    pub fn ticks(&self, override_ticks: Option<u64>) -> u64 {
        if let Some(ticks) = override_ticks.or(self.ticks) {
            return ticks;
        }
        if let Some(end) = self.end_time {
            let span_h = (end - self.start_time).num_seconds() as f64 / 3600.0;
            return (span_h / self.dt_hours).ceil() as u64;
        }
        120
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_yaml() -> &'static str {
        r#"
name: test_run
seed: 11
start_time: 2023-08-01T00:00:00Z
ship:
  initial_position: { lat: 24.0, lon: 153.0 }
  max_speed_kt: 12.0
  return_speed_kt: 8.0
  storage_medium: mch
  max_storage_wh: 1.0e9
  electric_propulsion_max_storage_wh: 1.0e7
  elect_trust_efficiency: 0.9
  elect_to_mch_efficiency: 0.8
  mch_to_elect_efficiency: 0.45
  generator_num: 2
  generator_output_w: 6.0e5
  generator_efficiency: 0.9
  generator_drag_coefficient: 1.0
  generator_pillar_max_thickness_m: 0.6
  generator_pillar_width_m: 9.0
  forecast_weight: 30.0
  judge_time_times: 1.1
storage_base:
  position: { lat: 24.0, lon: 153.0 }
  max_storage_wh: 5.0e9
supply_base:
  position: { lat: 34.0, lon: 134.0 }
support_ships:
  - { speed_kt: 20.0, capacity_wh: 1.5e9 }
  - { speed_kt: 20.0, capacity_wh: 1.5e9 }
"#
    }

    #[test]
    fn minimal_scenario_builds_a_world() {
        let scenario: Scenario = serde_yaml::from_str(minimal_yaml()).expect("parse");
        assert_eq!(scenario.dt_hours, 6.0);
        assert_eq!(scenario.ship.typhoon_effective_range_km, 50.0);
        assert_eq!(scenario.ship.govia_base_judge_energy_storage_per, 40.0);
        let world = scenario.build_world().expect("valid");
        assert_eq!(world.support_ships().len(), 2);
        let ship = world.ship();
        assert!(ship.max_speed_power_w > 0.0);
        assert_eq!(ship.store.electric_wh, ship.store.electric_capacity_wh);
    }

    #[test]
    fn out_of_range_efficiency_is_fatal() {
        let mut scenario: Scenario = serde_yaml::from_str(minimal_yaml()).expect("parse");
        scenario.ship.elect_to_mch_efficiency = 1.4;
        let err = scenario.build_world().unwrap_err();
        assert!(matches!(err, ScenarioError::Efficiency { .. }));
    }

    #[test]
    fn negative_capacity_is_fatal() {
        let mut scenario: Scenario = serde_yaml::from_str(minimal_yaml()).expect("parse");
        scenario.storage_base.max_storage_wh = -1.0;
        let err = scenario.build_world().unwrap_err();
        assert!(matches!(err, ScenarioError::NonPositive { .. }));
    }

    #[test]
    fn inverted_window_is_fatal() {
        let mut scenario: Scenario = serde_yaml::from_str(minimal_yaml()).expect("parse");
        scenario.end_time = Some(scenario.start_time - chrono::Duration::hours(1));
        let err = scenario.build_world().unwrap_err();
        assert!(matches!(err, ScenarioError::Window { .. }));
    }

    #[test]
    fn window_derives_tick_count() {
        let mut scenario: Scenario = serde_yaml::from_str(minimal_yaml()).expect("parse");
        scenario.end_time = Some(scenario.start_time + chrono::Duration::days(30));
        // 720 h at 6 h per tick.
        assert_eq!(scenario.ticks(None), 120);
        assert_eq!(scenario.ticks(Some(5)), 5);
    }

    #[test]
    fn typhoon_samples_are_anchored_to_start_time() {
        let yaml = format!(
            "{}\ntyphoons:\n  - id: 2301\n    samples:\n      - {{ offset_hours: 0, lat: 20.0, lon: 140.0, intensity_kt: 60.0 }}\n      - {{ offset_hours: 6, lat: 20.5, lon: 140.5, intensity_kt: 65.0 }}\n",
            minimal_yaml()
        );
        let scenario: Scenario = serde_yaml::from_str(&yaml).expect("parse");
        let world = scenario.build_world().expect("valid");
        let track = world.tracks().get_track(2301).expect("track");
        assert_eq!(track.first_time(), Some(scenario.start_time_unix()));
        assert_eq!(
            track.last_time(),
            Some(scenario.start_time_unix() + 6 * 3600)
        );
    }
}
