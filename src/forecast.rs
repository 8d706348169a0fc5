//! Forecast issuance with a linear-in-lead-time positional error.
//!
//! A forecast is an ephemeral view over the ground-truth registry: at lead
//! zero it reproduces the truth exactly, and each later point is displaced
//! from the truth by `error_slope_km_per_h * lead_hours` along a bearing
//! fixed per typhoon for the whole run. Re-issuing at the same time yields
//! the identical forecast.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::geo::{self, LatLon};
use crate::track::{TrackRegistry, TyphoonId};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub typhoon: TyphoonId,
    pub time_unix: i64,
    pub position: LatLon,
    pub intensity_kt: f64,
    pub lead_hours: f64,
    pub error_radius_km: f64,
}

/// One issuance: every active typhoon's forecast track up to the horizon.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Forecast {
    pub issued_at: i64,
    pub step_seconds: i64,
    pub horizon_hours: f64,
    points: Vec<ForecastPoint>,
}

impl Forecast {
    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    pub fn track_of(&self, id: TyphoonId) -> impl Iterator<Item = &ForecastPoint> {
        self.points.iter().filter(move |p| p.typhoon == id)
    }

    /// Typhoon ids present in this issuance, ascending and unique.
    pub fn typhoons(&self) -> Vec<TyphoonId> {
        let mut ids: Vec<TyphoonId> = self.points.iter().map(|p| p.typhoon).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Whether `id`'s forecast track runs all the way to the horizon, i.e.
    /// the typhoon is not seen dissipating within this issuance.
    pub fn reaches_horizon(&self, id: TyphoonId) -> bool {
        let step_h = self.step_seconds as f64 / 3600.0;
        self.track_of(id)
            .last()
            .map(|p| p.lead_hours + step_h > self.horizon_hours - 1e-9)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone)]
pub struct Forecaster {
    pub horizon_hours: f64,
    pub error_slope_km_per_h: f64,
    seed: u64,
}

impl Forecaster {
    pub fn new(horizon_hours: f64, error_slope_km_per_h: f64, seed: u64) -> Self {
        Self {
            horizon_hours,
            error_slope_km_per_h,
            seed,
        }
    }

    /// Displacement bearing for one typhoon, fixed for the run so repeated
    /// issuances agree where their leads overlap.
    fn error_bearing_deg(&self, id: TyphoonId) -> f64 {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed.wrapping_add(id as u64));
        rng.gen_range(0.0..360.0)
    }

    /// Issue a forecast at `now`. Points stop at the horizon or at the last
    /// recorded track sample, whichever comes first; a typhoon with no data
    /// at `now` simply contributes nothing.
    pub fn forecast(&self, registry: &TrackRegistry, now: i64, step_seconds: i64) -> Forecast {
        let mut points = Vec::new();
        let horizon_end = now + (self.horizon_hours * 3600.0) as i64;
        for id in registry.active(now) {
            let track = match registry.get_track(id) {
                Some(t) => t,
                None => continue,
            };
            let bearing = self.error_bearing_deg(id);
            let mut t = now;
            while t <= horizon_end {
                let sample = match track.sample_at(t) {
                    Some(s) => s,
                    None => break,
                };
                let lead_hours = (t - now) as f64 / 3600.0;
                let error_radius_km = self.error_slope_km_per_h * lead_hours;
                points.push(ForecastPoint {
                    typhoon: id,
                    time_unix: t,
                    position: geo::destination(sample.position(), bearing, error_radius_km),
                    intensity_kt: sample.intensity_kt,
                    lead_hours,
                    error_radius_km,
                });
                t += step_seconds;
            }
        }
        Forecast {
            issued_at: now,
            step_seconds,
            horizon_hours: self.horizon_hours,
            points,
        }
    }
}
