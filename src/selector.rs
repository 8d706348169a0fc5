//! Interception target scoring and selection.
//!
//! Every decision epoch the ship scores each forecast typhoon by how long it
//! could expect to generate inside it versus how long it takes to get there:
//! `score = generation_h * weight - intercept_h * (100 - weight)`. A typhoon
//! only becomes a candidate if the ship can reach some forecast point no
//! later than `judge_time_times` times the typhoon's own arrival there.

use crate::forecast::Forecast;
use crate::geo::{self, LatLon};
use crate::track::{TrackRegistry, TyphoonId};

/// Climatological mean typhoon lifetime, used to extend the generation-time
/// estimate when a forecast track runs off the horizon without dissipating.
pub const MEAN_TYPHOON_LIFETIME_H: f64 = 120.0;

#[derive(Debug, Clone, Copy)]
pub struct SelectorConfig {
    /// 0..=100; weight on generation time versus intercept time.
    pub forecast_weight: f64,
    /// Reachability slack: ship arrival may lag typhoon arrival by this factor.
    pub judge_time_times: f64,
    pub typhoon_effective_range_km: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    pub typhoon: TyphoonId,
    pub score: f64,
    pub time_to_intercept_h: f64,
    pub estimated_generation_time_h: f64,
    pub intercept_point: LatLon,
    pub intercept_time_unix: i64,
}

pub fn score(forecast_weight: f64, generation_h: f64, intercept_h: f64) -> f64 {
    generation_h * forecast_weight - intercept_h * (100.0 - forecast_weight)
}

/// Highest score wins; ties fall to the lowest intercept time, then the
/// lowest typhoon id so repeated invocations agree exactly.
pub fn choose(mut candidates: Vec<Selection>) -> Option<Selection> {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                a.time_to_intercept_h
                    .partial_cmp(&b.time_to_intercept_h)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
            .then(a.typhoon.cmp(&b.typhoon))
    });
    candidates.into_iter().next()
}

pub fn select_target(
    cfg: &SelectorConfig,
    forecast: &Forecast,
    registry: &TrackRegistry,
    ship_position: LatLon,
    ship_speed_kt: f64,
) -> Option<Selection> {
    let mut candidates = Vec::new();
    for id in forecast.typhoons() {
        if let Some(candidate) = evaluate(cfg, forecast, registry, ship_position, ship_speed_kt, id)
        {
            candidates.push(candidate);
        }
    }
    choose(candidates)
}

/// Score one typhoon, or `None` when no forecast point passes the gate.
fn evaluate(
    cfg: &SelectorConfig,
    forecast: &Forecast,
    registry: &TrackRegistry,
    ship_position: LatLon,
    ship_speed_kt: f64,
    id: TyphoonId,
) -> Option<Selection> {
    let speed_kmh = geo::kt_to_kmh(ship_speed_kt);
    if speed_kmh <= 0.0 {
        return None;
    }
    let points: Vec<_> = forecast.track_of(id).collect();
    let last = points.last()?;

    // Earliest forecast point the ship can reach in time.
    let mut intercept = None;
    for p in &points {
        let gap_km =
            (geo::distance_km(ship_position, p.position) - cfg.typhoon_effective_range_km).max(0.0);
        let ship_arrival_h = (gap_km / speed_kmh).ceil();
        let typhoon_arrival_h = p.lead_hours;
        let passes = if typhoon_arrival_h <= 0.0 {
            ship_arrival_h <= 0.0
        } else {
            ship_arrival_h <= cfg.judge_time_times * typhoon_arrival_h
        };
        if passes {
            intercept = Some((*p, ship_arrival_h.max(typhoon_arrival_h)));
            break;
        }
    }
    let (point, time_to_intercept_h) = intercept?;

    let mut generation_h = last.lead_hours - point.lead_hours;
    if forecast.reaches_horizon(id) {
        // Not seen dissipating; extend by the expected remaining lifetime.
        if let Some(birth) = registry.get_track(id).and_then(|t| t.first_time()) {
            let age_at_horizon_h = (last.time_unix - birth) as f64 / 3600.0;
            generation_h += (MEAN_TYPHOON_LIFETIME_H - age_at_horizon_h).max(0.0);
        }
    }

    Some(Selection {
        typhoon: id,
        score: score(cfg.forecast_weight, generation_h, time_to_intercept_h),
        time_to_intercept_h,
        estimated_generation_time_h: generation_h,
        intercept_point: point.position,
        intercept_time_unix: point.time_unix,
    })
}
