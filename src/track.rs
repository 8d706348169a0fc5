//! Ground-truth typhoon track registry.
//!
//! Tracks are immutable once loaded and queried by unix time, either at a
//! recorded sample or linearly interpolated between neighbours. Queries
//! outside a track's recorded window return `None`; callers degrade to an
//! empty forecast rather than erroring.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::geo::LatLon;

pub type TyphoonId = u32;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrackSample {
    pub time_unix: i64,
    pub lat: f64,
    pub lon: f64,
    pub intensity_kt: f64,
}

impl TrackSample {
    pub fn position(&self) -> LatLon {
        LatLon::new(self.lat, self.lon)
    }
}

#[derive(Debug, Clone)]
pub struct TyphoonTrack {
    pub id: TyphoonId,
    samples: Vec<TrackSample>,
}

impl TyphoonTrack {
    /// Samples are sorted by time on construction; duplicate timestamps keep
    /// the later entry.
    pub fn new(id: TyphoonId, mut samples: Vec<TrackSample>) -> Self {
        samples.sort_by_key(|s| s.time_unix);
        samples.dedup_by_key(|s| s.time_unix);
        Self { id, samples }
    }

    pub fn samples(&self) -> &[TrackSample] {
        &self.samples
    }

    pub fn first_time(&self) -> Option<i64> {
        self.samples.first().map(|s| s.time_unix)
    }

    pub fn last_time(&self) -> Option<i64> {
        self.samples.last().map(|s| s.time_unix)
    }

    pub fn is_active(&self, time_unix: i64) -> bool {
        match (self.first_time(), self.last_time()) {
            (Some(first), Some(last)) => time_unix >= first && time_unix <= last,
            _ => false,
        }
    }

    /// State at `time_unix`, interpolated between bracketing samples.
    pub fn sample_at(&self, time_unix: i64) -> Option<TrackSample> {
        if !self.is_active(time_unix) {
            return None;
        }
        let idx = self.samples.partition_point(|s| s.time_unix <= time_unix);
        let before = &self.samples[idx - 1];
        match self.samples.get(idx) {
            None => Some(*before),
            Some(after) => {
                let span = (after.time_unix - before.time_unix) as f64;
                if span <= 0.0 {
                    return Some(*before);
                }
                let t = (time_unix - before.time_unix) as f64 / span;
                Some(TrackSample {
                    time_unix,
                    lat: before.lat + (after.lat - before.lat) * t,
                    lon: before.lon + (after.lon - before.lon) * t,
                    intensity_kt: before.intensity_kt
                        + (after.intensity_kt - before.intensity_kt) * t,
                })
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrackRegistry {
    tracks: BTreeMap<TyphoonId, TyphoonTrack>,
}

impl TrackRegistry {
    pub fn new(tracks: Vec<TyphoonTrack>) -> Self {
        Self {
            tracks: tracks.into_iter().map(|t| (t.id, t)).collect(),
        }
    }

    pub fn get_track(&self, id: TyphoonId) -> Option<&TyphoonTrack> {
        self.tracks.get(&id)
    }

    /// Ids of typhoons whose recorded window contains `time_unix`, in
    /// ascending id order.
    pub fn active(&self, time_unix: i64) -> Vec<TyphoonId> {
        self.tracks
            .values()
            .filter(|t| t.is_active(time_unix))
            .map(|t| t.id)
            .collect()
    }

    pub fn tracks(&self) -> impl Iterator<Item = &TyphoonTrack> {
        self.tracks.values()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track() -> TyphoonTrack {
        TyphoonTrack::new(
            2301,
            vec![
                TrackSample {
                    time_unix: 0,
                    lat: 20.0,
                    lon: 140.0,
                    intensity_kt: 60.0,
                },
                TrackSample {
                    time_unix: 3600,
                    lat: 21.0,
                    lon: 141.0,
                    intensity_kt: 70.0,
                },
            ],
        )
    }

    #[test]
    fn interpolates_between_samples() {
        let t = track();
        let mid = t.sample_at(1800).unwrap();
        assert!((mid.lat - 20.5).abs() < 1e-9);
        assert!((mid.intensity_kt - 65.0).abs() < 1e-9);
    }

    #[test]
    fn outside_window_is_none() {
        let t = track();
        assert!(t.sample_at(-1).is_none());
        assert!(t.sample_at(3601).is_none());
    }

    #[test]
    fn active_set_brackets_by_window() {
        let registry = TrackRegistry::new(vec![track()]);
        assert_eq!(registry.active(0), vec![2301]);
        assert!(registry.active(7200).is_empty());
    }
}
