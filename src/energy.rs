//! Energy generation, storage-medium conversion, and propulsion consumption.
//!
//! Two media share a hull: a propulsion battery (`electric_wh`) and the bulk
//! methylcyclohexane store (`mch_wh`). Every operation clamps to capacity and
//! degrades instead of erroring: generation that finds both stores full is
//! curtailed, propulsion that finds the battery short converts MCH on demand
//! and, failing that, reports the achieved fraction so the caller slows down.

use serde::{Deserialize, Serialize};

/// Bulk storage medium carried by a hull; sets the deadweight and the hull
/// resistance constant of the power law.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageMedium {
    Battery,
    Mch,
}

impl StorageMedium {
    /// Deadweight tonnes needed to carry `capacity_wh` in this medium.
    /// Battery assumes 1000 Wh/kg cells; MCH stores 5 kWh per kg of released
    /// hydrogen at the 0.0898/47.4 hydride mass ratio.
    pub fn deadweight_t(self, capacity_wh: f64) -> f64 {
        match self {
            StorageMedium::Battery => capacity_wh / 1000.0 / 1000.0,
            StorageMedium::Mch => capacity_wh / 5000.0 * 0.0898 / 47.4,
        }
    }

    /// Admiralty-style hull constant: bulker form for battery ships, tanker
    /// form for MCH carriers.
    pub fn hull_constant(self) -> f64 {
        match self {
            StorageMedium::Battery => 1.7,
            StorageMedium::Mch => 2.2,
        }
    }
}

/// Power needed to push the hull at `max_speed_kt`:
/// `k * dwt^(2/3) * v^3 * hulls`.
pub fn max_speed_power_w(
    medium: StorageMedium,
    mch_capacity_wh: f64,
    electric_capacity_wh: f64,
    max_speed_kt: f64,
    hull_num: u32,
) -> f64 {
    let dwt = medium.deadweight_t(mch_capacity_wh)
        + StorageMedium::Battery.deadweight_t(electric_capacity_wh);
    medium.hull_constant() * dwt.powf(2.0 / 3.0) * max_speed_kt.powi(3) * hull_num as f64
}

/// Electric energy a powered transit leg needs for one tick. Cubic in the
/// speed ratio, divided by the drive-train efficiency.
pub fn propulsion_work_wh(
    max_speed_power_w: f64,
    speed_kt: f64,
    max_speed_kt: f64,
    dt_hours: f64,
    trust_efficiency: f64,
) -> f64 {
    if max_speed_kt <= 0.0 || speed_kt <= 0.0 {
        return 0.0;
    }
    let ratio = (speed_kt / max_speed_kt).max(0.0);
    max_speed_power_w * ratio.powi(3) * dt_hours / trust_efficiency.max(f64::EPSILON)
}

/// Gross generator output for one tick of riding inside a typhoon.
pub fn generation_wh(
    generator_output_w: f64,
    generator_efficiency: f64,
    generator_num: u32,
    dt_hours: f64,
) -> f64 {
    generator_output_w * generator_efficiency * generator_num as f64 * dt_hours
}

/// Speed multiplier while the generator pillars are deployed. Divisor form
/// keeps the factor in (0, 1] and strictly decreasing in every drag input.
pub fn drag_speed_factor(
    drag_coefficient: f64,
    pillar_max_thickness_m: f64,
    pillar_width_m: f64,
    generator_num: u32,
) -> f64 {
    const REFERENCE_AREA_M2: f64 = 100.0;
    let frontal = (pillar_max_thickness_m * pillar_width_m).max(0.0) * generator_num as f64;
    1.0 / (1.0 + drag_coefficient.max(0.0) * frontal / REFERENCE_AREA_M2)
}

/// Where one tick of gross generation ended up.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GenerationOutcome {
    pub to_electric_wh: f64,
    pub to_mch_wh: f64,
    pub curtailed_wh: f64,
}

/// Result of a propulsion draw; `fraction` scales the achieved speed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropulsionDraw {
    pub delivered_wh: f64,
    pub from_mch_wh: f64,
    pub fraction: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergyStore {
    pub electric_wh: f64,
    pub mch_wh: f64,
    pub electric_capacity_wh: f64,
    pub mch_capacity_wh: f64,
}

impl EnergyStore {
    pub fn new(electric_capacity_wh: f64, mch_capacity_wh: f64) -> Self {
        Self {
            electric_wh: 0.0,
            mch_wh: 0.0,
            electric_capacity_wh,
            mch_capacity_wh,
        }
    }

    pub fn mch_percentage(&self) -> f64 {
        if self.mch_capacity_wh <= 0.0 {
            return 0.0;
        }
        self.mch_wh / self.mch_capacity_wh * 100.0
    }

    pub fn mch_is_full(&self) -> bool {
        self.mch_wh >= self.mch_capacity_wh - 1e-6
    }

    /// Book gross generation: battery first, overflow converted to MCH,
    /// residual curtailed. Never exceeds either capacity.
    pub fn store_generation(&mut self, gross_wh: f64, elect_to_mch_eff: f64) -> GenerationOutcome {
        if gross_wh <= 0.0 {
            return GenerationOutcome::default();
        }
        let to_electric = gross_wh.min(self.electric_capacity_wh - self.electric_wh).max(0.0);
        self.electric_wh += to_electric;

        let overflow = gross_wh - to_electric;
        let convertible = overflow * elect_to_mch_eff.clamp(0.0, 1.0);
        let to_mch = convertible.min(self.mch_capacity_wh - self.mch_wh).max(0.0);
        self.mch_wh += to_mch;

        // Curtailment is counted in raw generated Wh, before conversion loss.
        let absorbed_raw = if elect_to_mch_eff > 0.0 {
            to_mch / elect_to_mch_eff
        } else {
            0.0
        };
        GenerationOutcome {
            to_electric_wh: to_electric,
            to_mch_wh: to_mch,
            curtailed_wh: (overflow - absorbed_raw).max(0.0),
        }
    }

    /// Take `required_wh` for propulsion: battery first, then MCH converted
    /// at `mch_to_elect_eff`. Returns the achieved fraction; never negative,
    /// never an error.
    pub fn draw_propulsion(&mut self, required_wh: f64, mch_to_elect_eff: f64) -> PropulsionDraw {
        if required_wh <= 0.0 {
            return PropulsionDraw {
                delivered_wh: 0.0,
                from_mch_wh: 0.0,
                fraction: 1.0,
            };
        }
        let from_battery = required_wh.min(self.electric_wh);
        self.electric_wh -= from_battery;

        let mut from_mch = 0.0;
        let mut converted = 0.0;
        let shortfall = required_wh - from_battery;
        if shortfall > 0.0 && mch_to_elect_eff > 0.0 {
            from_mch = (shortfall / mch_to_elect_eff).min(self.mch_wh);
            self.mch_wh -= from_mch;
            converted = from_mch * mch_to_elect_eff;
        }
        let delivered = from_battery + converted;
        PropulsionDraw {
            delivered_wh: delivered,
            from_mch_wh: from_mch,
            fraction: (delivered / required_wh).clamp(0.0, 1.0),
        }
    }

    /// Remove the whole bulk store, e.g. to hand it to a base. The caller
    /// decides how much the receiver accepts and returns the rest via
    /// [`EnergyStore::accept_mch`].
    pub fn take_mch(&mut self) -> f64 {
        let out = self.mch_wh;
        self.mch_wh = 0.0;
        out
    }

    /// Accept MCH up to capacity; returns the rejected remainder.
    pub fn accept_mch(&mut self, amount_wh: f64) -> f64 {
        let room = (self.mch_capacity_wh - self.mch_wh).max(0.0);
        let accepted = amount_wh.min(room);
        self.mch_wh += accepted;
        amount_wh - accepted
    }

    pub fn recharge_electric_full(&mut self) {
        self.electric_wh = self.electric_capacity_wh;
    }

    /// Defensive invariant clamp; returns how many bounds were breached.
    pub fn clamp_to_capacity(&mut self) -> u32 {
        let mut violations = 0;
        if self.electric_wh < -1e-9 || self.electric_wh > self.electric_capacity_wh + 1e-9 {
            violations += 1;
        }
        if self.mch_wh < -1e-9 || self.mch_wh > self.mch_capacity_wh + 1e-9 {
            violations += 1;
        }
        self.electric_wh = self.electric_wh.clamp(0.0, self.electric_capacity_wh);
        self.mch_wh = self.mch_wh.clamp(0.0, self.mch_capacity_wh);
        violations
    }
}
