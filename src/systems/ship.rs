//! Behavioral state machine of the harvesting vessel.
//!
//! One call per tick: decide (or re-decide) the target, move, generate, and
//! book energy flows. Powered pursuit draws from the electric store and
//! degrades speed when the draw falls short; the return leg is sailed and
//! costs nothing; generation itself consumes no stored energy.

use anyhow::Result;

use crate::{
    energy,
    engine::{System, SystemContext},
    geo::{self, LatLon},
    rng::SystemRng,
    selector::{self, Selection, SelectorConfig},
    track::TyphoonId,
    world::{ShipState, World},
};

/// Outcome of the port-call predicate on a storage percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortCall {
    Continue,
    DivertToBase,
}

/// A port call may stretch the leg by at most this factor before the bias
/// stops being "on the way".
const PORT_CALL_DETOUR_SLACK: f64 = 1.05;

/// Below the threshold the ship prefers routing via a base over continuing
/// direct pursuit. A biasing decision, not an unconditional return.
pub fn port_call_decision(storage_percentage: f64, threshold_per: f64) -> PortCall {
    if storage_percentage < threshold_per {
        PortCall::DivertToBase
    } else {
        PortCall::Continue
    }
}

pub struct ShipSystem;

impl ShipSystem {
    pub fn new() -> Self {
        Self
    }

    fn selector_config(world: &World) -> SelectorConfig {
        let spec = &world.ship().spec;
        SelectorConfig {
            forecast_weight: spec.forecast_weight,
            judge_time_times: spec.judge_time_times,
            typhoon_effective_range_km: spec.typhoon_effective_range_km,
        }
    }

    fn select(world: &World) -> Option<Selection> {
        selector::select_target(
            &Self::selector_config(world),
            world.forecast(),
            world.tracks(),
            world.ship().position,
            world.ship().spec.max_speed_kt,
        )
    }

    /// Typhoon center at `now`, ground truth.
    fn center(world: &World, id: TyphoonId, now: i64) -> Option<LatLon> {
        world
            .tracks()
            .get_track(id)
            .and_then(|t| t.sample_at(now))
            .map(|s| s.position())
    }

    fn within_range(world: &World, id: TyphoonId, now: i64) -> bool {
        match Self::center(world, id, now) {
            Some(center) => {
                geo::distance_km(world.ship().position, center)
                    <= world.ship().spec.typhoon_effective_range_km
            }
            None => false,
        }
    }

    /// Fall back when no typhoon is worth chasing: deliver what we carry,
    /// otherwise hold position.
    fn no_target_state(world: &World) -> ShipState {
        if world.ship().store.mch_wh > 0.0 {
            ShipState::ReturningToBase
        } else {
            ShipState::Idle
        }
    }

    fn idle(&self, world: &mut World, dt_hours: f64) {
        if world.ship.store.mch_is_full() {
            world.ship.state = ShipState::ReturningToBase;
            return;
        }
        if let Some(sel) = Self::select(world) {
            world.ship.state = ShipState::Pursuing(sel.typhoon);
            return;
        }
        // Nothing worth chasing: sail to the standby point and loiter.
        let standby = world.ship.spec.standby_position;
        let travel_km = geo::kt_to_kmh(world.ship.spec.return_speed_kt) * dt_hours;
        world.ship.position = geo::move_toward(world.ship.position, standby, travel_km);
    }

    fn pursue(&self, world: &mut World, now: i64, dt_hours: f64, current: TyphoonId) {
        if Self::within_range(world, current, now) {
            world.ship.state = ShipState::Generating(current);
            return;
        }

        // Re-decide every epoch; the chase switches when a better candidate
        // appears or the current one stops being viable.
        let sel = match Self::select(world) {
            Some(sel) => sel,
            None => {
                world.ship.state = Self::no_target_state(world);
                return;
            }
        };
        world.ship.state = ShipState::Pursuing(sel.typhoon);

        let spec = world.ship.spec.clone();
        let divert = port_call_decision(
            world.ship.store.mch_percentage(),
            spec.govia_base_judge_energy_storage_per,
        );
        if divert == PortCall::DivertToBase {
            // Bias, not an abort: take the port call only when the base lies
            // close enough to the direct route that the detour is nearly free.
            let to_base = geo::distance_km(world.ship.position, world.base.position);
            let via_base =
                to_base + geo::distance_km(world.base.position, sel.intercept_point);
            let direct = geo::distance_km(world.ship.position, sel.intercept_point);
            if to_base > 1.0 && via_base <= direct * PORT_CALL_DETOUR_SLACK {
                world.ship.state = ShipState::ReturningToBase;
                return;
            }
        }

        // No point sprinting past the intercept: cap the commanded speed at
        // what covers the remaining distance this tick.
        let remaining_km = geo::distance_km(world.ship.position, sel.intercept_point);
        let commanded_kt = (remaining_km / (geo::KT_TO_KMH * dt_hours)).min(spec.max_speed_kt);
        let required = energy::propulsion_work_wh(
            world.ship.max_speed_power_w,
            commanded_kt,
            spec.max_speed_kt,
            dt_hours,
            spec.elect_trust_efficiency,
        );
        let draw = world
            .ship
            .store
            .draw_propulsion(required, spec.mch_to_elect_efficiency);
        let achieved_kt = commanded_kt * draw.fraction;
        let travel_km = geo::kt_to_kmh(achieved_kt) * dt_hours;
        world.ship.position = geo::move_toward(world.ship.position, sel.intercept_point, travel_km);

        if Self::within_range(world, sel.typhoon, now) {
            world.ship.state = ShipState::Generating(sel.typhoon);
        }
    }

    fn generate(&self, world: &mut World, now: i64, dt_hours: f64, target: TyphoonId) {
        let center = match Self::center(world, target, now) {
            Some(c) => c,
            None => {
                // Dissipated under us.
                world.ship.state = match Self::select(world) {
                    Some(sel) => ShipState::Pursuing(sel.typhoon),
                    None => Self::no_target_state(world),
                };
                return;
            }
        };
        if !Self::within_range(world, target, now) {
            world.ship.state = ShipState::Pursuing(target);
            return;
        }

        let spec = world.ship.spec.clone();
        let gross = energy::generation_wh(
            spec.generator_output_w,
            spec.generator_efficiency,
            spec.generator_num,
            dt_hours,
        );
        let outcome = world
            .ship
            .store
            .store_generation(gross, spec.elect_to_mch_efficiency);
        world.ship.total_generated_wh += gross;
        world.bookkeeping.curtailed_wh += outcome.curtailed_wh;

        if world.ship.store.mch_is_full() {
            world.ship.state = ShipState::ReturningToBase;
            return;
        }

        // Chase the center under pillar drag; wind-driven, no stored draw.
        let factor = energy::drag_speed_factor(
            spec.generator_drag_coefficient,
            spec.generator_pillar_max_thickness_m,
            spec.generator_pillar_width_m,
            spec.generator_num,
        );
        let travel_km = geo::kt_to_kmh(spec.max_speed_kt * factor) * dt_hours;
        world.ship.position = geo::move_toward(world.ship.position, center, travel_km);
    }

    fn return_leg(&self, world: &mut World, dt_hours: f64) {
        let travel_km = geo::kt_to_kmh(world.ship.spec.return_speed_kt) * dt_hours;
        let base_position = world.base.position;
        world.ship.position = geo::move_toward(world.ship.position, base_position, travel_km);
        if world.ship.position == base_position {
            world.ship.state = ShipState::AwaitingResupply;
        }
    }

    /// Atomic at-berth transfer: cargo the base cannot hold stays aboard.
    fn resupply(&self, world: &mut World) {
        let cargo = world.ship.store.take_mch();
        let rejected = world.base.accept(cargo);
        let kept = world.ship.store.accept_mch(rejected);
        debug_assert!(kept < 1e-6);
        world.ship.total_delivered_wh += cargo - rejected;
        world.ship.store.recharge_electric_full();
        world.ship.state = ShipState::Idle;
    }
}

impl Default for ShipSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for ShipSystem {
    fn name(&self) -> &str {
        "ship"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        match world.ship.state {
            ShipState::Idle => self.idle(world, ctx.dt_hours),
            ShipState::Pursuing(id) => self.pursue(world, ctx.time_unix, ctx.dt_hours, id),
            ShipState::Generating(id) => self.generate(world, ctx.time_unix, ctx.dt_hours, id),
            ShipState::ReturningToBase => self.return_leg(world, ctx.dt_hours),
            ShipState::AwaitingResupply => self.resupply(world),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::energy::{EnergyStore, StorageMedium};
    use crate::track::{TrackRegistry, TrackSample, TyphoonTrack};
    use crate::world::{ShipSpec, StorageBase, World};

    fn spec() -> ShipSpec {
        ShipSpec {
            initial_position: LatLon::new(24.0, 153.0),
            standby_position: LatLon::new(24.0, 153.0),
            max_speed_kt: 12.0,
            return_speed_kt: 8.0,
            hull_num: 1,
            storage_medium: StorageMedium::Mch,
            max_storage_wh: 1.0e9,
            electric_propulsion_max_storage_wh: 1.0e7,
            elect_trust_efficiency: 0.9,
            elect_to_mch_efficiency: 0.8,
            mch_to_elect_efficiency: 0.45,
            generator_num: 2,
            generator_output_w: 6.0e5,
            generator_efficiency: 0.9,
            generator_drag_coefficient: 1.0,
            generator_pillar_max_thickness_m: 0.6,
            generator_pillar_width_m: 9.0,
            forecast_weight: 30.0,
            judge_time_times: 1.1,
            typhoon_effective_range_km: 50.0,
            govia_base_judge_energy_storage_per: 40.0,
        }
    }

    fn world(state: ShipState, tracks: TrackRegistry) -> World {
        let spec = spec();
        let mut store =
            EnergyStore::new(spec.electric_propulsion_max_storage_wh, spec.max_storage_wh);
        store.recharge_electric_full();
        let ship = crate::world::TpgShip {
            position: spec.initial_position,
            state,
            store,
            max_speed_power_w: 1.0e6,
            total_generated_wh: 0.0,
            total_delivered_wh: 0.0,
            spec,
        };
        let base = StorageBase {
            position: LatLon::new(24.0, 153.0),
            storage_wh: 0.0,
            max_storage_wh: 1.0e12,
            total_received_wh: 0.0,
            total_shipped_wh: 0.0,
        };
        World::new(0, 6.0, tracks, ship, base, LatLon::new(34.0, 134.0), vec![])
    }

    fn overhead_typhoon() -> TrackRegistry {
        // Sits on top of the ship the whole time.
        TrackRegistry::new(vec![TyphoonTrack::new(
            1,
            (0..=8)
                .map(|h| TrackSample {
                    time_unix: h * 6 * 3600,
                    lat: 24.0,
                    lon: 153.0,
                    intensity_kt: 80.0,
                })
                .collect(),
        )])
    }

    #[test]
    fn below_threshold_activates_port_call() {
        assert_eq!(port_call_decision(39.0, 40.0), PortCall::DivertToBase);
        assert_eq!(port_call_decision(40.0, 40.0), PortCall::Continue);
        assert_eq!(port_call_decision(95.0, 40.0), PortCall::Continue);
    }

    fn static_typhoon_at(lat: f64, lon: f64) -> TrackRegistry {
        TrackRegistry::new(vec![TyphoonTrack::new(
            1,
            (0..=8)
                .map(|h| TrackSample {
                    time_unix: h * 6 * 3600,
                    lat,
                    lon,
                    intensity_kt: 80.0,
                })
                .collect(),
        )])
    }

    fn issue_forecast(world: &mut World) {
        let issuance =
            crate::forecast::Forecaster::new(120.0, 0.0, 1).forecast(world.tracks(), 0, 21600);
        world.forecast = issuance;
    }

    #[test]
    fn port_call_diverts_when_base_is_en_route() {
        // Base sits between the ship and the intercept; cargo hold nearly
        // empty, so the below-threshold branch is active.
        let mut world = world(ShipState::Pursuing(1), static_typhoon_at(26.0, 153.0));
        world.ship.position = LatLon::new(22.5, 153.0);
        world.ship.store.mch_wh = 0.05 * world.ship.store.mch_capacity_wh;
        issue_forecast(&mut world);
        ShipSystem::new().pursue(&mut world, 0, 6.0, 1);
        assert_eq!(world.ship().state, ShipState::ReturningToBase);
    }

    #[test]
    fn port_call_does_not_strand_a_ship_at_its_base() {
        // Same empty hold, but the ship is already berthed: the bias must not
        // keep it pinned there.
        let mut world = world(ShipState::Pursuing(1), static_typhoon_at(26.0, 153.0));
        world.ship.store.mch_wh = 0.0;
        issue_forecast(&mut world);
        ShipSystem::new().pursue(&mut world, 0, 6.0, 1);
        assert_eq!(world.ship().state, ShipState::Pursuing(1));
        assert!(world.ship().position.lat > 24.0);
    }

    #[test]
    fn healthy_stores_keep_the_direct_course() {
        let mut world = world(ShipState::Pursuing(1), static_typhoon_at(26.0, 153.0));
        world.ship.position = LatLon::new(22.5, 153.0);
        world.ship.store.mch_wh = 0.5 * world.ship.store.mch_capacity_wh;
        issue_forecast(&mut world);
        ShipSystem::new().pursue(&mut world, 0, 6.0, 1);
        assert_eq!(world.ship().state, ShipState::Pursuing(1));
    }

    #[test]
    fn pursuing_in_range_switches_to_generating() {
        let mut world = world(ShipState::Pursuing(1), overhead_typhoon());
        ShipSystem::new().pursue(&mut world, 0, 6.0, 1);
        assert_eq!(world.ship().state, ShipState::Generating(1));
    }

    #[test]
    fn generating_banks_energy_and_counts_curtailment() {
        let mut world = world(ShipState::Generating(1), overhead_typhoon());
        // Full battery, one last sliver of MCH room: most of the tick's
        // 6.48e6 Wh gross has nowhere to go and must be counted, not lost.
        world.ship.store.mch_wh = world.ship.store.mch_capacity_wh - 1.0e6;
        let before = world.ship().store.electric_wh + world.ship().store.mch_wh;
        ShipSystem::new().generate(&mut world, 0, 6.0, 1);
        let after = world.ship().store.electric_wh + world.ship().store.mch_wh;
        assert!((after - before - 1.0e6).abs() < 1e-3);
        assert!((world.ship().total_generated_wh - 6.48e6).abs() < 1e-3);
        assert!(world.bookkeeping().curtailed_wh > 0.0);
        assert!(world.ship().store.mch_wh <= world.ship().store.mch_capacity_wh);
    }

    #[test]
    fn full_store_triggers_return() {
        let mut world = world(ShipState::Generating(1), overhead_typhoon());
        world.ship.store.mch_wh = world.ship.store.mch_capacity_wh;
        ShipSystem::new().generate(&mut world, 0, 6.0, 1);
        assert_eq!(world.ship().state, ShipState::ReturningToBase);
    }

    #[test]
    fn dissipation_with_no_alternative_heads_home() {
        let mut world = world(ShipState::Generating(1), overhead_typhoon());
        world.ship.store.mch_wh = 1.0e8;
        // Query past the end of the track: the typhoon is gone.
        ShipSystem::new().generate(&mut world, 100 * 3600, 6.0, 1);
        assert_eq!(world.ship().state, ShipState::ReturningToBase);
    }

    #[test]
    fn idle_without_targets_sails_to_standby() {
        let mut world = world(ShipState::Idle, TrackRegistry::default());
        world.ship.position = LatLon::new(25.0, 153.0);
        let system = ShipSystem::new();
        for _ in 0..3 {
            system.idle(&mut world, 6.0);
        }
        assert_eq!(world.ship().state, ShipState::Idle);
        assert_eq!(world.ship().position, world.ship().spec.standby_position);
    }

    #[test]
    fn resupply_transfers_cargo_and_recharges() {
        let mut world = world(ShipState::AwaitingResupply, TrackRegistry::default());
        world.ship.store.mch_wh = 7.5e8;
        world.ship.store.electric_wh = 0.0;
        ShipSystem::new().resupply(&mut world);
        assert_eq!(world.ship().state, ShipState::Idle);
        assert_eq!(world.ship().store.mch_wh, 0.0);
        assert_eq!(
            world.ship().store.electric_wh,
            world.ship().store.electric_capacity_wh
        );
        assert!((world.base().storage_wh - 7.5e8).abs() < 1e-3);
        assert!((world.ship().total_delivered_wh - 7.5e8).abs() < 1e-3);
    }

    #[test]
    fn overflow_at_a_full_base_stays_aboard() {
        let mut world = world(ShipState::AwaitingResupply, TrackRegistry::default());
        world.base.storage_wh = world.base.max_storage_wh - 1.0e8;
        world.ship.store.mch_wh = 7.5e8;
        ShipSystem::new().resupply(&mut world);
        assert!((world.ship().store.mch_wh - 6.5e8).abs() < 1e-3);
        assert!((world.ship().total_delivered_wh - 1.0e8).abs() < 1e-3);
        assert!((world.base().storage_wh - world.base().max_storage_wh).abs() < 1e-3);
    }

    #[test]
    fn return_leg_arrives_and_awaits_resupply() {
        let mut world = world(ShipState::ReturningToBase, TrackRegistry::default());
        world.ship.position = LatLon::new(24.5, 153.0);
        let system = ShipSystem::new();
        system.return_leg(&mut world, 6.0);
        assert_eq!(world.ship().state, ShipState::AwaitingResupply);
        assert_eq!(world.ship().position, world.base().position);
    }
}
