//! Support-ship shuttle cycles between the storage base and the supply base.
//!
//! A shuttle idles at the supply base until the storage base has banked at
//! least `call_per`% of the shuttle's capacity, sails to the storage base to
//! load, and sails back to deliver. Both shuttles run cycles independently;
//! cargo already promised to an inbound shuttle is not counted twice when
//! deciding the next dispatch.

use anyhow::Result;

use crate::{
    engine::{System, SystemContext},
    geo,
    rng::SystemRng,
    world::{SupportTask, World},
};

pub struct LogisticsSystem {
    /// Dispatch threshold as a percentage of a shuttle's capacity.
    call_per: f64,
}

impl LogisticsSystem {
    pub fn new(call_per: f64) -> Self {
        Self { call_per }
    }

    fn advance_voyages(&self, world: &mut World, dt_hours: f64) {
        let base_position = world.base.position;
        let supply_position = world.supply_base_position;
        for i in 0..world.support_ships.len() {
            let (task, speed_kt, position) = {
                let s = &world.support_ships[i];
                (s.task, s.speed_kt, s.position)
            };
            let travel_km = geo::kt_to_kmh(speed_kt) * dt_hours;
            match task {
                SupportTask::Idle => {}
                SupportTask::SailingToPickup => {
                    let next = geo::move_toward(position, base_position, travel_km);
                    world.support_ships[i].position = next;
                    if next == base_position {
                        let room = (world.support_ships[i].capacity_wh
                            - world.support_ships[i].storage_wh)
                            .max(0.0);
                        let loaded = world.base.withdraw(room);
                        world.support_ships[i].storage_wh += loaded;
                        world.support_ships[i].task = SupportTask::SailingToSupply;
                    }
                }
                SupportTask::SailingToSupply => {
                    let next = geo::move_toward(position, supply_position, travel_km);
                    world.support_ships[i].position = next;
                    if next == supply_position {
                        let delivered = world.support_ships[i].storage_wh;
                        world.support_ships[i].storage_wh = 0.0;
                        world.support_ships[i].total_delivered_wh += delivered;
                        world.support_ships[i].task = SupportTask::Idle;
                    }
                }
            }
        }
    }

    fn dispatch(&self, world: &mut World) {
        let base_position = world.base.position;
        // Cargo already claimed by shuttles sailing in for pickup.
        let mut reserved_wh: f64 = world
            .support_ships
            .iter()
            .filter(|s| s.task == SupportTask::SailingToPickup)
            .map(|s| (s.capacity_wh - s.storage_wh).max(0.0))
            .sum();

        loop {
            let available = world.base.storage_wh - reserved_wh;
            // Idle shuttle with the shortest ETA; ties fall to the index.
            let candidate = world
                .support_ships
                .iter()
                .filter(|s| s.task == SupportTask::Idle)
                .filter(|s| available >= s.capacity_wh * self.call_per / 100.0)
                .min_by(|a, b| {
                    let eta_a = geo::distance_km(a.position, base_position) / a.speed_kt.max(1e-9);
                    let eta_b = geo::distance_km(b.position, base_position) / b.speed_kt.max(1e-9);
                    eta_a
                        .partial_cmp(&eta_b)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then(a.index.cmp(&b.index))
                })
                .map(|s| s.index);
            let Some(index) = candidate else { break };
            let ship = world
                .support_ships
                .iter_mut()
                .find(|s| s.index == index)
                .expect("dispatched shuttle exists");
            ship.task = SupportTask::SailingToPickup;
            reserved_wh += (ship.capacity_wh - ship.storage_wh).max(0.0);
        }
    }
}

impl System for LogisticsSystem {
    fn name(&self) -> &str {
        "logistics"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        self.advance_voyages(world, ctx.dt_hours);
        self.dispatch(world);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::energy::{EnergyStore, StorageMedium};
    use crate::geo::LatLon;
    use crate::track::TrackRegistry;
    use crate::world::{ShipSpec, ShipState, StorageBase, SupportShip, TpgShip};

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

    fn world_with_base_storage(storage_wh: f64, shuttles: Vec<SupportShip>) -> World {
        let spec = spec();
        let ship = TpgShip {
            position: spec.initial_position,
            state: ShipState::Idle,
            store: EnergyStore::new(
                spec.electric_propulsion_max_storage_wh,
                spec.max_storage_wh,
            ),
            max_speed_power_w: 1.0e6,
            total_generated_wh: 0.0,
            total_delivered_wh: 0.0,
            spec,
        };
        let base = StorageBase {
            position: LatLon::new(24.0, 153.0),
            storage_wh,
            max_storage_wh: 1.0e12,
            total_received_wh: 0.0,
            total_shipped_wh: 0.0,
        };
        World::new(
            0,
            6.0,
            TrackRegistry::default(),
            ship,
            base,
            LatLon::new(34.0, 134.0),
            shuttles,
        )
    }

    fn shuttle(index: usize, position: LatLon) -> SupportShip {
        SupportShip {
            index,
            position,
            speed_kt: 20.0,
            storage_wh: 0.0,
            capacity_wh: 1.0e9,
            task: SupportTask::Idle,
            total_delivered_wh: 0.0,
        }
    }

    #[test]
    fn no_dispatch_below_threshold() {
        // 59% of a 1e9 Wh shuttle with call_per 60.
        let mut world =
            world_with_base_storage(5.9e8, vec![shuttle(0, LatLon::new(34.0, 134.0))]);
        LogisticsSystem::new(60.0).dispatch(&mut world);
        assert_eq!(world.support_ships()[0].task, SupportTask::Idle);
    }

    #[test]
    fn reservation_prevents_double_dispatch() {
        let supply = LatLon::new(34.0, 134.0);
        let mut world =
            world_with_base_storage(1.1e9, vec![shuttle(0, supply), shuttle(1, supply)]);
        LogisticsSystem::new(60.0).dispatch(&mut world);
        // One shuttle's full load is spoken for; 0.1e9 left is under threshold.
        assert_eq!(world.support_ships()[0].task, SupportTask::SailingToPickup);
        assert_eq!(world.support_ships()[1].task, SupportTask::Idle);
    }

    #[test]
    fn both_idle_ties_break_by_index() {
        let supply = LatLon::new(34.0, 134.0);
        let mut world =
            world_with_base_storage(2.0e9, vec![shuttle(0, supply), shuttle(1, supply)]);
        LogisticsSystem::new(60.0).dispatch(&mut world);
        assert_eq!(world.support_ships()[0].task, SupportTask::SailingToPickup);
        assert_eq!(world.support_ships()[1].task, SupportTask::SailingToPickup);
    }

    #[test]
    fn closer_shuttle_wins_dispatch() {
        let near = LatLon::new(25.0, 153.0);
        let far = LatLon::new(34.0, 134.0);
        let mut world = world_with_base_storage(1.0e9, vec![shuttle(0, far), shuttle(1, near)]);
        LogisticsSystem::new(60.0).dispatch(&mut world);
        assert_eq!(world.support_ships()[0].task, SupportTask::Idle);
        assert_eq!(world.support_ships()[1].task, SupportTask::SailingToPickup);
    }

    #[test]
    fn pickup_and_delivery_round_trip() {
        // Shuttle starts one short hop from the base, already dispatched.
        let mut world = world_with_base_storage(4.0e8, vec![shuttle(0, LatLon::new(24.2, 153.0))]);
        world.support_ships[0].task = SupportTask::SailingToPickup;
        let system = LogisticsSystem::new(60.0);

        system.advance_voyages(&mut world, 6.0);
        assert_eq!(world.support_ships()[0].task, SupportTask::SailingToSupply);
        assert!((world.support_ships()[0].storage_wh - 4.0e8).abs() < 1e-3);
        assert_eq!(world.base().storage_wh, 0.0);

        // Long sail home, then everything is handed over at the supply base.
        for _ in 0..20 {
            system.advance_voyages(&mut world, 6.0);
        }
        assert_eq!(world.support_ships()[0].task, SupportTask::Idle);
        assert_eq!(world.support_ships()[0].storage_wh, 0.0);
        assert!((world.support_ships()[0].total_delivered_wh - 4.0e8).abs() < 1e-3);
    }
}
