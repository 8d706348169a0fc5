use anyhow::Result;

use crate::{
    engine::{System, SystemContext},
    rng::SystemRng,
    world::World,
};

/// End-of-tick invariant sweep: every store is clamped into `0..=capacity`
/// and each breach is counted as a capacity violation.
pub struct BookkeepingSystem;

impl BookkeepingSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BookkeepingSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for BookkeepingSystem {
    fn name(&self) -> &str {
        "bookkeeping"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        let mut violations = world.ship.store.clamp_to_capacity();

        let base = &mut world.base;
        if base.storage_wh < -1e-9 || base.storage_wh > base.max_storage_wh + 1e-9 {
            violations += 1;
        }
        base.storage_wh = base.storage_wh.clamp(0.0, base.max_storage_wh);

        for shuttle in &mut world.support_ships {
            if shuttle.storage_wh < -1e-9 || shuttle.storage_wh > shuttle.capacity_wh + 1e-9 {
                violations += 1;
            }
            shuttle.storage_wh = shuttle.storage_wh.clamp(0.0, shuttle.capacity_wh);
        }

        if violations > 0 {
            eprintln!(
                "tick {}: clamped {} capacity violation(s)",
                ctx.tick, violations
            );
        }
        world.bookkeeping.capacity_violations += violations;
        Ok(())
    }
}
