use anyhow::Result;

use crate::{
    engine::{System, SystemContext},
    forecast::Forecaster,
    rng::SystemRng,
    world::World,
};

/// Issues a fresh forecast at the start of every tick; everything downstream
/// in the same tick reads this issuance.
pub struct ForecastSystem {
    forecaster: Forecaster,
}

impl ForecastSystem {
    pub fn new(forecaster: Forecaster) -> Self {
        Self { forecaster }
    }
}

impl System for ForecastSystem {
    fn name(&self) -> &str {
        "forecast"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        let step_seconds = (ctx.dt_hours * 3600.0) as i64;
        let issuance = self
            .forecaster
            .forecast(world.tracks(), ctx.time_unix, step_seconds);
        world.forecast = issuance;
        Ok(())
    }
}
