use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use stormharvest::{
    engine::{EngineBuilder, EngineSettings},
    scenario::ScenarioLoader,
    systems::{BookkeepingSystem, ForecastSystem, LogisticsSystem, ShipSystem},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Typhoon power-generation fleet simulator")]
struct Cli {
    /// Path to the scenario YAML file
    #[arg(long, default_value = "scenarios/typhoon_season.yaml")]
    scenario: PathBuf,

    /// Override tick count (uses scenario default when omitted)
    #[arg(long)]
    ticks: Option<u64>,

    /// Override snapshot interval in ticks
    #[arg(long)]
    snapshot_interval: Option<u64>,

    /// Directory for snapshots
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let loader = ScenarioLoader::new(".");
    let scenario = loader.load(&cli.scenario)?;
    let mut world = scenario.build_world()?;
    let ticks = scenario.ticks(cli.ticks);
    let snapshot_interval = cli
        .snapshot_interval
        .unwrap_or(scenario.snapshot_interval_ticks);
    let snapshot_dir = cli
        .snapshot_dir
        .unwrap_or_else(|| PathBuf::from("snapshots"));

    let settings = EngineSettings {
        scenario_name: scenario.name.clone(),
        seed: scenario.seed,
        snapshot_interval_ticks: snapshot_interval,
        snapshot_dir,
    };

    let mut engine = EngineBuilder::new(settings)
        .with_system(ForecastSystem::new(scenario.forecaster()))
        .with_system(ShipSystem::new())
        .with_system(LogisticsSystem::new(scenario.call_per))
        .with_system(BookkeepingSystem::new())
        .build();

    engine.run(&mut world, ticks)?;
    println!(
        "Scenario '{}' completed for {} ticks. Generated {:.0} Wh, delivered {:.0} Wh to base, {:.0} Wh shuttled onward.",
        scenario.name,
        ticks,
        world.ship().total_generated_wh,
        world.ship().total_delivered_wh,
        world
            .support_ships()
            .iter()
            .map(|s| s.total_delivered_wh)
            .sum::<f64>()
    );
    Ok(())
}
