//! Headless arena simulation.
//!
//! This binary:
//! 1. Creates a world and scatters a few dwellers in it
//! 2. Schedules the arena systems
//! 3. Runs the fixed-timestep loop until the tick limit or until the arena
//!    is empty
//!
//! Configuration (environment):
//! - `TESSEL_TICK_RATE` - ticks per second (default 60)
//! - `TESSEL_MAX_TICKS` - ticks to run (default 120 here)
//! - `RUST_LOG` - extra tracing directives

mod components;
mod systems;

use tessel_ecs::World;
use tessel_tick::{Schedule, TickConfig, TickLoop};
use tracing::info;

use crate::systems::{
    ApplyDamage, Census, Escort, Hazard, Movement, Reaper, Report, Rng, Spawner, spawn_dweller,
};

const DEFAULT_MAX_TICKS: u64 = 120;
const INITIAL_DWELLERS: usize = 16;

fn main() -> eyre::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tessel_demo=info".parse()?)
                .add_directive("tessel_tick=info".parse()?),
        )
        .init();

    let mut config = TickConfig::from_env()?;
    if config.max_ticks().is_none() {
        config = config.with_max_ticks(Some(DEFAULT_MAX_TICKS));
    }

    info!("Starting arena");

    let mut world = World::with_capacity(256);
    let mut rng = Rng::new(0x5eed);
    for _ in 0..INITIAL_DWELLERS {
        spawn_dweller(&mut world, &mut rng);
    }

    let census_every = (config.tick_rate().round() as u64).max(1);
    let movement = Movement::new(&mut world);
    let hazard = Hazard::new(&mut world);
    let reaper = Reaper::new(&mut world);

    let mut schedule = Schedule::<Report>::new();
    schedule
        .add_update(Spawner::new(10, rng))
        .add_update(Escort)
        .add_update(movement)
        .add_update(hazard)
        .add_update(ApplyDamage)
        .add_update(reaper)
        .add_draw(Census::new(census_every));

    let mut report = Report::default();
    let mut tick_loop = TickLoop::new(config);
    let ran = tick_loop.run(&mut schedule, &mut world, &mut report, |world| {
        world.entity_count() == 0
    });

    info!(
        "Arena closed after {ran} ticks: {} alive, {} died, peak {}",
        world.entity_count(),
        report.deaths,
        report.peak_population
    );

    Ok(())
}
