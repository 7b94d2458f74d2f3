//! Fixed-timestep tick loop.

use std::time::Instant;

use tessel_ecs::World;

use crate::{config::TickConfig, schedule::Schedule};

/// Drives a [`Schedule`] at a fixed rate.
///
/// Every tick receives the same delta, `1 / tick_rate` seconds, regardless
/// of how long the previous tick took.
#[derive(Debug, Clone)]
pub struct TickLoop {
    config: TickConfig,
    ticks: u64,
}

impl TickLoop {
    #[must_use]
    pub const fn new(config: TickConfig) -> Self {
        Self { config, ticks: 0 }
    }

    #[must_use]
    pub const fn config(&self) -> &TickConfig {
        &self.config
    }

    /// Ticks completed so far.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Whether the configured tick limit was reached.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.config.max_ticks().is_some_and(|max| self.ticks >= max)
    }

    /// Run one tick immediately. Returns `false` once the limit is reached.
    pub fn step<C: ?Sized>(
        &mut self,
        schedule: &mut Schedule<C>,
        world: &mut World,
        ctx: &mut C,
    ) -> bool {
        if self.is_finished() {
            return false;
        }
        schedule.tick(world, self.config.delta(), ctx);
        self.ticks += 1;
        tracing::trace!("tick {} done", self.ticks);
        true
    }

    /// Run ticks back to back without sleeping until the limit is reached or
    /// `stop` returns `true`. Returns the number of ticks run.
    pub fn run_unpaced<C: ?Sized>(
        &mut self,
        schedule: &mut Schedule<C>,
        world: &mut World,
        ctx: &mut C,
        mut stop: impl FnMut(&World) -> bool,
    ) -> u64 {
        let start = self.ticks;
        while !stop(world) && self.step(schedule, world, ctx) {}
        self.ticks - start
    }

    /// Run at the configured rate until the limit is reached or `stop`
    /// returns `true`, sleeping out the remainder of each tick budget.
    ///
    /// With no tick limit and a `stop` that never fires this never returns.
    pub fn run<C: ?Sized>(
        &mut self,
        schedule: &mut Schedule<C>,
        world: &mut World,
        ctx: &mut C,
        mut stop: impl FnMut(&World) -> bool,
    ) -> u64 {
        let budget = self.config.tick_duration();
        let start_ticks = self.ticks;
        tracing::info!(
            "running at {} Hz ({:?} per tick, limit {:?})",
            self.config.tick_rate(),
            budget,
            self.config.max_ticks()
        );

        while !stop(world) {
            let start = Instant::now();
            if !self.step(schedule, world, ctx) {
                break;
            }

            let elapsed = start.elapsed();
            if elapsed < budget {
                std::thread::sleep(budget - elapsed);
            } else {
                tracing::warn!(
                    "tick {} overran its budget by {:?}",
                    self.ticks,
                    elapsed.saturating_sub(budget)
                );
            }
        }

        let ran = self.ticks - start_ticks;
        tracing::info!("stopped after {ran} ticks");
        ran
    }
}
