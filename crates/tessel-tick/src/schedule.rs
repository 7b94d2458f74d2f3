//! Ordered system lists.

use std::fmt;

use tessel_ecs::{DrawSystem, UpdateSystem, World};

/// The systems run each tick, in registration order.
///
/// `C` is the draw context handed to every draw system.
pub struct Schedule<C: ?Sized = ()> {
    updates: Vec<Box<dyn UpdateSystem>>,
    draws: Vec<Box<dyn DrawSystem<C>>>,
}

impl<C: ?Sized> Default for Schedule<C> {
    fn default() -> Self {
        Self {
            updates: Vec::new(),
            draws: Vec::new(),
        }
    }
}

impl<C: ?Sized> Schedule<C> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an update system.
    pub fn add_update(&mut self, system: impl UpdateSystem + 'static) -> &mut Self {
        tracing::debug!("scheduled update system `{}`", system.name());
        self.updates.push(Box::new(system));
        self
    }

    /// Append a draw system.
    pub fn add_draw(&mut self, system: impl DrawSystem<C> + 'static) -> &mut Self {
        tracing::debug!("scheduled draw system `{}`", system.name());
        self.draws.push(Box::new(system));
        self
    }

    #[must_use]
    pub fn update_count(&self) -> usize {
        self.updates.len()
    }

    #[must_use]
    pub fn draw_count(&self) -> usize {
        self.draws.len()
    }

    /// Run every update system once.
    pub fn update(&mut self, world: &mut World, delta: f64) {
        for system in &mut self.updates {
            let span = tracing::debug_span!("update", system = system.name());
            let _entered = span.enter();
            system.update(world, delta);
        }
    }

    /// Run every draw system once.
    pub fn draw(&mut self, world: &World, ctx: &mut C) {
        for system in &mut self.draws {
            let span = tracing::debug_span!("draw", system = system.name());
            let _entered = span.enter();
            system.draw(world, ctx);
        }
    }

    /// One full tick: updates, then draws, then exactly one refresh.
    pub fn tick(&mut self, world: &mut World, delta: f64, ctx: &mut C) {
        self.update(world, delta);
        self.draw(world, ctx);
        world.refresh();
    }
}

impl<C: ?Sized> fmt::Debug for Schedule<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schedule")
            .field(
                "updates",
                &self.updates.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field(
                "draws",
                &self.draws.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
