//! Arena systems.
//!
//! Update order matters: spawn, steer, move, hurt, apply damage, reap. The
//! census draw system then sees every message sent during the tick.

use tessel_ecs::{DrawSystem, Entity, Query, UpdateSystem, World};

use crate::components::{Died, Escorts, Health, Hit, Position, Shielded, Velocity};

/// Small xorshift generator; the demo only needs repeatable scatter.
#[derive(Debug, Clone)]
pub struct Rng(u64);

impl Rng {
    pub const fn new(seed: u64) -> Self {
        // Zero is a fixed point of xorshift.
        Self(if seed == 0 { 0x9e37_79b9_7f4a_7c15 } else { seed })
    }

    fn next_u64(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }

    /// Uniform in `[lo, hi)`.
    pub fn range(&mut self, lo: f32, hi: f32) -> f32 {
        let unit = (self.next_u64() >> 40) as f32 / (1_u64 << 24) as f32;
        lo + unit * (hi - lo)
    }

    /// `true` with probability `1 / n`.
    pub fn one_in(&mut self, n: u64) -> bool {
        self.next_u64() % n == 0
    }
}

/// Create one arena dweller near the center.
pub fn spawn_dweller(world: &mut World, rng: &mut Rng) -> Entity {
    let entity = world.create_entity();
    world.add_component(
        entity,
        Position {
            x: rng.range(-5.0, 5.0),
            y: rng.range(-5.0, 5.0),
        },
    );
    world.add_component(
        entity,
        Velocity {
            x: rng.range(-4.0, 4.0),
            y: rng.range(-4.0, 4.0),
        },
    );
    world.add_component(entity, Health(3));
    if rng.one_in(4) {
        world.add_component(entity, Shielded(1));
    }
    entity
}

// ============================================================================
// Update systems
// ============================================================================

/// Adds a dweller every few ticks; every third one escorts the previous.
pub struct Spawner {
    every: u64,
    rng: Rng,
    last: Option<Entity>,
    spawned: u64,
}

impl Spawner {
    pub const fn new(every: u64, rng: Rng) -> Self {
        Self {
            every,
            rng,
            last: None,
            spawned: 0,
        }
    }
}

impl UpdateSystem for Spawner {
    fn update(&mut self, world: &mut World, _delta: f64) {
        if !world.tick().is_multiple_of(self.every) {
            return;
        }

        let entity = spawn_dweller(world, &mut self.rng);
        self.spawned += 1;

        if let Some(ward) = self.last.filter(|&ward| world.is_alive(ward)) {
            if self.spawned.is_multiple_of(3) {
                world.relate(entity, ward, Escorts { pull: 0.5 });
                tracing::debug!("{entity} escorts {ward}");
            }
        }
        self.last = Some(entity);
    }

    fn name(&self) -> &str {
        "spawner"
    }
}

/// Points every escort's velocity at its ward.
pub struct Escort;

impl UpdateSystem for Escort {
    fn update(&mut self, world: &mut World, _delta: f64) {
        let Some(table) = world.relation_table::<Escorts>() else {
            return;
        };

        let steering: Vec<(Entity, Velocity)> = table
            .iter::<Escorts>()
            .filter_map(|(pair, escort)| {
                let guard = world.try_component::<Position>(pair.from).ok()?;
                let ward = world.try_component::<Position>(pair.to).ok()?;
                Some((
                    pair.from,
                    Velocity {
                        x: (ward.x - guard.x) * escort.pull,
                        y: (ward.y - guard.y) * escort.pull,
                    },
                ))
            })
            .collect();

        for (guard, velocity) in steering {
            if let Ok(current) = world.try_component_mut::<Velocity>(guard) {
                *current = velocity;
            }
        }
    }

    fn name(&self) -> &str {
        "escort"
    }
}

/// Integrates velocity into position.
pub struct Movement {
    movers: Query,
}

impl Movement {
    pub fn new(world: &mut World) -> Self {
        Self {
            movers: world.query().with::<Position>().with::<Velocity>().build(),
        }
    }
}

impl UpdateSystem for Movement {
    fn update(&mut self, world: &mut World, delta: f64) {
        let dt = delta as f32;
        // Moving never changes structure, so indices stay valid.
        for i in 0..self.movers.len(world) {
            let entity = world.entities(self.movers)[i];
            let velocity = *world.component::<Velocity>(entity);
            let position = world.component_mut::<Position>(entity);
            position.x += velocity.x * dt;
            position.y += velocity.y * dt;
        }
    }

    fn name(&self) -> &str {
        "movement"
    }
}

/// Hurts every unshielded entity outside the arena.
pub struct Hazard {
    exposed: Query,
}

impl Hazard {
    pub fn new(world: &mut World) -> Self {
        Self {
            exposed: world.query().with::<Position>().without::<Shielded>().build(),
        }
    }
}

impl UpdateSystem for Hazard {
    fn update(&mut self, world: &mut World, _delta: f64) {
        let hits: Vec<Hit> = self
            .exposed
            .iter(world)
            .filter(|&e| world.component::<Position>(e).is_outside_arena())
            .map(|e| Hit::new(e, 1))
            .collect();

        for hit in hits {
            world.send_message(hit);
        }
    }

    fn name(&self) -> &str {
        "hazard"
    }
}

/// Subtracts every hit from its target's health.
pub struct ApplyDamage;

impl UpdateSystem for ApplyDamage {
    fn update(&mut self, world: &mut World, _delta: f64) {
        let hits = world.receive_all_messages::<Hit>().to_vec();
        for hit in hits {
            if let Ok(health) = world.try_component_mut::<Health>(hit.target()) {
                health.0 -= hit.amount as i32;
            }
        }
    }

    fn name(&self) -> &str {
        "apply_damage"
    }
}

/// Destroys everything out of health and announces it.
pub struct Reaper {
    mortal: Query,
}

impl Reaper {
    pub fn new(world: &mut World) -> Self {
        Self {
            mortal: world.query().with::<Health>().build(),
        }
    }
}

impl UpdateSystem for Reaper {
    fn update(&mut self, world: &mut World, _delta: f64) {
        for entity in self.mortal.to_vec(world) {
            if world.component::<Health>(entity).0 <= 0 {
                world.send_message(Died::new(entity));
                world.destroy(entity);
            }
        }
    }

    fn name(&self) -> &str {
        "reaper"
    }
}

// ============================================================================
// Draw systems
// ============================================================================

/// What the census has seen so far.
#[derive(Debug, Default)]
pub struct Report {
    pub deaths: u64,
    pub peak_population: u32,
}

/// Tallies deaths every tick and logs a summary every `every` ticks.
pub struct Census {
    every: u64,
}

impl Census {
    pub const fn new(every: u64) -> Self {
        Self { every }
    }
}

impl DrawSystem<Report> for Census {
    fn draw(&mut self, world: &World, report: &mut Report) {
        for died in world.receive_all_messages::<Died>() {
            tracing::debug!("{} died", died.entity());
        }
        report.deaths += world.receive_all_messages::<Died>().len() as u64;
        report.peak_population = report.peak_population.max(world.entity_count());

        if world.tick().is_multiple_of(self.every) {
            tracing::info!(
                "tick {}: {} alive, {} deaths so far",
                world.tick(),
                world.entity_count(),
                report.deaths
            );
        }
    }

    fn name(&self) -> &str {
        "census"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outsider_takes_damage_until_reaped() {
        let mut world = World::new();
        let mut hazard = Hazard::new(&mut world);
        let mut apply = ApplyDamage;
        let mut reaper = Reaper::new(&mut world);

        let outsider = world.create_entity();
        world.add_component(outsider, Position { x: 50.0, y: 0.0 });
        world.add_component(outsider, Health(2));

        let shielded = world.create_entity();
        world.add_component(shielded, Position { x: 50.0, y: 0.0 });
        world.add_component(shielded, Health(2));
        world.add_component(shielded, Shielded(1));

        let mut died = Vec::new();
        for _ in 0..2 {
            hazard.update(&mut world, 0.1);
            apply.update(&mut world, 0.1);
            reaper.update(&mut world, 0.1);
            died.extend(world.receive_all_messages::<Died>().iter().map(|d| d.entity()));
            world.refresh();
        }

        assert_eq!(died, vec![outsider]);
        assert!(!world.is_alive(outsider));
        assert_eq!(world.component::<Health>(shielded), &Health(2));
    }

    #[test]
    fn test_movement_integrates_velocity() {
        let mut world = World::new();
        let mut movement = Movement::new(&mut world);

        let e = world.create_entity();
        world.add_component(e, Position { x: 0.0, y: 0.0 });
        world.add_component(e, Velocity { x: 2.0, y: -1.0 });

        movement.update(&mut world, 0.5);

        assert_eq!(world.component::<Position>(e), &Position { x: 1.0, y: -0.5 });
    }

    #[test]
    fn test_escort_steers_toward_ward() {
        let mut world = World::new();
        let guard = world.create_entity();
        let ward = world.create_entity();
        world.add_component(guard, Position { x: 0.0, y: 0.0 });
        world.add_component(guard, Velocity { x: 0.0, y: 0.0 });
        world.add_component(ward, Position { x: 4.0, y: 2.0 });
        world.relate(guard, ward, Escorts { pull: 0.5 });

        Escort.update(&mut world, 0.1);

        assert_eq!(world.component::<Velocity>(guard), &Velocity { x: 2.0, y: 1.0 });
    }

    #[test]
    fn test_rng_range() {
        let mut rng = Rng::new(0);
        for _ in 0..100 {
            let v = rng.range(-1.0, 1.0);
            assert!((-1.0..1.0).contains(&v));
        }
    }
}
