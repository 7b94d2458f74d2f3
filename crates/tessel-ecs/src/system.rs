//! System traits.
//!
//! Systems are user logic run once per tick. They get the world for the
//! duration of the call only, so they may keep [`Query`](crate::Query)
//! handles and entity ids between ticks but never references into storage.
//!
//! Closures work as systems too:
//!
//! ```ignore
//! let mut gravity = |world: &mut World, delta: f64| {
//!     for e in falling.to_vec(world) {
//!         world.component_mut::<Velocity>(e).y -= 9.8 * delta as f32;
//!     }
//! };
//! gravity.update(&mut world, 1.0 / 60.0);
//! ```

use crate::World;

/// Logic that mutates the world once per tick.
pub trait UpdateSystem {
    fn update(&mut self, world: &mut World, delta: f64);

    /// Name used in logs and tracing spans.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<F> UpdateSystem for F
where
    F: FnMut(&mut World, f64),
{
    fn update(&mut self, world: &mut World, delta: f64) {
        self(world, delta);
    }
}

/// Logic that reads the world once per tick and renders into a context `C`.
///
/// The context is whatever the host draws into: a frame buffer, a text
/// sink, a batch of draw commands.
pub trait DrawSystem<C: ?Sized> {
    fn draw(&mut self, world: &World, ctx: &mut C);

    /// Name used in logs and tracing spans.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<C: ?Sized, F> DrawSystem<C> for F
where
    F: FnMut(&World, &mut C),
{
    fn draw(&mut self, world: &World, ctx: &mut C) {
        self(world, ctx);
    }
}

#[cfg(test)]
mod tests {
    use bytemuck::{Pod, Zeroable};

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct Counter(u32);

    struct Increment {
        entity: crate::Entity,
    }

    impl UpdateSystem for Increment {
        fn update(&mut self, world: &mut World, _delta: f64) {
            world.component_mut::<Counter>(self.entity).0 += 1;
        }
    }

    #[test]
    fn test_struct_system() {
        let mut world = World::new();
        let entity = world.create_entity();
        world.add_component(entity, Counter(0));

        let mut system = Increment { entity };
        system.update(&mut world, 0.0);
        system.update(&mut world, 0.0);

        assert_eq!(world.component::<Counter>(entity).0, 2);
        assert!(system.name().ends_with("Increment"));
    }

    #[test]
    fn test_closure_systems() {
        let mut world = World::new();
        let entity = world.create_entity();
        world.add_component(entity, Counter(0));

        let mut seen = 0.0;
        let mut step = |world: &mut World, delta: f64| {
            seen += delta;
            world.component_mut::<Counter>(entity).0 += 10;
        };
        step.update(&mut world, 0.5);

        let mut render = |world: &World, out: &mut Vec<u32>| {
            out.push(world.component::<Counter>(entity).0);
        };
        let mut frame = Vec::new();
        render.draw(&world, &mut frame);

        assert_eq!(frame, vec![10]);
        assert_eq!(seen, 0.5);
    }
}
