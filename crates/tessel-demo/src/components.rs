//! Arena data types.
//!
//! Everything here is plain data so it can live in the world's byte stores.

use bytemuck::{Pod, Zeroable};
use tessel_ecs::Entity;

/// Half-width of the square arena. Anything outside takes damage.
pub const ARENA_HALF_WIDTH: f32 = 10.0;

// ============================================================================
// Components
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn is_outside_arena(self) -> bool {
        self.x.abs() > ARENA_HALF_WIDTH || self.y.abs() > ARENA_HALF_WIDTH
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Velocity {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Health(pub i32);

/// Marker: the entity ignores arena damage.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Shielded(pub u8);

// ============================================================================
// Messages
// ============================================================================

/// Damage dealt to one entity this tick.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Hit {
    target: u64,
    pub amount: u64,
}

impl Hit {
    pub const fn new(target: Entity, amount: u64) -> Self {
        Self {
            target: target.to_bits(),
            amount,
        }
    }

    pub const fn target(self) -> Entity {
        Entity::from_bits(self.target)
    }
}

/// An entity was removed from the arena this tick.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Died {
    entity: u64,
}

impl Died {
    pub const fn new(entity: Entity) -> Self {
        Self {
            entity: entity.to_bits(),
        }
    }

    pub const fn entity(self) -> Entity {
        Entity::from_bits(self.entity)
    }
}

// ============================================================================
// Relations
// ============================================================================

/// `(Escorts, guard, ward)`: the guard steers toward its ward.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Escorts {
    /// Fraction of the gap closed per second.
    pub pull: f32,
}
