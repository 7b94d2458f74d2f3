//! Contract-violation errors.
//!
//! Every variant describes a programmer error: a system touched data that a
//! query or `has_*` check should have ruled out. The panicking accessors on
//! [`World`](crate::World) format these errors; the `try_*` twins return them.

use thiserror::Error;

use crate::entity::Entity;

/// Error raised when a caller breaks the access contract of the world.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EcsError {
    /// The entity does not carry the requested component.
    #[error("entity {entity} has no `{name}` component")]
    MissingComponent {
        entity: Entity,
        name: &'static str,
    },

    /// No message of the requested shape was sent this tick.
    #[error("no `{name}` message was sent this tick")]
    EmptyMessages { name: &'static str },

    /// The directed pair does not carry the requested relation.
    #[error("no `{name}` relation from {from} to {to}")]
    MissingRelation {
        from: Entity,
        to: Entity,
        name: &'static str,
    },

    /// The handle was destroyed (or never created by this world).
    #[error("entity {0} is not alive")]
    DeadEntity(Entity),
}

/// Result type for fallible world accessors.
pub type Result<T> = core::result::Result<T, EcsError>;
