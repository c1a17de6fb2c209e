//! Deterministic simulation module
//!
//! All gameplay logic lives here. The module is pure and deterministic:
//! - One synchronous `tick(dt)` per frame, no suspension points
//! - Seeded RNG only
//! - Deterministic iteration and contact ordering
//! - No rendering, audio or platform dependencies
//!
//! Two motion strategies coexist, selected per entity: a manual per-axis
//! integrator ([`entity`]) and a rigid-body solver ([`physics`]). Collision
//! detection is equally pluggable: AABB overlap tests or solver contact
//! manifolds, both resolved by the same rules ([`collision`]).

pub mod camera;
pub mod collision;
pub mod entity;
pub mod physics;
pub mod state;
pub mod tick;

pub use camera::CameraController;
pub use collision::ContactClass;
pub use entity::{
    CollectibleKind, DecorationKind, Entity, EntityId, EntityKind, JumpPhase, PlayerState, Rect,
    ViewDirection,
};
pub use physics::PhysicsWorld;
pub use state::{GameEvent, GamePhase, GameState, PhysicsMode, Sfx};
pub use tick::{tick, TickInput};
