//! Entity record and the manual motion integrator
//!
//! One flat record covers every object in a level; behaviour differences hang
//! off the [`EntityKind`] tag instead of a subclass tree, so collision
//! handlers can match exhaustively and the compiler flags any kind a handler
//! forgot.

use glam::Vec2;
use rapier2d::dynamics::RigidBodyHandle;

use crate::tuning::{MotionProfile, Tuning};

/// Stable identifier; allocation order is deterministic (loader scan order,
/// then runtime spawn order).
pub type EntityId = u32;

/// Axis-aligned bounding box, relative to the owning entity's position.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Overlap test between two world-space rectangles.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.x + other.w
            && self.x + self.w > other.x
            && self.y < other.y + other.h
            && self.y + self.h > other.y
    }

    /// This rectangle translated into world space.
    pub fn at(&self, pos: Vec2) -> Rect {
        Rect::new(pos.x + self.x, pos.y + self.y, self.w, self.h)
    }
}

/// Which way the player sprite faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewDirection {
    Left,
    #[default]
    Right,
}

/// Jump phase of the player.
///
/// `Grounded` only ever comes back via ground collision resolution; it is
/// never restored by a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JumpPhase {
    Grounded,
    #[default]
    Falling,
    JumpRising,
    JumpFalling,
}

/// Player-specific state carried in the entity payload
#[derive(Debug, Clone, Default)]
pub struct PlayerState {
    pub view_direction: ViewDirection,
    pub jump_phase: JumpPhase,
    /// Accumulated time in the current jump, seconds
    pub time_jumping: f32,
    /// Speed power-up: active flag + countdown
    pub has_star: bool,
    pub star_time_left: f32,
    /// Flight power-up: active flag + countdown
    pub has_feather: bool,
    pub feather_time_left: f32,
    /// Set by ground contacts in rigid-body mode
    pub grounded: bool,
}

impl PlayerState {
    /// Flight is usable while the pick-up flag is set and time remains.
    pub fn flight_active(&self) -> bool {
        self.has_feather && self.feather_time_left > 0.0
    }
}

/// What a collectible gives the player when touched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectibleKind {
    /// Fixed pick-up worth a large score
    Coin,
    /// Grants the flight power-up
    Feather,
    /// Grants the speed power-up
    Star,
    /// Falls from the sky on rigid-body levels; small score
    Raindrop,
}

/// Collectible payload
#[derive(Debug, Clone)]
pub struct CollectibleState {
    pub kind: CollectibleKind,
    pub collected: bool,
    /// Raindrops evaporate shortly after coming to rest
    pub decaying: bool,
    pub decay_left: f32,
}

/// Purely visual level furniture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecorationKind {
    /// Red-pixel overlay tiles drawn in front of the action
    Foreground,
    Backdrop,
    PyramidNear,
    PyramidFar,
    Cloud,
    Sun,
    WaterOverlay,
}

/// Closed set of entity variants
#[derive(Debug, Clone)]
pub enum EntityKind {
    Player(PlayerState),
    /// Run-length encoded floor segment, `length` tiles wide
    Ground { length: u32 },
    Collectible(CollectibleState),
    /// Scuttler that patrols leftward and destroys raindrops on contact
    Hazard,
    /// Touching this ends the level
    Goal,
    Decoration(DecorationKind),
}

/// One simulated object.
///
/// `bounds` is always relative to `pos`; `body` is an opaque handle into the
/// externally owned rigid-body solver (`None` for manually integrated
/// entities).
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub pos: Vec2,
    pub dim: Vec2,
    pub origin: Vec2,
    pub scale: Vec2,
    pub rotation: f32,
    pub bounds: Rect,
    pub velocity: Vec2,
    pub terminal_velocity: Vec2,
    pub friction: Vec2,
    pub acceleration: Vec2,
    pub body: Option<RigidBodyHandle>,
}

impl Entity {
    fn base(id: EntityId, kind: EntityKind) -> Self {
        Self {
            id,
            kind,
            pos: Vec2::ZERO,
            dim: Vec2::ONE,
            origin: Vec2::ZERO,
            scale: Vec2::ONE,
            rotation: 0.0,
            bounds: Rect::default(),
            velocity: Vec2::ZERO,
            terminal_velocity: Vec2::ONE,
            friction: Vec2::ZERO,
            acceleration: Vec2::ZERO,
            body: None,
        }
    }

    /// World-space bounding box
    pub fn aabb(&self) -> Rect {
        self.bounds.at(self.pos)
    }

    /// World-space center of the bounding box
    pub fn center(&self) -> Vec2 {
        let r = self.aabb();
        Vec2::new(r.x + r.w / 2.0, r.y + r.h / 2.0)
    }

    pub fn apply_profile(&mut self, profile: &MotionProfile) {
        self.terminal_velocity = profile.terminal_velocity;
        self.friction = profile.friction;
        self.acceleration = profile.acceleration;
    }

    // --- constructors, one per tile kind ---

    pub fn player(id: EntityId, tuning: &Tuning) -> Self {
        let mut e = Self::base(id, EntityKind::Player(PlayerState::default()));
        e.dim = Vec2::new(1.0, 1.0);
        e.origin = e.dim / 2.0;
        e.bounds = Rect::new(0.0, 0.0, e.dim.x, e.dim.y);
        e.apply_profile(&tuning.player_kinematic);
        e
    }

    pub fn ground(id: EntityId) -> Self {
        let mut e = Self::base(id, EntityKind::Ground { length: 0 });
        e.dim = Vec2::new(1.01, 1.0);
        e.set_ground_length(1);
        e
    }

    /// Extend or shrink a ground run; keeps the collision bounds in sync.
    /// The bounds sit a quarter tile below the visual top so shallow steps
    /// read as walkable.
    pub fn set_ground_length(&mut self, length: u32) {
        if let EntityKind::Ground { length: l } = &mut self.kind {
            *l = length;
        }
        self.bounds = Rect::new(0.0, 0.0, self.dim.x * length as f32, self.dim.y - 0.25);
    }

    pub fn ground_length(&self) -> u32 {
        match self.kind {
            EntityKind::Ground { length } => length,
            _ => 0,
        }
    }

    pub fn collectible(id: EntityId, kind: CollectibleKind, tuning: &Tuning) -> Self {
        let mut e = Self::base(
            id,
            EntityKind::Collectible(CollectibleState {
                kind,
                collected: false,
                decaying: false,
                decay_left: tuning.raindrop_decay,
            }),
        );
        e.dim = Vec2::new(0.5, 0.5);
        e.bounds = Rect::new(0.0, 0.0, e.dim.x, e.dim.y);
        if kind == CollectibleKind::Raindrop {
            e.apply_profile(&tuning.raindrop);
            // Small upward nudge so a fresh drop is not culled as "at rest"
            e.velocity.y = 0.2;
        }
        e
    }

    pub fn hazard(id: EntityId, tuning: &Tuning) -> Self {
        let mut e = Self::base(id, EntityKind::Hazard);
        e.dim = Vec2::new(1.0, 1.0);
        e.origin = Vec2::new((e.dim.x - 0.2) / 2.0, (e.dim.y - 0.4) / 2.0);
        e.bounds = Rect::new(0.0, 0.0, e.dim.x - 0.2, e.dim.y - 0.4);
        e.apply_profile(&tuning.hazard);
        e
    }

    pub fn goal(id: EntityId) -> Self {
        let mut e = Self::base(id, EntityKind::Goal);
        e.dim = Vec2::new(1.0, 2.0);
        e.bounds = Rect::new(0.0, 0.0, e.dim.x, e.dim.y);
        e
    }

    pub fn decoration(id: EntityId, kind: DecorationKind, dim: Vec2) -> Self {
        let mut e = Self::base(id, EntityKind::Decoration(kind));
        e.dim = dim;
        e
    }

    // --- accessors used by collision handlers ---

    pub fn player_state(&self) -> Option<&PlayerState> {
        match &self.kind {
            EntityKind::Player(p) => Some(p),
            _ => None,
        }
    }

    pub fn player_state_mut(&mut self) -> Option<&mut PlayerState> {
        match &mut self.kind {
            EntityKind::Player(p) => Some(p),
            _ => None,
        }
    }

    pub fn collectible_state(&self) -> Option<&CollectibleState> {
        match &self.kind {
            EntityKind::Collectible(c) => Some(c),
            _ => None,
        }
    }

    pub fn collectible_state_mut(&mut self) -> Option<&mut CollectibleState> {
        match &mut self.kind {
            EntityKind::Collectible(c) => Some(c),
            _ => None,
        }
    }

    // --- manual integrator ---

    /// Advance one axis: friction toward zero (no sign flip), then
    /// acceleration, then terminal clamp.
    fn integrate_axis(velocity: f32, friction: f32, acceleration: f32, terminal: f32, dt: f32) -> f32 {
        let mut v = velocity;
        if v != 0.0 {
            if v > 0.0 {
                v = (v - friction * dt).max(0.0);
            } else {
                v = (v + friction * dt).min(0.0);
            }
        }
        v += acceleration * dt;
        v.clamp(-terminal, terminal)
    }

    pub(crate) fn update_motion_x(&mut self, dt: f32) {
        self.velocity.x = Self::integrate_axis(
            self.velocity.x,
            self.friction.x,
            self.acceleration.x,
            self.terminal_velocity.x,
            dt,
        );
    }

    pub(crate) fn update_motion_y(&mut self, dt: f32) {
        self.velocity.y = Self::integrate_axis(
            self.velocity.y,
            self.friction.y,
            self.acceleration.y,
            self.terminal_velocity.y,
            dt,
        );
    }

    /// Manual integration step: each axis independently, never coupled.
    pub fn integrate(&mut self, dt: f32) {
        self.update_motion_x(dt);
        self.update_motion_y(dt);
        self.pos += self.velocity * dt;
    }
}
