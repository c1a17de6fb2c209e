//! rapier2d solver wrapper for the rigid-body motion variant
//!
//! The solver owns every body and collider; entities keep only an opaque
//! [`RigidBodyHandle`]. Each frame the sim applies input forces, steps the
//! pipeline once with fixed iteration counts, mirrors translations back into
//! the entities and reads the active contact pairs for the collision
//! resolver. Contact pairs are reported as entity-id pairs sorted `(min,
//! max)` so the resolution order never depends on solver internals.

use std::collections::HashMap;
use std::num::NonZeroUsize;

use glam::Vec2;
use rapier2d::prelude::*;

use super::entity::{Entity, EntityId};

/// Manages rapier2d state and the entity-id <-> handle mapping.
pub struct PhysicsWorld {
    pipeline: PhysicsPipeline,
    gravity: Vector<Real>,
    integration_params: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    entity_to_body: HashMap<EntityId, RigidBodyHandle>,
    collider_to_entity: HashMap<ColliderHandle, EntityId>,
}

impl PhysicsWorld {
    pub fn new(gravity: Vec2, solver_iterations: usize) -> Self {
        let mut integration_params = IntegrationParameters::default();
        integration_params.num_solver_iterations =
            NonZeroUsize::new(solver_iterations.max(1)).expect("max(1) is non-zero");
        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: vector![gravity.x, gravity.y],
            integration_params,
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            entity_to_body: HashMap::new(),
            collider_to_entity: HashMap::new(),
        }
    }

    /// Register an immovable entity (ground runs, placed pick-ups, goal).
    /// Stores the handle back on the entity.
    pub fn register_static(&mut self, entity: &mut Entity) {
        let body = RigidBodyBuilder::fixed()
            .translation(vector![entity.pos.x, entity.pos.y])
            .build();
        self.attach(entity, body);
    }

    /// Register a solver-driven entity (player, hazards, raindrops).
    /// `friction.x` becomes the fixture friction; forces and impulses are
    /// applied through [`Self::apply_force`] / [`Self::apply_impulse`].
    pub fn register_dynamic(&mut self, entity: &mut Entity, gravity_scale: f32) {
        let body = RigidBodyBuilder::dynamic()
            .translation(vector![entity.pos.x, entity.pos.y])
            .linvel(vector![entity.velocity.x, entity.velocity.y])
            .gravity_scale(gravity_scale)
            .build();
        self.attach(entity, body);
    }

    fn attach(&mut self, entity: &mut Entity, body: RigidBody) {
        if self.entity_to_body.contains_key(&entity.id) {
            return;
        }
        let body_handle = self.bodies.insert(body);
        self.entity_to_body.insert(entity.id, body_handle);
        entity.body = Some(body_handle);

        // Collider centered on the entity's bounds, offset from the body
        // anchor (the entity's bottom-left position).
        let half = Vec2::new(entity.bounds.w / 2.0, entity.bounds.h / 2.0);
        let collider = ColliderBuilder::cuboid(half.x, half.y)
            .translation(vector![entity.bounds.x + half.x, entity.bounds.y + half.y])
            .friction(entity.friction.x)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .build();
        let collider_handle =
            self.colliders
                .insert_with_parent(collider, body_handle, &mut self.bodies);
        self.collider_to_entity.insert(collider_handle, entity.id);
    }

    /// Remove an entity's body and colliders. A no-op when the entity was
    /// never registered or is already gone (double removal is guarded, not
    /// an error).
    pub fn unregister(&mut self, id: EntityId) {
        if let Some(body_handle) = self.entity_to_body.remove(&id) {
            self.bodies.remove(
                body_handle,
                &mut self.island_manager,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            );
            self.collider_to_entity.retain(|_, eid| *eid != id);
        }
    }

    /// Advance the solver by one fixed step. Applied forces are cleared
    /// afterwards so they behave as per-frame forces.
    pub fn step(&mut self, dt: f32) {
        self.integration_params.dt = dt;
        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            None,
            &(),
            &(),
        );
        for (_, body) in self.bodies.iter_mut() {
            body.reset_forces(true);
        }
    }

    /// Entity-id pairs with at least one active contact this step, sorted
    /// `(min, max)` for deterministic resolution order.
    pub fn active_contacts(&self) -> Vec<(EntityId, EntityId)> {
        let mut pairs = Vec::new();
        for pair in self.narrow_phase.contact_pairs() {
            if !pair.has_any_active_contact {
                continue;
            }
            let a = self.collider_to_entity.get(&pair.collider1).copied();
            let b = self.collider_to_entity.get(&pair.collider2).copied();
            if let (Some(a), Some(b)) = (a, b) {
                pairs.push((a.min(b), a.max(b)));
            }
        }
        pairs.sort_unstable();
        pairs.dedup();
        pairs
    }

    pub fn translation(&self, handle: RigidBodyHandle) -> Option<Vec2> {
        self.bodies.get(handle).map(|b| {
            let t = b.translation();
            Vec2::new(t.x, t.y)
        })
    }

    pub fn rotation(&self, handle: RigidBodyHandle) -> Option<f32> {
        self.bodies.get(handle).map(|b| b.rotation().angle())
    }

    pub fn linvel(&self, handle: RigidBodyHandle) -> Vec2 {
        self.bodies
            .get(handle)
            .map(|b| {
                let v = b.linvel();
                Vec2::new(v.x, v.y)
            })
            .unwrap_or(Vec2::ZERO)
    }

    pub fn set_linvel(&mut self, handle: RigidBodyHandle, velocity: Vec2) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_linvel(vector![velocity.x, velocity.y], true);
        }
    }

    /// Per-frame force at the center of mass (cleared after each step).
    pub fn apply_force(&mut self, handle: RigidBodyHandle, force: Vec2) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.add_force(vector![force.x, force.y], true);
        }
    }

    pub fn apply_impulse(&mut self, handle: RigidBodyHandle, impulse: Vec2) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.apply_impulse(vector![impulse.x, impulse.y], true);
        }
    }

    /// Enforce the component-wise terminal velocity bound on a solver body.
    pub fn clamp_velocity(&mut self, handle: RigidBodyHandle, terminal: Vec2) {
        if let Some(body) = self.bodies.get_mut(handle) {
            let v = *body.linvel();
            let clamped = vector![
                v.x.clamp(-terminal.x, terminal.x),
                v.y.clamp(-terminal.y, terminal.y)
            ];
            if clamped != v {
                body.set_linvel(clamped, true);
            }
        }
    }

    pub fn has_body(&self, id: EntityId) -> bool {
        self.entity_to_body.contains_key(&id)
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }
}

impl std::fmt::Debug for PhysicsWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicsWorld")
            .field("bodies", &self.bodies.len())
            .field("colliders", &self.colliders.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::Tuning;

    fn world() -> PhysicsWorld {
        PhysicsWorld::new(Vec2::new(0.0, -9.81), 8)
    }

    #[test]
    fn test_dynamic_body_falls_under_gravity() {
        let tuning = Tuning::default();
        let mut pw = world();
        let mut player = Entity::player(1, &tuning);
        player.pos = Vec2::new(0.0, 10.0);
        pw.register_dynamic(&mut player, 1.0);
        let handle = player.body.unwrap();

        for _ in 0..30 {
            pw.step(1.0 / 60.0);
        }
        let pos = pw.translation(handle).unwrap();
        assert!(pos.y < 10.0, "body fell, y = {}", pos.y);
    }

    #[test]
    fn test_static_body_stays_put() {
        let mut pw = world();
        let mut ground = Entity::ground(1);
        ground.set_ground_length(3);
        ground.pos = Vec2::new(2.0, -1.0);
        pw.register_static(&mut ground);
        let handle = ground.body.unwrap();

        for _ in 0..30 {
            pw.step(1.0 / 60.0);
        }
        assert_eq!(pw.translation(handle).unwrap(), Vec2::new(2.0, -1.0));
    }

    #[test]
    fn test_falling_body_contacts_the_ground() {
        let tuning = Tuning::default();
        let mut pw = world();

        let mut ground = Entity::ground(1);
        ground.set_ground_length(5);
        ground.pos = Vec2::new(0.0, 0.0);
        pw.register_static(&mut ground);

        let mut player = Entity::player(2, &tuning);
        player.pos = Vec2::new(1.0, 2.0);
        pw.register_dynamic(&mut player, 1.0);

        let mut saw_contact = false;
        for _ in 0..240 {
            pw.step(1.0 / 60.0);
            if pw.active_contacts().contains(&(1, 2)) {
                saw_contact = true;
                break;
            }
        }
        assert!(saw_contact, "player never touched the ground");
    }

    #[test]
    fn test_unregister_is_idempotent_and_frees_the_body() {
        let tuning = Tuning::default();
        let mut pw = world();
        let mut player = Entity::player(7, &tuning);
        pw.register_dynamic(&mut player, 1.0);
        assert_eq!(pw.body_count(), 1);

        pw.unregister(7);
        assert_eq!(pw.body_count(), 0);
        assert!(!pw.has_body(7));
        pw.unregister(7); // guarded no-op
        assert_eq!(pw.body_count(), 0);
    }

    #[test]
    fn test_clamp_velocity_caps_each_axis() {
        let tuning = Tuning::default();
        let mut pw = world();
        let mut player = Entity::player(1, &tuning);
        pw.register_dynamic(&mut player, 1.0);
        let handle = player.body.unwrap();

        pw.set_linvel(handle, Vec2::new(40.0, -40.0));
        pw.clamp_velocity(handle, Vec2::new(5.0, 5.0));
        assert_eq!(pw.linvel(handle), Vec2::new(5.0, -5.0));
    }
}
