use glam::Vec2;
use rapier2d::prelude::*;

use crate::constants::{BULLET_RADIUS, MAP_HALF_SIZE, PLAYER_RADIUS, TICK_DT, WALL_THICKNESS};

/// High linear damping so a zero-velocity command produces a near-immediate
/// stop, giving players a damped-disk feel rather than ice-skating momentum.
const PLAYER_DAMPING: f32 = 10.0;

pub struct PhysicsWorld {
    pipeline: PhysicsPipeline,
    integration_parameters: IntegrationParameters,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    pub fn new() -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = TICK_DT;
        integration_parameters.min_ccd_dt = TICK_DT / 100.0;

        let mut world = Self {
            pipeline: PhysicsPipeline::new(),
            integration_parameters,
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
        };
        world.add_arena_walls();
        world
    }

    fn add_arena_walls(&mut self) {
        let half = MAP_HALF_SIZE;
        let t = WALL_THICKNESS;
        // North, south: full width, thin.
        self.add_static_box(Vec2::new(0.0, -half - t / 2.0), Vec2::new(half + t, t / 2.0));
        self.add_static_box(Vec2::new(0.0, half + t / 2.0), Vec2::new(half + t, t / 2.0));
        // East, west: full height, thin.
        self.add_static_box(Vec2::new(-half - t / 2.0, 0.0), Vec2::new(t / 2.0, half + t));
        self.add_static_box(Vec2::new(half + t / 2.0, 0.0), Vec2::new(t / 2.0, half + t));
    }

    fn add_static_box(&mut self, position: Vec2, half_extents: Vec2) -> ColliderHandle {
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y)
            .translation(vector![position.x, position.y].into())
            .build();
        self.colliders.insert(collider)
    }

    pub fn step(&mut self) {
        self.pipeline.step(
            vector![0.0, 0.0].into(),
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            &(),
            &(),
        );
    }

    /// Dynamic damped disk, no restitution, no friction — slides against
    /// walls and other players rather than bouncing.
    pub fn add_player(&mut self, position: Vec2) -> RigidBodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .translation(vector![position.x, position.y].into())
            .linear_damping(PLAYER_DAMPING)
            .lock_rotations()
            .build();
        let handle = self.bodies.insert(body);

        let collider = ColliderBuilder::ball(PLAYER_RADIUS)
            .friction(0.0)
            .restitution(0.0)
            .build();
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);

        handle
    }

    /// Bullet body. CCD is required: per-tick displacement (20 u at 60 Hz,
    /// 1200 u/s) exceeds the bullet radius, so a discrete-only solver could
    /// tunnel through a player.
    pub fn add_bullet(&mut self, position: Vec2, velocity: Vec2) -> RigidBodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .translation(vector![position.x, position.y].into())
            .linvel(vector![velocity.x, velocity.y].into())
            .gravity_scale(0.0)
            .ccd_enabled(true)
            .lock_rotations()
            .build();
        let handle = self.bodies.insert(body);

        let collider = ColliderBuilder::ball(BULLET_RADIUS)
            .friction(0.0)
            .restitution(0.0)
            .sensor(true)
            .build();
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);

        handle
    }

    pub fn remove_body(&mut self, handle: RigidBodyHandle) {
        self.bodies.remove(
            handle,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    pub fn set_body_velocity(&mut self, handle: RigidBodyHandle, velocity: Vec2) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_linvel(vector![velocity.x, velocity.y].into(), true);
        }
    }

    pub fn set_body_position(&mut self, handle: RigidBodyHandle, position: Vec2) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_translation(vector![position.x, position.y].into(), true);
        }
    }

    pub fn body_position(&self, handle: RigidBodyHandle) -> Option<Vec2> {
        self.bodies.get(handle).map(|b| {
            let t = b.translation();
            Vec2::new(t.x, t.y)
        })
    }

    pub fn body_velocity(&self, handle: RigidBodyHandle) -> Option<Vec2> {
        self.bodies.get(handle).map(|b| {
            let v = b.linvel();
            Vec2::new(v.x, v.y)
        })
    }

    /// True if any body's translation or velocity is non-finite — a fatal
    /// physics fault per the error model.
    pub fn has_non_finite_state(&self) -> bool {
        self.bodies.iter().any(|(_, body)| {
            let t = body.translation();
            let v = body.linvel();
            !t.x.is_finite() || !t.y.is_finite() || !v.x.is_finite() || !v.y.is_finite()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_damping_brings_body_to_rest() {
        let mut world = PhysicsWorld::new();
        let handle = world.add_player(Vec2::ZERO);
        world.set_body_velocity(handle, Vec2::new(200.0, 0.0));

        for _ in 0..120 {
            world.step();
        }

        let vel = world.body_velocity(handle).unwrap();
        assert!(vel.length() < 1.0);
    }

    #[test]
    fn static_walls_stop_a_player() {
        let mut world = PhysicsWorld::new();
        let handle = world.add_player(Vec2::new(MAP_HALF_SIZE - 5.0, 0.0));
        world.set_body_velocity(handle, Vec2::new(200.0, 0.0));

        for _ in 0..180 {
            world.step();
        }

        let pos = world.body_position(handle).unwrap();
        assert!(pos.x < MAP_HALF_SIZE + PLAYER_RADIUS + 1.0);
    }
}
