//! Authoritative data model: players, bullets, the arena, and the input a
//! session sends each tick.

use crate::constants::{BULLET_RADIUS, MAP_HALF_SIZE, MAX_HEALTH, PLAYER_RADIUS};

/// Per-session input as received over the wire, already decoded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Input {
    pub seq: u32,
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub angle: f32,
}

impl Input {
    /// Unit move direction from the held keys, diagonals normalized to length 1.
    pub fn move_direction(&self) -> (f32, f32) {
        let mut x = 0.0f32;
        let mut y = 0.0f32;
        if self.right {
            x += 1.0;
        }
        if self.left {
            x -= 1.0;
        }
        if self.down {
            y += 1.0;
        }
        if self.up {
            y -= 1.0;
        }
        let len_sq = x * x + y * y;
        if len_sq > 1.0 {
            let len = len_sq.sqrt();
            x /= len;
            y /= len;
        }
        (x, y)
    }
}

/// Authoritative player entity, owned exclusively by the simulation.
#[derive(Debug, Clone)]
pub struct Player {
    pub session_id: String,
    pub position: glam::Vec2,
    pub velocity: glam::Vec2,
    pub facing: f32,
    pub health: u32,
    pub last_processed_seq: u32,
    pub physics_handle: rapier2d::dynamics::RigidBodyHandle,
    pub last_shot_at_ms: Option<u64>,
    pub dirty: PlayerDirty,
}

/// Per-field dirty tracking used by the state replicator to emit only the
/// fields that changed since the last flush for a given view.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlayerDirty {
    pub position: bool,
    pub facing: bool,
    pub health: bool,
    pub last_processed_seq: bool,
}

impl PlayerDirty {
    pub fn any(&self) -> bool {
        self.position || self.facing || self.health || self.last_processed_seq
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn all() -> Self {
        Self {
            position: true,
            facing: true,
            health: true,
            last_processed_seq: true,
        }
    }
}

impl Player {
    pub fn new(
        session_id: impl Into<String>,
        position: glam::Vec2,
        physics_handle: rapier2d::dynamics::RigidBodyHandle,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            position,
            velocity: glam::Vec2::ZERO,
            facing: 0.0,
            health: MAX_HEALTH,
            last_processed_seq: 0,
            physics_handle,
            last_shot_at_ms: None,
            dirty: PlayerDirty::all(),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Apply integer damage, clamped at zero. Returns true if this hit was
    /// the one that brought health to zero.
    pub fn apply_damage(&mut self, damage: u32) -> bool {
        let was_alive = self.health > 0;
        self.health = self.health.saturating_sub(damage);
        self.dirty.health = true;
        was_alive && self.health == 0
    }
}

/// Authoritative bullet entity. Only the spawn parameters are ever
/// replicated; the live physics position is server-internal.
#[derive(Debug, Clone)]
pub struct Bullet {
    pub id: u32,
    pub owner_id: String,
    pub spawn_x: f32,
    pub spawn_y: f32,
    pub angle: f32,
    pub speed: f32,
    pub spawned_at_ms: u64,
    pub physics_handle: Option<rapier2d::dynamics::RigidBodyHandle>,
    /// Set once the bullet is marked for removal (hit, OOB, max distance);
    /// the entity stays in replicated state for BULLET_REMOVE_GRACE after.
    pub removed_at_ms: Option<u64>,
}

impl Bullet {
    pub fn radius() -> f32 {
        BULLET_RADIUS
    }

    pub fn is_pending_removal(&self) -> bool {
        self.removed_at_ms.is_some()
    }
}

/// Square arena, side MAP, centered at the origin, with four static walls.
pub struct Arena;

impl Arena {
    pub const HALF_SIZE: f32 = MAP_HALF_SIZE;

    pub fn contains(point: glam::Vec2) -> bool {
        point.x.abs() <= Self::HALF_SIZE && point.y.abs() <= Self::HALF_SIZE
    }

    /// A random spawn point with |x|, |y| <= MAP/2 - 200.
    pub fn random_spawn(rng: &mut impl rand::Rng) -> glam::Vec2 {
        let bound = Self::HALF_SIZE - 200.0;
        glam::Vec2::new(
            rng.random_range(-bound..=bound),
            rng.random_range(-bound..=bound),
        )
    }
}

pub const SPAWN_CLEAR_RADIUS: f32 = PLAYER_RADIUS;
