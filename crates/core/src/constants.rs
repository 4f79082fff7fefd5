//! Tuning constants shared by the server and the client. Both sides must
//! agree on every value here; none of them are negotiated over the wire.

/// Half-width and half-height of the square arena, centered at the origin.
pub const MAP_HALF_SIZE: f32 = 1000.0;
pub const MAP_SIZE: f32 = MAP_HALF_SIZE * 2.0;

pub const PLAYER_RADIUS: f32 = 25.0;
pub const BULLET_RADIUS: f32 = 5.0;

pub const PLAYER_SPEED: f32 = 200.0;
pub const BULLET_SPEED: f32 = 1200.0;
pub const BULLET_DAMAGE: u32 = 20;
pub const MAX_HEALTH: u32 = 500;

pub const TICK_RATE: u32 = 60;
pub const TICK_DT: f32 = 1.0 / TICK_RATE as f32;

pub const SHOOT_COOLDOWN_MS: u64 = 200;
pub const VIEW_DISTANCE: f32 = 600.0;
pub const VISIBILITY_REFRESH_MS: u64 = 1_000;
pub const INTERPOLATION_DELAY_MS: u64 = 100;
pub const SNAPSHOT_RETENTION_MS: u64 = 1_000;

pub const BULLET_MAX_DISTANCE: f32 = 1_000.0;
pub const BULLET_REMOVE_GRACE_MS: u64 = 200;

/// Wall thickness for the four static arena boundaries.
pub const WALL_THICKNESS: f32 = 20.0;

/// Default reconnection grace window.
pub const RECONNECT_GRACE_SECS: u64 = 20;

/// Per-session intake queue bound, one second of input at tick rate.
pub const INTAKE_QUEUE_CAPACITY: usize = TICK_RATE as usize;
