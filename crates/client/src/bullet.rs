//! Client-side bullet trajectory extrapolation. The server never streams
//! per-frame bullet positions — only spawn parameters and ADD/REMOVE — so
//! between those two events the client reconstructs the trajectory itself.
//! Local hit detection against predicted/interpolated players is advisory
//! only (audio/flash feedback); it never mutates authoritative state and
//! each bullet fires it at most once.

use std::collections::HashMap;

use arena_core::constants::{BULLET_RADIUS, PLAYER_RADIUS};
use arena_core::net::BulletSpawn;
use glam::Vec2;

pub struct LocalBullet {
    pub id: u32,
    pub owner_id: String,
    spawn: Vec2,
    angle: f32,
    speed: f32,
    spawned_at_ms: u64,
    feedback_fired: bool,
}

impl LocalBullet {
    fn new(spawn_msg: &BulletSpawn, received_at_ms: u64) -> Self {
        Self {
            id: spawn_msg.id,
            owner_id: spawn_msg.owner_id.clone(),
            spawn: Vec2::new(spawn_msg.x, spawn_msg.y),
            angle: spawn_msg.angle,
            speed: spawn_msg.speed,
            spawned_at_ms: received_at_ms,
            feedback_fired: false,
        }
    }

    pub fn position_at(&self, now_ms: u64) -> Vec2 {
        let dt_secs = now_ms.saturating_sub(self.spawned_at_ms) as f32 / 1000.0;
        self.spawn + Vec2::new(self.angle.cos(), self.angle.sin()) * self.speed * dt_secs
    }

    /// Advisory local hit check against one target disk. Returns `true` at
    /// most once for the lifetime of this bullet.
    pub fn check_local_hit(&mut self, target: Vec2, now_ms: u64) -> bool {
        if self.feedback_fired {
            return false;
        }
        let hit = self.position_at(now_ms).distance(target) < PLAYER_RADIUS + BULLET_RADIUS;
        if hit {
            self.feedback_fired = true;
        }
        hit
    }
}

/// Tracks every bullet currently between ADD and REMOVE for this client.
#[derive(Default)]
pub struct BulletTracker {
    bullets: HashMap<u32, LocalBullet>,
}

impl BulletTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, spawn_msg: &BulletSpawn, received_at_ms: u64) {
        self.bullets
            .insert(spawn_msg.id, LocalBullet::new(spawn_msg, received_at_ms));
    }

    pub fn remove(&mut self, id: u32) {
        self.bullets.remove(&id);
    }

    pub fn get(&self, id: u32) -> Option<&LocalBullet> {
        self.bullets.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LocalBullet> {
        self.bullets.values()
    }

    /// Check every tracked bullet against one target, returning the ids of
    /// bullets that scored a fresh (not-yet-fired) local hit this call.
    pub fn check_local_hits(&mut self, target: Vec2, now_ms: u64) -> Vec<u32> {
        let mut hits = Vec::new();
        for bullet in self.bullets.values_mut() {
            if bullet.check_local_hit(target, now_ms) {
                hits.push(bullet.id);
            }
        }
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn_msg(id: u32) -> BulletSpawn {
        BulletSpawn {
            id,
            owner_id: "shooter".into(),
            x: 0.0,
            y: 0.0,
            angle: 0.0,
            speed: 1200.0,
        }
    }

    #[test]
    fn extrapolates_along_the_spawn_ray() {
        let mut tracker = BulletTracker::new();
        tracker.spawn(&spawn_msg(1), 1_000);
        let pos = tracker.get(1).unwrap().position_at(1_500);
        assert!((pos.x - 600.0).abs() < 0.01);
        assert_eq!(pos.y, 0.0);
    }

    #[test]
    fn local_hit_feedback_fires_at_most_once() {
        let mut tracker = BulletTracker::new();
        tracker.spawn(&spawn_msg(1), 1_000);
        let target = Vec2::new(600.0, 0.0);

        let first = tracker.check_local_hits(target, 1_500);
        assert_eq!(first, vec![1]);

        let second = tracker.check_local_hits(target, 1_501);
        assert!(second.is_empty());
    }

    #[test]
    fn remove_drops_the_bullet() {
        let mut tracker = BulletTracker::new();
        tracker.spawn(&spawn_msg(1), 1_000);
        tracker.remove(1);
        assert!(tracker.get(1).is_none());
    }
}
