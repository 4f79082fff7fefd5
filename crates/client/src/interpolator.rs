//! Remote-entity interpolation: for each remote player, a small buffer of
//! timestamped snapshots replayed at a fixed render-time delay. There is no
//! clock-offset estimation to do (the server timestamps every delta and the
//! client only ever renders its own local receipt clock) and no 3D
//! orientation to slerp — just a shortest-arc 2D angle lerp, and no
//! extrapolation past the newest snapshot; the last known pose is held
//! instead.

use std::collections::HashMap;
use std::f32::consts::PI;

use arena_core::constants::{INTERPOLATION_DELAY_MS, SNAPSHOT_RETENTION_MS};
use glam::Vec2;

#[derive(Debug, Clone, Copy)]
struct Snapshot {
    position: Vec2,
    angle: f32,
    recv_ms: u64,
}

#[derive(Debug, Default)]
struct PlayerBuffer {
    snapshots: Vec<Snapshot>,
}

impl PlayerBuffer {
    fn push(&mut self, snapshot: Snapshot) {
        let pos = self
            .snapshots
            .iter()
            .position(|s| s.recv_ms > snapshot.recv_ms)
            .unwrap_or(self.snapshots.len());
        self.snapshots.insert(pos, snapshot);
    }

    fn drop_older_than(&mut self, cutoff_ms: u64) {
        self.snapshots.retain(|s| s.recv_ms >= cutoff_ms);
    }

    fn sample(&self, render_time_ms: u64) -> Option<(Vec2, f32)> {
        match self.snapshots.len() {
            0 => None,
            1 => {
                let s = self.snapshots[0];
                Some((s.position, s.angle))
            }
            _ => {
                if render_time_ms >= self.snapshots.last().unwrap().recv_ms {
                    let s = self.snapshots.last().unwrap();
                    return Some((s.position, s.angle));
                }
                if render_time_ms <= self.snapshots[0].recv_ms {
                    let s = self.snapshots[0];
                    return Some((s.position, s.angle));
                }
                let to_idx = self
                    .snapshots
                    .iter()
                    .position(|s| s.recv_ms >= render_time_ms)
                    .unwrap();
                let from = self.snapshots[to_idx - 1];
                let to = self.snapshots[to_idx];
                let span = (to.recv_ms - from.recv_ms).max(1) as f32;
                let t = (render_time_ms - from.recv_ms) as f32 / span;
                Some((from.position.lerp(to.position, t), lerp_angle(from.angle, to.angle, t)))
            }
        }
    }
}

/// Wraps a radian difference into (−π, π] before lerping, so e.g. going
/// from 3.0 to -3.0 turns the short way through π instead of the long way
/// through 0.
fn lerp_angle(from: f32, to: f32, t: f32) -> f32 {
    let mut diff = (to - from) % (2.0 * PI);
    if diff > PI {
        diff -= 2.0 * PI;
    } else if diff <= -PI {
        diff += 2.0 * PI;
    }
    wrap_angle(from + diff * t)
}

fn wrap_angle(angle: f32) -> f32 {
    let mut a = angle % (2.0 * PI);
    if a > PI {
        a -= 2.0 * PI;
    } else if a <= -PI {
        a += 2.0 * PI;
    }
    a
}

#[derive(Default)]
pub struct RemoteInterpolator {
    players: HashMap<String, PlayerBuffer>,
}

impl RemoteInterpolator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_snapshot(&mut self, session_id: &str, position: Vec2, angle: f32, recv_ms: u64) {
        self.players
            .entry(session_id.to_string())
            .or_default()
            .push(Snapshot {
                position,
                angle,
                recv_ms,
            });
    }

    pub fn remove(&mut self, session_id: &str) {
        self.players.remove(session_id);
    }

    /// Render-time sample for one remote player, `INTERPOLATION_DELAY_MS`
    /// behind `now_ms`. Also prunes snapshots older than
    /// `SNAPSHOT_RETENTION_MS`.
    pub fn sample(&mut self, session_id: &str, now_ms: u64) -> Option<(Vec2, f32)> {
        let render_time_ms = now_ms.saturating_sub(INTERPOLATION_DELAY_MS);
        let buffer = self.players.get_mut(session_id)?;
        buffer.drop_older_than(now_ms.saturating_sub(SNAPSHOT_RETENTION_MS));
        buffer.sample(render_time_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_snapshot_renders_as_is() {
        let mut interp = RemoteInterpolator::new();
        interp.push_snapshot("a", Vec2::new(5.0, 5.0), 0.0, 1_000);
        let (pos, _) = interp.sample("a", 1_100).unwrap();
        assert_eq!(pos, Vec2::new(5.0, 5.0));
    }

    #[test]
    fn interpolates_between_bracketing_snapshots() {
        let mut interp = RemoteInterpolator::new();
        interp.push_snapshot("a", Vec2::new(0.0, 0.0), 0.0, 1_000);
        interp.push_snapshot("a", Vec2::new(100.0, 0.0), 0.0, 1_100);

        // now = 1150 -> render_time = 1050, the midpoint of [1000,1100]
        let (pos, _) = interp.sample("a", 1_150).unwrap();
        assert!((pos.x - 50.0).abs() < 0.01);
    }

    #[test]
    fn holds_newest_snapshot_without_extrapolating_past_it() {
        let mut interp = RemoteInterpolator::new();
        interp.push_snapshot("a", Vec2::new(0.0, 0.0), 0.0, 1_000);
        interp.push_snapshot("a", Vec2::new(100.0, 0.0), 0.0, 1_100);

        let (pos, _) = interp.sample("a", 50_000).unwrap();
        assert_eq!(pos, Vec2::new(100.0, 0.0));
    }

    #[test]
    fn angle_lerp_takes_the_short_way_across_the_wrap() {
        let from = 3.0f32;
        let to = -3.0f32;
        let mid = lerp_angle(from, to, 0.5);
        // Short way crosses PI, so the midpoint should be near +/-PI, not 0.
        assert!(mid.abs() > 3.0);
    }

    #[test]
    fn old_snapshots_are_pruned() {
        let mut interp = RemoteInterpolator::new();
        interp.push_snapshot("a", Vec2::ZERO, 0.0, 0);
        interp.push_snapshot("a", Vec2::new(1.0, 0.0), 0.0, 50);
        // Advance far enough that the retention window drops both.
        interp.sample("a", 0 + SNAPSHOT_RETENTION_MS * 3);
        assert!(interp.players.get("a").unwrap().snapshots.is_empty());
    }
}
