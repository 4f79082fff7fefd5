//! Per-client filtered view over the shared authoritative state. Builds
//! one delta per session per tick: full records for entities newly in
//! view, field-level deltas for entities already known, and explicit
//! ADD/REMOVE markers when the view changes.

use std::collections::{HashMap, HashSet};

use crate::model::{Bullet, Player};
use crate::net::{BulletSpawn, DeltaMsg, PlayerDelta};

#[derive(Default)]
struct ClientView {
    known_players: HashSet<String>,
    known_bullets: HashSet<u32>,
    pending_bullet_adds: Vec<BulletSpawn>,
    pending_bullet_removes: Vec<u32>,
}

#[derive(Default)]
pub struct StateReplicator {
    clients: HashMap<String, ClientView>,
}

impl StateReplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drop_session(&mut self, session_id: &str) {
        self.clients.remove(session_id);
    }

    /// Record that `bullet` became visible, at spawn time, to every session
    /// in `viewers` (the interest manager's spawn-time bypass scan).
    pub fn note_bullet_spawn(&mut self, bullet: &Bullet, viewers: &HashSet<String>) {
        let spawn = BulletSpawn {
            id: bullet.id,
            owner_id: bullet.owner_id.clone(),
            x: bullet.spawn_x,
            y: bullet.spawn_y,
            angle: bullet.angle,
            speed: bullet.speed,
        };
        for session_id in viewers {
            let view = self.clients.entry(session_id.clone()).or_default();
            if view.known_bullets.insert(bullet.id) {
                view.pending_bullet_adds.push(spawn.clone());
            }
        }
    }

    /// Record that `bullet_id` left replicated state; every session that
    /// had previously been told about it gets a removal marker.
    pub fn note_bullet_removed(&mut self, bullet_id: u32) {
        for view in self.clients.values_mut() {
            if view.known_bullets.remove(&bullet_id) {
                view.pending_bullet_removes.push(bullet_id);
            }
        }
    }

    /// Build this session's delta for the current tick. `visible_players`
    /// is the session's current visibility set (its own id is always a
    /// member); `players` is authoritative state, keyed by session id.
    pub fn build_delta(
        &mut self,
        session_id: &str,
        tick: u32,
        server_time_ms: u64,
        visible_players: &HashSet<String>,
        players: &HashMap<String, Player>,
        local_last_processed_seq: Option<u32>,
    ) -> DeltaMsg {
        let view = self.clients.entry(session_id.to_string()).or_default();

        let mut player_deltas = Vec::new();
        for peer_id in visible_players {
            let Some(player) = players.get(peer_id) else {
                continue;
            };
            let first_sight = view.known_players.insert(peer_id.clone());
            if first_sight {
                player_deltas.push(PlayerDelta {
                    session_id: peer_id.clone(),
                    full: true,
                    position: Some([player.position.x, player.position.y]),
                    facing: Some(player.facing),
                    health: Some(player.health),
                });
            } else if player.dirty.any() {
                player_deltas.push(PlayerDelta {
                    session_id: peer_id.clone(),
                    full: false,
                    position: player.dirty.position.then_some([player.position.x, player.position.y]),
                    facing: player.dirty.facing.then_some(player.facing),
                    health: player.dirty.health.then_some(player.health),
                });
            }
        }

        let removed_players: Vec<String> = view
            .known_players
            .iter()
            .filter(|id| !visible_players.contains(*id) || !players.contains_key(*id))
            .cloned()
            .collect();
        for id in &removed_players {
            view.known_players.remove(id);
        }

        let bullets_added = std::mem::take(&mut view.pending_bullet_adds);
        let bullets_removed = std::mem::take(&mut view.pending_bullet_removes);

        DeltaMsg {
            tick,
            server_time_ms,
            players: player_deltas,
            removed_players,
            bullets_added,
            bullets_removed,
            local_last_processed_seq,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::PhysicsWorld;

    fn make_player(id: &str, world: &mut PhysicsWorld) -> Player {
        let handle = world.add_player(glam::Vec2::ZERO);
        Player::new(id, glam::Vec2::ZERO, handle)
    }

    #[test]
    fn first_appearance_is_full_then_deltas_are_partial() {
        let mut world = PhysicsWorld::new();
        let mut players = HashMap::new();
        players.insert("a".to_string(), make_player("a", &mut world));

        let mut replicator = StateReplicator::new();
        let visible: HashSet<String> = ["a".to_string()].into_iter().collect();

        let delta1 = replicator.build_delta("a", 0, 0, &visible, &players, None);
        assert_eq!(delta1.players.len(), 1);
        assert!(delta1.players[0].full);

        // Nothing changed: no dirty fields, no redundant resend.
        let delta2 = replicator.build_delta("a", 1, 16, &visible, &players, None);
        assert!(delta2.players.is_empty());

        players.get_mut("a").unwrap().dirty.health = true;
        let delta3 = replicator.build_delta("a", 2, 32, &visible, &players, None);
        assert_eq!(delta3.players.len(), 1);
        assert!(!delta3.players[0].full);
        assert!(delta3.players[0].health.is_some());
        assert!(delta3.players[0].position.is_none());
    }

    #[test]
    fn leaving_view_emits_removal() {
        let mut world = PhysicsWorld::new();
        let mut players = HashMap::new();
        players.insert("a".to_string(), make_player("a", &mut world));
        players.insert("b".to_string(), make_player("b", &mut world));

        let mut replicator = StateReplicator::new();
        let both: HashSet<String> = ["a".to_string(), "b".to_string()].into_iter().collect();
        replicator.build_delta("a", 0, 0, &both, &players, None);

        let only_self: HashSet<String> = ["a".to_string()].into_iter().collect();
        let delta = replicator.build_delta("a", 1, 16, &only_self, &players, None);
        assert_eq!(delta.removed_players, vec!["b".to_string()]);
    }

    #[test]
    fn bullet_add_then_remove_is_one_shot_per_client() {
        let mut replicator = StateReplicator::new();
        let bullet = Bullet {
            id: 1,
            owner_id: "a".into(),
            spawn_x: 0.0,
            spawn_y: 0.0,
            angle: 0.0,
            speed: 1200.0,
            spawned_at_ms: 0,
            physics_handle: None,
            removed_at_ms: None,
        };
        let viewers: HashSet<String> = ["a".to_string()].into_iter().collect();
        replicator.note_bullet_spawn(&bullet, &viewers);

        let world = PhysicsWorld::new();
        let players: HashMap<String, Player> = HashMap::new();
        let _ = &world;
        let visible: HashSet<String> = ["a".to_string()].into_iter().collect();
        let delta = replicator.build_delta("a", 0, 0, &visible, &players, None);
        assert_eq!(delta.bullets_added.len(), 1);

        replicator.note_bullet_removed(1);
        let delta2 = replicator.build_delta("a", 1, 16, &visible, &players, None);
        assert_eq!(delta2.bullets_removed, vec![1]);
    }
}
