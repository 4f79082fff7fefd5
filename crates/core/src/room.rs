//! Ties the simulation core, interest manager, and state replicator into
//! the single authoritative timeline a server process drives. Everything
//! here is transport-agnostic: the server crate feeds it inputs/shoots and
//! drains deltas, and owns the actual sockets.

use std::collections::HashMap;

use rand::SeedableRng;

use crate::constants::{
    BULLET_MAX_DISTANCE, BULLET_RADIUS, BULLET_REMOVE_GRACE_MS, BULLET_SPEED, MAP_HALF_SIZE,
    PLAYER_RADIUS, PLAYER_SPEED, RECONNECT_GRACE_SECS, SHOOT_COOLDOWN_MS, TICK_RATE,
    VISIBILITY_REFRESH_MS,
};
use crate::error::RoomError;
use crate::event::{EventQueue, GameEvent};
use crate::interest::InterestManager;
use crate::model::{Arena, Bullet, Input, Player};
use crate::net::DeltaMsg;
use crate::physics::PhysicsWorld;
use crate::replication::StateReplicator;
use crate::session::{ClientSession, SessionStatus};
use crate::simulation::{FixedTimestep, IntakeQueue};

#[derive(Debug, Clone)]
pub struct RoomConfig {
    pub tick_rate: u32,
    pub max_clients: usize,
    pub reconnect_grace_ms: u64,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            tick_rate: TICK_RATE,
            max_clients: 16,
            reconnect_grace_ms: RECONNECT_GRACE_SECS * 1_000,
        }
    }
}

pub struct TickOutput {
    pub tick: u32,
    pub deltas: HashMap<String, DeltaMsg>,
    pub events: Vec<GameEvent>,
    pub destroyed_sessions: Vec<String>,
}

pub struct Room {
    config: RoomConfig,
    physics: PhysicsWorld,
    players: HashMap<String, Player>,
    bullets: HashMap<u32, Bullet>,
    next_bullet_id: u32,
    sessions: HashMap<String, ClientSession>,
    intakes: HashMap<String, IntakeQueue>,
    interest: InterestManager,
    replicator: StateReplicator,
    events: EventQueue,
    timestep: FixedTimestep,
    tick: u32,
    server_time_ms: u64,
    last_interest_refresh_ms: u64,
    rng: rand::rngs::StdRng,
}

impl Room {
    pub fn new(config: RoomConfig) -> Self {
        let tick_rate = config.tick_rate;
        Self {
            config,
            physics: PhysicsWorld::new(),
            players: HashMap::new(),
            bullets: HashMap::new(),
            next_bullet_id: 0,
            sessions: HashMap::new(),
            intakes: HashMap::new(),
            interest: InterestManager::new(),
            replicator: StateReplicator::new(),
            events: EventQueue::new(),
            timestep: FixedTimestep::new(tick_rate),
            tick: 0,
            server_time_ms: 0,
            last_interest_refresh_ms: 0,
            rng: rand::rngs::StdRng::from_os_rng(),
        }
    }

    pub fn tick(&self) -> u32 {
        self.tick
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn last_processed_seq(&self, session_id: &str) -> Option<u32> {
        self.players.get(session_id).map(|p| p.last_processed_seq)
    }

    /// Admit a new session at a random spawn point.
    pub fn join(&mut self, session_id: impl Into<String>) -> Result<(), RoomError> {
        let session_id = session_id.into();
        if self.players.len() >= self.config.max_clients {
            return Err(RoomError::Full);
        }

        let spawn = Arena::random_spawn(&mut self.rng);
        let handle = self.physics.add_player(spawn);
        self.players
            .insert(session_id.clone(), Player::new(&session_id, spawn, handle));
        self.sessions
            .insert(session_id.clone(), ClientSession::new(&session_id));
        self.intakes.insert(session_id, IntakeQueue::default());
        Ok(())
    }

    pub fn push_input(&mut self, session_id: &str, input: Input) {
        if let Some(queue) = self.intakes.get_mut(session_id) {
            queue.push(input);
        }
    }

    /// Non-consensual transport drop: the player keeps simulating during
    /// the grace window. Consensual leave destroys it immediately.
    pub fn disconnect(&mut self, session_id: &str, consented: bool) {
        if consented {
            self.destroy_session(session_id);
            return;
        }
        if let Some(session) = self.sessions.get_mut(session_id) {
            session.begin_grace(self.server_time_ms, self.config.reconnect_grace_ms);
        }
    }

    pub fn reconnect(&mut self, session_id: &str) -> Result<(), RoomError> {
        match self.sessions.get_mut(session_id) {
            Some(session) => {
                session.reconnect();
                Ok(())
            }
            None => Err(RoomError::UnknownSession(session_id.to_string())),
        }
    }

    fn destroy_session(&mut self, session_id: &str) {
        if let Some(player) = self.players.remove(session_id) {
            self.physics.remove_body(player.physics_handle);
        }
        self.sessions.remove(session_id);
        self.intakes.remove(session_id);
        self.interest.drop_session(session_id);
        self.replicator.drop_session(session_id);
    }

    /// Handle SHOOT{angle} from a live player, applying the per-shooter
    /// cooldown. Spawns the bullet immediately (not deferred to the next
    /// tick boundary) and grants spawn-time visibility to nearby sessions.
    pub fn handle_shoot(&mut self, session_id: &str, angle: f32, now_ms: u64) {
        let Some(player) = self.players.get_mut(session_id) else {
            return;
        };
        if !player.is_alive() {
            return;
        }
        if let Some(last) = player.last_shot_at_ms {
            if now_ms.saturating_sub(last) < SHOOT_COOLDOWN_MS {
                return;
            }
        }
        player.last_shot_at_ms = Some(now_ms);

        let offset = PLAYER_RADIUS + BULLET_RADIUS + 5.0;
        let origin = player.position + glam::Vec2::new(angle.cos(), angle.sin()) * offset;
        let velocity = glam::Vec2::new(angle.cos(), angle.sin()) * BULLET_SPEED;
        let handle = self.physics.add_bullet(origin, velocity);

        let id = self.next_bullet_id;
        self.next_bullet_id = self.next_bullet_id.wrapping_add(1);
        let bullet = Bullet {
            id,
            owner_id: session_id.to_string(),
            spawn_x: origin.x,
            spawn_y: origin.y,
            angle,
            speed: BULLET_SPEED,
            spawned_at_ms: now_ms,
            physics_handle: Some(handle),
            removed_at_ms: None,
        };

        let positions: HashMap<String, glam::Vec2> = self
            .players
            .iter()
            .map(|(id, p)| (id.clone(), p.position))
            .collect();
        let viewers = self.interest.sessions_seeing_point(origin, &positions);
        self.replicator.note_bullet_spawn(&bullet, &viewers);
        self.bullets.insert(id, bullet);
    }

    /// Advance real elapsed time; runs zero or more fixed ticks. Stops and
    /// reports `RoomError::PhysicsFault` the first time the physics engine
    /// produces non-finite state — the caller is expected to tear the room
    /// down rather than keep ticking a corrupted simulation.
    pub fn advance(&mut self, delta_secs: f32) -> Result<Vec<TickOutput>, RoomError> {
        self.timestep.accumulate(delta_secs);
        let mut outputs = Vec::new();
        while self.timestep.consume_tick() {
            outputs.push(self.step()?);
        }
        Ok(outputs)
    }

    fn step(&mut self) -> Result<TickOutput, RoomError> {
        self.server_time_ms += (1000.0 / self.config.tick_rate as f32) as u64;

        self.apply_inputs();
        self.physics.step();
        if self.physics.has_non_finite_state() {
            log::error!("physics step produced non-finite state, halting room");
            return Err(RoomError::PhysicsFault);
        }
        self.sync_players_from_physics();
        self.update_bullets();
        let destroyed_sessions = self.expire_disconnected_sessions();

        if self.server_time_ms.saturating_sub(self.last_interest_refresh_ms) >= VISIBILITY_REFRESH_MS
        {
            self.refresh_interest();
            self.last_interest_refresh_ms = self.server_time_ms;
        }

        let events = self.events.drain_for_tick(self.tick);
        let deltas = self.build_deltas();

        for player in self.players.values_mut() {
            player.dirty.clear();
        }

        let output = TickOutput {
            tick: self.tick,
            deltas,
            events,
            destroyed_sessions,
        };
        self.tick = self.tick.wrapping_add(1);
        Ok(output)
    }

    fn apply_inputs(&mut self) {
        for (session_id, queue) in self.intakes.iter_mut() {
            let inputs = queue.drain();
            let Some(player) = self.players.get_mut(session_id) else {
                continue;
            };
            for input in inputs {
                if !player.is_alive() {
                    // Dropped: lastProcessedSeq must not advance for an
                    // input that was never actually simulated.
                    continue;
                }
                if input.seq <= player.last_processed_seq {
                    continue;
                }
                let (dx, dy) = input.move_direction();
                let velocity = glam::Vec2::new(dx, dy) * PLAYER_SPEED;
                self.physics.set_body_velocity(player.physics_handle, velocity);
                if input.angle != player.facing {
                    player.facing = input.angle;
                    player.dirty.facing = true;
                }
                player.last_processed_seq = input.seq;
                player.dirty.last_processed_seq = true;
            }
        }
    }

    fn sync_players_from_physics(&mut self) {
        for player in self.players.values_mut() {
            if let Some(pos) = self.physics.body_position(player.physics_handle) {
                if pos != player.position {
                    player.position = pos;
                    player.dirty.position = true;
                }
            }
            if let Some(vel) = self.physics.body_velocity(player.physics_handle) {
                player.velocity = vel;
            }
        }
    }

    fn update_bullets(&mut self) {
        let mut to_mark_removed = Vec::new();
        let mut kills = Vec::new();

        for bullet in self.bullets.values_mut() {
            if bullet.is_pending_removal() {
                continue;
            }
            let Some(handle) = bullet.physics_handle else {
                continue;
            };
            let Some(pos) = self.physics.body_position(handle) else {
                continue;
            };

            let from_spawn = (pos.x - bullet.spawn_x).hypot(pos.y - bullet.spawn_y);
            if from_spawn > BULLET_MAX_DISTANCE {
                to_mark_removed.push(bullet.id);
                continue;
            }
            if pos.x.abs() > MAP_HALF_SIZE + 100.0 || pos.y.abs() > MAP_HALF_SIZE + 100.0 {
                to_mark_removed.push(bullet.id);
                continue;
            }

            let mut hit = false;
            for (peer_id, player) in self.players.iter_mut() {
                if *peer_id == bullet.owner_id || !player.is_alive() {
                    continue;
                }
                let dist = pos.distance(player.position);
                if dist < PLAYER_RADIUS + BULLET_RADIUS {
                    let became_dead = player.apply_damage(crate::constants::BULLET_DAMAGE);
                    if became_dead {
                        kills.push(GameEvent::Kill {
                            target_id: peer_id.clone(),
                            killer_id: bullet.owner_id.clone(),
                        });
                    } else {
                        kills.push(GameEvent::Hit {
                            target_id: peer_id.clone(),
                            shooter_id: bullet.owner_id.clone(),
                            damage: crate::constants::BULLET_DAMAGE,
                            health: player.health,
                        });
                    }
                    hit = true;
                    break;
                }
            }
            if hit {
                to_mark_removed.push(bullet.id);
            }
        }

        for id in to_mark_removed {
            if let Some(bullet) = self.bullets.get_mut(&id) {
                if let Some(handle) = bullet.physics_handle.take() {
                    self.physics.remove_body(handle);
                }
                bullet.removed_at_ms = Some(self.server_time_ms);
            }
        }

        for event in kills {
            self.events.push(self.tick, event);
        }

        let grace = BULLET_REMOVE_GRACE_MS;
        let now = self.server_time_ms;
        let expired: Vec<u32> = self
            .bullets
            .values()
            .filter(|b| b.removed_at_ms.is_some_and(|t| now.saturating_sub(t) >= grace))
            .map(|b| b.id)
            .collect();
        for id in expired {
            self.bullets.remove(&id);
            self.replicator.note_bullet_removed(id);
        }
    }

    fn expire_disconnected_sessions(&mut self) -> Vec<String> {
        let expired: Vec<String> = self
            .sessions
            .iter()
            .filter(|(_, s)| s.grace_expired(self.server_time_ms))
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            self.destroy_session(id);
        }
        expired
    }

    fn refresh_interest(&mut self) {
        let positions: HashMap<String, glam::Vec2> = self
            .players
            .iter()
            .map(|(id, p)| (id.clone(), p.position))
            .collect();
        self.interest.refresh(&positions);
    }

    fn build_deltas(&mut self) -> HashMap<String, DeltaMsg> {
        let mut deltas = HashMap::new();
        let connected: Vec<String> = self
            .sessions
            .iter()
            .filter(|(_, s)| matches!(s.status, SessionStatus::Connected))
            .map(|(id, _)| id.clone())
            .collect();

        for session_id in connected {
            let Some(player) = self.players.get(&session_id) else {
                continue;
            };
            let visible = self
                .interest
                .visible_peers(&session_id)
                .cloned()
                .unwrap_or_else(|| [session_id.clone()].into_iter().collect());
            let last_seq = player
                .dirty
                .last_processed_seq
                .then_some(player.last_processed_seq);
            let delta = self.replicator.build_delta(
                &session_id,
                self.tick,
                self.server_time_ms,
                &visible,
                &self.players,
                last_seq,
            );
            deltas.insert(session_id, delta);
        }
        deltas
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idle_input(seq: u32) -> Input {
        Input {
            seq,
            up: false,
            down: false,
            left: false,
            right: false,
            angle: 0.0,
        }
    }

    #[test]
    fn spawn_then_idle_keeps_position_and_zero_velocity() {
        let mut room = Room::new(RoomConfig::default());
        room.join("p1").unwrap();
        let spawn = room.players.get("p1").unwrap().position;

        for _ in 0..65 {
            room.advance(1.0 / 60.0).unwrap();
        }

        let player = room.players.get("p1").unwrap();
        assert_eq!(player.position, spawn);
        assert!(player.velocity.length() < 0.01);
    }

    #[test]
    fn wasd_round_trip_moves_and_acks_seq() {
        let mut room = Room::new(RoomConfig::default());
        room.join("p1").unwrap();
        room.push_input(
            "p1",
            Input {
                seq: 1,
                up: true,
                down: false,
                left: false,
                right: false,
                angle: 0.0,
            },
        );

        room.advance(1.0 / 60.0).unwrap();

        let player = room.players.get("p1").unwrap();
        assert_eq!(player.last_processed_seq, 1);
        assert!(player.position.y < 0.0);
    }

    #[test]
    fn shoot_cooldown_admits_one_bullet_per_window() {
        let mut room = Room::new(RoomConfig::default());
        room.join("p1").unwrap();
        room.handle_shoot("p1", 0.0, 0);
        room.handle_shoot("p1", 0.0, 100);
        assert_eq!(room.bullets.len(), 1);
        room.handle_shoot("p1", 0.0, 250);
        assert_eq!(room.bullets.len(), 2);
    }

    #[test]
    fn bullet_kills_after_enough_hits() {
        let mut room = Room::new(RoomConfig::default());
        room.join("shooter").unwrap();
        room.join("target").unwrap();

        {
            let shooter = room.players.get_mut("shooter").unwrap();
            shooter.position = glam::Vec2::new(0.0, 0.0);
            room.physics.set_body_position(shooter.physics_handle, shooter.position);
        }
        {
            let target = room.players.get_mut("target").unwrap();
            target.position = glam::Vec2::new(200.0, 0.0);
            room.physics.set_body_position(target.physics_handle, target.position);
        }

        let mut kills = 0;
        let mut hits = 0;
        for i in 0..40 {
            room.handle_shoot("shooter", 0.0, i * SHOOT_COOLDOWN_MS);
            for _ in 0..20 {
                for output in room.advance(1.0 / 60.0).unwrap() {
                    for event in output.events {
                        match event {
                            GameEvent::Kill { .. } => kills += 1,
                            GameEvent::Hit { .. } => hits += 1,
                        }
                    }
                }
            }
            if kills > 0 {
                break;
            }
        }

        assert_eq!(kills, 1);
        assert!(hits >= 1);
        assert_eq!(room.players.get("target").unwrap().health, 0);
    }

    #[test]
    fn owner_is_immune_to_own_bullet() {
        let mut room = Room::new(RoomConfig::default());
        room.join("p1").unwrap();
        room.handle_shoot("p1", 0.0, 0);

        for _ in 0..200 {
            room.advance(1.0 / 60.0).unwrap();
        }

        assert_eq!(room.players.get("p1").unwrap().health, crate::constants::MAX_HEALTH);
    }
}
