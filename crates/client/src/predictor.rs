//! Client-side prediction: a private mirror of the server's player physics
//! (same disk, same damping, same arena walls, no other players), plus an
//! input history replayed on reconciliation. The mirror is a real
//! `arena_core::PhysicsWorld` instance rather than a hand-rolled kinematic
//! integrator, since the server side it mirrors is itself a real physics
//! body.

use std::collections::VecDeque;

use arena_core::constants::PLAYER_SPEED;
use arena_core::physics::PhysicsHandle;
use arena_core::{Input, PhysicsWorld};
use glam::Vec2;

/// ~2 s of input at 60 Hz; older entries must already be acknowledged or
/// the connection is effectively dead.
const INPUT_HISTORY_CAP: usize = 120;

pub struct ClientPredictor {
    physics: PhysicsWorld,
    handle: PhysicsHandle,
    history: VecDeque<Input>,
    facing: f32,
}

impl ClientPredictor {
    pub fn new(spawn: Vec2) -> Self {
        let mut physics = PhysicsWorld::new();
        let handle = physics.add_player(spawn);
        Self {
            physics,
            handle,
            history: VecDeque::with_capacity(INPUT_HISTORY_CAP),
            facing: 0.0,
        }
    }

    /// Apply a freshly captured local input: push it to history, set the
    /// mirror body's velocity, step the mirror physics one tick.
    pub fn apply_input(&mut self, input: Input) -> Vec2 {
        let (dx, dy) = input.move_direction();
        self.physics
            .set_body_velocity(self.handle, Vec2::new(dx, dy) * PLAYER_SPEED);
        self.physics.step();
        self.facing = input.angle;

        self.history.push_back(input);
        while self.history.len() > INPUT_HISTORY_CAP {
            self.history.pop_front();
        }

        self.predicted_position()
    }

    /// Reconcile against an authoritative state update: teleport to the
    /// server position, drop acknowledged inputs, and replay the rest.
    pub fn reconcile(&mut self, server_position: Vec2, last_processed_seq: u32) {
        self.physics.set_body_position(self.handle, server_position);
        self.physics.set_body_velocity(self.handle, Vec2::ZERO);
        self.history.retain(|input| input.seq > last_processed_seq);

        let pending: Vec<Input> = self.history.iter().copied().collect();
        for input in pending {
            let (dx, dy) = input.move_direction();
            self.physics
                .set_body_velocity(self.handle, Vec2::new(dx, dy) * PLAYER_SPEED);
            self.physics.step();
            self.facing = input.angle;
        }
    }

    pub fn predicted_position(&self) -> Vec2 {
        self.physics.body_position(self.handle).unwrap_or(Vec2::ZERO)
    }

    pub fn predicted_facing(&self) -> f32 {
        self.facing
    }

    pub fn pending_input_count(&self) -> usize {
        self.history.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn held(up: bool, down: bool, left: bool, right: bool, seq: u32) -> Input {
        Input {
            seq,
            up,
            down,
            left,
            right,
            angle: 0.0,
        }
    }

    #[test]
    fn reconciliation_replays_unacked_inputs_from_server_position() {
        let mut predictor = ClientPredictor::new(Vec2::ZERO);
        predictor.apply_input(held(true, false, false, false, 1));
        predictor.apply_input(held(true, false, false, false, 2));
        let before_reconcile = predictor.predicted_position();
        assert!(before_reconcile.y < 0.0, "held up should move -y");

        // Server only acked seq 1; reapplying seq 2 from its position
        // should land past it, not snap back to it.
        predictor.reconcile(Vec2::new(0.0, -5.0), 1);
        assert_eq!(predictor.pending_input_count(), 1);
        assert!(predictor.predicted_position().y < -5.0);
    }

    #[test]
    fn fully_acked_history_leaves_server_position_untouched_by_replay() {
        let mut predictor = ClientPredictor::new(Vec2::ZERO);
        predictor.apply_input(held(true, false, false, false, 1));
        predictor.reconcile(Vec2::new(10.0, 20.0), 1);
        assert_eq!(predictor.pending_input_count(), 0);
        assert_eq!(predictor.predicted_position(), Vec2::new(10.0, 20.0));
    }

    #[test]
    fn history_is_bounded() {
        let mut predictor = ClientPredictor::new(Vec2::ZERO);
        for seq in 1..=(INPUT_HISTORY_CAP as u32 + 50) {
            predictor.apply_input(held(false, false, false, true, seq));
        }
        assert_eq!(predictor.pending_input_count(), INPUT_HISTORY_CAP);
    }
}
