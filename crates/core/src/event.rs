//! Out-of-band broadcasts. Unlike state deltas these bypass per-client view
//! filtering entirely — every connected session receives them.
//!
//! Delivery is over TCP, already ordered and reliable, so this carries no
//! ack/ttl/retry bookkeeping — just a tick-tagged FIFO drained once per tick.

use std::collections::VecDeque;

use rkyv::{Archive, Deserialize, Serialize};

#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum GameEvent {
    Kill {
        target_id: String,
        killer_id: String,
    },
    /// Optional per-hit notice, redundant with the next state delta and
    /// never required for correctness.
    Hit {
        target_id: String,
        shooter_id: String,
        damage: u32,
        health: u32,
    },
}

struct Pending {
    tick: u32,
    event: GameEvent,
}

#[derive(Default)]
pub struct EventQueue {
    pending: VecDeque<Pending>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tick: u32, event: GameEvent) {
        self.pending.push_back(Pending { tick, event });
    }

    /// Drain every event queued for `tick`, in push order.
    pub fn drain_for_tick(&mut self, tick: u32) -> Vec<GameEvent> {
        let mut result = Vec::new();
        let mut i = 0;
        while i < self.pending.len() {
            if self.pending[i].tick == tick {
                result.push(self.pending.remove(i).unwrap().event);
            } else {
                i += 1;
            }
        }
        result
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_only_matching_tick_in_order() {
        let mut queue = EventQueue::new();
        queue.push(
            3,
            GameEvent::Kill {
                target_id: "a".into(),
                killer_id: "b".into(),
            },
        );
        queue.push(
            4,
            GameEvent::Kill {
                target_id: "c".into(),
                killer_id: "d".into(),
            },
        );
        queue.push(
            3,
            GameEvent::Hit {
                target_id: "a".into(),
                shooter_id: "b".into(),
                damage: 20,
                health: 0,
            },
        );

        let drained = queue.drain_for_tick(3);
        assert_eq!(drained.len(), 2);
        assert!(matches!(drained[0], GameEvent::Kill { .. }));
        assert!(matches!(drained[1], GameEvent::Hit { .. }));

        let remaining = queue.drain_for_tick(4);
        assert_eq!(remaining.len(), 1);
        assert!(queue.is_empty());
    }
}
