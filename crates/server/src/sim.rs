//! The simulation task: owns the single `Room` for this process and is the
//! only task that ever mutates it. Everything else reaches it through
//! `control_rx`/`input_rx` and reads its output back out through each
//! session's outbox.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use arena_core::net::ServerMessage;
use arena_core::{Room, RoomConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;
use tokio::time::{self, Duration, Instant};

use crate::connection::{ControlMsg, InputEnvelope, JoinReply};

const SESSION_ID_LEN: usize = 16;
const SESSION_ID_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// A random, URL-safe session id minted on JOIN. No connection-challenge
/// salt is needed since the transport is a single TCP stream per session.
fn random_session_id(rng: &mut impl Rng) -> String {
    (0..SESSION_ID_LEN)
        .map(|_| SESSION_ID_ALPHABET[rng.random_range(0..SESSION_ID_ALPHABET.len())] as char)
        .collect()
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_millis() as u64
}

pub async fn run(
    config: RoomConfig,
    mut control_rx: mpsc::UnboundedReceiver<ControlMsg>,
    mut input_rx: mpsc::Receiver<InputEnvelope>,
) {
    let tick_rate = config.tick_rate;
    let mut room = Room::new(config);
    let mut outboxes: HashMap<String, mpsc::UnboundedSender<ServerMessage>> = HashMap::new();
    let mut rng = StdRng::from_os_rng();
    let mut halted = false;

    let mut ticker = time::interval(Duration::from_secs_f64(1.0 / tick_rate as f64));
    let mut last = Instant::now();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = Instant::now();
                let dt = (now - last).as_secs_f32();
                last = now;
                if !halted {
                    halted = !advance_and_broadcast(&mut room, &mut outboxes, dt);
                }
            }
            msg = control_rx.recv() => {
                match msg {
                    Some(msg) => handle_control(&mut room, &mut outboxes, &mut rng, halted, msg),
                    None => break,
                }
            }
            envelope = input_rx.recv() => {
                match envelope {
                    Some(envelope) if !halted => room.push_input(&envelope.session_id, envelope.input),
                    Some(_) => {}
                    None => break,
                }
            }
        }

        if halted && outboxes.is_empty() {
            break;
        }
    }
}

/// Advances the room one tick's worth of time and broadcasts the results.
/// Returns `false` once the room has hit a fatal fault, at which point the
/// caller stops ticking it.
fn advance_and_broadcast(
    room: &mut Room,
    outboxes: &mut HashMap<String, mpsc::UnboundedSender<ServerMessage>>,
    dt: f32,
) -> bool {
    let outputs = match room.advance(dt) {
        Ok(outputs) => outputs,
        Err(err) => {
            log::error!("room halted: {err}");
            for outbox in outboxes.values() {
                let _ = outbox.send(ServerMessage::Disconnected {
                    reason: err.to_string(),
                });
            }
            outboxes.clear();
            return false;
        }
    };

    for output in outputs {
        for (session_id, delta) in output.deltas {
            if let Some(outbox) = outboxes.get(&session_id) {
                let _ = outbox.send(ServerMessage::StateDelta(delta));
            }
        }
        for event in output.events {
            for outbox in outboxes.values() {
                let _ = outbox.send(ServerMessage::Event(event.clone()));
            }
        }
        for session_id in output.destroyed_sessions {
            outboxes.remove(&session_id);
        }
    }

    true
}

fn handle_control(
    room: &mut Room,
    outboxes: &mut HashMap<String, mpsc::UnboundedSender<ServerMessage>>,
    rng: &mut impl Rng,
    halted: bool,
    msg: ControlMsg,
) {
    match msg {
        ControlMsg::Join { outbox, reply } => {
            if halted {
                let _ = reply.send(JoinReply::Denied("room is no longer accepting players".into()));
                return;
            }
            let session_id = random_session_id(rng);
            match room.join(session_id.clone()) {
                Ok(()) => {
                    log::info!("{session_id} joined, {} players in room", room.player_count());
                    outboxes.insert(session_id.clone(), outbox);
                    let _ = reply.send(JoinReply::Joined(session_id));
                }
                Err(err) => {
                    log::warn!("join refused: {err}");
                    let _ = reply.send(JoinReply::Denied(err.to_string()));
                }
            }
        }
        ControlMsg::Shoot { session_id, angle } => {
            room.handle_shoot(&session_id, angle, now_ms());
        }
        ControlMsg::Ping { session_id } => {
            if let Some(outbox) = outboxes.get(&session_id) {
                let _ = outbox.send(ServerMessage::Pong);
            }
        }
        ControlMsg::Closed {
            session_id,
            consented,
        } => {
            log::info!("{session_id} disconnected (consented={consented})");
            room.disconnect(&session_id, consented);
            if consented {
                outboxes.remove(&session_id);
            }
        }
    }
}
