//! Wire messages and framing. Delivery ordering/reliability is provided by
//! the underlying TCP stream, so there is no sequence/ack header here — just
//! a length prefix and an rkyv payload.

use rkyv::{Archive, Deserialize, Serialize, rancor};

use crate::error::FrameError;
use crate::event::GameEvent;

pub const DEFAULT_PORT: u16 = 27015;
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct InputMsg {
    pub seq: u32,
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub angle: f32,
}

#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum ClientMessage {
    Join { room: String },
    Input(InputMsg),
    Shoot { angle: f32 },
    Ping,
}

#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct PlayerDelta {
    pub session_id: String,
    pub full: bool,
    pub position: Option<[f32; 2]>,
    pub facing: Option<f32>,
    pub health: Option<u32>,
}

#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct BulletSpawn {
    pub id: u32,
    pub owner_id: String,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub speed: f32,
}

#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct DeltaMsg {
    pub tick: u32,
    pub server_time_ms: u64,
    pub players: Vec<PlayerDelta>,
    pub removed_players: Vec<String>,
    pub bullets_added: Vec<BulletSpawn>,
    pub bullets_removed: Vec<u32>,
    pub local_last_processed_seq: Option<u32>,
}

#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum ServerMessage {
    Joined { session_id: String },
    JoinDenied { reason: String },
    StateDelta(DeltaMsg),
    Event(GameEvent),
    Pong,
    Disconnected { reason: String },
}

/// Length-prefix an rkyv-encoded payload: `u32` little-endian byte count
/// followed by the bytes. Used identically for both message directions.
pub fn frame(payload: &[u8]) -> Result<Vec<u8>, FrameError> {
    if payload.len() > MAX_FRAME_SIZE {
        return Err(FrameError::TooLarge {
            len: payload.len(),
            max: MAX_FRAME_SIZE,
        });
    }
    let mut framed = Vec::with_capacity(payload.len() + 4);
    framed.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    framed.extend_from_slice(payload);
    Ok(framed)
}

impl ClientMessage {
    pub fn serialize(&self) -> Result<Vec<u8>, FrameError> {
        let bytes = rkyv::to_bytes::<rancor::Error>(self)
            .map(|aligned| aligned.into_vec())
            .map_err(FrameError::Serialize)?;
        frame(&bytes)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, FrameError> {
        rkyv::from_bytes::<Self, rancor::Error>(bytes).map_err(FrameError::Deserialize)
    }
}

impl ServerMessage {
    pub fn serialize(&self) -> Result<Vec<u8>, FrameError> {
        let bytes = rkyv::to_bytes::<rancor::Error>(self)
            .map(|aligned| aligned.into_vec())
            .map_err(FrameError::Serialize)?;
        frame(&bytes)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, FrameError> {
        rkyv::from_bytes::<Self, rancor::Error>(bytes).map_err(FrameError::Deserialize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_message_roundtrip() {
        let msg = ClientMessage::Input(InputMsg {
            seq: 7,
            up: true,
            down: false,
            left: false,
            right: true,
            angle: 1.5,
        });
        let framed = msg.serialize().unwrap();
        let len = u32::from_le_bytes(framed[0..4].try_into().unwrap()) as usize;
        let decoded = ClientMessage::deserialize(&framed[4..4 + len]).unwrap();
        match decoded {
            ClientMessage::Input(i) => {
                assert_eq!(i.seq, 7);
                assert!(i.up);
                assert!(i.right);
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn server_message_roundtrip() {
        let msg = ServerMessage::Joined {
            session_id: "abc123".into(),
        };
        let framed = msg.serialize().unwrap();
        let len = u32::from_le_bytes(framed[0..4].try_into().unwrap()) as usize;
        let decoded = ServerMessage::deserialize(&framed[4..4 + len]).unwrap();
        assert!(matches!(decoded, ServerMessage::Joined { session_id } if session_id == "abc123"));
    }
}
