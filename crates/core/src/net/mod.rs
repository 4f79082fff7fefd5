mod protocol;

pub use protocol::{
    BulletSpawn, ClientMessage, DEFAULT_PORT, DeltaMsg, InputMsg, MAX_FRAME_SIZE, PlayerDelta,
    ServerMessage, frame,
};
