use rkyv::rancor;

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame exceeds maximum size ({len} > {max})")]
    TooLarge { len: usize, max: usize },
    #[error("serialization failed: {0}")]
    Serialize(rancor::Error),
    #[error("deserialization failed: {0}")]
    Deserialize(rancor::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("room is full")]
    Full,
    #[error("unknown session {0}")]
    UnknownSession(String),
    #[error("physics step produced non-finite state, room halted")]
    PhysicsFault,
}
