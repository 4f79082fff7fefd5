pub mod constants;
pub mod error;
pub mod event;
pub mod interest;
pub mod model;
pub mod net;
pub mod physics;
pub mod replication;
pub mod room;
pub mod session;
pub mod simulation;

pub use error::{FrameError, RoomError};
pub use event::{EventQueue, GameEvent};
pub use interest::InterestManager;
pub use model::{Arena, Bullet, Input, Player, PlayerDirty};
pub use physics::PhysicsWorld;
pub use replication::StateReplicator;
pub use room::{Room, RoomConfig, TickOutput};
pub use session::{ClientSession, SessionStatus};
pub use simulation::{FixedTimestep, IntakeQueue};
