pub mod bullet;
pub mod connection;
pub mod interpolator;
pub mod predictor;

pub use bullet::{BulletTracker, LocalBullet};
pub use connection::Connection;
pub use interpolator::RemoteInterpolator;
pub use predictor::ClientPredictor;
