mod intake;
mod tick;

pub use intake::IntakeQueue;
pub use tick::FixedTimestep;
