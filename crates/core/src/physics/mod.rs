mod world;

pub use rapier2d::dynamics::RigidBodyHandle as PhysicsHandle;
pub use world::PhysicsWorld;
