//! Simulated world
//!
//! The navigable track, the physics that turns rider power into speed, and
//! the pack of bicycles riding on it.

pub mod navigation;
pub mod pack;
pub mod physics;
pub mod route;

pub use navigation::{NavPath, Navigator, PathStatus};
pub use pack::{Agent, AgentArena, AgentId, AgentRole, FormationState, PackError, TaskStatus};
pub use physics::{DragProfile, SpeedModel};
pub use route::{Course, TrackNavigator};
