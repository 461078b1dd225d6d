//! Authoritative game state and the session actor

pub mod capture;
pub mod force_field;
pub mod palette;
pub mod phase;
pub mod registry;
pub mod session;
pub mod snapshot;
pub mod territory;
pub mod world;

pub use force_field::ForceField;
pub use phase::MatchMetadata;
pub use session::{GameSession, SessionHandle, SessionSettings};
pub use territory::Territory;
pub use world::Player;
