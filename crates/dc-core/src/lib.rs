//! dc-core: turn coordination and movement validity for a dungeon crawl
//!
//! Several players and creatures share one grid world. A single turn lock
//! serializes their actions, a scheduler rotates through them, and pathing
//! maps built from a per-agent passability oracle drive movement.
//!
//! This crate has no rendering or input; drive a `Session` by advancing its
//! virtual clock and draining its events.

pub mod agent;
pub mod combat;
pub mod config;
pub mod engine;
pub mod error;
pub mod pathing;
pub mod session;
pub mod spawn;
pub mod world;

mod consts;
mod rng;

pub use consts::*;
pub use error::{ConfigError, MapError, SessionError};
pub use rng::GameRng;
pub use session::{Session, SessionEvent, SessionState};
