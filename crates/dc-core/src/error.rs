//! Error types
//!
//! Only conditions that end a session surface here. Unreachable targets,
//! lock contention, actions after game over and floor-bound violations are
//! all recovered where they happen.

use thiserror::Error;

use crate::agent::{AgentId, Position};

/// Fatal session faults
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("No terrain layer for floor {floor}")]
    MissingFloor { floor: usize },

    #[error("Unknown agent {0}")]
    UnknownAgent(AgentId),

    #[error("Session has no player agents")]
    NoPlayers,

    #[error("Cannot place agent {agent} at {pos}: cell is blocked")]
    Blocked { agent: AgentId, pos: Position },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Problems building a floor from ASCII art
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MapError {
    #[error("Map has no rows")]
    Empty,

    #[error("Row {row} has width {found}, expected {expected}")]
    Ragged { row: usize, expected: usize, found: usize },

    #[error("Unknown glyph '{glyph}' at ({x}, {y})")]
    UnknownGlyph { glyph: char, x: usize, y: usize },
}

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
