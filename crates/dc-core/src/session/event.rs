//! Notifications for presentation layers

use serde::{Deserialize, Serialize};

use crate::agent::AgentId;

/// Something observers should react to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A batch of player turns completed, or the map changed under them
    Redraw,
    /// A player was incapacitated
    Die { agent: AgentId, killer: Option<AgentId> },
    /// A creature was incapacitated and removed
    Slain { agent: AgentId, killer: Option<AgentId> },
    /// Every player is incapacitated; fires once
    GameOver,
    /// The victory condition held; fires once
    Victory,
    Spawned { agent: AgentId, by: AgentId },
    Descend { floor: usize },
    Ascend { floor: usize },
}
