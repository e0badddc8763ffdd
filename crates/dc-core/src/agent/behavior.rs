//! Behavior strategies
//!
//! A behavior turns the current view of the world into an `Intent`. It never
//! mutates anything itself: the scheduler applies the intent afterwards.

use serde::{Deserialize, Serialize};
use strum::Display;

use super::{Agent, AgentId, Roster};
use crate::pathing::{PassMode, PathingMap, Topology};
use crate::rng::GameRng;
use crate::world::WorldMap;

/// Strategy selected when an agent is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display)]
pub enum Behavior {
    /// Never moves
    #[default]
    Idle,
    /// Random steps over walkable terrain
    Wander,
    /// Heads for the floor exit and takes it
    Explore,
    /// Chases the nearest agent it can attack
    Hunt,
}

/// What an agent wants to do this action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    Wait,
    /// Skip the move and recover health
    Rest,
    Move(i32, i32),
    Attack(AgentId),
    /// Take the stairs down
    Descend,
}

/// Read-only inputs to one decision
pub struct Decision<'a> {
    pub agent: &'a Agent,
    pub roster: &'a Roster,
    pub world: &'a dyn WorldMap,
    /// The agent's map toward `Behavior::goal`, when it has one
    pub map: Option<&'a PathingMap>,
    pub topology: Topology,
    pub heal_below_percent: u32,
}

impl Behavior {
    /// Default exploration strategy for a player template's `ai` name
    pub fn from_template(ai: Option<&str>) -> Self {
        match ai {
            Some("Wander") => Behavior::Wander,
            _ => Behavior::Explore,
        }
    }

    /// Passability rules used for this behavior's map
    pub const fn pass_mode(&self) -> PassMode {
        match self {
            Behavior::Hunt => PassMode::Full,
            _ => PassMode::Simple,
        }
    }

    /// Cell the agent's pathing map should lead to
    pub fn goal(&self, agent: &Agent, roster: &Roster, world: &dyn WorldMap) -> Option<(i32, i32)> {
        match self {
            Behavior::Idle | Behavior::Wander => None,
            Behavior::Explore => world.exit_point(agent.pos.floor),
            Behavior::Hunt => nearest_enemy(agent, roster).map(|enemy| enemy.pos.xy()),
        }
    }

    /// Resolve an intent
    pub fn decide(&self, decision: &Decision<'_>, rng: &mut GameRng) -> Intent {
        if *self == Behavior::Idle {
            return Intent::Wait;
        }
        let agent = decision.agent;

        if let Some(target) = adjacent_enemy(agent, decision.roster, decision.topology) {
            return Intent::Attack(target);
        }
        if agent.is_player() && agent.health.percent() < decision.heal_below_percent {
            return Intent::Rest;
        }

        match self {
            Behavior::Explore => {
                if Some(agent.pos.xy()) == decision.world.exit_point(agent.pos.floor) {
                    return Intent::Descend;
                }
                follow(decision).unwrap_or_else(|| random_step(decision, rng))
            }
            Behavior::Hunt => follow(decision).unwrap_or_else(|| random_step(decision, rng)),
            Behavior::Wander => random_step(decision, rng),
            Behavior::Idle => Intent::Wait,
        }
    }

    /// Hook run when the agent is moved to another floor
    pub fn on_floor_change(&self, agent: &mut Agent) {
        agent.clear_path();
    }
}

fn nearest_enemy<'a>(agent: &Agent, roster: &'a Roster) -> Option<&'a Agent> {
    roster
        .values()
        .filter(|other| other.is_viable() && agent.can_attack(other))
        .filter_map(|other| agent.pos.distance(&other.pos).map(|d| (d, other)))
        .min_by_key(|(d, other)| (*d, other.id))
        .map(|(_, other)| other)
}

fn adjacent_enemy(agent: &Agent, roster: &Roster, topology: Topology) -> Option<AgentId> {
    roster
        .values()
        .filter(|other| {
            other.pos.floor == agent.pos.floor
                && other.is_viable()
                && agent.can_attack(other)
                && topology.adjacent(agent.pos.xy(), other.pos.xy())
        })
        .map(|other| other.id)
        .min()
}

fn follow(decision: &Decision<'_>) -> Option<Intent> {
    let (x, y) = decision.map?.next_step(decision.agent.pos.xy())?;
    Some(Intent::Move(x, y))
}

fn random_step(decision: &Decision<'_>, rng: &mut GameRng) -> Intent {
    let agent = decision.agent;
    let floor = agent.pos.floor;
    let open: Vec<(i32, i32)> = decision
        .topology
        .deltas()
        .iter()
        .map(|(dx, dy)| (agent.pos.x + dx, agent.pos.y + dy))
        .filter(|&(x, y)| {
            decision.world.is_tile_passable(x, y, floor)
                && decision.world.entity_at(x, y, floor).is_none()
        })
        .collect();
    match rng.pick(&open) {
        Some(&(x, y)) => Intent::Move(x, y),
        None => Intent::Wait,
    }
}
