//! Agents: players and creatures sharing the world clock
//!
//! Every agent carries a `Role` tag instead of being a distinct type, and a
//! `Behavior` chosen once when it is created.

mod behavior;
mod faction;
mod health;

pub use behavior::{Behavior, Decision, Intent};
pub use faction::Factions;
pub use health::Health;

use core::fmt;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::consts::DEFAULT_SPAWN_STEPS;
use crate::pathing::PathingMap;

/// Unique identifier for agent instances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub u32);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Cell plus floor index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub floor: usize,
}

impl Position {
    pub const fn new(x: i32, y: i32, floor: usize) -> Self {
        Self { x, y, floor }
    }

    pub const fn xy(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    /// Chebyshev distance on the same floor, `None` across floors
    pub fn distance(&self, other: &Position) -> Option<i32> {
        (self.floor == other.floor)
            .then(|| (self.x - other.x).abs().max((self.y - other.y).abs()))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}) on floor {}", self.x, self.y, self.floor)
    }
}

/// Capability tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum Role {
    /// Tracked by the session: drives the turn lock and the loss check
    Player,
    /// Autonomous; acts inside the engine loop without locking
    Creature,
}

/// Lifecycle of an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum AgentStatus {
    Active,
    /// Health at minimum; still tracked until removed
    Incapacitated,
    Removed,
}

/// Cached pathing map and the inputs it was built from
#[derive(Debug, Clone)]
pub struct CachedPath {
    /// Asker position when the map was built
    pub origin: Position,
    pub map: PathingMap,
}

/// Registry of every agent in a session
pub type Roster = HashMap<AgentId, Agent>;

/// A player or creature on the grid
#[derive(Debug, Clone)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub role: Role,
    pub status: AgentStatus,
    pub pos: Position,
    pub factions: Factions,
    pub anti_factions: Factions,
    pub health: Health,
    /// Maximum damage per hit
    pub damage: u32,
    pub behavior: Behavior,

    /// Actions this agent has taken
    pub current_turn: u64,
    /// Spawn a creature every this many of its own actions; 0 disables
    pub spawn_steps: u32,
    /// Waits for submitted intents instead of resolving its behavior
    pub manual: bool,

    pub xp: u32,
    pub total_xp_earned: u32,
    /// Kill credit accumulated from kills
    pub total_kp_earned: u32,
    /// Kills per victim name
    pub conquest: HashMap<String, u32>,
    pub alignment: i32,
    pub gold: u32,

    /// Difficulty granted to whoever kills this agent
    pub difficulty: u32,
    /// Xp granted to whoever kills this agent
    pub kill_xp: u32,

    path: Option<CachedPath>,
}

impl Agent {
    fn base(id: AgentId, name: &str, role: Role, pos: Position, hp: i32, damage: u32) -> Self {
        Self {
            id,
            name: name.to_string(),
            role,
            status: AgentStatus::Active,
            pos,
            factions: Factions::empty(),
            anti_factions: Factions::empty(),
            health: Health::new(hp),
            damage,
            behavior: Behavior::Idle,
            current_turn: 0,
            spawn_steps: 0,
            manual: false,
            xp: 0,
            total_xp_earned: 0,
            total_kp_earned: 0,
            conquest: HashMap::new(),
            alignment: 0,
            gold: 0,
            difficulty: 1,
            kill_xp: 1,
            path: None,
        }
    }

    /// Player hostile to monsters, exploring by default
    pub fn player(id: AgentId, name: &str, pos: Position, hp: i32, damage: u32) -> Self {
        let mut agent = Self::base(id, name, Role::Player, pos, hp, damage);
        agent.factions = Factions::PLAYER;
        agent.anti_factions = Factions::MONSTER;
        agent.behavior = Behavior::Explore;
        agent.spawn_steps = DEFAULT_SPAWN_STEPS;
        agent
    }

    /// Creature hostile to players, hunting by default
    pub fn creature(id: AgentId, name: &str, pos: Position, hp: i32, damage: u32) -> Self {
        let mut agent = Self::base(id, name, Role::Creature, pos, hp, damage);
        agent.factions = Factions::MONSTER;
        agent.anti_factions = Factions::PLAYER;
        agent.behavior = Behavior::Hunt;
        agent
    }

    pub fn with_behavior(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn with_spawn_steps(mut self, steps: u32) -> Self {
        self.spawn_steps = steps;
        self
    }

    pub fn with_manual(mut self, manual: bool) -> Self {
        self.manual = manual;
        self
    }

    pub fn with_rewards(mut self, difficulty: u32, kill_xp: u32, gold: u32) -> Self {
        self.difficulty = difficulty;
        self.kill_xp = kill_xp;
        self.gold = gold;
        self
    }

    /// Cut the name to at most `len` characters
    pub fn truncate_name(&mut self, len: usize) {
        if let Some((idx, _)) = self.name.char_indices().nth(len) {
            self.name.truncate(idx);
        }
    }

    pub const fn is_player(&self) -> bool {
        matches!(self.role, Role::Player)
    }

    /// Active and above minimum health
    pub const fn is_viable(&self) -> bool {
        matches!(self.status, AgentStatus::Active) && !self.health.at_min()
    }

    /// Hostile to `other` and not the same agent
    pub fn can_attack(&self, other: &Agent) -> bool {
        self.id != other.id && self.anti_factions.hostile_to(other.factions)
    }

    pub fn gain_xp(&mut self, xp: u32) {
        self.xp += xp;
        self.total_xp_earned += xp;
    }

    pub fn score(&self) -> u64 {
        self.current_turn + u64::from(self.gold) + u64::from(self.total_xp_earned)
    }

    /// Cached map if it still matches the current position and `target`
    pub fn cached_path(&self, target: (i32, i32)) -> Option<&PathingMap> {
        self.path
            .as_ref()
            .filter(|c| {
                c.origin == self.pos && c.map.target() == target && c.map.floor() == self.pos.floor
            })
            .map(|c| &c.map)
    }

    /// Most recent map regardless of staleness
    pub fn last_path(&self) -> Option<&PathingMap> {
        self.path.as_ref().map(|c| &c.map)
    }

    pub fn store_path(&mut self, map: PathingMap) {
        self.path = Some(CachedPath {
            origin: self.pos,
            map,
        });
    }

    pub fn clear_path(&mut self) {
        self.path = None;
    }
}
