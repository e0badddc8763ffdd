//! Session and dungeon configuration
//!
//! Loaded from JSON with every field optional, then adjusted by
//! `name=value` overrides (the same syntax the option strings use).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::ConfigError;
use crate::pathing::Topology;
use crate::session::VictoryCondition;

/// Tunables for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Round budget in milliseconds; each unlock waits `turn_delay / living`
    pub turn_delay_ms: u64,
    /// Default spawn interval handed to new players
    pub spawn_steps: u32,
    /// Kill xp at which kill credit saturates
    pub kill_xp_divisor: f64,
    /// Alignment lost for killing a player-faction agent
    pub friendly_kill_penalty: i32,
    /// Maximum agent name length
    pub name_length: usize,
    /// Players rest when health drops below this percentage
    pub heal_below_percent: u32,
    /// Adjacency used by every pathing map
    pub topology: Topology,
    /// Win predicate
    pub victory: VictoryCondition,
    /// Fixed RNG seed; entropy when absent
    pub seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            turn_delay_ms: DEFAULT_TURN_DELAY_MS,
            spawn_steps: DEFAULT_SPAWN_STEPS,
            kill_xp_divisor: DEFAULT_KILL_XP_DIVISOR,
            friendly_kill_penalty: DEFAULT_FRIENDLY_KILL_PENALTY,
            name_length: DEFAULT_NAME_LENGTH,
            heal_below_percent: DEFAULT_HEAL_BELOW_PERCENT,
            topology: Topology::Eight,
            victory: VictoryCondition::DeepestFloor,
            seed: None,
        }
    }
}

impl SessionConfig {
    /// Check values that would break turn pacing or kill credit
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.turn_delay_ms == 0 {
            return Err(ConfigError::Invalid("turn_delay_ms must be positive".into()));
        }
        if !(self.kill_xp_divisor > 0.0) {
            return Err(ConfigError::Invalid(
                "kill_xp_divisor must be positive".into(),
            ));
        }
        if self.heal_below_percent > 100 {
            return Err(ConfigError::Invalid(
                "heal_below_percent must be at most 100".into(),
            ));
        }
        Ok(())
    }

    /// Apply a single `name=value` override
    pub fn set_option(&mut self, name: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = || ConfigError::Invalid(format!("bad value '{}' for {}", value, name));
        match name {
            "turn_delay_ms" => self.turn_delay_ms = value.parse().map_err(|_| invalid())?,
            "spawn_steps" => self.spawn_steps = value.parse().map_err(|_| invalid())?,
            "kill_xp_divisor" => self.kill_xp_divisor = value.parse().map_err(|_| invalid())?,
            "friendly_kill_penalty" => {
                self.friendly_kill_penalty = value.parse().map_err(|_| invalid())?
            }
            "name_length" => self.name_length = value.parse().map_err(|_| invalid())?,
            "heal_below_percent" => {
                self.heal_below_percent = value.parse().map_err(|_| invalid())?
            }
            "topology" => {
                self.topology = match value {
                    "4" | "four" => Topology::Four,
                    "8" | "eight" => Topology::Eight,
                    _ => return Err(invalid()),
                }
            }
            "seed" => self.seed = Some(value.parse().map_err(|_| invalid())?),
            _ => return Err(ConfigError::Invalid(format!("unknown option '{}'", name))),
        }
        Ok(())
    }
}

/// Shape of a generated dungeon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DungeonConfig {
    pub floors: usize,
    pub width: i32,
    pub height: i32,
    pub max_rooms: usize,
}

impl Default for DungeonConfig {
    fn default() -> Self {
        Self {
            floors: DEFAULT_FLOORS,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            max_rooms: DEFAULT_MAX_ROOMS,
        }
    }
}

impl DungeonConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.floors == 0 {
            return Err(ConfigError::Invalid("dungeon needs at least one floor".into()));
        }
        if self.width < 12 || self.height < 8 {
            return Err(ConfigError::Invalid(format!(
                "dungeon {}x{} is too small (minimum 12x8)",
                self.width, self.height
            )));
        }
        if self.max_rooms < 2 {
            return Err(ConfigError::Invalid("max_rooms must be at least 2".into()));
        }
        Ok(())
    }
}

/// Creature stats handed to the spawner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreatureTemplate {
    pub name: String,
    pub hp: i32,
    pub damage: u32,
    pub difficulty: u32,
    pub kill_xp: u32,
    pub gold: u32,
}

impl Default for CreatureTemplate {
    fn default() -> Self {
        Self {
            name: "kobold".to_string(),
            hp: 6,
            damage: 3,
            difficulty: 2,
            kill_xp: 5,
            gold: 2,
        }
    }
}

/// A player to create at session start
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTemplate {
    pub name: String,
    pub hp: i32,
    pub damage: u32,
    /// Exploration strategy: "Explore" or "Wander"
    pub ai: Option<String>,
    /// Driven by submitted intents instead of its behavior
    pub manual: bool,
    /// Overrides the session spawn interval for this player
    pub spawn_steps: Option<u32>,
}

impl Default for PlayerTemplate {
    fn default() -> Self {
        Self {
            name: "Adventurer".to_string(),
            hp: 40,
            damage: 6,
            ai: None,
            manual: false,
            spawn_steps: None,
        }
    }
}

/// Everything the headless driver needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub session: SessionConfig,
    pub dungeon: DungeonConfig,
    pub players: Vec<PlayerTemplate>,
    pub creature: CreatureTemplate,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            dungeon: DungeonConfig::default(),
            players: vec![PlayerTemplate::default()],
            creature: CreatureTemplate::default(),
        }
    }
}

impl SimConfig {
    /// Parse from a JSON string and validate
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON file and validate
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.session.validate()?;
        self.dungeon.validate()?;
        if self.players.is_empty() {
            return Err(ConfigError::Invalid("at least one player is required".into()));
        }
        if self.players.iter().any(|p| p.hp <= 0) {
            return Err(ConfigError::Invalid("player hp must be positive".into()));
        }
        if self.creature.hp <= 0 {
            return Err(ConfigError::Invalid("creature hp must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = SimConfig::from_json(
            r#"{ "session": { "spawn_steps": 25, "victory": { "ReachFloor": 2 } },
                 "dungeon": { "floors": 3 } }"#,
        )
        .unwrap();
        assert_eq!(config.session.spawn_steps, 25);
        assert_eq!(config.session.victory, VictoryCondition::ReachFloor(2));
        assert_eq!(config.session.turn_delay_ms, DEFAULT_TURN_DELAY_MS);
        assert_eq!(config.dungeon.floors, 3);
        assert_eq!(config.dungeon.width, DEFAULT_WIDTH);
        assert_eq!(config.players.len(), 1);
    }

    #[test]
    fn test_rejects_zero_delay() {
        let err = SimConfig::from_json(r#"{ "session": { "turn_delay_ms": 0 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_bad_json() {
        let err = SimConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_rejects_no_players() {
        let err = SimConfig::from_json(r#"{ "players": [] }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_set_option() {
        let mut config = SessionConfig::default();
        config.set_option("spawn_steps", "7").unwrap();
        config.set_option("topology", "4").unwrap();
        config.set_option("seed", "12").unwrap();
        assert_eq!(config.spawn_steps, 7);
        assert_eq!(config.topology, Topology::Four);
        assert_eq!(config.seed, Some(12));

        assert!(config.set_option("spawn_steps", "many").is_err());
        assert!(config.set_option("colour", "red").is_err());
    }

    #[test]
    fn test_small_dungeon_rejected() {
        let dungeon = DungeonConfig {
            width: 5,
            ..DungeonConfig::default()
        };
        assert!(dungeon.validate().is_err());
    }
}
