//! Default tuning constants
//!
//! Every value here is only a default; sessions read the live value from
//! `SessionConfig`.

/// Base round budget in milliseconds, split across living players
pub const DEFAULT_TURN_DELAY_MS: u64 = 100;

/// A player triggers a spawn every this many of its own actions
pub const DEFAULT_SPAWN_STEPS: u32 = 100;

/// Kill xp at which kill credit stops scaling
pub const DEFAULT_KILL_XP_DIVISOR: f64 = 10.0;

/// Alignment lost for killing an agent of the player faction
pub const DEFAULT_FRIENDLY_KILL_PENALTY: i32 = 50;

/// Agent names are cut to this many characters
pub const DEFAULT_NAME_LENGTH: usize = 16;

/// Heal threshold (percent of max) for players below which they rest
pub const DEFAULT_HEAL_BELOW_PERCENT: u32 = 50;

/// Default dungeon dimensions
pub const DEFAULT_FLOORS: usize = 5;
pub const DEFAULT_WIDTH: i32 = 60;
pub const DEFAULT_HEIGHT: i32 = 21;
pub const DEFAULT_MAX_ROOMS: usize = 8;

/// Radius around the requesting agent searched for a spawn cell
pub const SPAWN_RADIUS: i32 = 6;

/// Attempts made to find a free spawn cell before giving up
pub const SPAWN_ATTEMPTS: u32 = 32;
