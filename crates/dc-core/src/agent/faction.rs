//! Faction membership and hostility

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Set of factions an agent belongs to (or is hostile to)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Factions: u8 {
        const PLAYER = 0b0000_0001;
        const MONSTER = 0b0000_0010;
        const NEUTRAL = 0b0000_0100;
    }
}

impl Factions {
    /// True when an agent hostile to `self` may attack a member of `target`
    pub const fn hostile_to(self, target: Factions) -> bool {
        self.intersects(target)
    }
}
