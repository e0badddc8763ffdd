//! Bounded health pool

use serde::{Deserialize, Serialize};

/// Health with an incapacitation floor
///
/// `current` always stays within `min..=max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    current: i32,
    min: i32,
    max: i32,
}

impl Health {
    /// Full pool from 0 to `max`
    pub fn new(max: i32) -> Self {
        let max = max.max(1);
        Self {
            current: max,
            min: 0,
            max,
        }
    }

    pub const fn current(&self) -> i32 {
        self.current
    }

    pub const fn max(&self) -> i32 {
        self.max
    }

    /// Incapacitated once health sits on the floor
    pub const fn at_min(&self) -> bool {
        self.current <= self.min
    }

    /// Remove health; returns true if this call reached the floor
    pub fn damage(&mut self, amount: i32) -> bool {
        if self.at_min() {
            return false;
        }
        self.current = (self.current - amount.max(0)).max(self.min);
        self.at_min()
    }

    pub fn heal(&mut self, amount: i32) {
        if self.at_min() {
            return;
        }
        self.current = (self.current + amount.max(0)).min(self.max);
    }

    /// Current health as a percentage of max
    pub fn percent(&self) -> u32 {
        ((self.current - self.min).max(0) * 100 / (self.max - self.min).max(1)) as u32
    }
}
