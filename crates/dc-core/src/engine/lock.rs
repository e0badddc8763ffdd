//! Turn engine lock
//!
//! The one serialization point of a session. While the lock is busy nothing
//! else may act; it reopens when a scheduled unlock comes due on the session
//! clock. Unlocks are paced at `base / living` so a full round of players
//! takes roughly the same wall time whatever the population.

use std::collections::VecDeque;
use std::time::Duration;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::agent::{AgentId, Intent};

/// Lock state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockState {
    Open,
    Busy,
    /// Permanently closed after the session ends
    Terminal,
}

/// Handle to a scheduled unlock, used to revoke it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnlockHandle(u64);

#[derive(Debug, Clone, Copy)]
struct PendingUnlock {
    handle: UnlockHandle,
    due: Duration,
}

/// Pacing delay before the next unlock
///
/// Never zero: the result is clamped to one nanosecond.
pub fn unlock_delay(base: Duration, living: usize) -> Duration {
    let living = living.max(1) as u128;
    let nanos = (base.as_nanos() / living).max(1);
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

/// Binary gate with a cancellable delayed release
#[derive(Debug, Clone)]
pub struct TurnLock {
    state: LockState,
    base_delay: Duration,
    pending: Option<PendingUnlock>,
    next_handle: u64,
    /// Intents submitted while their agent could not act yet
    deferred: HashMap<AgentId, VecDeque<Intent>>,
}

impl TurnLock {
    pub fn new(base_delay: Duration) -> Self {
        Self {
            state: LockState::Open,
            base_delay,
            pending: None,
            next_handle: 1,
            deferred: HashMap::new(),
        }
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == LockState::Open
    }

    pub fn is_terminal(&self) -> bool {
        self.state == LockState::Terminal
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Mark the engine busy; false once the lock is terminal
    pub fn lock(&mut self) -> bool {
        match self.state {
            LockState::Terminal => false,
            _ => {
                self.state = LockState::Busy;
                true
            }
        }
    }

    /// Reopen immediately, dropping any pending unlock
    pub fn unlock(&mut self) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.pending = None;
        self.state = LockState::Open;
        true
    }

    /// Schedule the unlock for `now + unlock_delay(base, living)`
    ///
    /// Replaces any unlock already pending.
    pub fn schedule_unlock(&mut self, now: Duration, living: usize) -> Option<UnlockHandle> {
        if self.is_terminal() {
            return None;
        }
        let handle = UnlockHandle(self.next_handle);
        self.next_handle += 1;
        let due = now + unlock_delay(self.base_delay, living);
        self.pending = Some(PendingUnlock { handle, due });
        debug!(?due, living, "unlock scheduled");
        Some(handle)
    }

    /// When the pending unlock will fire
    pub fn pending_due(&self) -> Option<Duration> {
        self.pending.map(|p| p.due)
    }

    /// Revoke a pending unlock; false if it already fired or was replaced
    pub fn cancel(&mut self, handle: UnlockHandle) -> bool {
        match self.pending {
            Some(p) if p.handle == handle => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    /// Fire a due unlock; true if the lock reopened
    pub fn poll(&mut self, now: Duration) -> bool {
        match self.pending {
            Some(p) if p.due <= now && !self.is_terminal() => {
                self.pending = None;
                self.state = LockState::Open;
                true
            }
            _ => false,
        }
    }

    /// Close for good, revoking any pending unlock
    pub fn lock_terminal(&mut self) {
        if let Some(p) = self.pending.take() {
            debug!(handle = p.handle.0, "pending unlock revoked");
        }
        self.state = LockState::Terminal;
    }

    /// Queue an intent for when `agent` next gets to act
    pub fn defer(&mut self, agent: AgentId, intent: Intent) -> bool {
        if self.is_terminal() {
            warn!(%agent, "action rejected: session is over");
            return false;
        }
        self.deferred.entry(agent).or_default().push_back(intent);
        true
    }

    /// Oldest deferred intent for `agent`
    pub fn take_deferred(&mut self, agent: AgentId) -> Option<Intent> {
        let queue = self.deferred.get_mut(&agent)?;
        let intent = queue.pop_front();
        if queue.is_empty() {
            self.deferred.remove(&agent);
        }
        intent
    }

    pub fn deferred_len(&self, agent: AgentId) -> usize {
        self.deferred.get(&agent).map_or(0, VecDeque::len)
    }

    /// Forget everything queued for an agent that left play
    pub fn drop_deferred(&mut self, agent: AgentId) {
        self.deferred.remove(&agent);
    }
}
