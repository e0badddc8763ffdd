//! Turn engine: the lock that serializes actions and the scheduler that
//! decides who acts next.

mod lock;
mod scheduler;

pub use lock::{LockState, TurnLock, UnlockHandle, unlock_delay};
pub use scheduler::{PlayerTurn, TurnContext, TurnScheduler};
