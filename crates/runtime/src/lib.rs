//! Session boundary around the deterministic core.
//!
//! The core is a pure function; this crate owns everything around it:
//! persistence of serialized snapshots behind the [`GameStore`] trait,
//! per-game single-writer locking in [`GameService`], and the dice source
//! ([`DiceRoller`]) that fills action payloads. Many games may progress
//! concurrently; within one game every reducer invocation is serialized,
//! and a snapshot is only written after the reducer succeeded; a failed
//! action leaves the stored state untouched.
pub mod dice;
pub mod error;
pub mod service;
pub mod store;

pub use dice::{DICE_SIDES, DiceRoller};
pub use error::{Result, RuntimeError, StoreError};
pub use service::{GameRecord, GameService};
pub use store::{FileStore, GameStore, MemoryStore};
