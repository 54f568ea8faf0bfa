//! Setup-bundle loading.
//!
//! A setup lives in its own directory under a setups root:
//! `territories.json`, `factions.json`, `units.json`, optional
//! `camps.json`, required `starting_setup.json`, and an optional
//! `manifest.json` carrying display metadata, victory criteria, and the
//! camp cost. Loading produces a [`SetupBundle`] whose definitions are
//! snapshotted into each new game, so edits to the files never touch games
//! already in flight.

mod bundle;
mod loader;

pub use bundle::SetupBundle;
pub use loader::{SetupError, SetupSummary, list_setups, load_setup};
