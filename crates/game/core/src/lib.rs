//! Deterministic rules core for a turn-based, multi-faction strategy game.
//!
//! `warmarch-core` defines the canonical data model (rule definitions, game
//! state, actions, events) and exposes pure APIs over it. All state mutation
//! flows through [`engine::apply_action`], which takes the prior state, an
//! action, and a [`defs::Definitions`] snapshot and returns the next state
//! together with the ordered list of domain events. The crate performs no
//! I/O, rolls no dice, and holds no global state; dice arrive inside action
//! payloads and persistence lives in the runtime crate.
pub mod action;
pub mod combat;
pub mod defs;
pub mod engine;
pub mod event;
pub mod movement;
pub mod queries;
pub mod setup;
pub mod state;

pub use action::{Action, ActionKind};
pub use combat::{DiceGroup, DiceRolls, RoundOutcome, Side, StatModifiers};
pub use defs::{Archetype, CampDef, Definitions, FactionDef, ResourceMap, TerritoryDef, UnitDef};
pub use engine::{ActionError, apply_action};
pub use event::GameEvent;
pub use movement::{ReachableSet, movement_cost, reachable_territories};
pub use queries::ValidationResult;
pub use setup::{StartingSetup, initialize_game_state, replay_actions};
pub use state::{
    ActiveCombat, CombatRoundRecord, GameState, PendingCamp, PendingMobilization, PendingMove,
    Phase, TerritoryState, UnitInstance, UnitStack, VictoryCriteria, unit_owner,
};
