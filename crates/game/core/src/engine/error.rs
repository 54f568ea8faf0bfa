//! Error taxonomy surfaced by the reducer.
//!
//! Every variant carries enough detail for a human-readable message; the
//! session boundary maps them onto its own transport. Validation errors
//! never mutate state; callers keep the prior state on any `Err`.

use crate::state::Phase;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("game is over: {winner} alliance has won")]
    GameOver { winner: String },

    #[error("action faction {faction} does not match current faction {current}")]
    NotYourTurn { faction: String, current: String },

    #[error("action '{action}' is not allowed in phase '{phase}'")]
    PhaseNotAllowed { action: String, phase: Phase },

    #[error("combat in progress: must continue_combat or retreat, not '{action}'")]
    CombatInProgress { action: String },

    #[error("no active combat for '{action}'; use initiate_combat first")]
    NoActiveCombat { action: String },

    // Purchase
    #[error("unknown unit: {unit_id}")]
    UnknownUnit { unit_id: String },

    #[error("unit {unit_id} is not purchasable")]
    UnitNotPurchasable { unit_id: String },

    #[error("faction {faction} cannot purchase {unit_id}")]
    UnitNotOfFaction { faction: String, unit_id: String },

    #[error("insufficient {resource}: have {have}, need {need}")]
    InsufficientResource {
        resource: String,
        need: i64,
        have: i64,
    },

    #[error("{faction}'s capital has been captured")]
    CapitalLost { faction: String },

    #[error("cumulative purchases of {requested} units exceed mobilization capacity {capacity}")]
    MobilizationCapacityExceeded { requested: i64, capacity: i64 },

    // Movement
    #[error("invalid territory: {territory_id}")]
    InvalidTerritory { territory_id: String },

    #[error("no units specified")]
    NoUnits,

    #[error("unit {instance_id} not found in {territory_id}")]
    UnitNotFound {
        instance_id: String,
        territory_id: String,
    },

    #[error("unit {instance_id} does not belong to {faction}")]
    UnitNotOwned {
        instance_id: String,
        faction: String,
    },

    #[error("unit {instance_id} already has a pending move")]
    UnitAlreadyPending { instance_id: String },

    #[error("unit {instance_id} cannot reach {to} from {from} in phase '{phase}'")]
    Unreachable {
        instance_id: String,
        from: String,
        to: String,
        phase: Phase,
    },

    #[error("invalid charge route to {to}: must be one of the valid charging routes")]
    InvalidChargeRoute { to: String },

    // Mobilization
    #[error("{territory_id} is not an owned mobilization camp this turn")]
    NotAMobilizationCamp { territory_id: String },

    #[error("camp at {territory_id} has been destroyed")]
    CampDestroyed { territory_id: String },

    #[error("not enough purchased {unit_id}: have {have}, need {need}")]
    InsufficientPurchased {
        unit_id: String,
        need: i64,
        have: i64,
    },

    #[error("cannot mobilize {requested} units: {territory_id} produces only {power} power")]
    ExceedsMobilizationPower {
        requested: i64,
        power: i64,
        territory_id: String,
    },

    // Combat
    #[error("no attacking units in {territory_id}")]
    NoAttackers { territory_id: String },

    #[error("no defending units in {territory_id}")]
    NoDefenders { territory_id: String },

    #[error("cannot attack own territory {territory_id}")]
    CannotAttackOwn { territory_id: String },

    #[error("cannot retreat until attackers have rolled")]
    CannotRetreatBeforeRolling,

    #[error("cannot retreat to {territory_id}: must be adjacent and allied or friendly neutral")]
    RetreatDestinationInvalid { territory_id: String },

    // Camps
    #[error("no valid territory to place a camp")]
    NoCampPlacementOptions,

    #[error("pending camp {camp_index} has already been placed")]
    CampAlreadyPlaced { camp_index: i64 },

    #[error("territory {territory_id} is not a valid camp placement")]
    CampPlacementInvalid { territory_id: String },

    // Indices
    #[error("invalid {kind} index {index}: have {length}")]
    InvalidIndex {
        kind: &'static str,
        index: i64,
        length: usize,
    },

    /// An invariant the reducer relies on does not hold in the loaded
    /// state. The game should be treated as not loadable.
    #[error("state corrupt: {0}")]
    StateCorrupt(String),
}

impl ActionError {
    pub(crate) fn corrupt(message: impl Into<String>) -> Self {
        ActionError::StateCorrupt(message.into())
    }
}
