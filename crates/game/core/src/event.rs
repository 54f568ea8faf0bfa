//! Domain events emitted by the reducer.
//!
//! Events are the canonical, ordered record of what a transition did; the
//! wire shape is `{type, payload}`. They are outputs only; replaying a game
//! replays actions, never events.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::combat::DiceGroup;
use crate::defs::ResourceMap;
use crate::state::{Phase, UnitStack};

/// A unit materialized by mobilization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MobilizedUnit {
    pub unit_id: String,
    pub instance_id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum GameEvent {
    /// `new_phase` is `"turn_end"` for the synthetic transition out of
    /// mobilization, otherwise a phase name.
    PhaseChanged {
        old_phase: String,
        new_phase: String,
        faction: String,
    },
    TurnStarted {
        turn_number: i64,
        faction: String,
    },
    TurnEnded {
        turn_number: i64,
        faction: String,
    },
    ResourcesChanged {
        faction: String,
        resource: String,
        old_value: i64,
        new_value: i64,
        reason: String,
    },
    UnitsPurchased {
        faction: String,
        purchases: BTreeMap<String, i64>,
        total_cost: ResourceMap,
    },
    IncomeCalculated {
        faction: String,
        income: ResourceMap,
        territories: Vec<String>,
    },
    IncomeCollected {
        faction: String,
        income: ResourceMap,
        new_totals: ResourceMap,
    },
    /// A move was declared (it applies at phase end).
    UnitsMoved {
        faction: String,
        from_territory: String,
        to_territory: String,
        unit_instance_ids: Vec<String>,
        phase: Phase,
    },
    MoveCancelled {
        from_territory: String,
        to_territory: String,
        unit_instance_ids: Vec<String>,
    },
    MobilizationCancelled {
        destination: String,
        units: Vec<UnitStack>,
    },
    CombatStarted {
        territory_id: String,
        attacker_faction: String,
        attacker_instance_ids: Vec<String>,
        defender_faction: Option<String>,
        defender_instance_ids: Vec<String>,
    },
    CombatRoundResolved {
        territory_id: String,
        round_number: u32,
        /// Effective stat -> rolls assigned to that stat, for display.
        attacker_dice: BTreeMap<i64, DiceGroup>,
        defender_dice: BTreeMap<i64, DiceGroup>,
        attacker_hits: i64,
        defender_hits: i64,
        attacker_casualties: Vec<String>,
        defender_casualties: Vec<String>,
        attacker_wounded: Vec<String>,
        defender_wounded: Vec<String>,
        attackers_remaining: usize,
        defenders_remaining: usize,
        #[serde(default)]
        is_archer_prefire: bool,
        /// Hits absorbed per unit type: casualties count `base_health`,
        /// wounded count 1.
        #[serde(default)]
        attacker_hits_by_unit_type: BTreeMap<String, i64>,
        #[serde(default)]
        defender_hits_by_unit_type: BTreeMap<String, i64>,
    },
    CombatEnded {
        territory_id: String,
        /// `"attacker"` or `"defender"`.
        winner: String,
        attacker_faction: String,
        defender_faction: Option<String>,
        surviving_attackers: Vec<String>,
        surviving_defenders: Vec<String>,
        total_rounds: u32,
    },
    UnitsRetreated {
        faction: String,
        from_territory: String,
        to_territory: String,
        unit_instance_ids: Vec<String>,
    },
    TerritoryCaptured {
        territory_id: String,
        old_owner: Option<String>,
        new_owner: String,
        surviving_units: Vec<String>,
    },
    UnitDestroyed {
        instance_id: String,
        unit_type: String,
        faction: Option<String>,
        territory_id: String,
        cause: String,
    },
    UnitsMobilized {
        faction: String,
        destination: String,
        units: Vec<MobilizedUnit>,
    },
    Victory {
        winner: String,
        stronghold_counts: BTreeMap<String, i64>,
        required: i64,
        controlled: Vec<String>,
    },
}

impl GameEvent {
    /// Wire name of the event type.
    pub fn name(&self) -> &'static str {
        match self {
            GameEvent::PhaseChanged { .. } => "phase_changed",
            GameEvent::TurnStarted { .. } => "turn_started",
            GameEvent::TurnEnded { .. } => "turn_ended",
            GameEvent::ResourcesChanged { .. } => "resources_changed",
            GameEvent::UnitsPurchased { .. } => "units_purchased",
            GameEvent::IncomeCalculated { .. } => "income_calculated",
            GameEvent::IncomeCollected { .. } => "income_collected",
            GameEvent::UnitsMoved { .. } => "units_moved",
            GameEvent::MoveCancelled { .. } => "move_cancelled",
            GameEvent::MobilizationCancelled { .. } => "mobilization_cancelled",
            GameEvent::CombatStarted { .. } => "combat_started",
            GameEvent::CombatRoundResolved { .. } => "combat_round_resolved",
            GameEvent::CombatEnded { .. } => "combat_ended",
            GameEvent::UnitsRetreated { .. } => "units_retreated",
            GameEvent::TerritoryCaptured { .. } => "territory_captured",
            GameEvent::UnitDestroyed { .. } => "unit_destroyed",
            GameEvent::UnitsMobilized { .. } => "units_mobilized",
            GameEvent::Victory { .. } => "victory",
        }
    }
}
