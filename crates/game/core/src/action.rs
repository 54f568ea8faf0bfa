//! Player-issued actions.
//!
//! Actions are immutable, deterministic instructions. On the wire each is
//! `{type, faction, payload}`; dice arrive inside the payload so the reducer
//! never rolls. Constructors mirror the wire names.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::combat::DiceRolls;
use crate::state::UnitStack;

/// An action submitted by one faction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub faction: String,
    #[serde(flatten)]
    pub kind: ActionKind,
}

/// Action discriminator plus payload, tagged the way the wire expects.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ActionKind {
    PurchaseUnits {
        /// unit id -> count to purchase (counts ≤ 0 are ignored).
        #[serde(default)]
        purchases: BTreeMap<String, i64>,
    },
    PurchaseCamp {},
    MoveUnits {
        from: String,
        to: String,
        unit_instance_ids: Vec<String>,
        /// Cavalry only: the charge route to `to`, in pass-through order.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        charge_through: Vec<String>,
    },
    CancelMove {
        move_index: i64,
    },
    InitiateCombat {
        territory_id: String,
        #[serde(default)]
        dice_rolls: DiceRolls,
    },
    ContinueCombat {
        #[serde(default)]
        dice_rolls: DiceRolls,
    },
    Retreat {
        retreat_to: String,
    },
    MobilizeUnits {
        destination: String,
        #[serde(default)]
        units: Vec<UnitStack>,
    },
    PlaceCamp {
        camp_index: i64,
        territory_id: String,
    },
    CancelMobilization {
        mobilization_index: i64,
    },
    EndPhase {},
    EndTurn {},
}

impl ActionKind {
    /// Wire name of the action type.
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::PurchaseUnits { .. } => "purchase_units",
            ActionKind::PurchaseCamp {} => "purchase_camp",
            ActionKind::MoveUnits { .. } => "move_units",
            ActionKind::CancelMove { .. } => "cancel_move",
            ActionKind::InitiateCombat { .. } => "initiate_combat",
            ActionKind::ContinueCombat { .. } => "continue_combat",
            ActionKind::Retreat { .. } => "retreat",
            ActionKind::MobilizeUnits { .. } => "mobilize_units",
            ActionKind::PlaceCamp { .. } => "place_camp",
            ActionKind::CancelMobilization { .. } => "cancel_mobilization",
            ActionKind::EndPhase {} => "end_phase",
            ActionKind::EndTurn {} => "end_turn",
        }
    }
}

impl Action {
    pub fn purchase_units(faction: impl Into<String>, purchases: BTreeMap<String, i64>) -> Self {
        Self {
            faction: faction.into(),
            kind: ActionKind::PurchaseUnits { purchases },
        }
    }

    pub fn purchase_camp(faction: impl Into<String>) -> Self {
        Self {
            faction: faction.into(),
            kind: ActionKind::PurchaseCamp {},
        }
    }

    pub fn move_units(
        faction: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
        unit_instance_ids: Vec<String>,
    ) -> Self {
        Self {
            faction: faction.into(),
            kind: ActionKind::MoveUnits {
                from: from.into(),
                to: to.into(),
                unit_instance_ids,
                charge_through: Vec::new(),
            },
        }
    }

    pub fn move_units_charging(
        faction: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
        unit_instance_ids: Vec<String>,
        charge_through: Vec<String>,
    ) -> Self {
        Self {
            faction: faction.into(),
            kind: ActionKind::MoveUnits {
                from: from.into(),
                to: to.into(),
                unit_instance_ids,
                charge_through,
            },
        }
    }

    pub fn cancel_move(faction: impl Into<String>, move_index: i64) -> Self {
        Self {
            faction: faction.into(),
            kind: ActionKind::CancelMove { move_index },
        }
    }

    pub fn initiate_combat(
        faction: impl Into<String>,
        territory_id: impl Into<String>,
        dice_rolls: DiceRolls,
    ) -> Self {
        Self {
            faction: faction.into(),
            kind: ActionKind::InitiateCombat {
                territory_id: territory_id.into(),
                dice_rolls,
            },
        }
    }

    pub fn continue_combat(faction: impl Into<String>, dice_rolls: DiceRolls) -> Self {
        Self {
            faction: faction.into(),
            kind: ActionKind::ContinueCombat { dice_rolls },
        }
    }

    pub fn retreat(faction: impl Into<String>, retreat_to: impl Into<String>) -> Self {
        Self {
            faction: faction.into(),
            kind: ActionKind::Retreat {
                retreat_to: retreat_to.into(),
            },
        }
    }

    pub fn mobilize_units(
        faction: impl Into<String>,
        destination: impl Into<String>,
        units: Vec<UnitStack>,
    ) -> Self {
        Self {
            faction: faction.into(),
            kind: ActionKind::MobilizeUnits {
                destination: destination.into(),
                units,
            },
        }
    }

    pub fn place_camp(
        faction: impl Into<String>,
        camp_index: i64,
        territory_id: impl Into<String>,
    ) -> Self {
        Self {
            faction: faction.into(),
            kind: ActionKind::PlaceCamp {
                camp_index,
                territory_id: territory_id.into(),
            },
        }
    }

    pub fn cancel_mobilization(faction: impl Into<String>, mobilization_index: i64) -> Self {
        Self {
            faction: faction.into(),
            kind: ActionKind::CancelMobilization { mobilization_index },
        }
    }

    pub fn end_phase(faction: impl Into<String>) -> Self {
        Self {
            faction: faction.into(),
            kind: ActionKind::EndPhase {},
        }
    }

    pub fn end_turn(faction: impl Into<String>) -> Self {
        Self {
            faction: faction.into(),
            kind: ActionKind::EndTurn {},
        }
    }
}
