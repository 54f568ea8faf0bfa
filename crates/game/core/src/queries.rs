//! Read-only derivations for clients.
//!
//! Nothing here mutates state. `validate_action` delegates to the reducer
//! on a throwaway clone, so the validator and the reducer can never drift
//! apart.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::defs::{Definitions, RESOURCE_POWER, ResourceMap};
use crate::engine::{apply_action, territory_is_friendly_for_retreat};
use crate::movement::{ReachableSet, reachable_territories};
use crate::state::{GameState, UnitStack, unit_owner};

/// Result of dry-running an action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Mirrors the reducer's guards without observable mutation: the action is
/// applied to a discarded clone, so `valid` is true exactly when
/// `apply_action` would succeed.
pub fn validate_action(state: &GameState, action: &Action, defs: &Definitions) -> ValidationResult {
    match apply_action(state, action, defs) {
        Ok(_) => ValidationResult {
            valid: true,
            error: None,
        },
        Err(error) => ValidationResult {
            valid: false,
            error: Some(error.to_string()),
        },
    }
}

/// A unit the faction could buy, with how many its resources cover.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PurchasableUnit {
    pub unit_id: String,
    pub display_name: String,
    pub cost: ResourceMap,
    pub max_affordable: i64,
}

/// The faction's purchasable units. `max_affordable` is the floor over
/// every positively priced resource, 0 when any of them is unmet.
pub fn get_purchasable_units(
    state: &GameState,
    faction_id: &str,
    defs: &Definitions,
) -> Vec<PurchasableUnit> {
    defs.units
        .values()
        .filter(|unit| unit.faction == faction_id && unit.purchasable)
        .map(|unit| {
            let mut max_affordable = i64::MAX;
            for (resource_id, &cost) in &unit.cost {
                if cost <= 0 {
                    continue;
                }
                let have = state.resource_amount(faction_id, resource_id);
                max_affordable = max_affordable.min(have / cost);
            }
            if max_affordable == i64::MAX {
                max_affordable = 0;
            }
            PurchasableUnit {
                unit_id: unit.id.clone(),
                display_name: unit.display_name.clone(),
                cost: unit.cost.clone(),
                max_affordable,
            }
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampCapacity {
    pub territory_id: String,
    pub power: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MobilizationCapacity {
    pub camps: Vec<CampCapacity>,
    pub total_capacity: i64,
}

/// Per-camp and total mobilization capacity for the current turn.
pub fn get_mobilization_capacity(state: &GameState, defs: &Definitions) -> MobilizationCapacity {
    let camps: Vec<CampCapacity> = state
        .mobilization_camps
        .iter()
        .filter_map(|territory_id| {
            defs.territory(territory_id).map(|territory_def| CampCapacity {
                territory_id: territory_id.clone(),
                power: territory_def.power_production(),
            })
        })
        .collect();
    let total_capacity = camps.iter().map(|c| c.power).sum();
    MobilizationCapacity {
        camps,
        total_capacity,
    }
}

/// Territories usable for mobilization this turn.
pub fn get_mobilization_territories(state: &GameState) -> Vec<String> {
    state.mobilization_camps.clone()
}

/// The faction's purchase pool.
pub fn get_purchased_units(state: &GameState, faction_id: &str) -> Vec<UnitStack> {
    state.purchase_pool(faction_id).to_vec()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovableUnit {
    pub instance_id: String,
    pub unit_id: String,
    pub territory_id: String,
    pub remaining_movement: i64,
}

/// Every unit the faction owns that still has movement left.
pub fn get_movable_units(state: &GameState, faction_id: &str) -> Vec<MovableUnit> {
    let mut movable = Vec::new();
    for (territory_id, territory) in &state.territories {
        for unit in &territory.units {
            if unit.owner() == faction_id && unit.remaining_movement > 0 {
                movable.push(MovableUnit {
                    instance_id: unit.instance_id.clone(),
                    unit_id: unit.unit_id.clone(),
                    territory_id: territory_id.clone(),
                    remaining_movement: unit.remaining_movement,
                });
            }
        }
    }
    movable
}

/// Legal destinations (and charge routes) for one unit in the current
/// phase. `None` when the unit does not exist.
pub fn get_unit_move_targets(
    state: &GameState,
    instance_id: &str,
    defs: &Definitions,
) -> Option<ReachableSet> {
    let (unit, territory_id) = state.find_unit(instance_id)?;
    let unit = unit.clone();
    let territory_id = territory_id.to_owned();
    Some(reachable_territories(
        &unit,
        &territory_id,
        state,
        defs,
        state.phase,
    ))
}

/// Territories where the faction has units alongside at least one unit of
/// another alliance (or of unknown allegiance).
pub fn get_contested_territories(
    state: &GameState,
    faction_id: &str,
    defs: &Definitions,
) -> Vec<String> {
    let faction_alliance = defs.alliance_of(faction_id);
    state
        .territories
        .iter()
        .filter(|(_, territory)| {
            let has_own = territory
                .units
                .iter()
                .any(|u| unit_owner(&u.instance_id) == faction_id);
            if !has_own {
                return false;
            }
            territory.units.iter().any(|u| {
                let owner = unit_owner(&u.instance_id);
                if owner == faction_id {
                    return false;
                }
                match (defs.alliance_of(owner), faction_alliance) {
                    (Some(theirs), Some(ours)) => theirs != ours,
                    _ => true,
                }
            })
        })
        .map(|(territory_id, _)| territory_id.clone())
        .collect()
}

/// Where the active combat's attackers could retreat to: adjacent
/// territories that are allied or friendly neutral. Empty without an
/// active combat.
pub fn get_retreat_options(state: &GameState, defs: &Definitions) -> Vec<String> {
    let Some(combat) = &state.active_combat else {
        return Vec::new();
    };
    let Some(territory_def) = defs.territory(&combat.territory_id) else {
        return Vec::new();
    };
    territory_def
        .adjacent
        .iter()
        .filter(|adjacent_id| {
            state.territory(adjacent_id).is_some_and(|territory| {
                territory_is_friendly_for_retreat(territory, &combat.attacker_faction, defs)
            })
        })
        .cloned()
        .collect()
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactionStats {
    pub territories: i64,
    pub strongholds: i64,
    pub power: i64,
    pub power_per_turn: i64,
    pub units: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactionStatsReport {
    pub factions: BTreeMap<String, FactionStats>,
    pub alliances: BTreeMap<String, FactionStats>,
}

/// Per-faction holdings plus alliance aggregates.
pub fn get_faction_stats(state: &GameState, defs: &Definitions) -> FactionStatsReport {
    let mut report = FactionStatsReport::default();

    for faction_id in defs.factions.keys() {
        let mut stats = FactionStats {
            power: state.resource_amount(faction_id, RESOURCE_POWER),
            ..FactionStats::default()
        };
        for (territory_id, territory) in &state.territories {
            if territory.owner.as_deref() == Some(faction_id.as_str()) {
                stats.territories += 1;
                if let Some(territory_def) = defs.territory(territory_id) {
                    if territory_def.is_stronghold {
                        stats.strongholds += 1;
                    }
                    stats.power_per_turn += territory_def.power_production();
                }
            }
            stats.units += territory
                .units
                .iter()
                .filter(|u| unit_owner(&u.instance_id) == faction_id)
                .count() as i64;
        }
        report.factions.insert(faction_id.clone(), stats);
    }

    for (faction_id, stats) in &report.factions {
        let Some(alliance) = defs.alliance_of(faction_id) else {
            continue;
        };
        let aggregate = report
            .alliances
            .entry(alliance.to_owned())
            .or_default();
        aggregate.territories += stats.territories;
        aggregate.strongholds += stats.strongholds;
        aggregate.power += stats.power;
        aggregate.power_per_turn += stats.power_per_turn;
        aggregate.units += stats.units;
    }

    report
}
