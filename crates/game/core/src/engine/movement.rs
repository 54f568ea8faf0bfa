//! Move declaration, cancellation, and the two-stage commit.
//!
//! `move_units` only validates and queues; units stay put until the phase
//! ends and [`apply_pending_moves`] commits every move declared in it.

use std::collections::BTreeSet;

use crate::defs::Definitions;
use crate::event::GameEvent;
use crate::movement::{movement_cost, reachable_territories};
use crate::state::{GameState, PendingMove, Phase, UnitInstance, unit_owner};

use super::error::ActionError;

/// Declares a pending move for the current phase.
#[allow(clippy::too_many_arguments)]
pub(super) fn move_units(
    state: &mut GameState,
    faction_id: &str,
    from_id: &str,
    to_id: &str,
    unit_instance_ids: &[String],
    charge_through: &[String],
    defs: &Definitions,
    events: &mut Vec<GameEvent>,
) -> Result<(), ActionError> {
    for territory_id in [from_id, to_id] {
        if !state.territories.contains_key(territory_id) {
            return Err(ActionError::InvalidTerritory {
                territory_id: territory_id.to_owned(),
            });
        }
    }
    if unit_instance_ids.is_empty() {
        return Err(ActionError::NoUnits);
    }

    let already_pending: BTreeSet<&String> = state
        .pending_moves
        .iter()
        .flat_map(|pm| pm.unit_instance_ids.iter())
        .collect();

    let mut units_to_move: Vec<UnitInstance> = Vec::new();
    for instance_id in unit_instance_ids {
        if already_pending.contains(instance_id) {
            return Err(ActionError::UnitAlreadyPending {
                instance_id: instance_id.clone(),
            });
        }
        let unit = state
            .territories
            .get(from_id)
            .and_then(|t| t.unit(instance_id))
            .ok_or_else(|| ActionError::UnitNotFound {
                instance_id: instance_id.clone(),
                territory_id: from_id.to_owned(),
            })?;
        if unit_owner(instance_id) != faction_id {
            return Err(ActionError::UnitNotOwned {
                instance_id: instance_id.clone(),
                faction: faction_id.to_owned(),
            });
        }
        units_to_move.push(unit.clone());
    }

    // The first unit is the cavalry leader: its routes validate the charge.
    let mut leader_charge_routes = None;
    for unit in &units_to_move {
        let reach = reachable_territories(unit, from_id, state, defs, state.phase);
        if leader_charge_routes.is_none() {
            leader_charge_routes = Some(reach.charge_routes.clone());
        }
        if !reach.destinations.contains_key(to_id) {
            return Err(ActionError::Unreachable {
                instance_id: unit.instance_id.clone(),
                from: from_id.to_owned(),
                to: to_id.to_owned(),
                phase: state.phase,
            });
        }
    }

    if !charge_through.is_empty() {
        let charge: Vec<String> = charge_through.to_vec();
        let valid = leader_charge_routes
            .as_ref()
            .and_then(|routes| routes.get(to_id))
            .is_some_and(|routes| routes.contains(&charge));
        if !valid {
            return Err(ActionError::InvalidChargeRoute {
                to: to_id.to_owned(),
            });
        }
    }

    state.pending_moves.push(PendingMove {
        from_territory: from_id.to_owned(),
        to_territory: to_id.to_owned(),
        unit_instance_ids: unit_instance_ids.to_vec(),
        phase: state.phase,
        charge_through: charge_through.to_vec(),
    });

    events.push(GameEvent::UnitsMoved {
        faction: faction_id.to_owned(),
        from_territory: from_id.to_owned(),
        to_territory: to_id.to_owned(),
        unit_instance_ids: unit_instance_ids.to_vec(),
        phase: state.phase,
    });

    Ok(())
}

pub(super) fn cancel_move(
    state: &mut GameState,
    move_index: i64,
    events: &mut Vec<GameEvent>,
) -> Result<(), ActionError> {
    let length = state.pending_moves.len();
    if move_index < 0 || move_index as usize >= length {
        return Err(ActionError::InvalidIndex {
            kind: "move",
            index: move_index,
            length,
        });
    }

    let cancelled = state.pending_moves.remove(move_index as usize);
    events.push(GameEvent::MoveCancelled {
        from_territory: cancelled.from_territory,
        to_territory: cancelled.to_territory,
        unit_instance_ids: cancelled.unit_instance_ids,
    });

    Ok(())
}

/// Commits every pending move declared in `phase`. Called at phase end.
///
/// Moves whose endpoints or units no longer exist are silently skipped;
/// combat may have destroyed units between declaration and commit.
pub(crate) fn apply_pending_moves(
    state: &mut GameState,
    phase: Phase,
    defs: &Definitions,
) {
    let (moves_to_apply, remaining): (Vec<PendingMove>, Vec<PendingMove>) = state
        .pending_moves
        .drain(..)
        .partition(|pm| pm.phase == phase);
    state.pending_moves = remaining;

    for pending_move in moves_to_apply {
        let from_id = &pending_move.from_territory;
        let to_id = &pending_move.to_territory;

        if !state.territories.contains_key(from_id) || !state.territories.contains_key(to_id) {
            continue;
        }

        // Charge captures queue before the units land, in route order.
        if let Some(first_id) = pending_move.unit_instance_ids.first() {
            let faction_id = unit_owner(first_id).to_owned();
            for tid in &pending_move.charge_through {
                let charged = state.territories.get(tid);
                let ownable = defs.territory(tid).is_some_and(|d| d.ownable);
                let enemy_owned = charged
                    .and_then(|t| t.owner.as_deref())
                    .is_some_and(|owner| owner != faction_id);
                if ownable && enemy_owned {
                    state.pending_captures.insert(tid.clone(), faction_id.clone());
                }
            }
        }

        let Some(distance) = movement_cost(from_id, to_id, defs) else {
            continue;
        };

        let mut moved: Vec<UnitInstance> = Vec::new();
        if let Some(from_territory) = state.territories.get_mut(from_id) {
            for instance_id in &pending_move.unit_instance_ids {
                if let Some(pos) = from_territory
                    .units
                    .iter()
                    .position(|u| u.instance_id == *instance_id)
                {
                    let mut unit = from_territory.units.remove(pos);
                    unit.remaining_movement -= distance;
                    moved.push(unit);
                }
            }
        }
        if let Some(to_territory) = state.territories.get_mut(to_id) {
            to_territory.units.extend(moved);
        }

        // A combat move into ownable enemy land with nobody left to defend
        // captures it outright.
        if phase == Phase::CombatMove {
            let Some(first_id) = pending_move.unit_instance_ids.first() else {
                continue;
            };
            let faction_id = unit_owner(first_id).to_owned();
            let Some(to_territory) = state.territories.get(to_id) else {
                continue;
            };
            let Some(to_owner) = to_territory.owner.clone() else {
                continue;
            };
            let ownable = defs.territory(to_id).is_some_and(|d| d.ownable);
            if to_owner == faction_id || !ownable {
                continue;
            }
            let moving_alliance = defs.alliance_of(&faction_id).unwrap_or("");
            let owner_alliance = defs.alliance_of(&to_owner).unwrap_or("");
            if moving_alliance == owner_alliance {
                continue;
            }
            let has_enemy_units = to_territory
                .units
                .iter()
                .any(|u| unit_owner(&u.instance_id) != faction_id);
            if !has_enemy_units {
                state.pending_captures.insert(to_id.clone(), faction_id);
            }
        }
    }
}
