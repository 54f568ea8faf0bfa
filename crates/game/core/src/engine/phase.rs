//! Phase and turn transitions: the points where deferred state changes
//! commit.
//!
//! Leaving combat_move / non_combat_move applies that phase's pending
//! moves; leaving combat applies pending captures (with liberation);
//! leaving non_combat_move also resets the current faction's unit stats;
//! leaving mobilization materializes deployments and rolls straight into
//! end_turn. Victory is checked only when the turn cycle wraps back to the
//! first faction.

use std::collections::BTreeMap;

use crate::defs::{Definitions, ResourceMap};
use crate::event::GameEvent;
use crate::state::{GameState, Phase};

use super::error::ActionError;
use super::{mobilize, movement};

pub(super) fn end_phase(
    state: &mut GameState,
    defs: &Definitions,
    events: &mut Vec<GameEvent>,
) -> Result<(), ActionError> {
    if state.phase == Phase::Combat && state.active_combat.is_some() {
        return Err(ActionError::CombatInProgress {
            action: "end_phase".to_owned(),
        });
    }

    let old_phase = state.phase;

    match state.phase {
        Phase::CombatMove => {
            movement::apply_pending_moves(state, Phase::CombatMove, defs);
        }
        Phase::NonCombatMove => {
            movement::apply_pending_moves(state, Phase::NonCombatMove, defs);
        }
        Phase::Combat => {
            apply_pending_captures(state, defs, events);
        }
        _ => {}
    }

    // Units heal and regain movement once their faction is done moving.
    if state.phase == Phase::NonCombatMove {
        let current_faction = state.current_faction.clone();
        reset_unit_stats_for_faction(state, &current_faction);
    }

    if state.phase == Phase::Mobilization {
        mobilize::apply_pending_mobilizations(state, defs, events);
        events.push(GameEvent::PhaseChanged {
            old_phase: old_phase.to_string(),
            new_phase: "turn_end".to_owned(),
            faction: state.current_faction.clone(),
        });
        return end_turn(state, defs, events);
    }

    if let Some(next_phase) = state.phase.next() {
        state.phase = next_phase;
    }
    events.push(GameEvent::PhaseChanged {
        old_phase: old_phase.to_string(),
        new_phase: state.phase.to_string(),
        faction: state.current_faction.clone(),
    });

    Ok(())
}

/// Applies queued captures, resolving liberation: when the territory's
/// original owner is a (different) ally of the capturer, ownership returns
/// to the original owner. Every camp on a captured territory is destroyed.
fn apply_pending_captures(
    state: &mut GameState,
    defs: &Definitions,
    events: &mut Vec<GameEvent>,
) {
    let captures = std::mem::take(&mut state.pending_captures);

    for (territory_id, capturer) in captures {
        let Some(territory) = state.territories.get_mut(&territory_id) else {
            continue;
        };
        let old_owner = territory.owner.clone();

        let mut new_owner = capturer.clone();
        if let Some(original_owner) = territory.original_owner.clone() {
            if original_owner != capturer && defs.same_alliance(&capturer, &original_owner) {
                new_owner = original_owner;
            }
        }
        territory.owner = Some(new_owner.clone());
        let surviving_units: Vec<String> = territory
            .units
            .iter()
            .map(|u| u.instance_id.clone())
            .collect();

        state.camps_standing.retain(|camp_id| {
            let on_territory = state.dynamic_camps.get(camp_id).map(String::as_str)
                == Some(territory_id.as_str())
                || defs
                    .camps
                    .get(camp_id)
                    .is_some_and(|camp| camp.territory_id == territory_id);
            !on_territory
        });
        state
            .dynamic_camps
            .retain(|_, camp_territory| *camp_territory != territory_id);

        events.push(GameEvent::TerritoryCaptured {
            territory_id,
            old_owner,
            new_owner,
            surviving_units,
        });
    }
}

fn reset_unit_stats_for_faction(state: &mut GameState, faction_id: &str) {
    for territory in state.territories.values_mut() {
        if territory.owner.as_deref() == Some(faction_id) {
            for unit in &mut territory.units {
                unit.remaining_movement = unit.base_movement;
                unit.remaining_health = unit.base_health;
            }
        }
    }
}

/// Ends the current faction's turn and starts the next one.
pub(super) fn end_turn(
    state: &mut GameState,
    defs: &Definitions,
    events: &mut Vec<GameEvent>,
) -> Result<(), ActionError> {
    let old_faction = state.current_faction.clone();

    // Unspent purchases are lost.
    state
        .faction_purchased_units
        .insert(old_faction.clone(), Vec::new());

    // Income accrues only while the capital is held.
    if state.owns_capital(&old_faction, defs) {
        let mut pending_income = ResourceMap::new();
        let mut contributing: Vec<String> = Vec::new();
        for (territory_id, territory) in &state.territories {
            if territory.owner.as_deref() != Some(old_faction.as_str()) {
                continue;
            }
            let Some(territory_def) = defs.territory(territory_id) else {
                continue;
            };
            for (resource_id, amount) in &territory_def.produces {
                *pending_income.entry(resource_id.clone()).or_insert(0) += amount;
            }
            if !territory_def.produces.is_empty() {
                contributing.push(territory_id.clone());
            }
        }
        let has_income = !pending_income.is_empty();
        state
            .faction_pending_income
            .insert(old_faction.clone(), pending_income.clone());
        if has_income {
            events.push(GameEvent::IncomeCalculated {
                faction: old_faction.clone(),
                income: pending_income,
                territories: contributing,
            });
        }
    } else {
        state
            .faction_pending_income
            .insert(old_faction.clone(), ResourceMap::new());
    }

    events.push(GameEvent::TurnEnded {
        turn_number: state.turn_number,
        faction: old_faction.clone(),
    });

    // Round-robin over sorted faction ids.
    let faction_ids: Vec<&str> = defs.faction_ids().collect();
    if faction_ids.is_empty() {
        return Err(ActionError::corrupt("no factions defined"));
    }
    let current_idx = faction_ids
        .iter()
        .position(|f| *f == state.current_faction)
        .unwrap_or(0);
    let next_idx = (current_idx + 1) % faction_ids.len();
    state.current_faction = faction_ids[next_idx].to_owned();
    state.phase = Phase::Purchase;

    // A full cycle completed: check victory, and only advance the turn
    // counter when nobody has won.
    if next_idx == 0 {
        if let Some((winner, stronghold_counts, controlled)) = check_victory(state, defs) {
            let required = state.victory_criteria.required_for(&winner);
            state.winner = Some(winner.clone());
            events.push(GameEvent::Victory {
                winner,
                stronghold_counts,
                required,
                controlled,
            });
        } else {
            state.turn_number += 1;
        }
    }

    // Collect the income stored at the end of this faction's previous turn.
    let new_faction = state.current_faction.clone();
    if let Some(income) = state.faction_pending_income.get(&new_faction).cloned() {
        if !income.is_empty() {
            let resources = state.resources_mut(&new_faction);
            let mut new_totals = ResourceMap::new();
            for (resource_id, amount) in &income {
                let entry = resources.entry(resource_id.clone()).or_insert(0);
                *entry += amount;
                new_totals.insert(resource_id.clone(), *entry);
            }
            events.push(GameEvent::IncomeCollected {
                faction: new_faction.clone(),
                income,
                new_totals,
            });
        }
        state
            .faction_pending_income
            .insert(new_faction.clone(), ResourceMap::new());
    }

    // Snapshot territories owned at turn start (camp placement options).
    let owned_now: Vec<String> = state
        .territories
        .iter()
        .filter(|(_, t)| t.owner.as_deref() == Some(new_faction.as_str()))
        .map(|(tid, _)| tid.clone())
        .collect();
    state
        .faction_territories_at_turn_start
        .insert(new_faction.clone(), owned_now);
    state.pending_camps.clear();

    // Mobilization camps for the new turn: owned territories that still
    // hold a standing camp. Camps placed later this turn do not count.
    state.mobilization_camps = state
        .territories
        .iter()
        .filter(|(tid, t)| {
            t.owner.as_deref() == Some(new_faction.as_str())
                && state.territory_has_standing_camp(tid, defs)
        })
        .map(|(tid, _)| tid.clone())
        .collect();

    events.push(GameEvent::TurnStarted {
        turn_number: state.turn_number,
        faction: state.current_faction.clone(),
    });

    Ok(())
}

/// Counts strongholds per alliance and returns the winner with its counts
/// and controlled stronghold list, if any alliance meets its threshold.
/// Alliances are checked in sorted id order, so a (rules-degenerate) tie
/// resolves deterministically.
pub(super) fn check_victory(
    state: &GameState,
    defs: &Definitions,
) -> Option<(String, BTreeMap<String, i64>, Vec<String>)> {
    let mut stronghold_counts: BTreeMap<String, i64> = BTreeMap::new();
    let mut controlled_by_alliance: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for (territory_id, territory) in &state.territories {
        let Some(territory_def) = defs.territory(territory_id) else {
            continue;
        };
        if !territory_def.is_stronghold {
            continue;
        }
        let Some(owner) = territory.owner.as_deref() else {
            continue;
        };
        let Some(alliance) = defs.alliance_of(owner) else {
            continue;
        };
        *stronghold_counts.entry(alliance.to_owned()).or_insert(0) += 1;
        controlled_by_alliance
            .entry(alliance.to_owned())
            .or_default()
            .push(territory_id.clone());
    }

    let winner = stronghold_counts.iter().find_map(|(alliance, &count)| {
        let required = state.victory_criteria.required_for(alliance);
        (required > 0 && count >= required).then(|| alliance.clone())
    });
    winner.map(|alliance| {
        let controlled = controlled_by_alliance.remove(&alliance).unwrap_or_default();
        (alliance, stronghold_counts, controlled)
    })
}
