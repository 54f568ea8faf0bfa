//! Camp purchase and placement.
//!
//! Buying a camp snapshots the eligible territories immediately; the actual
//! placement is deferred to the mobilization phase. A camp placed this turn
//! never enters the current `mobilization_camps`: that list is fixed at
//! turn start, so new camps take effect next turn.

use crate::defs::{Definitions, RESOURCE_POWER};
use crate::event::GameEvent;
use crate::state::{GameState, PendingCamp};

use super::error::ActionError;

pub(super) fn purchase_camp(
    state: &mut GameState,
    faction_id: &str,
    defs: &Definitions,
    events: &mut Vec<GameEvent>,
) -> Result<(), ActionError> {
    let cost = state.camp_cost;
    let power = state.resource_amount(faction_id, RESOURCE_POWER);
    if power < cost {
        return Err(ActionError::InsufficientResource {
            resource: RESOURCE_POWER.to_owned(),
            need: cost,
            have: power,
        });
    }

    // Eligible: owned at turn start, no standing camp, not already used by
    // an earlier pending camp this turn.
    let owned_at_start = state
        .faction_territories_at_turn_start
        .get(faction_id)
        .cloned()
        .unwrap_or_default();
    let already_placed: Vec<&String> = state
        .pending_camps
        .iter()
        .filter_map(|p| p.placed_territory_id.as_ref())
        .collect();
    let territory_options: Vec<String> = owned_at_start
        .into_iter()
        .filter(|tid| {
            !state.territory_has_standing_camp(tid, defs) && !already_placed.contains(&tid)
        })
        .collect();

    if territory_options.is_empty() {
        return Err(ActionError::NoCampPlacementOptions);
    }

    state
        .resources_mut(faction_id)
        .insert(RESOURCE_POWER.to_owned(), power - cost);
    events.push(GameEvent::ResourcesChanged {
        faction: faction_id.to_owned(),
        resource: RESOURCE_POWER.to_owned(),
        old_value: power,
        new_value: power - cost,
        reason: "purchase_camp".to_owned(),
    });

    state.pending_camps.push(PendingCamp {
        territory_options,
        placed_territory_id: None,
    });

    Ok(())
}

pub(super) fn place_camp(
    state: &mut GameState,
    camp_index: i64,
    territory_id: &str,
    defs: &Definitions,
) -> Result<(), ActionError> {
    let length = state.pending_camps.len();
    if camp_index < 0 || camp_index as usize >= length {
        return Err(ActionError::InvalidIndex {
            kind: "camp",
            index: camp_index,
            length,
        });
    }
    let idx = camp_index as usize;

    if state.pending_camps[idx].placed_territory_id.is_some() {
        return Err(ActionError::CampAlreadyPlaced { camp_index });
    }
    if !state.pending_camps[idx]
        .territory_options
        .iter()
        .any(|tid| tid == territory_id)
    {
        return Err(ActionError::CampPlacementInvalid {
            territory_id: territory_id.to_owned(),
        });
    }
    if state.territory_has_standing_camp(territory_id, defs) {
        return Err(ActionError::CampPlacementInvalid {
            territory_id: territory_id.to_owned(),
        });
    }

    let camp_id = format!("purchased_camp_{territory_id}");
    state
        .dynamic_camps
        .insert(camp_id.clone(), territory_id.to_owned());
    state.camps_standing.push(camp_id);
    state.pending_camps[idx].placed_territory_id = Some(territory_id.to_owned());

    Ok(())
}
