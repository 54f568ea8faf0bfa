//! Mobilization: queueing purchased units into camps and the phase-end
//! commit that materializes them.

use crate::defs::Definitions;
use crate::event::{GameEvent, MobilizedUnit};
use crate::setup::units_from_stack;
use crate::state::{GameState, PendingMobilization, UnitStack};

use super::error::ActionError;

/// Queues a mobilization and deducts the units from the purchase pool.
/// Deployment itself happens at end of the mobilization phase.
pub(super) fn mobilize_units(
    state: &mut GameState,
    faction_id: &str,
    destination_id: &str,
    units: &[UnitStack],
    defs: &Definitions,
) -> Result<(), ActionError> {
    if units.is_empty() {
        return Err(ActionError::NoUnits);
    }
    if !state.owns_capital(faction_id, defs) {
        return Err(ActionError::CapitalLost {
            faction: faction_id.to_owned(),
        });
    }
    if !state.mobilization_camps.iter().any(|t| t == destination_id) {
        return Err(ActionError::NotAMobilizationCamp {
            territory_id: destination_id.to_owned(),
        });
    }
    let destination_def =
        defs.territory(destination_id)
            .ok_or_else(|| ActionError::InvalidTerritory {
                territory_id: destination_id.to_owned(),
            })?;
    if !state.territories.contains_key(destination_id) {
        return Err(ActionError::InvalidTerritory {
            territory_id: destination_id.to_owned(),
        });
    }
    // The snapshot was taken at turn start; the camp may have died since.
    if !state.territory_has_standing_camp(destination_id, defs) {
        return Err(ActionError::CampDestroyed {
            territory_id: destination_id.to_owned(),
        });
    }

    for request in units {
        let have = state
            .purchase_pool(faction_id)
            .iter()
            .find(|stack| stack.unit_id == request.unit_id)
            .map_or(0, |stack| stack.count);
        if have < request.count {
            return Err(ActionError::InsufficientPurchased {
                unit_id: request.unit_id.clone(),
                need: request.count,
                have,
            });
        }
    }

    let requested: i64 = units.iter().map(|u| u.count).sum();
    let power = destination_def.power_production();
    if requested > power {
        return Err(ActionError::ExceedsMobilizationPower {
            requested,
            power,
            territory_id: destination_id.to_owned(),
        });
    }

    let pool = state.purchase_pool_mut(faction_id);
    for request in units {
        if let Some(stack) = pool.iter_mut().find(|s| s.unit_id == request.unit_id) {
            stack.count -= request.count;
        }
    }
    pool.retain(|stack| stack.count > 0);

    state.pending_mobilizations.push(PendingMobilization {
        destination: destination_id.to_owned(),
        units: units.to_vec(),
    });

    Ok(())
}

pub(super) fn cancel_mobilization(
    state: &mut GameState,
    mobilization_index: i64,
    events: &mut Vec<GameEvent>,
) -> Result<(), ActionError> {
    let length = state.pending_mobilizations.len();
    if mobilization_index < 0 || mobilization_index as usize >= length {
        return Err(ActionError::InvalidIndex {
            kind: "mobilization",
            index: mobilization_index,
            length,
        });
    }

    let cancelled = state.pending_mobilizations.remove(mobilization_index as usize);
    let faction_id = state.current_faction.clone();
    let pool = state.purchase_pool_mut(&faction_id);
    for request in &cancelled.units {
        match pool.iter_mut().find(|s| s.unit_id == request.unit_id) {
            Some(stack) => stack.count += request.count,
            None => pool.push(request.clone()),
        }
    }

    events.push(GameEvent::MobilizationCancelled {
        destination: cancelled.destination,
        units: cancelled.units,
    });

    Ok(())
}

/// Materializes every queued mobilization into its destination territory,
/// generating fresh instance ids and base stats from the unit definitions.
pub(crate) fn apply_pending_mobilizations(
    state: &mut GameState,
    defs: &Definitions,
    events: &mut Vec<GameEvent>,
) {
    let faction_id = state.current_faction.clone();
    let pending = std::mem::take(&mut state.pending_mobilizations);

    for mobilization in pending {
        if !state.territories.contains_key(&mobilization.destination) {
            continue;
        }
        let mut mobilized: Vec<MobilizedUnit> = Vec::new();
        for request in &mobilization.units {
            let units = units_from_stack(state, &faction_id, request, defs);
            for unit in &units {
                mobilized.push(MobilizedUnit {
                    unit_id: unit.unit_id.clone(),
                    instance_id: unit.instance_id.clone(),
                });
            }
            if let Some(territory) = state.territories.get_mut(&mobilization.destination) {
                territory.units.extend(units);
            }
        }
        if !mobilized.is_empty() {
            events.push(GameEvent::UnitsMobilized {
                faction: faction_id.clone(),
                destination: mobilization.destination.clone(),
                units: mobilized,
            });
        }
    }
}
