//! Unit purchasing.

use std::collections::BTreeMap;

use crate::defs::{Definitions, ResourceMap};
use crate::event::GameEvent;
use crate::state::{GameState, UnitStack};

use super::error::ActionError;

/// Buys units into the faction's purchase pool.
///
/// Requires capital ownership. Every requested unit must be purchasable and
/// belong to the buying faction; resources must cover the summed cost; and
/// the cumulative pool (existing + this request) may not exceed this turn's
/// mobilization capacity, since there would be nowhere to deploy the surplus.
pub(super) fn purchase_units(
    state: &mut GameState,
    faction_id: &str,
    purchases: &BTreeMap<String, i64>,
    defs: &Definitions,
    events: &mut Vec<GameEvent>,
) -> Result<(), ActionError> {
    if !state.owns_capital(faction_id, defs) {
        return Err(ActionError::CapitalLost {
            faction: faction_id.to_owned(),
        });
    }

    let mut total_cost = ResourceMap::new();
    let mut requested = 0;
    for (unit_id, &count) in purchases {
        if count <= 0 {
            continue;
        }
        let unit_def = defs.unit(unit_id).ok_or_else(|| ActionError::UnknownUnit {
            unit_id: unit_id.clone(),
        })?;
        if !unit_def.purchasable {
            return Err(ActionError::UnitNotPurchasable {
                unit_id: unit_id.clone(),
            });
        }
        if unit_def.faction != faction_id {
            return Err(ActionError::UnitNotOfFaction {
                faction: faction_id.to_owned(),
                unit_id: unit_id.clone(),
            });
        }
        for (resource_id, amount) in &unit_def.cost {
            *total_cost.entry(resource_id.clone()).or_insert(0) += amount * count;
        }
        requested += count;
    }

    for (resource_id, &need) in &total_cost {
        let have = state.resource_amount(faction_id, resource_id);
        if have < need {
            return Err(ActionError::InsufficientResource {
                resource: resource_id.clone(),
                need,
                have,
            });
        }
    }

    let pooled: i64 = state.purchase_pool(faction_id).iter().map(|s| s.count).sum();
    let capacity = state.mobilization_capacity(defs);
    if requested > 0 && pooled + requested > capacity {
        return Err(ActionError::MobilizationCapacityExceeded {
            requested: pooled + requested,
            capacity,
        });
    }

    for (resource_id, &amount) in &total_cost {
        let resources = state.resources_mut(faction_id);
        let entry = resources.entry(resource_id.clone()).or_insert(0);
        let old_value = *entry;
        *entry -= amount;
        let new_value = *entry;
        events.push(GameEvent::ResourcesChanged {
            faction: faction_id.to_owned(),
            resource: resource_id.clone(),
            old_value,
            new_value,
            reason: "purchase".to_owned(),
        });
    }

    let pool = state.purchase_pool_mut(faction_id);
    for (unit_id, &count) in purchases {
        if count <= 0 {
            continue;
        }
        match pool.iter_mut().find(|stack| stack.unit_id == *unit_id) {
            Some(stack) => stack.count += count,
            None => pool.push(UnitStack::new(unit_id.clone(), count)),
        }
    }

    events.push(GameEvent::UnitsPurchased {
        faction: faction_id.to_owned(),
        purchases: purchases.clone(),
        total_cost,
    });

    Ok(())
}
