//! Game initialization and action replay.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::defs::Definitions;
use crate::engine::{ActionError, apply_action};
use crate::event::GameEvent;
use crate::state::{GameState, TerritoryState, UnitInstance, UnitStack};

/// Starting configuration for a new game, loaded from a setup bundle.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartingSetup {
    /// territory id -> owning faction at game start.
    #[serde(default)]
    pub territory_owners: BTreeMap<String, String>,
    /// territory id -> units standing there at game start.
    #[serde(default)]
    pub starting_units: BTreeMap<String, Vec<UnitStack>>,
}

/// Expands a stack into fresh unit instances with generated ids and base
/// stats from the unit definition. Unknown unit ids expand to nothing.
pub(crate) fn units_from_stack(
    state: &mut GameState,
    faction_id: &str,
    stack: &UnitStack,
    defs: &Definitions,
) -> Vec<UnitInstance> {
    let Some(unit_def) = defs.unit(&stack.unit_id) else {
        return Vec::new();
    };
    (0..stack.count)
        .map(|_| UnitInstance {
            instance_id: state.generate_unit_instance_id(faction_id, &stack.unit_id),
            unit_id: stack.unit_id.clone(),
            remaining_movement: unit_def.movement,
            remaining_health: unit_def.health,
            base_movement: unit_def.movement,
            base_health: unit_def.health,
        })
        .collect()
}

/// Builds the initial game state from definitions and a starting setup.
///
/// Ownership (and `original_owner`) comes from the setup's
/// `territory_owners`, falling back to faction capitals when the setup
/// names none. Starting resources equal one turn of production over owned
/// territories, and the first faction's mobilization camps and
/// turn-start territory snapshot are taken immediately.
pub fn initialize_game_state(defs: &Definitions, setup: &StartingSetup) -> GameState {
    let mut state = GameState::default();

    for territory_id in defs.territories.keys() {
        state
            .territories
            .insert(territory_id.clone(), TerritoryState::default());
    }

    if setup.territory_owners.is_empty() {
        for (faction_id, faction_def) in &defs.factions {
            if let Some(territory) = state.territories.get_mut(&faction_def.capital) {
                territory.owner = Some(faction_id.clone());
                territory.original_owner = Some(faction_id.clone());
            }
        }
    } else {
        for (territory_id, owner) in &setup.territory_owners {
            if let Some(territory) = state.territories.get_mut(territory_id) {
                territory.owner = Some(owner.clone());
                territory.original_owner = Some(owner.clone());
            }
        }
    }

    for faction_id in defs.factions.keys() {
        state.faction_resources.insert(faction_id.clone(), BTreeMap::new());
        state
            .faction_purchased_units
            .insert(faction_id.clone(), Vec::new());
    }

    // Starting resources: one turn of production over owned territories.
    let mut production: Vec<(String, String, i64)> = Vec::new();
    for (territory_id, territory) in &state.territories {
        let Some(owner) = territory.owner.as_deref() else {
            continue;
        };
        if !defs.factions.contains_key(owner) {
            continue;
        }
        let Some(territory_def) = defs.territory(territory_id) else {
            continue;
        };
        for (resource_id, amount) in &territory_def.produces {
            production.push((owner.to_owned(), resource_id.clone(), *amount));
        }
    }
    for (owner, resource_id, amount) in production {
        *state.resources_mut(&owner).entry(resource_id).or_insert(0) += amount;
    }

    state.current_faction = defs
        .factions
        .keys()
        .next()
        .cloned()
        .unwrap_or_default();

    // All definition camps stand at game start.
    state.camps_standing = defs.camps.keys().cloned().collect();

    // Materialize starting units; the owning faction is the territory owner.
    for (territory_id, stacks) in &setup.starting_units {
        let Some(owner) = state
            .territories
            .get(territory_id)
            .and_then(|t| t.owner.clone())
        else {
            continue;
        };
        for stack in stacks {
            let units = units_from_stack(&mut state, &owner, stack, defs);
            if let Some(territory) = state.territories.get_mut(territory_id) {
                territory.units.extend(units);
            }
        }
    }

    // First faction's turn-start snapshots.
    let first_faction = state.current_faction.clone();
    let owned: Vec<String> = state
        .territories
        .iter()
        .filter(|(_, t)| t.owner.as_deref() == Some(first_faction.as_str()))
        .map(|(tid, _)| tid.clone())
        .collect();
    state
        .faction_territories_at_turn_start
        .insert(first_faction.clone(), owned);
    state.mobilization_camps = state
        .territories
        .iter()
        .filter(|(tid, t)| {
            t.owner.as_deref() == Some(first_faction.as_str())
                && state.territory_has_standing_camp(tid, defs)
        })
        .map(|(tid, _)| tid.clone())
        .collect();

    state
}

/// Replays a series of actions from an initial state (event sourcing).
/// Returns the final state and the concatenation of all event lists.
pub fn replay_actions(
    initial_state: &GameState,
    actions: &[Action],
    defs: &Definitions,
) -> Result<(GameState, Vec<GameEvent>), ActionError> {
    let mut current = initial_state.clone();
    let mut all_events = Vec::new();
    for action in actions {
        let (next, events) = apply_action(&current, action, defs)?;
        current = next;
        all_events.extend(events);
    }
    Ok((current, all_events))
}
