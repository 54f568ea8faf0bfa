//! Combat orchestration: initiate, continue, retreat, and terminal
//! resolution.
//!
//! Combat runs on copies of the contested territory's units; after each
//! round casualties are removed from the territory and the survivors'
//! remaining health is synced back so multi-HP units carry damage across
//! rounds. Territory ownership never changes here; captures are queued in
//! `pending_captures` and applied when the combat phase ends.

use std::collections::{BTreeMap, BTreeSet};

use crate::combat::{
    DiceRolls, RoundOutcome, Side, combined_modifiers, group_dice_by_stat, prefire_modifiers,
    resolve_archer_prefire, resolve_round,
};
use crate::defs::{Archetype, Definitions};
use crate::event::GameEvent;
use crate::state::{
    ActiveCombat, CombatRoundRecord, GameState, TerritoryState, UnitInstance, unit_owner,
};

use super::error::ActionError;

pub(super) fn initiate_combat(
    state: &mut GameState,
    attacker_faction: &str,
    territory_id: &str,
    rolls: &DiceRolls,
    defs: &Definitions,
    events: &mut Vec<GameEvent>,
) -> Result<(), ActionError> {
    if state.active_combat.is_some() {
        return Err(ActionError::CombatInProgress {
            action: "initiate_combat".to_owned(),
        });
    }
    let Some(territory) = state.territory(territory_id) else {
        return Err(ActionError::InvalidTerritory {
            territory_id: territory_id.to_owned(),
        });
    };
    let defender_faction = territory.owner.clone();
    if defender_faction.as_deref() == Some(attacker_faction) {
        return Err(ActionError::CannotAttackOwn {
            territory_id: territory_id.to_owned(),
        });
    }

    // Partition co-occupants by instance-id prefix.
    let mut attackers: Vec<UnitInstance> = Vec::new();
    let mut defenders: Vec<UnitInstance> = Vec::new();
    for unit in &territory.units {
        let owner = unit.owner();
        if owner == attacker_faction {
            attackers.push(unit.clone());
        } else if Some(owner) == defender_faction.as_deref() {
            defenders.push(unit.clone());
        }
    }
    if attackers.is_empty() {
        return Err(ActionError::NoAttackers {
            territory_id: territory_id.to_owned(),
        });
    }
    if defenders.is_empty() {
        return Err(ActionError::NoDefenders {
            territory_id: territory_id.to_owned(),
        });
    }

    let attacker_instance_ids: Vec<String> =
        attackers.iter().map(|u| u.instance_id.clone()).collect();
    let defender_instance_ids: Vec<String> =
        defenders.iter().map(|u| u.instance_id.clone()).collect();

    events.push(GameEvent::CombatStarted {
        territory_id: territory_id.to_owned(),
        attacker_faction: attacker_faction.to_owned(),
        attacker_instance_ids,
        defender_faction: defender_faction.clone(),
        defender_instance_ids: defender_instance_ids.clone(),
    });

    let (attacker_mods, defender_mods) =
        combined_modifiers(defs.territory(territory_id), &attackers, &defenders, defs);

    let archers: Vec<UnitInstance> = defenders
        .iter()
        .filter(|u| {
            defs.unit(&u.unit_id)
                .is_some_and(|d| d.archetype == Archetype::Archer)
        })
        .cloned()
        .collect();

    if !archers.is_empty() {
        // Defender archers prefire before round 1: hits land on attackers
        // only, at defense minus 1.
        let outcome =
            resolve_archer_prefire(&mut attackers, &archers, defs, &rolls.defender, &defender_mods);
        let archer_mods = prefire_modifiers(&archers, &defender_mods);
        let defender_dice =
            group_dice_by_stat(&archers, &rolls.defender, defs, Side::Defender, &archer_mods);

        let record = CombatRoundRecord {
            round_number: 0,
            attacker_rolls: Vec::new(),
            defender_rolls: rolls.defender.clone(),
            attacker_hits: 0,
            defender_hits: outcome.defender_hits,
            attacker_casualties: outcome.attacker_casualties.clone(),
            defender_casualties: Vec::new(),
            attackers_remaining: outcome.surviving_attacker_ids.len() as i64,
            defenders_remaining: defenders.len() as i64,
            is_archer_prefire: true,
        };

        events.push(GameEvent::CombatRoundResolved {
            territory_id: territory_id.to_owned(),
            round_number: 0,
            attacker_dice: BTreeMap::new(),
            defender_dice,
            attacker_hits: 0,
            defender_hits: outcome.defender_hits,
            attacker_casualties: outcome.attacker_casualties.clone(),
            defender_casualties: Vec::new(),
            attacker_wounded: outcome.attacker_wounded.clone(),
            defender_wounded: Vec::new(),
            attackers_remaining: outcome.surviving_attacker_ids.len(),
            defenders_remaining: defenders.len(),
            is_archer_prefire: true,
            attacker_hits_by_unit_type: BTreeMap::new(),
            defender_hits_by_unit_type: BTreeMap::new(),
        });
        push_destroyed(
            events,
            &outcome.attacker_casualties,
            Some(attacker_faction.to_owned()),
            territory_id,
        );

        let territory = territory_mut(state, territory_id)?;
        territory.remove_units(&outcome.attacker_casualties);
        sync_survivor_health(territory, &attackers, &defenders);

        if outcome.attackers_eliminated {
            // Every attacker died to the volley; defenders win with no
            // round 1 and no active combat.
            let end = RoundOutcome {
                surviving_defender_ids: defender_instance_ids,
                ..outcome
            };
            return resolve_combat_end(state, attacker_faction, territory_id, &end, 1, defs, events);
        }

        state.active_combat = Some(ActiveCombat {
            attacker_faction: attacker_faction.to_owned(),
            territory_id: territory_id.to_owned(),
            attacker_instance_ids: outcome.surviving_attacker_ids,
            round_number: 0,
            combat_log: vec![record],
            attackers_have_rolled: false,
        });
        return Ok(());
    }

    // No archers: resolve round 1 directly.
    let attacker_dice =
        group_dice_by_stat(&attackers, &rolls.attacker, defs, Side::Attacker, &attacker_mods);
    let defender_dice =
        group_dice_by_stat(&defenders, &rolls.defender, defs, Side::Defender, &defender_mods);

    let outcome = resolve_round(
        &mut attackers,
        &mut defenders,
        defs,
        rolls,
        &attacker_mods,
        &defender_mods,
    );

    let record = CombatRoundRecord {
        round_number: 1,
        attacker_rolls: rolls.attacker.clone(),
        defender_rolls: rolls.defender.clone(),
        attacker_hits: outcome.attacker_hits,
        defender_hits: outcome.defender_hits,
        attacker_casualties: outcome.attacker_casualties.clone(),
        defender_casualties: outcome.defender_casualties.clone(),
        attackers_remaining: outcome.surviving_attacker_ids.len() as i64,
        defenders_remaining: outcome.surviving_defender_ids.len() as i64,
        is_archer_prefire: false,
    };

    events.push(GameEvent::CombatRoundResolved {
        territory_id: territory_id.to_owned(),
        round_number: 1,
        attacker_dice,
        defender_dice,
        attacker_hits: outcome.attacker_hits,
        defender_hits: outcome.defender_hits,
        attacker_casualties: outcome.attacker_casualties.clone(),
        defender_casualties: outcome.defender_casualties.clone(),
        attacker_wounded: outcome.attacker_wounded.clone(),
        defender_wounded: outcome.defender_wounded.clone(),
        attackers_remaining: outcome.surviving_attacker_ids.len(),
        defenders_remaining: outcome.surviving_defender_ids.len(),
        is_archer_prefire: false,
        attacker_hits_by_unit_type: BTreeMap::new(),
        defender_hits_by_unit_type: BTreeMap::new(),
    });
    push_destroyed(
        events,
        &outcome.attacker_casualties,
        Some(attacker_faction.to_owned()),
        territory_id,
    );
    push_destroyed(
        events,
        &outcome.defender_casualties,
        defender_faction.clone(),
        territory_id,
    );

    let territory = territory_mut(state, territory_id)?;
    territory.remove_units(&outcome.attacker_casualties);
    territory.remove_units(&outcome.defender_casualties);
    sync_survivor_health(territory, &attackers, &defenders);

    if outcome.attackers_eliminated || outcome.defenders_eliminated {
        return resolve_combat_end(state, attacker_faction, territory_id, &outcome, 1, defs, events);
    }

    state.active_combat = Some(ActiveCombat {
        attacker_faction: attacker_faction.to_owned(),
        territory_id: territory_id.to_owned(),
        attacker_instance_ids: outcome.surviving_attacker_ids.clone(),
        round_number: 1,
        combat_log: vec![record],
        attackers_have_rolled: true,
    });
    Ok(())
}

pub(super) fn continue_combat(
    state: &mut GameState,
    rolls: &DiceRolls,
    defs: &Definitions,
    events: &mut Vec<GameEvent>,
) -> Result<(), ActionError> {
    let Some(mut combat) = state.active_combat.clone() else {
        return Err(ActionError::NoActiveCombat {
            action: "continue_combat".to_owned(),
        });
    };
    let territory = state
        .territory(&combat.territory_id)
        .ok_or_else(|| ActionError::corrupt(format!(
            "active combat references missing territory {}",
            combat.territory_id
        )))?;
    let defender_faction = territory.owner.clone();

    // Survivors of the last round attack; everyone else defends.
    let surviving: BTreeSet<&str> = combat
        .attacker_instance_ids
        .iter()
        .map(String::as_str)
        .collect();
    let mut attackers: Vec<UnitInstance> = Vec::new();
    let mut defenders: Vec<UnitInstance> = Vec::new();
    for unit in &territory.units {
        if surviving.contains(unit.instance_id.as_str()) {
            attackers.push(unit.clone());
        } else {
            defenders.push(unit.clone());
        }
    }

    let (attacker_mods, defender_mods) = combined_modifiers(
        defs.territory(&combat.territory_id),
        &attackers,
        &defenders,
        defs,
    );

    // Grouped dice and type maps are computed before resolution mutates the
    // unit lists.
    let attacker_dice =
        group_dice_by_stat(&attackers, &rolls.attacker, defs, Side::Attacker, &attacker_mods);
    let defender_dice =
        group_dice_by_stat(&defenders, &rolls.defender, defs, Side::Defender, &defender_mods);
    let attacker_types = unit_type_map(&attackers);
    let defender_types = unit_type_map(&defenders);

    let outcome = resolve_round(
        &mut attackers,
        &mut defenders,
        defs,
        rolls,
        &attacker_mods,
        &defender_mods,
    );

    let attacker_hits_by_unit_type = hits_by_unit_type(
        &outcome.attacker_casualties,
        &outcome.attacker_wounded,
        &attacker_types,
    );
    let defender_hits_by_unit_type = hits_by_unit_type(
        &outcome.defender_casualties,
        &outcome.defender_wounded,
        &defender_types,
    );

    let new_round_number = combat.round_number + 1;
    let record = CombatRoundRecord {
        round_number: new_round_number,
        attacker_rolls: rolls.attacker.clone(),
        defender_rolls: rolls.defender.clone(),
        attacker_hits: outcome.attacker_hits,
        defender_hits: outcome.defender_hits,
        attacker_casualties: outcome.attacker_casualties.clone(),
        defender_casualties: outcome.defender_casualties.clone(),
        attackers_remaining: outcome.surviving_attacker_ids.len() as i64,
        defenders_remaining: outcome.surviving_defender_ids.len() as i64,
        is_archer_prefire: false,
    };

    events.push(GameEvent::CombatRoundResolved {
        territory_id: combat.territory_id.clone(),
        round_number: new_round_number,
        attacker_dice,
        defender_dice,
        attacker_hits: outcome.attacker_hits,
        defender_hits: outcome.defender_hits,
        attacker_casualties: outcome.attacker_casualties.clone(),
        defender_casualties: outcome.defender_casualties.clone(),
        attacker_wounded: outcome.attacker_wounded.clone(),
        defender_wounded: outcome.defender_wounded.clone(),
        attackers_remaining: outcome.surviving_attacker_ids.len(),
        defenders_remaining: outcome.surviving_defender_ids.len(),
        is_archer_prefire: false,
        attacker_hits_by_unit_type,
        defender_hits_by_unit_type,
    });
    push_destroyed(
        events,
        &outcome.attacker_casualties,
        Some(combat.attacker_faction.clone()),
        &combat.territory_id,
    );
    push_destroyed(
        events,
        &outcome.defender_casualties,
        defender_faction,
        &combat.territory_id,
    );

    let territory_id = combat.territory_id.clone();
    let territory = territory_mut(state, &territory_id)?;
    territory.remove_units(&outcome.attacker_casualties);
    territory.remove_units(&outcome.defender_casualties);
    sync_survivor_health(territory, &attackers, &defenders);

    combat.combat_log.push(record);
    combat.round_number = new_round_number;
    combat.attacker_instance_ids = outcome.surviving_attacker_ids.clone();
    combat.attackers_have_rolled = true;

    if outcome.attackers_eliminated || outcome.defenders_eliminated {
        let total_rounds = combat.combat_log.len() as u32;
        return resolve_combat_end(
            state,
            &combat.attacker_faction,
            &combat.territory_id,
            &outcome,
            total_rounds,
            defs,
            events,
        );
    }

    // Combat continues; the attacker chooses continue_combat or retreat.
    state.active_combat = Some(combat);
    Ok(())
}

pub(super) fn retreat(
    state: &mut GameState,
    retreat_to: &str,
    defs: &Definitions,
    events: &mut Vec<GameEvent>,
) -> Result<(), ActionError> {
    let Some(combat) = state.active_combat.clone() else {
        return Err(ActionError::NoActiveCombat {
            action: "retreat".to_owned(),
        });
    };
    // A prefire-only combat has not given the attackers a round yet.
    if !combat.attackers_have_rolled {
        return Err(ActionError::CannotRetreatBeforeRolling);
    }

    let Some(retreat_territory) = state.territory(retreat_to) else {
        return Err(ActionError::InvalidTerritory {
            territory_id: retreat_to.to_owned(),
        });
    };
    if !territory_is_friendly_for_retreat(retreat_territory, &combat.attacker_faction, defs) {
        return Err(ActionError::RetreatDestinationInvalid {
            territory_id: retreat_to.to_owned(),
        });
    }
    if let Some(combat_territory_def) = defs.territory(&combat.territory_id) {
        if !combat_territory_def.adjacent.iter().any(|a| a == retreat_to) {
            return Err(ActionError::RetreatDestinationInvalid {
                territory_id: retreat_to.to_owned(),
            });
        }
    }

    // All surviving attackers leave the contested territory.
    let mut moved: Vec<UnitInstance> = Vec::new();
    if let Some(territory) = state.territory_mut(&combat.territory_id) {
        let mut remaining = Vec::with_capacity(territory.units.len());
        for unit in territory.units.drain(..) {
            if combat.attacker_instance_ids.contains(&unit.instance_id) {
                moved.push(unit);
            } else {
                remaining.push(unit);
            }
        }
        territory.units = remaining;
    }
    if let Some(territory) = state.territory_mut(retreat_to) {
        territory.units.extend(moved);
    }

    events.push(GameEvent::UnitsRetreated {
        faction: combat.attacker_faction.clone(),
        from_territory: combat.territory_id.clone(),
        to_territory: retreat_to.to_owned(),
        unit_instance_ids: combat.attacker_instance_ids.clone(),
    });

    let (defender_faction, surviving_defenders) = match state.territory(&combat.territory_id) {
        Some(territory) => (
            territory.owner.clone(),
            territory
                .units
                .iter()
                .map(|u| u.instance_id.clone())
                .collect(),
        ),
        None => (None, Vec::new()),
    };
    events.push(GameEvent::CombatEnded {
        territory_id: combat.territory_id.clone(),
        winner: "defender".to_owned(),
        attacker_faction: combat.attacker_faction.clone(),
        defender_faction,
        surviving_attackers: Vec::new(),
        surviving_defenders,
        total_rounds: combat.round_number,
    });

    state.active_combat = None;
    Ok(())
}

/// Allied ground (any faction of the attacker's alliance, including their
/// own) or a neutral holding no enemy units.
pub(crate) fn territory_is_friendly_for_retreat(
    territory: &TerritoryState,
    attacker_faction: &str,
    defs: &Definitions,
) -> bool {
    match territory.owner.as_deref() {
        Some(owner) => owner == attacker_faction || defs.same_alliance(owner, attacker_faction),
        None => territory.units.iter().all(|unit| {
            let owner = unit_owner(&unit.instance_id);
            owner == attacker_faction || defs.same_alliance(owner, attacker_faction)
        }),
    }
}

/// Terminal resolution: queue the capture when the attacker cleared an
/// ownable territory, emit `combat_ended`, drop the active combat. Mutual
/// annihilation is a defender win.
fn resolve_combat_end(
    state: &mut GameState,
    attacker_faction: &str,
    territory_id: &str,
    outcome: &RoundOutcome,
    total_rounds: u32,
    defs: &Definitions,
    events: &mut Vec<GameEvent>,
) -> Result<(), ActionError> {
    let old_owner = state
        .territory(territory_id)
        .ok_or_else(|| ActionError::corrupt(format!("combat in missing territory {territory_id}")))?
        .owner
        .clone();

    if outcome.defenders_eliminated && !outcome.attackers_eliminated {
        let ownable = defs.territory(territory_id).is_some_and(|d| d.ownable);
        if old_owner.is_some() && ownable {
            state
                .pending_captures
                .insert(territory_id.to_owned(), attacker_faction.to_owned());
        }
        events.push(GameEvent::CombatEnded {
            territory_id: territory_id.to_owned(),
            winner: "attacker".to_owned(),
            attacker_faction: attacker_faction.to_owned(),
            defender_faction: old_owner,
            surviving_attackers: outcome.surviving_attacker_ids.clone(),
            surviving_defenders: Vec::new(),
            total_rounds,
        });
    } else {
        events.push(GameEvent::CombatEnded {
            territory_id: territory_id.to_owned(),
            winner: "defender".to_owned(),
            attacker_faction: attacker_faction.to_owned(),
            defender_faction: old_owner,
            surviving_attackers: Vec::new(),
            surviving_defenders: outcome.surviving_defender_ids.clone(),
            total_rounds,
        });
    }

    state.active_combat = None;
    Ok(())
}

fn territory_mut<'a>(
    state: &'a mut GameState,
    territory_id: &str,
) -> Result<&'a mut TerritoryState, ActionError> {
    state
        .territory_mut(territory_id)
        .ok_or_else(|| ActionError::corrupt(format!("combat in missing territory {territory_id}")))
}

/// Writes surviving combat copies' remaining health back onto the
/// territory's units so damage carries across rounds.
fn sync_survivor_health(
    territory: &mut TerritoryState,
    attackers: &[UnitInstance],
    defenders: &[UnitInstance],
) {
    let survivor_health: BTreeMap<&str, i64> = attackers
        .iter()
        .chain(defenders.iter())
        .map(|u| (u.instance_id.as_str(), u.remaining_health))
        .collect();
    for unit in &mut territory.units {
        if let Some(&health) = survivor_health.get(unit.instance_id.as_str()) {
            unit.remaining_health = health;
        }
    }
}

fn unit_type_map(units: &[UnitInstance]) -> BTreeMap<String, (String, i64)> {
    units
        .iter()
        .map(|u| {
            (
                u.instance_id.clone(),
                (u.unit_id.clone(), u.base_health),
            )
        })
        .collect()
}

/// Casualties contribute their full base health, wounded units one point.
fn hits_by_unit_type(
    casualties: &[String],
    wounded: &[String],
    types: &BTreeMap<String, (String, i64)>,
) -> BTreeMap<String, i64> {
    let mut totals = BTreeMap::new();
    for instance_id in casualties {
        if let Some((unit_id, base_health)) = types.get(instance_id) {
            *totals.entry(unit_id.clone()).or_insert(0) += base_health;
        }
    }
    for instance_id in wounded {
        if let Some((unit_id, _)) = types.get(instance_id) {
            *totals.entry(unit_id.clone()).or_insert(0) += 1;
        }
    }
    totals
}

fn push_destroyed(
    events: &mut Vec<GameEvent>,
    casualties: &[String],
    faction: Option<String>,
    territory_id: &str,
) {
    for instance_id in casualties {
        let unit_type = instance_id
            .split('_')
            .nth(1)
            .unwrap_or("unknown")
            .to_owned();
        events.push(GameEvent::UnitDestroyed {
            instance_id: instance_id.clone(),
            unit_type,
            faction: faction.clone(),
            territory_id: territory_id.to_owned(),
            cause: "combat".to_owned(),
        });
    }
}
