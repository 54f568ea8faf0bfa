//! Reachability and path-cost queries over the territory graph.
//!
//! Reachability is phase-dependent: combat_move may only end on enemy ground
//! while non_combat_move may never do so, and pass-through rules differ per
//! node class. Cavalry in combat_move additionally enumerate charge routes
//! (sequences of empty enemy territories passed over), so the BFS visited
//! set is keyed on `(territory, charge_path)` rather than territory alone.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::defs::Definitions;
use crate::state::{GameState, Phase, TerritoryState, UnitInstance, unit_owner};

/// Result of a reachability query for one unit.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReachableSet {
    /// Destination territory -> movement cost to reach it.
    pub destinations: BTreeMap<String, i64>,
    /// For cavalry in combat_move: destination -> distinct charge routes,
    /// each the ordered list of empty enemy territories passed through.
    pub charge_routes: BTreeMap<String, Vec<Vec<String>>>,
}

struct NodeClass {
    neutral: bool,
    /// Owned by someone other than the moving faction.
    enemy_owned: bool,
    /// Enemy-owned but by a faction of the mover's alliance.
    allied: bool,
    /// Neutral territory holding at least one unit whose alliance differs
    /// from the mover's or is unknown (unknowns are hostile to everyone).
    neutral_has_enemies: bool,
}

fn classify(territory: &TerritoryState, mover: &str, defs: &Definitions) -> NodeClass {
    let neutral = territory.owner.is_none();
    let enemy_owned = territory
        .owner
        .as_deref()
        .is_some_and(|owner| owner != mover);
    let allied = enemy_owned
        && territory
            .owner
            .as_deref()
            .is_some_and(|owner| defs.same_alliance(owner, mover));

    let mut neutral_has_enemies = false;
    if neutral && defs.faction(mover).is_some() {
        let mover_alliance = defs.alliance_of(mover);
        for unit in &territory.units {
            match defs.alliance_of(unit_owner(&unit.instance_id)) {
                Some(alliance) if Some(alliance) == mover_alliance => {}
                _ => {
                    neutral_has_enemies = true;
                    break;
                }
            }
        }
    }

    NodeClass {
        neutral,
        enemy_owned,
        allied,
        neutral_has_enemies,
    }
}

/// All territories reachable by `unit` from `start` in the given phase.
///
/// BFS up to the unit's `remaining_movement`. Aerial units pass over
/// anything. Cavalry in combat_move may pass through empty enemy-owned
/// territories, recording them on the charge path. Otherwise enemy and
/// contested-neutral nodes are destination-only in combat_move, neutrals do
/// not let attackers through at all, and in non_combat_move enemy ground
/// blocks while a contested neutral is a hard wall.
pub fn reachable_territories(
    unit: &UnitInstance,
    start: &str,
    state: &GameState,
    defs: &Definitions,
    phase: Phase,
) -> ReachableSet {
    let Some(unit_def) = defs.unit(&unit.unit_id) else {
        return ReachableSet::default();
    };
    let is_aerial = unit_def.is_aerial();
    let is_cavalry = unit_def.is_cavalry();
    let can_enter_enemy = phase == Phase::CombatMove;
    let mover = state.current_faction.as_str();

    let mut reachable: BTreeMap<String, i64> = BTreeMap::new();
    let mut charge_routes: BTreeMap<String, Vec<Vec<String>>> = BTreeMap::new();
    let mut visited: BTreeMap<(String, Vec<String>), i64> = BTreeMap::new();
    let mut queue: VecDeque<(String, i64, Vec<String>)> =
        VecDeque::from([(start.to_owned(), 0, Vec::new())]);

    while let Some((territory_id, distance, charge)) = queue.pop_front() {
        if distance > 0 {
            let best = reachable.entry(territory_id.clone()).or_insert(i64::MAX);
            *best = (*best).min(distance);
            if is_cavalry && can_enter_enemy {
                // The recorded route is what was passed *through*: the
                // destination itself is dropped (it is captured by the
                // destination rule, not the charge rule).
                let mut route = charge.clone();
                if route.last() == Some(&territory_id) {
                    route.pop();
                }
                let routes = charge_routes.entry(territory_id.clone()).or_default();
                if !routes.contains(&route) {
                    routes.push(route);
                }
            }
        }

        if distance >= unit.remaining_movement {
            continue;
        }
        let Some(territory_def) = defs.territory(&territory_id) else {
            continue;
        };

        for adjacent_id in &territory_def.adjacent {
            let new_distance = distance + 1;
            let Some(adjacent) = state.territory(adjacent_id) else {
                continue;
            };
            let class = classify(adjacent, mover, defs);
            let hostile_owned = class.enemy_owned && !class.allied;
            let empty_enemy = hostile_owned && adjacent.units.is_empty();

            let new_charge = if is_cavalry && can_enter_enemy && empty_enemy {
                let mut extended = charge.clone();
                extended.push(adjacent_id.clone());
                extended
            } else {
                charge.clone()
            };

            let mut can_pass = true;
            if hostile_owned && !can_enter_enemy && !is_aerial {
                can_pass = false;
            }
            if hostile_owned && can_enter_enemy && !is_aerial && !(is_cavalry && empty_enemy) {
                can_pass = false;
            }
            // Neutrals never let ground units through while attacking, and a
            // contested neutral blocks peaceful movement outright.
            if class.neutral && phase == Phase::CombatMove && !is_aerial {
                can_pass = false;
            }
            if class.neutral
                && phase == Phase::NonCombatMove
                && class.neutral_has_enemies
                && !is_aerial
            {
                can_pass = false;
            }

            if can_pass {
                let key = (adjacent_id.clone(), new_charge.clone());
                if visited.get(&key).is_none_or(|&d| new_distance < d) {
                    visited.insert(key, new_distance);
                    queue.push_back((adjacent_id.clone(), new_distance, new_charge));
                }
            } else if phase == Phase::CombatMove
                && !is_aerial
                && new_distance <= unit.remaining_movement
                && (hostile_owned || (class.neutral && class.neutral_has_enemies))
            {
                // Destination-only: attackable but not traversable.
                let best = reachable.entry(adjacent_id.clone()).or_insert(i64::MAX);
                if new_distance < *best {
                    *best = new_distance;
                }
                if is_cavalry {
                    let routes = charge_routes.entry(adjacent_id.clone()).or_default();
                    if !routes.contains(&charge) {
                        routes.push(charge.clone());
                    }
                }
            }
        }
    }

    // Phase-dependent destination filter.
    let mut destinations = BTreeMap::new();
    for (territory_id, distance) in reachable {
        let Some(territory) = state.territory(&territory_id) else {
            continue;
        };
        let class = classify(territory, mover, defs);
        let hostile_owned = class.enemy_owned && !class.allied;
        let keep = match phase {
            // Combat move must end on enemy ground or a contested neutral.
            Phase::CombatMove => hostile_owned || (class.neutral && class.neutral_has_enemies),
            // Non-combat move must end on friendly, allied, or empty
            // neutral ground; entering a contested neutral would be combat.
            Phase::NonCombatMove => {
                if class.neutral {
                    !class.neutral_has_enemies
                } else {
                    !class.enemy_owned || class.allied
                }
            }
            _ => true,
        };
        if keep {
            destinations.insert(territory_id, distance);
        }
    }

    charge_routes.retain(|territory_id, _| destinations.contains_key(territory_id));

    ReachableSet {
        destinations,
        charge_routes,
    }
}

/// Unweighted shortest-path length in the raw adjacency graph, ignoring
/// pass-through restrictions. This is the cost subtracted from each moving
/// unit's remaining movement when a declared move is applied.
pub fn movement_cost(start: &str, end: &str, defs: &Definitions) -> Option<i64> {
    if start == end {
        return Some(0);
    }

    let mut queue: VecDeque<(String, i64)> = VecDeque::from([(start.to_owned(), 0)]);
    let mut visited: BTreeSet<String> = BTreeSet::from([start.to_owned()]);

    while let Some((territory_id, distance)) = queue.pop_front() {
        let Some(territory_def) = defs.territory(&territory_id) else {
            continue;
        };
        for adjacent_id in &territory_def.adjacent {
            if adjacent_id == end {
                return Some(distance + 1);
            }
            if visited.insert(adjacent_id.clone()) {
                queue.push_back((adjacent_id.clone(), distance + 1));
            }
        }
    }

    None
}
