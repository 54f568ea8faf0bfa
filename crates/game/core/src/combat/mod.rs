//! Per-round combat resolution.
//!
//! Rounds are simultaneous: both sides' hits are counted before any casualty
//! is applied. Casualty assignment is deterministic and re-sorts the target
//! list after every single hit so multi-HP units soak one point and then
//! step aside in favor of equally wounded but cheaper units. Defender
//! archers may prefire before round 1 at defense minus 1, hitting attackers only.
//!
//! All functions here operate on unit lists copied out of the contested
//! territory; the reducer syncs survivors' health back afterwards.

mod modifiers;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::defs::{Definitions, UnitDef};
use crate::state::UnitInstance;

pub use modifiers::{
    anti_cavalry_modifiers, captain_modifiers, combined_modifiers, merge_modifiers,
    terrain_modifiers,
};

/// Per-instance stat adjustment for one round: instance id -> modifier.
pub type StatModifiers = BTreeMap<String, i64>;

/// Dice payload for one round, as submitted by the caller.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceRolls {
    #[serde(default)]
    pub attacker: Vec<i64>,
    #[serde(default)]
    pub defender: Vec<i64>,
}

/// Which stat a side rolls against this round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Attacker,
    Defender,
}

impl Side {
    fn stat_of(self, unit_def: &UnitDef) -> i64 {
        match self {
            Side::Attacker => unit_def.attack,
            Side::Defender => unit_def.defense,
        }
    }
}

/// Outcome of a single resolved round.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoundOutcome {
    pub attacker_hits: i64,
    pub defender_hits: i64,
    pub attacker_casualties: Vec<String>,
    pub defender_casualties: Vec<String>,
    pub attacker_wounded: Vec<String>,
    pub defender_wounded: Vec<String>,
    pub surviving_attacker_ids: Vec<String>,
    pub surviving_defender_ids: Vec<String>,
    pub attackers_eliminated: bool,
    pub defenders_eliminated: bool,
}

/// Resolves one simultaneous round, mutating both lists in place (dead units
/// removed, survivor health decremented).
pub fn resolve_round(
    attackers: &mut Vec<UnitInstance>,
    defenders: &mut Vec<UnitInstance>,
    defs: &Definitions,
    rolls: &DiceRolls,
    attacker_mods: &StatModifiers,
    defender_mods: &StatModifiers,
) -> RoundOutcome {
    let attacker_hits = count_hits(attackers, &rolls.attacker, defs, Side::Attacker, attacker_mods);
    let defender_hits = count_hits(defenders, &rolls.defender, defs, Side::Defender, defender_mods);

    // Each side takes the other side's hits; both counts are fixed above
    // before any casualty lands.
    let (attacker_casualties, attacker_wounded) =
        apply_hits(attackers, defender_hits, defs, Side::Attacker);
    let (defender_casualties, defender_wounded) =
        apply_hits(defenders, attacker_hits, defs, Side::Defender);

    RoundOutcome {
        attacker_hits,
        defender_hits,
        attacker_casualties,
        defender_casualties,
        attacker_wounded,
        defender_wounded,
        surviving_attacker_ids: attackers.iter().map(|u| u.instance_id.clone()).collect(),
        surviving_defender_ids: defenders.iter().map(|u| u.instance_id.clone()).collect(),
        attackers_eliminated: attackers.is_empty(),
        defenders_eliminated: defenders.is_empty(),
    }
}

/// Defender archer prefire: only the given archers roll, at defense minus 1
/// (merged with any extra modifiers), and hits land on attackers only.
/// Defenders take no casualties in this step.
pub fn resolve_archer_prefire(
    attackers: &mut Vec<UnitInstance>,
    defender_archers: &[UnitInstance],
    defs: &Definitions,
    defender_rolls: &[i64],
    extra_defender_mods: &StatModifiers,
) -> RoundOutcome {
    let prefire_mods = prefire_modifiers(defender_archers, extra_defender_mods);
    let defender_hits = count_hits(
        defender_archers,
        defender_rolls,
        defs,
        Side::Defender,
        &prefire_mods,
    );

    let (attacker_casualties, attacker_wounded) =
        apply_hits(attackers, defender_hits, defs, Side::Attacker);

    RoundOutcome {
        attacker_hits: 0,
        defender_hits,
        attacker_casualties,
        defender_casualties: Vec::new(),
        attacker_wounded,
        defender_wounded: Vec::new(),
        surviving_attacker_ids: attackers.iter().map(|u| u.instance_id.clone()).collect(),
        surviving_defender_ids: defender_archers
            .iter()
            .map(|u| u.instance_id.clone())
            .collect(),
        attackers_eliminated: attackers.is_empty(),
        defenders_eliminated: false,
    }
}

/// Archer prefire rolls at defense minus 1, merged with the round's modifiers.
pub fn prefire_modifiers(
    defender_archers: &[UnitInstance],
    extra_defender_mods: &StatModifiers,
) -> StatModifiers {
    defender_archers
        .iter()
        .map(|u| {
            let extra = extra_defender_mods.get(&u.instance_id).copied().unwrap_or(0);
            (u.instance_id.clone(), -1 + extra)
        })
        .collect()
}

/// Counts hits for one side: units consume their `dice` rolls in list order,
/// a roll hits when it is ≤ stat + modifier. Excess rolls are ignored,
/// insufficient rolls simply stop counting.
fn count_hits(
    units: &[UnitInstance],
    rolls: &[i64],
    defs: &Definitions,
    side: Side,
    mods: &StatModifiers,
) -> i64 {
    let mut hits = 0;
    let mut roll_idx = 0;

    for unit in units {
        let Some(unit_def) = defs.unit(&unit.unit_id) else {
            continue;
        };
        let stat = side.stat_of(unit_def) + mods.get(&unit.instance_id).copied().unwrap_or(0);
        for _ in 0..unit_def.dice {
            if let Some(&roll) = rolls.get(roll_idx) {
                if roll <= stat {
                    hits += 1;
                }
                roll_idx += 1;
            }
        }
    }

    hits
}

/// Applies `hits` to `units` one at a time, re-sorting before every hit.
///
/// Target priority: highest remaining health first (soak), then cheapest,
/// then weakest stat, then least remaining movement. Returns
/// `(destroyed_ids, wounded_ids)`; wounded are units that took damage but
/// survived the round.
fn apply_hits(
    units: &mut Vec<UnitInstance>,
    hits: i64,
    defs: &Definitions,
    side: Side,
) -> (Vec<String>, Vec<String>) {
    let mut destroyed: Vec<String> = Vec::new();
    let mut wounded: BTreeSet<String> = BTreeSet::new();
    let mut remaining = hits;

    let sort_key = |unit: &UnitInstance| match defs.unit(&unit.unit_id) {
        Some(unit_def) => (
            -unit.remaining_health,
            unit_def.total_cost(),
            side.stat_of(unit_def),
            unit.remaining_movement,
        ),
        None => (-1, i64::MAX, i64::MAX, i64::MAX),
    };

    while remaining > 0 && !units.is_empty() {
        units.sort_by_key(sort_key);
        let target = &mut units[0];
        target.remaining_health -= 1;
        remaining -= 1;

        if target.remaining_health == 0 {
            let fallen = units.remove(0);
            wounded.remove(&fallen.instance_id);
            destroyed.push(fallen.instance_id);
        } else {
            wounded.insert(target.instance_id.clone());
        }
    }

    (destroyed, wounded.into_iter().collect())
}

/// How many rolls a side needs this round.
pub fn required_dice(units: &[UnitInstance], defs: &Definitions) -> u32 {
    units
        .iter()
        .map(|u| defs.unit(&u.unit_id).map_or(1, |d| d.dice))
        .sum()
}

/// One bucket of the per-stat dice grouping sent to clients.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceGroup {
    pub rolls: Vec<i64>,
    pub hits: i64,
}

/// Groups a side's rolls by effective stat value for display: each stat
/// bucket receives as many rolls as its units have dice, in ascending stat
/// order so the assignment is deterministic.
pub fn group_dice_by_stat(
    units: &[UnitInstance],
    rolls: &[i64],
    defs: &Definitions,
    side: Side,
    mods: &StatModifiers,
) -> BTreeMap<i64, DiceGroup> {
    let mut dice_per_stat: BTreeMap<i64, u32> = BTreeMap::new();
    for unit in units {
        let Some(unit_def) = defs.unit(&unit.unit_id) else {
            continue;
        };
        let stat = side.stat_of(unit_def) + mods.get(&unit.instance_id).copied().unwrap_or(0);
        *dice_per_stat.entry(stat).or_insert(0) += unit_def.dice;
    }

    let mut grouped = BTreeMap::new();
    let mut roll_idx = 0;
    for (stat, dice_count) in dice_per_stat {
        let mut group = DiceGroup::default();
        for _ in 0..dice_count {
            if let Some(&roll) = rolls.get(roll_idx) {
                group.rolls.push(roll);
                if roll <= stat {
                    group.hits += 1;
                }
                roll_idx += 1;
            }
        }
        grouped.insert(stat, group);
    }

    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::Archetype;

    fn unit_def(id: &str, archetype: Archetype, attack: i64, defense: i64, health: i64, cost: i64) -> UnitDef {
        UnitDef {
            id: id.to_owned(),
            display_name: id.to_owned(),
            faction: "gondor".to_owned(),
            archetype,
            tags: Vec::new(),
            attack,
            defense,
            movement: 1,
            health,
            cost: BTreeMap::from([("power".to_owned(), cost)]),
            dice: 1,
            purchasable: true,
            unique: false,
            icon: None,
            transport_capacity: 0,
            downgrade_to: None,
            specials: Vec::new(),
        }
    }

    fn instance(instance_id: &str, unit_id: &str, health: i64) -> UnitInstance {
        UnitInstance {
            instance_id: instance_id.to_owned(),
            unit_id: unit_id.to_owned(),
            remaining_movement: 1,
            remaining_health: health,
            base_movement: 1,
            base_health: health,
        }
    }

    fn fixture_defs() -> Definitions {
        let mut defs = Definitions::default();
        defs.units.insert(
            "gondor_infantry".to_owned(),
            unit_def("gondor_infantry", Archetype::Infantry, 2, 3, 1, 2),
        );
        defs.units.insert(
            "gondor_knight".to_owned(),
            unit_def("gondor_knight", Archetype::Cavalry, 4, 3, 1, 5),
        );
        defs.units.insert(
            "mordor_troll".to_owned(),
            unit_def("mordor_troll", Archetype::Other, 4, 3, 3, 8),
        );
        defs.units.insert(
            "mordor_archer".to_owned(),
            unit_def("mordor_archer", Archetype::Archer, 1, 3, 1, 2),
        );
        defs
    }

    #[test]
    fn hits_respect_stat_and_modifier() {
        let defs = fixture_defs();
        let units = vec![
            instance("gondor_gondor_infantry_001", "gondor_infantry", 1),
            instance("gondor_gondor_knight_001", "gondor_knight", 1),
        ];
        // attack 2 and 4: rolls 3 (miss) and 4 (hit).
        let hits = count_hits(&units, &[3, 4], &defs, Side::Attacker, &StatModifiers::new());
        assert_eq!(hits, 1);

        // +1 to the infantry turns the 3 into a hit.
        let mods = StatModifiers::from([("gondor_gondor_infantry_001".to_owned(), 1)]);
        let hits = count_hits(&units, &[3, 4], &defs, Side::Attacker, &mods);
        assert_eq!(hits, 2);
    }

    #[test]
    fn excess_rolls_are_ignored_and_missing_rolls_stop_counting() {
        let defs = fixture_defs();
        let units = vec![instance("gondor_gondor_infantry_001", "gondor_infantry", 1)];
        assert_eq!(
            count_hits(&units, &[1, 1, 1], &defs, Side::Attacker, &StatModifiers::new()),
            1
        );
        assert_eq!(
            count_hits(&units, &[], &defs, Side::Attacker, &StatModifiers::new()),
            0
        );
    }

    #[test]
    fn multi_hp_unit_soaks_one_hit_then_steps_aside() {
        let defs = fixture_defs();
        let mut units = vec![
            instance("mordor_mordor_troll_001", "mordor_troll", 3),
            instance("gondor_gondor_infantry_001", "gondor_infantry", 1),
        ];
        // The troll (3 HP) soaks hits until it reaches 1 HP. At that point
        // it ties the infantry on health and the cheaper infantry takes the
        // next hit instead.
        let (destroyed, wounded) = apply_hits(&mut units, 3, &defs, Side::Defender);
        assert!(destroyed.is_empty());
        assert_eq!(wounded, vec!["mordor_mordor_troll_001".to_owned()]);
        assert_eq!(units.len(), 2);

        let (destroyed, _) = apply_hits(&mut units, 1, &defs, Side::Defender);
        assert_eq!(destroyed, vec!["gondor_gondor_infantry_001".to_owned()]);
    }

    #[test]
    fn simultaneous_round_counts_hits_before_casualties() {
        let defs = fixture_defs();
        let mut attackers = vec![instance("gondor_gondor_infantry_001", "gondor_infantry", 1)];
        let mut defenders = vec![instance("mordor_mordor_archer_001", "mordor_archer", 1)];
        let rolls = DiceRolls {
            attacker: vec![1],
            defender: vec![1],
        };
        let outcome = resolve_round(
            &mut attackers,
            &mut defenders,
            &defs,
            &rolls,
            &StatModifiers::new(),
            &StatModifiers::new(),
        );
        // Mutual annihilation: both hit even though both die.
        assert_eq!(outcome.attacker_hits, 1);
        assert_eq!(outcome.defender_hits, 1);
        assert!(outcome.attackers_eliminated);
        assert!(outcome.defenders_eliminated);
    }

    #[test]
    fn prefire_rolls_at_defense_minus_one_and_spares_defenders() {
        let defs = fixture_defs();
        let mut attackers = vec![
            instance("gondor_gondor_infantry_001", "gondor_infantry", 1),
            instance("gondor_gondor_infantry_002", "gondor_infantry", 1),
        ];
        let archers = vec![instance("mordor_mordor_archer_001", "mordor_archer", 1)];

        // defense 3, prefire at 2: a roll of 3 misses, a roll of 2 hits.
        let miss = resolve_archer_prefire(
            &mut attackers.clone(),
            &archers,
            &defs,
            &[3],
            &StatModifiers::new(),
        );
        assert_eq!(miss.defender_hits, 0);

        let hit = resolve_archer_prefire(&mut attackers, &archers, &defs, &[2], &StatModifiers::new());
        assert_eq!(hit.defender_hits, 1);
        assert_eq!(hit.attacker_casualties.len(), 1);
        assert!(hit.defender_casualties.is_empty());
        assert!(!hit.defenders_eliminated);
    }

    #[test]
    fn dice_grouping_assigns_rolls_in_ascending_stat_order() {
        let defs = fixture_defs();
        let units = vec![
            instance("gondor_gondor_knight_001", "gondor_knight", 1),
            instance("gondor_gondor_infantry_001", "gondor_infantry", 1),
            instance("gondor_gondor_infantry_002", "gondor_infantry", 1),
        ];
        let grouped = group_dice_by_stat(&units, &[3, 1, 4], &defs, Side::Attacker, &StatModifiers::new());
        // attack=2 bucket gets the first two rolls, attack=4 the third.
        assert_eq!(grouped[&2].rolls, vec![3, 1]);
        assert_eq!(grouped[&2].hits, 1);
        assert_eq!(grouped[&4].rolls, vec![4]);
        assert_eq!(grouped[&4].hits, 1);
    }

    #[test]
    fn hit_totals_never_exceed_dice_rolled() {
        let defs = fixture_defs();
        let units = vec![
            instance("gondor_gondor_infantry_001", "gondor_infantry", 1),
            instance("gondor_gondor_knight_001", "gondor_knight", 1),
        ];
        let rolls = vec![1, 1, 1, 1, 1];
        let hits = count_hits(&units, &rolls, &defs, Side::Attacker, &StatModifiers::new());
        assert!(hits <= required_dice(&units, &defs) as i64);
    }
}
