//! Per-round stat modifiers: terrain, anti-cavalry, captain.
//!
//! All three are recomputed fresh each round (anti-cavalry fades when the
//! last opposing cavalry dies, captains stop boosting the fallen) and merged
//! per instance id before hit counting.

use std::collections::BTreeSet;

use crate::defs::{Archetype, Definitions, TerritoryDef};
use crate::state::UnitInstance;

use super::StatModifiers;

/// Default terrain bonus table: terrain type -> bonus for units carrying a
/// matching tag. The bonus applies to whichever stat the unit rolls.
const TERRAIN_BONUSES: [(&str, i64); 3] = [("forest", 1), ("mountain", 1), ("city", 1)];

const ANTI_CAVALRY_TAG: &str = "anti_cavalry";
const CAPTAIN_TAG: &str = "captain";
/// A captain boosts at most this many same-archetype allies.
const CAPTAIN_MAX_ALLIES: usize = 3;

fn terrain_bonus(terrain_type: &str) -> Option<i64> {
    TERRAIN_BONUSES
        .iter()
        .find(|(terrain, _)| *terrain == terrain_type)
        .map(|(_, bonus)| *bonus)
}

/// Units with a tag matching the contested territory's terrain get the
/// table bonus on both sides.
pub fn terrain_modifiers(
    territory_def: Option<&TerritoryDef>,
    attackers: &[UnitInstance],
    defenders: &[UnitInstance],
    defs: &Definitions,
) -> (StatModifiers, StatModifiers) {
    let Some(territory_def) = territory_def else {
        return (StatModifiers::new(), StatModifiers::new());
    };
    let Some(bonus) = terrain_bonus(&territory_def.terrain_type) else {
        return (StatModifiers::new(), StatModifiers::new());
    };

    let apply = |units: &[UnitInstance]| -> StatModifiers {
        units
            .iter()
            .filter(|u| {
                defs.unit(&u.unit_id)
                    .is_some_and(|d| d.has_tag(&territory_def.terrain_type))
            })
            .map(|u| (u.instance_id.clone(), bonus))
            .collect()
    };

    (apply(attackers), apply(defenders))
}

/// Units tagged `anti_cavalry` get +1 while the opposing side still fields
/// at least one cavalry-archetype unit.
pub fn anti_cavalry_modifiers(
    attackers: &[UnitInstance],
    defenders: &[UnitInstance],
    defs: &Definitions,
) -> (StatModifiers, StatModifiers) {
    let has_cavalry = |units: &[UnitInstance]| {
        units.iter().any(|u| {
            defs.unit(&u.unit_id)
                .is_some_and(|d| d.archetype == Archetype::Cavalry)
        })
    };

    let apply = |units: &[UnitInstance], opposing_cavalry: bool| -> StatModifiers {
        if !opposing_cavalry {
            return StatModifiers::new();
        }
        units
            .iter()
            .filter(|u| defs.unit(&u.unit_id).is_some_and(|d| d.has_tag(ANTI_CAVALRY_TAG)))
            .map(|u| (u.instance_id.clone(), 1))
            .collect()
    };

    (
        apply(attackers, has_cavalry(defenders)),
        apply(defenders, has_cavalry(attackers)),
    )
}

/// Units tagged `captain` grant +1 to up to three same-archetype,
/// non-captain allies. An ally receives at most +1 no matter how many
/// captains are present.
pub fn captain_modifiers(
    attackers: &[UnitInstance],
    defenders: &[UnitInstance],
    defs: &Definitions,
) -> (StatModifiers, StatModifiers) {
    let apply = |units: &[UnitInstance]| -> StatModifiers {
        let mut mods = StatModifiers::new();
        let mut boosted: BTreeSet<&str> = BTreeSet::new();

        for captain in units {
            let Some(captain_def) = defs.unit(&captain.unit_id) else {
                continue;
            };
            if !captain_def.has_tag(CAPTAIN_TAG) {
                continue;
            }

            let mut granted = 0;
            for ally in units {
                if granted >= CAPTAIN_MAX_ALLIES {
                    break;
                }
                if ally.instance_id == captain.instance_id
                    || boosted.contains(ally.instance_id.as_str())
                {
                    continue;
                }
                let Some(ally_def) = defs.unit(&ally.unit_id) else {
                    continue;
                };
                if ally_def.has_tag(CAPTAIN_TAG) || ally_def.archetype != captain_def.archetype {
                    continue;
                }
                mods.insert(ally.instance_id.clone(), 1);
                boosted.insert(ally.instance_id.as_str());
                granted += 1;
            }
        }

        mods
    };

    (apply(attackers), apply(defenders))
}

/// Sums modifier maps per instance id.
pub fn merge_modifiers(sources: &[&StatModifiers]) -> StatModifiers {
    let mut merged = StatModifiers::new();
    for source in sources {
        for (instance_id, value) in source.iter() {
            *merged.entry(instance_id.clone()).or_insert(0) += value;
        }
    }
    merged
}

/// Terrain + anti-cavalry + captain, merged, for one round of combat in the
/// given territory.
pub fn combined_modifiers(
    territory_def: Option<&TerritoryDef>,
    attackers: &[UnitInstance],
    defenders: &[UnitInstance],
    defs: &Definitions,
) -> (StatModifiers, StatModifiers) {
    let (terrain_att, terrain_def) = terrain_modifiers(territory_def, attackers, defenders, defs);
    let (anticav_att, anticav_def) = anti_cavalry_modifiers(attackers, defenders, defs);
    let (captain_att, captain_def) = captain_modifiers(attackers, defenders, defs);
    (
        merge_modifiers(&[&terrain_att, &anticav_att, &captain_att]),
        merge_modifiers(&[&terrain_def, &anticav_def, &captain_def]),
    )
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::defs::UnitDef;

    fn unit_def(id: &str, archetype: Archetype, tags: &[&str]) -> UnitDef {
        UnitDef {
            id: id.to_owned(),
            display_name: id.to_owned(),
            faction: "gondor".to_owned(),
            archetype,
            tags: tags.iter().map(|t| (*t).to_owned()).collect(),
            attack: 2,
            defense: 2,
            movement: 1,
            health: 1,
            cost: BTreeMap::new(),
            dice: 1,
            purchasable: true,
            unique: false,
            icon: None,
            transport_capacity: 0,
            downgrade_to: None,
            specials: Vec::new(),
        }
    }

    fn instance(instance_id: &str, unit_id: &str) -> UnitInstance {
        UnitInstance {
            instance_id: instance_id.to_owned(),
            unit_id: unit_id.to_owned(),
            remaining_movement: 1,
            remaining_health: 1,
            base_movement: 1,
            base_health: 1,
        }
    }

    fn forest() -> TerritoryDef {
        TerritoryDef {
            id: "fangorn".to_owned(),
            display_name: "Fangorn".to_owned(),
            terrain_type: "forest".to_owned(),
            adjacent: Vec::new(),
            produces: BTreeMap::new(),
            is_stronghold: false,
            ownable: true,
        }
    }

    #[test]
    fn terrain_bonus_requires_matching_tag() {
        let mut defs = Definitions::default();
        defs.units.insert(
            "elf".to_owned(),
            unit_def("elf", Archetype::Infantry, &["forest"]),
        );
        defs.units
            .insert("man".to_owned(), unit_def("man", Archetype::Infantry, &[]));

        let attackers = vec![instance("gondor_elf_001", "elf"), instance("gondor_man_001", "man")];
        let (att, def) = terrain_modifiers(Some(&forest()), &attackers, &[], &defs);
        assert_eq!(att.get("gondor_elf_001"), Some(&1));
        assert!(att.get("gondor_man_001").is_none());
        assert!(def.is_empty());
    }

    #[test]
    fn anti_cavalry_fades_without_opposing_cavalry() {
        let mut defs = Definitions::default();
        defs.units.insert(
            "pikeman".to_owned(),
            unit_def("pikeman", Archetype::Infantry, &["anti_cavalry"]),
        );
        defs.units.insert(
            "rider".to_owned(),
            unit_def("rider", Archetype::Cavalry, &[]),
        );

        let pikemen = vec![instance("gondor_pikeman_001", "pikeman")];
        let riders = vec![instance("mordor_rider_001", "rider")];

        let (att, _) = anti_cavalry_modifiers(&pikemen, &riders, &defs);
        assert_eq!(att.get("gondor_pikeman_001"), Some(&1));

        let (att, _) = anti_cavalry_modifiers(&pikemen, &[], &defs);
        assert!(att.is_empty());
    }

    #[test]
    fn captain_boosts_at_most_three_allies_without_stacking() {
        let mut defs = Definitions::default();
        defs.units.insert(
            "captain".to_owned(),
            unit_def("captain", Archetype::Infantry, &["captain"]),
        );
        defs.units.insert(
            "soldier".to_owned(),
            unit_def("soldier", Archetype::Infantry, &[]),
        );
        defs.units.insert(
            "rider".to_owned(),
            unit_def("rider", Archetype::Cavalry, &[]),
        );

        let side = vec![
            instance("gondor_captain_001", "captain"),
            instance("gondor_captain_002", "captain"),
            instance("gondor_soldier_001", "soldier"),
            instance("gondor_soldier_002", "soldier"),
            instance("gondor_soldier_003", "soldier"),
            instance("gondor_soldier_004", "soldier"),
            instance("gondor_rider_001", "rider"),
        ];
        let (mods, _) = captain_modifiers(&side, &[], &defs);
        // Two captains cover all four soldiers, +1 each, never +2.
        assert_eq!(mods.len(), 4);
        assert!(mods.values().all(|&v| v == 1));
        // Different archetype is never boosted.
        assert!(mods.get("gondor_rider_001").is_none());
    }

    #[test]
    fn merge_sums_per_instance() {
        let a = StatModifiers::from([("x".to_owned(), 1)]);
        let b = StatModifiers::from([("x".to_owned(), 1), ("y".to_owned(), 1)]);
        let merged = merge_modifiers(&[&a, &b]);
        assert_eq!(merged.get("x"), Some(&2));
        assert_eq!(merged.get("y"), Some(&1));
    }
}
