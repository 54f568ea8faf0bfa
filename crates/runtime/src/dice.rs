//! Dice generation for combat payloads.
//!
//! The core never rolls: the session boundary produces the `dice_rolls`
//! payload (one roll per unit `dice` stat, in unit list order) and submits
//! it inside the action, which keeps every reducer invocation replayable.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use warmarch_core::{Definitions, DiceRolls, UnitInstance};

/// Rolls are 1..=DICE_SIDES; a roll hits when it is at most the unit's
/// effective stat.
pub const DICE_SIDES: i64 = 10;

pub struct DiceRoller {
    rng: StdRng,
}

impl DiceRoller {
    /// OS-seeded roller for live games.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic roller for tests and replays.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn roll(&mut self) -> i64 {
        self.rng.gen_range(1..=DICE_SIDES)
    }

    /// One roll per die of each unit, in unit list order, which is the order the
    /// reducer consumes them in.
    pub fn rolls_for_units(&mut self, units: &[UnitInstance], defs: &Definitions) -> Vec<i64> {
        let mut rolls = Vec::new();
        for unit in units {
            let dice = defs.unit(&unit.unit_id).map_or(1, |d| d.dice);
            for _ in 0..dice {
                rolls.push(self.roll());
            }
        }
        rolls
    }

    /// A full round's payload for both sides.
    pub fn combat_rolls(
        &mut self,
        attackers: &[UnitInstance],
        defenders: &[UnitInstance],
        defs: &Definitions,
    ) -> DiceRolls {
        DiceRolls {
            attacker: self.rolls_for_units(attackers, defs),
            defender: self.rolls_for_units(defenders, defs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use warmarch_core::{Archetype, UnitDef};

    fn defs_with_dice(dice: u32) -> Definitions {
        let mut defs = Definitions::default();
        defs.units.insert(
            "orc".to_owned(),
            UnitDef {
                id: "orc".to_owned(),
                display_name: "Orc".to_owned(),
                faction: "mordor".to_owned(),
                archetype: Archetype::Infantry,
                tags: Vec::new(),
                attack: 2,
                defense: 2,
                movement: 1,
                health: 1,
                cost: BTreeMap::new(),
                dice,
                purchasable: true,
                unique: false,
                icon: None,
                transport_capacity: 0,
                downgrade_to: None,
                specials: Vec::new(),
            },
        );
        defs
    }

    fn instance(id: &str) -> UnitInstance {
        UnitInstance {
            instance_id: id.to_owned(),
            unit_id: "orc".to_owned(),
            remaining_movement: 1,
            remaining_health: 1,
            base_movement: 1,
            base_health: 1,
        }
    }

    #[test]
    fn rolls_stay_in_range_and_match_dice_counts() {
        let defs = defs_with_dice(2);
        let units = vec![instance("mordor_orc_001"), instance("mordor_orc_002")];
        let mut roller = DiceRoller::from_seed(7);

        let rolls = roller.rolls_for_units(&units, &defs);
        assert_eq!(rolls.len(), 4);
        assert!(rolls.iter().all(|r| (1..=DICE_SIDES).contains(r)));
    }

    #[test]
    fn seeded_rollers_are_reproducible() {
        let defs = defs_with_dice(1);
        let units = vec![instance("mordor_orc_001")];
        let a = DiceRoller::from_seed(42).combat_rolls(&units, &units, &defs);
        let b = DiceRoller::from_seed(42).combat_rolls(&units, &units, &defs);
        assert_eq!(a, b);
    }
}
