//! Shared fixture: a small three-faction map in the shape the setup
//! bundles use, plus helpers for driving turns in tests.
#![allow(dead_code)]

use std::collections::BTreeMap;

use warmarch_core::{
    Action, Archetype, CampDef, Definitions, FactionDef, GameState, StartingSetup, TerritoryDef,
    UnitDef, UnitInstance, UnitStack, apply_action, initialize_game_state,
};

pub fn territory(
    id: &str,
    terrain: &str,
    power: i64,
    stronghold: bool,
    adjacent: &[&str],
) -> TerritoryDef {
    TerritoryDef {
        id: id.to_owned(),
        display_name: id.to_owned(),
        terrain_type: terrain.to_owned(),
        adjacent: adjacent.iter().map(|s| (*s).to_owned()).collect(),
        produces: if power > 0 {
            BTreeMap::from([("power".to_owned(), power)])
        } else {
            BTreeMap::new()
        },
        is_stronghold: stronghold,
        ownable: true,
    }
}

pub fn unit_def(
    id: &str,
    faction: &str,
    archetype: Archetype,
    tags: &[&str],
    attack: i64,
    defense: i64,
    movement: i64,
    health: i64,
    cost: i64,
) -> UnitDef {
    UnitDef {
        id: id.to_owned(),
        display_name: id.to_owned(),
        faction: faction.to_owned(),
        archetype,
        tags: tags.iter().map(|t| (*t).to_owned()).collect(),
        attack,
        defense,
        movement,
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

fn faction(id: &str, alliance: &str, capital: &str) -> FactionDef {
    FactionDef {
        id: id.to_owned(),
        display_name: id.to_owned(),
        alliance: alliance.to_owned(),
        capital: capital.to_owned(),
        color: "#888888".to_owned(),
        icon: None,
    }
}

fn camp(id: &str, territory_id: &str) -> CampDef {
    CampDef {
        id: id.to_owned(),
        territory_id: territory_id.to_owned(),
    }
}

/// Gondor and Rohan (good) against Mordor (evil) on an eight-territory map.
/// Turn order is sorted faction ids: gondor, mordor, rohan.
pub fn definitions() -> Definitions {
    let mut defs = Definitions::default();

    for territory_def in [
        territory("minas_tirith", "city", 2, true, &["pelennor", "ithilien"]),
        territory("pelennor", "plains", 1, false, &["minas_tirith", "osgiliath", "edoras"]),
        territory("ithilien", "forest", 1, false, &["minas_tirith", "osgiliath"]),
        territory("osgiliath", "city", 2, true, &["pelennor", "ithilien", "morgul_vale"]),
        territory("morgul_vale", "plains", 1, false, &["osgiliath", "mordor"]),
        territory("mordor", "mountain", 2, true, &["morgul_vale", "barad_dur"]),
        territory("barad_dur", "city", 2, true, &["mordor"]),
        territory("edoras", "city", 2, true, &["pelennor"]),
    ] {
        defs.territories.insert(territory_def.id.clone(), territory_def);
    }

    for faction_def in [
        faction("gondor", "good", "minas_tirith"),
        faction("mordor", "evil", "mordor"),
        faction("rohan", "good", "edoras"),
    ] {
        defs.factions.insert(faction_def.id.clone(), faction_def);
    }

    for unit in [
        unit_def("gondor_infantry", "gondor", Archetype::Infantry, &[], 2, 3, 1, 1, 1),
        unit_def("gondor_knight", "gondor", Archetype::Cavalry, &[], 4, 3, 3, 1, 3),
        unit_def("mordor_orc", "mordor", Archetype::Infantry, &[], 2, 2, 1, 1, 1),
        unit_def("mordor_archer", "mordor", Archetype::Archer, &[], 1, 3, 1, 1, 2),
        unit_def("mordor_troll", "mordor", Archetype::Other, &[], 4, 3, 1, 3, 5),
        unit_def("rohan_rider", "rohan", Archetype::Cavalry, &[], 3, 2, 3, 1, 3),
    ] {
        defs.units.insert(unit.id.clone(), unit);
    }

    for camp_def in [
        camp("camp_minas_tirith", "minas_tirith"),
        camp("camp_osgiliath", "osgiliath"),
        camp("camp_mordor", "mordor"),
        camp("camp_edoras", "edoras"),
    ] {
        defs.camps.insert(camp_def.id.clone(), camp_def);
    }

    defs
}

pub fn starting_setup() -> StartingSetup {
    StartingSetup {
        territory_owners: BTreeMap::from([
            ("minas_tirith".to_owned(), "gondor".to_owned()),
            ("pelennor".to_owned(), "gondor".to_owned()),
            ("ithilien".to_owned(), "gondor".to_owned()),
            ("osgiliath".to_owned(), "gondor".to_owned()),
            ("morgul_vale".to_owned(), "mordor".to_owned()),
            ("mordor".to_owned(), "mordor".to_owned()),
            ("barad_dur".to_owned(), "mordor".to_owned()),
            ("edoras".to_owned(), "rohan".to_owned()),
        ]),
        starting_units: BTreeMap::from([
            (
                "minas_tirith".to_owned(),
                vec![UnitStack::new("gondor_infantry", 2)],
            ),
            (
                "mordor".to_owned(),
                vec![
                    UnitStack::new("mordor_orc", 2),
                    UnitStack::new("mordor_archer", 1),
                ],
            ),
            ("edoras".to_owned(), vec![UnitStack::new("rohan_rider", 1)]),
        ]),
    }
}

pub fn new_game() -> (Definitions, GameState) {
    let defs = definitions();
    let state = initialize_game_state(&defs, &starting_setup());
    (defs, state)
}

/// Creates a unit instance in a territory, returning its id.
pub fn add_unit(
    state: &mut GameState,
    territory_id: &str,
    faction_id: &str,
    unit_id: &str,
    defs: &Definitions,
) -> String {
    let unit_def = defs.unit(unit_id).expect("unit defined");
    let instance_id = state.generate_unit_instance_id(faction_id, unit_id);
    let unit = UnitInstance {
        instance_id: instance_id.clone(),
        unit_id: unit_id.to_owned(),
        remaining_movement: unit_def.movement,
        remaining_health: unit_def.health,
        base_movement: unit_def.movement,
        base_health: unit_def.health,
    };
    state
        .territory_mut(territory_id)
        .expect("territory exists")
        .units
        .push(unit);
    instance_id
}

pub fn apply(state: &GameState, action: Action, defs: &Definitions) -> GameState {
    let (next, _) = apply_action(state, &action, defs).expect("action applies");
    next
}

/// Ends phases until the current faction's turn is over (five `end_phase`
/// actions from the purchase phase).
pub fn skip_turn(state: GameState, faction: &str, defs: &Definitions) -> GameState {
    let mut current = state;
    for _ in 0..5 {
        current = apply(&current, Action::end_phase(faction), defs);
    }
    current
}
