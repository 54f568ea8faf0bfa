//! Service-level flows: create, submit, commit-or-discard, persistence.

use std::collections::BTreeMap;

use warmarch_content::SetupBundle;
use warmarch_core::{
    Action, Archetype, Definitions, FactionDef, Phase, StartingSetup, TerritoryDef, UnitDef,
    UnitStack,
};
use warmarch_runtime::{FileStore, GameService, GameStore, MemoryStore, RuntimeError};

fn bundle() -> SetupBundle {
    let mut defs = Definitions::default();
    for (id, capital_of, adjacent) in [
        ("minas_tirith", Some("gondor"), vec!["mordor"]),
        ("mordor", Some("mordor"), vec!["minas_tirith"]),
    ] {
        defs.territories.insert(
            id.to_owned(),
            TerritoryDef {
                id: id.to_owned(),
                display_name: id.to_owned(),
                terrain_type: "plains".to_owned(),
                adjacent: adjacent.into_iter().map(str::to_owned).collect(),
                produces: BTreeMap::from([("power".to_owned(), 2)]),
                is_stronghold: true,
                ownable: true,
            },
        );
        let faction = capital_of.unwrap();
        defs.factions.entry(faction.to_owned()).or_insert(FactionDef {
            id: faction.to_owned(),
            display_name: faction.to_owned(),
            alliance: if faction == "gondor" { "good" } else { "evil" }.to_owned(),
            capital: id.to_owned(),
            color: "#444444".to_owned(),
            icon: None,
        });
    }
    defs.units.insert(
        "gondor_infantry".to_owned(),
        UnitDef {
            id: "gondor_infantry".to_owned(),
            display_name: "Gondor Infantry".to_owned(),
            faction: "gondor".to_owned(),
            archetype: Archetype::Infantry,
            tags: Vec::new(),
            attack: 2,
            defense: 3,
            movement: 1,
            health: 1,
            cost: BTreeMap::from([("power".to_owned(), 1)]),
            dice: 1,
            purchasable: true,
            unique: false,
            icon: None,
            transport_capacity: 0,
            downgrade_to: None,
            specials: Vec::new(),
        },
    );

    SetupBundle {
        id: "skirmish".to_owned(),
        display_name: "Skirmish".to_owned(),
        map_asset: "skirmish".to_owned(),
        victory_criteria: None,
        camp_cost: None,
        definitions: defs,
        starting_setup: StartingSetup {
            territory_owners: BTreeMap::from([
                ("minas_tirith".to_owned(), "gondor".to_owned()),
                ("mordor".to_owned(), "mordor".to_owned()),
            ]),
            starting_units: BTreeMap::from([(
                "minas_tirith".to_owned(),
                vec![UnitStack::new("gondor_infantry", 1)],
            )]),
        },
    }
}

#[tokio::test]
async fn create_submit_and_reload_a_game() {
    let service = GameService::new(MemoryStore::new());
    let state = service.create_game("g1", &bundle()).await.unwrap();
    assert_eq!(state.current_faction, "gondor");
    assert_eq!(state.phase, Phase::Purchase);

    let err = service.create_game("g1", &bundle()).await.unwrap_err();
    assert!(matches!(err, RuntimeError::GameAlreadyExists(_)));

    let (state, events) = service
        .submit("g1", &Action::end_phase("gondor"))
        .await
        .unwrap();
    assert_eq!(state.phase, Phase::CombatMove);
    assert!(!events.is_empty());

    // The snapshot advanced with the action.
    let record = service.game("g1").await.unwrap();
    assert_eq!(record.state.phase, Phase::CombatMove);
    assert_eq!(record.definitions, bundle().definitions);
}

#[tokio::test]
async fn rejected_actions_leave_the_snapshot_untouched() {
    let service = GameService::new(MemoryStore::new());
    service.create_game("g1", &bundle()).await.unwrap();

    let before = service.game("g1").await.unwrap();
    let err = service
        .submit("g1", &Action::end_phase("mordor"))
        .await
        .unwrap_err();
    assert!(matches!(err, RuntimeError::Action(_)));

    let after = service.game("g1").await.unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn unknown_games_are_reported_as_missing() {
    let service = GameService::new(MemoryStore::new());
    let err = service
        .submit("nope", &Action::end_phase("gondor"))
        .await
        .unwrap_err();
    assert!(matches!(err, RuntimeError::GameNotFound(_)));
}

#[tokio::test]
async fn corrupt_snapshots_surface_as_not_loadable() {
    let store = MemoryStore::new();
    store.save("broken", "{not json").await.unwrap();
    let service = GameService::new(store);

    let err = service.game("broken").await.unwrap_err();
    assert!(matches!(err, RuntimeError::CorruptSnapshot { .. }));
}

#[tokio::test]
async fn validate_mirrors_the_reducer_without_mutation() {
    let service = GameService::new(MemoryStore::new());
    service.create_game("g1", &bundle()).await.unwrap();

    let ok = service
        .validate("g1", &Action::end_phase("gondor"))
        .await
        .unwrap();
    assert!(ok.valid);

    let bad = service
        .validate("g1", &Action::end_turn("gondor"))
        .await
        .unwrap();
    assert!(!bad.valid);
    assert!(bad.error.is_some());

    // Validation never advanced the game.
    let record = service.game("g1").await.unwrap();
    assert_eq!(record.state.phase, Phase::Purchase);
}

#[tokio::test]
async fn file_store_round_trips_snapshots() {
    let dir = tempfile::tempdir().unwrap();
    let service = GameService::new(FileStore::new(dir.path()));

    service.create_game("g1", &bundle()).await.unwrap();
    service
        .submit("g1", &Action::end_phase("gondor"))
        .await
        .unwrap();

    // A fresh service over the same directory sees the advanced state.
    let reopened = GameService::new(FileStore::new(dir.path()));
    let record = reopened.game("g1").await.unwrap();
    assert_eq!(record.state.phase, Phase::CombatMove);
    assert_eq!(reopened.list_games().await.unwrap(), vec!["g1".to_owned()]);

    reopened.delete_game("g1").await.unwrap();
    assert!(reopened.list_games().await.unwrap().is_empty());
}
