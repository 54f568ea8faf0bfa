//! A loaded setup, ready to start games from.

use warmarch_core::{Definitions, GameState, StartingSetup, VictoryCriteria, initialize_game_state};

/// Everything a game needs at creation time. The definitions inside are the
/// game's snapshot; the reducer never reads the setup files again.
#[derive(Clone, Debug, PartialEq)]
pub struct SetupBundle {
    pub id: String,
    pub display_name: String,
    pub map_asset: String,
    /// Manifest override; `None` keeps the engine default.
    pub victory_criteria: Option<VictoryCriteria>,
    /// Manifest override; `None` leaves camps unpurchasable.
    pub camp_cost: Option<i64>,
    pub definitions: Definitions,
    pub starting_setup: StartingSetup,
}

impl SetupBundle {
    /// Builds the initial state for a new game on this setup.
    pub fn new_game(&self) -> GameState {
        let mut state = initialize_game_state(&self.definitions, &self.starting_setup);
        state.map_asset = Some(self.map_asset.clone());
        if let Some(criteria) = &self.victory_criteria {
            state.victory_criteria = criteria.clone();
        }
        if let Some(cost) = self.camp_cost {
            state.camp_cost = cost;
        }
        state
    }
}
