//! Authoritative game state.
//!
//! [`GameState`] is the complete serializable snapshot of one game. The
//! reducer clones it, mutates the clone, and returns it; nothing else in the
//! workspace writes state. Its serde representation is the persisted record:
//! stable key order, legacy aliases accepted on read, and lenient defaults
//! so earlier saves keep loading.

mod de;
mod types;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::defs::{Definitions, ResourceMap};

pub use types::{
    ActiveCombat, CombatRoundRecord, PendingCamp, PendingMobilization, PendingMove, Phase,
    TerritoryState, UnitInstance, UnitStack, VictoryCriteria, unit_owner,
};

/// Complete game state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    #[serde(
        default = "de::default_turn_number",
        deserialize_with = "de::lenient_i64_or_one"
    )]
    pub turn_number: i64,
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub current_faction: String,
    #[serde(default, deserialize_with = "de::lenient_phase")]
    pub phase: Phase,
    #[serde(default, deserialize_with = "de::lenient_map")]
    pub territories: BTreeMap<String, TerritoryState>,
    /// faction -> resource -> amount.
    #[serde(default, deserialize_with = "de::lenient_faction_resources")]
    pub faction_resources: BTreeMap<String, ResourceMap>,
    /// Units purchased this turn, waiting for the mobilization phase.
    #[serde(default, deserialize_with = "de::lenient_map")]
    pub faction_purchased_units: BTreeMap<String, Vec<UnitStack>>,
    /// Per-faction counter backing unit instance id generation.
    #[serde(default, deserialize_with = "de::lenient_counters")]
    pub unit_id_counters: BTreeMap<String, i64>,
    #[serde(default, deserialize_with = "de::lenient_opt")]
    pub active_combat: Option<ActiveCombat>,
    /// Income computed at end of a faction's turn, collected at the start of
    /// their next one.
    #[serde(default, deserialize_with = "de::lenient_faction_resources")]
    pub faction_pending_income: BTreeMap<String, ResourceMap>,
    /// Territory captures queued during combat, applied when the combat
    /// phase ends (liberation is resolved there).
    #[serde(default, deserialize_with = "de::lenient_string_entries")]
    pub pending_captures: BTreeMap<String, String>,
    /// Camp ids still standing; camps die when their territory changes owner.
    #[serde(default, deserialize_with = "de::lenient_string_list")]
    pub camps_standing: Vec<String>,
    /// Territories usable for mobilization this turn. Snapshotted at turn
    /// start; never modified mid-turn.
    #[serde(
        default,
        alias = "mobilization_strongholds",
        deserialize_with = "de::lenient_string_list"
    )]
    pub mobilization_camps: Vec<String>,
    #[serde(default, deserialize_with = "de::lenient_vec")]
    pub pending_moves: Vec<PendingMove>,
    #[serde(default, deserialize_with = "de::lenient_vec")]
    pub pending_mobilizations: Vec<PendingMobilization>,
    /// Winning alliance, or `None` while the game is ongoing.
    #[serde(default, deserialize_with = "de::lenient_opt_string")]
    pub winner: Option<String>,
    /// Opaque map asset name handed through to clients.
    #[serde(default, deserialize_with = "de::lenient_opt_string")]
    pub map_asset: Option<String>,
    #[serde(default, alias = "victory_strongholds")]
    pub victory_criteria: VictoryCriteria,
    /// Camp purchase cost in power; 0 means camps are not purchasable.
    #[serde(default, deserialize_with = "de::lenient_i64")]
    pub camp_cost: i64,
    /// Owned territories snapshotted when each faction's turn starts; the
    /// camp placement option pool.
    #[serde(default, deserialize_with = "de::lenient_territory_lists")]
    pub faction_territories_at_turn_start: BTreeMap<String, Vec<String>>,
    /// Camps purchased this turn, awaiting placement.
    #[serde(default, deserialize_with = "de::lenient_vec")]
    pub pending_camps: Vec<PendingCamp>,
    /// Purchased camps that were placed: camp id -> territory id.
    #[serde(default, deserialize_with = "de::lenient_string_entries")]
    pub dynamic_camps: BTreeMap<String, String>,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            turn_number: 1,
            current_faction: String::new(),
            phase: Phase::Purchase,
            territories: BTreeMap::new(),
            faction_resources: BTreeMap::new(),
            faction_purchased_units: BTreeMap::new(),
            unit_id_counters: BTreeMap::new(),
            active_combat: None,
            faction_pending_income: BTreeMap::new(),
            pending_captures: BTreeMap::new(),
            camps_standing: Vec::new(),
            mobilization_camps: Vec::new(),
            pending_moves: Vec::new(),
            pending_mobilizations: Vec::new(),
            winner: None,
            map_asset: None,
            victory_criteria: VictoryCriteria::default(),
            camp_cost: 0,
            faction_territories_at_turn_start: BTreeMap::new(),
            pending_camps: Vec::new(),
            dynamic_camps: BTreeMap::new(),
        }
    }
}

impl GameState {
    /// Generates a unique instance id of the form
    /// `<faction>_<unit_type>_<zero-padded counter>`.
    pub fn generate_unit_instance_id(&mut self, faction_id: &str, unit_id: &str) -> String {
        let counter = self.unit_id_counters.entry(faction_id.to_owned()).or_insert(0);
        *counter += 1;
        format!("{faction_id}_{unit_id}_{counter:03}")
    }

    pub fn territory(&self, id: &str) -> Option<&TerritoryState> {
        self.territories.get(id)
    }

    pub fn territory_mut(&mut self, id: &str) -> Option<&mut TerritoryState> {
        self.territories.get_mut(id)
    }

    pub fn resources(&self, faction_id: &str) -> ResourceMap {
        self.faction_resources
            .get(faction_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn resources_mut(&mut self, faction_id: &str) -> &mut ResourceMap {
        self.faction_resources
            .entry(faction_id.to_owned())
            .or_default()
    }

    pub fn resource_amount(&self, faction_id: &str, resource: &str) -> i64 {
        self.faction_resources
            .get(faction_id)
            .and_then(|r| r.get(resource))
            .copied()
            .unwrap_or(0)
    }

    pub fn purchase_pool(&self, faction_id: &str) -> &[UnitStack] {
        self.faction_purchased_units
            .get(faction_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn purchase_pool_mut(&mut self, faction_id: &str) -> &mut Vec<UnitStack> {
        self.faction_purchased_units
            .entry(faction_id.to_owned())
            .or_default()
    }

    /// Whether the faction still owns its capital. Losing the capital stops
    /// purchases, mobilization, and income.
    pub fn owns_capital(&self, faction_id: &str, defs: &Definitions) -> bool {
        let Some(faction) = defs.faction(faction_id) else {
            return false;
        };
        self.territories
            .get(&faction.capital)
            .is_some_and(|t| t.owner.as_deref() == Some(faction_id))
    }

    /// Whether the territory holds a camp that is still standing, either a
    /// definition camp or a purchased (dynamic) one.
    pub fn territory_has_standing_camp(&self, territory_id: &str, defs: &Definitions) -> bool {
        self.camps_standing.iter().any(|camp_id| {
            if self.dynamic_camps.get(camp_id).map(String::as_str) == Some(territory_id) {
                return true;
            }
            defs.camps
                .get(camp_id)
                .is_some_and(|camp| camp.territory_id == territory_id)
        })
    }

    /// Total units this faction may materialize this turn: summed power
    /// production over the turn's mobilization camps.
    pub fn mobilization_capacity(&self, defs: &Definitions) -> i64 {
        self.mobilization_camps
            .iter()
            .filter_map(|tid| defs.territory(tid))
            .map(|t| t.power_production())
            .sum()
    }

    /// Locates a unit by instance id across all territories.
    pub fn find_unit(&self, instance_id: &str) -> Option<(&UnitInstance, &str)> {
        for (territory_id, territory) in &self.territories {
            if let Some(unit) = territory.unit(instance_id) {
                return Some((unit, territory_id.as_str()));
            }
        }
        None
    }

    /// The self-describing persisted record (§ serialization contract).
    pub fn to_record(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("game state serializes to JSON")
    }

    pub fn from_record(record: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(record)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("game state serializes to JSON")
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Deterministic SHA-256 commitment to the whole state. Two states are
    /// identical iff their digests match, which replay tests rely on.
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        let bytes = bincode::serialize(self).expect("game state serializes with bincode");
        hasher.update(&bytes);
        hasher.finalize().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> GameState {
        let mut state = GameState::default();
        state.current_faction = "gondor".to_owned();
        state.territories.insert(
            "minas_tirith".to_owned(),
            TerritoryState {
                owner: Some("gondor".to_owned()),
                original_owner: Some("gondor".to_owned()),
                units: Vec::new(),
            },
        );
        state
            .resources_mut("gondor")
            .insert("power".to_owned(), 10);
        state
    }

    #[test]
    fn instance_ids_are_zero_padded_and_monotonic() {
        let mut state = GameState::default();
        assert_eq!(
            state.generate_unit_instance_id("gondor", "gondor_infantry"),
            "gondor_gondor_infantry_001"
        );
        assert_eq!(
            state.generate_unit_instance_id("gondor", "gondor_infantry"),
            "gondor_gondor_infantry_002"
        );
        assert_eq!(
            state.generate_unit_instance_id("mordor", "mordor_orc"),
            "mordor_mordor_orc_001"
        );
    }

    #[test]
    fn record_round_trips_equal_state() {
        let mut state = sample_state();
        state.pending_moves.push(PendingMove {
            from_territory: "minas_tirith".to_owned(),
            to_territory: "ithilien".to_owned(),
            unit_instance_ids: vec!["gondor_gondor_infantry_001".to_owned()],
            phase: Phase::CombatMove,
            charge_through: Vec::new(),
        });
        let record = state.to_record();
        let reloaded = GameState::from_record(record).unwrap();
        assert_eq!(state, reloaded);
        assert_eq!(state.digest(), reloaded.digest());
    }

    #[test]
    fn empty_record_loads_with_defaults() {
        let state = GameState::from_record(serde_json::json!({})).unwrap();
        assert_eq!(state.turn_number, 1);
        assert_eq!(state.phase, Phase::Purchase);
        assert!(state.territories.is_empty());
        assert_eq!(state.victory_criteria.required_for("good"), 4);
    }

    #[test]
    fn legacy_keys_are_read_but_never_written() {
        let state = GameState::from_record(serde_json::json!({
            "mobilization_strongholds": ["minas_tirith"],
            "victory_strongholds": {"good": 2, "evil": 2},
        }))
        .unwrap();
        assert_eq!(state.mobilization_camps, vec!["minas_tirith".to_owned()]);
        assert_eq!(state.victory_criteria.required_for("evil"), 2);

        let record = state.to_record();
        assert!(record.get("mobilization_strongholds").is_none());
        assert!(record.get("victory_strongholds").is_none());
        assert!(record.get("mobilization_camps").is_some());
        assert_eq!(record["victory_criteria"]["strongholds"]["good"], 2);
    }

    #[test]
    fn ill_typed_aggregates_collapse_to_empty() {
        let state = GameState::from_record(serde_json::json!({
            "turn_number": "7",
            "territories": "not-a-map",
            "faction_resources": {"gondor": 12, "mordor": {"power": "3"}},
            "pending_moves": {"nope": true},
            "camps_standing": 4,
        }))
        .unwrap();
        assert_eq!(state.turn_number, 7);
        assert!(state.territories.is_empty());
        assert!(state.faction_resources["gondor"].is_empty());
        assert_eq!(state.faction_resources["mordor"]["power"], 3);
        assert!(state.pending_moves.is_empty());
        assert!(state.camps_standing.is_empty());
    }

    #[test]
    fn standing_camp_covers_definition_and_dynamic_camps() {
        let mut defs = Definitions::default();
        defs.camps.insert(
            "osgiliath_camp".to_owned(),
            crate::defs::CampDef {
                id: "osgiliath_camp".to_owned(),
                territory_id: "osgiliath".to_owned(),
            },
        );

        let mut state = GameState::default();
        state.camps_standing.push("osgiliath_camp".to_owned());
        state.camps_standing.push("purchased_camp_pelennor".to_owned());
        state
            .dynamic_camps
            .insert("purchased_camp_pelennor".to_owned(), "pelennor".to_owned());

        assert!(state.territory_has_standing_camp("osgiliath", &defs));
        assert!(state.territory_has_standing_camp("pelennor", &defs));
        assert!(!state.territory_has_standing_camp("mordor", &defs));

        state.camps_standing.retain(|c| c != "osgiliath_camp");
        assert!(!state.territory_has_standing_camp("osgiliath", &defs));
    }
}
