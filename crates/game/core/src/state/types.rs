//! Aggregate types carried inside [`super::GameState`].

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::de;

/// Turn phases, in play order.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    #[default]
    Purchase,
    CombatMove,
    Combat,
    NonCombatMove,
    Mobilization,
}

impl Phase {
    /// Next phase in the fixed order; `None` after mobilization (end of turn).
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Purchase => Some(Phase::CombatMove),
            Phase::CombatMove => Some(Phase::Combat),
            Phase::Combat => Some(Phase::NonCombatMove),
            Phase::NonCombatMove => Some(Phase::Mobilization),
            Phase::Mobilization => None,
        }
    }
}

impl Serialize for Phase {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Phase {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse()
            .map_err(|_| D::Error::custom(format!("unknown phase '{raw}'")))
    }
}

/// The owning faction encoded in a unit instance id.
///
/// Instance ids have the form `<faction>_<unit_type>_<counter>`; the prefix
/// is the authoritative ownership marker throughout the reducer.
pub fn unit_owner(instance_id: &str) -> &str {
    instance_id.split('_').next().unwrap_or("")
}

/// Individual unit instance with movement and health tracking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitInstance {
    /// Unique within a state, e.g. `"gondor_infantry_001"`.
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub instance_id: String,
    /// Unit type id, e.g. `"gondor_infantry"`.
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub unit_id: String,
    #[serde(default, deserialize_with = "de::lenient_i64")]
    pub remaining_movement: i64,
    #[serde(
        default = "de::default_one",
        deserialize_with = "de::lenient_i64_or_one"
    )]
    pub remaining_health: i64,
    /// Restored at the owner's turn boundary.
    #[serde(default, deserialize_with = "de::lenient_i64")]
    pub base_movement: i64,
    #[serde(
        default = "de::default_one",
        deserialize_with = "de::lenient_i64_or_one"
    )]
    pub base_health: i64,
}

impl UnitInstance {
    pub fn owner(&self) -> &str {
        unit_owner(&self.instance_id)
    }
}

/// A stack of identical units, used for the purchase pool and mobilization
/// requests (purchased units have no instance ids yet).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitStack {
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub unit_id: String,
    #[serde(default, deserialize_with = "de::lenient_count")]
    pub count: i64,
}

impl UnitStack {
    pub fn new(unit_id: impl Into<String>, count: i64) -> Self {
        Self {
            unit_id: unit_id.into(),
            count,
        }
    }
}

/// A declared move, held until its phase ends and then applied.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMove {
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub from_territory: String,
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub to_territory: String,
    #[serde(default, deserialize_with = "de::lenient_string_list")]
    pub unit_instance_ids: Vec<String>,
    /// Phase the move was declared in; applied when that phase ends.
    #[serde(
        default = "de::default_move_phase",
        deserialize_with = "de::lenient_move_phase"
    )]
    pub phase: Phase,
    /// Cavalry charge: empty enemy territories passed through, in order.
    /// Each is conquered when the move is applied.
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "de::lenient_string_list"
    )]
    pub charge_through: Vec<String>,
}

/// A queued deployment to a camp, applied at end of mobilization phase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMobilization {
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub destination: String,
    #[serde(default, deserialize_with = "de::lenient_vec")]
    pub units: Vec<UnitStack>,
}

/// A purchased camp awaiting placement during the mobilization phase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCamp {
    /// Snapshot of eligible territories taken at purchase time.
    #[serde(default, deserialize_with = "de::lenient_string_list")]
    pub territory_options: Vec<String>,
    /// Set by `place_camp`; `None` until placed.
    #[serde(default, deserialize_with = "de::lenient_opt_string")]
    pub placed_territory_id: Option<String>,
}

/// State of a single territory.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerritoryState {
    #[serde(default, deserialize_with = "de::lenient_opt_string")]
    pub owner: Option<String>,
    /// Owner at game start; never changed. Drives the liberation rule.
    #[serde(default, deserialize_with = "de::lenient_opt_string")]
    pub original_owner: Option<String>,
    /// Order is insignificant but preserved for deterministic iteration.
    #[serde(default, deserialize_with = "de::lenient_vec")]
    pub units: Vec<UnitInstance>,
}

impl TerritoryState {
    pub fn unit(&self, instance_id: &str) -> Option<&UnitInstance> {
        self.units.iter().find(|u| u.instance_id == instance_id)
    }

    pub fn remove_units(&mut self, instance_ids: &[String]) {
        self.units
            .retain(|u| !instance_ids.contains(&u.instance_id));
    }
}

/// Log record for one resolved combat round.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatRoundRecord {
    #[serde(default, deserialize_with = "de::lenient_u32")]
    pub round_number: u32,
    #[serde(default, deserialize_with = "de::lenient_i64_list")]
    pub attacker_rolls: Vec<i64>,
    #[serde(default, deserialize_with = "de::lenient_i64_list")]
    pub defender_rolls: Vec<i64>,
    #[serde(default, deserialize_with = "de::lenient_i64")]
    pub attacker_hits: i64,
    #[serde(default, deserialize_with = "de::lenient_i64")]
    pub defender_hits: i64,
    #[serde(default, deserialize_with = "de::lenient_string_list")]
    pub attacker_casualties: Vec<String>,
    #[serde(default, deserialize_with = "de::lenient_string_list")]
    pub defender_casualties: Vec<String>,
    #[serde(default, deserialize_with = "de::lenient_i64")]
    pub attackers_remaining: i64,
    #[serde(default, deserialize_with = "de::lenient_i64")]
    pub defenders_remaining: i64,
    /// True for the defender-archer prefire entry before round 1.
    #[serde(
        default,
        skip_serializing_if = "de::is_false",
        deserialize_with = "de::lenient_bool_false"
    )]
    pub is_archer_prefire: bool,
}

/// An ongoing multi-round combat. Attackers and defenders co-occupy the
/// contested territory; attackers moved in during combat_move.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveCombat {
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub attacker_faction: String,
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub territory_id: String,
    /// Attacking units still alive (who may retreat).
    #[serde(default, deserialize_with = "de::lenient_string_list")]
    pub attacker_instance_ids: Vec<String>,
    #[serde(default, deserialize_with = "de::lenient_u32")]
    pub round_number: u32,
    #[serde(default, deserialize_with = "de::lenient_vec")]
    pub combat_log: Vec<CombatRoundRecord>,
    /// False only between archer prefire and round 1; blocks retreat.
    #[serde(
        default = "de::default_true",
        skip_serializing_if = "de::is_true",
        deserialize_with = "de::lenient_bool_true"
    )]
    pub attackers_have_rolled: bool,
}

/// Victory thresholds: `{"strongholds": {alliance: count}}`.
///
/// Legacy flat maps (`{"good": 2, "evil": 2}`) are promoted on load; the
/// nested shape is the only one ever written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VictoryCriteria {
    pub strongholds: BTreeMap<String, i64>,
}

impl VictoryCriteria {
    pub fn required_for(&self, alliance: &str) -> i64 {
        self.strongholds.get(alliance).copied().unwrap_or(0)
    }
}

impl Default for VictoryCriteria {
    fn default() -> Self {
        let mut strongholds = BTreeMap::new();
        strongholds.insert("good".to_owned(), 4);
        strongholds.insert("evil".to_owned(), 4);
        Self { strongholds }
    }
}

impl<'de> Deserialize<'de> for VictoryCriteria {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        fn coerce_thresholds(entries: &serde_json::Map<String, Value>) -> BTreeMap<String, i64> {
            entries
                .iter()
                .filter_map(|(alliance, raw)| {
                    let count = match raw {
                        Value::Number(n) => n.as_i64(),
                        Value::String(s) => s.trim().parse().ok(),
                        _ => None,
                    };
                    count.map(|c| (alliance.clone(), c))
                })
                .collect()
        }

        let value = Value::deserialize(deserializer)?;
        let Value::Object(entries) = value else {
            return Ok(Self::default());
        };

        // Legacy flat shape: alliance thresholds at top level.
        if !entries.contains_key("strongholds")
            && entries.keys().any(|k| k == "good" || k == "evil")
        {
            let strongholds = coerce_thresholds(&entries);
            if !strongholds.is_empty() {
                return Ok(Self { strongholds });
            }
            return Ok(Self::default());
        }

        if let Some(Value::Object(nested)) = entries.get("strongholds") {
            let strongholds = coerce_thresholds(nested);
            if !strongholds.is_empty() {
                return Ok(Self { strongholds });
            }
        }
        Ok(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_owner_is_the_instance_id_prefix() {
        assert_eq!(unit_owner("gondor_infantry_001"), "gondor");
        assert_eq!(unit_owner(""), "");
    }

    #[test]
    fn phase_strings_round_trip() {
        for (phase, text) in [
            (Phase::Purchase, "\"purchase\""),
            (Phase::CombatMove, "\"combat_move\""),
            (Phase::NonCombatMove, "\"non_combat_move\""),
        ] {
            assert_eq!(serde_json::to_string(&phase).unwrap(), text);
            assert_eq!(serde_json::from_str::<Phase>(text).unwrap(), phase);
        }
    }

    #[test]
    fn unit_instance_tolerates_missing_and_stringly_fields() {
        let unit: UnitInstance = serde_json::from_str(
            r#"{"instance_id": "mordor_orc_001", "unit_id": "mordor_orc", "remaining_movement": "2"}"#,
        )
        .unwrap();
        assert_eq!(unit.remaining_movement, 2);
        assert_eq!(unit.remaining_health, 1);
        assert_eq!(unit.base_health, 1);
    }

    #[test]
    fn victory_criteria_promotes_legacy_flat_shape() {
        let promoted: VictoryCriteria =
            serde_json::from_str(r#"{"good": 2, "evil": 3}"#).unwrap();
        assert_eq!(promoted.required_for("good"), 2);
        assert_eq!(promoted.required_for("evil"), 3);

        let nested: VictoryCriteria =
            serde_json::from_str(r#"{"strongholds": {"good": 5}}"#).unwrap();
        assert_eq!(nested.required_for("good"), 5);
        assert_eq!(nested.required_for("evil"), 0);

        let garbage: VictoryCriteria = serde_json::from_str("17").unwrap();
        assert_eq!(garbage.required_for("good"), 4);
    }

    #[test]
    fn active_combat_defaults_attackers_have_rolled() {
        let combat: ActiveCombat = serde_json::from_str(
            r#"{"attacker_faction": "gondor", "territory_id": "mordor",
                "attacker_instance_ids": [], "round_number": 1, "combat_log": []}"#,
        )
        .unwrap();
        assert!(combat.attackers_have_rolled);

        let serialized = serde_json::to_value(&combat).unwrap();
        assert!(serialized.get("attackers_have_rolled").is_none());
    }

    #[test]
    fn pending_move_defaults_to_combat_move_phase() {
        let pending: PendingMove = serde_json::from_str(
            r#"{"from_territory": "a", "to_territory": "b", "unit_instance_ids": ["x_y_001"]}"#,
        )
        .unwrap();
        assert_eq!(pending.phase, Phase::CombatMove);
        assert!(pending.charge_through.is_empty());
    }
}
