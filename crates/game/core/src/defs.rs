//! Immutable rule definitions.
//!
//! A game stores a deep snapshot of the definition bundle it was created
//! with, so later rule edits never change an in-flight game. The reducer
//! only ever consults the [`Definitions`] passed to it; nothing here is
//! mutated after load.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Resource id -> amount (costs, production, holdings).
pub type ResourceMap = BTreeMap<String, i64>;

/// The resource that pays for camps and bounds mobilization.
pub const RESOURCE_POWER: &str = "power";

/// Broad unit category driving movement and combat special cases.
///
/// Unknown archetypes in a bundle deserialize as [`Archetype::Other`] so
/// newer content keeps loading on older code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Archetype {
    Infantry,
    Cavalry,
    Aerial,
    Archer,
    #[default]
    Other,
}

impl Serialize for Archetype {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Archetype {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(raw.parse().unwrap_or(Archetype::Other))
    }
}

fn default_true() -> bool {
    true
}

fn default_dice() -> u32 {
    1
}

/// Immutable properties of a unit type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnitDef {
    pub id: String,
    pub display_name: String,
    pub faction: String,
    pub archetype: Archetype,
    #[serde(default)]
    pub tags: Vec<String>,
    pub attack: i64,
    pub defense: i64,
    pub movement: i64,
    pub health: i64,
    pub cost: ResourceMap,
    /// Dice rolled per combat round (most units roll 1).
    #[serde(default = "default_dice")]
    pub dice: u32,
    #[serde(default = "default_true")]
    pub purchasable: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    // Parsed for forward compatibility with richer bundles; unused by rules.
    #[serde(default, skip_serializing_if = "crate::defs::is_zero")]
    pub transport_capacity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downgrade_to: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub specials: Vec<String>,
}

pub(crate) fn is_zero(value: &i64) -> bool {
    *value == 0
}

impl UnitDef {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Summed cost across all resources. Casualty-assignment tiebreaker.
    pub fn total_cost(&self) -> i64 {
        self.cost.values().sum()
    }

    /// Aerial by archetype or tag: passes over anything while moving.
    pub fn is_aerial(&self) -> bool {
        self.archetype == Archetype::Aerial || self.has_tag("aerial")
    }

    /// Cavalry by archetype or tag: may charge through empty enemy land.
    pub fn is_cavalry(&self) -> bool {
        self.archetype == Archetype::Cavalry || self.has_tag("cavalry")
    }
}

/// Immutable properties of a territory.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TerritoryDef {
    pub id: String,
    pub display_name: String,
    pub terrain_type: String,
    /// Ids of adjacent territories, in bundle order.
    pub adjacent: Vec<String>,
    /// Production per turn, e.g. `{"power": 3}`.
    pub produces: ResourceMap,
    #[serde(default)]
    pub is_stronghold: bool,
    /// False for wastelands: no ownership change, no camp placement.
    #[serde(default = "default_true")]
    pub ownable: bool,
}

impl TerritoryDef {
    pub fn power_production(&self) -> i64 {
        self.produces.get(RESOURCE_POWER).copied().unwrap_or(0)
    }
}

/// Immutable properties of a faction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FactionDef {
    pub id: String,
    pub display_name: String,
    /// Alliance id, e.g. `"good"` or `"evil"`.
    pub alliance: String,
    /// Capital territory id. Losing it stops purchases, mobilization, income.
    pub capital: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// A mobilization point attached to a territory. Destroyed when the
/// territory changes owner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CampDef {
    pub id: String,
    pub territory_id: String,
}

/// Snapshot of all rule data consulted by the reducer and queries.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Definitions {
    #[serde(default)]
    pub units: BTreeMap<String, UnitDef>,
    #[serde(default)]
    pub territories: BTreeMap<String, TerritoryDef>,
    #[serde(default)]
    pub factions: BTreeMap<String, FactionDef>,
    #[serde(default)]
    pub camps: BTreeMap<String, CampDef>,
}

impl Definitions {
    pub fn unit(&self, id: &str) -> Option<&UnitDef> {
        self.units.get(id)
    }

    pub fn territory(&self, id: &str) -> Option<&TerritoryDef> {
        self.territories.get(id)
    }

    pub fn faction(&self, id: &str) -> Option<&FactionDef> {
        self.factions.get(id)
    }

    pub fn alliance_of(&self, faction_id: &str) -> Option<&str> {
        self.factions.get(faction_id).map(|f| f.alliance.as_str())
    }

    /// True only when both factions are known and share an alliance.
    /// Unknown factions are allied with nobody.
    pub fn same_alliance(&self, a: &str, b: &str) -> bool {
        match (self.alliance_of(a), self.alliance_of(b)) {
            (Some(left), Some(right)) => left == right,
            _ => false,
        }
    }

    /// Turn order: faction ids in sorted order.
    pub fn faction_ids(&self) -> impl Iterator<Item = &str> {
        self.factions.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archetype_round_trips_and_tolerates_unknown() {
        let known: Archetype = serde_json::from_str("\"cavalry\"").unwrap();
        assert_eq!(known, Archetype::Cavalry);
        assert_eq!(serde_json::to_string(&known).unwrap(), "\"cavalry\"");

        let unknown: Archetype = serde_json::from_str("\"siege_tower\"").unwrap();
        assert_eq!(unknown, Archetype::Other);
    }

    #[test]
    fn unit_def_fills_documented_defaults() {
        let unit: UnitDef = serde_json::from_str(
            r#"{
                "id": "gondor_infantry",
                "display_name": "Gondor Infantry",
                "faction": "gondor",
                "archetype": "infantry",
                "attack": 2,
                "defense": 3,
                "movement": 1,
                "health": 1,
                "cost": {"power": 2}
            }"#,
        )
        .unwrap();
        assert_eq!(unit.dice, 1);
        assert!(unit.tags.is_empty());
        assert!(unit.purchasable);
        assert!(!unit.unique);
    }

    #[test]
    fn territory_def_defaults_to_ownable_non_stronghold() {
        let territory: TerritoryDef = serde_json::from_str(
            r#"{
                "id": "ithilien",
                "display_name": "Ithilien",
                "terrain_type": "forest",
                "adjacent": ["minas_tirith"],
                "produces": {"power": 1}
            }"#,
        )
        .unwrap();
        assert!(territory.ownable);
        assert!(!territory.is_stronghold);
        assert_eq!(territory.power_production(), 1);
    }

    #[test]
    fn unknown_factions_are_allied_with_nobody() {
        let mut defs = Definitions::default();
        defs.factions.insert(
            "gondor".into(),
            FactionDef {
                id: "gondor".into(),
                display_name: "Gondor".into(),
                alliance: "good".into(),
                capital: "minas_tirith".into(),
                color: "#ffffff".into(),
                icon: None,
            },
        );
        assert!(!defs.same_alliance("gondor", "rhun"));
        assert!(!defs.same_alliance("rhun", "rhun"));
    }
}
