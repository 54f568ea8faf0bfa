//! Reads setup directories into [`SetupBundle`]s.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use warmarch_core::{CampDef, Definitions, FactionDef, StartingSetup, TerritoryDef, UnitDef, VictoryCriteria};

use crate::bundle::SetupBundle;

#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("setup not found: {0}")]
    NotFound(String),

    #[error("setup '{setup_id}' is malformed: {path}: {reason}")]
    Malformed {
        setup_id: String,
        path: String,
        reason: String,
    },
}

/// One row of the setup listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetupSummary {
    pub id: String,
    pub display_name: String,
    pub map_asset: String,
}

/// Optional per-setup metadata. Every field falls back to the directory
/// name (or an engine default), and a malformed manifest degrades to the
/// fallbacks rather than failing the setup.
#[derive(Debug, Default, Deserialize)]
struct Manifest {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    map_asset: Option<String>,
    #[serde(default)]
    victory_criteria: Option<VictoryCriteria>,
    #[serde(default)]
    camp_cost: Option<i64>,
}

fn read_manifest(dir: &Path) -> Manifest {
    let path = dir.join("manifest.json");
    fs::read_to_string(&path)
        .ok()
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_default()
}

/// Lists every setup under `root`: subdirectories containing a
/// `starting_setup.json`, in sorted order. Missing roots and unreadable
/// manifests degrade to empty/fallback rather than failing the listing.
pub fn list_setups(root: &Path) -> Vec<SetupSummary> {
    let Ok(entries) = fs::read_dir(root) else {
        return Vec::new();
    };

    let mut dirs: Vec<_> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir() && path.join("starting_setup.json").exists())
        .collect();
    dirs.sort();

    dirs.into_iter()
        .filter_map(|dir| {
            let dir_name = dir.file_name()?.to_str()?.to_owned();
            let manifest = read_manifest(&dir);
            Some(SetupSummary {
                id: manifest.id.unwrap_or_else(|| dir_name.clone()),
                display_name: manifest.display_name.unwrap_or_else(|| dir_name.clone()),
                map_asset: manifest.map_asset.unwrap_or(dir_name),
            })
        })
        .collect()
}

fn read_json<T: DeserializeOwned>(setup_id: &str, path: &Path) -> Result<T, SetupError> {
    let raw = fs::read_to_string(path).map_err(|err| SetupError::Malformed {
        setup_id: setup_id.to_owned(),
        path: path.display().to_string(),
        reason: err.to_string(),
    })?;
    serde_json::from_str(&raw).map_err(|err| SetupError::Malformed {
        setup_id: setup_id.to_owned(),
        path: path.display().to_string(),
        reason: err.to_string(),
    })
}

/// Loads one setup directory into a bundle.
///
/// A missing directory or missing `starting_setup.json` is `NotFound`;
/// anything unreadable or unparsable in the required files is `Malformed`.
pub fn load_setup(root: &Path, setup_id: &str) -> Result<SetupBundle, SetupError> {
    let dir = root.join(setup_id);
    if !dir.is_dir() {
        return Err(SetupError::NotFound(setup_id.to_owned()));
    }
    let starting_path = dir.join("starting_setup.json");
    if !starting_path.exists() {
        return Err(SetupError::NotFound(setup_id.to_owned()));
    }

    let units: BTreeMap<String, UnitDef> = read_json(setup_id, &dir.join("units.json"))?;
    let territories: BTreeMap<String, TerritoryDef> =
        read_json(setup_id, &dir.join("territories.json"))?;
    let factions: BTreeMap<String, FactionDef> = read_json(setup_id, &dir.join("factions.json"))?;
    let camps: BTreeMap<String, CampDef> = if dir.join("camps.json").exists() {
        read_json(setup_id, &dir.join("camps.json"))?
    } else {
        BTreeMap::new()
    };
    let starting_setup: StartingSetup = read_json(setup_id, &starting_path)?;

    let manifest = read_manifest(&dir);

    Ok(SetupBundle {
        id: manifest.id.unwrap_or_else(|| setup_id.to_owned()),
        display_name: manifest
            .display_name
            .unwrap_or_else(|| setup_id.to_owned()),
        map_asset: manifest.map_asset.unwrap_or_else(|| setup_id.to_owned()),
        victory_criteria: manifest.victory_criteria,
        camp_cost: manifest.camp_cost,
        definitions: Definitions {
            units,
            territories,
            factions,
            camps,
        },
        starting_setup,
    })
}
