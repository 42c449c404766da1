//! Schema migration for records written before versioning
//!
//! Two kinds of upgrade happen here:
//!
//! - **Stamping**: any record without a version tag is marked `"legacy"`,
//!   and any record without an id gets one derived from its name.
//! - **Encounter snapshots**: the oldest saved encounters stored an
//!   index into a `Creatures` array instead of combatant ids. These are
//!   rebuilt as `EncounterState` with freshly generated combatant ids.
//!
//! Nested stat blocks are never rewritten; fields they lack stay absent.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::MigrationError;
use crate::identity::{make_id, IdSource, RandomIds};
use crate::models::{CombatantState, EncounterState, Listable, LEGACY_VERSION};

/// Attempts at drawing a fresh combatant id from the injected source
/// before falling back to random ids
const MAX_ID_ATTEMPTS: usize = 16;

/// Give an untagged record a version and an id
pub fn stamp_legacy(listable: &mut Listable) {
    if listable.version.is_empty() {
        listable.version = LEGACY_VERSION.to_string();
    }
    if listable.id.is_empty() {
        listable.id = make_id(&listable.name, None);
    }
}

/// Encounter as saved before versioning
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LegacySavedEncounter {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub active_creature_index: Option<i64>,
    #[serde(default)]
    pub creatures: Option<Vec<LegacyCreature>>,
}

/// Creature entry of a legacy encounter
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LegacyCreature {
    pub statblock: Value,
    #[serde(rename = "CurrentHP")]
    pub current_hp: i64,
    #[serde(default, rename = "TemporaryHP")]
    pub temporary_hp: i64,
    #[serde(default)]
    pub initiative: i64,
    #[serde(default)]
    pub alias: String,
    #[serde(default)]
    pub tags: Vec<Value>,
}

/// Rebuild a legacy encounter snapshot in the current shape
///
/// A missing `ActiveCreatureIndex` means the encounter was saved outside
/// of combat and yields no active combatant. An index that does not point
/// at a creature is an error.
pub fn upgrade_legacy_encounter<I: IdSource + ?Sized>(
    legacy: LegacySavedEncounter,
    ids: &mut I,
) -> Result<EncounterState, MigrationError> {
    let Some(creatures) = legacy.creatures else {
        return Err(MigrationError::MissingCreatures { name: legacy.name });
    };

    let active_index = match legacy.active_creature_index {
        None => None,
        Some(index) => match usize::try_from(index) {
            Ok(i) if i < creatures.len() => Some(i),
            _ => {
                return Err(MigrationError::ActiveIndexOutOfRange {
                    name: legacy.name,
                    index,
                    count: creatures.len(),
                })
            }
        },
    };

    let mut used = HashSet::with_capacity(creatures.len());
    let combatants: Vec<CombatantState> = creatures
        .into_iter()
        .map(|creature| CombatantState {
            id: unique_id(ids, &mut used),
            stat_block: creature.statblock,
            current_hp: creature.current_hp,
            temporary_hp: creature.temporary_hp,
            initiative: creature.initiative,
            alias: creature.alias,
            tags: creature.tags,
            hidden: false,
            revealed_ac: false,
        })
        .collect();

    let active_combatant_id = active_index.map(|i| combatants[i].id.clone());

    debug!(
        "Upgraded legacy encounter '{}' with {} combatants",
        legacy.name,
        combatants.len()
    );

    Ok(EncounterState {
        listable: Listable {
            id: make_id(&legacy.name, None),
            name: legacy.name,
            path: String::new(),
            version: LEGACY_VERSION.to_string(),
        },
        combatants,
        active_combatant_id,
        round_counter: None,
        elapsed_seconds: None,
    })
}

fn unique_id<I: IdSource + ?Sized>(ids: &mut I, used: &mut HashSet<String>) -> String {
    for _ in 0..MAX_ID_ATTEMPTS {
        let id = ids.next_id();
        if !id.is_empty() && used.insert(id.clone()) {
            return id;
        }
    }

    warn!("Combatant id source keeps colliding, falling back to random ids");
    loop {
        let id = RandomIds.next_id();
        if used.insert(id.clone()) {
            return id;
        }
    }
}

/// Whether a stored encounter is already in the current shape
///
/// Current-shape records carry a `Combatants` list or a version tag.
pub fn is_current_encounter(value: &Value) -> bool {
    value.get("Combatants").is_some()
        || value
            .get("Version")
            .and_then(Value::as_str)
            .is_some_and(|v| !v.is_empty())
}

/// Bring a stored encounter of any era to the current shape
///
/// Records with a version tag or a `Combatants` list are current-shape and
/// only get stamped. Anything else is treated as a legacy snapshot.
pub fn migrate_encounter<I: IdSource + ?Sized>(
    value: Value,
    ids: &mut I,
) -> Result<EncounterState, MigrationError> {
    let name = value
        .get("Name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    if is_current_encounter(&value) {
        let mut encounter: EncounterState =
            serde_json::from_value(value).map_err(|e| MigrationError::Malformed {
                name,
                details: e.to_string(),
            })?;
        stamp_legacy(&mut encounter.listable);
        return Ok(encounter);
    }

    let legacy: LegacySavedEncounter =
        serde_json::from_value(value).map_err(|e| MigrationError::Malformed {
            name,
            details: e.to_string(),
        })?;
    upgrade_legacy_encounter(legacy, ids)
}

/// Outcome of migrating a set of encounters
#[derive(Debug, Default)]
pub struct MigrationReport {
    pub migrated: Vec<EncounterState>,
    pub failed: Vec<MigrationError>,
}

/// Migrate every record independently; one bad record never stops the rest
pub fn migrate_encounters<I: IdSource + ?Sized>(
    values: Vec<Value>,
    ids: &mut I,
) -> MigrationReport {
    let mut report = MigrationReport::default();
    for value in values {
        match migrate_encounter(value, ids) {
            Ok(encounter) => report.migrated.push(encounter),
            Err(e) => {
                warn!("{}", e);
                report.failed.push(e);
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn v0_1_stat_block() -> Value {
        json!({
            "Name": "v0.1 Creature",
            "Type": "",
            "HP": { "Value": 1 },
            "AC": { "Value": 10 },
            "Speed": ["Walk 30"],
            "Abilities": {
                "Accuracy": 10, "Communication": 10, "Constitution": 10,
                "Cha": 10, "Int": 10, "Wis": 10
            },
            "DamageVulnerabilities": [],
            "DamageResistances": [],
            "DamageImmunities": [],
            "ConditionImmunities": [],
            "Saves": [],
            "Skills": [],
            "Senses": [],
            "Languages": [],
            "Challenge": "",
            "Traits": [],
            "Actions": [],
            "LegendaryActions": []
        })
    }

    fn v0_1_encounter() -> Value {
        json!({
            "Name": "V0.1 Encounter",
            "ActiveCreatureIndex": 0,
            "Creatures": [{
                "Statblock": v0_1_stat_block(),
                "CurrentHP": 1,
                "TemporaryHP": 0,
                "Initiative": 10,
                "Alias": "",
                "Tags": []
            }]
        })
    }

    fn creature(hp: i64) -> Value {
        json!({ "Statblock": { "Name": "Kobold" }, "CurrentHP": hp })
    }

    #[test]
    fn test_stamp_legacy() {
        let mut listable = Listable {
            name: "Young Green Dragon".to_string(),
            ..Listable::default()
        };
        stamp_legacy(&mut listable);
        assert_eq!(listable.id, "Young_Green_Dragon");
        assert_eq!(listable.version, "legacy");

        let mut current = Listable::new("abc", "Lich");
        stamp_legacy(&mut current);
        assert_eq!(current.id, "abc");
        assert_ne!(current.version, "legacy");
    }

    #[test]
    fn test_is_current_encounter() {
        assert!(is_current_encounter(&json!({ "Name": "A", "Combatants": [] })));
        assert!(is_current_encounter(&json!({ "Name": "A", "Version": "1.2.0" })));
        assert!(!is_current_encounter(&json!({ "Name": "A", "Version": "" })));
        assert!(!is_current_encounter(&v0_1_encounter()));
    }

    #[test]
    fn test_loads_v0_1_encounter() {
        let encounter = migrate_encounter(v0_1_encounter(), &mut RandomIds).unwrap();

        assert_eq!(encounter.listable.id, "V01_Encounter");
        assert_eq!(encounter.listable.name, "V0.1 Encounter");
        assert_eq!(encounter.listable.path, "");
        assert_eq!(encounter.listable.version, "legacy");
        assert_eq!(encounter.combatants.len(), 1);

        let combatant = &encounter.combatants[0];
        assert_eq!(combatant.id.len(), 8);
        assert_eq!(encounter.active_combatant_id.as_deref(), Some(combatant.id.as_str()));
        assert_eq!(combatant.current_hp, 1);
        assert_eq!(combatant.initiative, 10);
        assert!(!combatant.revealed_ac);
    }

    #[test]
    fn test_nested_stat_block_is_untouched() {
        let encounter = migrate_encounter(v0_1_encounter(), &mut RandomIds).unwrap();
        let block = &encounter.combatants[0].stat_block;

        assert_eq!(block, &v0_1_stat_block());
        assert!(block.get("Reactions").is_none());
        assert!(block.get("Version").is_none());
    }

    #[test]
    fn test_active_index_selects_combatant() {
        let legacy = json!({
            "Name": "Crypt",
            "ActiveCreatureIndex": 2,
            "Creatures": [creature(3), creature(4), creature(5)]
        });
        let encounter = migrate_encounter(legacy, &mut RandomIds).unwrap();

        assert_eq!(encounter.active_combatant().map(|c| c.current_hp), Some(5));
    }

    #[test]
    fn test_missing_active_index_means_no_active_combatant() {
        let legacy = json!({ "Name": "Prep", "Creatures": [creature(3)] });
        let encounter = migrate_encounter(legacy, &mut RandomIds).unwrap();
        assert!(encounter.active_combatant_id.is_none());
    }

    #[test]
    fn test_out_of_range_index_fails() {
        for index in [1, -1] {
            let legacy = json!({
                "Name": "Crypt",
                "ActiveCreatureIndex": index,
                "Creatures": [creature(3)]
            });
            let err = migrate_encounter(legacy, &mut RandomIds).unwrap_err();
            assert!(matches!(
                err,
                MigrationError::ActiveIndexOutOfRange { count: 1, .. }
            ));
        }
    }

    #[test]
    fn test_missing_creatures_fails() {
        let legacy = json!({ "Name": "Empty", "ActiveCreatureIndex": 0 });
        let err = migrate_encounter(legacy, &mut RandomIds).unwrap_err();
        assert!(matches!(err, MigrationError::MissingCreatures { ref name } if name == "Empty"));
    }

    #[test]
    fn test_combatant_ids_unique_despite_colliding_source() {
        let mut calls = 0;
        let mut source = || {
            calls += 1;
            if calls <= 3 {
                "aaaaaaaa".to_string()
            } else {
                format!("b{:07}", calls)
            }
        };
        let legacy = json!({
            "Name": "Horde",
            "Creatures": [creature(1), creature(2), creature(3)]
        });

        let encounter = migrate_encounter(legacy, &mut source).unwrap();
        let ids: HashSet<_> = encounter.combatants.iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids.len(), 3);
        assert!(ids.contains("aaaaaaaa"));
    }

    #[test]
    fn test_constant_source_falls_back_to_random() {
        let mut source = || "same".to_string();
        let legacy = json!({ "Name": "Pair", "Creatures": [creature(1), creature(2)] });

        let encounter = migrate_encounter(legacy, &mut source).unwrap();
        assert_eq!(encounter.combatants[0].id, "same");
        assert_eq!(encounter.combatants[1].id.len(), 8);
        assert_ne!(encounter.combatants[1].id, "same");
    }

    #[test]
    fn test_current_shape_is_only_stamped() {
        let current = json!({
            "Name": "Bridge Fight",
            "Combatants": [{
                "Id": "q1w2e3r4",
                "StatBlock": { "Name": "Troll" },
                "CurrentHP": 84,
                "RevealedAC": true
            }],
            "ActiveCombatantId": null
        });

        let encounter = migrate_encounter(current, &mut RandomIds).unwrap();
        assert_eq!(encounter.listable.id, "Bridge_Fight");
        assert_eq!(encounter.listable.version, "legacy");
        assert_eq!(encounter.combatants[0].id, "q1w2e3r4");
        assert!(encounter.combatants[0].revealed_ac);
    }

    #[test]
    fn test_versioned_record_without_combatants_is_malformed() {
        let value = json!({ "Name": "Broken", "Version": "1.2.0" });
        let err = migrate_encounter(value, &mut RandomIds).unwrap_err();
        assert!(matches!(err, MigrationError::Malformed { .. }));
    }

    #[test]
    fn test_migrate_encounters_isolates_failures() {
        let values = vec![
            v0_1_encounter(),
            json!({ "Name": "No Creatures" }),
            json!({ "Name": "Bad Index", "ActiveCreatureIndex": 9, "Creatures": [] }),
            json!({ "Name": "Fine", "Creatures": [creature(2)] }),
        ];

        let report = migrate_encounters(values, &mut RandomIds);
        assert_eq!(report.migrated.len(), 2);
        assert_eq!(report.failed.len(), 2);
        assert_eq!(report.migrated[1].listable.id, "Fine");
    }
}
