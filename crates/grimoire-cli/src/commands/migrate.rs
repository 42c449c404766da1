//! Migrate command handler

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::Value;

use grimoire_core::identity::RandomIds;
use grimoire_core::migrate::migrate_encounters;
use grimoire_core::{make_id, Config, EncounterState, EntityKind, LocalLibrary};
use tracing::warn;

use crate::output::{Output, OutputFormat};

/// Upgrade saved encounters read from `file`
///
/// Every encounter is migrated and written on its own; failures are
/// listed and the rest still go through. With `write` the results are
/// saved into the local library, keyed by id.
pub fn migrate(config: &Config, file: &Path, write: bool, output: &Output) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {:?}", file))?;
    let document: Value =
        serde_json::from_str(&content).with_context(|| format!("Failed to parse {:?}", file))?;

    let values = match document {
        Value::Array(items) => items,
        Value::Object(_) => vec![document],
        _ => bail!("{:?} must hold an encounter or an array of encounters", file),
    };

    let report = migrate_encounters(values, &mut RandomIds);

    let mut failed: Vec<String> = report.failed.iter().map(|e| e.to_string()).collect();
    let library = LocalLibrary::new(config.library_dir());
    let mut written = 0;
    if write {
        for encounter in &report.migrated {
            match save_encounter(&library, encounter) {
                Ok(()) => written += 1,
                Err(e) => {
                    warn!("{:#}", e);
                    failed.push(format!("{:#}", e));
                }
            }
        }
    }

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "migrated": report.migrated,
                    "failed": failed,
                    "written": written
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", report.migrated.len());
        }
        OutputFormat::Human => {
            for encounter in &report.migrated {
                println!(
                    "  {} ({} combatants)",
                    encounter.listable.name,
                    encounter.combatants.len()
                );
            }
            for error in &failed {
                eprintln!("⚠ Could not migrate: {}", error);
            }
            println!();
            if write {
                output.success(&format!(
                    "Migrated {} encounters into {} ({} failed)",
                    written,
                    library.root().display(),
                    failed.len()
                ));
            } else {
                output.success(&format!(
                    "Migrated {} encounters ({} failed). Use --write to save them.",
                    report.migrated.len(),
                    failed.len()
                ));
            }
        }
    }

    Ok(())
}

fn save_encounter(library: &LocalLibrary, encounter: &EncounterState) -> Result<()> {
    let key = if encounter.listable.id.is_empty() {
        make_id(&encounter.listable.name, None)
    } else {
        encounter.listable.id.clone()
    };
    if key.is_empty() {
        bail!("Encounter '{}' has no usable id", encounter.listable.name);
    }

    let record = serde_json::to_value(encounter)?;
    library
        .save_record(EntityKind::Encounters, &key, &record)
        .with_context(|| format!("Failed to save encounter '{}'", encounter.listable.name))?;
    Ok(())
}
