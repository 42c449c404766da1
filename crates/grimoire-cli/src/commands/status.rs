//! Status command handler

use anyhow::Result;

use grimoire_core::{Config, EntityKind, LocalLibrary};

use crate::output::{Output, OutputFormat};

/// Show account settings and local library counts
pub async fn show(config: &Config, output: &Output) -> Result<()> {
    let library = LocalLibrary::new(config.library_dir());
    let mut counts: Vec<(EntityKind, Option<usize>)> = Vec::new();
    for kind in EntityKind::ALL {
        counts.push((kind, library.count(kind).await.ok()));
    }

    match output.format {
        OutputFormat::Json => {
            let counts: serde_json::Map<String, serde_json::Value> = counts
                .iter()
                .map(|(kind, count)| (kind.collection().to_string(), serde_json::json!(count)))
                .collect();
            println!(
                "{}",
                serde_json::json!({
                    "library": library.root(),
                    "account_url": config.account_url,
                    "storage_enabled": config.storage_enabled,
                    "batch_size": config.batch_size,
                    "counts": counts
                })
            );
        }
        OutputFormat::Quiet => {
            let total: usize = counts.iter().filter_map(|(_, c)| *c).sum();
            println!("{}", total);
        }
        OutputFormat::Human => {
            println!("Grimoire Status");
            println!("===============");
            println!();
            println!("Account:");
            println!(
                "  Storage: {}",
                if config.storage_enabled {
                    "enabled"
                } else {
                    "disabled"
                }
            );
            println!("  Server:  {}", config.account_url);
            println!("  Batch:   {} per request", config.batch_size);
            println!();
            println!("Library ({}):", library.root().display());
            for (kind, count) in &counts {
                let count = count
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "unreadable".to_string());
                println!("  {:<22} {}", kind.collection(), count);
            }
        }
    }

    Ok(())
}
