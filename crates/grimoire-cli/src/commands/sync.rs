//! Sync command handler

use anyhow::{Context, Result};

use grimoire_core::events;
use grimoire_core::{AccountSnapshot, Config, LocalLibrary, MergedLibrary};

use super::{account_client, storage_enabled};
use crate::output::Output;

/// Upload every local record the account lacks
pub async fn sync(config: &Config, output: &Output) -> Result<()> {
    if !storage_enabled(config, output) {
        return Ok(());
    }

    let client = account_client(config)?;

    output.message(&format!("Reading account from {}...", config.account_url));
    let export = client
        .get_full_account()
        .await
        .context("Failed to fetch the account")?
        .unwrap_or_default();

    let library = MergedLibrary::new(
        LocalLibrary::new(config.library_dir()),
        AccountSnapshot::from_export(&export),
    );

    let (tx, mut rx) = events::channel();
    let (report, ()) = tokio::join!(
        async move {
            let report = client.sync_all(&library, &tx).await;
            // Close the channel so the printer finishes
            drop(tx);
            report
        },
        async {
            while let Some(event) = rx.recv().await {
                output.print_event(&event);
            }
        }
    );

    output.print_report(&report);
    Ok(())
}
