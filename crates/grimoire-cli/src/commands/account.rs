//! Account command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use grimoire_core::{AccountSnapshot, Config, EntityKind};

use super::{account_client, storage_enabled};
use crate::output::{Output, OutputFormat};

/// Show the signed-in account
pub async fn show(config: &Config, output: &Output) -> Result<()> {
    let client = account_client(config)?;
    let account = client
        .get_account()
        .await
        .context("Failed to fetch the account")?;

    match account {
        Some(account) => output.print_json(&account),
        None if output.is_json() => println!("null"),
        None => output.message("Not signed in."),
    }
    Ok(())
}

/// Download the full account export
pub async fn export(config: &Config, out: Option<PathBuf>, output: &Output) -> Result<()> {
    let client = account_client(config)?;
    let export = client
        .get_full_account()
        .await
        .context("Failed to fetch the account export")?
        .unwrap_or_default();

    let Some(path) = out else {
        output.print_json(&export);
        return Ok(());
    };

    let content = serde_json::to_string_pretty(&export)?;
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write export: {:?}", path))?;

    let snapshot = AccountSnapshot::from_export(&export);
    let total: usize = EntityKind::ALL.iter().map(|k| snapshot.count(*k)).sum();
    output.success(&format!(
        "Exported {} records to {}",
        total,
        path.display()
    ));
    Ok(())
}

/// Delete the account and everything in it
pub async fn delete(config: &Config, yes: bool, output: &Output) -> Result<()> {
    if !yes {
        bail!("Refusing to delete the account without --yes");
    }
    if !storage_enabled(config, output) {
        return Ok(());
    }

    let client = account_client(config)?;
    client
        .delete_account()
        .await
        .context("Failed to delete the account")?;

    output.success("Account deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_delete_requires_confirmation() {
        let output = Output::new(OutputFormat::Quiet);
        assert!(delete(&Config::default(), false, &output).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_with_storage_disabled_sends_nothing() {
        let config = Config {
            storage_enabled: false,
            // Nothing listens here; any request would fail
            account_url: "http://127.0.0.1:9".to_string(),
            ..Config::default()
        };
        let output = Output::new(OutputFormat::Quiet);
        assert!(delete(&config, true, &output).await.is_ok());
    }
}
