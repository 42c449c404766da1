//! Command handlers

pub mod account;
pub mod config;
pub mod id;
pub mod migrate;
pub mod status;
pub mod sync;

use anyhow::{Context, Result};
use grimoire_core::{AccountClient, Config, HttpTransport};

use crate::output::Output;

/// Build an account client from configuration
pub fn account_client(config: &Config) -> Result<AccountClient<HttpTransport>> {
    let transport = HttpTransport::new(config).context("Failed to create HTTP client")?;
    Ok(AccountClient::new(transport, config))
}

/// Whether account storage is on; prints how to enable it when it is not
pub fn storage_enabled(config: &Config, output: &Output) -> bool {
    if !config.storage_enabled {
        output.message(
            "Account storage is disabled. Enable it with:\n  \
             grimoire config set storage_enabled true",
        );
    }
    config.storage_enabled
}
