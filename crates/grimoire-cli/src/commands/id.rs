//! Id command handler

use anyhow::{bail, Result};

use grimoire_core::make_id;

use crate::output::{Output, OutputFormat};

/// Print the id derived from a record name and folder path
pub fn show(name: &str, path: Option<&str>, output: &Output) -> Result<()> {
    let id = make_id(name, path);
    if id.is_empty() {
        bail!("'{}' has no characters usable in an id", name);
    }

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({ "name": name, "path": path, "id": id })
            );
        }
        OutputFormat::Human | OutputFormat::Quiet => println!("{}", id),
    }
    Ok(())
}
