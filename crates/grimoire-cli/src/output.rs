//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use grimoire_core::{SyncEvent, SyncReport};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print one sync event as it arrives
    pub fn print_event(&self, event: &SyncEvent) {
        match self.format {
            OutputFormat::Human => match event {
                SyncEvent::ChunkFailed { .. }
                | SyncEvent::RecordSkipped { .. }
                | SyncEvent::CollectionFailed { .. } => eprintln!("⚠ {}", event),
                _ => println!("{}", event),
            },
            OutputFormat::Json => {
                println!("{}", serde_json::json!({ "event": event.to_string() }));
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print the summary of a sync run
    pub fn print_report(&self, report: &SyncReport) {
        match self.format {
            OutputFormat::Human => {
                println!();
                for collection in &report.collections {
                    let mark = if collection.is_complete() { "✓" } else { "⚠" };
                    let status = match &collection.error {
                        Some(error) => format!("error: {}", error),
                        None => format!(
                            "{} uploaded, {} failed, {} skipped",
                            collection.upload.uploaded,
                            collection.upload.failed(),
                            collection.skipped
                        ),
                    };
                    println!(
                        "{} {:<22} {}",
                        mark,
                        collection.kind.collection(),
                        status
                    );
                }
            }
            OutputFormat::Json => {
                let collections: Vec<_> = report
                    .collections
                    .iter()
                    .map(|c| {
                        serde_json::json!({
                            "collection": c.kind.collection(),
                            "uploaded": c.upload.uploaded,
                            "failed": c.upload.failed(),
                            "skipped": c.skipped,
                            "requests": c.upload.chunks,
                            "complete": c.is_complete(),
                            "error": c.error,
                        })
                    })
                    .collect();
                println!(
                    "{}",
                    serde_json::json!({
                        "uploaded": report.uploaded(),
                        "failed": report.failed(),
                        "skipped": report.skipped(),
                        "collections": collections,
                    })
                );
            }
            OutputFormat::Quiet => {
                println!("{}", report.uploaded());
            }
        }
    }

    /// Print a JSON document (pretty in human mode)
    pub fn print_json(&self, value: &serde_json::Value) {
        match self.format {
            OutputFormat::Human => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
                );
            }
            OutputFormat::Json | OutputFormat::Quiet => println!("{}", value),
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}
