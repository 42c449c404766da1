//! Identity assignment
//!
//! Record ids double as URL path segments on the account store
//! (`/my/{collection}/{id}`), so they are restricted to `[A-Za-z0-9_]`,
//! with a single `-` joining an optional path prefix.

/// Length of generated combatant ids
pub const GENERATED_ID_LEN: usize = 8;

/// Derive a stable id from a display name and optional path
///
/// Spaces become `_` and every other character outside `[A-Za-z0-9_]` is
/// dropped. A non-empty path is sanitized the same way and prefixed as
/// `"<path>-<name>"`.
///
/// ```
/// use grimoire_core::identity::make_id;
///
/// assert_eq!(make_id("Ancient Red Dragon", None), "Ancient_Red_Dragon");
/// assert_eq!(make_id("Goblin", Some("Tier 1")), "Tier_1-Goblin");
/// ```
pub fn make_id(name: &str, path: Option<&str>) -> String {
    match path {
        Some(path) if !path.is_empty() => {
            format!("{}-{}", sanitize_for_id(path), sanitize_for_id(name))
        }
        _ => sanitize_for_id(name),
    }
}

fn sanitize_for_id(s: &str) -> String {
    s.chars()
        .filter_map(|c| match c {
            ' ' => Some('_'),
            c if c.is_ascii_alphanumeric() || c == '_' => Some(c),
            _ => None,
        })
        .collect()
}

/// Rewrite ids from the era when names with dots were used verbatim
///
/// The account store treats a dot as a file extension separator.
pub fn repair_legacy_id(id: &str) -> String {
    id.replace('.', "_")
}

/// Source of short random ids for records that have no name to derive one from
pub trait IdSource {
    fn next_id(&mut self) -> String;
}

/// Random ids drawn from v4 UUIDs
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIds;

impl IdSource for RandomIds {
    fn next_id(&mut self) -> String {
        uuid::Uuid::new_v4().simple().to_string()[..GENERATED_ID_LEN].to_string()
    }
}

impl<F> IdSource for F
where
    F: FnMut() -> String,
{
    fn next_id(&mut self) -> String {
        self()
    }
}
