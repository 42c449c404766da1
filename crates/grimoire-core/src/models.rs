//! Data models for Grimoire
//!
//! Every syncable record shares the `Listable` header (Id, Name, Path,
//! Version). The specialized entities flatten that header next to their
//! own fields, so they serialize to the same PascalCase JSON the account
//! store speaks.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Version tag stamped on records written before versioning existed
pub const LEGACY_VERSION: &str = "legacy";

/// Version tag written on records created by this build
pub const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// One remote collection of the account store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    StatBlocks,
    PlayerCharacters,
    PersistentCharacters,
    Encounters,
    Spells,
}

impl EntityKind {
    /// All collections, in the order they appear in the account export
    pub const ALL: [EntityKind; 5] = [
        EntityKind::StatBlocks,
        EntityKind::PlayerCharacters,
        EntityKind::PersistentCharacters,
        EntityKind::Encounters,
        EntityKind::Spells,
    ];

    /// Path segment of the collection endpoint (`/my/{collection}/`)
    pub fn collection(&self) -> &'static str {
        match self {
            EntityKind::StatBlocks => "statblocks",
            EntityKind::PlayerCharacters => "playercharacters",
            EntityKind::PersistentCharacters => "persistentcharacters",
            EntityKind::Encounters => "encounters",
            EntityKind::Spells => "spells",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.collection() == s)
            .ok_or_else(|| format!("Unknown entity collection: '{}'", s))
    }
}

/// Where a listing was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Origin {
    #[serde(rename = "localStorage")]
    LocalStorage,
    #[serde(rename = "account")]
    Account,
}

/// Header shared by every syncable record
///
/// Empty `id` or `version` means the field was never set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Listable {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub version: String,
}

impl Listable {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            path: String::new(),
            version: CURRENT_VERSION.to_string(),
        }
    }

    /// Read the header out of a stored record's fields
    ///
    /// Missing or non-string header fields read as empty.
    pub fn from_fields(fields: &Map<String, Value>) -> Self {
        let field = |key: &str| {
            fields
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        Self {
            id: field("Id"),
            name: field("Name"),
            path: field("Path"),
            version: field("Version"),
        }
    }
}

/// A record that can be listed, identified and uploaded
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    fn listable(&self) -> &Listable;
    fn listable_mut(&mut self) -> &mut Listable;
}

/// Lightweight reference to a record, without its payload
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Listing {
    pub id: String,
    pub name: String,
    pub path: String,
    pub origin: Origin,
}

impl Listing {
    pub fn new(id: impl Into<String>, name: impl Into<String>, origin: Origin) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            path: String::new(),
            origin,
        }
    }

    /// Build a listing from a record header
    pub fn from_listable(listable: &Listable, origin: Origin) -> Self {
        Self {
            id: listable.id.clone(),
            name: listable.name.clone(),
            path: listable.path.clone(),
            origin,
        }
    }
}

// ==================== Stat Blocks ====================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AbilityScores {
    pub accuracy: i64,
    pub communication: i64,
    pub constitution: i64,
    pub cha: i64,
    pub int: i64,
    pub wis: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NameAndModifier {
    pub name: String,
    pub modifier: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ValueAndNotes {
    pub value: i64,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NameAndContent {
    pub name: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InitiativeSpecialRoll {
    Advantage,
    Disadvantage,
    TakeTen,
}

/// A creature or character stat block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StatBlock {
    #[serde(flatten)]
    pub listable: Listable,
    #[serde(default)]
    pub source: String,
    #[serde(default, rename = "Type")]
    pub kind: String,
    #[serde(default, rename = "HP")]
    pub hp: ValueAndNotes,
    #[serde(default, rename = "AC")]
    pub ac: ValueAndNotes,
    #[serde(default)]
    pub speed: Vec<String>,
    #[serde(default)]
    pub abilities: AbilityScores,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initiative_modifier: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initiative_special_roll: Option<InitiativeSpecialRoll>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initiative_advantage: Option<bool>,
    #[serde(default)]
    pub damage_vulnerabilities: Vec<String>,
    #[serde(default)]
    pub damage_resistances: Vec<String>,
    #[serde(default)]
    pub damage_immunities: Vec<String>,
    #[serde(default)]
    pub condition_immunities: Vec<String>,
    #[serde(default)]
    pub saves: Vec<NameAndModifier>,
    #[serde(default)]
    pub skills: Vec<NameAndModifier>,
    #[serde(default)]
    pub senses: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub challenge: String,
    #[serde(default)]
    pub traits: Vec<NameAndContent>,
    #[serde(default)]
    pub actions: Vec<NameAndContent>,
    #[serde(default)]
    pub reactions: Vec<NameAndContent>,
    #[serde(default)]
    pub legendary_actions: Vec<NameAndContent>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub player: String,
    #[serde(default, rename = "ImageURL")]
    pub image_url: String,
}

impl StatBlock {
    /// A fresh stat block as the editor creates it
    pub fn default_block(id: impl Into<String>) -> Self {
        Self {
            listable: Listable::new(id, ""),
            hp: ValueAndNotes {
                value: 1,
                notes: "(1d1+0)".to_string(),
            },
            ac: ValueAndNotes {
                value: 10,
                notes: String::new(),
            },
            initiative_modifier: Some(0),
            initiative_advantage: Some(false),
            abilities: AbilityScores {
                accuracy: 10,
                communication: 10,
                constitution: 10,
                cha: 10,
                int: 10,
                wis: 10,
            },
            ..Self::default()
        }
    }

    /// Search keywords derived from the creature type
    pub fn keywords(&self) -> String {
        self.kind
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || c.is_whitespace())
            .collect()
    }
}

impl Entity for StatBlock {
    fn listable(&self) -> &Listable {
        &self.listable
    }

    fn listable_mut(&mut self) -> &mut Listable {
        &mut self.listable
    }
}

// ==================== Persistent Characters ====================

/// A player character whose state carries across encounters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PersistentCharacter {
    #[serde(flatten)]
    pub listable: Listable,
    pub stat_block: StatBlock,
    #[serde(rename = "CurrentHP")]
    pub current_hp: i64,
    #[serde(default)]
    pub notes: String,
    /// Milliseconds since the Unix epoch
    #[serde(default)]
    pub last_updated: i64,
    #[serde(default, rename = "ImageURL", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Entity for PersistentCharacter {
    fn listable(&self) -> &Listable {
        &self.listable
    }

    fn listable_mut(&mut self) -> &mut Listable {
        &mut self.listable
    }
}

// ==================== Spells ====================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Spell {
    #[serde(flatten)]
    pub listable: Listable,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub level: i64,
    #[serde(default)]
    pub school: String,
    #[serde(default)]
    pub casting_time: String,
    #[serde(default)]
    pub range: String,
    #[serde(default)]
    pub components: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub ritual: bool,
}

impl Entity for Spell {
    fn listable(&self) -> &Listable {
        &self.listable
    }

    fn listable_mut(&mut self) -> &mut Listable {
        &mut self.listable
    }
}

// ==================== Encounters ====================

/// One combatant in a saved encounter
///
/// The stat block and tags are kept as raw JSON: the sync engine never
/// reinterprets them, and older saves must round-trip untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CombatantState {
    pub id: String,
    pub stat_block: Value,
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
    #[serde(default)]
    pub hidden: bool,
    #[serde(default, rename = "RevealedAC")]
    pub revealed_ac: bool,
}

/// A saved encounter in the current (versioned) shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EncounterState {
    #[serde(flatten)]
    pub listable: Listable,
    pub combatants: Vec<CombatantState>,
    #[serde(default)]
    pub active_combatant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_counter: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_seconds: Option<u64>,
}

impl EncounterState {
    pub fn active_combatant(&self) -> Option<&CombatantState> {
        let id = self.active_combatant_id.as_deref()?;
        self.combatants.iter().find(|c| c.id == id)
    }
}

impl Entity for EncounterState {
    fn listable(&self) -> &Listable {
        &self.listable
    }

    fn listable_mut(&mut self) -> &mut Listable {
        &mut self.listable
    }
}
