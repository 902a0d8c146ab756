use indexmap::{IndexMap, IndexSet};
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const STATS_FILE: &str = "stats.json";
pub const NATURES_FILE: &str = "natures.json";
pub const BACKGROUNDS_FILE: &str = "backgrounds.json";
pub const TALENTS_FILE: &str = "talents.json";

/// Errors raised while reading or checking a rules directory.
#[derive(Debug, Error)]
pub enum RulesError {
    #[error("failed to read {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid rules table {}: {}", .path.display(), .source)]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("rules table '{0}' is empty")]
    EmptyTable(&'static str),

    #[error("stat '{0}' is listed more than once")]
    DuplicateStat(String),
}

/// Ordered stat names, stored on disk as `{"stats": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatList {
    pub stats: Vec<String>,
}

/// A named ability granted by a nature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "AbilityEntry")]
pub struct Ability {
    pub name: String,
    pub effect: String,
}

/// The two shapes an ability may take in a rules file: a bare name, or a
/// name with an effect.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AbilityEntry {
    Name(String),
    Detailed {
        name: String,
        #[serde(default)]
        effect: Option<String>,
    },
}

impl From<AbilityEntry> for Ability {
    fn from(entry: AbilityEntry) -> Self {
        match entry {
            AbilityEntry::Name(name) => Ability {
                name,
                effect: String::new(),
            },
            AbilityEntry::Detailed { name, effect } => Ability {
                name,
                effect: effect.unwrap_or_default(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nature {
    pub name: String,
    #[serde(default)]
    pub hp: u32,
    #[serde(default)]
    pub abilities: Vec<Ability>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Background {
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_stat_mods")]
    pub stat_mods: IndexMap<String, i32>,
    #[serde(default)]
    pub hp_bonus: Option<String>,
    #[serde(default)]
    pub shreds: Option<String>,
    #[serde(default)]
    pub talent: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Talent {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub effect: String,
}

/// Stat modifiers are written either as numbers or as strings like `"+2"`.
/// Fractional numbers are truncated.
#[derive(Deserialize)]
#[serde(untagged)]
enum StatModValue {
    Int(i64),
    Float(f64),
    Text(String),
}

fn deserialize_stat_mods<'de, D>(deserializer: D) -> Result<IndexMap<String, i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = IndexMap::<String, StatModValue>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(stat, value)| {
            let delta = match value {
                StatModValue::Int(n) => n.clamp(i32::MIN as i64, i32::MAX as i64) as i32,
                // `as` truncates toward zero and saturates at the i32 bounds.
                StatModValue::Float(f) => f as i32,
                StatModValue::Text(text) => parse_int_prefix(&text).unwrap_or_else(|| {
                    log::warn!("stat modifier {stat:?} has non-numeric value {text:?}, using 0");
                    0
                }),
            };
            (stat, delta)
        })
        .collect())
}

/// Reads an optional sign followed by leading digits, ignoring whatever
/// comes after them.
pub(crate) fn parse_int_prefix(text: &str) -> Option<i32> {
    let t = text.trim_start();
    let (negative, digits) = match t.as_bytes().first() {
        Some(b'-') => (true, &t[1..]),
        Some(b'+') => (false, &t[1..]),
        _ => (false, t),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let value = digits[..end].parse::<i32>().ok()?;
    Some(if negative { -value } else { value })
}

/// The four rule tables a character is generated from.
///
/// Loaded once and then only read; sharing it between threads needs no
/// locking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesDataset {
    pub stats: StatList,
    pub natures: IndexMap<String, Nature>,
    pub backgrounds: IndexMap<String, Background>,
    pub talents: IndexMap<String, Talent>,
}

impl RulesDataset {
    /// Load `stats.json`, `natures.json`, `backgrounds.json` and
    /// `talents.json` from `dir`.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, RulesError> {
        let dir = dir.as_ref();
        let rules = RulesDataset {
            stats: read_table(dir, STATS_FILE)?,
            natures: read_table(dir, NATURES_FILE)?,
            backgrounds: read_table(dir, BACKGROUNDS_FILE)?,
            talents: read_table(dir, TALENTS_FILE)?,
        };
        rules.validate()?;

        log::info!(
            "Loaded rules from {}: {} stats, {} natures, {} backgrounds, {} talents",
            dir.display(),
            rules.stats.stats.len(),
            rules.natures.len(),
            rules.backgrounds.len(),
            rules.talents.len()
        );
        Ok(rules)
    }

    /// Build a dataset from the JSON text of each table.
    pub fn from_json(
        stats: &str,
        natures: &str,
        backgrounds: &str,
        talents: &str,
    ) -> Result<Self, RulesError> {
        let rules = RulesDataset {
            stats: parse_table(STATS_FILE, stats)?,
            natures: parse_table(NATURES_FILE, natures)?,
            backgrounds: parse_table(BACKGROUNDS_FILE, backgrounds)?,
            talents: parse_table(TALENTS_FILE, talents)?,
        };
        rules.validate()?;
        Ok(rules)
    }

    /// Random selection needs at least one stat, nature and background.
    /// Talents may be empty; unresolved talents fall back to no text.
    pub fn validate(&self) -> Result<(), RulesError> {
        if self.stats.stats.is_empty() {
            return Err(RulesError::EmptyTable("stats"));
        }
        if self.natures.is_empty() {
            return Err(RulesError::EmptyTable("natures"));
        }
        if self.backgrounds.is_empty() {
            return Err(RulesError::EmptyTable("backgrounds"));
        }

        let mut seen = IndexSet::new();
        for stat in &self.stats.stats {
            if !seen.insert(stat.as_str()) {
                return Err(RulesError::DuplicateStat(stat.clone()));
            }
        }
        Ok(())
    }

    pub fn stat_names(&self) -> &[String] {
        &self.stats.stats
    }

    pub fn has_stat(&self, name: &str) -> bool {
        self.stats.stats.iter().any(|s| s == name)
    }

    /// Effect text of a talent, or an empty string when the key is missing
    /// or does not resolve.
    pub fn talent_effect(&self, key: Option<&str>) -> &str {
        key.and_then(|k| self.talents.get(k))
            .map(|t| t.effect.as_str())
            .unwrap_or("")
    }
}

fn read_table<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<T, RulesError> {
    let path = dir.join(file);
    let data = fs::read_to_string(&path).map_err(|source| RulesError::Io {
        path: path.clone(),
        source,
    })?;
    serde_json::from_str(&data).map_err(|source| RulesError::Json { path, source })
}

fn parse_table<T: DeserializeOwned>(label: &str, data: &str) -> Result<T, RulesError> {
    serde_json::from_str(data).map_err(|source| RulesError::Json {
        path: PathBuf::from(label),
        source,
    })
}
