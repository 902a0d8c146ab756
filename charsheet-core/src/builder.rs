use indexmap::IndexMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dice::DiceExpr;
use crate::roller::Roller;
use crate::rules::{Ability, RulesDataset};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GenerateError {
    #[error("unknown nature '{0}'")]
    UnknownNature(String),
    #[error("unknown background '{0}'")]
    UnknownBackground(String),
    #[error("unknown stat '{0}'")]
    UnknownStat(String),
    #[error("no {0} to choose from")]
    EmptyTable(&'static str),
}

/// Fields the caller wants fixed instead of rolled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedFields {
    #[serde(default)]
    pub stats: IndexMap<String, i32>,
    #[serde(default)]
    pub nature: Option<String>,
    #[serde(default)]
    pub background: Option<String>,
}

impl LockedFields {
    pub fn with_stat(mut self, stat: impl Into<String>, value: i32) -> Self {
        self.stats.insert(stat.into(), value);
        self
    }

    pub fn with_nature(mut self, key: impl Into<String>) -> Self {
        self.nature = Some(key.into());
        self
    }

    pub fn with_background(mut self, key: impl Into<String>) -> Self {
        self.background = Some(key.into());
        self
    }

    fn nature_key(&self) -> Option<&str> {
        self.nature.as_deref().filter(|k| !k.is_empty())
    }

    fn background_key(&self) -> Option<&str> {
        self.background.as_deref().filter(|k| !k.is_empty())
    }
}

/// A finished character sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterRecord {
    pub nature: String,
    pub background: String,
    pub hp: u32,
    pub stats: IndexMap<String, i32>,
    pub shreds: u32,
    pub abilities: Vec<Ability>,
    pub talent: String,
}

/// Roll a character against `rules`, keeping whatever `locked` fixes.
///
/// Stats are rolled before the background is applied because its modifiers
/// are added on top of them. Locked keys that the rules do not know are
/// rejected up front rather than rolled around.
pub fn generate_character<R: Rng>(
    rules: &RulesDataset,
    locked: &LockedFields,
    roller: &mut Roller<R>,
) -> Result<CharacterRecord, GenerateError> {
    if let Some(stat) = locked.stats.keys().find(|s| !rules.has_stat(s)) {
        return Err(GenerateError::UnknownStat(stat.clone()));
    }

    let mut stats = IndexMap::with_capacity(rules.stat_names().len());
    for stat in rules.stat_names() {
        let value = match locked.stats.get(stat) {
            Some(&value) => {
                log::debug!("stat {stat} locked at {value}");
                value
            }
            None => {
                let value = roller.roll_stat();
                log::debug!("stat {stat} rolled {value}");
                value
            }
        };
        stats.insert(stat.clone(), value);
    }

    let nature_key = match locked.nature_key() {
        Some(key) => key,
        None => roller
            .pick_key(&rules.natures)
            .map(String::as_str)
            .ok_or(GenerateError::EmptyTable("natures"))?,
    };
    let nature = rules
        .natures
        .get(nature_key)
        .ok_or_else(|| GenerateError::UnknownNature(nature_key.to_string()))?;

    let background_key = match locked.background_key() {
        Some(key) => key,
        None => roller
            .pick_key(&rules.backgrounds)
            .map(String::as_str)
            .ok_or(GenerateError::EmptyTable("backgrounds"))?,
    };
    let background = rules
        .backgrounds
        .get(background_key)
        .ok_or_else(|| GenerateError::UnknownBackground(background_key.to_string()))?;

    log::debug!("nature {nature_key}, background {background_key}");

    for (stat, delta) in &background.stat_mods {
        match stats.get_mut(stat) {
            Some(value) => *value = value.saturating_add(*delta),
            None => log::warn!(
                "background {background_key} modifies unknown stat {stat}, skipping"
            ),
        }
    }

    let hp_bonus = DiceExpr::parse(background.hp_bonus.as_deref()).roll(roller);
    let hp = nature.hp.saturating_add(hp_bonus);

    let shreds = DiceExpr::parse(background.shreds.as_deref()).roll(roller);

    let talent = rules.talent_effect(background.talent.as_deref());
    if talent.is_empty() {
        log::debug!("background {background_key} grants no resolvable talent");
    }

    Ok(CharacterRecord {
        nature: nature.name.clone(),
        background: background.name.clone(),
        hp,
        stats,
        shreds,
        abilities: nature.abilities.clone(),
        talent: talent.to_string(),
    })
}
