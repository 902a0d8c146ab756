use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub mod builder;
pub mod dice;
pub mod roller;
pub mod rules;

pub use builder::{generate_character, CharacterRecord, GenerateError, LockedFields};
pub use dice::DiceExpr;
pub use roller::Roller;
pub use rules::{Ability, Background, Nature, RulesDataset, RulesError, Talent};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratorSettings {
    pub rules_path: PathBuf,
    /// Fixed seed for a reproducible sheet; `None` draws from OS entropy.
    pub seed: Option<u64>,
    pub locked: LockedFields,
}

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("rules error: {0}")]
    Rules(#[from] RulesError),
    #[error("generation error: {0}")]
    Generate(#[from] GenerateError),
}

pub type Result<T> = std::result::Result<T, SheetError>;

/// Load the rules named by `settings` and roll one character.
pub fn run(settings: &GeneratorSettings) -> Result<CharacterRecord> {
    let rules = RulesDataset::load(&settings.rules_path)?;
    generate(&rules, &settings.locked, settings.seed)
}

/// Roll one character against already loaded rules. A `None` seed draws
/// from OS entropy.
pub fn generate(
    rules: &RulesDataset,
    locked: &LockedFields,
    seed: Option<u64>,
) -> Result<CharacterRecord> {
    let record = match seed {
        Some(seed) => {
            log::debug!("Generating with seed {seed}");
            generate_character(rules, locked, &mut Roller::from_seed(seed))?
        }
        None => generate_character(rules, locked, &mut Roller::from_entropy())?,
    };

    log::info!(
        "Generated {} {} (hp {}, shreds {})",
        record.background,
        record.nature,
        record.hp,
        record.shreds
    );
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_rules(dir: &std::path::Path) {
        fs::write(dir.join(rules::STATS_FILE), r#"{"stats": ["Might", "Grace"]}"#).unwrap();
        fs::write(
            dir.join(rules::NATURES_FILE),
            r#"{"stoic": {"name": "Stoic", "hp": 10, "abilities": ["Iron Will"]}}"#,
        )
        .unwrap();
        fs::write(
            dir.join(rules::BACKGROUNDS_FILE),
            r#"{"wanderer": {"name": "Wanderer", "statMods": {"Might": "2"}, "hpBonus": "1d6", "shreds": "1d4", "talent": "keen"}}"#,
        )
        .unwrap();
        fs::write(dir.join(rules::TALENTS_FILE), r#"{"keen": {"effect": "+1 perception"}}"#).unwrap();
    }

    #[test]
    fn run_loads_and_generates() {
        let dir = tempfile::tempdir().unwrap();
        write_rules(dir.path());

        let settings = GeneratorSettings {
            rules_path: dir.path().to_path_buf(),
            seed: Some(31),
            locked: LockedFields::default().with_stat("Grace", -2),
        };
        let first = run(&settings).unwrap();
        let second = run(&settings).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.stats["Grace"], -2);
        assert_eq!(first.background, "Wanderer");
        assert_eq!(first.talent, "+1 perception");
    }

    #[test]
    fn shipped_rules_generate() {
        let settings = GeneratorSettings {
            rules_path: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../rules"),
            seed: Some(5),
            locked: LockedFields::default(),
        };
        let sheet = run(&settings).unwrap();
        assert_eq!(sheet.stats.len(), 5);
    }

    #[test]
    fn run_reports_missing_rules() {
        let dir = tempfile::tempdir().unwrap();
        let settings = GeneratorSettings {
            rules_path: dir.path().join("nowhere"),
            ..GeneratorSettings::default()
        };
        let err = run(&settings).unwrap_err();
        assert!(matches!(err, SheetError::Rules(RulesError::Io { .. })));
    }

    #[test]
    fn generate_with_seed_is_reproducible() {
        let dir = tempfile::tempdir().unwrap();
        write_rules(dir.path());
        let rules = RulesDataset::load(dir.path()).unwrap();

        let locked = LockedFields::default().with_stat("Might", 1);
        let first = generate(&rules, &locked, Some(88)).unwrap();
        let second = generate(&rules, &locked, Some(88)).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.stats["Might"], 3);
    }

    #[test]
    fn generation_errors_are_wrapped() {
        let dir = tempfile::tempdir().unwrap();
        write_rules(dir.path());
        let rules = RulesDataset::load(dir.path()).unwrap();

        let locked = LockedFields::default().with_nature("brave");
        let err = generate(&rules, &locked, None).unwrap_err();
        assert!(matches!(err, SheetError::Generate(GenerateError::UnknownNature(_))));
        assert_eq!(err.to_string(), "generation error: unknown nature 'brave'");
    }
}
