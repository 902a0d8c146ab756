use clap::{Parser, ValueEnum};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use charsheet_core::{generate, CharacterRecord, LockedFields, RulesDataset};

const DEFAULT_RULES_DIR: &str = "rules";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "charsheet", version, about = "Shreds of Insight character generator")]
struct Args {
    /// Directory holding stats.json, natures.json, backgrounds.json and talents.json.
    #[arg(long)]
    rules: Option<PathBuf>,

    #[arg(long)]
    seed: Option<u64>,

    /// Nature key to use instead of a random one.
    #[arg(long)]
    nature: Option<String>,

    /// Background key to use instead of a random one.
    #[arg(long)]
    background: Option<String>,

    /// Fix a stat before the background is applied, e.g. `--lock Might=5`.
    #[arg(long = "lock", value_name = "STAT=VALUE", value_parser = parse_lock)]
    locks: Vec<(String, i32)>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Print the stats, natures and backgrounds the rules offer and exit.
    #[arg(long, default_value_t = false)]
    list: bool,

    /// Store --rules as the default rules directory.
    #[arg(long, default_value_t = false, requires = "rules")]
    remember_rules: bool,

    #[arg(long, default_value_t = false)]
    debug: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CliConfig {
    rules_path: String,
}

fn config_path() -> Option<PathBuf> {
    let mut base = dirs::config_dir().or_else(dirs::data_dir)?;
    base.push("ShredsOfInsight");
    base.push("cli_config.json");
    Some(base)
}

fn load_config() -> CliConfig {
    if let Some(path) = config_path() {
        if let Ok(data) = fs::read_to_string(&path) {
            match serde_json::from_str::<CliConfig>(&data) {
                Ok(cfg) => return cfg,
                Err(e) => log::warn!("Ignoring unreadable config {}: {}", path.display(), e),
            }
        }
    }
    CliConfig::default()
}

fn save_config(cfg: &CliConfig) {
    if let Some(path) = config_path() {
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        if let Ok(data) = serde_json::to_string_pretty(cfg) {
            match fs::write(&path, data) {
                Ok(()) => log::info!("Saved default rules directory to {}", path.display()),
                Err(e) => log::warn!("Failed to save config {}: {}", path.display(), e),
            }
        }
    }
}

fn init_logging(debug: bool) -> Result<(), log::SetLoggerError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                message
            ))
        })
        .level(if debug {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .chain(std::io::stderr())
        .apply()
}

fn parse_lock(s: &str) -> Result<(String, i32), String> {
    let (stat, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected STAT=VALUE, got '{s}'"))?;
    let stat = stat.trim();
    if stat.is_empty() {
        return Err(format!("missing stat name in '{s}'"));
    }
    let value = value
        .trim()
        .parse::<i32>()
        .map_err(|e| format!("invalid value for {stat}: {e}"))?;
    Ok((stat.to_string(), value))
}

fn resolve_rules_path(arg: Option<&PathBuf>, cfg: &CliConfig) -> PathBuf {
    if let Some(path) = arg {
        return path.clone();
    }
    if !cfg.rules_path.is_empty() {
        return PathBuf::from(&cfg.rules_path);
    }
    PathBuf::from(DEFAULT_RULES_DIR)
}

fn locked_fields(args: &Args) -> LockedFields {
    let mut locked = LockedFields {
        nature: args.nature.clone(),
        background: args.background.clone(),
        ..LockedFields::default()
    };
    for (stat, value) in &args.locks {
        locked = locked.with_stat(stat.clone(), *value);
    }
    locked
}

fn render_listing(rules: &RulesDataset) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Stats: {}", rules.stat_names().join(", "));
    let _ = writeln!(out, "Natures:");
    for (key, nature) in &rules.natures {
        let _ = writeln!(out, "  {key:<16} {} (hp {})", nature.name, nature.hp);
    }
    let _ = writeln!(out, "Backgrounds:");
    for (key, background) in &rules.backgrounds {
        let _ = writeln!(out, "  {key:<16} {}", background.name);
    }
    out
}

fn render_text(sheet: &CharacterRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", sheet.background, sheet.nature);
    let _ = writeln!(out, "HP: {}", sheet.hp);
    let _ = writeln!(out, "Shreds of Insight: {}", sheet.shreds);
    let _ = writeln!(out, "Stats:");
    for (stat, value) in &sheet.stats {
        let _ = writeln!(out, "  {stat}: {value}");
    }
    let _ = writeln!(out, "Abilities:");
    for ability in &sheet.abilities {
        if ability.effect.is_empty() {
            let _ = writeln!(out, "  {}", ability.name);
        } else {
            let _ = writeln!(out, "  {}: {}", ability.name, ability.effect);
        }
    }
    let _ = writeln!(out, "Talent: {}", sheet.talent);
    out
}

fn main() {
    let args = Args::parse();

    if let Err(e) = init_logging(args.debug) {
        eprintln!("Failed to initialise logging: {e}");
    }

    let mut cfg = load_config();
    let rules_path = resolve_rules_path(args.rules.as_ref(), &cfg);

    let rules = match RulesDataset::load(&rules_path) {
        Ok(rules) => rules,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    };

    if args.remember_rules {
        cfg.rules_path = rules_path.display().to_string();
        save_config(&cfg);
    }

    if args.list {
        print!("{}", render_listing(&rules));
        return;
    }

    let seed = args.seed.unwrap_or_else(|| rand::thread_rng().gen::<u64>());
    log::info!("Seed {seed}");

    let sheet = match generate(&rules, &locked_fields(&args), Some(seed)) {
        Ok(sheet) => sheet,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    };

    match args.format {
        OutputFormat::Text => print!("{}", render_text(&sheet)),
        OutputFormat::Json => match serde_json::to_string_pretty(&sheet) {
            Ok(json) => println!("{json}"),
            Err(err) => {
                eprintln!("Error: {err}");
                std::process::exit(1);
            }
        },
    }
}
