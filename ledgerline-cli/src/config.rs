use anyhow::{Context, Result};
use ledgerline_ingest::KeywordRules;
use std::fs;
use std::path::{Path, PathBuf};

use crate::state::ensure_ledgerline_home;

pub fn rules_path() -> Result<PathBuf> {
    Ok(ensure_ledgerline_home()?.join("rules.toml"))
}

/// Rules from `--rules <path>` when given, else `~/.ledgerline/rules.toml`,
/// else the built-in defaults.
pub fn load_rules(explicit: Option<&Path>) -> Result<KeywordRules> {
    if let Some(p) = explicit {
        return read_rules(p);
    }
    let p = rules_path()?;
    if !p.exists() {
        return Ok(KeywordRules::default());
    }
    read_rules(&p)
}

pub fn read_rules(path: &Path) -> Result<KeywordRules> {
    let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", path.display()))
}

pub fn save_rules(rules: &KeywordRules, path: &Path) -> Result<()> {
    let s = toml::to_string_pretty(rules).context("serialize rules")?;
    fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn init_rules() -> Result<()> {
    let p = rules_path()?;
    if p.exists() {
        println!("Rules already exist: {}", p.display());
        return Ok(());
    }
    save_rules(&KeywordRules::default(), &p)?;
    println!("Wrote {}", p.display());
    Ok(())
}
