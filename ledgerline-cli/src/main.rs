use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use ledgerline_ingest::{KeywordRules, account_info, detect, source_for};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod config;
mod convert;
mod discover;
mod state;

use convert::{ConvertOptions, run_convert};

#[derive(Parser, Debug)]
#[command(name = "ledgerline", version, about = "Bank statement text to a normalized ledger")]
struct Cli {
    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Keyword rules file (default: ~/.ledgerline/rules.toml)
    #[arg(long, global = true)]
    rules: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert statements (PDF, text dumps, or .extracted.csv) to ledger CSV
    Convert {
        /// Files or directories (searched recursively)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output file, or `-` for stdout (default: <statement>.csv)
        #[arg(short, long)]
        output: Option<String>,

        /// Labelled transactions (Description, Amount, Category) used to add a Category column
        #[arg(long)]
        categories: Option<PathBuf>,

        /// Also write <statement>.extracted.csv, .processed.csv and, with --categories, .categorized.csv
        #[arg(long)]
        artifacts: bool,

        /// Overwrite existing CSV files
        #[arg(short = 'y', long)]
        overwrite: bool,

        /// Process without writing files
        #[arg(long)]
        dry_run: bool,

        /// Statement year, for documents that do not print their period
        #[arg(long)]
        year: Option<i32>,
    },

    /// Print the detected statement type of each file
    Detect {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List account numbers, account use and statement type
    Accounts {
        /// Statement file or directory (searched recursively)
        path: PathBuf,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Write the default keyword rules to ~/.ledgerline/rules.toml
    InitRules,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Command::Convert {
            files,
            output,
            categories,
            artifacts,
            overwrite,
            dry_run,
            year,
        } => {
            let rules = config::load_rules(cli.rules.as_deref())?;
            let opts = ConvertOptions {
                inputs: files,
                output,
                categories,
                artifacts,
                overwrite,
                dry_run,
                year,
            };
            let summary = run_convert(&opts, &rules)?;
            if summary.failed > 0 && summary.converted == 0 && summary.skipped == 0 {
                bail!("No statements converted");
            }
        }

        Command::Detect { files } => {
            let rules = config::load_rules(cli.rules.as_deref())?;
            for file in discover::collect_documents(&files, false)? {
                match detect_file(&file, &rules) {
                    Ok(kind) => println!("{}: {kind}", file.display()),
                    Err(e) => println!("❌ {}: {e:#}", file.display()),
                }
            }
        }

        Command::Accounts { path, json } => {
            let rules = config::load_rules(cli.rules.as_deref())?;
            accounts(&path, &rules, json)?;
        }

        Command::InitRules => {
            config::init_rules()?;
        }
    }

    Ok(())
}

fn detect_file(path: &Path, rules: &KeywordRules) -> Result<ledgerline_ingest::StatementKind> {
    let pages = source_for(path)?
        .pages(path)
        .with_context(|| format!("extract {}", path.display()))?;
    Ok(detect(&pages, &rules.detection)?)
}

#[derive(Debug, Serialize)]
struct AccountRow {
    file: String,
    #[serde(flatten)]
    info: ledgerline_ingest::AccountInfo,
}

fn accounts(path: &Path, rules: &KeywordRules, json: bool) -> Result<()> {
    let mut rows = Vec::new();
    for file in discover::collect_documents(&[path.to_path_buf()], false)? {
        let pages = match source_for(&file).and_then(|s| s.pages(&file)) {
            Ok(pages) => pages,
            Err(e) => {
                eprintln!("❌ {}: {e}", file.display());
                continue;
            }
        };
        let info = account_info(&pages, &rules.detection)
            .with_context(|| format!("read accounts from {}", file.display()))?;
        rows.push(AccountRow {
            file: file.display().to_string(),
            info,
        });
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    for row in &rows {
        let kind = row.info.kind.map_or("unknown", |k| k.label());
        println!(
            "{} | {} | {} | {}",
            row.file,
            row.info.account_numbers.join(", "),
            row.info.account_use,
            kind
        );
    }
    Ok(())
}
