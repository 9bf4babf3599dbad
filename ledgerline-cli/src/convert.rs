use anyhow::{Context, Result, bail};
use ledgerline_finance::batch::{artifact_path, default_output};
use ledgerline_finance::{
    Categorizer, DocumentOutput, process_document, write_canonical, write_raw,
};
use ledgerline_ingest::KeywordRules;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::discover::collect_documents;

#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    pub inputs: Vec<PathBuf>,
    /// Output file, `-` for stdout, or `None` for `<stem>.csv` per document.
    pub output: Option<String>,
    pub categories: Option<PathBuf>,
    pub artifacts: bool,
    pub overwrite: bool,
    pub dry_run: bool,
    pub year: Option<i32>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ConvertSummary {
    pub converted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub warnings: usize,
}

enum Target {
    Stdout,
    File(PathBuf),
    PerDocument,
}

impl Target {
    fn resolve(output: Option<&str>, documents: usize) -> Self {
        match output {
            Some("-") => Target::Stdout,
            Some(p) if documents > 1 && !p.starts_with("/dev/null") => {
                warn!(output = p, "several documents given, writing one output per document");
                Target::PerDocument
            }
            Some(p) => Target::File(PathBuf::from(p)),
            None => Target::PerDocument,
        }
    }

    fn path_for(&self, doc: &Path) -> Option<PathBuf> {
        match self {
            Target::Stdout => None,
            Target::File(p) => Some(p.clone()),
            Target::PerDocument => Some(default_output(doc)),
        }
    }
}

/// Status lines go to stderr while the ledger itself is on stdout.
fn status(to_stderr: bool, line: String) {
    if to_stderr {
        eprintln!("{line}");
    } else {
        println!("{line}");
    }
}

pub fn run_convert(opts: &ConvertOptions, rules: &KeywordRules) -> Result<ConvertSummary> {
    let docs = collect_documents(&opts.inputs, true)?;
    if docs.is_empty() {
        bail!("No statements found in the given paths");
    }

    let target = Target::resolve(opts.output.as_deref(), docs.len());
    let to_stderr = matches!(target, Target::Stdout);
    let categorizer = match &opts.categories {
        Some(p) => Some(
            Categorizer::from_path(p).with_context(|| format!("load categories {}", p.display()))?,
        ),
        None => None,
    };

    let mut summary = ConvertSummary::default();
    let mut header_written = false;

    for doc in &docs {
        let out_path = target.path_for(doc);
        if let Some(p) = &out_path {
            if p.exists() && !opts.overwrite {
                status(to_stderr, format!("☑️ SKIPPED: {}", p.display()));
                summary.skipped += 1;
                continue;
            }
        }

        let output = match process_document(doc, rules, opts.year) {
            Ok(output) => output,
            Err(e) => {
                status(to_stderr, format!("❌ {} - {e}", doc.display()));
                summary.failed += 1;
                continue;
            }
        };

        for w in &output.warnings {
            status(to_stderr, format!("⚠️ {} - {w}", doc.display()));
            summary.warnings += 1;
        }

        let written = match &out_path {
            Some(p) => write_outputs(&output, p, categorizer.as_ref(), opts),
            None => {
                let stdout = io::stdout();
                let result = write_canonical(
                    stdout.lock(),
                    &output.canonical,
                    categorizer.as_ref(),
                    !header_written,
                )
                .context("write stdout");
                header_written = true;
                result
            }
        };
        if let Err(e) = written {
            status(to_stderr, format!("❌ {} - {e:#}", doc.display()));
            summary.failed += 1;
            continue;
        }

        let shown = out_path.as_deref().unwrap_or(doc);
        status(to_stderr, format!("✅ {}", shown.display()));
        summary.converted += 1;
    }

    info!(
        converted = summary.converted,
        skipped = summary.skipped,
        failed = summary.failed,
        "convert finished"
    );
    Ok(summary)
}

fn write_outputs(
    output: &DocumentOutput,
    path: &Path,
    categorizer: Option<&Categorizer>,
    opts: &ConvertOptions,
) -> Result<()> {
    if opts.dry_run {
        return Ok(());
    }

    if opts.artifacts {
        if let Some(raw) = &output.raw {
            let p = artifact_path(path, "extracted");
            let file = File::create(&p).with_context(|| format!("create {}", p.display()))?;
            write_raw(file, output.kind, raw, true).with_context(|| format!("write {}", p.display()))?;
        }
        let p = artifact_path(path, "processed");
        let file = File::create(&p).with_context(|| format!("create {}", p.display()))?;
        write_canonical(file, &output.canonical, None, true)
            .with_context(|| format!("write {}", p.display()))?;
        if categorizer.is_some() {
            let p = artifact_path(path, "categorized");
            let file = File::create(&p).with_context(|| format!("create {}", p.display()))?;
            write_canonical(file, &output.canonical, categorizer, true)
                .with_context(|| format!("write {}", p.display()))?;
        }
    }

    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    write_canonical(file, &output.canonical, categorizer, true)
        .with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
