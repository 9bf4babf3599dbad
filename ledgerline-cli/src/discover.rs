use anyhow::{Context, Result};
use ledgerline_finance::batch::{artifact_path, default_output, is_extracted_csv};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

fn is_statement(path: &Path) -> bool {
    has_extension(path, "pdf") || has_extension(path, "txt")
}

/// Expand the command-line inputs into documents to process.
///
/// Files are taken as given. Directories are searched recursively for
/// statements (`*.pdf`, `*.txt`) and, when `include_extracted` is set, for
/// `*.extracted.csv` files; a statement whose extracted CSV sits next to it
/// is then skipped in favour of the CSV.
pub fn collect_documents(inputs: &[PathBuf], include_extracted: bool) -> Result<Vec<PathBuf>> {
    let mut docs = Vec::new();
    for input in inputs {
        if input.is_dir() {
            walk(input, include_extracted, &mut docs)?;
        } else {
            docs.push(input.clone());
        }
    }
    Ok(docs)
}

fn walk(dir: &Path, include_extracted: bool, docs: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("read {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()
        .with_context(|| format!("read {}", dir.display()))?;
    entries.sort();

    for path in entries {
        if path.is_dir() {
            walk(&path, include_extracted, docs)?;
        } else if is_extracted_csv(&path) {
            if include_extracted {
                docs.push(path);
            }
        } else if is_statement(&path) {
            let extracted = artifact_path(&default_output(&path), "extracted");
            if include_extracted && extracted.exists() {
                debug!(path = %path.display(), "extracted csv present, skipping statement");
                continue;
            }
            docs.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_directory_walk() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("2023/visa-nov.pdf"));
        touch(&root.join("2023/chq-sep.pdf"));
        touch(&root.join("2023/chq-sep.extracted.csv"));
        touch(&root.join("2023/chq-sep.csv"));
        touch(&root.join("notes.md"));
        touch(&root.join("sav-oct.TXT"));

        let docs = collect_documents(&[root.to_path_buf()], true).unwrap();
        let names: Vec<String> = docs
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().display().to_string())
            .collect();
        assert_eq!(
            names,
            vec!["2023/chq-sep.extracted.csv", "2023/visa-nov.pdf", "sav-oct.TXT"]
        );
    }

    #[test]
    fn test_statements_only() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("chq-sep.pdf"));
        touch(&root.join("chq-sep.extracted.csv"));

        let docs = collect_documents(&[root.to_path_buf()], false).unwrap();
        assert_eq!(docs, vec![root.join("chq-sep.pdf")]);
    }

    #[test]
    fn test_explicit_files_kept() {
        let docs = collect_documents(&[PathBuf::from("missing.pdf")], true).unwrap();
        assert_eq!(docs, vec![PathBuf::from("missing.pdf")]);
    }
}
