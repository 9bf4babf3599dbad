//! Page text sources: `pdftotext -layout` for PDFs, plain files for pre-extracted text.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::error::{IngestError, Result};

/// Produces the text of a document, one string per page.
pub trait TextSource {
    fn pages(&self, path: &Path) -> Result<Vec<String>>;
}

/// Runs poppler's `pdftotext` in layout mode.
#[derive(Debug, Clone)]
pub struct PdfToText {
    program: PathBuf,
}

impl PdfToText {
    /// Find `pdftotext` on `PATH`.
    pub fn locate() -> Result<Self> {
        let program = which::which("pdftotext").map_err(|_| {
            IngestError::TextExtraction(
                "pdftotext not installed (apt install poppler-utils / brew install poppler)".to_string(),
            )
        })?;
        Ok(Self { program })
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl TextSource for PdfToText {
    fn pages(&self, path: &Path) -> Result<Vec<String>> {
        let output = Command::new(&self.program)
            .arg("-layout")
            .arg(path)
            .arg("-")
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(IngestError::TextExtraction(format!(
                "pdftotext failed on {} (exit {}): {}",
                path.display(),
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout);
        let pages = split_pages(&text);
        debug!(path = %path.display(), pages = pages.len(), "extracted pdf text");
        Ok(pages)
    }
}

/// Reads text that was extracted ahead of time. Form feeds separate pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextFile;

impl TextSource for PlainTextFile {
    fn pages(&self, path: &Path) -> Result<Vec<String>> {
        let text = std::fs::read_to_string(path)?;
        Ok(split_pages(&text))
    }
}

/// Split extracted text on form feeds. The trailing feed `pdftotext` writes
/// after the last page does not start a new page.
pub fn split_pages(text: &str) -> Vec<String> {
    let mut pages: Vec<String> = text.split('\u{0c}').map(str::to_string).collect();
    if pages.len() > 1 && pages.last().is_some_and(|p| p.trim().is_empty()) {
        pages.pop();
    }
    pages
}

/// Pick the source for `path` by extension: `.pdf` goes through
/// `pdftotext`, anything else is read as text.
pub fn source_for(path: &Path) -> Result<Box<dyn TextSource>> {
    let is_pdf = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
    if is_pdf {
        Ok(Box::new(PdfToText::locate()?))
    } else {
        Ok(Box::new(PlainTextFile))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_split_pages_on_form_feed() {
        let pages = split_pages("page one\n\u{0c}page two\n\u{0c}");
        assert_eq!(pages, vec!["page one\n".to_string(), "page two\n".to_string()]);
    }

    #[test]
    fn test_single_page_without_feed() {
        assert_eq!(split_pages("only"), vec!["only".to_string()]);
        assert_eq!(split_pages(""), vec![String::new()]);
    }

    #[test]
    fn test_plain_text_file_pages() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "first\u{0c}second").unwrap();
        let pages = PlainTextFile.pages(file.path()).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1], "second");
    }

    #[test]
    fn test_missing_text_file_is_io_error() {
        let err = PlainTextFile.pages(Path::new("/nonexistent/statement.txt")).unwrap_err();
        assert!(matches!(err, IngestError::Io(_)));
    }

    #[test]
    fn test_text_files_do_not_need_pdftotext() {
        assert!(source_for(Path::new("statement.txt")).is_ok());
    }

    #[test]
    fn test_failing_program_reports_extraction_error() {
        let source = PdfToText::with_program("false");
        let err = source.pages(Path::new("statement.pdf")).unwrap_err();
        assert!(matches!(err, IngestError::TextExtraction(_)));
    }
}
