//! Lookup categorizer trained from previously labelled transactions.
//!
//! Training rows are `Description, Amount, Category`. Each row is filed
//! under two keys: the normalized description, and the whole-dollar size of
//! the amount plus the normalized description, so a recurring bill whose
//! cents drift keeps its key. A key that was labelled with more than one
//! category is ambiguous and never answers.

use std::collections::{BTreeSet, HashMap};
use std::io;
use std::path::Path;

use regex::Regex;
use tracing::{debug, info};

use crate::error::{FinanceError, Result};

/// Strips merchant reference IDs so the same payee normalizes to one key.
#[derive(Debug, Clone)]
struct DescriptionNormalizer {
    simple_id: Regex,
    longer_id: Regex,
    non_alpha: Regex,
}

impl DescriptionNormalizer {
    fn new() -> Result<Self> {
        Ok(Self {
            // `*AB12CD34EF`, `- 9X8Y7Z6`
            simple_id: Regex::new(r"[-\*]\s*[0-9]*(?:[A-Z]+[0-9]+){2,}[A-Z0-9]+\b")?,
            // trailing `4AB12C3` or a trailing number
            longer_id: Regex::new(r"\b[0-9]*[A-Z]+[0-9]+[A-Z0-9]+$|\s*[0-9]+$")?,
            non_alpha: Regex::new(r"[^a-z]+")?,
        })
    }

    fn normalize(&self, description: &str) -> String {
        let text = self.simple_id.replace_all(description, "");
        let text = self.longer_id.replace_all(&text, "");
        let lower = text.to_lowercase();
        self.non_alpha.replace_all(&lower, " ").trim().to_string()
    }
}

#[derive(Debug, Clone)]
pub struct Categorizer {
    normalizer: DescriptionNormalizer,
    labels: HashMap<String, BTreeSet<String>>,
}

impl Categorizer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            normalizer: DescriptionNormalizer::new()?,
            labels: HashMap::new(),
        })
    }

    /// Train from a labelled CSV file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let categorizer = Self::from_reader(file)?;
        info!(path = %path.display(), keys = categorizer.labels.len(), "loaded categories");
        Ok(categorizer)
    }

    /// Train from labelled CSV with `Description`, `Amount` and `Category`
    /// columns (any order, other columns ignored). Rows with a blank
    /// category are skipped.
    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let column = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
        let (Some(desc_col), Some(amount_col), Some(cat_col)) =
            (column("Description"), column("Amount"), column("Category"))
        else {
            return Err(FinanceError::UnknownHeaders(
                headers.iter().map(str::to_string).collect(),
            ));
        };

        let mut categorizer = Self::new()?;
        for (i, result) in rdr.records().enumerate() {
            let record = result?;
            let category = record.get(cat_col).unwrap_or("");
            if category.is_empty() {
                continue;
            }
            let raw_amount = record.get(amount_col).unwrap_or("").replace(',', "");
            let amount: f64 = raw_amount.parse().map_err(|_| FinanceError::InvalidRow {
                row: i + 1,
                reason: format!("bad amount `{raw_amount}`"),
            })?;
            categorizer.learn(record.get(desc_col).unwrap_or(""), amount, category);
        }
        Ok(categorizer)
    }

    pub fn normalize_description(&self, description: &str) -> String {
        self.normalizer.normalize(description)
    }

    pub fn learn(&mut self, description: &str, amount: f64, category: &str) {
        let norm = self.normalize_description(description);
        for key in [amount_key(amount, &norm), norm] {
            self.labels
                .entry(key)
                .or_default()
                .insert(category.to_string());
        }
    }

    /// Category for a transaction: the amount-specific key first, then the
    /// description alone.
    pub fn categorize(&self, description: &str, amount: f64) -> Option<&str> {
        let norm = self.normalize_description(description);
        let found = self
            .unambiguous(&amount_key(amount, &norm))
            .or_else(|| self.unambiguous(&norm));
        if found.is_none() {
            debug!(description, amount, "no category");
        }
        found
    }

    fn unambiguous(&self, key: &str) -> Option<&str> {
        match self.labels.get(key) {
            Some(set) if set.len() == 1 => set.iter().next().map(String::as_str),
            _ => None,
        }
    }
}

fn amount_key(amount: f64, norm: &str) -> String {
    format!("{} || {norm}", amount.abs().trunc())
}
