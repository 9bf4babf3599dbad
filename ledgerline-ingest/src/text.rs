//! Small text helpers shared by the line parsers.

/// Collapse every whitespace run to one space and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse a printed money value such as `1,234.56` or `$45.67`.
pub fn parse_amount(text: &str) -> Option<f64> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| *c != ',' && *c != '$')
        .collect();
    if cleaned.is_empty() || !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    if !cleaned.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    cleaned.parse().ok()
}

/// A table amount cell: digits with optional thousands separators and cents.
pub fn is_amount_token(token: &str) -> bool {
    let Some((whole, cents)) = token.split_once('.') else {
        return false;
    };
    cents.len() == 2
        && cents.chars().all(|c| c.is_ascii_digit())
        && !whole.is_empty()
        && whole.chars().any(|c| c.is_ascii_digit())
        && whole.chars().all(|c| c.is_ascii_digit() || c == ',')
        && !whole.starts_with(',')
}

/// Reference and authorization numbers printed on their own line.
pub fn is_numeric_only(line: &str) -> bool {
    let t = line.trim();
    !t.is_empty() && t.chars().all(|c| c.is_ascii_digit())
}

/// Does `line` continue the description of the previous record?
///
/// Heuristic: the previous text must not end in terminal punctuation and
/// the candidate must not end in a number.
pub fn continues_description(previous: &str, line: &str) -> bool {
    let line = line.trim();
    if line.is_empty() {
        return false;
    }
    if previous.trim_end().ends_with(['.', '!', '?', ';']) {
        return false;
    }
    !has_numeric_suffix(line)
}

fn has_numeric_suffix(line: &str) -> bool {
    line.split_whitespace().last().is_some_and(|last| {
        last.chars().any(|c| c.is_ascii_digit())
            && last
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '$' | '-'))
    })
}

/// Number of characters before byte offset `byte` in `line`.
pub(crate) fn char_column(line: &str, byte: usize) -> usize {
    line[..byte].chars().count()
}
