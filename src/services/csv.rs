//! Parsing of the spreadsheet CSV export into [`Word`]s.
//!
//! The sheet has a header row followed by `swedish,english[,...]` rows.
//! Fields may be wrapped in double quotes; inside quotes a comma does not
//! split and `""` is a literal quote. Rows are split on newlines before
//! quote handling, so a quoted field cannot span lines.

use crate::models::Word;

/// Split one CSV row into trimmed fields.
///
/// A quote toggles quoted mode wherever it appears; `""` inside quoted mode
/// produces a single `"`. Surrounding whitespace (including a trailing `\r`
/// from CRLF exports) is trimmed from every field.
pub fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }

    fields.push(current.trim().to_string());
    fields
}

/// Parse a full CSV export into words.
///
/// The first row is always discarded as a header. A row yields a word only
/// when its first two fields are both non-empty; anything else is skipped
/// silently. An input without usable rows gives an empty vector, and it is
/// up to the caller to treat that as an error.
pub fn parse_csv(csv: &str) -> Vec<Word> {
    let mut words = Vec::new();

    for line in csv.trim().split('\n').skip(1) {
        if line.trim().is_empty() {
            continue;
        }

        let mut fields = parse_csv_line(line).into_iter();
        match (fields.next(), fields.next()) {
            (Some(swedish), Some(english)) if !swedish.is_empty() && !english.is_empty() => {
                words.push(Word { swedish, english });
            }
            _ => {
                tracing::trace!("Skipping malformed vocabulary row: {:?}", line);
            }
        }
    }

    tracing::debug!("Parsed {} words from CSV", words.len());
    words
}
