// Decoded tables and rows

use std::sync::Arc;

/// Thousands/decimal separators used to render numbers in a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberFormat {
    pub thousands: Option<char>,
    pub decimal: char,
}

impl NumberFormat {
    /// Dutch locale as used by the published delimited files: `12.345,67`.
    pub const LOCALE_NL: NumberFormat = NumberFormat {
        thousands: Some('.'),
        decimal: ',',
    };

    /// Plain machine format, used for cell text rendered from workbooks: `12345.67`.
    pub const PLAIN: NumberFormat = NumberFormat {
        thousands: None,
        decimal: '.',
    };
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self::LOCALE_NL
    }
}

/// Where a table came from inside one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Delimited,
    Sheet(String),
    ArchiveMember {
        member: String,
        sheet: Option<String>,
    },
}

impl Origin {
    /// Archive member name, if the table was unpacked from a zip.
    pub fn member(&self) -> Option<&str> {
        match self {
            Self::ArchiveMember { member, .. } => Some(member),
            _ => None,
        }
    }
}

/// One data row: an ordered mapping from raw column label to cell text.
///
/// Labels are shared with the owning table; lookups return the first column
/// carrying the label, matching how the files are read by name.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    headers: Arc<[String]>,
    values: Vec<String>,
}

impl RawRow {
    pub fn new(headers: Arc<[String]>, mut values: Vec<String>) -> Self {
        values.resize(headers.len(), String::new());
        Self { headers, values }
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.headers
            .iter()
            .position(|h| h == label)
            .map(|i| self.values[i].as_str())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(String::as_str))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.iter().all(|v| v.trim().is_empty())
    }
}

/// A row stream: one sheet, one delimited file, or one archive member.
#[derive(Debug, Clone)]
pub struct Table {
    pub name: String,
    pub origin: Origin,
    pub headers: Arc<[String]>,
    pub rows: Vec<RawRow>,
    pub number_format: NumberFormat,
}

impl Table {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Per-dataset shape of the file: which sheet, how many preamble rows, and
/// optionally a header to use instead of the file's own.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableLayout<'a> {
    pub sheet: Option<&'a str>,
    pub skip_rows: usize,
    pub headers: Option<&'a [&'a str]>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(labels: &[&str]) -> Arc<[String]> {
        labels.iter().map(|s| s.to_string()).collect::<Vec<_>>().into()
    }

    #[test]
    fn short_rows_are_padded() {
        let row = RawRow::new(headers(&["A", "B", "C"]), vec!["1".into()]);
        assert_eq!(row.len(), 3);
        assert_eq!(row.get("A"), Some("1"));
        assert_eq!(row.get("C"), Some(""));
        assert_eq!(row.get("D"), None);
    }

    #[test]
    fn duplicate_labels_resolve_to_first_column() {
        let row = RawRow::new(headers(&["X", "X"]), vec!["first".into(), "second".into()]);
        assert_eq!(row.get("X"), Some("first"));
        let pairs: Vec<_> = row.iter().collect();
        assert_eq!(pairs, vec![("X", "first"), ("X", "second")]);
    }

    #[test]
    fn whitespace_only_row_is_empty() {
        let row = RawRow::new(headers(&["A", "B"]), vec!["  ".into(), "".into()]);
        assert!(row.is_empty());
    }
}
