// Schema normalization
//
// A raw row plus a resolved column map gives a NormalizedRow: canonical
// names, trimmed values, typed coercions. Nothing in here fails; values that
// cannot be coerced become absent and are counted.

use std::cell::Cell;
use std::collections::BTreeMap;

use duodata_io::{NumberFormat, RawRow};

use crate::alias::{AliasTable, Coercion, ColumnMap, Resolution};

// ---------------------------------------------------------------------------
// Coercion helpers
// ---------------------------------------------------------------------------

/// Outcome of coercing one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coerced<T> {
    /// Empty cell.
    Absent,
    /// Suppressed for privacy. Never a zero.
    Redacted,
    Value(T),
    /// Present but unparseable.
    Invalid,
}

impl<T> Coerced<T> {
    pub fn ok(self) -> Option<T> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid)
    }
}

pub fn is_redacted(value: &str, marker: &str) -> bool {
    value.trim() == marker
}

/// Integer cell. Thousands separators are stripped; an integral float
/// (`"12,0"`, `"12.0"`) is accepted since workbooks store counts as floats.
pub fn parse_int(value: &str, format: NumberFormat, marker: &str) -> Coerced<i64> {
    let value = value.trim();
    if value.is_empty() {
        return Coerced::Absent;
    }
    if value == marker {
        return Coerced::Redacted;
    }

    let digits = strip_thousands(value, format);
    if let Ok(n) = digits.parse::<i64>() {
        return Coerced::Value(n);
    }
    match parse_float(value, format, marker) {
        Coerced::Value(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Coerced::Value(f as i64),
        _ => Coerced::Invalid,
    }
}

/// Locale float: thousands separator removed, then the decimal separator
/// becomes `.`. Non-finite results are invalid.
pub fn parse_float(value: &str, format: NumberFormat, marker: &str) -> Coerced<f64> {
    let value = value.trim();
    if value.is_empty() {
        return Coerced::Absent;
    }
    if value == marker {
        return Coerced::Redacted;
    }

    let mut text = strip_thousands(value, format);
    if format.decimal != '.' {
        text = text.replace(format.decimal, ".");
    }
    match text.parse::<f64>() {
        Ok(f) if f.is_finite() => Coerced::Value(f),
        _ => Coerced::Invalid,
    }
}

fn strip_thousands(value: &str, format: NumberFormat) -> String {
    match format.thousands {
        Some(sep) => value.chars().filter(|c| *c != sep).collect(),
        None => value.to_string(),
    }
}

/// `"007"` gives 7, `""` and `"*"` give `None`.
pub fn int_or_absent(value: &str) -> Option<i64> {
    parse_int(value, NumberFormat::LOCALE_NL, "*").ok()
}

/// `"12.345,67"` gives 12345.67, `""` gives `None`.
pub fn locale_float(value: &str) -> Option<f64> {
    parse_float(value, NumberFormat::LOCALE_NL, "*").ok()
}

pub fn ternary_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "j" | "ja" | "y" | "yes" | "true" | "1" => Some(true),
        "n" | "nee" | "no" | "false" | "0" => Some(false),
        _ => None,
    }
}

/// Each blank label inherits the nearest non-blank label to its left.
pub fn forward_fill<S: AsRef<str>>(labels: &[S]) -> Vec<String> {
    let mut last = String::new();
    labels
        .iter()
        .map(|label| {
            let label = label.as_ref().trim();
            if !label.is_empty() {
                last = label.to_string();
            }
            last.clone()
        })
        .collect()
}

/// Separator between the levels of a stacked header label.
pub const LEVEL_SEPARATOR: &str = " | ";

/// Collapse a header spread over several rows into one label per column.
/// Each row is forward-filled first. A column whose upper levels are all
/// blank keeps its leaf label alone; otherwise every level is kept, blanks
/// included, joined with [`LEVEL_SEPARATOR`].
pub fn stacked_labels(header_rows: &[Vec<String>]) -> Vec<String> {
    let filled: Vec<Vec<String>> = header_rows.iter().map(|row| forward_fill(row)).collect();
    let width = header_rows.iter().map(Vec::len).max().unwrap_or(0);

    (0..width)
        .map(|column| {
            let levels: Vec<&str> = filled
                .iter()
                .map(|row| row.get(column).map(String::as_str).unwrap_or(""))
                .collect();
            match levels.split_last() {
                Some((leaf, upper)) if upper.iter().all(|l| l.is_empty()) => leaf.to_string(),
                _ => levels.join(LEVEL_SEPARATOR),
            }
        })
        .collect()
}

pub fn label_tokens(label: &str) -> Vec<&str> {
    label.split_whitespace().collect()
}

/// Split `"PERSONEN 2012"` into `("PERSONEN", 2012)`. The last token must be
/// exactly four ASCII digits and something has to precede it.
pub fn split_year_label(label: &str) -> Option<(String, i32)> {
    let tokens = label_tokens(label);
    let (last, measure) = tokens.split_last()?;
    if measure.is_empty() || last.len() != 4 || !last.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = last.parse().ok()?;
    Some((measure.join(" "), year))
}

// ---------------------------------------------------------------------------
// Normalized row
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Absent,
    Text(String),
    Int(i64),
    Float(f64),
    Flag(bool),
    Raw(String),
}

/// One row under canonical names. Resolved fields are looked up by name,
/// unmapped columns are kept in header order for label-driven parsers.
#[derive(Debug)]
pub struct NormalizedRow<'a> {
    fields: BTreeMap<&'static str, FieldValue>,
    columns: Vec<(&'a str, &'a str)>,
    number_format: NumberFormat,
    redaction_marker: &'a str,
    failures: Cell<usize>,
}

impl<'a> NormalizedRow<'a> {
    /// Whether the table had a column for this field at all.
    pub fn has_column(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.fields.get(name)? {
            FieldValue::Text(s) => Some(s),
            FieldValue::Raw(s) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        match self.fields.get(name)? {
            FieldValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn float(&self, name: &str) -> Option<f64> {
        match self.fields.get(name)? {
            FieldValue::Float(f) => Some(*f),
            FieldValue::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        match self.fields.get(name)? {
            FieldValue::Flag(b) => Some(*b),
            _ => None,
        }
    }

    /// Trimmed cell text without any coercion; redaction markers included.
    pub fn raw(&self, name: &str) -> Option<&str> {
        match self.fields.get(name)? {
            FieldValue::Raw(s) | FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn value(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Unmapped columns as (trimmed label, trimmed value), header order.
    pub fn columns(&self) -> impl Iterator<Item = (&'a str, &'a str)> + '_ {
        self.columns.iter().copied()
    }

    /// Coerce a value read from an unmapped column. Failures are counted.
    pub fn int_of(&self, value: &str) -> Option<i64> {
        let coerced = parse_int(value, self.number_format, self.redaction_marker);
        if coerced.is_invalid() {
            self.note_failure();
        }
        coerced.ok()
    }

    pub fn float_of(&self, value: &str) -> Option<f64> {
        let coerced = parse_float(value, self.number_format, self.redaction_marker);
        if coerced.is_invalid() {
            self.note_failure();
        }
        coerced.ok()
    }

    pub fn is_redacted(&self, value: &str) -> bool {
        is_redacted(value, self.redaction_marker)
    }

    pub fn note_failure(&self) {
        self.failures.set(self.failures.get() + 1);
    }

    pub fn failures(&self) -> usize {
        self.failures.get()
    }
}

// ---------------------------------------------------------------------------
// Normalizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    pub rows: usize,
    pub coercion_failures: usize,
    pub conflicted_fields: usize,
}

/// Per-table normalizer. The alias table is resolved against the header once.
pub struct Normalizer<'a> {
    map: ColumnMap,
    number_format: NumberFormat,
    redaction_marker: &'a str,
    stats: NormalizeStats,
}

impl<'a> Normalizer<'a> {
    pub fn new(
        aliases: &AliasTable,
        headers: &[String],
        number_format: NumberFormat,
        redaction_marker: &'a str,
    ) -> Self {
        let map = aliases.resolve(headers);
        let stats = NormalizeStats {
            conflicted_fields: map.conflicts().count(),
            ..NormalizeStats::default()
        };
        Self {
            map,
            number_format,
            redaction_marker,
            stats,
        }
    }

    pub fn column_map(&self) -> &ColumnMap {
        &self.map
    }

    pub fn normalize<'r>(&mut self, raw: &'r RawRow) -> NormalizedRow<'r>
    where
        'a: 'r,
    {
        let values = raw.values();
        let mut row = NormalizedRow {
            fields: BTreeMap::new(),
            columns: Vec::with_capacity(self.map.unmapped().len()),
            number_format: self.number_format,
            redaction_marker: self.redaction_marker,
            failures: Cell::new(0),
        };

        for field in self.map.fields() {
            let column = match field.resolution {
                Resolution::Column(column) => column,
                Resolution::Conflicted => {
                    row.note_failure();
                    continue;
                }
                Resolution::Missing => continue,
            };
            let cell = values.get(column).map(|v| v.trim()).unwrap_or("");
            let value = self.coerce(cell, field.coercion, &row);
            row.fields.insert(field.canonical, value);
        }

        let headers = raw.headers();
        for &column in self.map.unmapped() {
            let label = headers.get(column).map(|h| h.trim()).unwrap_or("");
            let value = values.get(column).map(|v| v.trim()).unwrap_or("");
            row.columns.push((label, value));
        }

        self.stats.rows += 1;
        row
    }

    /// Fold a finished row's failure count (including parser-side coercions)
    /// into the table totals.
    pub fn finish_row(&mut self, row: &NormalizedRow<'_>) {
        self.stats.coercion_failures += row.failures();
    }

    pub fn stats(&self) -> NormalizeStats {
        self.stats
    }

    fn coerce(&self, cell: &str, coercion: Coercion, row: &NormalizedRow<'_>) -> FieldValue {
        let marker = self.redaction_marker;
        let coerced = match coercion {
            Coercion::Raw => return FieldValue::Raw(cell.to_string()),
            Coercion::Text => {
                return if cell.is_empty() || cell == marker {
                    FieldValue::Absent
                } else {
                    FieldValue::Text(cell.to_string())
                };
            }
            Coercion::Flag => {
                if cell.is_empty() || cell == marker {
                    return FieldValue::Absent;
                }
                return match ternary_flag(cell) {
                    Some(b) => FieldValue::Flag(b),
                    None => {
                        row.note_failure();
                        FieldValue::Absent
                    }
                };
            }
            Coercion::Int => match parse_int(cell, self.number_format, marker) {
                Coerced::Value(n) => Coerced::Value(FieldValue::Int(n)),
                Coerced::Absent => Coerced::Absent,
                Coerced::Redacted => Coerced::Redacted,
                Coerced::Invalid => Coerced::Invalid,
            },
            Coercion::Float => match parse_float(cell, self.number_format, marker) {
                Coerced::Value(f) => Coerced::Value(FieldValue::Float(f)),
                Coerced::Absent => Coerced::Absent,
                Coerced::Redacted => Coerced::Redacted,
                Coerced::Invalid => Coerced::Invalid,
            },
        };

        match coerced {
            Coerced::Value(value) => value,
            Coerced::Invalid => {
                log::trace!("unparseable {:?} value {:?}", coercion, cell);
                row.note_failure();
                FieldValue::Absent
            }
            Coerced::Absent | Coerced::Redacted => FieldValue::Absent,
        }
    }
}
