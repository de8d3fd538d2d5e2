use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Board,
    School,
    Branch,
    Collaboration,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Board => "board",
            Self::School => "school",
            Self::Branch => "branch",
            Self::Collaboration => "collaboration",
        }
    }
}

/// Stable identity of one entity within a dataset pass. Compared structurally;
/// the derived ordering is what makes merge output order deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum EntityKey {
    Board { board_id: i64 },
    School { brin: String },
    Branch { brin: String, branch_id: i64 },
    Collaboration { collaboration_id: String },
}

impl EntityKey {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Board { .. } => EntityKind::Board,
            Self::School { .. } => EntityKind::School,
            Self::Branch { .. } => EntityKind::Branch,
            Self::Collaboration { .. } => EntityKind::Collaboration,
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Board { board_id } => write!(f, "{board_id}"),
            Self::School { brin } => write!(f, "{brin}"),
            Self::Branch { brin, branch_id } => write!(f, "{brin}-{branch_id}"),
            Self::Collaboration { collaboration_id } => write!(f, "{collaboration_id}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Parser output
// ---------------------------------------------------------------------------

/// A named value to attach to an entity.
#[derive(Debug, Clone, PartialEq)]
pub enum PartialField {
    /// Scalar replacement, last write wins.
    Set(&'static str, Value),
    /// One element of a list attribute, kept in emission order.
    Append(&'static str, Value),
}

impl PartialField {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Set(name, _) | Self::Append(name, _) => name,
        }
    }
}

/// One (key, field) pair produced by a row parser.
#[derive(Debug, Clone, PartialEq)]
pub struct Emission {
    pub key: EntityKey,
    /// Overrides the pass year (workbooks carrying several years side by side).
    pub year: Option<i32>,
    pub field: PartialField,
}

impl Emission {
    pub fn set(key: EntityKey, name: &'static str, value: Value) -> Self {
        Self {
            key,
            year: None,
            field: PartialField::Set(name, value),
        }
    }

    pub fn append(key: EntityKey, name: &'static str, value: Value) -> Self {
        Self {
            key,
            year: None,
            field: PartialField::Append(name, value),
        }
    }

    pub fn in_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }
}

// ---------------------------------------------------------------------------
// Merged output
// ---------------------------------------------------------------------------

/// Publication date of the source file a pass reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReferenceDate(pub NaiveDate);

impl ReferenceDate {
    pub fn year(self) -> i32 {
        self.0.year()
    }

    /// ISO form, `YYYY-MM-DD`.
    pub fn iso(self) -> String {
        self.0.format("%Y-%m-%d").to_string()
    }
}

/// Where a field group came from. Never merged into the payload itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provenance {
    pub locator: String,
    pub reference_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedRecord {
    pub entity: EntityKind,
    pub key: EntityKey,
    pub reference_year: i32,
    pub reference_date: String,
    pub dataset: &'static str,
    pub fields: Map<String, Value>,
    /// Keyed by field group (the dataset id).
    pub provenance: BTreeMap<&'static str, Provenance>,
}

impl MergedRecord {
    /// One event per merged field, in field order.
    pub fn events(&self) -> Vec<RecordEvent<'_>> {
        let provenance = self.provenance.get(self.dataset);
        self.fields
            .iter()
            .map(|(field, payload)| RecordEvent {
                entity: self.entity,
                key: &self.key,
                reference_year: self.reference_year,
                reference_date: &self.reference_date,
                field,
                provenance,
                payload,
            })
            .collect()
    }
}

/// Flattened view of one merged field, as handed to export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordEvent<'a> {
    pub entity: EntityKind,
    pub key: &'a EntityKey,
    pub reference_year: i32,
    pub reference_date: &'a str,
    pub field: &'a str,
    pub provenance: Option<&'a Provenance>,
    pub payload: &'a Value,
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PassStats {
    pub tables: usize,
    pub rows: usize,
    /// Rows that produced no emission (unresolvable key or summary line).
    pub rows_skipped: usize,
    pub emissions: usize,
    pub coercion_failures: usize,
    pub records: usize,
}
