// Alias tables
//
// Each dataset declares its canonical fields once, with every header spelling
// seen across publication years. A table's header is resolved against the
// alias table a single time; rows are then read by column index.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    Text,
    Int,
    Float,
    Flag,
    /// Trimmed text, no redaction handling.
    Raw,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldAlias {
    pub canonical: &'static str,
    pub variants: &'static [&'static str],
    pub coercion: Coercion,
}

pub const fn text(canonical: &'static str, variants: &'static [&'static str]) -> FieldAlias {
    FieldAlias {
        canonical,
        variants,
        coercion: Coercion::Text,
    }
}

pub const fn int(canonical: &'static str, variants: &'static [&'static str]) -> FieldAlias {
    FieldAlias {
        canonical,
        variants,
        coercion: Coercion::Int,
    }
}

pub const fn float(canonical: &'static str, variants: &'static [&'static str]) -> FieldAlias {
    FieldAlias {
        canonical,
        variants,
        coercion: Coercion::Float,
    }
}

pub const fn flag(canonical: &'static str, variants: &'static [&'static str]) -> FieldAlias {
    FieldAlias {
        canonical,
        variants,
        coercion: Coercion::Flag,
    }
}

pub const fn raw(canonical: &'static str, variants: &'static [&'static str]) -> FieldAlias {
    FieldAlias {
        canonical,
        variants,
        coercion: Coercion::Raw,
    }
}

/// Canonical fields of one dataset, built from shared groups (key columns,
/// address columns) plus the dataset's own.
#[derive(Debug, Clone, Copy)]
pub struct AliasTable {
    groups: &'static [&'static [FieldAlias]],
}

impl AliasTable {
    pub const fn new(groups: &'static [&'static [FieldAlias]]) -> Self {
        Self { groups }
    }

    pub fn fields(&self) -> impl Iterator<Item = &'static FieldAlias> {
        self.groups.iter().flat_map(|group| group.iter())
    }

    /// Resolve against a header. Among columns matching variants of the same
    /// field the longest matched variant wins; equal lengths are a conflict.
    pub fn resolve(&self, headers: &[String]) -> ColumnMap {
        let labels: Vec<String> = headers.iter().map(|h| clean_label(h)).collect();
        let mut matched = vec![false; labels.len()];
        let mut fields = Vec::new();

        for field in self.fields() {
            let variants: Vec<String> = field.variants.iter().map(|v| clean_label(v)).collect();

            let mut best: Option<(usize, usize)> = None;
            let mut tied_with = None;
            for (column, label) in labels.iter().enumerate() {
                if label.is_empty() || !variants.contains(label) {
                    continue;
                }
                matched[column] = true;

                let len = label.chars().count();
                match best {
                    Some((best_len, _)) if len < best_len => {}
                    Some((best_len, _)) if len == best_len => tied_with = Some(column),
                    _ => {
                        best = Some((len, column));
                        tied_with = None;
                    }
                }
            }

            let resolution = match (best, tied_with) {
                (None, _) => Resolution::Missing,
                (Some((_, column)), Some(other)) => {
                    log::warn!(
                        "columns {} and {} both match field '{}'; treating it as absent",
                        column,
                        other,
                        field.canonical
                    );
                    Resolution::Conflicted
                }
                (Some((_, column)), None) => Resolution::Column(column),
            };

            fields.push(ResolvedField {
                canonical: field.canonical,
                coercion: field.coercion,
                resolution,
            });
        }

        let unmapped = (0..labels.len())
            .filter(|&column| !matched[column] && !labels[column].is_empty())
            .collect();

        ColumnMap { fields, unmapped }
    }
}

/// Case-folded, trimmed, newline-free label used for matching.
pub fn clean_label(label: &str) -> String {
    label
        .chars()
        .filter(|c| *c != '\n' && *c != '\r')
        .collect::<String>()
        .trim()
        .to_uppercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Column(usize),
    Missing,
    Conflicted,
}

#[derive(Debug, Clone, Copy)]
pub struct ResolvedField {
    pub canonical: &'static str,
    pub coercion: Coercion,
    pub resolution: Resolution,
}

/// Result of resolving an alias table against one header.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    fields: Vec<ResolvedField>,
    unmapped: Vec<usize>,
}

impl ColumnMap {
    pub fn fields(&self) -> &[ResolvedField] {
        &self.fields
    }

    pub fn column(&self, canonical: &str) -> Option<usize> {
        self.fields
            .iter()
            .find(|f| f.canonical == canonical)
            .and_then(|f| match f.resolution {
                Resolution::Column(column) => Some(column),
                _ => None,
            })
    }

    /// Column indexes not claimed by any alias, header order.
    pub fn unmapped(&self) -> &[usize] {
        &self.unmapped
    }

    pub fn conflicts(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields
            .iter()
            .filter(|f| f.resolution == Resolution::Conflicted)
            .map(|f| f.canonical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[FieldAlias] = &[
        text("brin", &["BRIN NUMMER", "BRINNUMMER", "BRIN"]),
        raw("branch_id", &["VESTIGINGSNUMMER", "VESTIGINSNUMMER"]),
    ];
    const COUNTS: &[FieldAlias] = &[int("students", &["AANTAL LEERLINGEN"])];
    const TABLE: AliasTable = AliasTable::new(&[KEY, COUNTS]);

    fn headers(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn resolves_variants_and_leaves_rest_unmapped() {
        let map = TABLE.resolve(&headers(&[
            "brinnummer",
            "VESTIGINSNUMMER ",
            "AANTAL\nLEERLINGEN",
            "PERSONEN 2012",
            "",
        ]));
        assert_eq!(map.column("brin"), Some(0));
        assert_eq!(map.column("branch_id"), Some(1));
        // Newline dropped, not replaced, so this does not match "AANTAL LEERLINGEN"
        assert_eq!(map.column("students"), None);
        assert_eq!(map.unmapped(), &[2, 3]);
    }

    #[test]
    fn longest_variant_wins() {
        let map = TABLE.resolve(&headers(&["BRIN", "BRIN NUMMER", "NAAM"]));
        assert_eq!(map.column("brin"), Some(1));
        assert_eq!(map.conflicts().count(), 0);
        // The losing alias column is not handed on as a raw column
        assert_eq!(map.unmapped(), &[2]);
    }

    #[test]
    fn equal_length_matches_conflict() {
        let map = TABLE.resolve(&headers(&["VESTIGINGSNUMMER", "VESTIGINGSNUMMER"]));
        assert_eq!(map.column("branch_id"), None);
        assert_eq!(map.conflicts().collect::<Vec<_>>(), vec!["branch_id"]);
    }

    #[test]
    fn missing_field_is_not_a_conflict() {
        let map = TABLE.resolve(&headers(&["NAAM"]));
        assert!(map
            .fields()
            .iter()
            .all(|f| f.resolution == Resolution::Missing));
    }
}
