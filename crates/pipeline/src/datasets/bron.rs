// Students as registered in BRON, the enrolment register. Three workbook
// sheets with group headers spread over two or three rows; each column's
// label arrives as its levels joined by the stacked-header separator.

use serde_json::{Map, Value};

use super::{branch_key, SheetHeader, BRANCH, BRIN};
use crate::alias::{self, clean_label, FieldAlias};
use crate::model::Emission;
use crate::normalize::{label_tokens, NormalizedRow, LEVEL_SEPARATOR};

pub(super) const SHEETS: &[SheetHeader] = &[
    SheetHeader {
        sheet: "Leerlingen (v)so",
        rows: 3,
    },
    SheetHeader {
        sheet: "Leerlingen bao",
        rows: 2,
    },
    SheetHeader {
        sheet: "Leerlingen sbao",
        rows: 2,
    },
];

pub(super) const KEY: &[FieldAlias] = &[alias::text("brin", BRIN), alias::raw("branch_id", BRANCH)];

const TRANSLATE: &[(&str, &str)] = &[
    ("Aantal bekostigd", "financed"),
    ("Aantal niet-bekostigd", "non-financed"),
    ("Actief op 1-10-13", "total"),
    ("Ambulante begeleiding", "ambulatory_guidance"),
    ("Bekostigd op 1-10-13", "financed"),
    ("Inschrijvingen actief op 1-10-13", "total"),
    ("Leerlingen teruggeplaatst tussen 1-10-2012 en 1-10-2013", "reintroduced"),
    ("Niet-bekostigd op 1-10-13", "non-financed"),
    ("Totaal aantal", "total"),
    ("Waarvan bekostigde inschrijvingen op 1-10-13", "financed"),
    ("Waarvan niet-bekostigde inschrijvingen op 1-10-13", "non-financed"),
    ("Inschrijvingen SO/VSO", "enrollments"),
    ("AANTAL LEERLINGEN TOTAAL", "total"),
    ("BEGELEID BO/SBO", "guided_bo_bso"),
    ("BEGELEID VO", "guided_vo"),
    ("CUMI", "cumi"),
    ("NOAT", "noat"),
    ("SOORT PRIMAIR ONDERWIJS", "po_type"),
    ("TERUGGEPLAATST BO/SBO", "reintroduced_bo_sbo"),
    ("TERUGGEPLAATST VO", "reintroduced_vo"),
    ("VESTIGING ACTIEF OP PEILDATUM", "branch_active"),
];

fn translate(label: &str) -> Option<&'static str> {
    let label = clean_label(label);
    TRANSLATE
        .iter()
        .find(|(source, _)| clean_label(source) == label)
        .map(|(_, key)| *key)
}

fn key_of(label: &str) -> String {
    translate(label).map_or_else(|| label.to_string(), str::to_string)
}

/// Leaves outside the translation table are age or weight brackets:
/// `"JONGER DAN 4 JAAR"`, `"12 JAAR EN OUDER"`, `"4 TOT 6 JAAR"`,
/// `"GEWICHT 0.3"`.
fn bracket(leaf: &str, students: Value) -> Option<(&'static str, Value)> {
    let leaf = clean_label(leaf);
    let ks = label_tokens(&leaf);
    let mut entry = Map::new();

    if ks.contains(&"JAAR") {
        let range = if ks[0] == "JONGER" && ks.len() >= 2 {
            format!("<{}", ks[ks.len() - 2])
        } else if ks.last() == Some(&"OUDER") {
            format!(">{}", ks[0])
        } else if ks.len() >= 3 {
            format!("{}-{}", ks[0], ks[2])
        } else {
            return None;
        };
        entry.insert("age_range".into(), range.into());
        entry.insert("students".into(), students);
        return Some(("by_age", Value::Object(entry)));
    }

    if ks.first() == Some(&"GEWICHT") {
        let weight: f64 = ks.get(1)?.replace(',', ".").parse().ok()?;
        entry.insert("weight".into(), weight.into());
        entry.insert("students".into(), students);
        return Some(("by_weight", Value::Object(entry)));
    }

    None
}

/// Cell text as a number when it is one.
fn cell(value: &str) -> Value {
    if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(n) = value.parse::<i64>() {
            return n.into();
        }
    }
    value.into()
}

/// Value of a leaf kept as published. Empty and redacted cells are absent.
fn leaf_value(row: &NormalizedRow<'_>, key: &str, value: &str) -> Value {
    if value.is_empty() || row.is_redacted(value) {
        return Value::Null;
    }
    match key {
        "branch_active" => Value::Bool(value.eq_ignore_ascii_case("ja")),
        "po_type" => value.into(),
        _ => cell(value),
    }
}

/// Run `f` on the object found by walking `path` from `map`, creating
/// objects along the way.
fn within(map: &mut Map<String, Value>, path: &[String], f: impl FnOnce(&mut Map<String, Value>)) {
    let Some((group, rest)) = path.split_first() else {
        f(map);
        return;
    };
    let slot = map
        .entry(group.clone())
        .or_insert_with(|| Value::Object(Map::new()));
    if let Value::Object(inner) = slot {
        within(inner, rest, f);
    }
}

/// One nested snapshot per row. With every group level labelled the leaf is
/// a count (or a bracket entry); under partly labelled groups it is kept as
/// published.
pub(super) fn parse_students_in_bron(row: &NormalizedRow<'_>, out: &mut Vec<Emission>) {
    let Some(key) = branch_key(row) else {
        return;
    };

    let mut snapshot = Map::new();
    for (label, value) in row.columns() {
        let levels: Vec<&str> = label.split(LEVEL_SEPARATOR).map(str::trim).collect();
        let Some((leaf, groups)) = levels.split_last() else {
            continue;
        };
        let named: Vec<String> = groups
            .iter()
            .filter(|g| !g.is_empty())
            .map(|g| key_of(g))
            .collect();

        if !groups.is_empty() && named.len() == groups.len() {
            let count = || row.int_of(value).map_or(Value::Null, Value::from);
            if let Some(leaf_key) = translate(leaf) {
                let value = match leaf_key {
                    "branch_active" => leaf_value(row, leaf_key, value),
                    _ => count(),
                };
                within(&mut snapshot, &named, |target| {
                    target.insert(leaf_key.into(), value);
                });
            } else if let Some((list, entry)) = bracket(leaf, count()) {
                within(&mut snapshot, &named, |target| {
                    let slot = target
                        .entry(list)
                        .or_insert_with(|| Value::Array(Vec::new()));
                    if let Value::Array(entries) = slot {
                        entries.push(entry);
                    }
                });
            } else {
                log::debug!("unrecognized BRON column '{}'", label);
            }
        } else {
            let leaf_key = key_of(leaf);
            let value = leaf_value(row, &leaf_key, value);
            let group: Vec<String> = named.into_iter().take(1).collect();
            within(&mut snapshot, &group, |target| {
                target.insert(leaf_key, value);
            });
        }
    }

    out.push(Emission::append(key, "students_in_bron", Value::Object(snapshot)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::AliasTable;
    use crate::datasets::test_support::{appended, run};
    use crate::model::EntityKey;
    use serde_json::json;

    const ALIASES: AliasTable = AliasTable::new(&[KEY]);

    #[test]
    fn two_level_sheet() {
        let out = run(
            &ALIASES,
            parse_students_in_bron,
            &[
                ("BRIN NUMMER", "AB12"),
                ("VESTIGINGSNUMMER", "1"),
                ("VESTIGING ACTIEF OP PEILDATUM", "ja"),
                ("SOORT PRIMAIR ONDERWIJS", "BAO"),
                ("Inschrijvingen actief op 1-10-13 | Totaal aantal", "210"),
                ("Inschrijvingen actief op 1-10-13 | 4 TOT 6 JAAR", "50"),
                ("Inschrijvingen actief op 1-10-13 | JONGER DAN 4 JAAR", "3"),
                ("Inschrijvingen actief op 1-10-13 | 12 JAAR EN OUDER", "1"),
                ("Inschrijvingen actief op 1-10-13 | GEWICHT 0.3", "20"),
            ],
        );
        assert_eq!(out[0].key, EntityKey::Branch { brin: "AB12".into(), branch_id: 1 });
        assert_eq!(
            appended(&out, "students_in_bron"),
            vec![&json!({
                "branch_active": true,
                "po_type": "BAO",
                "total": {
                    "total": 210,
                    "by_age": [
                        {"age_range": "4-6", "students": 50},
                        {"age_range": "<4", "students": 3},
                        {"age_range": ">12", "students": 1}
                    ],
                    "by_weight": [{"weight": 0.3, "students": 20}]
                }
            })]
        );
    }

    #[test]
    fn three_level_sheet() {
        let out = run(
            &ALIASES,
            parse_students_in_bron,
            &[
                ("BRIN NUMMER", "AB12"),
                ("VESTIGINGSNUMMER", "3"),
                ("Inschrijvingen SO/VSO | Cluster 2 | Bekostigd op 1-10-13", "12"),
                ("Inschrijvingen SO/VSO | Cluster 2 | Niet-bekostigd op 1-10-13", "0"),
                ("Ambulante begeleiding |  | Totaal aantal", "7"),
            ],
        );
        assert_eq!(
            appended(&out, "students_in_bron"),
            vec![&json!({
                "enrollments": {"Cluster 2": {"financed": 12, "non-financed": 0}},
                "ambulatory_guidance": {"total": 7}
            })]
        );
    }

    #[test]
    fn redacted_and_empty_leaves_are_absent() {
        let out = run(
            &ALIASES,
            parse_students_in_bron,
            &[
                ("BRIN NUMMER", "AB12"),
                ("VESTIGINGSNUMMER", "3"),
                ("Ambulante begeleiding |  | Totaal aantal", "*"),
                ("CUMI", "*"),
                ("NOAT", ""),
                ("SOORT PRIMAIR ONDERWIJS", "*"),
                ("VESTIGING ACTIEF OP PEILDATUM", "*"),
            ],
        );
        let snapshot = appended(&out, "students_in_bron")[0];
        assert!(snapshot["ambulatory_guidance"]["total"].is_null());
        assert!(snapshot["cumi"].is_null());
        assert!(snapshot["noat"].is_null());
        assert!(snapshot["po_type"].is_null());
        assert!(snapshot["branch_active"].is_null());
        assert_ne!(snapshot["cumi"], json!("*"));
    }

    #[test]
    fn brackets() {
        assert_eq!(
            bracket("15 JAAR EN OUDER", json!(2)),
            Some(("by_age", json!({"age_range": ">15", "students": 2})))
        );
        assert_eq!(
            bracket("GEWICHT 1.2", json!(4)),
            Some(("by_weight", json!({"weight": 1.2, "students": 4})))
        );
        assert_eq!(bracket("ONBEKEND", json!(1)), None);
    }
}
