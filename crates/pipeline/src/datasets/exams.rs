// Exam results per branch: graduations per school year, overall grades and
// grades per course.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::{branch_key, insert_some, BRANCH_KEY};
use crate::alias::{self, clean_label, AliasTable, FieldAlias};
use crate::model::Emission;
use crate::normalize::{label_tokens, NormalizedRow};

// ---------------------------------------------------------------------------
// Graduations
// ---------------------------------------------------------------------------

const GRADUATION: &[FieldAlias] = &[
    alias::text("education_structure", &["ONDERWIJSTYPE VO"]),
    alias::text("department", &["OPLEIDINGSNAAM"]),
    alias::text("inspectioncode", &["INSPECTIECODE"]),
];

pub(super) const GRADUATION_ALIASES: AliasTable = AliasTable::new(&[BRANCH_KEY, GRADUATION]);

const BREAKDOWN: &[(&str, &str)] = &[
    ("TOTAAL", "total"),
    ("MAN", "male"),
    ("VROUW", "female"),
    ("ONBEKEND", "unknown"),
];

#[derive(Default)]
struct SchoolYear {
    candidates: BTreeMap<&'static str, i64>,
    passed: BTreeMap<&'static str, i64>,
}

/// `"GESLAAGDEN SCHOOLJAAR 2010-2011 VROUW"` gives
/// (passed, "2010-2011", "female").
fn graduation_label(label: &str) -> Option<(bool, &str, &'static str)> {
    let tokens = label_tokens(label);
    let [measure, "SCHOOLJAAR", year, part] = tokens.as_slice() else {
        return None;
    };
    let passed = match *measure {
        "EXAMENKANDIDATEN" => false,
        "GESLAAGDEN" => true,
        _ => return None,
    };
    let (_, part) = BREAKDOWN.iter().find(|(label, _)| label == part)?;
    let (from, to) = year.split_once('-')?;
    if from.len() != 4 || to.len() != 4 {
        return None;
    }
    Some((passed, *year, *part))
}

fn counts(map: &BTreeMap<&'static str, i64>) -> Value {
    Value::Object(map.iter().map(|(k, v)| (k.to_string(), (*v).into())).collect())
}

/// Wide rows carry candidates and passes for several school years; each
/// year with any candidate count becomes one entry.
pub(super) fn parse_graduations(row: &NormalizedRow<'_>, out: &mut Vec<Emission>) {
    let Some(key) = branch_key(row) else {
        return;
    };

    let mut years: BTreeMap<String, SchoolYear> = BTreeMap::new();
    for (label, value) in row.columns() {
        let label = clean_label(label);
        let Some((passed, year, part)) = graduation_label(&label) else {
            continue;
        };
        let Some(count) = row.int_of(value) else {
            continue;
        };
        let entry = years.entry(year.to_string()).or_default();
        if passed {
            entry.passed.insert(part, count);
        } else {
            entry.candidates.insert(part, count);
        }
    }

    for (year, counted) in years {
        if counted.candidates.is_empty() {
            continue;
        }
        let failed: BTreeMap<&'static str, i64> = counted
            .candidates
            .iter()
            .filter_map(|(part, candidates)| {
                counted.passed.get(part).map(|passed| (*part, candidates - passed))
            })
            .collect();

        let mut graduation = Map::new();
        graduation.insert("year".into(), year.into());
        insert_some(
            &mut graduation,
            "education_structure",
            row.text("education_structure"),
        );
        insert_some(&mut graduation, "department", row.text("department"));
        insert_some(&mut graduation, "inspectioncode", row.text("inspectioncode"));
        graduation.insert("candidates".into(), counts(&counted.candidates));
        graduation.insert("passed".into(), counts(&counted.passed));
        graduation.insert("failed".into(), counts(&failed));
        out.push(Emission::append(key.clone(), "graduations", Value::Object(graduation)));
    }
}

// ---------------------------------------------------------------------------
// Grades
// ---------------------------------------------------------------------------

const EXAM_GRADES: &[FieldAlias] = &[
    alias::text("education_structure", &["ONDERWIJSTYPE VO"]),
    alias::text("learning_path", &["LEERWEG VMBO"]),
    alias::text("vmbo_sector", &["VMBO SECTOR"]),
    alias::text("sector", &["AFDELING"]),
    alias::int("candidates", &["EXAMENKANDIDATEN"]),
    alias::int("passed", &["GESLAAGDEN"]),
    alias::int("failed", &["GEZAKTEN"]),
    alias::float("avg_grade_school_exam", &["GEMIDDELD CIJFER SCHOOLEXAMEN"]),
    alias::float("avg_grade_central_exam", &["GEMIDDELD CIJFER CENTRAAL EXAMEN"]),
    alias::float("avg_final_grade", &["GEMIDDELD CIJFER CIJFERLIJST"]),
];

pub(super) const EXAM_GRADE_ALIASES: AliasTable = AliasTable::new(&[BRANCH_KEY, EXAM_GRADES]);

/// `"VMBO"` joined with its learning path as `"VMBO-GL"`.
fn structure_with_path(structure: Option<&str>, path: Option<&str>) -> Option<String> {
    match (structure, path) {
        (Some(structure), Some(path)) => Some(format!("{structure}-{path}")),
        (structure, _) => structure.map(str::to_string),
    }
}

/// Copy each present, non-empty field under its canonical name.
fn present(row: &NormalizedRow<'_>, fields: &[FieldAlias], into: &mut Map<String, Value>) {
    for field in fields {
        let value = match field.coercion {
            alias::Coercion::Int => row.int(field.canonical).map(Value::from),
            alias::Coercion::Float => row.float(field.canonical).map(Value::from),
            _ => row.text(field.canonical).map(Value::from),
        };
        insert_some(into, field.canonical, value);
    }
}

pub(super) fn parse_exam_grades(row: &NormalizedRow<'_>, out: &mut Vec<Emission>) {
    let Some(key) = branch_key(row) else {
        return;
    };
    let mut grades = Map::new();
    insert_some(
        &mut grades,
        "education_structure",
        structure_with_path(row.text("education_structure"), row.text("learning_path")),
    );
    present(row, &EXAM_GRADES[2..], &mut grades);
    out.push(Emission::append(key, "exam_grades", Value::Object(grades)));
}

const COURSE_GRADES: &[FieldAlias] = &[
    alias::text("education_structure", &["ONDERWIJSTYPE VO"]),
    alias::text("learning_path", &["LEERWEG"]),
    alias::text("course_identifier", &["VAKCODE"]),
    alias::text("course_abbreviation", &["AFKORTING VAKNAAM"]),
    alias::text("course_name", &["VAKNAAM"]),
    alias::text("school_exam_rating", &["SCHOOLEXAMEN BEOORDELING"]),
    alias::int(
        "amount_of_school_exams_with_rating",
        &["TOTAAL AANTAL SCHOOLEXAMENS MET BEOORDELING"],
    ),
    alias::int(
        "amount_of_school_exams_with_rating_counting_for_diploma",
        &["AANTAL SCHOOLEXAMENS MET BEOORDELING MEETELLEND VOOR DIPLOMA"],
    ),
    alias::int(
        "amount_of_school_exams_with_grades",
        &["TOTAAL AANTAL SCHOOLEXAMENS MET CIJFER"],
    ),
    alias::float(
        "avg_grade_school_exams",
        &["GEM. CIJFER TOTAAL AANTAL SCHOOLEXAMENS"],
    ),
    alias::int(
        "amount_of_school_exams_with_grades_counting_for_diploma",
        &["AANTAL SCHOOLEXAMENS MET CIJFER MEETELLEND VOOR DIPLOMA"],
    ),
    alias::float(
        "avg_grade_school_exams_counting_for_diploma",
        &["GEM. CIJFER SCHOOLEXAMENS MET CIJFER MEETELLEND VOOR DIPLOMA"],
    ),
    alias::int("amount_of_central_exams", &["TOTAAL AANTAL CENTRALE EXAMENS"]),
    alias::float(
        "avg_grade_central_exams",
        &["GEM. CIJFER TOTAAL AANTAL CENTRALE EXAMENS"],
    ),
    alias::int(
        "amount_of_central_exams_counting_for_diploma",
        &["AANTAL CENTRALE EXAMENS MEETELLEND VOOR DIPLOMA"],
    ),
    alias::float(
        "avg_grade_central_exams_counting_for_diploma",
        &["GEM. CIJFER CENTRALE EXAMENS MET CIJFER MEETELLEND VOOR DIPLOMA"],
    ),
    alias::float("average_grade_overall", &["GEM. CIJFER CIJFERLIJST"]),
];

pub(super) const COURSE_GRADE_ALIASES: AliasTable = AliasTable::new(&[BRANCH_KEY, COURSE_GRADES]);

fn course_grades(row: &NormalizedRow<'_>, structure: Option<String>) -> Value {
    let mut grades = Map::new();
    insert_some(&mut grades, "education_structure", structure);
    present(row, &COURSE_GRADES[2..], &mut grades);
    Value::Object(grades)
}

fn course_field(row: &NormalizedRow<'_>) -> &'static str {
    match row.text("education_structure").map(str::to_ascii_uppercase).as_deref() {
        Some("HAVO") => "havo_exam_grades_per_course",
        Some("VWO") => "vwo_exam_grades_per_course",
        _ => "vmbo_exam_grades_per_course",
    }
}

/// Vmbo rows name their learning path in a separate column.
pub(super) fn parse_vmbo_grades_per_course(row: &NormalizedRow<'_>, out: &mut Vec<Emission>) {
    let Some(key) = branch_key(row) else {
        return;
    };
    let structure =
        structure_with_path(row.text("education_structure"), row.text("learning_path"));
    out.push(Emission::append(
        key,
        "vmbo_exam_grades_per_course",
        course_grades(row, structure),
    ));
}

/// Havo and vwo files share one layout; the structure column picks the field.
pub(super) fn parse_grades_per_course(row: &NormalizedRow<'_>, out: &mut Vec<Emission>) {
    let Some(key) = branch_key(row) else {
        return;
    };
    let structure = row.text("education_structure").map(str::to_string);
    out.push(Emission::append(key, course_field(row), course_grades(row, structure)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasets::test_support::{appended, run};
    use serde_json::json;

    #[test]
    fn graduations_per_school_year() {
        let out = run(
            &GRADUATION_ALIASES,
            parse_graduations,
            &[
                ("BRIN NUMMER", "AB12"),
                ("VESTIGINGSNUMMER", "AB1201"),
                ("ONDERWIJSTYPE VO", "HAVO"),
                ("OPLEIDINGSNAAM", "HAVO NATUUR EN TECHNIEK"),
                ("INSPECTIECODE", "1"),
                ("EXAMENKANDIDATEN SCHOOLJAAR 2010-2011 TOTAAL", "40"),
                ("EXAMENKANDIDATEN SCHOOLJAAR 2010-2011 MAN", "25"),
                ("EXAMENKANDIDATEN SCHOOLJAAR 2010-2011 VROUW", "15"),
                ("GESLAAGDEN SCHOOLJAAR 2010-2011 TOTAAL", "36"),
                ("GESLAAGDEN SCHOOLJAAR 2010-2011 MAN", "22"),
                ("EXAMENKANDIDATEN SCHOOLJAAR 2011-2012 TOTAAL", ""),
                ("GESLAAGDEN SCHOOLJAAR 2011-2012 TOTAAL", ""),
            ],
        );
        assert_eq!(
            appended(&out, "graduations"),
            vec![&json!({
                "year": "2010-2011",
                "education_structure": "HAVO",
                "department": "HAVO NATUUR EN TECHNIEK",
                "inspectioncode": "1",
                "candidates": {"total": 40, "male": 25, "female": 15},
                "passed": {"total": 36, "male": 22},
                "failed": {"total": 4, "male": 3}
            })]
        );
    }

    #[test]
    fn graduation_labels() {
        assert_eq!(
            graduation_label("GESLAAGDEN SCHOOLJAAR 2010-2011 VROUW"),
            Some((true, "2010-2011", "female"))
        );
        assert_eq!(graduation_label("EXAMENKANDIDATEN SCHOOLJAAR 2010 TOTAAL"), None);
        assert_eq!(graduation_label("GEZAKTEN SCHOOLJAAR 2010-2011 TOTAAL"), None);
    }

    #[test]
    fn exam_grades_only_present_fields() {
        let out = run(
            &EXAM_GRADE_ALIASES,
            parse_exam_grades,
            &[
                ("BRIN NUMMER", "AB12"),
                ("VESTIGINGSNUMMER", "AB1201"),
                ("ONDERWIJSTYPE VO", "VMBO"),
                ("LEERWEG VMBO", "GL"),
                ("VMBO SECTOR", ""),
                ("EXAMENKANDIDATEN", "30"),
                ("GESLAAGDEN", "28"),
                ("GEZAKTEN", "2"),
                ("GEMIDDELD CIJFER CENTRAAL EXAMEN", "6,4"),
            ],
        );
        assert_eq!(
            appended(&out, "exam_grades"),
            vec![&json!({
                "education_structure": "VMBO-GL",
                "candidates": 30,
                "passed": 28,
                "failed": 2,
                "avg_grade_central_exam": 6.4
            })]
        );
    }

    #[test]
    fn vmbo_course_grades_join_learning_path() {
        let out = run(
            &COURSE_GRADE_ALIASES,
            parse_vmbo_grades_per_course,
            &[
                ("BRIN NUMMER", "AB12"),
                ("VESTIGINGSNUMMER", "1"),
                ("ONDERWIJSTYPE VO", "VMBO"),
                ("LEERWEG", "BB"),
                ("VAKCODE", "0031"),
                ("AFKORTING VAKNAAM", "ne"),
                ("VAKNAAM", "Nederlandse taal"),
                ("TOTAAL AANTAL CENTRALE EXAMENS", "14"),
                ("GEM. CIJFER CIJFERLIJST", "6,8"),
            ],
        );
        assert_eq!(
            appended(&out, "vmbo_exam_grades_per_course"),
            vec![&json!({
                "education_structure": "VMBO-BB",
                "course_identifier": "0031",
                "course_abbreviation": "ne",
                "course_name": "Nederlandse taal",
                "amount_of_central_exams": 14,
                "average_grade_overall": 6.8
            })]
        );
    }

    #[test]
    fn havo_and_vwo_course_grades() {
        let out = run(
            &COURSE_GRADE_ALIASES,
            parse_grades_per_course,
            &[
                ("BRIN NUMMER", "AB12"),
                ("VESTIGINGSNUMMER", "1"),
                ("ONDERWIJSTYPE VO", "VWO"),
                ("VAKNAAM", "Wiskunde B"),
            ],
        );
        assert_eq!(
            appended(&out, "vwo_exam_grades_per_course"),
            vec![&json!({"education_structure": "VWO", "course_name": "Wiskunde B"})]
        );
    }
}
