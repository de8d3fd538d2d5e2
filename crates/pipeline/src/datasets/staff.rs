// Staff workbooks
//
// Personnel sheets carry several years side by side: every measure column
// ends in the year it describes ("PERSONEN 2012", "FTE'S 2011"). Each row is
// fanned out into one entry per year, and each entry lands in that year's
// record rather than the pass year.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::{opt, BRIN};
use crate::alias::{self, clean_label, AliasTable, FieldAlias};
use crate::model::{EntityKey, Emission};
use crate::normalize::{label_tokens, split_year_label, NormalizedRow};

const BOARD_COLUMN: &[&str] = &["BEVOEGD GEZAG", "BEVOEGD GEZAG NUMMER"];

const STAFF_COLUMNS: &[FieldAlias] = &[
    alias::text("brin", BRIN),
    alias::int("board_id", BOARD_COLUMN),
    alias::text("function_group", &["FUNCTIEGROEP"]),
];
const COURSE_COLUMNS: &[FieldAlias] = &[
    alias::text("brin", BRIN),
    alias::int("board_id", BOARD_COLUMN),
    alias::text("course", &["VAK"]),
    alias::int("degree", &["GRAAD"]),
];

pub(super) const STAFF_ALIASES: AliasTable = AliasTable::new(&[STAFF_COLUMNS]);
pub(super) const COURSE_ALIASES: AliasTable = AliasTable::new(&[COURSE_COLUMNS]);

/// Staff working above school level is booked under this pseudo code.
const ABOVE_SCHOOL: &str = "bovenschools";

// ---------------------------------------------------------------------------
// Measure tables
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum Number {
    Count,
    Amount,
    /// Mean age; a zero means not measured.
    MeanAge,
}

#[derive(Debug)]
struct Scalar {
    tokens: &'static [&'static str],
    name: &'static str,
    number: Number,
}

const fn scalar(tokens: &'static [&'static str], name: &'static str, number: Number) -> Scalar {
    Scalar {
        tokens,
        name,
        number,
    }
}

/// A family of range columns, e.g. "PERSONEN 25 TOT 35 JAAR".
#[derive(Debug)]
struct Bracket {
    field: &'static str,
    head: &'static [&'static str],
    tail: &'static str,
    above: &'static str,
    below: Option<&'static str>,
    unknown: Option<&'static [&'static str]>,
    range_key: &'static str,
    amount_key: &'static str,
    number: Number,
}

#[derive(Debug)]
struct Breakdown {
    total: &'static str,
    scalars: &'static [Scalar],
    brackets: &'static [Bracket],
}

const PEOPLE: Breakdown = Breakdown {
    total: "staff",
    scalars: &[
        scalar(&["PERSONEN"], "staff", Number::Count),
        scalar(&["MANNEN"], "staff_male", Number::Count),
        scalar(&["VROUWEN"], "staff_female", Number::Count),
        scalar(&["GESLACHT", "ONBEKEND"], "staff_gender_unknown", Number::Count),
        scalar(&["GEMIDDELDE", "LEEFTIJD"], "age_mean", Number::MeanAge),
        scalar(&["GEMIDDELDE", "LEEFTIJD", "MAN"], "age_mean_male", Number::MeanAge),
        scalar(&["GEMIDDELDE", "LEEFTIJD", "VROUW"], "age_mean_female", Number::MeanAge),
        scalar(&["GEMIDDELDE", "FTE'S"], "workload_mean", Number::Amount),
        scalar(&["PERSONEN", "IN", "TIJDELIJKE", "DIENST"], "staff_temp", Number::Count),
        scalar(&["PERSONEN", "IN", "VASTE", "DIENST"], "staff_perm", Number::Count),
    ],
    brackets: &[
        Bracket {
            field: "staff_workload",
            head: &["PERSONEN"],
            tail: "FTE'S",
            above: "MEER",
            below: None,
            unknown: None,
            range_key: "range",
            amount_key: "count",
            number: Number::Count,
        },
        Bracket {
            field: "staff_age",
            head: &["PERSONEN"],
            tail: "JAAR",
            above: "OUDER",
            below: Some("JONGER"),
            unknown: Some(&["LEEFTIJD", "ONBEKEND"]),
            range_key: "range",
            amount_key: "count",
            number: Number::Count,
        },
    ],
};

const FTE: Breakdown = Breakdown {
    total: "fte",
    scalars: &[
        scalar(&["FTE'S"], "fte", Number::Amount),
        scalar(&["FTE'S", "MANNEN"], "fte_male", Number::Amount),
        scalar(&["FTE'S", "VROUWEN"], "fte_female", Number::Amount),
        scalar(&["FTE'S", "GESLACHT", "ONBEKEND"], "fte_gender_unknown", Number::Amount),
        scalar(
            &["FTE'S", "PERSONEN", "IN", "TIJDELIJKE", "DIENST"],
            "fte_temp",
            Number::Amount,
        ),
        scalar(
            &["FTE'S", "PERSONEN", "IN", "VASTE", "DIENST"],
            "fte_perm",
            Number::Amount,
        ),
    ],
    brackets: &[
        Bracket {
            field: "fte_workload",
            head: &["FTE'S", "PERSONEN"],
            tail: "FTE'S",
            above: "MEER",
            below: None,
            unknown: None,
            range_key: "range",
            amount_key: "fte",
            number: Number::Amount,
        },
        Bracket {
            field: "fte_age",
            head: &["FTE'S", "PERSONEN"],
            tail: "JAAR",
            above: "OUDER",
            below: Some("JONGER"),
            unknown: Some(&["FTE'S", "LEEFTIJD", "ONBEKEND"]),
            range_key: "range",
            amount_key: "fte",
            number: Number::Amount,
        },
    ],
};

const PEOPLE_PER_COURSE: Breakdown = Breakdown {
    total: "staff",
    scalars: &[
        scalar(&["AANTAL", "PERSONEN"], "staff", Number::Count),
        scalar(&["AANTAL", "PERSONEN", "IN", "VASTE", "DIENST"], "staff_perm", Number::Count),
        scalar(
            &["AANTAL", "PERSONEN", "IN", "TIJDELIJKE", "DIENST"],
            "staff_temp",
            Number::Count,
        ),
        scalar(
            &["AANTAL", "PERSONEN", "IN", "DIENST", "ALS", "VERVANGING"],
            "staff_substitutes",
            Number::Count,
        ),
        scalar(
            &["AANTAL", "PERSONEN", "IN", "DIENST", "ZONDER", "BENOEMING"],
            "staff_unappointed",
            Number::Count,
        ),
        scalar(
            &["AANTAL", "PERSONEN", "IN", "DIENST", "ALS", "ONBEKEND"],
            "staff_appointment_unknown",
            Number::Count,
        ),
        scalar(&["VROUWEN"], "staff_female", Number::Count),
        scalar(&["MANNEN"], "staff_male", Number::Count),
        scalar(&["GESLACHT", "ONBEKEND"], "staff_gender_unknown", Number::Count),
        scalar(&["GEMIDDELDE", "LEEFTIJD"], "age_mean", Number::MeanAge),
        scalar(&["GEMIDDELDE", "LEEFTIJD", "VROUW"], "age_mean_female", Number::MeanAge),
        scalar(&["GEMIDDELDE", "LEEFTIJD", "MAN"], "age_mean_male", Number::MeanAge),
    ],
    brackets: &[Bracket {
        field: "staff_age",
        head: &["AANTAL", "PERSONEN"],
        tail: "JAAR",
        above: "OUDER",
        below: Some("JONGER"),
        unknown: Some(&["LEEFTIJD", "ONBEKEND"]),
        range_key: "age_range",
        amount_key: "count",
        number: Number::Count,
    }],
};

const TIME_PER_COURSE: Breakdown = Breakdown {
    total: "time",
    scalars: &[
        scalar(&["AANTAL", "LESUREN"], "time", Number::Count),
        scalar(
            &["AANTAL", "LESUREN", "PERSONEEL", "IN", "VASTE", "DIENST"],
            "time_perm",
            Number::Count,
        ),
        scalar(
            &["AANTAL", "LESUREN", "PERSONEEL", "IN", "TIJDELIJKE", "DIENST"],
            "time_temp",
            Number::Count,
        ),
        scalar(
            &["AANTAL", "LESUREN", "PERSONEEL", "IN", "DIENST", "ALS", "VERVANGING"],
            "time_substitutes",
            Number::Count,
        ),
        scalar(
            &["AANTAL", "LESUREN", "PERSONEEL", "IN", "DIENST", "ZONDER", "BENOEMING"],
            "time_unappointed",
            Number::Count,
        ),
        scalar(
            &["AANTAL", "LESUREN", "PERSONEEL", "MET", "ONBEKEND", "DIENSTVERBAND"],
            "time_appointment_unknown",
            Number::Count,
        ),
        scalar(&["AANTAL", "LESUREN", "VROUWEN"], "time_female", Number::Count),
        scalar(&["AANTAL", "LESUREN", "MANNEN"], "time_male", Number::Count),
        scalar(
            &["AANTAL", "LESUREN", "PERSONEEL", "GESLACHT", "ONBEKEND"],
            "time_gender_unknown",
            Number::Count,
        ),
    ],
    brackets: &[Bracket {
        field: "time_by_staff_age",
        head: &["AANTAL", "LESUREN", "PERSONEEL"],
        tail: "JAAR",
        above: "OUDER",
        below: Some("JONGER"),
        unknown: Some(&["AANTAL", "LESUREN", "PERSONEEL", "LEEFTIJD", "ONBEKEND"]),
        range_key: "staff_age",
        amount_key: "time",
        number: Number::Count,
    }],
};

// ---------------------------------------------------------------------------
// Fan-out
// ---------------------------------------------------------------------------

fn number(row: &NormalizedRow<'_>, value: &str, number: Number) -> Value {
    match number {
        Number::Count => opt(row.int_of(value)),
        Number::Amount => opt(row.float_of(value)),
        Number::MeanAge => opt(row.float_of(value).filter(|age| *age != 0.0)),
    }
}

/// Range label of a bracket column; `body` is the label between head and
/// tail ("25 TOT 35", "OUDER DAN 60", "MEER DAN 1").
fn bracket_range(bracket: &Bracket, body: &[&str]) -> Option<String> {
    let (first, last) = (body.first()?, body.last()?);
    if *first == bracket.above {
        Some(format!(">{last}"))
    } else if bracket.below == Some(*first) {
        Some(format!("<{last}"))
    } else {
        Some(body.concat())
    }
}

fn push_bracket(measures: &mut Map<String, Value>, bracket: &Bracket, range: String, amount: Value) {
    let mut entry = Map::new();
    entry.insert(bracket.range_key.into(), range.into());
    entry.insert(bracket.amount_key.into(), amount);
    match measures
        .entry(bracket.field)
        .or_insert_with(|| Value::Array(Vec::new()))
    {
        Value::Array(items) => items.push(Value::Object(entry)),
        other => *other = Value::Array(vec![Value::Object(entry)]),
    }
}

fn apply(
    breakdown: &Breakdown,
    row: &NormalizedRow<'_>,
    tokens: &[&str],
    value: &str,
    measures: &mut Map<String, Value>,
) {
    if let Some(s) = breakdown.scalars.iter().find(|s| s.tokens == tokens) {
        measures.insert(s.name.into(), number(row, value, s.number));
        return;
    }

    for bracket in breakdown.brackets {
        if bracket.unknown.is_some_and(|unknown| unknown == tokens) {
            push_bracket(measures, bracket, "?".into(), number(row, value, bracket.number));
            return;
        }
        let head = bracket.head.len();
        if tokens.len() > head + 1
            && tokens.starts_with(bracket.head)
            && tokens.last() == Some(&bracket.tail)
        {
            if let Some(range) = bracket_range(bracket, &tokens[head..tokens.len() - 1]) {
                push_bracket(measures, bracket, range, number(row, value, bracket.number));
            }
            return;
        }
    }
}

/// All year-suffixed columns of a row, grouped per year. Redacted cells are
/// left out; a year whose cells are all redacted still gets an empty entry.
fn measures_per_year(row: &NormalizedRow<'_>, breakdown: &Breakdown) -> BTreeMap<i32, Map<String, Value>> {
    let mut years: BTreeMap<i32, Map<String, Value>> = BTreeMap::new();
    for (label, value) in row.columns() {
        let Some((measure, year)) = split_year_label(&clean_label(label)) else {
            continue;
        };
        let measures = years.entry(year).or_default();
        if row.is_redacted(value) {
            continue;
        }
        apply(breakdown, row, &label_tokens(&measure), value, measures);
    }
    years
}

/// A zero total collapses to just the total.
fn summarize(total: &str, mut measures: Map<String, Value>) -> Value {
    match measures.get(total) {
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => {
            let mut zero = Map::new();
            zero.insert(total.into(), 0.into());
            Value::Object(zero)
        }
        Some(_) => Value::Object(measures),
        None => {
            measures.insert(total.into(), Value::Null);
            Value::Object(measures)
        }
    }
}

// ---------------------------------------------------------------------------
// Parsers
// ---------------------------------------------------------------------------

fn is_above_school(brin: &str) -> bool {
    brin.eq_ignore_ascii_case(ABOVE_SCHOOL)
}

fn board_level_key(row: &NormalizedRow<'_>) -> Option<EntityKey> {
    if !is_above_school(row.text("brin")?) {
        return None;
    }
    Some(EntityKey::Board {
        board_id: row.int("board_id")?,
    })
}

fn school_level_key(row: &NormalizedRow<'_>) -> Option<EntityKey> {
    let brin = row.text("brin")?;
    if is_above_school(brin) {
        return None;
    }
    Some(EntityKey::School {
        brin: brin.to_string(),
    })
}

fn emit_function_groups(
    key: EntityKey,
    row: &NormalizedRow<'_>,
    breakdown: &Breakdown,
    out: &mut Vec<Emission>,
) {
    for (year, measures) in measures_per_year(row, breakdown) {
        let mut entry = Map::new();
        entry.insert("function_group".into(), opt(row.text("function_group")));
        entry.insert(breakdown.total.into(), summarize(breakdown.total, measures));
        out.push(Emission::append(key.clone(), breakdown.total, Value::Object(entry)).in_year(year));
    }
}

pub(super) fn parse_board_staff(row: &NormalizedRow<'_>, out: &mut Vec<Emission>) {
    if let Some(key) = board_level_key(row) {
        emit_function_groups(key, row, &PEOPLE, out);
    }
}

pub(super) fn parse_board_fte(row: &NormalizedRow<'_>, out: &mut Vec<Emission>) {
    if let Some(key) = board_level_key(row) {
        emit_function_groups(key, row, &FTE, out);
    }
}

pub(super) fn parse_school_staff(row: &NormalizedRow<'_>, out: &mut Vec<Emission>) {
    if let Some(key) = school_level_key(row) {
        emit_function_groups(key, row, &PEOPLE, out);
    }
}

pub(super) fn parse_school_fte(row: &NormalizedRow<'_>, out: &mut Vec<Emission>) {
    if let Some(key) = school_level_key(row) {
        emit_function_groups(key, row, &FTE, out);
    }
}

fn course_entry(row: &NormalizedRow<'_>, total: &str, measures: Value) -> Value {
    let mut entry = Map::new();
    entry.insert("course".into(), opt(row.text("course")));
    entry.insert("degree".into(), opt(row.int("degree")));
    entry.insert(total.into(), measures);
    Value::Object(entry)
}

pub(super) fn parse_staff_per_course(row: &NormalizedRow<'_>, out: &mut Vec<Emission>) {
    let Some(key) = school_level_key(row) else {
        return;
    };
    for (year, measures) in measures_per_year(row, &PEOPLE_PER_COURSE) {
        let staff = summarize("staff", measures);
        out.push(
            Emission::append(key.clone(), "staff_per_course", course_entry(row, "staff", staff))
                .in_year(year),
        );
    }
}

/// Courses without taught hours in a year are left out of that year.
pub(super) fn parse_time_per_course(row: &NormalizedRow<'_>, out: &mut Vec<Emission>) {
    let Some(key) = school_level_key(row) else {
        return;
    };
    for (year, measures) in measures_per_year(row, &TIME_PER_COURSE) {
        let taught = measures
            .get("time")
            .and_then(Value::as_i64)
            .is_some_and(|hours| hours != 0);
        if !taught {
            continue;
        }
        let time = Value::Object(measures);
        out.push(
            Emission::append(key.clone(), "time_per_course", course_entry(row, "time", time))
                .in_year(year),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasets::test_support::run;
    use crate::model::PartialField;
    use serde_json::json;

    fn entries(out: &[Emission]) -> Vec<(i32, &Value)> {
        out.iter()
            .map(|e| match &e.field {
                PartialField::Append(_, v) => (e.year.unwrap(), v),
                PartialField::Set(..) => panic!("unexpected set"),
            })
            .collect()
    }

    #[test]
    fn staff_fans_out_per_year() {
        let out = run(
            &STAFF_ALIASES,
            parse_school_staff,
            &[
                ("BRIN NUMMER", "AB12"),
                ("BEVOEGD GEZAG", "41234"),
                ("FUNCTIEGROEP", "Onderwijzend personeel"),
                ("PERSONEN 2011", "40"),
                ("PERSONEN 2012", "42"),
                ("MANNEN 2012", "*"),
                ("GEMIDDELDE LEEFTIJD 2012", "0"),
                ("PERSONEN JONGER DAN 25 JAAR 2012", "3"),
                ("PERSONEN 25 TOT 35 JAAR 2012", "10"),
                ("PERSONEN OUDER DAN 60 JAAR 2012", "2"),
                ("LEEFTIJD ONBEKEND 2012", "0"),
                ("PERSONEN MEER DAN 1 FTE'S 2012", "4"),
                ("PERSONEN 0,5 TOT 1 FTE'S 2012", "12"),
            ],
        );
        let entries = entries(&out);
        assert_eq!(entries.len(), 2);
        assert!(out.iter().all(|e| e.key == EntityKey::School { brin: "AB12".into() }));

        assert_eq!(entries[0].0, 2011);
        assert_eq!(
            entries[0].1,
            &json!({"function_group": "Onderwijzend personeel", "staff": {"staff": 40}})
        );

        assert_eq!(entries[1].0, 2012);
        assert_eq!(
            entries[1].1,
            &json!({
                "function_group": "Onderwijzend personeel",
                "staff": {
                    "staff": 42,
                    "age_mean": null,
                    "staff_age": [
                        {"range": "<25", "count": 3},
                        {"range": "25TOT35", "count": 10},
                        {"range": ">60", "count": 2},
                        {"range": "?", "count": 0}
                    ],
                    "staff_workload": [
                        {"range": ">1", "count": 4},
                        {"range": "0,5TOT1", "count": 12}
                    ]
                }
            })
        );
    }

    #[test]
    fn board_variant_keeps_only_above_school_rows() {
        let cells = |brin: &'static str| {
            vec![
                ("BRIN NUMMER", brin),
                ("BEVOEGD GEZAG", "41234"),
                ("FUNCTIEGROEP", "Directie"),
                ("FTE'S 2012", "2,5"),
            ]
        };
        assert!(run(&STAFF_ALIASES, parse_board_fte, &cells("AB12")).is_empty());
        assert!(run(&STAFF_ALIASES, parse_school_fte, &cells("bovenschools")).is_empty());

        let out = run(&STAFF_ALIASES, parse_board_fte, &cells("bovenschools"));
        assert_eq!(out[0].key, EntityKey::Board { board_id: 41234 });
        assert_eq!(
            entries(&out)[0].1,
            &json!({"function_group": "Directie", "fte": {"fte": 2.5}})
        );
    }

    #[test]
    fn zero_total_collapses() {
        let out = run(
            &STAFF_ALIASES,
            parse_school_fte,
            &[
                ("BRIN NUMMER", "AB12"),
                ("FUNCTIEGROEP", "Directie"),
                ("FTE'S 2012", "0"),
                ("FTE'S MANNEN 2012", "0"),
            ],
        );
        assert_eq!(entries(&out)[0].1["fte"], json!({"fte": 0}));
    }

    #[test]
    fn redacted_total_is_null_not_zero() {
        let out = run(
            &STAFF_ALIASES,
            parse_school_staff,
            &[
                ("BRIN NUMMER", "AB12"),
                ("FUNCTIEGROEP", "Directie"),
                ("PERSONEN 2012", "*"),
                ("VROUWEN 2012", "3"),
            ],
        );
        assert_eq!(
            entries(&out)[0].1["staff"],
            json!({"staff_female": 3, "staff": null})
        );
    }

    #[test]
    fn courses_without_hours_are_dropped() {
        let cells = [
            ("BRIN NUMMER", "AB12"),
            ("VAK", "Wiskunde"),
            ("GRAAD", "1"),
            ("AANTAL LESUREN 2011", "0"),
            ("AANTAL LESUREN 2012", "120"),
            ("AANTAL LESUREN PERSONEEL 25 TOT 35 JAAR 2012", "60"),
            ("AANTAL LESUREN PERSONEEL LEEFTIJD ONBEKEND 2012", "0"),
        ];
        let out = run(&COURSE_ALIASES, parse_time_per_course, &cells);
        let entries = entries(&out);
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0],
            (
                2012,
                &json!({
                    "course": "Wiskunde",
                    "degree": 1,
                    "time": {
                        "time": 120,
                        "time_by_staff_age": [
                            {"staff_age": "25TOT35", "time": 60},
                            {"staff_age": "?", "time": 0}
                        ]
                    }
                })
            )
        );
    }

    #[test]
    fn staff_per_course_ages() {
        let out = run(
            &COURSE_ALIASES,
            parse_staff_per_course,
            &[
                ("BRIN NUMMER", "AB12"),
                ("VAK", "Engels"),
                ("GRAAD", "2"),
                ("AANTAL PERSONEN 2012", "5"),
                ("AANTAL PERSONEN OUDER DAN 60 JAAR 2012", "1"),
                ("GEMIDDELDE LEEFTIJD VROUW 2012", "44,5"),
            ],
        );
        assert_eq!(
            entries(&out)[0].1,
            &json!({
                "course": "Engels",
                "degree": 2,
                "staff": {
                    "staff": 5,
                    "staff_age": [{"age_range": ">60", "count": 1}],
                    "age_mean_female": 44.5
                }
            })
        );
    }
}
