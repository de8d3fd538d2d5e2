// Board level figures: annual-account key indicators, vavo outsourcing and
// students per education type.

use serde_json::{Map, Value};

use super::{board_key, branch_key, insert_some, opt, BOARD_KEY, BRANCH_KEY};
use crate::alias::{self, AliasTable, FieldAlias};
use crate::model::Emission;
use crate::normalize::NormalizedRow;

const INDICATORS: &[FieldAlias] = &[
    alias::int("year", &["JAAR"]),
    alias::text("group", &["GROEPERING"]),
    alias::float("liquidity_current_ratio", &["LIQUIDITEIT (CURRENT RATIO)"]),
    alias::float("profitability", &["RENTABILITEIT"]),
    alias::float("solvency_1", &["SOLVABILITEIT 1"]),
    alias::float("solvency_2", &["SOLVABILITEIT 2"]),
    alias::float(
        "general_reserve_div_total_income",
        &["ALGEMENE RESERVE / TOTALE BATEN"],
    ),
    alias::float("investments_relative_to_equity", &["BELEGGINGEN (T.O.V. EV)"]),
    alias::float(
        "contract_activities_div_gov_funding",
        &["CONTRACTACTIVITEITEN / RIJKSBIJDRAGE"],
    ),
    alias::float(
        "contractactivities_div_total_profits",
        &["CONTRACTACTIVITEITEN / TOTALE BATEN"],
    ),
    alias::float("equity_div_total_profits", &["EIGEN VERMOGEN / TOTALE BATEN"]),
    alias::float(
        "housing_investment_div_total_profits",
        &["INVESTERING HUISVESTING / TOTALE BATEN"],
    ),
    alias::float(
        "investments_div_total_profits",
        &["INVESTERINGEN (INVENT.+APP.) / TOTALE BATEN"],
    ),
    alias::float("capitalization_ratio", &["KAPITALISATIEFACTOR"]),
    alias::float("liquidity_quick_ratio", &["LIQUIDITEIT (QUICK RATIO)"]),
    alias::float(
        "other_gov_funding_div_total_profits",
        &["OV. OVERHEIDSBIJDRAGEN / TOT. BATEN"],
    ),
    alias::float("staff_costs_div_gov_funding", &["PERSONEEL / RIJKSBIJDRAGEN"]),
    alias::float(
        "staff_expenses_div_total_expenses",
        &["PERSONELE LASTEN / TOTALE LASTEN"],
    ),
    alias::float("gov_funding_div_total_profits", &["RIJKSBIJDRAGEN / TOTALE BATEN"]),
    alias::float(
        "facilities_div_total_profits",
        &["VOORZIENINGEN /TOTALE BATEN", "VOORZIENINGEN / TOTALE BATEN"],
    ),
    alias::float(
        "operating_capital_div_total_profits",
        &["WERKKAPITAAL / TOTALE BATEN"],
    ),
    alias::float(
        "housing_expenses_div_total_expenses",
        &["HUISVESTINGSLASTEN / TOTALE LASTEN"],
    ),
    alias::float("operating_capital", &["WERKKAPITAAL"]),
];

pub(super) const INDICATOR_ALIASES: AliasTable = AliasTable::new(&[BOARD_KEY, INDICATORS]);

const VAVO: &[FieldAlias] = &[
    alias::int("non_vavo", &["AANTAL LEERLINGEN"]),
    alias::int("vavo", &["AANTAL VO LEERLINGEN UITBESTEED AAN VAVO"]),
];

pub(super) const BOARD_VAVO_ALIASES: AliasTable = AliasTable::new(&[BOARD_KEY, VAVO]);
pub(super) const BRANCH_VAVO_ALIASES: AliasTable = AliasTable::new(&[BRANCH_KEY, VAVO]);

const EDU_TYPE_COLUMNS: &[&str] = &["BAO", "SBAO", "SO", "VSO", "(V)SO"];

const EDU_TYPES: &[FieldAlias] = &[
    alias::text("denomination", &["DENOMINATIE"]),
    alias::int("BAO", &["BAO"]),
    alias::int("SBAO", &["SBAO"]),
    alias::int("SO", &["SO"]),
    alias::int("VSO", &["VSO"]),
    alias::int("(V)SO", &["(V)SO"]),
];

pub(super) const EDU_TYPE_ALIASES: AliasTable = AliasTable::new(&[BOARD_KEY, EDU_TYPES]);

/// Per-sector summary files share the listing page but carry no board
/// column; their rows have no key and are skipped.
pub(super) fn parse_key_indicators(row: &NormalizedRow<'_>, out: &mut Vec<Emission>) {
    let Some(key) = board_key(row) else {
        return;
    };

    let mut indicators = Map::new();
    indicators.insert("year".into(), opt(row.int("year")));
    indicators.insert("group".into(), opt(row.text("group")));
    for field in INDICATORS.iter().skip(2) {
        // Older years lack some indicators; only columns present are reported
        if row.has_column(field.canonical) {
            indicators.insert(field.canonical.into(), opt(row.float(field.canonical)));
        }
    }

    out.push(Emission::append(
        key,
        "financial_key_indicators_per_year",
        Value::Object(indicators),
    ));
}

fn vavo(row: &NormalizedRow<'_>) -> Value {
    let mut counts = Map::new();
    counts.insert("non_vavo".into(), opt(row.int("non_vavo")));
    counts.insert("vavo".into(), opt(row.int("vavo")));
    Value::Object(counts)
}

pub(super) fn parse_board_vavo(row: &NormalizedRow<'_>, out: &mut Vec<Emission>) {
    if let Some(key) = board_key(row) {
        out.push(Emission::append(key, "vavo_students", vavo(row)));
    }
}

pub(super) fn parse_branch_vavo(row: &NormalizedRow<'_>, out: &mut Vec<Emission>) {
    if let Some(key) = branch_key(row) {
        out.push(Emission::append(key, "vavo_students", vavo(row)));
    }
}

pub(super) fn parse_edu_types(row: &NormalizedRow<'_>, out: &mut Vec<Emission>) {
    let Some(key) = board_key(row) else {
        return;
    };

    for &edu_type in EDU_TYPE_COLUMNS {
        let Some(students) = row.int(edu_type) else {
            continue;
        };
        let mut entry = Map::new();
        insert_some(&mut entry, "denomination", row.text("denomination"));
        entry.insert("edu_type".into(), edu_type.into());
        entry.insert("students".into(), students.into());
        out.push(Emission::append(key.clone(), "edu_types", Value::Object(entry)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasets::test_support::{appended, run};
    use crate::model::EntityKey;
    use serde_json::json;

    #[test]
    fn key_indicators_are_locale_floats() {
        let out = run(
            &INDICATOR_ALIASES,
            parse_key_indicators,
            &[
                ("BEVOEGD GEZAG NUMMER", "41234"),
                ("JAAR", "2011"),
                ("GROEPERING", "VO"),
                ("LIQUIDITEIT (CURRENT RATIO)", "1,52"),
                ("WERKKAPITAAL", "1.234.567,5"),
                ("VOORZIENINGEN /TOTALE BATEN", ""),
            ],
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].key, EntityKey::Board { board_id: 41234 });
        assert_eq!(
            appended(&out, "financial_key_indicators_per_year")[0],
            &json!({
                "year": 2011,
                "group": "VO",
                "liquidity_current_ratio": 1.52,
                "facilities_div_total_profits": null,
                "operating_capital": 1234567.5
            })
        );
    }

    #[test]
    fn sector_summary_has_no_board() {
        let out = run(
            &INDICATOR_ALIASES,
            parse_key_indicators,
            &[("SECTOR", "VO"), ("JAAR", "2011"), ("RENTABILITEIT", "0,1")],
        );
        assert!(out.is_empty());
    }

    #[test]
    fn vavo_counts() {
        let out = run(
            &BRANCH_VAVO_ALIASES,
            parse_branch_vavo,
            &[
                ("BRIN NUMMER", "AB12"),
                ("VESTIGINGSNUMMER", "AB1200"),
                ("AANTAL LEERLINGEN", "812"),
                ("AANTAL VO LEERLINGEN UITBESTEED AAN VAVO", "*"),
            ],
        );
        assert_eq!(appended(&out, "vavo_students"), vec![&json!({"non_vavo": 812, "vavo": null})]);
    }

    #[test]
    fn edu_types_skip_empty_columns() {
        let out = run(
            &EDU_TYPE_ALIASES,
            parse_edu_types,
            &[
                ("BEVOEGD GEZAG NUMMER", "41234"),
                ("DENOMINATIE", "Openbaar"),
                ("BAO", "1.204"),
                ("SBAO", ""),
                ("SO", "0"),
            ],
        );
        assert_eq!(
            appended(&out, "edu_types"),
            vec![
                &json!({"denomination": "Openbaar", "edu_type": "BAO", "students": 1204}),
                &json!({"denomination": "Openbaar", "edu_type": "SO", "students": 0}),
            ]
        );
    }
}
