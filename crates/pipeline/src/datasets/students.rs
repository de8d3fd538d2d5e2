// Student counts, flows and memberships, school and branch level.

use std::collections::BTreeMap;

use duodata_io::TableLayout;
use serde_json::{Map, Value};

use super::addresses::normalize_collaboration_id;
use super::{applicable, branch_key, branch_number, opt, school_key, Layout, BRANCH_KEY, SCHOOL_KEY};
use crate::alias::{self, clean_label, AliasTable, FieldAlias};
use crate::model::{EntityKey, Emission};
use crate::normalize::{label_tokens, NormalizedRow};

fn object(pairs: impl IntoIterator<Item = (&'static str, Value)>) -> Value {
    Value::Object(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
}

/// Every listed field whose column the table has, under its canonical name.
fn present_ints(row: &NormalizedRow<'_>, fields: &[FieldAlias]) -> Map<String, Value> {
    let mut out = Map::new();
    for field in fields {
        if row.has_column(field.canonical) {
            out.insert(field.canonical.into(), opt(row.int(field.canonical)));
        }
    }
    out
}

// ---------------------------------------------------------------------------
// School level
// ---------------------------------------------------------------------------

const DROPOUTS: &[FieldAlias] = &[
    alias::int("year", &["JAAR"]),
    alias::text("education_structure", &["ONDERWIJSSTRUCTUUR EN LEERJAAR"]),
    alias::int("total_students", &["AANTAL DEELNEMERS"]),
    alias::int("total_dropouts", &["AANTAL VSV ERS"]),
    alias::int("dropouts_with_vmbo_diploma", &["AANTAL VSV ERS MET VMBO DIPLOMA"]),
    alias::int("dropouts_with_mbo1_diploma", &["AANTAL VSV ERS MET MBO1 DIPLOMA"]),
    alias::int("dropouts_without_diploma", &["AANTAL VSV ERS ZONDER DIPLOMA"]),
    alias::text("sector", &["PROFIEL"]),
];

pub(super) const DROPOUT_ALIASES: AliasTable = AliasTable::new(&[SCHOOL_KEY, DROPOUTS]);

pub(super) fn parse_dropouts(row: &NormalizedRow<'_>, out: &mut Vec<Emission>) {
    let Some(key) = school_key(row) else {
        return;
    };
    let mut dropouts = Map::new();
    dropouts.insert("year".into(), opt(row.int("year")));
    dropouts.insert(
        "education_structure".into(),
        opt(row.text("education_structure")),
    );
    for field in &DROPOUTS[2..7] {
        dropouts.insert(field.canonical.into(), opt(row.int(field.canonical)));
    }
    dropouts.insert("sector".into(), opt(applicable(row.text("sector"))));
    out.push(Emission::append(key, "dropouts_per_year", Value::Object(dropouts)));
}

/// Columns like "PROGNOSE LWOO PRO 2024" (also misspelled "POGNOSE"); the
/// counted columns for past years are ignored.
pub(super) fn parse_prognosis(row: &NormalizedRow<'_>, out: &mut Vec<Emission>) {
    let Some(key) = school_key(row) else {
        return;
    };
    for (label, value) in row.columns() {
        let label = clean_label(label);
        let tokens = label_tokens(&label);
        let Some((first, rest)) = tokens.split_first() else {
            continue;
        };
        let Some((last, structure)) = rest.split_last() else {
            continue;
        };
        if !matches!(*first, "PROGNOSE" | "POGNOSE")
            || last.len() != 4
            || !last.bytes().all(|b| b.is_ascii_digit())
        {
            continue;
        }
        let (Ok(year), Some(students)) = (last.parse::<i64>(), row.int_of(value)) else {
            continue;
        };
        out.push(Emission::append(
            key.clone(),
            "students_prognosis",
            object([
                ("year", year.into()),
                ("structure", structure.join("_").to_lowercase().into()),
                ("students", students.into()),
            ]),
        ));
    }
}

const MEMBERSHIP: &[FieldAlias] = &[alias::text("collaboration_id", &["ADMINISTRATIENUMMER"])];

pub(super) const MEMBERSHIP_ALIASES: AliasTable = AliasTable::new(&[SCHOOL_KEY, MEMBERSHIP]);

fn membership(row: &NormalizedRow<'_>, field: &'static str, out: &mut Vec<Emission>) {
    let (Some(key), Some(id)) = (school_key(row), row.text("collaboration_id")) else {
        return;
    };
    out.push(Emission::append(key, field, normalize_collaboration_id(id).into()));
}

pub(super) fn parse_vo_lo_collaboration(row: &NormalizedRow<'_>, out: &mut Vec<Emission>) {
    membership(row, "vo_lo_collaboration", out);
}

pub(super) fn parse_po_lo_collaboration(row: &NormalizedRow<'_>, out: &mut Vec<Emission>) {
    membership(row, "po_lo_collaboration", out);
}

pub(super) fn parse_pao_collaboration(row: &NormalizedRow<'_>, out: &mut Vec<Emission>) {
    membership(row, "pao_collaboration", out);
}

const CLUSTERS: &[FieldAlias] = &[
    alias::int("cluster_1", &["CLUSTER 1"]),
    alias::int("cluster_2", &["CLUSTER 2"]),
    alias::int("cluster_3", &["CLUSTER 3"]),
    alias::int("cluster_4", &["CLUSTER 4"]),
];

pub(super) const CLUSTER_ALIASES: AliasTable = AliasTable::new(&[SCHOOL_KEY, CLUSTERS]);

pub(super) fn parse_students_per_cluster(row: &NormalizedRow<'_>, out: &mut Vec<Emission>) {
    if let Some(key) = school_key(row) {
        let clusters = present_ints(row, CLUSTERS);
        out.push(Emission::append(
            key,
            "spo_students_per_cluster",
            Value::Object(clusters),
        ));
    }
}

// ---------------------------------------------------------------------------
// Branch level, secondary
// ---------------------------------------------------------------------------

const VO_RESIDENCES: &[FieldAlias] = &[
    alias::text("zip_code", &["POSTCODE LEERLING"]),
    alias::text("city", &["PLAATSNAAM LEERLING"]),
    alias::text("municipality", &["GEMEENTENAAM LEERLING"]),
    alias::int("municipality_id", &["GEMEENTENUMMER LEERLING"]),
];
const SCHOOL_YEARS_VO: &[FieldAlias] = &[
    alias::int("year_1", &["LEER- OF VERBLIJFSJAAR 1"]),
    alias::int("year_2", &["LEER- OF VERBLIJFSJAAR 2"]),
    alias::int("year_3", &["LEER- OF VERBLIJFSJAAR 3"]),
    alias::int("year_4", &["LEER- OF VERBLIJFSJAAR 4"]),
    alias::int("year_5", &["LEER- OF VERBLIJFSJAAR 5"]),
    alias::int("year_6", &["LEER- OF VERBLIJFSJAAR 6"]),
];

pub(super) const VO_RESIDENCE_ALIASES: AliasTable =
    AliasTable::new(&[BRANCH_KEY, VO_RESIDENCES, SCHOOL_YEARS_VO]);

/// First character upper case, the rest lower.
fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

pub(super) fn parse_vo_residences(row: &NormalizedRow<'_>, out: &mut Vec<Emission>) {
    let Some(key) = branch_key(row) else {
        return;
    };
    let mut residence = Map::new();
    residence.insert("zip_code".into(), opt(row.text("zip_code")));
    residence.insert("city".into(), opt(row.text("city").map(capitalize)));
    residence.insert("municipality".into(), opt(row.text("municipality")));
    residence.insert("municipality_id".into(), opt(row.int("municipality_id")));
    residence.extend(present_ints(row, SCHOOL_YEARS_VO));
    out.push(Emission::append(key, "student_residences", Value::Object(residence)));
}

const STRUCTURE: &[FieldAlias] = &[
    alias::text("department", &["AFDELING"]),
    alias::int("elementcode", &["ELEMENTCODE"]),
    alias::flag("lwoo", &["LWOO INDICATIE"]),
    alias::text("vmbo_sector", &["VMBO SECTOR"]),
    alias::text("education_name", &["OPLEIDINGSNAAM"]),
    alias::text(
        "education_structure",
        &["ONDERWIJSTYPE VO EN LEER- OF VERBLIJFSJAAR"],
    ),
];
const STRUCTURE_YEARS: &[FieldAlias] = &[
    alias::int("year_1_male", &["LEER- OF VERBLIJFSJAAR 1 - MAN"]),
    alias::int("year_1_female", &["LEER- OF VERBLIJFSJAAR 1 - VROUW"]),
    alias::int("year_2_male", &["LEER- OF VERBLIJFSJAAR 2 - MAN"]),
    alias::int("year_2_female", &["LEER- OF VERBLIJFSJAAR 2 - VROUW"]),
    alias::int("year_3_male", &["LEER- OF VERBLIJFSJAAR 3 - MAN"]),
    alias::int("year_3_female", &["LEER- OF VERBLIJFSJAAR 3 - VROUW"]),
    alias::int("year_4_male", &["LEER- OF VERBLIJFSJAAR 4 - MAN"]),
    alias::int("year_4_female", &["LEER- OF VERBLIJFSJAAR 4 - VROUW"]),
    alias::int("year_5_male", &["LEER- OF VERBLIJFSJAAR 5 - MAN"]),
    alias::int("year_5_female", &["LEER- OF VERBLIJFSJAAR 5 - VROUW"]),
    alias::int("year_6_male", &["LEER- OF VERBLIJFSJAAR 6 - MAN"]),
    alias::int("year_6_female", &["LEER- OF VERBLIJFSJAAR 6 - VROUW"]),
];

pub(super) const STRUCTURE_ALIASES: AliasTable =
    AliasTable::new(&[BRANCH_KEY, STRUCTURE, STRUCTURE_YEARS]);

pub(super) fn parse_students_by_structure(row: &NormalizedRow<'_>, out: &mut Vec<Emission>) {
    let Some(key) = branch_key(row) else {
        return;
    };
    let mut structure = Map::new();
    structure.insert("department".into(), opt(applicable(row.text("department"))));
    structure.insert("elementcode".into(), opt(row.int("elementcode")));
    structure.insert("lwoo".into(), opt(row.flag("lwoo")));
    structure.insert("vmbo_sector".into(), opt(applicable(row.text("vmbo_sector"))));
    structure.insert("education_name".into(), opt(row.text("education_name")));
    structure.insert(
        "education_structure".into(),
        opt(row.text("education_structure")),
    );

    for pair in STRUCTURE_YEARS.chunks(2) {
        let [male, female] = pair else {
            continue;
        };
        let (m, f) = (row.int(male.canonical), row.int(female.canonical));
        let total = match (m, f) {
            (None, None) => None,
            _ => Some(m.unwrap_or(0) + f.unwrap_or(0)),
        };
        let year = male.canonical.trim_end_matches("_male");
        structure.insert(
            year.into(),
            object([("male", opt(m)), ("female", opt(f)), ("total", opt(total))]),
        );
    }

    out.push(Emission::append(key, "students_by_structure", Value::Object(structure)));
}

const FINEGRAINED_TYPES: &[&str] = &[
    "Brugjaar 1-2",
    "Engelse Stroom",
    "HAVO lj 4-5",
    "HAVO uitbest. aan VAVO",
    "HAVO/VWO lj 3",
    "Int. Baccelaureaat",
    "Praktijkonderwijs alle vj",
    "VMBO BL lj 3-4",
    "VMBO GL lj 3-4",
    "VMBO KL lj 3-4",
    "VMBO TL lj 3-4",
    "VMBO uitbest. aan VAVO",
    "VMBO-MBO2 lj 3-6",
    "VWO lj 4-6",
    "VWO uitbest. aan VAVO",
];

pub(super) fn parse_finegrained_structure(row: &NormalizedRow<'_>, out: &mut Vec<Emission>) {
    let Some(key) = branch_key(row) else {
        return;
    };
    for (label, value) in row.columns() {
        let label = clean_label(label);
        let Some(kind) = FINEGRAINED_TYPES
            .iter()
            .find(|t| clean_label(t) == label)
        else {
            continue;
        };
        if let Some(count) = row.int_of(value) {
            out.push(Emission::append(
                key.clone(),
                "students_by_finegrained_structure",
                object([("type", (*kind).into()), ("count", count.into())]),
            ));
        }
    }
}

// ---------------------------------------------------------------------------
// Flow from primary to secondary
// ---------------------------------------------------------------------------

/// Flow tables open with two title lines and ship unusable column labels.
pub(super) const FLOW_LAYOUT: Layout = Layout::Table(TableLayout {
    sheet: None,
    skip_rows: 2,
    headers: Some(&[
        "BRIN NUMMER PO",
        "VESTIGINGSNUMMER PO",
        "INSTELLINGSNAAM PO",
        "STRAATNAAM PO",
        "PLAATSNAAM PO",
        "BRIN NUMMER VO",
        "VESTIGINGSNUMMER VO",
        "INSTELLINGSNAAM VO",
        "STRAATNAAM VO",
        "PLAATSNAAM VO",
        "AANTAL DOORSTROMERS",
    ]),
});

const FLOW: &[FieldAlias] = &[
    alias::text("po_brin", &["BRIN NUMMER PO"]),
    alias::raw("po_branch_id", &["VESTIGINGSNUMMER PO"]),
    alias::text("vo_brin", &["BRIN NUMMER VO"]),
    alias::raw("vo_branch_id", &["VESTIGINGSNUMMER VO"]),
    alias::int("students", &["AANTAL DOORSTROMERS"]),
];

pub(super) const FLOW_ALIASES: AliasTable = AliasTable::new(&[FLOW]);

/// (po branch, vo branch); both ends must resolve.
fn flow_ends(row: &NormalizedRow<'_>) -> Option<(EntityKey, EntityKey)> {
    let end = |brin: &str, branch: &str| -> Option<EntityKey> {
        let brin = row.text(brin)?;
        let branch_id = branch_number(row, brin, row.raw(branch)?)?;
        Some(EntityKey::Branch {
            brin: brin.to_string(),
            branch_id,
        })
    };
    Some((end("po_brin", "po_branch_id")?, end("vo_brin", "vo_branch_id")?))
}

fn branch_parts(key: &EntityKey) -> (Value, Value) {
    match key {
        EntityKey::Branch { brin, branch_id } => (brin.as_str().into(), (*branch_id).into()),
        _ => (Value::Null, Value::Null),
    }
}

pub(super) fn parse_po_student_flow(row: &NormalizedRow<'_>, out: &mut Vec<Emission>) {
    let Some((po, vo)) = flow_ends(row) else {
        return;
    };
    let (brin, branch_id) = branch_parts(&vo);
    out.push(Emission::append(
        po,
        "student_flow",
        object([
            ("to_vo_brin", brin),
            ("to_vo_branch_id", branch_id),
            ("out_flow", opt(row.int("students"))),
        ]),
    ));
}

pub(super) fn parse_vo_student_flow(row: &NormalizedRow<'_>, out: &mut Vec<Emission>) {
    let Some((po, vo)) = flow_ends(row) else {
        return;
    };
    let (brin, branch_id) = branch_parts(&po);
    out.push(Emission::append(
        vo,
        "student_flow",
        object([
            ("from_po_brin", brin),
            ("from_po_branch_id", branch_id),
            ("in_flow", opt(row.int("students"))),
        ]),
    ));
}

// ---------------------------------------------------------------------------
// Branch level, primary
// ---------------------------------------------------------------------------

const WEIGHTS: &[FieldAlias] = &[
    alias::int(
        "student_weight_0_0",
        &["GEWICHT 0", "GEWICHT0.00", "GEWICHT 0.00"],
    ),
    alias::int(
        "student_weight_0_3",
        &["GEWICHT 0.3", "GEWICHT0.30", "GEWICHT 0.30"],
    ),
    alias::int(
        "student_weight_1_2",
        &["GEWICHT 1.2", "GEWICHT1.20", "GEWICHT 1.20"],
    ),
    alias::int("school_weight", &["SCHOOLGEWICHT"]),
    alias::flag("impulse_area", &["IMPULSGEBIED"]),
];

pub(super) const WEIGHT_ALIASES: AliasTable = AliasTable::new(&[BRANCH_KEY, WEIGHTS]);

/// One snapshot per row; a branch listed twice keeps both.
pub(super) fn parse_weights(row: &NormalizedRow<'_>, out: &mut Vec<Emission>) {
    let Some(key) = branch_key(row) else {
        return;
    };
    let mut weights = present_ints(row, &WEIGHTS[..4]);
    // Not published before 2009
    if row.has_column("impulse_area") {
        weights.insert("impulse_area".into(), opt(row.flag("impulse_area")));
    }
    out.push(Emission::append(key, "weights_per_school", Value::Object(weights)));
}

const AGES: &[FieldAlias] = &[
    alias::float("student_weight", &["GEWICHT"]),
    alias::int("age_3", &["3 JAAR", "LEEFTIJD 3 JAAR", "LEEFTIJD.3"]),
    alias::int("age_4", &["4 JAAR", "LEEFTIJD 4 JAAR", "LEEFTIJD.4"]),
    alias::int("age_5", &["5 JAAR", "LEEFTIJD 5 JAAR", "LEEFTIJD.5"]),
    alias::int("age_6", &["6 JAAR", "LEEFTIJD 6 JAAR", "LEEFTIJD.6"]),
    alias::int("age_7", &["7 JAAR", "LEEFTIJD 7 JAAR", "LEEFTIJD.7"]),
    alias::int("age_8", &["8 JAAR", "LEEFTIJD 8 JAAR", "LEEFTIJD.8"]),
    alias::int("age_9", &["9 JAAR", "LEEFTIJD 9 JAAR", "LEEFTIJD.9"]),
    alias::int("age_10", &["10 JAAR", "LEEFTIJD 10 JAAR", "LEEFTIJD.10"]),
    alias::int("age_11", &["11 JAAR", "LEEFTIJD 11 JAAR", "LEEFTIJD.11"]),
    alias::int("age_12", &["12 JAAR", "LEEFTIJD 12 JAAR", "LEEFTIJD.12"]),
    alias::int("age_13", &["13 JAAR", "LEEFTIJD 13 JAAR", "LEEFTIJD.13"]),
    alias::int("age_14", &["14 JAAR", "LEEFTIJD 14 JAAR", "LEEFTIJD.14"]),
];

pub(super) const AGE_ALIASES: AliasTable = AliasTable::new(&[BRANCH_KEY, AGES]);

pub(super) fn parse_ages_by_weight(row: &NormalizedRow<'_>, out: &mut Vec<Emission>) {
    let Some(key) = branch_key(row) else {
        return;
    };
    let mut ages = Map::new();
    ages.insert("student_weight".into(), opt(row.float("student_weight")));
    ages.extend(present_ints(row, &AGES[1..]));
    out.push(Emission::append(
        key,
        "ages_per_branch_by_student_weight",
        Value::Object(ages),
    ));
}

const ORIGINS: &[FieldAlias] = &[
    alias::int("aruba", &["ARUBA"]),
    alias::int("maluku_islands", &["DE MOLUKSE EILANDEN"]),
    alias::int("greece", &["GIEKENLAND", "GRIEKENLAND"]),
    alias::int("italy", &["ITALIE"]),
    alias::int("cape_verde", &["KAAPVERDIE"]),
    alias::int("morocco", &["MAROKKO"]),
    alias::int("netherlands_antilles", &["NEDERLANDSE ANTILLEN"]),
    alias::int("non_english_speaking_countries", &["NIET-ENGELSTALIGEN"]),
    alias::int("portugal", &["PORTUGAL"]),
    alias::int("spain", &["SPANJE"]),
    alias::int("suriname", &["SURINAME"]),
    alias::int("tunisia", &["TUNESIE"]),
    alias::int("turkey", &["TURKIJE"]),
    alias::int("refugees", &["VLUCHTELINGEN"]),
    alias::int("former_yugoslavia", &["VML.JOEGOSLAVIE"]),
];

pub(super) const ORIGIN_ALIASES: AliasTable = AliasTable::new(&[BRANCH_KEY, ORIGINS]);

/// The full country list per branch; a repeated branch replaces it.
pub(super) fn parse_students_by_origin(row: &NormalizedRow<'_>, out: &mut Vec<Emission>) {
    let Some(key) = branch_key(row) else {
        return;
    };
    let origins: Vec<Value> = ORIGINS
        .iter()
        .filter(|origin| row.has_column(origin.canonical))
        .map(|origin| {
            object([
                ("country", origin.canonical.into()),
                ("students", opt(row.int(origin.canonical))),
            ])
        })
        .collect();
    out.push(Emission::set(key, "students_by_origin", Value::Array(origins)));
}

const PO_RESIDENCES: &[FieldAlias] = &[alias::text("zip_code", &["POSTCODE_LEERLING"])];

pub(super) const PO_RESIDENCE_ALIASES: AliasTable =
    AliasTable::new(&[BRANCH_KEY, PO_RESIDENCES]);

/// `"LEEFTIJD_7_JAAR"` gives 7; published ages run from 3 to 25.
fn residence_age(label: &str) -> Option<i64> {
    let age: i64 = label
        .strip_prefix("LEEFTIJD_")?
        .strip_suffix("_JAAR")?
        .parse()
        .ok()?;
    (3..=25).contains(&age).then_some(age)
}

pub(super) fn parse_po_residences(row: &NormalizedRow<'_>, out: &mut Vec<Emission>) {
    let Some(key) = branch_key(row) else {
        return;
    };
    let mut ages = BTreeMap::new();
    for (label, value) in row.columns() {
        let Some(age) = residence_age(&clean_label(label)) else {
            continue;
        };
        if let Some(students) = row.int_of(value) {
            ages.insert(age, students);
        }
    }
    let ages: Vec<Value> = ages
        .into_iter()
        .map(|(age, students)| object([("age", age.into()), ("students", students.into())]))
        .collect();

    out.push(Emission::append(
        key,
        "student_residences",
        object([
            ("zip_code", opt(row.text("zip_code"))),
            ("ages", Value::Array(ages)),
        ]),
    ));
}

const SCHOOL_YEARS_PO: &[FieldAlias] = &[
    alias::int("year_1", &["LEERJAAR 1"]),
    alias::int("year_2", &["LEERJAAR 2"]),
    alias::int("year_3", &["LEERJAAR 3"]),
    alias::int("year_4", &["LEERJAAR 4"]),
    alias::int("year_5", &["LEERJAAR 5"]),
    alias::int("year_6", &["LEERJAAR 6"]),
    alias::int("year_7", &["LEERJAAR 7"]),
    alias::int("year_8", &["LEERJAAR 8"]),
];

pub(super) const SCHOOL_YEAR_ALIASES: AliasTable = AliasTable::new(&[BRANCH_KEY, SCHOOL_YEARS_PO]);

pub(super) fn parse_students_by_year(row: &NormalizedRow<'_>, out: &mut Vec<Emission>) {
    if let Some(key) = branch_key(row) {
        let years = present_ints(row, SCHOOL_YEARS_PO);
        out.push(Emission::set(key, "students_by_year", Value::Object(years)));
    }
}

// ---------------------------------------------------------------------------
// Branch level, special education
// ---------------------------------------------------------------------------

const BIRTHYEAR: &[FieldAlias] = &[
    alias::text("spo_law", &["AANDUIDING WET"]),
    alias::text("spo_edu_type", &["SOORT PRIMAIR ONDERWIJS"]),
    alias::text("spo_cluster", &["CLUSTER"]),
];

pub(super) const BIRTHYEAR_ALIASES: AliasTable = AliasTable::new(&[BRANCH_KEY, BIRTHYEAR]);

/// Count columns are labelled "aantal.2005" or just "2005".
pub(super) fn parse_spo_by_birthyear(row: &NormalizedRow<'_>, out: &mut Vec<Emission>) {
    let Some(key) = branch_key(row) else {
        return;
    };
    for field in BIRTHYEAR {
        out.push(Emission::set(
            key.clone(),
            field.canonical,
            opt(row.text(field.canonical)),
        ));
    }

    let mut by_birthyear = Vec::new();
    for (label, value) in row.columns() {
        let Some(year) = label.rsplit('.').next().filter(|part| {
            !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit())
        }) else {
            continue;
        };
        let (Ok(birthyear), Some(students)) = (year.parse::<i64>(), row.int_of(value)) else {
            continue;
        };
        if students > 0 {
            by_birthyear.push(object([
                ("birthyear", birthyear.into()),
                ("students", students.into()),
            ]));
        }
    }
    out.push(Emission::set(
        key,
        "spo_students_by_birthyear",
        Value::Array(by_birthyear),
    ));
}

const SPO_EDU_TYPES: &[FieldAlias] = &[
    alias::text(
        "spo_indication",
        &[
            "INDICATIE SPECIAL BASIS ONDERWIJS",
            "INDICATIE SPECIAAL (BASIS)ONDERWIJS",
        ],
    ),
    alias::int("spo", &["SBAO"]),
    alias::int("so", &["SO"]),
    alias::int("vso", &["VSO"]),
];

pub(super) const SPO_EDU_TYPE_ALIASES: AliasTable = AliasTable::new(&[BRANCH_KEY, SPO_EDU_TYPES]);

pub(super) fn parse_spo_by_edu_type(row: &NormalizedRow<'_>, out: &mut Vec<Emission>) {
    let Some(key) = branch_key(row) else {
        return;
    };
    let mut entry = Map::new();
    entry.insert("spo_indication".into(), opt(row.text("spo_indication")));
    entry.extend(present_ints(row, &SPO_EDU_TYPES[1..]));
    out.push(Emission::append(key, "spo_students_by_edu_type", Value::Object(entry)));
}

const ADVICE: &[FieldAlias] = &[
    alias::int("vso", &["VSO"]),
    alias::int("pro", &["PRO"]),
    alias::int("vmbo_bl", &["VMBO BL"]),
    alias::int("vmbo_bl_kl", &["VMBO BL-KL"]),
    alias::int("vmbo_kl", &["VMBO KL"]),
    alias::int("vmbo_kl_gt", &["VMBO KL-GT"]),
    alias::int("vmbo_gt", &["VMBO GT"]),
    alias::int("vmbo_gt_havo", &["VMBO GT-HAVO"]),
    alias::int("havo", &["HAVO"]),
    alias::int("havo_vwo", &["HAVO-VWO"]),
    alias::int("vwo", &["VWO"]),
    alias::int("unknown", &["ONBEKEND"]),
];

pub(super) const ADVICE_ALIASES: AliasTable = AliasTable::new(&[BRANCH_KEY, ADVICE]);

pub(super) fn parse_students_by_advice(row: &NormalizedRow<'_>, out: &mut Vec<Emission>) {
    if let Some(key) = branch_key(row) {
        let advice = present_ints(row, ADVICE);
        out.push(Emission::append(key, "spo_students_by_advice", Value::Object(advice)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasets::test_support::{appended, run, set_value};
    use serde_json::json;

    fn branch(brin: &str, branch_id: i64) -> EntityKey {
        EntityKey::Branch {
            brin: brin.into(),
            branch_id,
        }
    }

    #[test]
    fn weights_keep_zero_and_drop_redaction() {
        let out = run(
            &WEIGHT_ALIASES,
            parse_weights,
            &[
                ("BRINNUMMER", "AB12"),
                ("VESTIGINSNUMMER", "1"),
                ("GEWICHT0.00", "0"),
                ("GEWICHT0.30", "*"),
                ("IMPULSGEBIED", "1"),
            ],
        );
        assert_eq!(out[0].key, branch("AB12", 1));
        assert_eq!(
            appended(&out, "weights_per_school"),
            vec![&json!({"student_weight_0_0": 0, "student_weight_0_3": null, "impulse_area": true})]
        );
    }

    #[test]
    fn missing_branch_number_skips_row() {
        let out = run(
            &WEIGHT_ALIASES,
            parse_weights,
            &[("BRIN NUMMER", "AB12"), ("VESTIGINGSNUMMER", ""), ("GEWICHT 0", "4")],
        );
        assert!(out.is_empty());

        let out = run(
            &WEIGHT_ALIASES,
            parse_weights,
            &[("BRIN NUMMER", "AB12"), ("VESTIGINGSNUMMER", "x1"), ("GEWICHT 0", "4")],
        );
        assert!(out.is_empty());
    }

    #[test]
    fn ages_accept_every_label_spelling() {
        let out = run(
            &AGE_ALIASES,
            parse_ages_by_weight,
            &[
                ("BRIN NUMMER", "AB12"),
                ("VESTIGINGS NUMMER", "AB1202"),
                ("GEWICHT", "0,3"),
                ("LEEFTIJD 4 JAAR", "12"),
                ("LEEFTIJD.5", ""),
            ],
        );
        assert_eq!(out[0].key, branch("AB12", 2));
        assert_eq!(
            appended(&out, "ages_per_branch_by_student_weight")[0],
            &json!({"student_weight": 0.3, "age_4": 12, "age_5": null})
        );
    }

    #[test]
    fn prognosis_columns() {
        let out = run(
            &AliasTable::new(&[SCHOOL_KEY]),
            parse_prognosis,
            &[
                ("BRIN NUMMER", "AB12"),
                ("AANTAL LEERLINGEN 2012", "800"),
                ("PROGNOSE LWOO PRO 2024", "1.204"),
                ("POGNOSE VO 2025", "90"),
                ("PROGNOSE VO 2026", ""),
            ],
        );
        assert_eq!(
            appended(&out, "students_prognosis"),
            vec![
                &json!({"year": 2024, "structure": "lwoo_pro", "students": 1204}),
                &json!({"year": 2025, "structure": "vo", "students": 90}),
            ]
        );
    }

    #[test]
    fn dropouts_sector_not_applicable() {
        let out = run(
            &DROPOUT_ALIASES,
            parse_dropouts,
            &[
                ("BRIN NUMMER", "AB12"),
                ("JAAR", "2011"),
                ("AANTAL DEELNEMERS", "1.020"),
                ("AANTAL VSV ERS MET MBO1 DIPLOMA", "3"),
                ("PROFIEL", "NVT"),
            ],
        );
        let entry = appended(&out, "dropouts_per_year")[0];
        assert_eq!(entry["total_students"], json!(1020));
        assert_eq!(entry["dropouts_with_mbo1_diploma"], json!(3));
        assert_eq!(entry["total_dropouts"], Value::Null);
        assert_eq!(entry["sector"], Value::Null);
    }

    #[test]
    fn structure_years_sum_present_counts() {
        let out = run(
            &STRUCTURE_ALIASES,
            parse_students_by_structure,
            &[
                ("BRIN NUMMER", "AB12"),
                ("VESTIGINGSNUMMER", "AB1200"),
                ("AFDELING", "n.v.t."),
                ("LWOO INDICATIE", "J"),
                ("LEER- OF VERBLIJFSJAAR 1 - MAN", "10"),
                ("LEER- OF VERBLIJFSJAAR 1 - VROUW", "12"),
                ("LEER- OF VERBLIJFSJAAR 2 - MAN", "*"),
            ],
        );
        let entry = appended(&out, "students_by_structure")[0];
        assert_eq!(entry["department"], Value::Null);
        assert_eq!(entry["lwoo"], json!(true));
        assert_eq!(entry["year_1"], json!({"male": 10, "female": 12, "total": 22}));
        assert_eq!(entry["year_2"], json!({"male": null, "female": null, "total": null}));
    }

    #[test]
    fn flow_goes_both_ways() {
        let cells = [
            ("BRIN NUMMER PO", "AB12"),
            ("VESTIGINGSNUMMER PO", "0"),
            ("BRIN NUMMER VO", "CD34"),
            ("VESTIGINGSNUMMER VO", "2"),
            ("AANTAL DOORSTROMERS", "17"),
        ];
        let po = run(&FLOW_ALIASES, parse_po_student_flow, &cells);
        assert_eq!(po[0].key, branch("AB12", 0));
        assert_eq!(
            appended(&po, "student_flow"),
            vec![&json!({"to_vo_brin": "CD34", "to_vo_branch_id": 2, "out_flow": 17})]
        );

        let vo = run(&FLOW_ALIASES, parse_vo_student_flow, &cells);
        assert_eq!(vo[0].key, branch("CD34", 2));
        assert_eq!(
            appended(&vo, "student_flow"),
            vec![&json!({"from_po_brin": "AB12", "from_po_branch_id": 0, "in_flow": 17})]
        );
    }

    #[test]
    fn origins_are_one_list() {
        let out = run(
            &ORIGIN_ALIASES,
            parse_students_by_origin,
            &[
                ("BRIN NUMMER", "AB12"),
                ("VESTIGINGSNUMMER", "1"),
                ("MAROKKO", "4"),
                ("TURKIJE", ""),
            ],
        );
        assert_eq!(
            set_value(&out, "students_by_origin"),
            Some(&json!([
                {"country": "morocco", "students": 4},
                {"country": "turkey", "students": null}
            ]))
        );
    }

    #[test]
    fn birthyears_only_positive() {
        let out = run(
            &BIRTHYEAR_ALIASES,
            parse_spo_by_birthyear,
            &[
                ("BRIN NUMMER", "AB12"),
                ("VESTIGINGSNUMMER", "1"),
                ("AANDUIDING WET", "WEC"),
                ("CLUSTER", "3"),
                ("aantal.2005", "4"),
                ("2006", "0"),
                ("TOTAAL", "4"),
            ],
        );
        assert_eq!(set_value(&out, "spo_law"), Some(&json!("WEC")));
        assert_eq!(set_value(&out, "spo_edu_type"), Some(&Value::Null));
        assert_eq!(
            set_value(&out, "spo_students_by_birthyear"),
            Some(&json!([{"birthyear": 2005, "students": 4}]))
        );
    }

    #[test]
    fn po_residences_collect_ages() {
        let out = run(
            &PO_RESIDENCE_ALIASES,
            parse_po_residences,
            &[
                ("BRIN_NUMMER", "AB12"),
                ("VESTIGINGSNUMMER", "1"),
                ("POSTCODE_LEERLING", "1234"),
                ("LEEFTIJD_5_JAAR", "2"),
                ("LEEFTIJD_4_JAAR", "3"),
                ("LEEFTIJD_30_JAAR", "1"),
            ],
        );
        assert_eq!(
            appended(&out, "student_residences"),
            vec![&json!({
                "zip_code": "1234",
                "ages": [{"age": 4, "students": 3}, {"age": 5, "students": 2}]
            })]
        );
    }

    #[test]
    fn vo_residence_city_capitalized() {
        assert_eq!(capitalize("'S-GRAVENHAGE"), "'s-gravenhage");
        assert_eq!(capitalize("UTRECHT"), "Utrecht");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn finegrained_types() {
        let out = run(
            &AliasTable::new(&[BRANCH_KEY]),
            parse_finegrained_structure,
            &[
                ("BRIN NUMMER", "AB12"),
                ("VESTIGINGSNUMMER", "AB1201"),
                ("Brugjaar 1-2 ", "120"),
                ("VWO lj 4-6", "*"),
                ("Onbekend", "3"),
            ],
        );
        assert_eq!(
            appended(&out, "students_by_finegrained_structure"),
            vec![&json!({"type": "Brugjaar 1-2", "count": 120})]
        );
    }

    #[test]
    fn memberships_normalize_ids() {
        let out = run(
            &MEMBERSHIP_ALIASES,
            parse_pao_collaboration,
            &[("BRINNUMMER", "AB12"), ("ADMINISTRATIENUMMER", "PO 23-01")],
        );
        assert_eq!(out[0].key, EntityKey::School { brin: "AB12".into() });
        assert_eq!(appended(&out, "pao_collaboration"), vec![&json!("PO 23-1")]);
    }
}
