//! Row parser strategies, one per published dataset.
//!
//! Every dataset is a [`DatasetDef`] in the static [`DATASETS`] table: how its
//! file is laid out, which canonical fields its alias table resolves, and a
//! plain `fn` turning one normalized row into emissions. Parsers only read
//! their row; all grouping happens in the merger.

mod addresses;
mod bron;
mod exams;
mod finance;
mod staff;
mod students;

use duodata_io::TableLayout;
use serde_json::{Map, Value};

use crate::alias::{self, AliasTable, FieldAlias};
use crate::model::{EntityKey, EntityKind, Emission};
use crate::normalize::NormalizedRow;

pub type ParseFn = fn(&NormalizedRow<'_>, &mut Vec<Emission>);

/// Root of the listing pages named in [`DatasetDef::listings`].
pub const LISTING_ROOT: &str = "http://data.duo.nl/organisatie/open_onderwijsdata/databestanden/";

/// A workbook sheet whose header spans `rows` merged rows.
#[derive(Debug, Clone, Copy)]
pub struct SheetHeader {
    pub sheet: &'static str,
    pub rows: usize,
}

#[derive(Debug, Clone, Copy)]
pub enum Layout {
    /// Single header row, optionally a named sheet, preamble or fixed header.
    Table(TableLayout<'static>),
    /// Named sheets with multi-row headers, forward-filled and joined.
    StackedHeader(&'static [SheetHeader]),
}

#[derive(Debug, Clone, Copy)]
pub struct DatasetDef {
    pub id: &'static str,
    /// Field group the dataset fills on its entity.
    pub field: &'static str,
    pub entity: EntityKind,
    /// File extension looked for on the listing pages.
    pub extension: &'static str,
    /// Listing pages, relative to [`LISTING_ROOT`].
    pub listings: &'static [&'static str],
    pub layout: Layout,
    pub aliases: AliasTable,
    pub parse: ParseFn,
}

impl DatasetDef {
    /// Absolute URLs of the listing pages this dataset's files are found on.
    pub fn listing_urls(&self) -> Vec<String> {
        self.listings
            .iter()
            .map(|page| format!("{}{}", LISTING_ROOT, page))
            .collect()
    }
}

pub fn lookup(id: &str) -> Option<&'static DatasetDef> {
    DATASETS.iter().find(|def| def.id == id)
}

// ---------------------------------------------------------------------------
// Layouts
// ---------------------------------------------------------------------------

const TABLE: Layout = Layout::Table(TableLayout {
    sheet: None,
    skip_rows: 0,
    headers: None,
});

const fn sheet(name: &'static str) -> Layout {
    Layout::Table(TableLayout {
        sheet: Some(name),
        skip_rows: 0,
        headers: None,
    })
}

const STAFF_SHEET: Layout = sheet("per owtype-bestuur-brin-functie");
const COURSE_SHEET: Layout = sheet("per bestuur-brin-vak-graad");

// ---------------------------------------------------------------------------
// Shared key columns
// ---------------------------------------------------------------------------

pub(crate) const BRIN: &[&str] = &["BRIN NUMMER", "BRINNUMMER", "BRIN_NUMMER", "BRIN"];
pub(crate) const BRANCH: &[&str] = &[
    "VESTIGINGSNUMMER",
    "VESTIGINSNUMMER",
    "VESTIGINGS NUMMER",
    "VESTIGINS NUMMER",
];
pub(crate) const BOARD: &[&str] = &["BEVOEGD GEZAG NUMMER"];

pub(crate) const SCHOOL_KEY: &[FieldAlias] = &[alias::text("brin", BRIN)];
pub(crate) const BRANCH_KEY: &[FieldAlias] = &[
    alias::text("brin", BRIN),
    alias::raw("branch_id", BRANCH),
];
pub(crate) const BOARD_KEY: &[FieldAlias] = &[alias::int("board_id", BOARD)];

pub(crate) fn board_key(row: &NormalizedRow<'_>) -> Option<EntityKey> {
    Some(EntityKey::Board {
        board_id: row.int("board_id")?,
    })
}

pub(crate) fn school_key(row: &NormalizedRow<'_>) -> Option<EntityKey> {
    Some(EntityKey::School {
        brin: row.text("brin")?.to_string(),
    })
}

pub(crate) fn branch_key(row: &NormalizedRow<'_>) -> Option<EntityKey> {
    let brin = row.text("brin")?;
    let branch_id = branch_number(row, brin, row.raw("branch_id")?)?;
    Some(EntityKey::Branch {
        brin: brin.to_string(),
        branch_id,
    })
}

/// Branch number with an optional institution code prefix (`"AB1201"` is 1).
/// Empty is missing; anything else that does not parse is a counted failure.
pub(crate) fn branch_number(row: &NormalizedRow<'_>, brin: &str, value: &str) -> Option<i64> {
    let value = value.trim();
    let digits = value.strip_prefix(brin).unwrap_or(value);
    if digits.is_empty() {
        return None;
    }
    row.int_of(digits)
}

// ---------------------------------------------------------------------------
// Payload helpers
// ---------------------------------------------------------------------------

/// Insert only when the value is present.
pub(crate) fn insert_some<T: Into<Value>>(map: &mut Map<String, Value>, key: &str, value: Option<T>) {
    if let Some(value) = value {
        map.insert(key.to_string(), value.into());
    }
}

/// Value for an optional field: absent becomes `null`.
pub(crate) fn opt<T: Into<Value>>(value: Option<T>) -> Value {
    value.map(Into::into).unwrap_or(Value::Null)
}

/// `"n.v.t."` (not applicable) and `"NVT"` read as absent.
pub(crate) fn applicable(value: Option<&str>) -> Option<&str> {
    value.filter(|v| {
        let v = v.to_ascii_lowercase();
        v != "n.v.t." && v != "nvt"
    })
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

pub static DATASETS: &[DatasetDef] = &[
    // Boards
    DatasetDef {
        id: "vo_boards",
        field: "addresses",
        entity: EntityKind::Board,
        extension: "csv",
        listings: &["vo/adressen/Adressen/besturen.asp"],
        layout: TABLE,
        aliases: addresses::BOARD_ALIASES,
        parse: addresses::parse_board,
    },
    DatasetDef {
        id: "po_boards",
        field: "addresses",
        entity: EntityKind::Board,
        extension: "csv",
        listings: &["po/adressen/Adressen/po_adressen05.asp"],
        layout: TABLE,
        aliases: addresses::BOARD_ALIASES,
        parse: addresses::parse_board,
    },
    DatasetDef {
        id: "vo_financial_key_indicators",
        field: "financial_key_indicators_per_year",
        entity: EntityKind::Board,
        extension: "csv",
        listings: &["vo/Financien/Financien/Kengetallen.asp"],
        layout: TABLE,
        aliases: finance::INDICATOR_ALIASES,
        parse: finance::parse_key_indicators,
    },
    DatasetDef {
        id: "po_financial_key_indicators",
        field: "financial_key_indicators_per_year",
        entity: EntityKind::Board,
        extension: "csv",
        listings: &["po/Financien/Jaarrekeninggegevens/Kengetallen.asp"],
        layout: TABLE,
        aliases: finance::INDICATOR_ALIASES,
        parse: finance::parse_key_indicators,
    },
    DatasetDef {
        id: "vo_board_vavo_students",
        field: "vavo_students",
        entity: EntityKind::Board,
        extension: "csv",
        listings: &["vo/leerlingen/Leerlingen/vo_leerlingen4.asp"],
        layout: TABLE,
        aliases: finance::BOARD_VAVO_ALIASES,
        parse: finance::parse_board_vavo,
    },
    DatasetDef {
        id: "po_edu_types",
        field: "edu_types",
        entity: EntityKind::Board,
        extension: "csv",
        listings: &["po/Leerlingen/Leerlingen/po_leerlingen7.asp"],
        layout: TABLE,
        aliases: finance::EDU_TYPE_ALIASES,
        parse: finance::parse_edu_types,
    },
    DatasetDef {
        id: "vo_board_staff",
        field: "staff",
        entity: EntityKind::Board,
        extension: "xls",
        listings: &["vo/personeel/Personeel/vo_personeel_personen.asp"],
        layout: STAFF_SHEET,
        aliases: staff::STAFF_ALIASES,
        parse: staff::parse_board_staff,
    },
    DatasetDef {
        id: "vo_board_fte",
        field: "fte",
        entity: EntityKind::Board,
        extension: "xls",
        listings: &["vo/personeel/Personeel/vo_personeel_fte.asp"],
        layout: STAFF_SHEET,
        aliases: staff::STAFF_ALIASES,
        parse: staff::parse_board_fte,
    },
    DatasetDef {
        id: "po_board_staff",
        field: "staff",
        entity: EntityKind::Board,
        extension: "xls",
        listings: &["po/Onderwijspersoneel/Personeel/po_personeel_personen.asp"],
        layout: STAFF_SHEET,
        aliases: staff::STAFF_ALIASES,
        parse: staff::parse_board_staff,
    },
    DatasetDef {
        id: "po_board_fte",
        field: "fte",
        entity: EntityKind::Board,
        extension: "xls",
        listings: &["po/Onderwijspersoneel/Personeel/po_personeel_fte.asp"],
        layout: STAFF_SHEET,
        aliases: staff::STAFF_ALIASES,
        parse: staff::parse_board_fte,
    },
    // Schools
    DatasetDef {
        id: "vo_schools",
        field: "addresses",
        entity: EntityKind::School,
        extension: "csv",
        listings: &["vo/adressen/Adressen/hoofdvestigingen.asp"],
        layout: TABLE,
        aliases: addresses::SCHOOL_ALIASES,
        parse: addresses::parse_school,
    },
    DatasetDef {
        id: "po_schools",
        field: "addresses",
        entity: EntityKind::School,
        extension: "csv",
        listings: &["po/adressen/Adressen/hoofdvestigingen.asp"],
        layout: TABLE,
        aliases: addresses::SCHOOL_ALIASES,
        parse: addresses::parse_school,
    },
    DatasetDef {
        id: "vo_dropouts",
        field: "dropouts_per_year",
        entity: EntityKind::School,
        extension: "csv",
        listings: &["vschoolverlaten/vsv_voortgezet.asp"],
        layout: TABLE,
        aliases: students::DROPOUT_ALIASES,
        parse: students::parse_dropouts,
    },
    DatasetDef {
        id: "vo_students_prognosis",
        field: "students_prognosis",
        entity: EntityKind::School,
        extension: "csv",
        listings: &["vo/leerlingen/Leerlingen/vo_leerlingen11.asp"],
        layout: TABLE,
        aliases: AliasTable::new(&[SCHOOL_KEY]),
        parse: students::parse_prognosis,
    },
    DatasetDef {
        id: "vo_lo_collaboration",
        field: "vo_lo_collaboration",
        entity: EntityKind::School,
        extension: "csv",
        listings: &["passendow/Adressen/Adressen/passend_vo_6.asp"],
        layout: TABLE,
        aliases: students::MEMBERSHIP_ALIASES,
        parse: students::parse_vo_lo_collaboration,
    },
    DatasetDef {
        id: "vo_pao_collaboration",
        field: "pao_collaboration",
        entity: EntityKind::School,
        extension: "csv",
        listings: &["passendow/Adressen/Adressen/passend_vo_8.asp"],
        layout: TABLE,
        aliases: students::MEMBERSHIP_ALIASES,
        parse: students::parse_pao_collaboration,
    },
    DatasetDef {
        id: "po_lo_collaboration",
        field: "po_lo_collaboration",
        entity: EntityKind::School,
        extension: "csv",
        listings: &["passendow/Adressen/Adressen/passend_po_2.asp"],
        layout: TABLE,
        aliases: students::MEMBERSHIP_ALIASES,
        parse: students::parse_po_lo_collaboration,
    },
    DatasetDef {
        id: "po_pao_collaboration",
        field: "pao_collaboration",
        entity: EntityKind::School,
        extension: "csv",
        listings: &["passendow/Adressen/Adressen/passend_po_4.asp"],
        layout: TABLE,
        aliases: students::MEMBERSHIP_ALIASES,
        parse: students::parse_pao_collaboration,
    },
    DatasetDef {
        id: "po_spo_students_per_cluster",
        field: "spo_students_per_cluster",
        entity: EntityKind::School,
        extension: "csv",
        listings: &["po/Leerlingen/Leerlingen/po_leerlingen4.asp"],
        layout: TABLE,
        aliases: students::CLUSTER_ALIASES,
        parse: students::parse_students_per_cluster,
    },
    DatasetDef {
        id: "vo_school_staff",
        field: "staff",
        entity: EntityKind::School,
        extension: "xls",
        listings: &["vo/personeel/Personeel/vo_personeel_personen.asp"],
        layout: STAFF_SHEET,
        aliases: staff::STAFF_ALIASES,
        parse: staff::parse_school_staff,
    },
    DatasetDef {
        id: "vo_school_fte",
        field: "fte",
        entity: EntityKind::School,
        extension: "xls",
        listings: &["vo/personeel/Personeel/vo_personeel_fte.asp"],
        layout: STAFF_SHEET,
        aliases: staff::STAFF_ALIASES,
        parse: staff::parse_school_fte,
    },
    DatasetDef {
        id: "po_school_staff",
        field: "staff",
        entity: EntityKind::School,
        extension: "xls",
        listings: &["po/Onderwijspersoneel/Personeel/po_personeel_personen.asp"],
        layout: STAFF_SHEET,
        aliases: staff::STAFF_ALIASES,
        parse: staff::parse_school_staff,
    },
    DatasetDef {
        id: "po_school_fte",
        field: "fte",
        entity: EntityKind::School,
        extension: "xls",
        listings: &["po/Onderwijspersoneel/Personeel/po_personeel_fte.asp"],
        layout: STAFF_SHEET,
        aliases: staff::STAFF_ALIASES,
        parse: staff::parse_school_fte,
    },
    DatasetDef {
        id: "vo_staff_per_course",
        field: "staff_per_course",
        entity: EntityKind::School,
        extension: "xls",
        listings: &["vo/personeel/Personeel/vo_personeel_3.asp"],
        layout: COURSE_SHEET,
        aliases: staff::COURSE_ALIASES,
        parse: staff::parse_staff_per_course,
    },
    DatasetDef {
        id: "vo_time_per_course",
        field: "time_per_course",
        entity: EntityKind::School,
        extension: "xls",
        listings: &["vo/personeel/Personeel/vo_personeel_4.asp"],
        layout: COURSE_SHEET,
        aliases: staff::COURSE_ALIASES,
        parse: staff::parse_time_per_course,
    },
    // Branches
    DatasetDef {
        id: "vo_branches",
        field: "addresses",
        entity: EntityKind::Branch,
        extension: "csv",
        listings: &["vo/adressen/Adressen/vestigingen.asp"],
        layout: TABLE,
        aliases: addresses::BRANCH_ALIASES,
        parse: addresses::parse_branch,
    },
    DatasetDef {
        id: "po_branches",
        field: "addresses",
        entity: EntityKind::Branch,
        extension: "csv",
        listings: &["po/adressen/Adressen/vest_bo.asp"],
        layout: TABLE,
        aliases: addresses::BRANCH_ALIASES,
        parse: addresses::parse_branch,
    },
    DatasetDef {
        id: "vo_student_residences",
        field: "student_residences",
        entity: EntityKind::Branch,
        extension: "csv",
        listings: &["vo/leerlingen/Leerlingen/vo_leerlingen2.asp"],
        layout: TABLE,
        aliases: students::VO_RESIDENCE_ALIASES,
        parse: students::parse_vo_residences,
    },
    DatasetDef {
        id: "vo_students_by_structure",
        field: "students_by_structure",
        entity: EntityKind::Branch,
        extension: "csv",
        listings: &["vo/leerlingen/Leerlingen/vo_leerlingen1.asp"],
        layout: TABLE,
        aliases: students::STRUCTURE_ALIASES,
        parse: students::parse_students_by_structure,
    },
    DatasetDef {
        id: "vo_graduations",
        field: "graduations",
        entity: EntityKind::Branch,
        extension: "csv",
        listings: &["vo/leerlingen/Leerlingen/vo_leerlingen6.asp"],
        layout: TABLE,
        aliases: exams::GRADUATION_ALIASES,
        parse: exams::parse_graduations,
    },
    DatasetDef {
        id: "vo_exam_grades",
        field: "exam_grades",
        entity: EntityKind::Branch,
        extension: "csv",
        listings: &["vo/leerlingen/Leerlingen/vo_leerlingen7.asp"],
        layout: TABLE,
        aliases: exams::EXAM_GRADE_ALIASES,
        parse: exams::parse_exam_grades,
    },
    DatasetDef {
        id: "vmbo_exam_grades_per_course",
        field: "vmbo_exam_grades_per_course",
        entity: EntityKind::Branch,
        extension: "csv",
        listings: &["vo/leerlingen/Leerlingen/vo_leerlingen8.asp"],
        layout: TABLE,
        aliases: exams::COURSE_GRADE_ALIASES,
        parse: exams::parse_vmbo_grades_per_course,
    },
    DatasetDef {
        id: "havo_exam_grades_per_course",
        field: "havo_exam_grades_per_course",
        entity: EntityKind::Branch,
        extension: "csv",
        listings: &["vo/leerlingen/Leerlingen/vo_leerlingen9.asp"],
        layout: TABLE,
        aliases: exams::COURSE_GRADE_ALIASES,
        parse: exams::parse_grades_per_course,
    },
    DatasetDef {
        id: "vwo_exam_grades_per_course",
        field: "vwo_exam_grades_per_course",
        entity: EntityKind::Branch,
        extension: "csv",
        listings: &["vo/leerlingen/Leerlingen/vo_leerlingen10.asp"],
        layout: TABLE,
        aliases: exams::COURSE_GRADE_ALIASES,
        parse: exams::parse_grades_per_course,
    },
    DatasetDef {
        id: "vo_branch_vavo_students",
        field: "vavo_students",
        entity: EntityKind::Branch,
        extension: "csv",
        listings: &["vo/leerlingen/Leerlingen/vo_leerlingen3.asp"],
        layout: TABLE,
        aliases: finance::BRANCH_VAVO_ALIASES,
        parse: finance::parse_branch_vavo,
    },
    DatasetDef {
        id: "vo_students_by_finegrained_structure",
        field: "students_by_finegrained_structure",
        entity: EntityKind::Branch,
        extension: "csv",
        listings: &["vo/leerlingen/Leerlingen/vo_leerlingen5.asp"],
        layout: TABLE,
        aliases: AliasTable::new(&[BRANCH_KEY]),
        parse: students::parse_finegrained_structure,
    },
    DatasetDef {
        id: "vo_student_flow",
        field: "student_flow",
        entity: EntityKind::Branch,
        extension: "csv",
        listings: &["Stroom/doorstromers/doorstromers/po_vo.asp"],
        layout: students::FLOW_LAYOUT,
        aliases: students::FLOW_ALIASES,
        parse: students::parse_vo_student_flow,
    },
    DatasetDef {
        id: "po_student_flow",
        field: "student_flow",
        entity: EntityKind::Branch,
        extension: "csv",
        listings: &["Stroom/doorstromers/doorstromers/po_vo.asp"],
        layout: students::FLOW_LAYOUT,
        aliases: students::FLOW_ALIASES,
        parse: students::parse_po_student_flow,
    },
    DatasetDef {
        id: "po_weights_per_school",
        field: "weights_per_school",
        entity: EntityKind::Branch,
        extension: "csv",
        listings: &["po/Leerlingen/Leerlingen/po_leerlingen1.asp"],
        layout: TABLE,
        aliases: students::WEIGHT_ALIASES,
        parse: students::parse_weights,
    },
    DatasetDef {
        id: "po_ages_per_branch",
        field: "ages_per_branch_by_student_weight",
        entity: EntityKind::Branch,
        extension: "csv",
        listings: &["po/Leerlingen/Leerlingen/po_leerlingen3.asp"],
        layout: TABLE,
        aliases: students::AGE_ALIASES,
        parse: students::parse_ages_by_weight,
    },
    DatasetDef {
        id: "po_students_by_origin",
        field: "students_by_origin",
        entity: EntityKind::Branch,
        extension: "csv",
        listings: &["po/Leerlingen/Leerlingen/po_leerlingen9.asp"],
        layout: TABLE,
        aliases: students::ORIGIN_ALIASES,
        parse: students::parse_students_by_origin,
    },
    DatasetDef {
        id: "po_student_residences",
        field: "student_residences",
        entity: EntityKind::Branch,
        extension: "zip",
        listings: &["po/Leerlingen/Leerlingen/po_leerlingen11.asp"],
        layout: TABLE,
        aliases: students::PO_RESIDENCE_ALIASES,
        parse: students::parse_po_residences,
    },
    DatasetDef {
        id: "po_students_by_year",
        field: "students_by_year",
        entity: EntityKind::Branch,
        extension: "csv",
        listings: &["po/Leerlingen/Leerlingen/leerjaar.asp"],
        layout: TABLE,
        aliases: students::SCHOOL_YEAR_ALIASES,
        parse: students::parse_students_by_year,
    },
    DatasetDef {
        id: "po_spo_students_by_birthyear",
        field: "spo_students_by_birthyear",
        entity: EntityKind::Branch,
        extension: "csv",
        listings: &["po/Leerlingen/Leerlingen/po_leerlingen5.asp"],
        layout: TABLE,
        aliases: students::BIRTHYEAR_ALIASES,
        parse: students::parse_spo_by_birthyear,
    },
    DatasetDef {
        id: "po_spo_students_by_edu_type",
        field: "spo_students_by_edu_type",
        entity: EntityKind::Branch,
        extension: "csv",
        listings: &["po/Leerlingen/Leerlingen/po_leerlingen6.asp"],
        layout: TABLE,
        aliases: students::SPO_EDU_TYPE_ALIASES,
        parse: students::parse_spo_by_edu_type,
    },
    DatasetDef {
        id: "po_spo_students_by_advice",
        field: "spo_students_by_advice",
        entity: EntityKind::Branch,
        extension: "csv",
        listings: &["po/Leerlingen/Leerlingen/Schooladvies.asp"],
        layout: TABLE,
        aliases: students::ADVICE_ALIASES,
        parse: students::parse_students_by_advice,
    },
    DatasetDef {
        id: "po_students_in_bron",
        field: "students_in_bron",
        entity: EntityKind::Branch,
        extension: "xls",
        listings: &["po/Leerlingen/Leerlingen/po_leerlingen26-10.asp"],
        layout: Layout::StackedHeader(bron::SHEETS),
        aliases: AliasTable::new(&[bron::KEY]),
        parse: bron::parse_students_in_bron,
    },
    // Collaborations
    DatasetDef {
        id: "collaborations",
        field: "addresses",
        entity: EntityKind::Collaboration,
        extension: "csv",
        listings: &[
            "passendow/Adressen/Adressen/passend_po_1.asp",
            "passendow/Adressen/Adressen/passend_po_3.asp",
            "passendow/Adressen/Adressen/passend_vo_1.asp",
            "passendow/Adressen/Adressen/passend_vo_7.asp",
        ],
        layout: TABLE,
        aliases: addresses::COLLABORATION_ALIASES,
        parse: addresses::parse_collaboration,
    },
];
