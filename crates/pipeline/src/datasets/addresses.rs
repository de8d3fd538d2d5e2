// Address listings for boards, schools, branches and collaborations.
//
// One row describes one entity; every field becomes a scalar Set. Columns a
// publication year does not carry are left out entirely, present but empty
// cells become null.

use serde_json::{json, Value};

use super::{board_key, branch_key, opt, school_key, BOARD, BRANCH_KEY, SCHOOL_KEY};
use crate::alias::{self, AliasTable, FieldAlias};
use crate::model::{EntityKey, Emission};
use crate::normalize::NormalizedRow;

const CONTACT: &[FieldAlias] = &[
    alias::text("street_name", &["STRAATNAAM"]),
    alias::text("house_number", &["HUISNUMMER-TOEVOEGING"]),
    alias::text("zip_code", &["POSTCODE"]),
    alias::text("city", &["PLAATSNAAM"]),
    alias::text("correspondence_street_name", &["STRAATNAAM CORRESPONDENTIEADRES"]),
    alias::text(
        "correspondence_house_number",
        &["HUISNUMMER-TOEVOEGING CORRESPONDENTIEADRES"],
    ),
    alias::text("correspondence_zip_code", &["POSTCODE CORRESPONDENTIEADRES"]),
    alias::text("correspondence_city", &["PLAATSNAAM CORRESPONDENTIEADRES"]),
    alias::text("municipality", &["GEMEENTENAAM"]),
    alias::int("municipality_code", &["GEMEENTENUMMER"]),
    alias::text("phone", &["TELEFOONNUMMER"]),
    alias::text("website", &["INTERNETADRES"]),
    alias::text("denomination", &["DENOMINATIE"]),
];

const REGIONS: &[FieldAlias] = &[
    alias::text("education_structures", &["ONDERWIJSSTRUCTUUR"]),
    alias::text("province", &["PROVINCIE"]),
    alias::text("nodal_area", &["NODAAL GEBIED NAAM"]),
    alias::int("nodal_area_code", &["NODAAL GEBIED CODE"]),
    alias::text("rpa_area", &["RPA-GEBIED NAAM"]),
    alias::int("rpa_area_code", &["RPA-GEBIED CODE"]),
    alias::text("wgr_area", &["WGR-GEBIED NAAM"]),
    alias::int("wgr_area_code", &["WGR-GEBIED CODE"]),
    alias::text("corop_area", &["COROPGEBIED NAAM"]),
    alias::int("corop_area_code", &["COROPGEBIED CODE"]),
    alias::text("education_area", &["ONDERWIJSGEBIED NAAM"]),
    alias::int("education_area_code", &["ONDERWIJSGEBIED CODE"]),
    alias::text("rmc_region", &["RMC-REGIO NAAM"]),
    alias::int("rmc_region_code", &["RMC-REGIO CODE"]),
];

const BOARD_FIELDS: &[FieldAlias] = &[
    alias::int("board_id", BOARD),
    alias::text("name", &["BEVOEGD GEZAG NAAM"]),
    alias::int("administrative_office_id", &["ADMINISTRATIEKANTOORNUMMER"]),
];
const SCHOOL_FIELDS: &[FieldAlias] = &[
    alias::int("board_id", BOARD),
    alias::text("name", &["INSTELLINGSNAAM"]),
];
const BRANCH_FIELDS: &[FieldAlias] = &[
    alias::int("board_id", BOARD),
    alias::text("name", &["VESTIGINGSNAAM"]),
];
const COLLABORATION_FIELDS: &[FieldAlias] = &[
    alias::raw("collaboration_id", &["ADMINISTRATIENUMMER"]),
    alias::text("name", &["SAMENWERKINGSVERBAND"]),
    alias::text("street", &["ADRES"]),
    alias::text("city", &["PLAATSNAAM"]),
    alias::text("zip_code", &["POSTCODE"]),
    alias::text("correspondence_street", &["CORRESPONDENTIEADRES"]),
    alias::text("correspondence_city", &["PLAATS CORRESPONDENTIEADRES"]),
    alias::text("correspondence_zip_code", &["POSTCODE CORRESPONDENTIEADRES"]),
];

pub(super) const BOARD_ALIASES: AliasTable = AliasTable::new(&[BOARD_FIELDS, CONTACT]);
pub(super) const SCHOOL_ALIASES: AliasTable =
    AliasTable::new(&[SCHOOL_KEY, SCHOOL_FIELDS, CONTACT, REGIONS]);
pub(super) const BRANCH_ALIASES: AliasTable =
    AliasTable::new(&[BRANCH_KEY, BRANCH_FIELDS, CONTACT, REGIONS]);
pub(super) const COLLABORATION_ALIASES: AliasTable = AliasTable::new(&[COLLABORATION_FIELDS]);

const TEXT_FIELDS: &[&str] = &[
    "name",
    "municipality",
    "phone",
    "website",
    "denomination",
    "province",
    "nodal_area",
    "rpa_area",
    "wgr_area",
    "corop_area",
    "education_area",
    "rmc_region",
];

const INT_FIELDS: &[&str] = &[
    "municipality_code",
    "administrative_office_id",
    "nodal_area_code",
    "rpa_area_code",
    "wgr_area_code",
    "corop_area_code",
    "education_area_code",
    "rmc_region_code",
];

pub(super) fn parse_board(row: &NormalizedRow<'_>, out: &mut Vec<Emission>) {
    if let Some(key) = board_key(row) {
        emit_listing(row, key, out);
    }
}

pub(super) fn parse_school(row: &NormalizedRow<'_>, out: &mut Vec<Emission>) {
    if let Some(key) = school_key(row) {
        emit_listing(row, key, out);
    }
}

pub(super) fn parse_branch(row: &NormalizedRow<'_>, out: &mut Vec<Emission>) {
    if let Some(key) = branch_key(row) {
        emit_listing(row, key, out);
    }
}

fn emit_listing(row: &NormalizedRow<'_>, key: EntityKey, out: &mut Vec<Emission>) {
    // Board listings carry their id in the key
    if !matches!(key, EntityKey::Board { .. }) && row.has_column("board_id") {
        out.push(Emission::set(key.clone(), "board_id", opt(row.int("board_id"))));
    }

    if row.has_column("street_name") || row.has_column("zip_code") {
        out.push(Emission::set(key.clone(), "address", address(row, "")));
    }
    if row.has_column("correspondence_street_name") {
        out.push(Emission::set(
            key.clone(),
            "correspondence_address",
            address(row, "correspondence_"),
        ));
    }

    for &name in TEXT_FIELDS {
        if row.has_column(name) {
            out.push(Emission::set(key.clone(), name, opt(row.text(name))));
        }
    }
    for &name in INT_FIELDS {
        if row.has_column(name) {
            out.push(Emission::set(key.clone(), name, opt(row.int(name))));
        }
    }

    if row.has_column("education_structures") {
        let structures = row
            .text("education_structures")
            .map(|s| s.split('/').map(|p| Value::from(p.trim())).collect::<Vec<_>>());
        out.push(Emission::set(key, "education_structures", opt(structures)));
    }
}

/// `prefix` selects the visiting (`""`) or correspondence address columns.
fn address(row: &NormalizedRow<'_>, prefix: &str) -> Value {
    let field = |name: &str| format!("{prefix}{name}");
    let street = row.text(&field("street_name")).map(|street| {
        match row.text(&field("house_number")) {
            Some(number) => format!("{street} {number}"),
            None => street.to_string(),
        }
    });
    json!({
        "street": street,
        "zip_code": row.text(&field("zip_code")).map(compact_zip),
        "city": row.text(&field("city")),
    })
}

fn compact_zip(zip: &str) -> String {
    zip.chars().filter(|c| !c.is_whitespace()).collect()
}

pub(super) fn parse_collaboration(row: &NormalizedRow<'_>, out: &mut Vec<Emission>) {
    let Some(id) = row.text("collaboration_id") else {
        return;
    };
    let key = EntityKey::Collaboration {
        collaboration_id: normalize_collaboration_id(id),
    };

    out.push(Emission::set(key.clone(), "name", opt(row.text("name"))));
    out.push(Emission::set(
        key.clone(),
        "address",
        json!({
            "street": row.text("street"),
            "city": row.text("city"),
            "zip_code": row.text("zip_code").map(compact_zip),
        }),
    ));
    out.push(Emission::set(
        key,
        "correspondence_address",
        json!({
            "street": row.text("correspondence_street"),
            "city": row.text("correspondence_city"),
            "zip_code": row.text("correspondence_zip_code").map(compact_zip),
        }),
    ));
}

/// Collaboration numbers are written with and without leading zeros
/// (`"PO-2301"`, `"23-01"`); numeric dash parts are rendered as integers so
/// both spellings give the same key.
pub(crate) fn normalize_collaboration_id(id: &str) -> String {
    let id = id.trim();
    if !id.contains('-') {
        return id.to_string();
    }
    id.split('-')
        .map(|part| {
            let part = part.trim();
            match part.parse::<u64>() {
                Ok(n) if part.bytes().all(|b| b.is_ascii_digit()) => n.to_string(),
                _ => part.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasets::test_support::{run, set_value as field};
    use serde_json::json;

    #[test]
    fn board_listing() {
        let out = run(
            &BOARD_ALIASES,
            parse_board,
            &[
                ("BEVOEGD GEZAG NUMMER", "41234"),
                ("BEVOEGD GEZAG NAAM", "Stichting De Linde"),
                ("STRAATNAAM", "Dorpsstraat"),
                ("HUISNUMMER-TOEVOEGING", "12a"),
                ("POSTCODE", "1234 AB"),
                ("PLAATSNAAM", "UTRECHT"),
                ("STRAATNAAM CORRESPONDENTIEADRES", ""),
                ("HUISNUMMER-TOEVOEGING CORRESPONDENTIEADRES", ""),
                ("POSTCODE CORRESPONDENTIEADRES", ""),
                ("PLAATSNAAM CORRESPONDENTIEADRES", ""),
                ("GEMEENTENUMMER", "0344"),
                ("ADMINISTRATIEKANTOORNUMMER", ""),
            ],
        );
        assert!(out.iter().all(|e| e.key == EntityKey::Board { board_id: 41234 }));
        assert_eq!(field(&out, "name"), Some(&json!("Stichting De Linde")));
        assert_eq!(
            field(&out, "address"),
            Some(&json!({"street": "Dorpsstraat 12a", "zip_code": "1234AB", "city": "UTRECHT"}))
        );
        assert_eq!(
            field(&out, "correspondence_address"),
            Some(&json!({"street": null, "zip_code": null, "city": null}))
        );
        assert_eq!(field(&out, "municipality_code"), Some(&json!(344)));
        assert_eq!(field(&out, "administrative_office_id"), Some(&Value::Null));
        // No column, no field
        assert_eq!(field(&out, "website"), None);
        assert_eq!(field(&out, "board_id"), None);
    }

    #[test]
    fn branch_listing_strips_brin_from_branch_number() {
        let out = run(
            &BRANCH_ALIASES,
            parse_branch,
            &[
                ("BRIN NUMMER", "AB12"),
                ("VESTIGINGSNUMMER", "AB1201"),
                ("VESTIGINGSNAAM ", "De Linde "),
                ("BEVOEGD GEZAG NUMMER", "41234"),
                ("ONDERWIJSSTRUCTUUR", "VMBO/HAVO"),
                ("ONDERWIJSGEBIED CODE", "12"),
            ],
        );
        assert_eq!(
            out[0].key,
            EntityKey::Branch {
                brin: "AB12".into(),
                branch_id: 1
            }
        );
        assert_eq!(field(&out, "name"), Some(&json!("De Linde")));
        assert_eq!(field(&out, "board_id"), Some(&json!(41234)));
        assert_eq!(field(&out, "education_structures"), Some(&json!(["VMBO", "HAVO"])));
        assert_eq!(field(&out, "education_area_code"), Some(&json!(12)));
    }

    #[test]
    fn school_without_brin_is_skipped() {
        let out = run(
            &SCHOOL_ALIASES,
            parse_school,
            &[("BRIN NUMMER", ""), ("INSTELLINGSNAAM", "Naamloos")],
        );
        assert!(out.is_empty());
    }

    #[test]
    fn collaboration_ids() {
        assert_eq!(normalize_collaboration_id("PO-2301"), "PO-2301");
        assert_eq!(normalize_collaboration_id("23-01"), "23-1");
        assert_eq!(normalize_collaboration_id(" VO 2201 "), "VO 2201");

        let out = run(
            &COLLABORATION_ALIASES,
            parse_collaboration,
            &[
                ("ADMINISTRATIENUMMER", "PO-02301"),
                ("SAMENWERKINGSVERBAND", "Passend Onderwijs Noord"),
                ("ADRES", "Laan 1"),
                ("POSTCODE", "9711 AA"),
                ("PLAATSNAAM", "GRONINGEN"),
            ],
        );
        assert_eq!(
            out[0].key,
            EntityKey::Collaboration {
                collaboration_id: "PO-2301".into()
            }
        );
        assert_eq!(
            field(&out, "address"),
            Some(&json!({"street": "Laan 1", "city": "GRONINGEN", "zip_code": "9711AA"}))
        );
    }
}
