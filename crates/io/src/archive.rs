// Zip-of-tables decoding
//
// One logical dataset split into one file per region. Everything happens in
// memory; each member becomes its own table tagged with the member name.

use std::io::{Cursor, Read};

use zip::ZipArchive;

use crate::error::DecodeError;
use crate::table::{Origin, Table, TableLayout};
use crate::{csv, workbook, DecodeOptions, TableKind};

/// Largest uncompressed member read into memory.
const MAX_MEMBER_BYTES: u64 = 256 * 1024 * 1024;

pub fn import_bytes(
    bytes: &[u8],
    options: &DecodeOptions,
    layout: &TableLayout<'_>,
) -> Result<Vec<Table>, DecodeError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut tables = Vec::new();

    for index in 0..archive.len() {
        let mut file = archive.by_index(index)?;
        if file.is_dir() {
            continue;
        }

        let member = file.name().to_string();
        let content = read_member(&mut file, &member, MAX_MEMBER_BYTES)?;

        let decoded = match TableKind::from_path(&member) {
            Ok(TableKind::Delimited) => vec![csv::import_bytes(&content, &member, options, layout)?],
            Ok(TableKind::Archive) => {
                return Err(DecodeError::Archive(format!("nested archive '{}'", member)));
            }
            // Regional splits are published as workbooks; anything not csv goes that way
            Ok(TableKind::Workbook) | Err(_) => {
                workbook::import_bytes(&content, &member, options, layout)?
            }
        };

        log::debug!("archive member '{}': {} table(s)", member, decoded.len());

        tables.extend(decoded.into_iter().map(|mut table| {
            let sheet = match table.origin {
                Origin::Sheet(sheet) => Some(sheet),
                _ => None,
            };
            table.origin = Origin::ArchiveMember {
                member: member.clone(),
                sheet,
            };
            table
        }));
    }

    Ok(tables)
}

/// Read at most `limit` bytes; the declared size is not trusted.
fn read_member<R: Read>(reader: R, member: &str, limit: u64) -> Result<Vec<u8>, DecodeError> {
    let mut content = Vec::new();
    reader
        .take(limit + 1)
        .read_to_end(&mut content)
        .map_err(|e| DecodeError::Archive(format!("failed to read '{}': {}", member, e)))?;
    if content.len() as u64 > limit {
        return Err(DecodeError::Archive(format!(
            "member '{}' exceeds {} bytes",
            member, limit
        )));
    }
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn archive(members: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .add_directory("regio/", SimpleFileOptions::default())
            .unwrap();
        for (name, content) in members {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_each_member_is_its_own_table() {
        let bytes = archive(&[
            ("regio/noord.csv", &b"BRIN;AANTAL\nAB12;1\n"[..]),
            ("regio/zuid.csv", &b"BRIN;AANTAL\nCD34;2\nEF56;3\n"[..]),
        ]);
        let tables = import_bytes(&bytes, &DecodeOptions::default(), &TableLayout::default()).unwrap();

        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].origin.member(), Some("regio/noord.csv"));
        assert_eq!(tables[0].rows.len(), 1);
        assert_eq!(tables[1].origin.member(), Some("regio/zuid.csv"));
        assert_eq!(tables[1].rows[1].get("BRIN"), Some("EF56"));
    }

    #[test]
    fn test_workbook_member_keeps_sheet_name() {
        let mut wb = rust_xlsxwriter::Workbook::new();
        let ws = wb.add_worksheet();
        ws.set_name("data").unwrap();
        ws.write_string(0, 0, "BRIN").unwrap();
        ws.write_string(1, 0, "AB12").unwrap();
        let xlsx = wb.save_to_buffer().unwrap();

        let bytes = archive(&[("utrecht.xlsx", xlsx.as_slice())]);
        let tables = import_bytes(&bytes, &DecodeOptions::default(), &TableLayout::default()).unwrap();

        assert_eq!(tables.len(), 1);
        assert_eq!(
            tables[0].origin,
            Origin::ArchiveMember {
                member: "utrecht.xlsx".to_string(),
                sheet: Some("data".to_string()),
            }
        );
        assert_eq!(tables[0].rows[0].get("BRIN"), Some("AB12"));
    }

    #[test]
    fn test_oversized_member_is_an_archive_error() {
        let content = vec![b'a'; 64];
        assert_eq!(read_member(&content[..], "noord.csv", 64).unwrap().len(), 64);

        let err = read_member(&content[..], "noord.csv", 63).unwrap_err();
        assert!(matches!(err, DecodeError::Archive(msg) if msg.contains("noord.csv")));
    }

    #[test]
    fn test_not_a_zip_is_an_archive_error() {
        let err = import_bytes(b"plain text", &DecodeOptions::default(), &TableLayout::default())
            .unwrap_err();
        assert!(matches!(err, DecodeError::Archive(_)));
    }
}
