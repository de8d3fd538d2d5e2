// Delimited text decoding

use std::sync::Arc;

use encoding_rs::Encoding;

use crate::error::DecodeError;
use crate::table::{NumberFormat, Origin, RawRow, Table, TableLayout};
use crate::DecodeOptions;

/// Decode a delimited file: codepage first, then rows with the first row as header.
pub fn import_bytes(
    bytes: &[u8],
    name: &str,
    options: &DecodeOptions,
    layout: &TableLayout<'_>,
) -> Result<Table, DecodeError> {
    let content = decode_text(bytes, options.codepage)?;
    import_from_string(
        &content,
        name,
        Origin::Delimited,
        options.delimiter,
        options.number_format,
        layout,
    )
}

/// Bytes windows-1252 leaves undefined. encoding_rs maps them to C1
/// controls, so they have to be rejected by hand.
const CP1252_UNDEFINED: [u8; 5] = [0x81, 0x8D, 0x8F, 0x90, 0x9D];

/// Strict codepage decode. A malformed sequence fails the whole file.
pub fn decode_text(bytes: &[u8], codepage: &'static Encoding) -> Result<String, DecodeError> {
    if codepage == encoding_rs::WINDOWS_1252
        && bytes.iter().any(|b| CP1252_UNDEFINED.contains(b))
    {
        return Err(DecodeError::Encoding {
            codepage: codepage.name(),
        });
    }

    codepage
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
        .ok_or(DecodeError::Encoding {
            codepage: codepage.name(),
        })
}

pub(crate) fn import_from_string(
    content: &str,
    name: &str,
    origin: Origin,
    delimiter: u8,
    number_format: NumberFormat,
    layout: &TableLayout<'_>,
) -> Result<Table, DecodeError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = reader.records().skip(layout.skip_rows);

    let headers: Arc<[String]> = match layout.headers {
        Some(labels) => labels.iter().map(|s| s.to_string()).collect::<Vec<_>>().into(),
        None => match records.next() {
            Some(record) => record?.iter().map(clean_label).collect::<Vec<_>>().into(),
            None => Vec::new().into(),
        },
    };

    let mut rows = Vec::new();
    if !headers.is_empty() {
        for record in records {
            let record = record?;
            let values: Vec<String> = record
                .iter()
                .take(headers.len())
                .map(str::to_string)
                .collect();
            let row = RawRow::new(headers.clone(), values);
            if !row.is_empty() {
                rows.push(row);
            }
        }
    }

    log::debug!("decoded table '{}': {} columns, {} rows", name, headers.len(), rows.len());

    Ok(Table {
        name: name.to_string(),
        origin,
        headers,
        rows,
        number_format,
    })
}

/// Header labels sometimes carry line breaks from wrapped spreadsheet cells.
fn clean_label(label: &str) -> String {
    label.chars().filter(|c| *c != '\n' && *c != '\r').collect()
}

/// Write a grid back out as delimited text so it can be re-read through
/// [`import_from_string`]. Quotes cells containing the delimiter.
pub(crate) fn join_rows(grid: &[Vec<String>], delimiter: u8) -> Result<String, DecodeError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_writer(Vec::new());

    for row in grid {
        writer.write_record(row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| DecodeError::Csv(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| DecodeError::Csv(e.to_string()))
}
