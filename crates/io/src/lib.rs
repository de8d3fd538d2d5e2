//! Tabular decoding for published education datasets.
//!
//! Turns a byte blob of a known kind into zero or more [`Table`]s:
//! - delimited text (`csv`), decoded strictly from a legacy codepage;
//! - workbooks (`xls`, `xlsx`, ...), rendered to text and re-read as delimited;
//! - zip archives of either, one table per member.
//!
//! Nothing here touches the network or the filesystem.

pub mod archive;
pub mod csv;
pub mod error;
pub mod table;
pub mod workbook;

use encoding_rs::Encoding;

pub use error::DecodeError;
pub use table::{NumberFormat, Origin, RawRow, Table, TableLayout};
pub use workbook::decode_sheet_grid;

/// Which decoder a blob goes through, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Delimited,
    Workbook,
    Archive,
}

impl TableKind {
    pub fn from_extension(ext: &str) -> Result<Self, DecodeError> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Delimited),
            "xls" | "xlsx" | "xlsm" | "xlsb" | "ods" => Ok(Self::Workbook),
            "zip" => Ok(Self::Archive),
            _ => Err(DecodeError::UnknownKind(ext.to_string())),
        }
    }

    /// Kind from the extension of a file name or URL path.
    pub fn from_path(path: &str) -> Result<Self, DecodeError> {
        let file_name = path.rsplit(['/', '\\']).next().unwrap_or(path);
        match file_name.rsplit_once('.') {
            Some((_, ext)) => Self::from_extension(ext),
            None => Err(DecodeError::UnknownKind(file_name.to_string())),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Delimited => "csv",
            Self::Workbook => "xls",
            Self::Archive => "zip",
        }
    }
}

/// Codepage, delimiter and number format, threaded in by the caller.
#[derive(Debug, Clone, Copy)]
pub struct DecodeOptions {
    pub codepage: &'static Encoding,
    pub delimiter: u8,
    pub number_format: NumberFormat,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            codepage: encoding_rs::WINDOWS_1252,
            delimiter: b';',
            number_format: NumberFormat::LOCALE_NL,
        }
    }
}

/// Decode one source file into its tables.
pub fn decode(
    bytes: &[u8],
    name: &str,
    kind: TableKind,
    options: &DecodeOptions,
    layout: &TableLayout<'_>,
) -> Result<Vec<Table>, DecodeError> {
    match kind {
        TableKind::Delimited => Ok(vec![csv::import_bytes(bytes, name, options, layout)?]),
        TableKind::Workbook => workbook::import_bytes(bytes, name, options, layout),
        TableKind::Archive => archive::import_bytes(bytes, options, layout),
    }
}
