use std::fmt;

#[derive(Debug)]
pub enum DecodeError {
    /// Extension hint does not name a supported table kind.
    UnknownKind(String),
    /// Bytes are not valid under the declared codepage.
    Encoding { codepage: &'static str },
    /// Delimited text could not be read.
    Csv(String),
    /// Workbook container could not be opened or a sheet could not be read.
    Workbook(String),
    /// The requested sheet is not present in the workbook.
    MissingSheet(String),
    /// Zip container could not be read.
    Archive(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownKind(ext) => write!(f, "unsupported table kind: '{ext}'"),
            Self::Encoding { codepage } => {
                write!(f, "malformed byte sequence for codepage {codepage}")
            }
            Self::Csv(msg) => write!(f, "delimited text error: {msg}"),
            Self::Workbook(msg) => write!(f, "workbook error: {msg}"),
            Self::MissingSheet(name) => write!(f, "sheet '{name}' not found in workbook"),
            Self::Archive(msg) => write!(f, "archive error: {msg}"),
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<csv::Error> for DecodeError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e.to_string())
    }
}

impl From<zip::result::ZipError> for DecodeError {
    fn from(e: zip::result::ZipError) -> Self {
        Self::Archive(e.to_string())
    }
}
