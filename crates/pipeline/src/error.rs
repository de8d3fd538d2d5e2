use std::fmt;

use duodata_io::DecodeError;

#[derive(Debug)]
pub enum PipelineError {
    /// Source bytes could not be decoded; the whole pass is aborted.
    Decode { locator: String, source: DecodeError },
    /// No dataset strategy registered under this id.
    UnknownDataset(String),
    /// The record sink refused a record (write failure, etc.).
    Sink(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode { locator, source } => write!(f, "cannot decode '{locator}': {source}"),
            Self::UnknownDataset(id) => write!(f, "unknown dataset: {id}"),
            Self::Sink(msg) => write!(f, "sink error: {msg}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Decode { source, .. } => Some(source),
            _ => None,
        }
    }
}
