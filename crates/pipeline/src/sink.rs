// Record sinks
//
// The pass runner hands finished records to a sink once the whole pass has
// merged. What happens next (index upsert, export) is up to the sink.

use std::io::Write;

use crate::error::PipelineError;
use crate::model::MergedRecord;

pub trait RecordSink {
    fn accept(&mut self, record: MergedRecord) -> Result<(), PipelineError>;
}

/// Collects records in memory.
#[derive(Debug, Default)]
pub struct VecSink {
    pub records: Vec<MergedRecord>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordSink for VecSink {
    fn accept(&mut self, record: MergedRecord) -> Result<(), PipelineError> {
        self.records.push(record);
        Ok(())
    }
}

/// One JSON object per line.
pub struct JsonLinesSink<W: Write> {
    writer: W,
    written: usize,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(mut self) -> Result<W, PipelineError> {
        self.writer
            .flush()
            .map_err(|e| PipelineError::Sink(e.to_string()))?;
        Ok(self.writer)
    }
}

impl<W: Write> RecordSink for JsonLinesSink<W> {
    fn accept(&mut self, record: MergedRecord) -> Result<(), PipelineError> {
        serde_json::to_writer(&mut self.writer, &record)
            .map_err(|e| PipelineError::Sink(e.to_string()))?;
        self.writer
            .write_all(b"\n")
            .map_err(|e| PipelineError::Sink(e.to_string()))?;
        self.written += 1;
        Ok(())
    }
}
