// Pass runner
//
// One pass reads one source file for one dataset: decode every table, run
// each row through the normalizer and the dataset's parser, merge, and only
// then hand the finished records to the sink. A decode failure aborts the
// pass before anything reaches the sink.

use std::sync::Arc;

use duodata_io::{
    decode, decode_sheet_grid, DecodeError, DecodeOptions, NumberFormat, Origin, RawRow, Table,
    TableKind,
};

use crate::datasets::{lookup, DatasetDef, Layout, SheetHeader};
use crate::error::PipelineError;
use crate::merge::EntityMerger;
use crate::model::{PassStats, ReferenceDate};
use crate::normalize::{stacked_labels, Normalizer};
use crate::sink::RecordSink;

/// Bytes of one source file plus what is known about it.
#[derive(Debug, Clone, Copy)]
pub struct PassInput<'a> {
    pub bytes: &'a [u8],
    pub kind: TableKind,
    /// Absolute download locator, recorded as provenance.
    pub locator: &'a str,
    pub reference_date: ReferenceDate,
}

#[derive(Debug, Clone)]
pub struct PassOptions {
    pub decode: DecodeOptions,
    pub redaction_marker: String,
}

impl Default for PassOptions {
    fn default() -> Self {
        Self {
            decode: DecodeOptions::default(),
            redaction_marker: "*".to_string(),
        }
    }
}

/// Run the dataset registered under `id`.
pub fn run_dataset(
    id: &str,
    input: &PassInput<'_>,
    options: &PassOptions,
    sink: &mut dyn RecordSink,
) -> Result<PassStats, PipelineError> {
    let def = lookup(id).ok_or_else(|| PipelineError::UnknownDataset(id.to_string()))?;
    run_pass(def, input, options, sink)
}

pub fn run_pass(
    def: &'static DatasetDef,
    input: &PassInput<'_>,
    options: &PassOptions,
    sink: &mut dyn RecordSink,
) -> Result<PassStats, PipelineError> {
    let name = file_name(input.locator);
    let tables = decode_tables(def, input, &options.decode, name).map_err(|source| {
        PipelineError::Decode {
            locator: input.locator.to_string(),
            source,
        }
    })?;

    let pass_year = input.reference_date.year();
    let mut stats = PassStats {
        tables: tables.len(),
        ..PassStats::default()
    };

    // Archive members merge separately so each keeps its own provenance
    let mut mergers: Vec<(Option<String>, EntityMerger)> = Vec::new();

    for table in &tables {
        let member = table.origin.member().map(str::to_string);
        let slot = match mergers.iter().position(|(m, _)| *m == member) {
            Some(slot) => slot,
            None => {
                mergers.push((member, EntityMerger::new(def.id)));
                mergers.len() - 1
            }
        };
        let merger = &mut mergers[slot].1;

        let mut normalizer = Normalizer::new(
            &def.aliases,
            &table.headers,
            table.number_format,
            &options.redaction_marker,
        );
        let mut skipped = 0;
        let mut emissions = Vec::new();
        for raw in &table.rows {
            let row = normalizer.normalize(raw);
            (def.parse)(&row, &mut emissions);
            normalizer.finish_row(&row);

            if emissions.is_empty() {
                skipped += 1;
                continue;
            }
            stats.emissions += emissions.len();
            merger.extend(emissions.drain(..), pass_year);
        }

        let table_stats = normalizer.stats();
        stats.rows += table_stats.rows;
        stats.rows_skipped += skipped;
        stats.coercion_failures += table_stats.coercion_failures;

        if skipped > 0 {
            log::warn!(
                "{}: {} of {} rows in '{}' ({:?}) produced nothing",
                def.id,
                skipped,
                table_stats.rows,
                table.name,
                table.origin
            );
        }
        log::debug!(
            "{}: table '{}' ({:?}) {} rows, {} coercion failures",
            def.id,
            table.name,
            table.origin,
            table_stats.rows,
            table_stats.coercion_failures
        );
    }

    let mut records = Vec::new();
    for (member, merger) in mergers {
        records.extend(merger.finish(input.reference_date, input.locator, member.as_deref()));
    }
    stats.records = records.len();
    for record in records {
        sink.accept(record)?;
    }

    log::info!(
        "{} ({}): {} rows, {} records, {} skipped, {} coercion failures",
        def.id,
        input.reference_date.iso(),
        stats.rows,
        stats.records,
        stats.rows_skipped,
        stats.coercion_failures
    );
    Ok(stats)
}

fn file_name(locator: &str) -> &str {
    locator.rsplit(['/', '\\']).next().unwrap_or(locator)
}

fn decode_tables(
    def: &DatasetDef,
    input: &PassInput<'_>,
    options: &DecodeOptions,
    name: &str,
) -> Result<Vec<Table>, DecodeError> {
    match def.layout {
        Layout::Table(layout) => decode(input.bytes, name, input.kind, options, &layout),
        Layout::StackedHeader(sheets) => {
            let mut tables = Vec::with_capacity(sheets.len());
            for sheet in sheets {
                match decode_sheet_grid(input.bytes, sheet.sheet) {
                    Ok(grid) => tables.push(stacked_table(name, sheet, grid)),
                    // Not every year publishes every sheet
                    Err(DecodeError::MissingSheet(missing)) => {
                        log::debug!("{}: no sheet '{}' in '{}'", def.id, missing, name);
                    }
                    Err(e) => return Err(e),
                }
            }
            Ok(tables)
        }
    }
}

/// Table from a sheet whose header spans `sheet.rows` rows.
fn stacked_table(name: &str, sheet: &SheetHeader, grid: Vec<Vec<String>>) -> Table {
    let split = sheet.rows.min(grid.len());
    let (header_rows, data) = grid.split_at(split);
    let headers: Arc<[String]> = stacked_labels(header_rows).into();

    let rows = data
        .iter()
        .map(|cells| {
            let values = cells.iter().take(headers.len()).cloned().collect();
            RawRow::new(headers.clone(), values)
        })
        .filter(|row| !row.is_empty())
        .collect();

    Table {
        name: name.to_string(),
        origin: Origin::Sheet(sheet.sheet.to_string()),
        headers,
        rows,
        number_format: NumberFormat::PLAIN,
    }
}
