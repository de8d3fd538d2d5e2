// Workbook decoding (xls, xlsx, xlsb, ods)
//
// Cells are rendered to text, each sheet is written back out as delimited
// text and re-read through the delimited path, so a workbook table looks
// exactly like a csv table to everything downstream.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader, Sheets};

use crate::csv::{import_from_string, join_rows};
use crate::error::DecodeError;
use crate::table::{NumberFormat, Origin, Table, TableLayout};
use crate::DecodeOptions;

/// Maximum number of cells read from one workbook (guards against huge files)
const MAX_CELLS: usize = 5_000_000;

type Workbook = Sheets<Cursor<Vec<u8>>>;

/// Decode a workbook. With `layout.sheet` set only that sheet is returned,
/// otherwise every sheet in workbook order.
pub fn import_bytes(
    bytes: &[u8],
    name: &str,
    options: &DecodeOptions,
    layout: &TableLayout<'_>,
) -> Result<Vec<Table>, DecodeError> {
    let mut workbook = open(bytes)?;

    let sheet_names: Vec<String> = match layout.sheet {
        Some(sheet) => vec![find_sheet(&workbook, sheet)?],
        None => workbook.sheet_names().to_vec(),
    };

    let mut tables = Vec::with_capacity(sheet_names.len());
    let mut total_cells = 0;
    for sheet_name in sheet_names {
        let grid = read_grid(&mut workbook, &sheet_name, &mut total_cells)?;
        let text = join_rows(&grid, options.delimiter)?;
        let table = import_from_string(
            &text,
            name,
            Origin::Sheet(sheet_name),
            options.delimiter,
            NumberFormat::PLAIN,
            layout,
        )?;
        tables.push(table);
    }

    Ok(tables)
}

/// Untyped cell grid of one named sheet, for tables whose header spans
/// several merged rows and has to be rebuilt by the caller.
pub fn decode_sheet_grid(bytes: &[u8], sheet: &str) -> Result<Vec<Vec<String>>, DecodeError> {
    let mut workbook = open(bytes)?;
    let sheet_name = find_sheet(&workbook, sheet)?;
    let mut total_cells = 0;
    read_grid(&mut workbook, &sheet_name, &mut total_cells)
}

fn open(bytes: &[u8]) -> Result<Workbook, DecodeError> {
    open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| DecodeError::Workbook(format!("failed to open workbook: {}", e)))
}

fn find_sheet(workbook: &Workbook, sheet: &str) -> Result<String, DecodeError> {
    workbook
        .sheet_names()
        .iter()
        .find(|name| name.as_str() == sheet)
        .cloned()
        .ok_or_else(|| DecodeError::MissingSheet(sheet.to_string()))
}

fn read_grid(
    workbook: &mut Workbook,
    sheet_name: &str,
    total_cells: &mut usize,
) -> Result<Vec<Vec<String>>, DecodeError> {
    let range = workbook
        .worksheet_range(sheet_name)
        .map_err(|e| DecodeError::Workbook(format!("failed to read sheet '{}': {}", sheet_name, e)))?;

    let (height, width) = range.get_size();
    *total_cells += height * width;
    if *total_cells > MAX_CELLS {
        return Err(DecodeError::Workbook(format!(
            "workbook exceeds {} cells (sheet '{}')",
            MAX_CELLS, sheet_name
        )));
    }

    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect())
}

/// Text form of one cell.
pub fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(n) => format_number(*n),
        Data::Int(n) => n.to_string(),
        Data::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Data::Error(e) => format!("#{:?}", e),
        // Dates stay serials; no dataset reads a date out of a workbook cell
        Data::DateTime(dt) => format_number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    }
}

// Integers without decimals
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}
