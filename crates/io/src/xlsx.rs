// Excel import (xlsx, xls, ods) and export (xlsx only)

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::{Color, Format, Workbook as XlsxWorkbook};
use waybill_core::{Table, Value};

/// Import the first worksheet of an Excel file. The first row becomes the
/// header; every later row becomes a data row.
pub fn import(path: &Path) -> Result<Table, String> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| format!("Failed to open {}: {}", path.display(), e))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| format!("{} contains no worksheets", path.display()))?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| format!("Failed to read sheet '{sheet_name}': {e}"))?;

    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| format!("Sheet '{sheet_name}' is empty"))?;

    let columns: Vec<String> = header.iter().map(|c| convert(c).display()).collect();
    let mut table = Table::new(columns);
    for row in rows {
        table.push_row(row.iter().map(convert).collect());
    }
    Ok(table)
}

fn convert(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Empty,
        Data::String(s) => Value::Text(s.clone()),
        Data::Float(n) => Value::Number(*n),
        Data::Int(n) => Value::Number(*n as f64),
        Data::Bool(b) => Value::Text(b.to_string()),
        Data::DateTime(dt) => Value::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::Text(s.clone()),
        Data::Error(e) => Value::Text(e.to_string()),
    }
}

/// Export a table to one worksheet, header row bold.
pub fn export(table: &Table, path: &Path) -> Result<(), String> {
    export_highlighted(table, None, path)
}

/// Export with an optional row highlight mask. Masked rows get a yellow
/// fill, the convention for rows the reconciler could not update. The mask
/// must be row-aligned with the table.
pub fn export_highlighted(
    table: &Table,
    highlight: Option<&[bool]>,
    path: &Path,
) -> Result<(), String> {
    if let Some(mask) = highlight {
        if mask.len() != table.rows.len() {
            return Err(format!(
                "highlight mask covers {} rows but the table has {}",
                mask.len(),
                table.rows.len()
            ));
        }
    }

    let mut workbook = XlsxWorkbook::new();
    let worksheet = workbook.add_worksheet();

    let header_format = Format::new().set_bold();
    let highlight_format = Format::new().set_background_color(Color::Yellow);
    let plain_format = Format::new();

    for (col, name) in table.columns.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, name, &header_format)
            .map_err(|e| format!("Failed to write header '{name}': {e}"))?;
    }

    for (i, row) in table.rows.iter().enumerate() {
        let highlighted = highlight.map(|m| m[i]).unwrap_or(false);
        let format = if highlighted {
            &highlight_format
        } else {
            &plain_format
        };
        let row32 = (i + 1) as u32;
        for (col, cell) in row.iter().enumerate() {
            let col16 = col as u16;
            let result = match cell {
                Value::Empty if highlighted => worksheet.write_blank(row32, col16, format),
                Value::Empty => continue,
                Value::Number(n) => worksheet.write_number_with_format(row32, col16, *n, format),
                Value::Text(s) => worksheet.write_string_with_format(row32, col16, s, format),
            };
            result.map_err(|e| format!("Failed to write cell ({row32}, {col16}): {e}"))?;
        }
    }

    workbook
        .save(path)
        .map_err(|e| format!("Failed to save {}: {}", path.display(), e))
}
