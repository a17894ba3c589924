// CSV import/export

use std::io::Read;
use std::path::Path;

use waybill_core::{Table, Value};

/// Import a CSV file. The first record is the header. Short records pad
/// with empty cells.
pub fn import(path: &Path) -> Result<Table, String> {
    let content = read_file_as_utf8(path)?;
    import_from_string(&content)
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252 exports).
pub fn read_file_as_utf8(path: &Path) -> Result<String, String> {
    let mut file = std::fs::File::open(path)
        .map_err(|e| format!("Failed to open {}: {}", path.display(), e))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| e.to_string())?;

    // Try UTF-8 first; on failure, recover the buffer from the error
    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            // Fall back to Windows-1252 (common for Excel-exported CSVs)
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

fn import_from_string(content: &str) -> Result<Table, String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| e.to_string())?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut table = Table::new(columns);
    for result in reader.records() {
        let record = result.map_err(|e| e.to_string())?;
        table.push_row(record.iter().map(field_to_value).collect());
    }
    Ok(table)
}

fn field_to_value(field: &str) -> Value {
    if field.is_empty() {
        Value::Empty
    } else {
        Value::Text(field.to_string())
    }
}

/// Export a table as UTF-8 CSV, cells in display form.
pub fn export(table: &Table, path: &Path) -> Result<(), String> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| format!("Failed to create {}: {}", path.display(), e))?;

    writer
        .write_record(&table.columns)
        .map_err(|e| e.to_string())?;
    for row in &table.rows {
        writer
            .write_record(row.iter().map(|c| c.display()))
            .map_err(|e| e.to_string())?;
    }
    writer.flush().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_reads_headers_and_pads_short_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.csv");
        std::fs::write(&path, "a, b ,c\n1,2,3\nx,y\n").unwrap();

        let table = import(&path).unwrap();
        assert_eq!(table.columns, vec!["a", "b", "c"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.cell(1, "c"), Some(&Value::Empty));
    }

    #[test]
    fn export_writes_display_form() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let mut t = Table::new(vec!["code".into(), "value".into()]);
        t.push_row(vec![Value::Number(7208.0), Value::Empty]);
        export(&t, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "code,value\n7208,\n");
    }

    #[test]
    fn windows_1252_bytes_decode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.csv");
        // 0xE9 is 'é' in Windows-1252 and invalid standalone UTF-8.
        std::fs::write(&path, b"name\ncaf\xe9\n").unwrap();

        let table = import(&path).unwrap();
        assert_eq!(table.cell(0, "name"), Some(&Value::text("café")));
    }
}
