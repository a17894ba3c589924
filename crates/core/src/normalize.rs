//! Record normalizer — raw e-way-bill export rows into the canonical schema.
//!
//! Every column operation is a no-op when its source column is absent, and
//! per-row extraction failures degrade to empty cells. The pass is total;
//! only the caller's source read can fail.

use std::collections::HashSet;

use crate::extract;
use crate::table::{Table, Value};

pub const COL_SERIAL: &str = "Serial No";
pub const COL_SERIAL_DATE: &str = "Serial No. & Dt.";
pub const COL_BUYER_COMPOSITE: &str = "To GSTIN & Name";
pub const COL_SELLER_COMPOSITE: &str = "From GSTIN & Name";
pub const COL_CODE: &str = "GSTIN";
pub const COL_TAX_ID: &str = "PAN";
pub const COL_NAME: &str = "NAME";
pub const COL_DATE: &str = "Date";
pub const COL_VALUE: &str = "VALUE";
pub const COL_RAW_VALUE: &str = "Assess Val.";
pub const COL_PRODUCT_CODE: &str = "HSN Code";
pub const COL_PRODUCT_DESC: &str = "HSN Desc.";

/// Fallback buyer name when neither the composite nor a pre-existing name
/// column yields one. A visible sentinel, not a null.
pub const UNKNOWN_NAME: &str = "Unknown";

const LEGACY_RENAMES: &[(&str, &str)] = &[
    ("EWB No.", COL_SERIAL),
    ("EWB No. & Dt.", COL_SERIAL_DATE),
];

const DROP_AFTER_DERIVE: &[&str] = &[
    COL_BUYER_COMPOSITE,
    COL_RAW_VALUE,
    "Tax Val.",
    "Latest Vehicle No.",
];

const CANONICAL_ORDER: &[&str] = &[
    COL_SERIAL,
    COL_SELLER_COMPOSITE,
    COL_CODE,
    COL_TAX_ID,
    COL_NAME,
    "From Place & Pin",
    "To Place & Pin",
    COL_SERIAL_DATE,
    COL_DATE,
    "Doc No. & Dt.",
    COL_VALUE,
    COL_PRODUCT_CODE,
    COL_PRODUCT_DESC,
];

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct NormalizeReport {
    pub self_rows_removed: usize,
    pub duplicate_rows_removed: usize,
    pub warnings: Vec<String>,
}

#[derive(Debug)]
pub struct NormalizeOutput {
    pub table: Table,
    pub report: NormalizeReport,
}

/// Run the full normalization pass over one raw dataset.
pub fn normalize(raw: &Table) -> NormalizeOutput {
    let mut table = raw.clone();
    let mut report = NormalizeReport::default();

    for (from, to) in LEGACY_RENAMES {
        table.rename_column(from, to);
    }

    derive_buyer_fields(&mut table);
    apply_name_fallback(&mut table, &mut report);
    derive_date(&mut table);
    derive_rounded_value(&mut table);

    report.self_rows_removed = remove_self_transactions(&mut table);
    report.duplicate_rows_removed = remove_exact_duplicates(&mut table);

    for name in DROP_AFTER_DERIVE {
        table.drop_column(name);
    }
    table.reorder(CANONICAL_ORDER);

    NormalizeOutput { table, report }
}

fn opt_text(value: Option<String>) -> Value {
    value.map(Value::Text).unwrap_or(Value::Empty)
}

/// Split the buyer composite into code, tax id and display name columns.
fn derive_buyer_fields(table: &mut Table) {
    let Some(buyer_idx) = table.column_index(COL_BUYER_COMPOSITE) else {
        return;
    };

    let codes: Vec<Value> = table
        .rows
        .iter()
        .map(|r| opt_text(extract::party_code(&r[buyer_idx])))
        .collect();
    let tax_ids: Vec<Value> = codes
        .iter()
        .map(|c| opt_text(c.as_str().and_then(extract::tax_id)))
        .collect();
    let names: Vec<Value> = table
        .rows
        .iter()
        .map(|r| opt_text(extract::party_name(&r[buyer_idx])))
        .collect();

    table.set_column(COL_CODE, codes);
    table.set_column(COL_TAX_ID, tax_ids);
    table.set_column(COL_NAME, names);
}

/// When the derived name column is absent or entirely empty, fall back to a
/// pre-existing `Name` column, and past that to the `Unknown` sentinel.
fn apply_name_fallback(table: &mut Table, report: &mut NormalizeReport) {
    let all_empty = |table: &Table| match table.column_index(COL_NAME) {
        None => true,
        Some(idx) => table.rows.iter().all(|r| r[idx].is_empty()),
    };

    if all_empty(table) {
        if let Some(alt_idx) = table.column_index("Name") {
            let alt: Vec<Value> = table.rows.iter().map(|r| r[alt_idx].clone()).collect();
            table.set_column(COL_NAME, alt);
        }
    }

    if all_empty(table) {
        report.warnings.push(format!(
            "no buyer name could be derived from '{COL_BUYER_COMPOSITE}' or 'Name'; \
             using the '{UNKNOWN_NAME}' sentinel"
        ));
        let sentinel = vec![Value::text(UNKNOWN_NAME); table.rows.len()];
        table.set_column(COL_NAME, sentinel);
    }
}

fn derive_date(table: &mut Table) {
    if let Some(idx) = table.column_index(COL_SERIAL_DATE) {
        let dates: Vec<Value> = table
            .rows
            .iter()
            .map(|r| opt_text(extract::transaction_date(&r[idx])))
            .collect();
        table.set_column(COL_DATE, dates);
    }
}

fn derive_rounded_value(table: &mut Table) {
    if let Some(idx) = table.column_index(COL_RAW_VALUE) {
        let values: Vec<Value> = table
            .rows
            .iter()
            .map(|r| extract::round_to_ten_thousand(&r[idx]))
            .collect();
        table.set_column(COL_VALUE, values);
    }
}

/// Drop rows whose origin and counterparty resolve to the same tax id.
/// Rows where either side has no tax id are kept.
fn remove_self_transactions(table: &mut Table) -> usize {
    let (Some(seller_idx), Some(tax_idx)) = (
        table.column_index(COL_SELLER_COMPOSITE),
        table.column_index(COL_TAX_ID),
    ) else {
        return 0;
    };

    let before = table.rows.len();
    table.rows.retain(|r| {
        let origin = extract::tax_id_from_composite(&r[seller_idx]);
        match (origin, r[tax_idx].as_str()) {
            (Some(o), Some(c)) => o != c,
            _ => true,
        }
    });
    before - table.rows.len()
}

/// Drop exact full-row duplicates, keeping the first occurrence.
fn remove_exact_duplicates(table: &mut Table) -> usize {
    let before = table.rows.len();
    let mut seen = HashSet::new();
    table.rows.retain(|r| seen.insert(row_key(r)));
    before - table.rows.len()
}

fn row_key(row: &[Value]) -> String {
    let mut key = String::new();
    for value in row {
        match value {
            Value::Empty => key.push('e'),
            Value::Number(n) => {
                key.push('n');
                key.push_str(&n.to_bits().to_string());
            }
            Value::Text(s) => {
                key.push('t');
                key.push_str(s);
            }
        }
        key.push('\u{1f}');
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_table() -> Table {
        let mut t = Table::new(vec![
            "EWB No.".into(),
            "EWB No. & Dt.".into(),
            "To GSTIN & Name".into(),
            "From GSTIN & Name".into(),
            "Assess Val.".into(),
        ]);
        // Ordinary row.
        t.push_row(vec![
            Value::Number(6713.0),
            Value::text("6713 - 02/09/2023 17:41:00"),
            Value::text("01AAACI6306G1Z7 / IND LABORATORIES LTD"),
            Value::text("07BBBCX9999A1Z2 / STEEL WORKS"),
            Value::Number(12_345.0),
        ]);
        // Self-transaction: origin and counterparty share a tax id.
        t.push_row(vec![
            Value::Number(6714.0),
            Value::text("6714 - 03/09/2023 08:00:00"),
            Value::text("01AAACI6306G1Z7 / IND LABORATORIES LTD"),
            Value::text("27AAACI6306G9Z9 / IND LABS BRANCH"),
            Value::Number(50_000.0),
        ]);
        // Exact duplicate pair.
        let dup = vec![
            Value::Number(6715.0),
            Value::text("6715 - 04/09/2023 10:30:00"),
            Value::text("09CCCDD1234E1F5 / NORTHERN ALLOYS"),
            Value::text("07BBBCX9999A1Z2 / STEEL WORKS"),
            Value::Number(77_000.0),
        ];
        t.push_row(dup.clone());
        t.push_row(dup);
        t
    }

    #[test]
    fn end_to_end_removes_self_rows_and_duplicates() {
        let raw = raw_table();
        let n = raw.rows.len();
        let out = normalize(&raw);

        assert_eq!(out.table.rows.len(), n - 2);
        assert_eq!(out.report.self_rows_removed, 1);
        assert_eq!(out.report.duplicate_rows_removed, 1);
        assert!(out.table.has_column(COL_SERIAL));
        assert!(!out.table.has_column("EWB No."));
        assert!(!out.table.has_column(COL_BUYER_COMPOSITE));
        assert!(!out.table.has_column(COL_RAW_VALUE));
    }

    #[test]
    fn derived_fields_hold_extracted_values() {
        let out = normalize(&raw_table());
        assert_eq!(
            out.table.cell(0, COL_TAX_ID),
            Some(&Value::text("AAACI6306G"))
        );
        assert_eq!(
            out.table.cell(0, COL_NAME),
            Some(&Value::text("IND LABORATORIES LTD"))
        );
        assert_eq!(out.table.cell(0, COL_DATE), Some(&Value::text("02-09-2023")));
        assert_eq!(out.table.cell(0, COL_VALUE), Some(&Value::Number(10_000.0)));
    }

    #[test]
    fn canonical_columns_lead_and_stragglers_keep_their_order() {
        let mut raw = raw_table();
        raw.columns.push("Custom A".into());
        raw.columns.push("Custom B".into());
        for row in &mut raw.rows {
            row.push(Value::text("a"));
            row.push(Value::text("b"));
        }
        let out = normalize(&raw);
        assert_eq!(out.table.columns[0], COL_SERIAL);
        let a = out.table.column_index("Custom A").unwrap();
        let b = out.table.column_index("Custom B").unwrap();
        assert!(a < b);
    }

    #[test]
    fn duplicate_removal_is_idempotent() {
        let out = normalize(&raw_table());
        let again = normalize(&out.table);
        assert_eq!(again.table.rows.len(), out.table.rows.len());
        assert_eq!(again.report.duplicate_rows_removed, 0);
    }

    #[test]
    fn missing_columns_never_error() {
        let mut t = Table::new(vec!["Unrelated".into()]);
        t.push_row(vec![Value::text("x")]);
        let out = normalize(&t);
        assert_eq!(out.table.rows.len(), 1);
        assert_eq!(out.report.self_rows_removed, 0);
    }

    #[test]
    fn name_falls_back_to_alternate_column_then_sentinel() {
        let mut t = Table::new(vec!["Name".into(), "Assess Val.".into()]);
        t.push_row(vec![Value::text("DIRECT NAME"), Value::Number(1.0)]);
        let out = normalize(&t);
        assert_eq!(out.table.cell(0, COL_NAME), Some(&Value::text("DIRECT NAME")));
        assert!(out.report.warnings.is_empty());

        let mut t = Table::new(vec!["Assess Val.".into()]);
        t.push_row(vec![Value::Number(1.0)]);
        let out = normalize(&t);
        assert_eq!(out.table.cell(0, COL_NAME), Some(&Value::text(UNKNOWN_NAME)));
        assert_eq!(out.report.warnings.len(), 1);
    }

    #[test]
    fn rows_without_either_tax_id_survive_self_removal() {
        let mut t = Table::new(vec![
            "To GSTIN & Name".into(),
            "From GSTIN & Name".into(),
        ]);
        t.push_row(vec![Value::text("bad"), Value::text("also bad")]);
        let out = normalize(&t);
        assert_eq!(out.table.rows.len(), 1);
        assert_eq!(out.report.self_rows_removed, 0);
    }
}
