//! Reconciler — enrich the primary dataset with descriptions and prices
//! from a reference price list, keyed by product code.

use std::collections::HashMap;

use crate::error::PipelineError;
use crate::resolve;
use crate::table::{Table, Value};

pub const QUANTITY_COL: &str = "QTY.MT";
pub const RAW_VALUE_COL: &str = "Assess Val.";

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct CleanStats {
    pub total_rows: usize,
    pub updated_rows: usize,
    pub not_updated_rows: usize,
    /// Eligible price-list entries: unique, non-empty codes left after
    /// duplicate exclusion, whether or not any primary row uses them.
    pub matched_codes: usize,
}

#[derive(Debug)]
pub struct CleanOutput {
    pub table: Table,
    /// Parallel to `table.rows`; `false` marks rows no price entry matched.
    pub updated: Vec<bool>,
    pub stats: CleanStats,
    pub warnings: Vec<String>,
}

/// Reconcile `primary` against `prices`. Product codes that appear more than
/// once in the price list are excluded from matching; among the remainder the
/// first occurrence wins.
pub fn clean(
    primary: &Table,
    prices: &Table,
    year_token: &str,
) -> Result<CleanOutput, PipelineError> {
    let mut table = primary.clone();
    tidy_headers(&mut table);
    let mut prices = prices.clone();
    tidy_headers(&mut prices);

    let p_code = resolve::find_product_code(&prices.columns)
        .ok_or_else(|| schema_err("prices", "product code", &prices))?;
    let p_desc = resolve::find_product_desc(&prices.columns)
        .ok_or_else(|| schema_err("prices", "product description", &prices))?;
    let p_price = resolve::find_price_column(&prices.columns, year_token)
        .ok_or_else(|| schema_err("prices", "price", &prices))?;
    let price_header = prices.columns[p_price].clone();

    let m_code = resolve::find_product_code(&table.columns)
        .ok_or_else(|| schema_err("primary", "product code", &table))?;
    let m_desc = resolve::find_product_desc(&table.columns)
        .ok_or_else(|| schema_err("primary", "product description", &table))?;

    let lookup = build_lookup(&prices, p_code, p_desc, p_price);

    let price_idx = match table.column_index(&price_header) {
        Some(idx) => idx,
        None => table.set_column(&price_header, vec![Value::Empty; table.rows.len()]),
    };

    let mut updated = vec![false; table.rows.len()];
    for (i, row) in table.rows.iter_mut().enumerate() {
        let Some(code) = crate::extract::normalize_code(&row[m_code]) else {
            continue;
        };
        if let Some((desc, price)) = lookup.get(&code) {
            row[m_desc] = desc.clone();
            row[price_idx] = price.clone();
            updated[i] = true;
        }
    }

    let mut warnings = Vec::new();
    match table.column_index(RAW_VALUE_COL) {
        Some(value_idx) => {
            let quantities: Vec<Value> = table
                .rows
                .iter()
                .map(|r| quantity(&r[value_idx], &r[price_idx]))
                .collect();
            table.set_column(QUANTITY_COL, quantities);
        }
        None => warnings.push(format!(
            "'{RAW_VALUE_COL}' column not found; {QUANTITY_COL} was not computed"
        )),
    }

    let updated_rows = updated.iter().filter(|u| **u).count();
    let stats = CleanStats {
        total_rows: table.rows.len(),
        updated_rows,
        not_updated_rows: table.rows.len() - updated_rows,
        matched_codes: lookup.len(),
    };

    Ok(CleanOutput {
        table,
        updated,
        stats,
        warnings,
    })
}

/// Strip embedded line breaks and edge whitespace from headers. Spreadsheet
/// exports routinely wrap header text across cell lines.
fn tidy_headers(table: &mut Table) {
    for name in &mut table.columns {
        let cleaned = name.replace(['\n', '\r'], " ");
        *name = cleaned.trim().to_string();
    }
}

fn schema_err(dataset: &str, column: &str, table: &Table) -> PipelineError {
    PipelineError::Schema {
        dataset: dataset.to_string(),
        column: column.to_string(),
        discovered: table.columns.clone(),
    }
}

fn build_lookup(
    prices: &Table,
    code: usize,
    desc: usize,
    price: usize,
) -> HashMap<String, (Value, Value)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for row in &prices.rows {
        if let Some(key) = crate::extract::normalize_code(&row[code]) {
            *counts.entry(key).or_insert(0) += 1;
        }
    }

    let mut lookup = HashMap::new();
    for row in &prices.rows {
        let Some(key) = crate::extract::normalize_code(&row[code]) else {
            continue;
        };
        if counts.get(&key).copied() != Some(1) {
            continue;
        }
        lookup
            .entry(key)
            .or_insert_with(|| (row[desc].clone(), row[price].clone()));
    }
    lookup
}

/// Tonnage from assessed value and unit price. A zero or missing price
/// leaves the quantity empty rather than dividing through.
fn quantity(value: &Value, price: &Value) -> Value {
    match (value.as_f64(), price.as_f64()) {
        (Some(v), Some(p)) if p != 0.0 => Value::Number(v / (p * 1000.0)),
        _ => Value::Empty,
    }
}
