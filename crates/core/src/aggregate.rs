//! Buyer-level aggregation over the normalized dataset.

use std::collections::BTreeMap;

use crate::error::PipelineError;
use crate::normalize::{COL_NAME, COL_PRODUCT_DESC, COL_TAX_ID, COL_VALUE};
use crate::table::{Table, Value};

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SummaryRow {
    pub tax_id: String,
    pub name: String,
    pub product: String,
    pub product_value: f64,
    /// Grand total across all products of this buyer, repeated on each of
    /// the buyer's rows.
    pub total_value: f64,
}

pub(crate) fn require_group_col(table: &Table, name: &str) -> Result<usize, PipelineError> {
    table
        .column_index(name)
        .ok_or_else(|| PipelineError::Aggregation {
            column: name.to_string(),
            discovered: table.columns.clone(),
        })
}

/// Grouping key for one cell. Numeric cells key on their display text;
/// empty cells have no key and drop the row from the grouping.
pub(crate) fn group_key(value: &Value) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.display())
    }
}

/// Group by buyer and product, summing rounded values. Rows with any empty
/// grouping key are silently skipped.
pub fn buyer_summary(table: &Table) -> Result<Vec<SummaryRow>, PipelineError> {
    let tax_idx = require_group_col(table, COL_TAX_ID)?;
    let name_idx = require_group_col(table, COL_NAME)?;
    let product_idx = require_group_col(table, COL_PRODUCT_DESC)?;
    let value_idx = require_group_col(table, COL_VALUE)?;

    let mut groups: BTreeMap<(String, String, String), f64> = BTreeMap::new();
    for row in &table.rows {
        let (Some(tax_id), Some(name), Some(product)) = (
            group_key(&row[tax_idx]),
            group_key(&row[name_idx]),
            group_key(&row[product_idx]),
        ) else {
            continue;
        };
        let value = row[value_idx].as_f64().unwrap_or(0.0);
        *groups.entry((tax_id, name, product)).or_insert(0.0) += value;
    }

    let mut totals: BTreeMap<(String, String), f64> = BTreeMap::new();
    for ((tax_id, name, _), value) in &groups {
        *totals
            .entry((tax_id.clone(), name.clone()))
            .or_insert(0.0) += value;
    }

    Ok(groups
        .into_iter()
        .map(|((tax_id, name, product), product_value)| {
            let total_value = totals[&(tax_id.clone(), name.clone())];
            SummaryRow {
                tax_id,
                name,
                product,
                product_value,
                total_value,
            }
        })
        .collect())
}

/// Lay the summary out as a table for export.
pub fn to_table(rows: &[SummaryRow]) -> Table {
    let mut table = Table::new(vec![
        COL_TAX_ID.into(),
        COL_NAME.into(),
        COL_PRODUCT_DESC.into(),
        COL_VALUE.into(),
        "Total Value".into(),
    ]);
    for row in rows {
        table.push_row(vec![
            Value::text(&row.tax_id),
            Value::text(&row.name),
            Value::text(&row.product),
            Value::Number(row.product_value),
            Value::Number(row.total_value),
        ]);
    }
    table
}
