//! Seller-side analysis and two-seller comparison.
//!
//! Transactions are attributed to sellers through the origin composite
//! column. Analysis groups keep display-name variants of one tax id as
//! separate rows; the two-seller comparison resolves names to tax ids and
//! merges the variants there.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::aggregate::{group_key, require_group_col};
use crate::error::PipelineError;
use crate::extract;
use crate::normalize::{COL_NAME, COL_PRODUCT_DESC, COL_SELLER_COMPOSITE, COL_VALUE};
use crate::reconcile::{QUANTITY_COL, RAW_VALUE_COL};
use crate::resolve;
use crate::table::{Table, Value};

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SellerRef {
    pub tax_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SellerProductRow {
    pub seller_tax_id: String,
    pub seller_name: String,
    pub buyer: String,
    pub product: String,
    pub value: f64,
    pub quantity: f64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct BuyerTotal {
    pub seller_tax_id: String,
    pub seller_name: String,
    pub buyer: String,
    pub value: f64,
    pub quantity: f64,
}

/// Summed over every attributed row of the seller, including rows the
/// per-product grouping skipped for missing buyer or product keys.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SellerTotal {
    pub tax_id: String,
    pub name: String,
    pub value: f64,
    pub quantity: f64,
}

#[derive(Debug, serde::Serialize)]
pub struct SellerAnalysis {
    pub rows: Vec<SellerProductRow>,
    pub buyer_totals: Vec<BuyerTotal>,
    pub seller_totals: Vec<SellerTotal>,
    /// One entry per tax id under its first-seen name, sorted by name.
    pub sellers: Vec<SellerRef>,
    /// Every distinct (name, tax id) pairing in encounter order, including
    /// name variants of one tax id. Used to resolve names back to tax ids.
    pub seller_directory: Vec<SellerRef>,
    pub warnings: Vec<String>,
}

/// Group the dataset by seller, buyer and product, summing value and
/// quantity.
pub fn seller_analysis(table: &Table, year_token: &str) -> Result<SellerAnalysis, PipelineError> {
    let seller_idx = require_group_col(table, COL_SELLER_COMPOSITE)?;
    let buyer_idx = require_group_col(table, COL_NAME)?;
    let product_idx = require_group_col(table, COL_PRODUCT_DESC)?;
    let value_idx = require_group_col(table, COL_VALUE)?;

    let mut warnings = Vec::new();
    let quantity_of = quantity_source(table, year_token, &mut warnings);

    // (seller tax id, seller name, buyer, product) -> summed (value, quantity)
    let mut groups: BTreeMap<(String, String, String, String), (f64, f64)> = BTreeMap::new();
    let mut first_names: HashMap<String, String> = HashMap::new();
    let mut directory: Vec<SellerRef> = Vec::new();
    let mut seller_acc: BTreeMap<String, (f64, f64)> = BTreeMap::new();

    for row in &table.rows {
        let Some(tax_id) = extract::tax_id_from_composite(&row[seller_idx]) else {
            continue;
        };
        let name = extract::party_name(&row[seller_idx]).unwrap_or_default();

        first_names.entry(tax_id.clone()).or_insert_with(|| name.clone());
        let entry = SellerRef {
            tax_id: tax_id.clone(),
            name: name.clone(),
        };
        if !directory.contains(&entry) {
            directory.push(entry);
        }

        let value = row[value_idx].as_f64().unwrap_or(0.0);
        let quantity = quantity_of(row);

        // Seller totals run over every attributed row, before the grouping
        // keys can drop any.
        let s = seller_acc.entry(tax_id.clone()).or_insert((0.0, 0.0));
        s.0 += value;
        s.1 += quantity;

        let (Some(buyer), Some(product)) =
            (group_key(&row[buyer_idx]), group_key(&row[product_idx]))
        else {
            continue;
        };
        let cell = groups
            .entry((tax_id, name, buyer, product))
            .or_insert((0.0, 0.0));
        cell.0 += value;
        cell.1 += quantity;
    }

    let rows: Vec<SellerProductRow> = groups
        .into_iter()
        .map(
            |((seller_tax_id, seller_name, buyer, product), (value, quantity))| SellerProductRow {
                seller_tax_id,
                seller_name,
                buyer,
                product,
                value,
                quantity,
            },
        )
        .collect();

    let mut buyer_acc: BTreeMap<(String, String, String), (f64, f64)> = BTreeMap::new();
    for row in &rows {
        let b = buyer_acc
            .entry((
                row.seller_tax_id.clone(),
                row.seller_name.clone(),
                row.buyer.clone(),
            ))
            .or_insert((0.0, 0.0));
        b.0 += row.value;
        b.1 += row.quantity;
    }

    let buyer_totals = buyer_acc
        .into_iter()
        .map(
            |((seller_tax_id, seller_name, buyer), (value, quantity))| BuyerTotal {
                seller_tax_id,
                seller_name,
                buyer,
                value,
                quantity,
            },
        )
        .collect();
    let seller_totals = seller_acc
        .into_iter()
        .map(|(tax_id, (value, quantity))| SellerTotal {
            name: first_names[&tax_id].clone(),
            tax_id,
            value,
            quantity,
        })
        .collect();

    let mut sellers: Vec<SellerRef> = first_names
        .iter()
        .filter(|(_, name)| !name.is_empty() && *name != "None")
        .map(|(tax_id, name)| SellerRef {
            tax_id: tax_id.clone(),
            name: name.clone(),
        })
        .collect();
    sellers.sort_by(|a, b| a.name.cmp(&b.name).then(a.tax_id.cmp(&b.tax_id)));

    Ok(SellerAnalysis {
        rows,
        buyer_totals,
        seller_totals,
        sellers,
        seller_directory: directory,
        warnings,
    })
}

/// Per-row quantity accessor. Prefers the reconciled tonnage column, then
/// recomputes from assessed value and the reference price, then zero.
fn quantity_source<'a>(
    table: &'a Table,
    year_token: &str,
    warnings: &mut Vec<String>,
) -> Box<dyn Fn(&[Value]) -> f64 + 'a> {
    if let Some(idx) = table.column_index(QUANTITY_COL) {
        return Box::new(move |row| row[idx].as_f64().unwrap_or(0.0));
    }
    let price_idx = resolve::find_price_column(&table.columns, year_token);
    let value_idx = table.column_index(RAW_VALUE_COL);
    if let (Some(price_idx), Some(value_idx)) = (price_idx, value_idx) {
        return Box::new(move |row| {
            match (row[value_idx].as_f64(), row[price_idx].as_f64()) {
                (Some(v), Some(p)) if p != 0.0 => v / (p * 1000.0),
                _ => 0.0,
            }
        });
    }
    warnings.push(format!(
        "no '{QUANTITY_COL}' column and no price data to derive it; quantities are zero"
    ));
    Box::new(|_| 0.0)
}

// ---------------------------------------------------------------------------
// Two-seller comparison
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CompareLine {
    pub buyer: String,
    pub product: String,
    pub value: f64,
    pub quantity: f64,
}

#[derive(Debug, serde::Serialize)]
pub struct SellerSide {
    pub name: String,
    pub tax_id: String,
    pub lines: Vec<CompareLine>,
    pub buyers: Vec<String>,
    pub total_value: f64,
    pub total_quantity: f64,
}

#[derive(Debug, serde::Serialize)]
pub struct CompareReport {
    pub seller1: SellerSide,
    pub seller2: SellerSide,
    pub common_buyers: Vec<String>,
    pub seller1_unique: Vec<String>,
    pub seller2_unique: Vec<String>,
    pub page: usize,
    pub total_pages: usize,
    pub per_page: usize,
    /// Page slice of the first seller's buyer list: common buyers first,
    /// then that seller's unique buyers.
    pub page_buyers: Vec<String>,
}

/// Compare two sellers picked by display name. Name matching is
/// case-insensitive over the seller directory; the matched tax id pulls in
/// every name variant of that seller.
pub fn compare_sellers(
    table: &Table,
    seller1: &str,
    seller2: &str,
    page: usize,
    per_page: usize,
    year_token: &str,
) -> Result<CompareReport, PipelineError> {
    let analysis = seller_analysis(table, year_token)?;

    let tax1 = resolve_seller(&analysis, seller1)?;
    let tax2 = resolve_seller(&analysis, seller2)?;

    let side1 = build_side(&analysis, &tax1);
    let side2 = build_side(&analysis, &tax2);

    let set1: BTreeSet<&String> = side1.buyers.iter().collect();
    let set2: BTreeSet<&String> = side2.buyers.iter().collect();
    let common_buyers: Vec<String> = set1.intersection(&set2).map(|b| (*b).clone()).collect();
    let seller1_unique: Vec<String> = set1.difference(&set2).map(|b| (*b).clone()).collect();
    let seller2_unique: Vec<String> = set2.difference(&set1).map(|b| (*b).clone()).collect();

    // Paging covers the first seller's buyer list only.
    let mut paged_buyers = common_buyers.clone();
    paged_buyers.extend(seller1_unique.iter().cloned());

    let per_page = per_page.max(1);
    let total_pages = paged_buyers.len().div_ceil(per_page).max(1);
    let page = page.clamp(1, total_pages);
    let start = (page - 1) * per_page;
    let page_buyers: Vec<String> = paged_buyers
        .iter()
        .skip(start)
        .take(per_page)
        .cloned()
        .collect();

    Ok(CompareReport {
        seller1: side1,
        seller2: side2,
        common_buyers,
        seller1_unique,
        seller2_unique,
        page,
        total_pages,
        per_page,
        page_buyers,
    })
}

fn resolve_seller(analysis: &SellerAnalysis, name: &str) -> Result<String, PipelineError> {
    let wanted = name.trim().to_lowercase();
    analysis
        .seller_directory
        .iter()
        .find(|s| s.name.trim().to_lowercase() == wanted)
        .map(|s| s.tax_id.clone())
        .ok_or_else(|| PipelineError::UnknownSeller(name.to_string()))
}

fn build_side(analysis: &SellerAnalysis, tax_id: &str) -> SellerSide {
    // Name variants of the tax id collapse here; BTreeMap re-merges lines
    // that only differed by seller display name.
    let mut lines: BTreeMap<(String, String), (f64, f64)> = BTreeMap::new();
    for row in &analysis.rows {
        if row.seller_tax_id != tax_id {
            continue;
        }
        let cell = lines
            .entry((row.buyer.clone(), row.product.clone()))
            .or_insert((0.0, 0.0));
        cell.0 += row.value;
        cell.1 += row.quantity;
    }

    let lines: Vec<CompareLine> = lines
        .into_iter()
        .map(|((buyer, product), (value, quantity))| CompareLine {
            buyer,
            product,
            value,
            quantity,
        })
        .collect();

    let buyers: Vec<String> = lines
        .iter()
        .map(|l| l.buyer.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    // Totals come from the raw per-seller sums, which also count rows the
    // grouping skipped for missing buyer or product keys.
    let (name, total_value, total_quantity) = analysis
        .seller_totals
        .iter()
        .find(|s| s.tax_id == tax_id)
        .map(|s| (s.name.clone(), s.value, s.quantity))
        .unwrap_or_default();

    SellerSide {
        name,
        tax_id: tax_id.to_string(),
        lines,
        buyers,
        total_value,
        total_quantity,
    }
}
