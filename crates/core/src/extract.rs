//! Composite-field extractors.
//!
//! Each extractor takes one composite cell and degrades to `None` (or passes
//! the cell through) on absent or malformed input. Extraction never aborts a
//! pipeline run.

use chrono::NaiveDate;

use crate::table::Value;

/// Party code from `"01AAACI6306G1Z7 / IND LABORATORIES LTD"` — the text
/// before the first `/`, trimmed. Non-text cells have no code.
pub fn party_code(composite: &Value) -> Option<String> {
    let s = composite.as_str()?;
    Some(s.split('/').next().unwrap_or("").trim().to_string())
}

/// Party name — the segment between the first and second `/`, trimmed.
pub fn party_name(composite: &Value) -> Option<String> {
    let s = composite.as_str()?;
    s.split('/').nth(1).map(|p| p.trim().to_string())
}

/// Tax id: the ten characters at offsets 2..12 of the party code, clamped at
/// the end of short codes. Codes under ten characters carry no tax id.
pub fn tax_id(code: &str) -> Option<String> {
    if code.chars().count() < 10 {
        return None;
    }
    Some(code.chars().skip(2).take(10).collect())
}

/// Tax id straight from a composite party field.
pub fn tax_id_from_composite(composite: &Value) -> Option<String> {
    tax_id(&party_code(composite)?)
}

/// Transaction date from `"6713 - 02/09/2023 17:41:00"` → `"02-09-2023"`.
///
/// The date token is tried as day/month/year first, then month/day/year. A
/// token that parses as neither passes through with `/` swapped for `-`.
pub fn transaction_date(composite: &Value) -> Option<String> {
    let s = composite.as_str()?;
    let (_, rest) = s.split_once(" - ")?;
    let token = rest.split_whitespace().next()?;
    for fmt in ["%d/%m/%Y", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(token, fmt) {
            return Some(date.format("%d-%m-%Y").to_string());
        }
    }
    Some(token.replace('/', "-"))
}

/// Round to the nearest 10,000 with banker's rounding, the ROUND(value, -4)
/// convention the source workbooks used. Non-numeric text passes through
/// untouched; an empty cell stays empty.
pub fn round_to_ten_thousand(value: &Value) -> Value {
    match value {
        Value::Empty => Value::Empty,
        v => match v.as_f64() {
            Some(n) => Value::Number((n / 10_000.0).round_ties_even() * 10_000.0),
            None => v.clone(),
        },
    }
}

/// Matching key for product codes: lowercased, all whitespace stripped.
/// Used only to join datasets, never stored in output.
pub fn normalize_code(value: &Value) -> Option<String> {
    if value.is_empty() {
        return None;
    }
    let key: String = value
        .display()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn party_code_and_name_split_the_composite() {
        let cell = Value::text("01AAACI6306G1Z7 / IND LABORATORIES LTD");
        assert_eq!(party_code(&cell).as_deref(), Some("01AAACI6306G1Z7"));
        assert_eq!(party_name(&cell).as_deref(), Some("IND LABORATORIES LTD"));
    }

    #[test]
    fn party_name_takes_only_the_second_segment() {
        let cell = Value::text("07AAA / ACME / EXTRA");
        assert_eq!(party_name(&cell).as_deref(), Some("ACME"));
    }

    #[test]
    fn party_fields_are_none_for_non_text_cells() {
        assert_eq!(party_code(&Value::Empty), None);
        assert_eq!(party_code(&Value::Number(42.0)), None);
        assert_eq!(party_name(&Value::Empty), None);
        assert_eq!(party_name(&Value::text("no separator")), None);
    }

    #[test]
    fn tax_id_is_the_offset_2_slice() {
        assert_eq!(tax_id("01AAACI6306G1Z7").as_deref(), Some("AAACI6306G"));
        assert_eq!(tax_id("short").as_deref(), None);
        // Length 10 clamps to what is there past offset 2.
        assert_eq!(tax_id("0123456789").as_deref(), Some("23456789"));
    }

    #[test]
    fn transaction_date_prefers_day_month_year() {
        let cell = Value::text("6713 - 02/09/2023 17:41:00");
        assert_eq!(transaction_date(&cell).as_deref(), Some("02-09-2023"));
    }

    #[test]
    fn transaction_date_falls_back_to_month_day_year() {
        // Day slot 14 only parses with the month/day order.
        let cell = Value::text("88 - 02/14/2023 09:00:00");
        assert_eq!(transaction_date(&cell).as_deref(), Some("14-02-2023"));
    }

    #[test]
    fn unparseable_date_token_passes_through_with_dashes() {
        let cell = Value::text("88 - 99/99/9999 09:00:00");
        assert_eq!(transaction_date(&cell).as_deref(), Some("99-99-9999"));
        assert_eq!(transaction_date(&Value::text("no separator here")), None);
        assert_eq!(transaction_date(&Value::Empty), None);
    }

    #[test]
    fn rounding_is_half_to_even_at_ten_thousands() {
        assert_eq!(
            round_to_ten_thousand(&Value::Number(12_345.0)),
            Value::Number(10_000.0)
        );
        assert_eq!(
            round_to_ten_thousand(&Value::Number(15_000.0)),
            Value::Number(20_000.0)
        );
        // 25,000 is halfway between 20,000 and 30,000; even neighbor wins.
        assert_eq!(
            round_to_ten_thousand(&Value::Number(25_000.0)),
            Value::Number(20_000.0)
        );
    }

    #[test]
    fn rounding_passes_non_numeric_cells_through() {
        assert_eq!(
            round_to_ten_thousand(&Value::text("pending")),
            Value::text("pending")
        );
        assert_eq!(round_to_ten_thousand(&Value::Empty), Value::Empty);
        assert_eq!(
            round_to_ten_thousand(&Value::text("18000")),
            Value::Number(20_000.0)
        );
    }

    #[test]
    fn normalize_code_folds_case_and_whitespace() {
        assert_eq!(
            normalize_code(&Value::text(" 7208 AB ")).as_deref(),
            Some("7208ab")
        );
        assert_eq!(normalize_code(&Value::Number(7208.0)).as_deref(), Some("7208"));
        assert_eq!(normalize_code(&Value::Empty), None);
        assert_eq!(normalize_code(&Value::text("   ")), None);
    }
}
