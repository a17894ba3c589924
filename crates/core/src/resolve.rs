//! Fuzzy column discovery.
//!
//! Spreadsheet exports rarely agree on exact header text, so required columns
//! are located by predicate over a folded header form rather than by name.

/// Find the first header whose folded form (lowercased, spaces and
/// underscores removed) satisfies `predicate`.
pub fn resolve_column(headers: &[String], predicate: impl Fn(&str) -> bool) -> Option<usize> {
    headers.iter().position(|h| predicate(&fold(h)))
}

fn fold(header: &str) -> String {
    header
        .to_lowercase()
        .chars()
        .filter(|c| *c != ' ' && *c != '_')
        .collect()
}

pub fn find_product_code(headers: &[String]) -> Option<usize> {
    resolve_column(headers, |h| h.contains("hsn") && h.contains("code"))
}

pub fn find_product_desc(headers: &[String]) -> Option<usize> {
    resolve_column(headers, |h| h.contains("hsn") && h.contains("desc"))
}

/// Reference-price column carrying the year token. Falls back to the bare
/// leading year when no header carries the full token.
pub fn find_price_column(headers: &[String], token: &str) -> Option<usize> {
    if let Some(idx) = headers.iter().position(|h| h.contains(token)) {
        return Some(idx);
    }
    let year: String = token.chars().take_while(|c| c.is_ascii_digit()).collect();
    if year.is_empty() {
        return None;
    }
    headers.iter().position(|h| h.contains(&year))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn product_columns_match_through_case_spacing_and_underscores() {
        let h = headers(&["Serial No", "HSN_CODE", "hsn  desc."]);
        assert_eq!(find_product_code(&h), Some(1));
        assert_eq!(find_product_desc(&h), Some(2));
    }

    #[test]
    fn missing_columns_resolve_to_none() {
        let h = headers(&["Serial No", "VALUE"]);
        assert_eq!(find_product_code(&h), None);
        assert_eq!(find_product_desc(&h), None);
    }

    #[test]
    fn price_column_matches_full_token_then_bare_year() {
        let h = headers(&["HSN Code", "Rate 2024-25 (Rs)"]);
        assert_eq!(find_price_column(&h, "2024-25"), Some(1));

        let h = headers(&["HSN Code", "2024 rate"]);
        assert_eq!(find_price_column(&h, "2024-25"), Some(1));

        let h = headers(&["HSN Code", "2023 rate"]);
        assert_eq!(find_price_column(&h, "2024-25"), None);
    }
}
