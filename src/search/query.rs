/// Splits user text into lowercase alphanumeric terms.
pub fn terms(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|term| !term.is_empty())
        .map(|term| term.to_lowercase())
        .collect()
}

/// Builds an FTS5 MATCH expression from free text.
///
/// Every term becomes a quoted prefix phrase and terms are implicitly ANDed,
/// e.g. `Cheese-Burger` becomes `"cheese"* "burger"*`. Returns `None` when the
/// text holds no terms at all.
pub fn fts_query(text: &str) -> Option<String> {
    let terms = terms(text);
    if terms.is_empty() {
        return None;
    }

    Some(
        terms
            .iter()
            .map(|term| format!("\"{term}\"*"))
            .collect::<Vec<_>>()
            .join(" "),
    )
}
