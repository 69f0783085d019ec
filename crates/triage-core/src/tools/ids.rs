//! Extraction of order and transaction identifiers from free text

/// Words allowed between a keyword and the identifier ("order number: 42")
const FILLERS: &[&str] = &["id", "number", "no", "nr", "num", "ref", "reference", "is", "#"];

/// How far past a keyword to look for an identifier
const LOOKAHEAD: usize = 3;

/// First order id in `text`: `#123`, `ORD-123`, or a token following "order"
pub fn extract_order_id(text: &str) -> Option<String> {
    let tokens = tokenize(text);

    if let Some(id) = tokens
        .iter()
        .filter_map(|t| t.strip_prefix('#'))
        .find(|rest| is_identifier(rest))
    {
        return Some(id.to_string());
    }

    find_prefixed(&tokens, &["ORD-"]).or_else(|| find_after_keyword(&tokens, &["order", "orders"]))
}

/// First transaction id in `text`: `TXN-123`, or a token following
/// "transaction", "txn" or "payment"
pub fn extract_transaction_id(text: &str) -> Option<String> {
    let tokens = tokenize(text);
    find_prefixed(&tokens, &["TXN-", "TX-"]).or_else(|| {
        find_after_keyword(&tokens, &["transaction", "transactions", "txn", "payment"])
    })
}

fn tokenize(text: &str) -> Vec<&str> {
    text.split_whitespace()
        .map(|t| t.trim_matches(|c: char| !(c.is_alphanumeric() || matches!(c, '#' | '-' | '_'))))
        .map(|t| t.trim_end_matches('-'))
        .filter(|t| !t.is_empty())
        .collect()
}

/// Identifiers are alphanumeric (plus `-`/`_`) and contain at least one digit
fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s.chars().any(|c| c.is_ascii_digit())
        && s.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_')
}

fn find_prefixed(tokens: &[&str], prefixes: &[&str]) -> Option<String> {
    tokens
        .iter()
        .find(|t| {
            let upper = t.to_ascii_uppercase();
            prefixes
                .iter()
                .any(|p| upper.starts_with(p) && upper.len() > p.len())
                && is_identifier(t)
        })
        .map(|t| t.to_ascii_uppercase())
}

fn find_after_keyword(tokens: &[&str], keywords: &[&str]) -> Option<String> {
    for (i, token) in tokens.iter().enumerate() {
        if !keywords.contains(&token.to_lowercase().as_str()) {
            continue;
        }
        for candidate in tokens.iter().skip(i + 1).take(LOOKAHEAD) {
            let candidate = candidate.trim_start_matches('#');
            if is_identifier(candidate) {
                return Some(candidate.to_string());
            }
            if !FILLERS.contains(&candidate.to_lowercase().as_str()) && !candidate.is_empty() {
                break;
            }
        }
    }
    None
}
