//! # Payment Status
//!
//! Decides whether a gateway status means "paid". Gateways report status as
//! free text in English or Portuguese, or as numeric codes.
//!
//! ```text
//! "Capturado"            ──► contains "capturad"   ──► paid
//! "APPROVED"             ──► contains "approved"   ──► paid
//! "5" / "8"              ──► exact code            ──► paid
//! "Aguardando Pagamento" ──► no token              ──► not paid
//! "unpaid" / "Disapproved"       ──► negating prefix ──► not paid
//! "não pago" / "Not captured"    ──► negating word   ──► not paid
//! ```
//!
//! A token counts only where it is not negated, so every occurrence is
//! checked against the prefix glued to it and the two words before it.

use crate::types::OrderStatus;

/// Substrings that mean the charge went through.
const PAID_TOKENS: &[&str] = &[
    "approved",
    "aprovad",
    "captured",
    "capturad",
    "succeeded",
    "paid",
    "pago",
];

/// Numeric gateway codes for a paid charge.
const PAID_CODES: &[&str] = &["5", "8"];

/// Prefixes that negate a token they are glued to ("unpaid", "desaprovado").
const NEGATING_PREFIXES: &[&str] = &["un", "dis", "des", "non"];

/// Words that negate a token shortly after them ("não aprovado").
const NEGATING_WORDS: &[&str] = &["não", "nao", "not", "no", "never", "nunca"];

/// How many words before a token are checked for a negation.
const NEGATION_REACH: usize = 2;

/// True when a gateway status string or code means the charge is paid.
///
/// ## Example
/// ```rust
/// use revenda_core::payment_status::is_paid_status;
///
/// assert!(is_paid_status("Capturado"));
/// assert!(is_paid_status("5"));
/// assert!(!is_paid_status("Aguardando Pagamento"));
/// ```
pub fn is_paid_status(status: &str) -> bool {
    let status = status.trim().to_lowercase();
    if status.is_empty() {
        return false;
    }

    if PAID_CODES.contains(&status.as_str()) {
        return true;
    }

    PAID_TOKENS.iter().any(|token| {
        status
            .match_indices(token)
            .any(|(at, _)| !is_negated(&status[..at]))
    })
}

/// Whether the text leading up to a token negates it.
fn is_negated(before: &str) -> bool {
    let word_start = before
        .rfind(char::is_whitespace)
        .map(|i| i + before[i..].chars().next().map_or(1, char::len_utf8))
        .unwrap_or(0);
    let (earlier, glued) = before.split_at(word_start);

    let glued = glued.trim_matches(|c: char| !c.is_alphanumeric());
    if NEGATING_PREFIXES.iter().any(|p| glued.ends_with(p)) {
        return true;
    }

    earlier
        .split_whitespace()
        .rev()
        .take(NEGATION_REACH)
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .any(|w| NEGATING_WORDS.contains(&w))
}

/// True when either the order itself is paid or its gateway status is.
pub fn is_order_paid(status: OrderStatus, gateway_status: Option<&str>) -> bool {
    status == OrderStatus::Paid || gateway_status.map(is_paid_status).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paid_tokens() {
        for status in ["Capturado", "aprovado", "APPROVED", "captured", "succeeded", "paid", "Pago"] {
            assert!(is_paid_status(status), "{status} should be paid");
        }
    }

    #[test]
    fn test_numeric_codes_exact() {
        assert!(is_paid_status("5"));
        assert!(is_paid_status(" 8 "));
        assert!(!is_paid_status("15"));
        assert!(!is_paid_status("3"));
    }

    #[test]
    fn test_not_paid() {
        for status in [
            "Aguardando Pagamento",
            "pending",
            "unpaid",
            "Não pago",
            "nao pago",
            "not paid",
            "Não aprovado",
            "nao aprovado",
            "not approved",
            "Disapproved",
            "Pagamento não aprovado",
            "Not captured",
            "non-captured",
            "Desaprovado",
            "Reprovado",
            "Não capturado",
            "",
        ] {
            assert!(!is_paid_status(status), "{status} should not be paid");
        }
    }

    #[test]
    fn test_negation_is_local_to_the_token() {
        assert!(is_paid_status("Pagamento aprovado"));
        assert!(is_paid_status("pre-approved"));
        // The negation is too far back to reach the token
        assert!(is_paid_status("no issues found, payment approved"));
    }

    #[test]
    fn test_order_paid() {
        assert!(is_order_paid(OrderStatus::Paid, None));
        assert!(is_order_paid(OrderStatus::Pending, Some("Capturado")));
        assert!(!is_order_paid(OrderStatus::Pending, Some("waiting")));
        assert!(!is_order_paid(OrderStatus::Pending, None));
    }
}
