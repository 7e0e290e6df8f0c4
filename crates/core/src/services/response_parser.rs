//! Turning free-form model replies into typed receipt data.
//!
//! Model output is non-deterministic: the verdict may be wrapped in prose,
//! JSON may arrive inside Markdown fences, and numbers may be strings or
//! numbers. Everything here is defensive and never panics on bad input.

use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::errors::{CoreError, RejectionReason};
use crate::models::receipt::{Amount, ExtractedReceipt, ReceiptItem};
use super::currency_format::detect_currency_from_location;
use super::prompts::{NOT_RECEIPT, UNCLEAR_IMAGE, VALID_RECEIPT};

/// Match a validation reply by token containment.
///
/// Rejection tokens are checked first so a reply mentioning several tokens
/// never passes. Empty or unrecognised replies are inconclusive.
pub fn parse_validation_verdict(text: &str) -> Result<(), RejectionReason> {
    let upper = text.trim().to_ascii_uppercase();
    if upper.contains(NOT_RECEIPT) {
        Err(RejectionReason::NotReceipt)
    } else if upper.contains(UNCLEAR_IMAGE) {
        Err(RejectionReason::UnclearImage)
    } else if upper.contains(VALID_RECEIPT) {
        Ok(())
    } else {
        Err(RejectionReason::Inconclusive)
    }
}

/// Trim the reply and drop surrounding ```` ``` ```` / ```` ```json ```` fences.
pub fn strip_code_fences(text: &str) -> &str {
    let mut s = text.trim();
    if let Some(rest) = s.strip_prefix("```") {
        // Language tag ("json", "JSON", ...) runs to the end of the first line.
        s = match rest.find('\n') {
            Some(idx) if rest[..idx].trim().chars().all(|c| c.is_ascii_alphanumeric()) => &rest[idx + 1..],
            _ => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
        };
    }
    if let Some(rest) = s.trim_end().strip_suffix("```") {
        s = rest;
    }
    s.trim()
}

/// Parse a (possibly fenced) reply into a JSON value.
pub fn parse_receipt_json(text: &str) -> Result<Value, CoreError> {
    let body = strip_code_fences(text);
    if body.is_empty() {
        return Err(CoreError::Schema("the model returned an empty response".into()));
    }
    serde_json::from_str(body)
        .map_err(|e| CoreError::Schema(format!("response is not valid JSON ({e})")))
}

/// Parse and validate an extraction reply.
///
/// `items` must be an array whose entries each carry `name`, `quantity` and
/// `price`. Currency falls back to the address/country heuristic, then USD.
pub fn parse_extraction_response(
    text: &str,
    country_hint: Option<&str>,
) -> Result<ExtractedReceipt, CoreError> {
    let value = parse_receipt_json(text)?;
    let obj = value
        .as_object()
        .ok_or_else(|| CoreError::Schema("expected a JSON object".into()))?;

    let items = match obj.get("items") {
        Some(Value::Array(raw)) => raw
            .iter()
            .enumerate()
            .map(|(idx, item)| parse_item(idx, item))
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => return Err(CoreError::Schema("\"items\" must be an array".into())),
        None => return Err(CoreError::Schema("missing \"items\" array".into())),
    };

    let address = text_field(obj, "address");
    let currency = text_field(obj, "currency")
        .map(|c| c.to_ascii_uppercase())
        .filter(|c| c.len() == 3 && c.chars().all(|ch| ch.is_ascii_alphabetic()))
        .unwrap_or_else(|| detect_currency_from_location(address.as_deref(), country_hint));

    Ok(ExtractedReceipt {
        store_name: text_field(obj, "storeName"),
        address,
        phone: text_field(obj, "phone"),
        date: text_field(obj, "date").map(|d| normalize_date(&d)),
        currency,
        total_items: amount_field(obj, "totalItems"),
        items,
        tax: amount_field(obj, "tax"),
        total: amount_field(obj, "total"),
        total_discount: amount_field(obj, "totalDiscount"),
    })
}

fn parse_item(idx: usize, value: &Value) -> Result<ReceiptItem, CoreError> {
    let obj = value
        .as_object()
        .ok_or_else(|| CoreError::Schema(format!("item {idx} is not an object")))?;

    let name = match obj.get("name") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        _ => return Err(CoreError::Schema(format!("item {idx} has no valid \"name\""))),
    };
    let price = amount_field(obj, "price")
        .ok_or_else(|| CoreError::Schema(format!("item {idx} ({name}) has no valid \"price\"")))?;
    let quantity = amount_field(obj, "quantity")
        .ok_or_else(|| CoreError::Schema(format!("item {idx} ({name}) has no valid \"quantity\"")))?;

    Ok(ReceiptItem {
        name,
        quantity,
        unit_price: amount_field(obj, "unitPrice"),
        price,
    })
}

/// Models sometimes write the literal word instead of JSON null.
fn is_null_text(s: &str) -> bool {
    matches!(s.trim().to_ascii_lowercase().as_str(), "" | "null" | "n/a" | "none" | "unknown")
}

fn text_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) if !is_null_text(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn amount_field(obj: &Map<String, Value>, key: &str) -> Option<Amount> {
    match obj.get(key)? {
        Value::Number(n) => n.as_f64().map(Amount::Number),
        Value::String(s) if !is_null_text(s) => Some(Amount::Text(s.trim().to_string())),
        _ => None,
    }
}

/// Normalise common date spellings to `YYYY-MM-DD`.
///
/// Year-first forms are only read when the year has four digits. Dotted
/// dates are day-first. `DD/MM` vs `MM/DD` (slash or dash) is only resolved
/// when one side exceeds 12. Two-digit years are taken as 20YY. Ambiguous
/// or unrecognised input is returned unchanged.
pub fn normalize_date(raw: &str) -> String {
    let s = raw.trim();
    let head = s.get(..10).unwrap_or(s);

    if head.get(..4).is_some_and(|y| y.bytes().all(|b| b.is_ascii_digit()))
        && !head[4..].starts_with(|c: char| c.is_ascii_digit())
    {
        for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"] {
            if let Ok(d) = NaiveDate::parse_from_str(head, fmt) {
                return d.format("%Y-%m-%d").to_string();
            }
        }
    }

    let dotted = s.contains('.');
    let parts: Vec<&str> = s.split(&['.', '/', '-'][..]).collect();
    let [a, b, y] = parts.as_slice() else {
        return s.to_string();
    };
    let numeric = |p: &str, lens: &[usize]| {
        lens.contains(&p.len()) && p.bytes().all(|c| c.is_ascii_digit())
    };
    if !(numeric(*a, &[1, 2]) && numeric(*b, &[1, 2]) && numeric(*y, &[2, 4])) {
        return s.to_string();
    }
    let (Ok(a), Ok(b), Ok(y)) = (a.parse::<u32>(), b.parse::<u32>(), y.parse::<i32>()) else {
        return s.to_string();
    };

    let year = if y < 100 { 2000 + y } else { y };
    let (day, month) = match (a > 12, b > 12) {
        _ if dotted => (a, b),
        (true, false) => (a, b),
        (false, true) => (b, a),
        _ if a == b => (a, b),
        _ => return s.to_string(),
    };
    NaiveDate::from_ymd_opt(year, month, day)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| s.to_string())
}
