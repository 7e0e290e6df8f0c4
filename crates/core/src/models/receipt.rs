use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use uuid::Uuid;

/// Currency used when neither the receipt nor its location reveals one.
pub const DEFAULT_CURRENCY: &str = "USD";

/// A monetary value or count as the model emitted it.
///
/// The model may answer with `"6.00"` or `6`; the original representation
/// is kept for display, while [`Amount::as_f64`] coerces for arithmetic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Number(f64),
    Text(String),
}

fn numeric_prefix() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").ok())
        .as_ref()
}

fn is_currency_glyph(c: char) -> bool {
    !(c.is_alphanumeric() || c == '-' || c == '+' || c == '.')
}

/// Parse the leading numeric part of `s`, ignoring a leading currency symbol.
///
/// Only the leading number counts: `"6.00 EUR"` → 6.0, `"1,234"` → 1.0, `"abc"` → NaN.
/// A minus printed before the symbol (`"-$5.00"`) or after the number
/// (`"5.00-"`) makes the amount negative.
pub fn parse_amount(s: &str) -> f64 {
    let body = s.trim().trim_start_matches(is_currency_glyph);
    let (leading_minus, body) = match body.strip_prefix('-') {
        Some(rest) if rest.starts_with(is_currency_glyph) => {
            (true, rest.trim_start_matches(is_currency_glyph))
        }
        _ => (false, body),
    };

    let Some(m) = numeric_prefix().and_then(|re| re.find(body)) else {
        return f64::NAN;
    };
    let Ok(value) = m.as_str().parse::<f64>() else {
        return f64::NAN;
    };

    let trailing_minus = !m.as_str().starts_with(&['+', '-'][..])
        && body[m.end()..]
            .trim_start()
            .strip_prefix('-')
            .is_some_and(|rest| !rest.starts_with(|c: char| c.is_ascii_digit()));

    if leading_minus || trailing_minus {
        -value.abs()
    } else {
        value
    }
}

impl Amount {
    /// Numeric value, or NaN if the text holds no leading number.
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        match self {
            Amount::Number(n) => *n,
            Amount::Text(s) => parse_amount(s),
        }
    }

    /// `Some(value)` when the amount coerces to a finite number.
    #[must_use]
    pub fn to_finite(&self) -> Option<f64> {
        let v = self.as_f64();
        v.is_finite().then_some(v)
    }

    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.to_finite().is_some_and(|v| v < 0.0)
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Amount::Number(n) => write!(f, "{n}"),
            Amount::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<f64> for Amount {
    fn from(v: f64) -> Self {
        Amount::Number(v)
    }
}

impl From<&str> for Amount {
    fn from(s: &str) -> Self {
        Amount::Text(s.to_string())
    }
}

impl From<String> for Amount {
    fn from(s: String) -> Self {
        Amount::Text(s)
    }
}

impl From<&Amount> for Amount {
    fn from(a: &Amount) -> Self {
        a.clone()
    }
}

/// One line of a receipt. Discounts are lines with a negative `price`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptItem {
    pub name: String,
    pub quantity: Amount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Amount>,
    pub price: Amount,
}

impl ReceiptItem {
    pub fn new(name: impl Into<String>, quantity: impl Into<Amount>, price: impl Into<Amount>) -> Self {
        Self {
            name: name.into(),
            quantity: quantity.into(),
            unit_price: None,
            price: price.into(),
        }
    }

    #[must_use]
    pub fn with_unit_price(mut self, unit_price: impl Into<Amount>) -> Self {
        self.unit_price = Some(unit_price.into());
        self
    }

    /// A discount or promotion line.
    #[must_use]
    pub fn is_discount(&self) -> bool {
        self.price.is_negative()
    }

    /// The unit price, falling back to `price` for single-quantity lines.
    #[must_use]
    pub fn effective_unit_price(&self) -> Option<Amount> {
        if let Some(unit) = &self.unit_price {
            return Some(unit.clone());
        }
        match self.quantity.to_finite() {
            Some(q) if q == 1.0 => Some(self.price.clone()),
            _ => None,
        }
    }
}

/// The fields the model is responsible for, after parsing and normalisation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtractedReceipt {
    pub store_name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub date: Option<String>,
    pub currency: String,
    pub total_items: Option<Amount>,
    pub items: Vec<ReceiptItem>,
    pub tax: Option<Amount>,
    pub total: Option<Amount>,
    pub total_discount: Option<Amount>,
}

/// Fields kept for readers of the older history schema.
///
/// Always derived from the canonical fields; never set independently.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegacyFields {
    products: Vec<ReceiptItem>,
    total_spending: Option<Amount>,
    extraction_date: DateTime<Utc>,
    file_name: String,
}

impl LegacyFields {
    fn derive(items: &[ReceiptItem], total: Option<&Amount>, timestamp: DateTime<Utc>, file_name: &str) -> Self {
        Self {
            products: items.to_vec(),
            total_spending: total.cloned(),
            extraction_date: timestamp,
            file_name: file_name.to_string(),
        }
    }

    pub fn products(&self) -> &[ReceiptItem] {
        &self.products
    }

    pub fn total_spending(&self) -> Option<&Amount> {
        self.total_spending.as_ref()
    }

    pub fn extraction_date(&self) -> DateTime<Utc> {
        self.extraction_date
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

/// The result of one successful extraction.
///
/// Created once per extraction and never updated in place; history only
/// ever adds or removes whole records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredReceipt")]
pub struct ReceiptData {
    pub id: String,
    pub store_name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub date: Option<String>,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_items: Option<Amount>,
    pub items: Vec<ReceiptItem>,
    pub tax: Option<Amount>,
    pub total: Option<Amount>,
    pub total_discount: Option<Amount>,
    pub timestamp: DateTime<Utc>,
    pub file_name: String,
    #[serde(flatten)]
    legacy: LegacyFields,
}

impl ReceiptData {
    /// Wrap model output with a fresh id and the current time.
    pub fn new(extracted: ExtractedReceipt, file_name: impl Into<String>) -> Self {
        Self::with_metadata(extracted, generate_id(), file_name, Utc::now())
    }

    /// Wrap model output with explicit metadata.
    pub fn with_metadata(
        extracted: ExtractedReceipt,
        id: impl Into<String>,
        file_name: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let file_name = file_name.into();
        let legacy = LegacyFields::derive(
            &extracted.items,
            extracted.total.as_ref(),
            timestamp,
            &file_name,
        );
        Self {
            id: id.into(),
            store_name: extracted.store_name,
            address: extracted.address,
            phone: extracted.phone,
            date: extracted.date,
            currency: extracted.currency,
            total_items: extracted.total_items,
            items: extracted.items,
            tax: extracted.tax,
            total: extracted.total,
            total_discount: extracted.total_discount,
            timestamp,
            file_name,
            legacy,
        }
    }

    pub fn legacy(&self) -> &LegacyFields {
        &self.legacy
    }

    /// Purchased (non-discount) lines.
    pub fn purchased_items(&self) -> impl Iterator<Item = &ReceiptItem> {
        self.items.iter().filter(|i| i.price.to_finite().is_some_and(|p| p > 0.0))
    }

    /// Explicit `totalItems` when it is numeric, otherwise the sum of the
    /// quantities of positive-price lines.
    #[must_use]
    pub fn derived_total_items(&self) -> f64 {
        if let Some(explicit) = self.total_items.as_ref().and_then(Amount::to_finite) {
            return explicit;
        }
        self.purchased_items()
            .filter_map(|i| i.quantity.to_finite())
            .sum()
    }

    /// Sum of the negative lines, as a positive number.
    #[must_use]
    pub fn discount_sum(&self) -> f64 {
        self.items
            .iter()
            .filter_map(|i| i.price.to_finite())
            .filter(|p| *p < 0.0)
            .map(f64::abs)
            .sum()
    }

    /// Render the receipt as CSV: one row per line item, then summary rows.
    /// Columns: name, quantity, unit_price, price
    #[must_use]
    pub fn to_csv(&self) -> String {
        let mut csv = String::from("name,quantity,unit_price,price\n");
        for item in &self.items {
            let unit = item
                .unit_price
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default();
            csv.push_str(&format!(
                "{},{},{},{}\n",
                escape_csv(&item.name),
                escape_csv(&item.quantity.to_string()),
                escape_csv(&unit),
                escape_csv(&item.price.to_string()),
            ));
        }
        for (label, value) in [
            ("Discount", &self.total_discount),
            ("Tax", &self.tax),
            ("Total", &self.total),
        ] {
            if let Some(v) = value {
                csv.push_str(&format!("{label},,,{}\n", escape_csv(&v.to_string())));
            }
        }
        csv
    }
}

fn escape_csv(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// `<millis>-<random>`: unique within a session even for back-to-back extractions.
fn generate_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", Utc::now().timestamp_millis(), &suffix[..9])
}

/// On-disk shape of a history record. Legacy keys are ignored on read and
/// recomputed so the two representations cannot drift.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredReceipt {
    id: String,
    #[serde(default)]
    store_name: Option<String>,
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default = "default_currency")]
    currency: String,
    #[serde(default)]
    total_items: Option<Amount>,
    #[serde(default)]
    items: Vec<ReceiptItem>,
    #[serde(default)]
    tax: Option<Amount>,
    #[serde(default)]
    total: Option<Amount>,
    #[serde(default)]
    total_discount: Option<Amount>,
    timestamp: DateTime<Utc>,
    file_name: String,
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

impl From<StoredReceipt> for ReceiptData {
    fn from(s: StoredReceipt) -> Self {
        let extracted = ExtractedReceipt {
            store_name: s.store_name,
            address: s.address,
            phone: s.phone,
            date: s.date,
            currency: s.currency,
            total_items: s.total_items,
            items: s.items,
            tax: s.tax,
            total: s.total,
            total_discount: s.total_discount,
        };
        ReceiptData::with_metadata(extracted, s.id, s.file_name, s.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_amount_follows_leading_prefix() {
        assert_eq!(parse_amount("6.00"), 6.0);
        assert_eq!(parse_amount("  -1.50 "), -1.5);
        assert_eq!(parse_amount("$12.30"), 12.3);
        assert_eq!(parse_amount("1,234.56"), 1.0);
        assert_eq!(parse_amount(".5"), 0.5);
        assert!(parse_amount("not-a-number").is_nan());
        assert!(parse_amount("").is_nan());
        assert!(parse_amount("-").is_nan());
    }

    #[test]
    fn parse_amount_keeps_printed_minus() {
        assert_eq!(parse_amount("-$5.00"), -5.0);
        assert_eq!(parse_amount("- €2.50"), -2.5);
        assert_eq!(parse_amount("$-5.00"), -5.0);
        assert_eq!(parse_amount("-5.00"), -5.0);
        assert_eq!(parse_amount("5.00-"), -5.0);
        assert_eq!(parse_amount("5.00- A"), -5.0);
        assert_eq!(parse_amount("5-6"), 5.0);
        assert_eq!(parse_amount("6.00 EUR"), 6.0);
    }

    #[test]
    fn generated_ids_differ() {
        assert_ne!(generate_id(), generate_id());
    }

    #[test]
    fn csv_escapes_commas_and_quotes() {
        assert_eq!(escape_csv("a,b"), "\"a,b\"");
        assert_eq!(escape_csv("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_csv("plain"), "plain");
    }
}
