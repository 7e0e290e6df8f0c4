//! Prompt text for the two-stage model protocol.

/// Reply token: the image is a readable receipt.
pub const VALID_RECEIPT: &str = "VALID_RECEIPT";
/// Reply token: the image is not a receipt.
pub const NOT_RECEIPT: &str = "NOT_RECEIPT";
/// Reply token: a receipt, but unreadable.
pub const UNCLEAR_IMAGE: &str = "UNCLEAR_IMAGE";

pub const VALIDATION_PROMPT: &str = "\
You are a strict document classifier. Look at the attached image and decide whether it is a \
purchase receipt (a store, restaurant or service receipt listing purchased items and amounts).

Respond with EXACTLY ONE of the following tokens and nothing else:
- VALID_RECEIPT: the image is a receipt and its text is legible enough to read items and totals.
- NOT_RECEIPT: the image is not a receipt (e.g. a person, landscape, screenshot, invoice template, \
or any other document).
- UNCLEAR_IMAGE: the image may be a receipt but it is too blurry, dark, cropped or low-resolution \
to read reliably.";

pub const CONNECTION_TEST_PROMPT: &str = "Respond with OK";

const EXTRACTION_PROMPT: &str = r#"You are a receipt data extraction engine. Extract the data from the attached receipt image and return ONLY a JSON object with exactly this shape:

{
  "storeName": "string or null",
  "address": "string or null",
  "phone": "string or null",
  "date": "YYYY-MM-DD or null",
  "currency": "ISO-4217 3-letter code",
  "totalItems": "string or null",
  "items": [
    { "name": "string", "quantity": "string", "unitPrice": "string or null", "price": "string" }
  ],
  "tax": "string or null",
  "total": "string or null",
  "totalDiscount": "string or null"
}

Rules:
1. Every purchased product is one entry in "items", in the order it appears on the receipt. "price" is the line total, "unitPrice" the price of one unit.
2. Discounts, coupons and promotions are SEPARATE entries in "items" with a NEGATIVE "price" (and negative "unitPrice" if shown). Never subtract a discount from another item's price.
3. "totalDiscount" is the sum of all discounts as a positive number, or null if there are none.
4. "totalItems" counts only purchased items with a positive price, summing their quantities. Discount lines and tax are NOT items. If the receipt prints an explicit item count, use that number instead.
5. "currency": first use explicit currency symbols or codes printed on the receipt. If there are none, infer it from the store address, language and locale. If it still cannot be determined, use "USD". Always return an ISO-4217 3-letter code.
6. "date" must be normalized to YYYY-MM-DD.
7. Write all numbers as strings exactly as printed, using "." as the decimal separator.
8. If a field cannot be read, use null. Never invent values. The only exception is "currency", which must always have a value.
9. Return raw JSON only: no Markdown, no code fences, no commentary."#;

/// Extraction prompt, optionally with the user's country as locale context.
pub fn extraction_prompt(country_hint: Option<&str>) -> String {
    match country_hint.map(str::trim).filter(|c| !c.is_empty()) {
        Some(country) => format!(
            "{EXTRACTION_PROMPT}\n\nContext: the user indicated this receipt is from {country}. \
             Use this only to infer the currency and date format when the receipt itself is ambiguous."
        ),
        None => EXTRACTION_PROMPT.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_prompt_names_every_token() {
        for token in [VALID_RECEIPT, NOT_RECEIPT, UNCLEAR_IMAGE] {
            assert!(VALIDATION_PROMPT.contains(token));
        }
    }

    #[test]
    fn country_hint_is_appended() {
        assert!(extraction_prompt(Some("Japan")).contains("from Japan"));
        assert_eq!(extraction_prompt(Some("  ")), extraction_prompt(None));
    }
}
