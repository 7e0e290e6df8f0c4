//! Money formatting and currency heuristics. Pure functions, no state.

use iso_currency::Currency;
use num_format::{Locale, ToFormattedString as _};
use regex::Regex;
use std::sync::OnceLock;

use crate::models::receipt::{Amount, DEFAULT_CURRENCY};

/// Returned when an amount does not coerce to a number.
pub const NOT_AVAILABLE: &str = "N/A";

/// How a currency is conventionally written: number locale and symbol side.
#[derive(Debug, Clone, Copy)]
struct CurrencyStyle {
    locale: Locale,
    symbol_after: bool,
}

const fn before(locale: Locale) -> CurrencyStyle {
    CurrencyStyle { locale, symbol_after: false }
}

const fn after(locale: Locale) -> CurrencyStyle {
    CurrencyStyle { locale, symbol_after: true }
}

/// Currency code → conventional locale. Unlisted (but valid) codes use `en`.
const CURRENCY_LOCALES: &[(&str, CurrencyStyle)] = &[
    ("USD", before(Locale::en)),
    ("EUR", after(Locale::de)),
    ("GBP", before(Locale::en)),
    ("JPY", before(Locale::ja)),
    ("CNY", before(Locale::zh)),
    ("KRW", before(Locale::ko)),
    ("INR", before(Locale::hi)),
    ("CAD", before(Locale::en)),
    ("AUD", before(Locale::en)),
    ("NZD", before(Locale::en)),
    ("SGD", before(Locale::en)),
    ("HKD", before(Locale::en)),
    ("ZAR", before(Locale::en)),
    ("CHF", after(Locale::de)),
    ("SEK", after(Locale::sv)),
    ("NOK", after(Locale::da)),
    ("DKK", after(Locale::da)),
    ("PLN", after(Locale::pl)),
    ("CZK", after(Locale::cs)),
    ("RUB", after(Locale::ru)),
    ("TRY", before(Locale::tr)),
    ("BRL", before(Locale::pt)),
    ("MXN", before(Locale::es)),
];

fn style_for(currency: Currency) -> CurrencyStyle {
    CURRENCY_LOCALES
        .iter()
        .find(|(code, _)| *code == currency.code())
        .map(|(_, style)| *style)
        .unwrap_or(before(Locale::en))
}

fn lookup(code: &str) -> Option<Currency> {
    Currency::from_code(&code.trim().to_ascii_uppercase())
}

/// `true` iff `code` is an ISO-4217 currency the formatter can render.
#[must_use]
pub fn is_valid_currency_code(code: &str) -> bool {
    lookup(code).is_some()
}

/// Format `amount` as money with exactly two fractional digits.
///
/// Strings are coerced by their leading number; anything that is not a finite
/// number, or whose magnitude reaches [`MAX_RENDERABLE`], yields `"N/A"`.
/// Unknown currency codes are rendered as USD.
pub fn format_currency(amount: impl Into<Amount>, currency_code: &str) -> String {
    let value = amount.into().as_f64();
    if !value.is_finite() || value.abs() >= MAX_RENDERABLE {
        return NOT_AVAILABLE.to_string();
    }
    let currency = lookup(currency_code).unwrap_or(Currency::USD);
    render(value, currency)
}

/// Amounts are rendered from whole cents held in a `u128`.
pub const MAX_RENDERABLE: f64 = u128::MAX as f64 / 100.0;

fn render(value: f64, currency: Currency) -> String {
    let style = style_for(currency);
    let cents = (value.abs() * 100.0).round() as u128;
    let whole = cents / 100;
    let fraction = cents % 100;
    let number = format!(
        "{}{}{:02}",
        whole.to_formatted_string(&style.locale),
        style.locale.decimal(),
        fraction
    );
    let sign = if value < 0.0 && cents > 0 {
        style.locale.minus_sign()
    } else {
        ""
    };
    let symbol = currency.symbol().to_string();
    if style.symbol_after {
        format!("{sign}{number}\u{a0}{symbol}")
    } else {
        format!("{sign}{symbol}{number}")
    }
}

/// The glyphs a formatted amount uses for `currency_code` (e.g. `"€"`).
///
/// Formats zero and strips digits, separators and whitespace; falls back
/// to `"$"` when the code is unknown or nothing is left.
#[must_use]
pub fn get_currency_symbol(currency_code: &str) -> String {
    let Some(currency) = lookup(currency_code) else {
        return "$".to_string();
    };
    let symbol: String = render(0.0, currency)
        .chars()
        .filter(|c| !(c.is_ascii_digit() || matches!(c, '.' | ',' | '\'' | '’') || c.is_whitespace()))
        .collect();
    if symbol.is_empty() {
        "$".to_string()
    } else {
        symbol
    }
}

/// Ordered (pattern, currency) rules. First match wins, so narrower
/// patterns sit above broader ones (Hong Kong before China, Ukraine before
/// UK, the US before the bare `ca` of Canada).
const LOCATION_RULES: &[(&str, &str)] = &[
    (r"\b(japan|japanese|tokyo|osaka|kyoto|yokohama|nagoya|sapporo|fukuoka)\b|日本|東京", "JPY"),
    (r"\b(hong kong|kowloon)\b|香港", "HKD"),
    (r"\b(china|chinese|beijing|shanghai|shenzhen|guangzhou)\b|中国", "CNY"),
    (r"\b(korea|korean|seoul|busan)\b|한국", "KRW"),
    (r"\b(india|indian|mumbai|delhi|bangalore|bengaluru|chennai|kolkata|hyderabad)\b", "INR"),
    (r"\b(singapore)\b", "SGD"),
    (r"\b(thailand|thai|bangkok)\b", "THB"),
    (r"\b(vietnam|hanoi|ho chi minh)\b", "VND"),
    (r"\b(indonesia|jakarta|bali)\b", "IDR"),
    (r"\b(philippines|manila)\b", "PHP"),
    (r"\b(malaysia|kuala lumpur)\b", "MYR"),
    (r"\b(new zealand|auckland|wellington)\b", "NZD"),
    (r"\b(australia|australian|sydney|melbourne|brisbane|perth)\b", "AUD"),
    (r"\b(ukraine|ukrainian|kyiv|kiev)\b", "UAH"),
    (r"\b(united kingdom|uk|england|scotland|wales|britain|british|london|manchester|edinburgh)\b", "GBP"),
    (r"\b(switzerland|swiss|zurich|zürich|geneva|bern)\b", "CHF"),
    (r"\b(sweden|swedish|stockholm)\b", "SEK"),
    (r"\b(norway|norwegian|oslo)\b", "NOK"),
    (r"\b(denmark|danish|copenhagen)\b", "DKK"),
    (r"\b(poland|polish|warsaw|warszawa|krakow|kraków)\b", "PLN"),
    (r"\b(czech|czechia|prague|praha)\b", "CZK"),
    (r"\b(hungary|hungarian|budapest)\b", "HUF"),
    (r"\b(russia|russian|moscow)\b", "RUB"),
    (r"\b(turkey|türkiye|turkish|istanbul|ankara)\b", "TRY"),
    (r"\b(germany|german|deutschland|berlin|munich|münchen|hamburg|france|french|paris|lyon|italy|italian|rome|roma|milan|spain|spanish|madrid|barcelona|netherlands|dutch|amsterdam|belgium|brussels|austria|vienna|wien|portugal|lisbon|ireland|dublin|finland|helsinki|greece|athens|euro)\b", "EUR"),
    (r"\b(united arab emirates|uae|dubai|abu dhabi)\b", "AED"),
    (r"\b(israel|tel aviv|jerusalem)\b", "ILS"),
    (r"\b(south africa|johannesburg|cape town)\b", "ZAR"),
    (r"\b(brazil|brasil|são paulo|sao paulo|rio de janeiro)\b", "BRL"),
    (r"\b(mexico|méxico|mexican|guadalajara|monterrey)\b", "MXN"),
    (r"\b(united states|usa|u\.s\.a|america|american|new york|los angeles|chicago|san francisco|california|texas|florida|seattle|boston)\b", "USD"),
    (r"\b(canada|canadian|toronto|vancouver|montreal|montréal|ottawa|calgary|ca)\b", "CAD"),
];

fn location_rules() -> &'static [(Regex, &'static str)] {
    static RULES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    RULES.get_or_init(|| {
        LOCATION_RULES
            .iter()
            .filter_map(|(pattern, code)| Regex::new(pattern).ok().map(|re| (re, *code)))
            .collect()
    })
}

/// Guess a currency from an address and/or language/country hint.
///
/// Lower-cases and joins the hints, then returns the currency of the first
/// matching rule; `"USD"` when nothing matches.
#[must_use]
pub fn detect_currency_from_location(address: Option<&str>, language: Option<&str>) -> String {
    let haystack = [address, language]
        .into_iter()
        .flatten()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ");
    if haystack.trim().is_empty() {
        return DEFAULT_CURRENCY.to_string();
    }
    location_rules()
        .iter()
        .find(|(re, _)| re.is_match(&haystack))
        .map(|(_, code)| (*code).to_string())
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_location_rule_compiles() {
        assert_eq!(location_rules().len(), LOCATION_RULES.len());
    }

    #[test]
    fn every_styled_code_is_an_iso_currency() {
        for (code, _) in CURRENCY_LOCALES {
            assert!(is_valid_currency_code(code), "{code} not recognised");
        }
    }
}
