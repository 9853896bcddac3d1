use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;

use tracing::debug;

use crate::models::screening::{NumericRange, ScreeningFilters};

/// Keys accepted by the minimal screening endpoint.
pub const BASIC_FILTER_KEYS: [&str; 12] = [
    "market",
    "sector",
    "min_volume",
    "max_volume",
    "min_market_cap",
    "max_market_cap",
    "min_per",
    "max_per",
    "min_pbr",
    "max_pbr",
    "min_roe",
    "max_roe",
];

/// Builds a [`ScreeningFilters`] from raw query parameters.
///
/// Fail-open: a malformed value for a recognized key is treated as absent,
/// unknown keys are ignored, and pattern flags default to `false`.
pub fn collect_filters(params: &HashMap<String, String>) -> ScreeningFilters {
    ScreeningFilters {
        target_date: text(params, "target_date"),
        code: text(params, "code"),
        market: text(params, "market"),
        sector: text(params, "sector"),

        volume: range(params, "min_volume", "max_volume"),
        market_cap: range(params, "min_market_cap", "max_market_cap"),
        per: range(params, "min_per", "max_per"),
        pbr: range(params, "min_pbr", "max_pbr"),
        roe: range(params, "min_roe", "max_roe"),
        vwap: range(params, "min_vwap", "max_vwap"),
        dividend_yield: range(params, "min_dividend_yield", "max_dividend_yield"),
        volume_ratio: range(params, "min_volume_ratio", "max_volume_ratio"),
        shares_issued: range(params, "min_shares_issued", "max_shares_issued"),
        margin_buying_volume_ratio: range(
            params,
            "min_margin_buying_volume_ratio",
            "max_margin_buying_volume_ratio",
        ),
        short_ratio: range(params, "min_short_ratio", "max_short_ratio"),

        is_credit_issue: tristate(params, "is_credit_issue"),
        margin_lending_only: flag(params, "margin_lending_only"),
        lending_issue_only: flag(params, "lending_issue_only"),

        pattern_vwap_golden_cross: flag(params, "pattern_vwap_golden_cross"),
        pattern_upper_shadow: flag(params, "pattern_upper_shadow"),
        pattern_volume_golden_cross: flag(params, "pattern_volume_golden_cross"),
        pattern_price_golden_cross: flag(params, "pattern_price_golden_cross"),
    }
}

/// Same as [`collect_filters`], restricted to [`BASIC_FILTER_KEYS`].
pub fn collect_basic_filters(params: &HashMap<String, String>) -> ScreeningFilters {
    let basic: HashMap<String, String> = params
        .iter()
        .filter(|(k, _)| BASIC_FILTER_KEYS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    collect_filters(&basic)
}

/// Parse-or-absent: the single place malformed input is swallowed.
fn parse_or_absent<T>(params: &HashMap<String, String>, key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = params.get(key)?.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<T>() {
        Ok(v) => Some(v),
        Err(e) => {
            debug!("Ignoring malformed filter {}={:?}: {}", key, raw, e);
            None
        }
    }
}

fn range<T>(params: &HashMap<String, String>, min_key: &str, max_key: &str) -> NumericRange<T>
where
    T: FromStr + Finite,
    T::Err: Display,
{
    NumericRange {
        min: parse_or_absent::<T>(params, min_key).filter(Finite::is_finite_value),
        max: parse_or_absent::<T>(params, max_key).filter(Finite::is_finite_value),
    }
}

fn text(params: &HashMap<String, String>, key: &str) -> Option<String> {
    params
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn flag(params: &HashMap<String, String>, key: &str) -> bool {
    params
        .get(key)
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

fn tristate(params: &HashMap<String, String>, key: &str) -> Option<bool> {
    let raw = params.get(key)?.trim().to_ascii_lowercase();
    match raw.as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// `"NaN"` and `"inf"` parse as `f64` but make no sense as bounds.
trait Finite {
    fn is_finite_value(&self) -> bool;
}

impl Finite for f64 {
    fn is_finite_value(&self) -> bool {
        self.is_finite()
    }
}

impl Finite for i64 {
    fn is_finite_value(&self) -> bool {
        true
    }
}
