use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Filter record
// ---------------------------------------------------------------------------

/// Independent optional bounds. An absent bound imposes no constraint.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, Deserialize)]
pub struct NumericRange<T> {
    pub min: Option<T>,
    pub max: Option<T>,
}

impl<T> Default for NumericRange<T> {
    fn default() -> Self {
        Self { min: None, max: None }
    }
}

impl<T> NumericRange<T> {
    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// Every screening dimension the dashboard supports. All fields are
/// optional; the default value constrains nothing.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct ScreeningFilters {
    /// Screen this date instead of the latest one.
    pub target_date: Option<String>,
    /// Exact instrument code.
    pub code: Option<String>,
    pub market: Option<String>,
    pub sector: Option<String>,

    pub volume: NumericRange<i64>,
    pub market_cap: NumericRange<f64>,
    pub per: NumericRange<f64>,
    pub pbr: NumericRange<f64>,
    pub roe: NumericRange<f64>,
    pub vwap: NumericRange<f64>,
    pub dividend_yield: NumericRange<f64>,
    pub volume_ratio: NumericRange<f64>,
    pub shares_issued: NumericRange<i64>,
    pub margin_buying_volume_ratio: NumericRange<f64>,
    pub short_ratio: NumericRange<f64>,

    /// `Some(true)` keeps credit issues, `Some(false)` keeps the others.
    pub is_credit_issue: Option<bool>,
    pub margin_lending_only: bool,
    pub lending_issue_only: bool,

    pub pattern_vwap_golden_cross: bool,
    pub pattern_upper_shadow: bool,
    pub pattern_volume_golden_cross: bool,
    pub pattern_price_golden_cross: bool,
}

// ---------------------------------------------------------------------------
// Result record
// ---------------------------------------------------------------------------

/// A coerced, JSON-ready cell of a screening result.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Real(f64),
    Text(String),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(v) => Some(*v as f64),
            FieldValue::Real(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// One screening result: named fields in projection order.
/// Serializes as a flat JSON object.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScreeningRecord {
    fields: Vec<(&'static str, FieldValue)>,
}

impl ScreeningRecord {
    pub fn new(fields: Vec<(&'static str, FieldValue)>) -> Self {
        Self { fields }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    pub fn f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(FieldValue::as_f64)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &FieldValue)> {
        self.fields.iter().map(|(n, v)| (*n, v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for ScreeningRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, serde::Serialize)]
pub struct ScreeningResponse {
    pub status: &'static str,
    pub data: Vec<ScreeningRecord>,
    pub count: usize,
    pub filters: ScreeningFilters,
}

#[derive(Debug, serde::Serialize)]
pub struct StockListResponse {
    pub status: &'static str,
    pub data: Vec<ScreeningRecord>,
    pub count: usize,
}
