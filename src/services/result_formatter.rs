use std::sync::OnceLock;

use regex::Regex;

use crate::db::{DbRow, SqlValue};
use crate::models::screening::{FieldValue, ScreeningRecord};
use crate::services::screening_columns::{ColumnKind, SCREENING_COLUMNS};

fn plain_number() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)$").ok())
        .as_ref()
}

/// Parses a valuation ratio that may carry a `倍` suffix or thousands
/// separators. Sentinels (`"-"`, `"—"`, blank) and zero read as absent.
pub fn parse_decorated_ratio(raw: &str) -> Option<f64> {
    let cleaned = raw.replace('倍', "").replace(',', "");
    let cleaned = cleaned.trim();
    if !plain_number().is_some_and(|re| re.is_match(cleaned)) {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite() && *v != 0.0)
}

fn coerce(kind: ColumnKind, cell: &SqlValue) -> FieldValue {
    match kind {
        ColumnKind::Text => cell.as_text().map(FieldValue::Text).unwrap_or(FieldValue::Null),
        ColumnKind::Integer => match cell.as_i64() {
            Some(0) | None => FieldValue::Null,
            Some(v) => FieldValue::Int(v),
        },
        ColumnKind::Real => match cell.as_f64() {
            Some(v) if v != 0.0 => FieldValue::Real(v),
            _ => FieldValue::Null,
        },
        ColumnKind::Change => cell.as_f64().map(FieldValue::Real).unwrap_or(FieldValue::Null),
        ColumnKind::DecoratedRatio => {
            let parsed = match cell {
                SqlValue::Text(s) => parse_decorated_ratio(s),
                other => other.as_f64().filter(|v| *v != 0.0),
            };
            parsed.map(FieldValue::Real).unwrap_or(FieldValue::Null)
        }
        ColumnKind::Flag => FieldValue::Bool(cell.as_f64().is_some_and(|v| v != 0.0)),
    }
}

/// Turns one projected row into a transport record, field by field in
/// registry order.
pub fn format_row(row: &DbRow) -> ScreeningRecord {
    let fields = SCREENING_COLUMNS
        .iter()
        .map(|col| (col.field, coerce(col.kind, row.get(col.field))))
        .collect();
    ScreeningRecord::new(fields)
}

pub fn format_rows(rows: &[DbRow]) -> Vec<ScreeningRecord> {
    rows.iter().map(format_row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn row(cells: &[(&str, SqlValue)]) -> DbRow {
        let columns: Arc<[String]> = cells.iter().map(|(n, _)| n.to_string()).collect::<Vec<_>>().into();
        DbRow::new(columns, cells.iter().map(|(_, v)| v.clone()).collect())
    }

    #[test]
    fn test_decorated_ratio_parsing() {
        assert_eq!(parse_decorated_ratio("15.5倍"), Some(15.5));
        assert_eq!(parse_decorated_ratio("1,234.5倍"), Some(1234.5));
        assert_eq!(parse_decorated_ratio(" 0.8 "), Some(0.8));
        assert_eq!(parse_decorated_ratio("-"), None);
        assert_eq!(parse_decorated_ratio("—"), None);
        assert_eq!(parse_decorated_ratio("−"), None);
        assert_eq!(parse_decorated_ratio("−12.5倍"), None);
        assert_eq!(parse_decorated_ratio("1.2.3"), None);
        assert_eq!(parse_decorated_ratio(""), None);
        assert_eq!(parse_decorated_ratio("0倍"), None);
        assert_eq!(parse_decorated_ratio("1e3"), None);
    }

    #[test]
    fn test_all_null_row_gives_nulls_and_false_flags() {
        let record = format_row(&row(&[]));

        assert_eq!(record.len(), SCREENING_COLUMNS.len());
        for col in SCREENING_COLUMNS {
            let value = record.get(col.field).unwrap();
            match col.kind {
                ColumnKind::Flag => assert_eq!(value, &FieldValue::Bool(false), "{}", col.field),
                _ => assert!(value.is_null(), "{} should be null", col.field),
            }
        }
    }

    #[test]
    fn test_zero_is_absent_except_for_changes() {
        let record = format_row(&row(&[
            ("price", SqlValue::Real(0.0)),
            ("volume", SqlValue::Integer(0)),
            ("change_amount", SqlValue::Real(0.0)),
            ("change_percent", SqlValue::Integer(0)),
        ]));

        assert!(record.get("price").unwrap().is_null());
        assert!(record.get("volume").unwrap().is_null());
        assert_eq!(record.get("change_amount"), Some(&FieldValue::Real(0.0)));
        assert_eq!(record.get("change_percent"), Some(&FieldValue::Real(0.0)));
    }

    #[test]
    fn test_typed_coercions() {
        let record = format_row(&row(&[
            ("code", SqlValue::Text("7203".into())),
            ("volume", SqlValue::Real(1500.0)),
            ("market_cap", SqlValue::Integer(42_000_000)),
            ("per", SqlValue::Text("12.3倍".into())),
            ("pbr", SqlValue::Real(1.1)),
            ("is_credit_issue", SqlValue::Integer(1)),
            ("volume_golden_cross", SqlValue::Integer(0)),
        ]));

        assert_eq!(record.text("code"), Some("7203"));
        assert_eq!(record.get("volume"), Some(&FieldValue::Int(1500)));
        assert_eq!(record.get("market_cap"), Some(&FieldValue::Int(42_000_000)));
        assert_eq!(record.f64("per"), Some(12.3));
        assert_eq!(record.f64("pbr"), Some(1.1));
        assert_eq!(record.get("is_credit_issue"), Some(&FieldValue::Bool(true)));
        assert_eq!(record.get("volume_golden_cross"), Some(&FieldValue::Bool(false)));
    }
}
