//! The screening projection, declared once.
//!
//! The query builder renders `SELECT` from this list and the result
//! formatter unpacks rows with it, so the two cannot drift apart.

use crate::models::capability::{Capability, CapabilityMap};

/// ROE recomputed from EPS/BPS; undefined when either is zero.
pub const ROE_SQL: &str =
    "(CASE WHEN sd.eps != 0 AND sd.bps != 0 THEN (CAST(sd.eps AS REAL) / sd.bps * 100) ELSE NULL END)";

/// 1 when either margin balance is recorded, otherwise 0.
pub const CREDIT_ISSUE_SQL: &str =
    "(CASE WHEN sd.margin_buying IS NOT NULL OR sd.margin_selling IS NOT NULL THEN 1 ELSE 0 END)";

/// Value the indicator table uses for issues eligible for stock lending.
pub const LENDING_ISSUE_CATEGORY: &str = "貸借";

/// How a raw cell becomes a transport value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    /// Counts and monetary amounts. Null or zero reads as null.
    Integer,
    /// Prices and ratios. Null or zero reads as null.
    Real,
    /// Signed deltas where zero is a real observation.
    Change,
    /// Text with a unit suffix (`"15.5倍"`) or a sentinel (`"-"`).
    DecoratedRatio,
    /// Precomputed boolean; null reads as "did not occur".
    Flag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnSource {
    /// Expression over `stock_database sd`.
    Stock(&'static str),
    /// Column of `stock_indicators si`, projected only when confirmed.
    Indicator {
        column: &'static str,
        requires: Capability,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreeningColumn {
    pub field: &'static str,
    pub source: ColumnSource,
    pub kind: ColumnKind,
}

const fn stock(field: &'static str, expr: &'static str, kind: ColumnKind) -> ScreeningColumn {
    ScreeningColumn { field, source: ColumnSource::Stock(expr), kind }
}

const fn indicator(field: &'static str, requires: Capability, kind: ColumnKind) -> ScreeningColumn {
    ScreeningColumn {
        field,
        source: ColumnSource::Indicator { column: field, requires },
        kind,
    }
}

use Capability as Cap;
use ColumnKind as K;

pub const SCREENING_COLUMNS: &[ScreeningColumn] = &[
    stock("code", "sd.code", K::Text),
    stock("name", "sd.name", K::Text),
    stock("stock_date", "sd.date", K::Text),
    stock("price", "sd.price", K::Real),
    stock("change_amount", "sd.change_amount", K::Change),
    stock("change_percent", "sd.change_percent", K::Change),
    stock("volume", "sd.volume", K::Integer),
    stock("volume_ratio", "sd.volume_ratio", K::Real),
    stock("market_cap", "sd.market_cap", K::Integer),
    stock("per", "sd.per", K::DecoratedRatio),
    stock("pbr", "sd.pbr", K::DecoratedRatio),
    stock("roe", ROE_SQL, K::Real),
    stock("sector", "sd.industry", K::Text),
    stock("industry", "sd.industry", K::Text),
    stock("market", "sd.market", K::Text),
    stock("dividend_yield", "sd.dividend_yield", K::Real),
    stock("margin_buying", "sd.margin_buying", K::Integer),
    stock("margin_selling", "sd.margin_selling", K::Integer),
    stock("margin_ratio", "sd.margin_ratio", K::Real),
    stock("is_credit_issue", CREDIT_ISSUE_SQL, K::Flag),
    stock("yearly_high", "sd.yearly_high", K::Real),
    stock("yearly_low", "sd.yearly_low", K::Real),
    stock("yearly_low_date", "sd.yearly_low_date", K::Text),
    stock("shares_issued", "sd.shares_issued", K::Integer),
    stock("vwap", "sd.vwap", K::Real),
    stock("high", "sd.high_price", K::Real),
    stock("low", "sd.low_price", K::Real),
    stock("open", "sd.open_price", K::Real),
    stock("jsf_loan_balance", "sd.jsf_loan_balance", K::Integer),
    stock("jsf_stock_lending_balance", "sd.jsf_stock_lending_balance", K::Integer),
    stock("jsf_net_balance", "sd.jsf_net_balance", K::Integer),
    indicator("price_deviation_20", Cap::IndicatorTable, K::Change),
    indicator("price_deviation_100", Cap::IndicatorTable, K::Change),
    indicator("volume_deviation_20", Cap::IndicatorTable, K::Change),
    indicator("volume_deviation_100", Cap::IndicatorTable, K::Change),
    indicator("ma5", Cap::IndicatorTable, K::Real),
    indicator("ma25", Cap::IndicatorTable, K::Real),
    indicator("ma50", Cap::IndicatorTable, K::Real),
    indicator("ma75", Cap::IndicatorTable, K::Real),
    indicator("rsi14", Cap::IndicatorTable, K::Real),
    indicator("stock_lending_repayment_ratio", Cap::StockLendingRepaymentRatio, K::Real),
    indicator("jsf_diff_ratio", Cap::JsfDiffRatio, K::Change),
    indicator("short_ratio", Cap::ShortRatio, K::Real),
    indicator("margin_buying_deviation_20", Cap::MarginBuyingDeviation20, K::Change),
    indicator("margin_buying_volume_ratio", Cap::MarginBuyingVolumeRatio, K::Real),
    indicator("volume_golden_cross", Cap::VolumeGoldenCross, K::Flag),
    indicator("price_golden_cross", Cap::PriceGoldenCross, K::Flag),
    indicator("vwap_golden_cross", Cap::VwapGoldenCross, K::Flag),
    indicator("margin_category", Cap::MarginCategory, K::Text),
];

impl ScreeningColumn {
    /// SQL for this column, or `None` when its source is unconfirmed.
    pub fn expression(&self, capabilities: &CapabilityMap) -> Option<String> {
        match self.source {
            ColumnSource::Stock(expr) => Some(expr.to_string()),
            ColumnSource::Indicator { column, requires } => {
                capabilities.has(requires).then(|| format!("si.{}", column))
            }
        }
    }
}

/// The `SELECT` list: one `<expr> AS <field>` per column, `NULL AS <field>`
/// for unconfirmed indicator columns.
pub fn select_list(capabilities: &CapabilityMap) -> String {
    SCREENING_COLUMNS
        .iter()
        .map(|col| match col.expression(capabilities) {
            Some(expr) => format!("{} AS {}", expr, col.field),
            None => format!("NULL AS {}", col.field),
        })
        .collect::<Vec<_>>()
        .join(",\n    ")
}

/// Strips the unit suffix and thousands separators from a decorated ratio
/// column and casts it. Accepts the same shape as
/// [`parse_decorated_ratio`](crate::services::result_formatter::parse_decorated_ratio):
/// an optional leading sign, digits and at most one point. Zero, sentinels
/// and any other text become NULL.
pub fn decorated_ratio_sql(column: &str) -> String {
    let cleaned = format!("TRIM(REPLACE(REPLACE({}, '倍', ''), ',', ''))", column);
    format!(
        "(CASE WHEN {c} GLOB '*[0-9]*' \
           AND {c} NOT GLOB '*[^0-9.+-]*' \
           AND {c} NOT GLOB '*.*.*' \
           AND SUBSTR({c}, 2) NOT GLOB '*[+-]*' \
         THEN NULLIF(CAST({c} AS REAL), 0) ELSE NULL END)",
        c = cleaned
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::BindValue;
    use std::collections::HashSet;

    #[test]
    fn test_field_names_are_unique() {
        let names: HashSet<_> = SCREENING_COLUMNS.iter().map(|c| c.field).collect();
        assert_eq!(names.len(), SCREENING_COLUMNS.len());
    }

    #[test]
    fn test_select_list_nulls_unconfirmed_indicator_columns() {
        let select = select_list(&CapabilityMap::empty());
        assert!(select.contains("NULL AS ma25"));
        assert!(select.contains("NULL AS volume_golden_cross"));
        assert!(!select.contains("si."));
    }

    #[test]
    fn test_select_list_projects_confirmed_columns() {
        let caps = CapabilityMap::empty()
            .with(Capability::IndicatorTable)
            .with(Capability::VolumeGoldenCross);
        let select = select_list(&caps);
        assert!(select.contains("si.volume_golden_cross AS volume_golden_cross"));
        assert!(select.contains("si.ma25 AS ma25"));
        assert!(select.contains("NULL AS price_golden_cross"));
    }

    #[tokio::test]
    async fn test_decorated_ratio_sql_agrees_with_formatter() {
        use crate::db::StockDatabase;
        use crate::services::result_formatter::parse_decorated_ratio;
        use sqlx::sqlite::SqlitePoolOptions;

        let inputs = [
            "15.5倍", "1,234.5倍", "-3.5倍", "0倍", "0.0", "1.2.3", "12-3", "1e3",
            "abc", "-", "—", "−", "",
        ];
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let db = StockDatabase::from_pool(pool, "memory".into());

        for input in inputs {
            let sql = format!("SELECT {} AS v FROM (SELECT ? AS per)", decorated_ratio_sql("per"));
            let rows = db.fetch_rows(&sql, &[BindValue::Text(input.to_string())]).await.unwrap();
            assert_eq!(rows[0].f64("v"), parse_decorated_ratio(input), "input {:?}", input);
        }
    }
}
