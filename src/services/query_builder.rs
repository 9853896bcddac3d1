//! Builds the single parameterized screening statement.
//!
//! Filters become typed [`Predicate`]s; [`ScreeningQuery::render`] is the
//! only place that turns them into placeholder text and a parameter list,
//! so each clause's bound values are appended right after its text.

use crate::db::BindValue;
use crate::models::capability::{Capability, CapabilityMap};
use crate::models::screening::{NumericRange, ScreeningFilters};
use crate::services::screening_columns::{
    decorated_ratio_sql, select_list, CREDIT_ISSUE_SQL, LENDING_ISSUE_CATEGORY, ROE_SQL,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Gte,
    Lte,
}

impl CompareOp {
    fn as_sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Gte => ">=",
            CompareOp::Lte => "<=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `<expr> <op> ?`
    Compare {
        expr: String,
        op: CompareOp,
        value: BindValue,
    },
    /// Fixed condition with no bound values.
    Condition(String),
}

impl Predicate {
    fn compare(expr: impl Into<String>, op: CompareOp, value: BindValue) -> Self {
        Predicate::Compare { expr: expr.into(), op, value }
    }

    fn condition(sql: impl Into<String>) -> Self {
        Predicate::Condition(sql.into())
    }

    fn render(&self, clauses: &mut Vec<String>, params: &mut Vec<BindValue>) {
        match self {
            Predicate::Compare { expr, op, value } => {
                clauses.push(format!("{} {} ?", expr, op.as_sql()));
                params.push(value.clone());
            }
            Predicate::Condition(sql) => clauses.push(sql.clone()),
        }
    }
}

/// The screening anchor: a specific date or the table-wide latest one.
#[derive(Debug, Clone, PartialEq)]
pub enum DateAnchor {
    Latest,
    On(String),
}

/// Rendered statement: SQL text plus parameters in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreeningQuery {
    pub sql: String,
    pub params: Vec<BindValue>,
}

#[derive(Debug, Clone)]
pub struct QueryBuilder<'a> {
    capabilities: &'a CapabilityMap,
    anchor: DateAnchor,
    predicates: Vec<Predicate>,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(capabilities: &'a CapabilityMap) -> Self {
        Self {
            capabilities,
            anchor: DateAnchor::Latest,
            predicates: Vec::new(),
        }
    }

    pub fn anchor(mut self, anchor: DateAnchor) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    fn push(&mut self, predicate: Predicate) {
        self.predicates.push(predicate);
    }

    fn push_text_eq(&mut self, expr: &str, value: &Option<String>) {
        if let Some(v) = value {
            self.push(Predicate::compare(expr, CompareOp::Eq, BindValue::Text(v.clone())));
        }
    }

    fn push_int_range(&mut self, expr: &str, range: &NumericRange<i64>) {
        if let Some(min) = range.min {
            self.push(Predicate::compare(expr, CompareOp::Gte, BindValue::Integer(min)));
        }
        if let Some(max) = range.max {
            self.push(Predicate::compare(expr, CompareOp::Lte, BindValue::Integer(max)));
        }
    }

    fn push_real_range(&mut self, expr: &str, range: &NumericRange<f64>) {
        if let Some(min) = range.min {
            self.push(Predicate::compare(expr, CompareOp::Gte, BindValue::Real(min)));
        }
        if let Some(max) = range.max {
            self.push(Predicate::compare(expr, CompareOp::Lte, BindValue::Real(max)));
        }
    }

    /// Range over an optional indicator column; skipped entirely when the
    /// column is not confirmed.
    fn push_gated_range(&mut self, capability: Capability, range: &NumericRange<f64>) {
        if range.is_unbounded() {
            return;
        }
        match capability.column_name() {
            Some(column) if self.capabilities.has(capability) => {
                self.push_real_range(&format!("si.{}", column), range);
            }
            _ => tracing::debug!("Skipping {:?} range: column not available", capability),
        }
    }

    fn push_gated_flag(&mut self, capability: Capability) {
        match capability.column_name() {
            Some(column) if self.capabilities.has(capability) => {
                self.push(Predicate::condition(format!("si.{} = 1", column)));
            }
            _ => tracing::debug!("Skipping {:?} pattern: column not available", capability),
        }
    }

    /// Appends one predicate per present filter dimension.
    pub fn apply_filters(mut self, filters: &ScreeningFilters) -> Self {
        if let Some(date) = &filters.target_date {
            self.anchor = DateAnchor::On(date.clone());
        }

        self.push_text_eq("sd.code", &filters.code);
        self.push_text_eq("sd.market", &filters.market);
        self.push_text_eq("sd.industry", &filters.sector);

        self.push_int_range("sd.volume", &filters.volume);
        self.push_real_range("sd.market_cap", &filters.market_cap);
        self.push_real_range(&decorated_ratio_sql("sd.per"), &filters.per);
        self.push_real_range(&decorated_ratio_sql("sd.pbr"), &filters.pbr);
        self.push_real_range(ROE_SQL, &filters.roe);
        self.push_real_range("sd.vwap", &filters.vwap);
        self.push_real_range("sd.dividend_yield", &filters.dividend_yield);
        self.push_real_range("sd.volume_ratio", &filters.volume_ratio);
        self.push_int_range("sd.shares_issued", &filters.shares_issued);
        self.push_gated_range(Capability::MarginBuyingVolumeRatio, &filters.margin_buying_volume_ratio);
        self.push_gated_range(Capability::ShortRatio, &filters.short_ratio);

        if let Some(is_credit) = filters.is_credit_issue {
            self.push(Predicate::compare(
                CREDIT_ISSUE_SQL,
                CompareOp::Eq,
                BindValue::Integer(i64::from(is_credit)),
            ));
        }

        // Independent of is_credit_issue even though the test is the same.
        if filters.margin_lending_only {
            self.push(Predicate::condition(
                "(sd.margin_buying IS NOT NULL OR sd.margin_selling IS NOT NULL)",
            ));
        }

        if filters.lending_issue_only {
            if self.capabilities.has(Capability::MarginCategory) {
                self.push(Predicate::compare(
                    "si.margin_category",
                    CompareOp::Eq,
                    BindValue::Text(LENDING_ISSUE_CATEGORY.to_string()),
                ));
            } else {
                tracing::debug!("Skipping lending-issue filter: margin_category not available");
            }
        }

        if filters.pattern_vwap_golden_cross {
            if self.capabilities.has(Capability::VwapGoldenCross) {
                self.push_gated_flag(Capability::VwapGoldenCross);
            } else {
                self.push(Predicate::condition("(sd.vwap IS NOT NULL AND sd.price > sd.vwap)"));
            }
        }

        if filters.pattern_upper_shadow {
            // Upper wick more than twice the body, on a bearish candle.
            self.push(Predicate::condition(
                "(sd.high_price - CASE WHEN sd.open_price > sd.price THEN sd.open_price ELSE sd.price END) > ABS(sd.price - sd.open_price) * 2",
            ));
            self.push(Predicate::condition("sd.price < sd.open_price"));
        }

        if filters.pattern_volume_golden_cross {
            self.push_gated_flag(Capability::VolumeGoldenCross);
        }

        if filters.pattern_price_golden_cross {
            self.push_gated_flag(Capability::PriceGoldenCross);
        }

        self
    }

    pub fn build(&self) -> ScreeningQuery {
        let mut clauses = Vec::with_capacity(self.predicates.len() + 1);
        let mut params = Vec::new();

        let anchor = match &self.anchor {
            DateAnchor::Latest => {
                Predicate::condition("sd.date = (SELECT MAX(date) FROM stock_database)")
            }
            DateAnchor::On(date) => {
                Predicate::compare("sd.date", CompareOp::Eq, BindValue::Text(date.clone()))
            }
        };
        anchor.render(&mut clauses, &mut params);

        for predicate in &self.predicates {
            predicate.render(&mut clauses, &mut params);
        }

        let join = if self.capabilities.has(Capability::IndicatorTable) {
            "\nLEFT JOIN stock_indicators si ON sd.code = si.code AND sd.date = si.date"
        } else {
            ""
        };

        let sql = format!(
            "SELECT\n    {}\nFROM stock_database sd{}\nWHERE {}\nORDER BY sd.code",
            select_list(self.capabilities),
            join,
            clauses.join("\n  AND "),
        );

        ScreeningQuery { sql, params }
    }
}

/// Convenience: filters + capabilities → statement.
pub fn build_screening_query(filters: &ScreeningFilters, capabilities: &CapabilityMap) -> ScreeningQuery {
    QueryBuilder::new(capabilities).apply_filters(filters).build()
}
