use std::collections::BTreeSet;

use serde::Serialize;

/// Optional schema features of the indicator table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// The `stock_indicators` table exists at all.
    IndicatorTable,
    StockLendingRepaymentRatio,
    JsfDiffRatio,
    ShortRatio,
    MarginBuyingDeviation20,
    VolumeGoldenCross,
    PriceGoldenCross,
    VwapGoldenCross,
    MarginBuyingVolumeRatio,
    MarginCategory,
}

impl Capability {
    /// Optional indicator columns, probed by name.
    pub const OPTIONAL_COLUMNS: [Capability; 9] = [
        Capability::StockLendingRepaymentRatio,
        Capability::JsfDiffRatio,
        Capability::ShortRatio,
        Capability::MarginBuyingDeviation20,
        Capability::VolumeGoldenCross,
        Capability::PriceGoldenCross,
        Capability::VwapGoldenCross,
        Capability::MarginBuyingVolumeRatio,
        Capability::MarginCategory,
    ];

    /// Column in `stock_indicators` backing this capability.
    pub fn column_name(self) -> Option<&'static str> {
        match self {
            Capability::IndicatorTable => None,
            Capability::StockLendingRepaymentRatio => Some("stock_lending_repayment_ratio"),
            Capability::JsfDiffRatio => Some("jsf_diff_ratio"),
            Capability::ShortRatio => Some("short_ratio"),
            Capability::MarginBuyingDeviation20 => Some("margin_buying_deviation_20"),
            Capability::VolumeGoldenCross => Some("volume_golden_cross"),
            Capability::PriceGoldenCross => Some("price_golden_cross"),
            Capability::VwapGoldenCross => Some("vwap_golden_cross"),
            Capability::MarginBuyingVolumeRatio => Some("margin_buying_volume_ratio"),
            Capability::MarginCategory => Some("margin_category"),
        }
    }
}

/// Which optional schema features the live database confirmed.
/// Anything not present is treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CapabilityMap {
    confirmed: BTreeSet<Capability>,
}

impl CapabilityMap {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds the map from the indicator table's column names. An empty
    /// column list means the table does not exist.
    pub fn from_columns<'a, I>(columns: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let names: BTreeSet<&str> = columns.into_iter().collect();
        if names.is_empty() {
            return Self::empty();
        }

        let mut confirmed: BTreeSet<Capability> = Capability::OPTIONAL_COLUMNS
            .into_iter()
            .filter(|cap| cap.column_name().is_some_and(|c| names.contains(c)))
            .collect();
        confirmed.insert(Capability::IndicatorTable);
        Self { confirmed }
    }

    /// Everything present; used by tests and fixtures.
    pub fn all() -> Self {
        let mut confirmed: BTreeSet<Capability> = Capability::OPTIONAL_COLUMNS.into_iter().collect();
        confirmed.insert(Capability::IndicatorTable);
        Self { confirmed }
    }

    pub fn with(mut self, capability: Capability) -> Self {
        self.confirmed.insert(capability);
        self
    }

    pub fn without(mut self, capability: Capability) -> Self {
        self.confirmed.remove(&capability);
        self
    }

    /// Optional indicator columns are only usable when the table itself is.
    pub fn has(&self, capability: Capability) -> bool {
        self.confirmed.contains(&capability)
            && (capability == Capability::IndicatorTable
                || self.confirmed.contains(&Capability::IndicatorTable))
    }

    pub fn is_empty(&self) -> bool {
        self.confirmed.is_empty()
    }
}
