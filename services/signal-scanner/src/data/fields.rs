//! Semantic column identifiers for history frames.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of columns a [`super::HistoryFrame`] may carry.
///
/// Raw fields always come from the provider; derived fields exist only once
/// an indicator has computed them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FieldKey {
    Open,
    High,
    Low,
    Close,
    Volume,
    /// Close * Volume
    DollarVolume,
    /// 5-bar simple moving average of close
    Ma5,
    /// 10-bar simple moving average of close
    Ma10,
    /// MACD fast line: EMA12(close) - EMA26(close)
    MacdDif,
    /// MACD signal line: EMA9(DIF)
    MacdDea,
    /// DIF - DEA
    MacdHistogram,
}

impl FieldKey {
    /// Column name used in logs and reports.
    pub fn column_name(&self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::High => "High",
            Self::Low => "Low",
            Self::Close => "Close",
            Self::Volume => "Volume",
            Self::DollarVolume => "Dollar_Volume",
            Self::Ma5 => "MA5",
            Self::Ma10 => "MA10",
            Self::MacdDif => "MACD_DIF",
            Self::MacdDea => "MACD_DEA",
            Self::MacdHistogram => "MACD_Histogram",
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}
