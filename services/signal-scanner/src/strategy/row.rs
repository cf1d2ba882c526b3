//! Result rows produced by strategy hits.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt;

/// Column every row starts with.
pub const SYMBOL_COLUMN: &str = "Symbol";

/// A display cell that keeps its numeric value next to its presentation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    /// Shown with two decimals
    Number(f64),
    /// Shown as `$12,345.67`
    Money(f64),
}

impl CellValue {
    /// Presentation form.
    pub fn display(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Number(v) => format!("{:.2}", v),
            Self::Money(v) => format_money(*v),
        }
    }

    /// Numeric value used for sorting.
    ///
    /// Text is parsed after stripping `$` and `,`; undefined numbers and
    /// unparsable text give `None`.
    pub fn sort_value(&self) -> Option<f64> {
        let value = match self {
            Self::Number(v) | Self::Money(v) => *v,
            Self::Text(s) => {
                let cleaned: String = s.chars().filter(|c| *c != '$' && *c != ',').collect();
                cleaned.trim().parse::<f64>().ok()?
            }
        };
        (!value.is_nan()).then_some(value)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// Format an amount as `$1,234,567.89`.
pub fn format_money(value: f64) -> String {
    if !value.is_finite() {
        return "n/a".to_string();
    }

    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && fixed.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
        "-"
    } else {
        ""
    };
    format!("{}${}.{}", sign, grouped, frac_part)
}

/// One hit: ordered `(column, cell)` pairs, `Symbol` first.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    cells: Vec<(String, CellValue)>,
}

impl ResultRow {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            cells: vec![(SYMBOL_COLUMN.to_string(), CellValue::Text(symbol.into()))],
        }
    }

    /// Append a column, replacing any existing one with the same name.
    pub fn with(mut self, column: impl Into<String>, value: CellValue) -> Self {
        let column = column.into();
        match self.cells.iter_mut().find(|(c, _)| *c == column) {
            Some((_, cell)) => *cell = value,
            None => self.cells.push((column, value)),
        }
        self
    }

    pub fn symbol(&self) -> &str {
        match self.cells.first() {
            Some((_, CellValue::Text(s))) => s,
            _ => "",
        }
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells.iter().find(|(c, _)| c == column).map(|(_, v)| v)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(c, _)| c.as_str())
    }
}

impl Serialize for ResultRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (column, value) in &self.cells {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(12_345.678), "$12,345.68");
        assert_eq!(format_money(0.5), "$0.50");
        assert_eq!(format_money(999.999), "$1,000.00");
        assert_eq!(format_money(123_456_789.0), "$123,456,789.00");
        assert_eq!(format_money(-1_234.5), "-$1,234.50");
        assert_eq!(format_money(-0.001), "$0.00");
        assert_eq!(format_money(f64::NAN), "n/a");
    }

    #[test]
    fn test_cell_display() {
        assert_eq!(CellValue::Number(3.0).display(), "3.00");
        assert_eq!(CellValue::Money(60_000_000.0).display(), "$60,000,000.00");
        assert_eq!(CellValue::Text("AAPL".into()).to_string(), "AAPL");
    }

    #[test]
    fn test_sort_value() {
        assert_eq!(CellValue::Money(12.5).sort_value(), Some(12.5));
        assert_eq!(CellValue::Text("$12,345.67".into()).sort_value(), Some(12_345.67));
        assert_eq!(CellValue::Text("123,456".into()).sort_value(), Some(123_456.0));
        assert_eq!(CellValue::Text("n/a".into()).sort_value(), None);
        assert_eq!(CellValue::Number(f64::NAN).sort_value(), None);
    }

    #[test]
    fn test_row_order_and_replace() {
        let row = ResultRow::new("MSFT")
            .with("B", CellValue::Number(1.0))
            .with("A", CellValue::Number(2.0))
            .with("B", CellValue::Number(3.0));

        assert_eq!(row.symbol(), "MSFT");
        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["Symbol", "B", "A"]);
        assert_eq!(row.get("B"), Some(&CellValue::Number(3.0)));
        assert!(row.get("C").is_none());
    }

    #[test]
    fn test_row_serializes_in_order() {
        let row = ResultRow::new("NVDA")
            .with("Ratio", CellValue::Number(2.5))
            .with("Avg", CellValue::Money(1_000.0));
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"Symbol":"NVDA","Ratio":2.5,"Avg":1000.0}"#);
    }
}
