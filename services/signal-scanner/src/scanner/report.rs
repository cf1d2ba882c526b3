//! Report generation for scan results.
//!
//! Generates reports in various formats:
//! - Text (console, aligned tables)
//! - Markdown (for documentation)
//! - JSON (for programmatic use)
//! - HTML (email body)

use serde::{Deserialize, Serialize};

use super::engine::{ScanResult, StrategyInfo};
use crate::strategy::ResultRow;

const RULE_WIDTH: usize = 50;
const NO_MATCHES: &str = "No matching symbols today.";

// ============================================================================
// Report Format
// ============================================================================

/// Supported report formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    /// Plain text with aligned columns
    Text,
    /// Markdown tables
    Markdown,
    /// JSON document (machine-readable)
    Json,
    /// HTML fragment with one table per strategy
    Html,
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Markdown => write!(f, "markdown"),
            Self::Json => write!(f, "json"),
            Self::Html => write!(f, "html"),
        }
    }
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            "html" | "htm" => Ok(Self::Html),
            _ => Err(format!("Unknown report format: {}", s)),
        }
    }
}

// ============================================================================
// Scan Report
// ============================================================================

/// Report generator for scan results.
pub struct ScanReport<'a> {
    result: &'a ScanResult,
}

impl<'a> ScanReport<'a> {
    pub fn new(result: &'a ScanResult) -> Self {
        Self { result }
    }

    /// Generate report in the specified format.
    pub fn generate(&self, format: ReportFormat) -> String {
        match format {
            ReportFormat::Text => self.to_text(),
            ReportFormat::Markdown => self.to_markdown(),
            ReportFormat::Json => self.to_json(),
            ReportFormat::Html => self.to_html(),
        }
    }

    /// One section per strategy: description, rule, aligned table.
    pub fn to_text(&self) -> String {
        let mut out = String::new();

        for info in &self.result.strategies {
            out.push_str(&format!("Strategy: {}\n", info.description));
            out.push_str(&"=".repeat(RULE_WIDTH));
            out.push('\n');

            let rows = self.result.hits(&info.name);
            if rows.is_empty() {
                out.push_str(NO_MATCHES);
                out.push_str("\n\n");
                continue;
            }

            let headers = columns(rows);
            let cells: Vec<Vec<String>> = rows.iter().map(|r| row_cells(r, &headers)).collect();
            let widths: Vec<usize> = headers
                .iter()
                .enumerate()
                .map(|(i, h)| {
                    cells
                        .iter()
                        .map(|c| c[i].chars().count())
                        .chain(std::iter::once(h.chars().count()))
                        .max()
                        .unwrap_or(0)
                })
                .collect();

            let header_line = pad_line(&headers, &widths);
            out.push_str(&header_line);
            out.push('\n');
            out.push_str(&"-".repeat(header_line.chars().count()));
            out.push('\n');
            for row in &cells {
                out.push_str(&pad_line(row, &widths));
                out.push('\n');
            }
            out.push('\n');
        }

        out
    }

    /// Generate markdown report.
    pub fn to_markdown(&self) -> String {
        let r = self.result;
        let mut md = String::new();

        md.push_str(&format!(
            "# Signal Scan Report\n\n**Scan ID**: {}\n**Time**: {}\n**Duration**: {:.1}s\n\n",
            r.id,
            r.completed_at.format("%Y-%m-%d %H:%M:%S"),
            r.duration_secs
        ));

        md.push_str("## Summary\n\n");
        md.push_str(&format!("- **Symbols requested**: {}\n", r.symbols_requested));
        md.push_str(&format!("- **Symbols with data**: {}\n", r.symbols_with_data));
        md.push_str(&format!("- **Total hits**: {}\n\n", r.total_hits()));

        for info in &r.strategies {
            md.push_str(&strategy_markdown(info, r.hits(&info.name)));
        }

        md
    }

    /// Generate JSON report.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self.result).unwrap_or_else(|_| "{}".to_string())
    }

    /// HTML body: a dated heading, then per strategy its description and
    /// either a results table or a no-matches paragraph.
    pub fn to_html(&self) -> String {
        let r = self.result;
        let mut html = format!(
            "<h2>Stock scan results - {}</h2>\n",
            r.completed_at.format("%Y-%m-%d")
        );

        for info in &r.strategies {
            html.push_str(&format!("<h3>{}</h3>\n", escape_html(&info.description)));
            html.push_str(&strategy_table_html(info, r.hits(&info.name)));
            html.push_str("<hr>\n");
        }

        html
    }
}

fn strategy_markdown(info: &StrategyInfo, rows: &[ResultRow]) -> String {
    let mut md = format!("## {}\n\n_{}_\n\n", info.name, info.description);

    if rows.is_empty() {
        md.push_str(NO_MATCHES);
        md.push_str("\n\n");
        return md;
    }

    let headers = columns(rows);
    md.push_str(&format!("| {} |\n", headers.join(" | ")));
    md.push_str(&format!("|{}\n", "------|".repeat(headers.len())));
    for row in rows {
        md.push_str(&format!("| {} |\n", row_cells(row, &headers).join(" | ")));
    }
    md.push('\n');
    md
}

fn strategy_table_html(info: &StrategyInfo, rows: &[ResultRow]) -> String {
    if rows.is_empty() {
        return format!("<p>{}</p>\n", NO_MATCHES);
    }

    let headers = columns(rows);
    let mut html = format!(
        "<table id=\"results_{}\" border=\"1\">\n<thead><tr>",
        info.name.to_lowercase()
    );
    for h in &headers {
        html.push_str(&format!("<th>{}</th>", escape_html(h)));
    }
    html.push_str("</tr></thead>\n<tbody>\n");
    for row in rows {
        html.push_str("<tr>");
        for cell in row_cells(row, &headers) {
            html.push_str(&format!("<td>{}</td>", escape_html(&cell)));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</tbody>\n</table>\n");
    html
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Union of column names in first-seen order.
fn columns(rows: &[ResultRow]) -> Vec<String> {
    let mut headers: Vec<String> = Vec::new();
    for col in rows.iter().flat_map(ResultRow::columns) {
        if !headers.iter().any(|h| h == col) {
            headers.push(col.to_string());
        }
    }
    headers
}

fn row_cells(row: &ResultRow, headers: &[String]) -> Vec<String> {
    headers
        .iter()
        .map(|h| row.get(h).map(|c| c.display()).unwrap_or_default())
        .collect()
}

fn pad_line(values: &[String], widths: &[usize]) -> String {
    values
        .iter()
        .zip(widths)
        .map(|(v, &w)| format!("{:<w$}", v, w = w))
        .collect::<Vec<_>>()
        .join(" | ")
        .trim_end()
        .to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::CellValue;

    fn sample() -> ScanResult {
        let mut result = ScanResult::empty(vec![
            StrategyInfo {
                name: "VolumeSurgeStrategy".into(),
                description: "Dollar volume surge".into(),
                sort_key: "Ratio".into(),
            },
            StrategyInfo {
                name: "MACrossStrategy".into(),
                description: "MA5 crosses above MA10".into(),
                sort_key: "Avg Dollar Volume (10-day)".into(),
            },
        ]);
        result.symbols_requested = 3;
        result.symbols_with_data = 2;
        result.results.insert(
            "VolumeSurgeStrategy".into(),
            vec![
                ResultRow::new("NVDA")
                    .with("Current Dollar Volume", CellValue::Money(1_234_567.0))
                    .with("Ratio", CellValue::Number(3.5)),
                ResultRow::new("A")
                    .with("Current Dollar Volume", CellValue::Money(50.0))
                    .with("Ratio", CellValue::Number(2.25)),
            ],
        );
        result
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("TEXT".parse::<ReportFormat>().unwrap(), ReportFormat::Text);
        assert_eq!("md".parse::<ReportFormat>().unwrap(), ReportFormat::Markdown);
        assert_eq!("json".parse::<ReportFormat>().unwrap(), ReportFormat::Json);
        assert_eq!("HTML".parse::<ReportFormat>().unwrap(), ReportFormat::Html);
        assert!("pdf".parse::<ReportFormat>().is_err());
        assert_eq!(ReportFormat::Markdown.to_string(), "markdown");
    }

    #[test]
    fn test_text_report() {
        let result = sample();
        let text = ScanReport::new(&result).generate(ReportFormat::Text);

        assert!(text.contains("Strategy: Dollar volume surge"));
        assert!(text.contains(&"=".repeat(50)));
        assert!(text.contains("Symbol | Current Dollar Volume | Ratio"));
        assert!(text.contains("NVDA   | $1,234,567.00         | 3.50"));
        assert!(text.contains("A      | $50.00                | 2.25"));

        // Strategy without hits
        assert!(text.contains("Strategy: MA5 crosses above MA10"));
        assert!(text.contains("No matching symbols today."));

        // Assignment order, not map order
        let surge = text.find("Dollar volume surge").unwrap();
        let cross = text.find("MA5 crosses").unwrap();
        assert!(surge < cross);
    }

    #[test]
    fn test_markdown_report() {
        let result = sample();
        let md = ScanReport::new(&result).to_markdown();

        assert!(md.contains("# Signal Scan Report"));
        assert!(md.contains("**Symbols with data**: 2"));
        assert!(md.contains("| Symbol | Current Dollar Volume | Ratio |"));
        assert!(md.contains("| NVDA | $1,234,567.00 | 3.50 |"));
        assert!(md.contains("## MACrossStrategy"));
    }

    #[test]
    fn test_json_report() {
        let result = sample();
        let json = ScanReport::new(&result).to_json();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["symbols_requested"], 3);
        assert_eq!(value["results"]["VolumeSurgeStrategy"][0]["Symbol"], "NVDA");
        assert_eq!(value["results"]["VolumeSurgeStrategy"][0]["Ratio"], 3.5);
    }

    #[test]
    fn test_html_report() {
        let result = sample();
        let html = ScanReport::new(&result).generate(ReportFormat::Html);
        let date = result.completed_at.format("%Y-%m-%d").to_string();

        assert!(html.starts_with(&format!("<h2>Stock scan results - {}</h2>", date)));
        assert!(html.contains("<h3>Dollar volume surge</h3>"));
        assert!(html.contains(r#"<table id="results_volumesurgestrategy" border="1">"#));
        assert!(html.contains(
            "<thead><tr><th>Symbol</th><th>Current Dollar Volume</th><th>Ratio</th></tr></thead>"
        ));
        assert!(html.contains("<tr><td>NVDA</td><td>$1,234,567.00</td><td>3.50</td></tr>"));

        // Strategy without hits gets a paragraph, not an empty table
        assert!(html.contains(
            "<h3>MA5 crosses above MA10</h3>\n<p>No matching symbols today.</p>"
        ));
        assert!(!html.contains("results_macrossstrategy"));
        assert_eq!(html.matches("<hr>").count(), 2);
    }

    #[test]
    fn test_html_escapes_cells() {
        let mut result = ScanResult::empty(vec![StrategyInfo {
            name: "X".into(),
            description: "A < B & C".into(),
            sort_key: "Symbol".into(),
        }]);
        result.results.insert("X".into(), vec![ResultRow::new("<b>")]);

        let html = ScanReport::new(&result).to_html();
        assert!(html.contains("<h3>A &lt; B &amp; C</h3>"));
        assert!(html.contains("<td>&lt;b&gt;</td>"));
    }
}
