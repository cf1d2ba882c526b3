//! Ordering of each strategy's hits.

use std::cmp::Ordering;
use tracing::warn;

use crate::strategy::ResultRow;

/// Sort `rows` by the numeric value of column `key`.
///
/// The sort is stable, so equal keys keep their insertion order, and rows
/// whose value cannot be read go last. Rows are returned unchanged, with a
/// warning, when no row has the column or no value can be read.
pub fn sort_rows(mut rows: Vec<ResultRow>, key: &str, ascending: bool) -> Vec<ResultRow> {
    if rows.is_empty() {
        return rows;
    }

    if !rows.iter().any(|r| r.get(key).is_some()) {
        warn!(column = key, "Sort column missing from results, leaving unsorted");
        return rows;
    }

    let values: Vec<Option<f64>> = rows
        .iter()
        .map(|r| r.get(key).and_then(|c| c.sort_value()))
        .collect();

    if values.iter().all(Option::is_none) {
        warn!(column = key, "Sort column has no numeric values, leaving unsorted");
        return rows;
    }

    let mut keyed: Vec<(Option<f64>, ResultRow)> = values.into_iter().zip(rows.drain(..)).collect();
    keyed.sort_by(|(a, _), (b, _)| compare(*a, *b, ascending));
    keyed.into_iter().map(|(_, row)| row).collect()
}

fn compare(a: Option<f64>, b: Option<f64>, ascending: bool) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => {
            let ord = x.total_cmp(&y);
            if ascending {
                ord
            } else {
                ord.reverse()
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
