//! Materialized query results

use qv_core::{ScalarValue, Schema};
use std::cmp::Ordering;
use std::fmt;

/// One row of values, in schema order
pub type Row = Vec<ScalarValue>;

/// Rows produced by executing a plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSet {
    schema: Schema,
    rows: Vec<Row>,
}

impl ResultSet {
    /// Wrap rows produced under `schema`
    pub fn new(schema: Schema, rows: Vec<Row>) -> Self {
        Self { schema, rows }
    }

    /// Output schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Rows in production order
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when no rows were produced
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one column, or `None` if the column does not exist
    pub fn column(&self, name: &str) -> Option<Vec<&ScalarValue>> {
        let index = self.schema.index_of(name)?;
        Some(self.rows.iter().filter_map(|r| r.get(index)).collect())
    }

    /// Rows in a canonical order, for comparing results of unordered plans
    pub fn sorted_rows(&self) -> Vec<Row> {
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| compare_rows(a, b));
        rows
    }

    /// Take the rows
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

/// Lexicographic row order with nulls first
pub fn compare_rows(a: &[ScalarValue], b: &[ScalarValue]) -> Ordering {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| x.sort_cmp(y))
        .find(|o| o.is_ne())
        .unwrap_or_else(|| a.len().cmp(&b.len()))
}

/// Strings print bare in result tables
fn cell(value: &ScalarValue) -> String {
    match value {
        ScalarValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl fmt::Display for ResultSet {
    /// Plain text table: a header line, a rule, then one line per row
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header: Vec<String> = self
            .schema
            .column_names()
            .iter()
            .map(|n| n.to_string())
            .collect();
        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|r| r.iter().map(cell).collect())
            .collect();
        let widths: Vec<usize> = header
            .iter()
            .enumerate()
            .map(|(i, h)| {
                cells
                    .iter()
                    .filter_map(|r| r.get(i))
                    .map(String::len)
                    .chain(std::iter::once(h.len()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let line = |values: &[String]| {
            values
                .iter()
                .zip(widths.iter())
                .map(|(v, w)| format!("{v:<w$}"))
                .collect::<Vec<_>>()
                .join(" | ")
                .trim_end()
                .to_string()
        };
        writeln!(f, "{}", line(&header))?;
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        writeln!(f, "{}", rule.join("-+-"))?;
        for row in &cells {
            writeln!(f, "{}", line(row))?;
        }
        write!(f, "({} row{})", self.rows.len(), if self.rows.len() == 1 { "" } else { "s" })
    }
}

#[cfg(test)]
#[path = "result_test.rs"]
mod tests;
