//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use qv_core::{Config, CoreError, Schema};
use qv_plan::FunctionRegistry;
use std::path::Path;

use crate::cli::GlobalArgs;
use crate::document::{BuiltPlan, PlanDocument};

/// Load `quiver.yml`: the `--config` path when given, else the current
/// directory's file when present, else defaults
pub(crate) fn load_config(global: &GlobalArgs) -> Result<Config> {
    if let Some(path) = &global.config {
        return Config::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()));
    }
    match Config::load_from_dir(Path::new(".")) {
        Ok(config) => Ok(config),
        Err(CoreError::ConfigNotFound { .. }) => Ok(Config::default()),
        Err(e) => Err(e).context("Failed to load quiver.yml"),
    }
}

/// Parse and build a plan document with the built-in functions
pub(crate) fn load_plan(path: &Path) -> Result<BuiltPlan> {
    let document = PlanDocument::load(path)?;
    let plan = document
        .build(&FunctionRegistry::with_builtins()?)
        .with_context(|| format!("Failed to build plan {}", path.display()))?;
    log::debug!(
        "Built '{}' from {} ({} relations)",
        plan.output_name,
        path.display(),
        plan.relations.len()
    );
    Ok(plan)
}

/// Rows of `COLUMN / TYPE / NULLABLE` describing a schema
pub(crate) fn schema_rows(schema: &Schema) -> Vec<Vec<String>> {
    schema
        .fields()
        .iter()
        .map(|f| {
            vec![
                f.name.clone(),
                f.data_type.to_string(),
                if f.nullability.is_nullable() { "yes" } else { "no" }.to_string(),
            ]
        })
        .collect()
}

/// Calculate column widths for table output
fn calculate_column_widths(headers: &[&str], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.len());
            }
        }
    }
    widths
}

/// Render a simple table with left-aligned columns
pub(crate) fn format_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let widths = calculate_column_widths(headers, rows);
    let line = |cells: Vec<String>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{:<width$}", cell, width = w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = Vec::with_capacity(rows.len() + 2);
    out.push(line(headers.iter().map(|h| h.to_string()).collect()));
    out.push(line(widths.iter().map(|&w| "-".repeat(w)).collect()));
    for row in rows {
        out.push(line(row.clone()));
    }
    out.join("\n")
}

/// Print a simple table with left-aligned columns
pub(crate) fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    println!("{}", format_table(headers, rows));
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
