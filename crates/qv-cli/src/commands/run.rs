//! Run command implementation

use crate::cli::{GlobalArgs, RunArgs};
use crate::commands::common::{load_config, load_plan};
use anyhow::{Context, Result};
use qv_backend::{compile, Executor, MemoryBackend};
use qv_plan::Optimizer;
use std::time::Instant;

/// Execute the run command.
pub(crate) async fn execute(args: &RunArgs, global: &GlobalArgs) -> Result<()> {
    let plan = load_plan(&args.plan)?;

    let backend = MemoryBackend::new();
    for table in &plan.tables {
        backend
            .register_table(&table.name, table.schema.clone(), table.rows.clone())
            .with_context(|| format!("Failed to load rows of source '{}'", table.name))?;
    }

    let root = if args.no_optimize {
        plan.output.clone()
    } else {
        let config = load_config(global)?;
        Optimizer::from_config(&config.optimizer).optimize(&plan.output)
    };

    let started = Instant::now();
    let compiled = compile(&backend, &root).context("Failed to compile plan")?;
    let result = backend
        .execute(&compiled)
        .await
        .with_context(|| format!("Failed to run '{}'", plan.output_name))?;
    log::debug!(
        "Ran '{}' in {}ms",
        plan.output_name,
        started.elapsed().as_millis()
    );

    println!("{result}");
    Ok(())
}
