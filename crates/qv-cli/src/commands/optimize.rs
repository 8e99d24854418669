//! Optimize command implementation

use crate::cli::{GlobalArgs, OptimizeArgs, OptimizeOutput};
use crate::commands::common::{load_config, load_plan, print_table};
use anyhow::{Context, Result};
use qv_plan::{OptimizeReport, Optimizer, PlanGraph};
use serde::Serialize;

/// JSON output of `qv optimize --output json`
#[derive(Debug, Serialize)]
struct OptimizeOutputJson {
    output: String,
    rules: Vec<&'static str>,
    nodes_before: usize,
    nodes_after: usize,
    before: String,
    after: String,
    report: OptimizeReport,
}

/// Execute the optimize command.
pub(crate) async fn execute(args: &OptimizeArgs, global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    let plan = load_plan(&args.plan)?;
    let optimizer = Optimizer::from_config(&config.optimizer);
    let (optimized, report) = optimizer.optimize_with_report(&plan.output);

    let nodes_before = PlanGraph::from_root(&plan.output).node_count();
    let nodes_after = PlanGraph::from_root(&optimized).node_count();

    match args.output {
        OptimizeOutput::Json => {
            let out = OptimizeOutputJson {
                output: plan.output_name.clone(),
                rules: optimizer.rules().rule_names(),
                nodes_before,
                nodes_after,
                before: plan.output.display_indent(),
                after: optimized.display_indent(),
                report,
            };
            let json =
                serde_json::to_string_pretty(&out).context("Failed to serialize report")?;
            println!("{json}");
        }
        OptimizeOutput::Text => {
            println!("Before ({nodes_before} nodes):");
            print!("{}", plan.output.display_indent());
            println!();
            println!("After ({nodes_after} nodes):");
            print!("{}", optimized.display_indent());
            println!();

            let rows: Vec<Vec<String>> = report
                .rule_applications
                .iter()
                .map(|(rule, count)| vec![rule.clone(), count.to_string()])
                .collect();
            if rows.is_empty() {
                println!("No rewrites applied.");
            } else {
                print_table(&["RULE", "APPLIED"], &rows);
            }

            let status = if report.cycle_detected {
                "cycle detected"
            } else if report.reached_fixed_point {
                "fixed point"
            } else {
                "iteration cap reached"
            };
            println!();
            println!("{} iteration(s), {status}", report.iterations);
        }
    }
    Ok(())
}
