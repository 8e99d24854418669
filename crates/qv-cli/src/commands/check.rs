//! Check command implementation

use crate::cli::{CheckArgs, GlobalArgs};
use crate::commands::common::{load_plan, print_table, schema_rows};
use anyhow::Result;
use qv_plan::PlanGraph;

/// Execute the check command.
pub(crate) async fn execute(args: &CheckArgs, _global: &GlobalArgs) -> Result<()> {
    let plan = load_plan(&args.plan)?;
    let graph = PlanGraph::from_root(&plan.output);
    let shared = graph.shared_nodes();

    println!(
        "Plan '{}' is valid: {} nodes, {} shared",
        plan.output_name,
        graph.node_count(),
        shared.len()
    );
    println!();
    print!("{}", plan.output.display_indent());

    if args.all {
        for (name, rel) in &plan.relations {
            println!();
            println!("{name} ({})", rel.label());
            print_table(&["COLUMN", "TYPE", "NULLABLE"], &schema_rows(rel.schema()));
        }
    } else {
        println!();
        print_table(&["COLUMN", "TYPE", "NULLABLE"], &schema_rows(plan.output.schema()));
    }
    Ok(())
}
