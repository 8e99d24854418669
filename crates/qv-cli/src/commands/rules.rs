//! Rules command implementation

use crate::cli::{GlobalArgs, RulesArgs};
use crate::commands::common::{load_config, print_table};
use anyhow::Result;
use qv_plan::RuleSet;

/// Execute the rules command.
pub(crate) async fn execute(args: &RulesArgs, global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    let enabled = RuleSet::from_config(&config.optimizer.rules).rule_names();

    let rows: Vec<Vec<String>> = RuleSet::with_defaults()
        .descriptions()
        .into_iter()
        .filter(|(name, _)| !args.enabled || enabled.contains(name))
        .map(|(name, description)| {
            let on = if enabled.contains(&name) { "yes" } else { "no" };
            vec![name.to_string(), on.to_string(), description.to_string()]
        })
        .collect();

    if rows.is_empty() {
        println!("No rewrite rules enabled.");
        return Ok(());
    }
    print_table(&["NAME", "ENABLED", "DESCRIPTION"], &rows);
    println!();
    println!("Max iterations: {}", config.optimizer.max_iterations);
    Ok(())
}
