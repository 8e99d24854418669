//! Fixed-point driver for the rule set

use super::{RewriteRule, RuleSet};
use crate::error::PlanResult;
use crate::ir::rel::Rel;
use crate::ir::traverse::Transformed;
use log::{debug, trace, warn};
use qv_core::config::DEFAULT_MAX_ITERATIONS;
use qv_core::{NodeId, OptimizerConfig};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// What happened during one call to [`Optimizer::optimize_with_report`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OptimizeReport {
    /// Passes run over the whole DAG
    pub iterations: usize,
    /// Number of accepted rewrites per rule name
    pub rule_applications: BTreeMap<String, usize>,
    /// A pass produced no change (or an oscillation was cut short)
    pub reached_fixed_point: bool,
    /// A pass reproduced a previously seen plan
    pub cycle_detected: bool,
}

impl OptimizeReport {
    /// Total accepted rewrites across all rules
    pub fn total_applications(&self) -> usize {
        self.rule_applications.values().sum()
    }
}

/// Applies a [`RuleSet`] bottom-up until no rule fires
pub struct Optimizer {
    rules: RuleSet,
    max_iterations: usize,
}

impl Optimizer {
    /// Optimizer over `rules` with the default iteration cap
    pub fn new(rules: RuleSet) -> Self {
        Self {
            rules,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Optimizer with every built-in rule
    pub fn with_defaults() -> Self {
        Self::new(RuleSet::with_defaults())
    }

    /// Optimizer configured from `quiver.yml`
    pub fn from_config(config: &OptimizerConfig) -> Self {
        Self::new(RuleSet::from_config(&config.rules)).with_max_iterations(config.max_iterations)
    }

    /// Cap the number of passes (at least one)
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Enabled rules
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Iteration cap
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Optimized plan with an identical output schema
    pub fn optimize(&self, rel: &Rel) -> Rel {
        self.optimize_with_report(rel).0
    }

    /// Optimized plan plus a summary of the rewrites that fired
    pub fn optimize_with_report(&self, rel: &Rel) -> (Rel, OptimizeReport) {
        run(rel, &self.rules, self.max_iterations)
    }
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Optimize `rel` with `rules` and the default iteration cap
pub fn optimize(rel: &Rel, rules: &RuleSet) -> Rel {
    run(rel, rules, DEFAULT_MAX_ITERATIONS).0
}

fn run(rel: &Rel, rules: &RuleSet, max_iterations: usize) -> (Rel, OptimizeReport) {
    let mut report = OptimizeReport::default();
    if rules.is_empty() {
        report.reached_fixed_point = true;
        return (rel.clone(), report);
    }

    let mut current = rel.clone();
    let mut seen: HashSet<NodeId> = HashSet::from([current.id()]);
    while report.iterations < max_iterations {
        report.iterations += 1;
        trace!(
            "Optimizer pass {} over {}",
            report.iterations,
            current.label()
        );
        let next = match run_pass(&current, rules, &mut report) {
            Ok(next) => next,
            Err(e) => {
                warn!(
                    "Optimizer pass {} failed, keeping the last valid plan: {}",
                    report.iterations, e
                );
                return (current, report);
            }
        };
        if next.id() == current.id() {
            report.reached_fixed_point = true;
            break;
        }
        if !seen.insert(next.id()) {
            warn!(
                "Optimizer pass {} reproduced plan {}; stopping at the previous result",
                report.iterations,
                next.label()
            );
            report.cycle_detected = true;
            report.reached_fixed_point = true;
            break;
        }
        current = next;
    }

    if !report.reached_fixed_point {
        warn!(
            "Optimizer hit the iteration cap ({}) before reaching a fixed point",
            max_iterations
        );
    }
    if rel.schema() != current.schema() {
        warn!(
            "Optimized plan changed the output schema from {} to {}; returning the input plan",
            rel.schema(),
            current.schema()
        );
        return (rel.clone(), report);
    }
    (current, report)
}

fn run_pass(rel: &Rel, rules: &RuleSet, report: &mut OptimizeReport) -> PlanResult<Rel> {
    rel.transform_up(&mut |node| {
        let mut current = node.clone();
        let mut changed = false;
        for rule in rules.iter() {
            if let Some(next) = apply_rule(rule, &current) {
                *report
                    .rule_applications
                    .entry(rule.name().to_string())
                    .or_insert(0) += 1;
                current = next;
                changed = true;
            }
        }
        Ok(if changed {
            Transformed::Replace(current)
        } else {
            Transformed::Keep
        })
    })
}

/// Apply one rule to one node, enforcing schema preservation
fn apply_rule(rule: &dyn RewriteRule, rel: &Rel) -> Option<Rel> {
    match rule.apply(rel) {
        Ok(Some(next)) if next.id() == rel.id() => None,
        Ok(Some(next)) => {
            if rel.schema() != next.schema() {
                warn!(
                    "Rule '{}' would change the schema of {} from {} to {}; result discarded",
                    rule.name(),
                    rel.label(),
                    rel.schema(),
                    next.schema()
                );
                return None;
            }
            debug!(
                "Rule '{}' rewrote {} into {}",
                rule.name(),
                rel.label(),
                next.label()
            );
            Some(next)
        }
        Ok(None) => None,
        Err(reason) => {
            debug!(
                "Rule '{}' declined at {}: {}",
                rule.name(),
                rel.label(),
                reason
            );
            None
        }
    }
}

#[cfg(test)]
#[path = "optimizer_test.rs"]
mod tests;
