//! In-memory reference backend.
//!
//! Evaluates any plan over tables registered as rows of [`ScalarValue`]s.
//! Lowering orders the distinct nodes of the plan so inputs come before their
//! consumers; execution materializes each node exactly once and releases an
//! intermediate result as soon as its last consumer has run. It is the row
//! source used to check that optimized and unoptimized plans agree.

mod eval;
mod operators;
mod window;

use crate::capability::CapabilitySet;
use crate::compile::CompiledPlan;
use crate::error::{BackendError, BackendResult};
use crate::result::{ResultSet, Row};
use crate::traits::{Backend, Executor};
use async_trait::async_trait;
use log::{debug, trace};
use operators::{missing_input, JoinSide};
use parking_lot::RwLock;
use qv_core::{NodeId, Schema};
use qv_plan::{PlanError, PlanGraph, Rel, RelOp};
use std::collections::HashMap;
use std::sync::Arc;

/// Backend identifier
pub const MEMORY_BACKEND: &str = "memory";

/// A registered table
#[derive(Debug)]
struct Table {
    schema: Schema,
    rows: Arc<Vec<Row>>,
}

/// One node of a lowered plan
#[derive(Debug, Clone)]
struct Step {
    rel: Rel,
    consumers: usize,
}

/// Evaluation schedule produced by [`MemoryBackend`]
#[derive(Debug, Clone)]
pub struct MemoryPlan {
    steps: Vec<Step>,
}

impl MemoryPlan {
    /// Number of distinct nodes evaluated per execution
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// True for a plan with no nodes
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Node labels in evaluation order
    pub fn labels(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.rel.label()).collect()
    }

    /// Names of the source relations read by the plan
    pub fn source_names(&self) -> Vec<String> {
        self.steps
            .iter()
            .filter_map(|s| match s.rel.op() {
                RelOp::Source { name } => Some(name.to_string()),
                _ => None,
            })
            .collect()
    }

    fn run(&self, root: &Rel, tables: &HashMap<String, Arc<Table>>) -> BackendResult<Vec<Row>> {
        let mut results: HashMap<NodeId, Arc<Vec<Row>>> = HashMap::new();
        let mut remaining: HashMap<NodeId, usize> =
            self.steps.iter().map(|s| (s.rel.id(), s.consumers)).collect();

        for step in &self.steps {
            let rel = &step.rel;
            let inputs = rel
                .inputs()
                .iter()
                .map(|i| results.get(&i.id()).cloned().ok_or_else(|| missing_input(&rel.label())))
                .collect::<BackendResult<Vec<_>>>()?;
            let rows = evaluate(rel, &inputs, tables).map_err(|e| match e {
                BackendError::Plan(err @ PlanError::Evaluation { .. }) => {
                    BackendError::execution(&rel.label(), err.to_string())
                }
                other => other,
            })?;
            trace!("Evaluated {} ({} rows)", rel.label(), rows.len());

            for input in rel.inputs() {
                if let Some(count) = remaining.get_mut(&input.id()) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        results.remove(&input.id());
                    }
                }
            }
            results.insert(rel.id(), rows);
        }

        let rows = results
            .remove(&root.id())
            .ok_or_else(|| missing_input("plan root"))?;
        Ok(Arc::try_unwrap(rows).unwrap_or_else(|shared| shared.as_ref().clone()))
    }
}

fn evaluate(
    rel: &Rel,
    inputs: &[Arc<Vec<Row>>],
    tables: &HashMap<String, Arc<Table>>,
) -> BackendResult<Arc<Vec<Row>>> {
    let label = rel.label();
    let first = || inputs.first().ok_or_else(|| missing_input(&label));
    let second = || inputs.get(1).ok_or_else(|| missing_input(&label));

    let rows = match rel.op() {
        RelOp::Source { name } => {
            let table = tables.get(name.as_str()).ok_or_else(|| BackendError::TableNotFound {
                name: name.to_string(),
                backend: MEMORY_BACKEND.to_string(),
            })?;
            return Ok(Arc::clone(&table.rows));
        }
        RelOp::Alias { .. } => return Ok(Arc::clone(first()?)),
        RelOp::Project { input, columns } => operators::project(input.id(), first()?, columns)?,
        RelOp::Filter { input, predicates } => {
            operators::filter(input.id(), first()?, predicates)?
        }
        RelOp::Aggregate {
            input,
            keys,
            metrics,
        } => operators::aggregate(input.id(), first()?, keys, metrics)?,
        RelOp::Sort { input, keys } => operators::sort(input.id(), first()?, keys)?,
        RelOp::Limit { limit, offset, .. } => operators::limit(first()?, *limit, *offset),
        RelOp::Join {
            left,
            right,
            kind,
            predicates,
        } => operators::join(
            JoinSide {
                id: left.id(),
                rows: first()?,
                width: left.schema().len(),
            },
            JoinSide {
                id: right.id(),
                rows: second()?,
                width: right.schema().len(),
            },
            *kind,
            predicates,
        )?,
        RelOp::SetOp { kind, distinct, .. } => {
            operators::set_op(rel.schema(), first()?, second()?, *kind, *distinct)?
        }
    };
    Ok(Arc::new(rows))
}

/// Backend evaluating plans over in-memory tables
pub struct MemoryBackend {
    capabilities: CapabilitySet,
    tables: RwLock<HashMap<String, Arc<Table>>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// A backend supporting every operator and function, with no tables
    pub fn new() -> Self {
        Self {
            capabilities: CapabilitySet::full(),
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Restrict the declared capabilities
    pub fn with_capabilities(mut self, capabilities: CapabilitySet) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Register (or replace) a table.
    ///
    /// Every row must have one value per column; values are converted to the
    /// column types, and NULL is rejected in non-nullable columns.
    pub fn register_table(&self, name: &str, schema: Schema, rows: Vec<Row>) -> BackendResult<()> {
        let invalid = |message: String| BackendError::InvalidTable {
            table: name.to_string(),
            message,
        };
        if name.is_empty() {
            return Err(invalid("table name must not be empty".to_string()));
        }

        let mut converted = Vec::with_capacity(rows.len());
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != schema.len() {
                return Err(invalid(format!(
                    "row {i} has {} values, expected {}",
                    row.len(),
                    schema.len()
                )));
            }
            let row = row
                .into_iter()
                .zip(schema.fields())
                .map(|(value, field)| {
                    if value.is_null() && !field.nullability.is_nullable() {
                        return Err(invalid(format!(
                            "row {i}: NULL in non-nullable column '{}'",
                            field.name
                        )));
                    }
                    value
                        .cast_to(&field.data_type)
                        .map_err(|e| invalid(format!("row {i}, column '{}': {e}", field.name)))
                })
                .collect::<BackendResult<Row>>()?;
            converted.push(row);
        }

        let table = Arc::new(Table {
            schema,
            rows: Arc::new(converted),
        });
        if self.tables.write().insert(name.to_string(), table).is_some() {
            debug!("Replaced table '{name}'");
        }
        Ok(())
    }

    /// Registered table names in sorted order
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Schema of a registered table
    pub fn table_schema(&self, name: &str) -> Option<Schema> {
        self.tables.read().get(name).map(|t| t.schema.clone())
    }

    /// Resolve every source of `plan` to a table providing its declared schema
    fn resolve_tables(&self, rels: &[&Rel]) -> BackendResult<HashMap<String, Arc<Table>>> {
        let tables = self.tables.read();
        let mut resolved = HashMap::new();
        for rel in rels {
            let RelOp::Source { name } = rel.op() else {
                continue;
            };
            let table = tables.get(name.as_str()).ok_or_else(|| BackendError::TableNotFound {
                name: name.to_string(),
                backend: MEMORY_BACKEND.to_string(),
            })?;
            if !rel.schema().is_preserved_by(&table.schema) {
                return Err(BackendError::SchemaMismatch {
                    table: name.to_string(),
                    expected: rel.schema().to_string(),
                    found: table.schema.to_string(),
                });
            }
            resolved.insert(name.to_string(), Arc::clone(table));
        }
        Ok(resolved)
    }
}

impl Backend for MemoryBackend {
    type Plan = MemoryPlan;

    fn name(&self) -> &str {
        MEMORY_BACKEND
    }

    fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    fn lower(&self, graph: &PlanGraph) -> BackendResult<MemoryPlan> {
        let steps: Vec<Step> = graph
            .topological_order()?
            .into_iter()
            .map(|rel| Step {
                consumers: graph.consumer_count(&rel.id()),
                rel,
            })
            .collect();
        let rels: Vec<&Rel> = steps.iter().map(|s| &s.rel).collect();
        self.resolve_tables(&rels)?;
        Ok(MemoryPlan { steps })
    }
}

#[async_trait]
impl Executor for MemoryBackend {
    async fn execute(&self, plan: &CompiledPlan<MemoryPlan>) -> BackendResult<ResultSet> {
        let schedule = plan.plan().clone();
        let tables = {
            let rels: Vec<&Rel> = schedule.steps.iter().map(|s| &s.rel).collect();
            self.resolve_tables(&rels)?
        };
        let root = plan.root().clone();
        debug!(
            "Executing {} on '{}' ({} nodes)",
            root.label(),
            MEMORY_BACKEND,
            schedule.len()
        );

        let rows = tokio::task::spawn_blocking(move || schedule.run(&root, &tables))
            .await
            .map_err(|e| BackendError::Internal(format!("execution task failed: {e}")))??;
        Ok(ResultSet::new(plan.schema().clone(), rows))
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
