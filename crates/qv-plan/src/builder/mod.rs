//! Validated construction of relational nodes.
//!
//! Every constructor binds its expressions to its inputs, re-derives the
//! output schema and fails eagerly with a [`PlanError`] naming the offending
//! node or column. Nothing is deferred to optimization or execution.

mod resolve;
pub(crate) mod validate;

use crate::error::{PlanError, PlanResult};
use crate::ir::expr::{Expr, SortKey};
use crate::ir::rel::{JoinKind, Rel, RelOp, SetOpKind};
use qv_core::{unify, Field, Nullability, Schema, SourceName};
use resolve::bind_expr;
use std::collections::HashSet;

/// Suffix appended to right-side join columns whose name is taken by the left side
pub const JOIN_COLLISION_SUFFIX: &str = "_right";

fn bind_all(exprs: Vec<Expr>, inputs: &[&Rel], consumer: &str) -> PlanResult<Vec<Expr>> {
    exprs
        .iter()
        .map(|e| bind_expr(e, inputs, consumer))
        .collect()
}

fn bind_columns<I, N>(columns: I, input: &Rel, consumer: &str) -> PlanResult<Vec<(String, Expr)>>
where
    I: IntoIterator<Item = (N, Expr)>,
    N: Into<String>,
{
    columns
        .into_iter()
        .map(|(name, e)| Ok((name.into(), bind_expr(&e, &[input], consumer)?)))
        .collect()
}

fn column_schema(columns: &[(String, Expr)]) -> PlanResult<Schema> {
    let fields = columns
        .iter()
        .map(|(name, e)| Field::new(name.clone(), e.data_type().clone(), e.nullability()))
        .collect();
    Ok(Schema::try_new(fields)?)
}

impl Rel {
    /// Leaf wrapping an external relation
    pub fn source(name: impl Into<String>, schema: Schema) -> PlanResult<Rel> {
        let name = SourceName::try_new(name)
            .ok_or_else(|| PlanError::shape("source", "relation name must not be empty"))?;
        Ok(Rel::make(RelOp::Source { name }, schema))
    }

    /// Reference to one of this relation's columns
    pub fn col(&self, name: &str) -> PlanResult<Expr> {
        let index = self
            .schema()
            .index_of(name)
            .ok_or_else(|| PlanError::UnresolvedColumn {
                column: name.to_string(),
                relation: self.label(),
            })?;
        Expr::bound_field(self, index)
    }

    /// References to every column, in schema order
    pub fn columns(&self) -> PlanResult<Vec<Expr>> {
        (0..self.schema().len())
            .map(|i| Expr::bound_field(self, i))
            .collect()
    }

    /// Named output columns computed from this relation
    pub fn project<I, N>(&self, columns: I) -> PlanResult<Rel>
    where
        I: IntoIterator<Item = (N, Expr)>,
        N: Into<String>,
    {
        let consumer = format!("project over {}", self.label());
        let columns = bind_columns(columns, self, &consumer)?;
        validate::projection(&columns)?;
        let schema = column_schema(&columns)?;
        Ok(Rel::make(
            RelOp::Project {
                input: self.clone(),
                columns,
            },
            schema,
        ))
    }

    /// Keep the rows for which every predicate is true
    pub fn filter(&self, predicates: Vec<Expr>) -> PlanResult<Rel> {
        let consumer = format!("filter over {}", self.label());
        validate::non_empty("filter", "predicate list", &predicates)?;
        let predicates = bind_all(predicates, &[self], &consumer)?;
        validate::predicates("filter", &predicates)?;
        Ok(Rel::make(
            RelOp::Filter {
                input: self.clone(),
                predicates,
            },
            self.schema().clone(),
        ))
    }

    /// Group by `keys` and reduce with `metrics`; keys come first in the output
    pub fn aggregate<K, KN, M, MN>(&self, keys: K, metrics: M) -> PlanResult<Rel>
    where
        K: IntoIterator<Item = (KN, Expr)>,
        KN: Into<String>,
        M: IntoIterator<Item = (MN, Expr)>,
        MN: Into<String>,
    {
        let consumer = format!("aggregate over {}", self.label());
        let keys = bind_columns(keys, self, &consumer)?;
        let metrics = bind_columns(metrics, self, &consumer)?;
        validate::aggregation(&keys, &metrics)?;
        let all: Vec<(String, Expr)> = keys.iter().chain(metrics.iter()).cloned().collect();
        let schema = column_schema(&all)?;
        Ok(Rel::make(
            RelOp::Aggregate {
                input: self.clone(),
                keys,
                metrics,
            },
            schema,
        ))
    }

    /// Order rows
    pub fn sort(&self, keys: Vec<SortKey>) -> PlanResult<Rel> {
        let consumer = format!("sort over {}", self.label());
        let keys = keys
            .into_iter()
            .map(|k| {
                Ok(SortKey {
                    expr: bind_expr(&k.expr, &[self], &consumer)?,
                    ascending: k.ascending,
                    nulls_first: k.nulls_first,
                })
            })
            .collect::<PlanResult<Vec<_>>>()?;
        validate::sort_keys(&keys)?;
        Ok(Rel::make(
            RelOp::Sort {
                input: self.clone(),
                keys,
            },
            self.schema().clone(),
        ))
    }

    /// Skip `offset` rows, then keep at most `limit`
    pub fn limit(&self, limit: Option<u64>, offset: u64) -> PlanResult<Rel> {
        Ok(Rel::make(
            RelOp::Limit {
                input: self.clone(),
                limit,
                offset,
            },
            self.schema().clone(),
        ))
    }

    /// Join with `right` under a conjunctive condition (empty for a cross join)
    pub fn join(&self, right: &Rel, kind: JoinKind, predicates: Vec<Expr>) -> PlanResult<Rel> {
        if self.id() == right.id() {
            return Err(PlanError::SelfJoin {
                relation: self.label(),
            });
        }
        let consumer = format!("{kind} join of {} and {}", self.label(), right.label());
        let predicates = bind_all(predicates, &[self, right], &consumer)?;
        validate::predicates("join", &predicates)?;
        let schema = join_schema(self.schema(), right.schema(), kind, &consumer)?;
        Ok(Rel::make(
            RelOp::Join {
                left: self.clone(),
                right: right.clone(),
                kind,
                predicates,
            },
            schema,
        ))
    }

    /// Rows of either input
    pub fn union(&self, other: &Rel, distinct: bool) -> PlanResult<Rel> {
        self.set_op(other, SetOpKind::Union, distinct)
    }

    /// Rows present in both inputs
    pub fn intersect(&self, other: &Rel, distinct: bool) -> PlanResult<Rel> {
        self.set_op(other, SetOpKind::Intersect, distinct)
    }

    /// Rows of this input absent from `other`
    pub fn difference(&self, other: &Rel, distinct: bool) -> PlanResult<Rel> {
        self.set_op(other, SetOpKind::Difference, distinct)
    }

    /// Set operation over two inputs with identical column names
    pub fn set_op(&self, other: &Rel, kind: SetOpKind, distinct: bool) -> PlanResult<Rel> {
        let (left, right) = (self.schema(), other.schema());
        if left.column_names() != right.column_names() {
            return Err(PlanError::SetOpMismatch {
                message: format!("{kind} of {left} and {right}: column names differ"),
            });
        }
        let fields = left
            .fields()
            .iter()
            .zip(right.fields())
            .map(|(l, r)| {
                let data_type = unify(&l.data_type, &r.data_type).map_err(|_| {
                    PlanError::SetOpMismatch {
                        message: format!(
                            "{kind}: column '{}' has types {} and {}",
                            l.name, l.data_type, r.data_type
                        ),
                    }
                })?;
                Ok(Field::new(
                    l.name.clone(),
                    data_type,
                    l.nullability.combine(r.nullability),
                ))
            })
            .collect::<PlanResult<Vec<_>>>()?;
        Ok(Rel::make(
            RelOp::SetOp {
                left: self.clone(),
                right: other.clone(),
                kind,
                distinct,
            },
            Schema::try_new(fields)?,
        ))
    }

    /// Same rows under a distinct identity, e.g. to join a relation with itself
    pub fn alias(&self, name: impl Into<String>) -> PlanResult<Rel> {
        let name = name.into();
        if name.is_empty() {
            return Err(PlanError::shape("alias", "alias name must not be empty"));
        }
        Ok(Rel::make(
            RelOp::Alias {
                input: self.clone(),
                name,
            },
            self.schema().clone(),
        ))
    }
}

fn join_schema(left: &Schema, right: &Schema, kind: JoinKind, consumer: &str) -> PlanResult<Schema> {
    if kind.is_filtering() {
        return Ok(left.clone());
    }
    let nullable_left = matches!(kind, JoinKind::Right | JoinKind::Full);
    let nullable_right = matches!(kind, JoinKind::Left | JoinKind::Full);
    let widen = |f: &Field, nullable: bool| {
        if nullable {
            Nullability::Nullable
        } else {
            f.nullability
        }
    };

    let mut names: HashSet<String> = left.column_names().iter().map(|n| n.to_string()).collect();
    let mut fields: Vec<Field> = left
        .fields()
        .iter()
        .map(|f| Field::new(f.name.clone(), f.data_type.clone(), widen(f, nullable_left)))
        .collect();
    for f in right.fields() {
        let name = if names.contains(&f.name) {
            let renamed = format!("{}{JOIN_COLLISION_SUFFIX}", f.name);
            if names.contains(&renamed) || right.contains(&renamed) {
                return Err(PlanError::AmbiguousColumn {
                    column: f.name.clone(),
                    relation: consumer.to_string(),
                });
            }
            renamed
        } else {
            f.name.clone()
        };
        names.insert(name.clone());
        fields.push(Field::new(name, f.data_type.clone(), widen(f, nullable_right)));
    }
    Ok(Schema::try_new(fields)?)
}

/// Rebuild `rel` over `inputs`, mapping each of its expressions through `map`
pub(crate) fn rebuild(
    rel: &Rel,
    inputs: Vec<Rel>,
    map: &mut dyn FnMut(&Expr) -> PlanResult<Expr>,
) -> PlanResult<Rel> {
    let mut inputs = inputs.into_iter();
    let mut next = || {
        inputs
            .next()
            .ok_or_else(|| PlanError::shape(rel.kind_name(), "missing input"))
    };
    let mut map_columns = |cols: &[(String, Expr)]| {
        cols.iter()
            .map(|(n, e)| Ok((n.clone(), map(e)?)))
            .collect::<PlanResult<Vec<_>>>()
    };

    match rel.op() {
        RelOp::Source { .. } => Ok(rel.clone()),
        RelOp::Project { columns, .. } => {
            let input = next()?;
            input.project(map_columns(columns)?)
        }
        RelOp::Filter { predicates, .. } => {
            let input = next()?;
            let predicates = predicates.iter().map(&mut *map).collect::<PlanResult<_>>()?;
            input.filter(predicates)
        }
        RelOp::Aggregate { keys, metrics, .. } => {
            let input = next()?;
            let keys = map_columns(keys)?;
            let metrics = map_columns(metrics)?;
            input.aggregate(keys, metrics)
        }
        RelOp::Sort { keys, .. } => {
            let input = next()?;
            let keys = keys
                .iter()
                .map(|k| {
                    Ok(SortKey {
                        expr: map(&k.expr)?,
                        ascending: k.ascending,
                        nulls_first: k.nulls_first,
                    })
                })
                .collect::<PlanResult<Vec<_>>>()?;
            input.sort(keys)
        }
        RelOp::Limit { limit, offset, .. } => next()?.limit(*limit, *offset),
        RelOp::Join {
            kind, predicates, ..
        } => {
            let left = next()?;
            let right = next()?;
            let predicates = predicates.iter().map(&mut *map).collect::<PlanResult<_>>()?;
            left.join(&right, *kind, predicates)
        }
        RelOp::SetOp { kind, distinct, .. } => {
            let left = next()?;
            let right = next()?;
            left.set_op(&right, *kind, *distinct)
        }
        RelOp::Alias { name, .. } => next()?.alias(name.clone()),
    }
}

#[cfg(test)]
#[path = "builder_test.rs"]
mod tests;
