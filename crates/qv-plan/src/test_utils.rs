//! Shared test utilities for qv-plan

use crate::error::{PlanError, PlanResult};
use crate::function::udf::{CmpOp, InputConstraint, Specializer, UdfDefinition, UdfInput};
use crate::function::{eval_fn, EvalFn, FunctionDef, FunctionRegistry, Volatility};
use crate::ir::expr::Expr;
use crate::ir::rel::Rel;
use qv_core::{DataType, Field, Schema, ScalarValue};
use std::sync::{Arc, OnceLock};

/// Schema of non-null BIGINT columns
pub fn int_schema(columns: &[&str]) -> Schema {
    Schema::try_new(
        columns
            .iter()
            .map(|c| Field::not_null(*c, DataType::int64()))
            .collect(),
    )
    .unwrap()
}

/// Source relation of non-null BIGINT columns
pub fn int_source(name: &str, columns: &[&str]) -> Rel {
    Rel::source(name, int_schema(columns)).unwrap()
}

/// BIGINT literal
pub fn lit(v: i64) -> Expr {
    Expr::literal(v)
}

/// Call a registered function, panicking on construction errors
pub fn call(registry: &FunctionRegistry, name: &str, args: Vec<Expr>) -> Expr {
    registry.call(name, args).unwrap()
}

/// Built-ins plus the `score` decision-tree UDF.
///
/// Every registry shares one registration of `score`, so plans built from
/// different registries hash alike.
pub fn registry() -> FunctionRegistry {
    static SCORE: OnceLock<FunctionDef> = OnceLock::new();
    let score = SCORE.get_or_init(|| FunctionDef::from_udf(score_udf()).unwrap());
    let mut registry = FunctionRegistry::with_builtins().unwrap();
    registry.insert(score.clone());
    registry
}

/// Reference semantics of `score(a, b, c)`: `b * 2` when `a < 10`, else `c + 100`
pub fn score_reference(a: i64, b: i64, c: i64) -> i64 {
    if a < 10 {
        b * 2
    } else {
        c + 100
    }
}

fn score_eval(args: &[ScalarValue]) -> PlanResult<ScalarValue> {
    match args {
        [ScalarValue::Integer(a), ScalarValue::Integer(b), ScalarValue::Integer(c)] => {
            Ok(ScalarValue::Integer(score_reference(*a, *b, *c)))
        }
        [_, _, _] => Ok(ScalarValue::Null),
        _ => Err(PlanError::eval("score", "expected three arguments")),
    }
}

/// Prunes the `score` tree to one branch when the filter settles the `a < 10` split
pub struct ScoreSpecializer;

impl Specializer for ScoreSpecializer {
    fn specialize(&self, constraints: &[InputConstraint]) -> Option<EvalFn> {
        let split = ScalarValue::Integer(10);
        let below = constraints.iter().any(|c| {
            c.position == 0
                && match c.op {
                    CmpOp::Lt => c.value.sort_cmp(&split).is_le(),
                    CmpOp::LtEq | CmpOp::Eq => c.value.sort_cmp(&split).is_lt(),
                    _ => false,
                }
        });
        if below {
            return Some(eval_fn(|args| match args.get(1) {
                Some(ScalarValue::Integer(b)) => Ok(ScalarValue::Integer(b * 2)),
                _ => Ok(ScalarValue::Null),
            }));
        }
        let above = constraints.iter().any(|c| {
            c.position == 0
                && match c.op {
                    CmpOp::Gt | CmpOp::GtEq | CmpOp::Eq => c.value.sort_cmp(&split).is_ge(),
                    _ => false,
                }
        });
        if above {
            return Some(eval_fn(|args| match args.get(2) {
                Some(ScalarValue::Integer(c)) => Ok(ScalarValue::Integer(c + 100)),
                _ => Ok(ScalarValue::Null),
            }));
        }
        None
    }
}

/// Immutable `score(a BIGINT, b BIGINT, c BIGINT) -> BIGINT` with a specializer
pub fn score_udf() -> UdfDefinition {
    UdfDefinition::new(
        "score",
        vec![
            UdfInput::new("a", DataType::int64()),
            UdfInput::new("b", DataType::int64()),
            UdfInput::new("c", DataType::int64()),
        ],
        DataType::int64(),
        eval_fn(score_eval),
    )
    .with_specializer(Arc::new(ScoreSpecializer))
}

/// `score` registered as volatile
pub fn volatile_score_udf() -> UdfDefinition {
    score_udf().with_volatility(Volatility::Volatile)
}
