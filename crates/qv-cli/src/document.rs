//! YAML plan documents.
//!
//! A document declares typed `sources` (optionally with inline rows) and an
//! ordered list of `relations`, each naming an operator over earlier names:
//!
//! ```yaml
//! sources:
//!   orders:
//!     columns:
//!       - { name: id, type: BIGINT }
//!       - { name: amount, type: "DECIMAL(10,2)", nullable: true }
//!     rows:
//!       - [1, 12.5]
//! relations:
//!   - name: large
//!     filter:
//!       input: orders
//!       predicates:
//!         - call: gt
//!           args: [{ col: amount }, { lit: 10 }]
//! output: large
//! ```
//!
//! Expressions are structured maps with exactly one of `col`, `lit`, `call`,
//! `agg`, `window` or `cast`.

use anyhow::{anyhow, bail, Context, Result};
use qv_backend::Row;
use qv_core::{parse_data_type, Field, ScalarValue, Schema};
use qv_plan::{
    AggregateFunc, Expr, FrameBound, FrameUnits, FunctionRegistry, JoinKind, Rel, SortKey,
    WindowFrame, WindowFunc,
};
use serde::{Deserialize, Deserializer};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Parsed plan document
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct PlanDocument {
    /// External relations by name
    #[serde(default)]
    pub sources: BTreeMap<String, SourceDoc>,

    /// Derived relations in definition order
    #[serde(default)]
    pub relations: Vec<RelationDoc>,

    /// Relation to check, optimize or run (default: the last relation)
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SourceDoc {
    pub columns: Vec<ColumnDoc>,

    /// Inline table contents for `qv run`
    #[serde(default)]
    pub rows: Vec<Vec<serde_yaml::Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ColumnDoc {
    pub name: String,

    #[serde(rename = "type")]
    pub data_type: String,

    #[serde(default)]
    pub nullable: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RelationDoc {
    pub name: String,

    #[serde(flatten)]
    pub op: OpDoc,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum OpDoc {
    Project(ProjectDoc),
    Filter(FilterDoc),
    Aggregate(AggregateDoc),
    Sort(SortDoc),
    Limit(LimitDoc),
    Join(JoinDoc),
    Union(SetOpDoc),
    Intersect(SetOpDoc),
    Difference(SetOpDoc),
    Alias(AliasDoc),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ProjectDoc {
    pub input: String,
    pub columns: Vec<NamedExprDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct FilterDoc {
    pub input: String,
    pub predicates: Vec<ExprDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct AggregateDoc {
    pub input: String,
    #[serde(default)]
    pub keys: Vec<NamedExprDoc>,
    pub metrics: Vec<NamedExprDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SortDoc {
    pub input: String,
    pub keys: Vec<SortKeyDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct LimitDoc {
    pub input: String,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub offset: u64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct JoinDoc {
    pub left: String,
    pub right: String,
    #[serde(default = "default_join_kind")]
    pub kind: String,
    /// Conjunctive join condition; empty for a cross join
    #[serde(default)]
    pub on: Vec<ExprDoc>,
}

fn default_join_kind() -> String {
    "inner".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SetOpDoc {
    pub left: String,
    pub right: String,
    #[serde(default)]
    pub distinct: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct AliasDoc {
    pub input: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct NamedExprDoc {
    pub name: String,
    pub expr: ExprDoc,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SortKeyDoc {
    pub expr: ExprDoc,
    #[serde(default)]
    pub descending: bool,
    /// Default: first when ascending, last when descending
    #[serde(default)]
    pub nulls_first: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct FrameDoc {
    #[serde(default = "default_frame_units")]
    pub units: String,
    pub start: String,
    pub end: String,
}

fn default_frame_units() -> String {
    "rows".to_string()
}

/// One scalar expression
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ExprDoc {
    /// Column reference
    #[serde(default)]
    pub col: Option<String>,
    /// Relation the column belongs to, when not unique among the inputs
    #[serde(default)]
    pub of: Option<String>,

    /// Literal value (`null` included)
    #[serde(default, deserialize_with = "present")]
    pub lit: Option<serde_yaml::Value>,
    /// Explicit literal type
    #[serde(default, rename = "type")]
    pub data_type: Option<String>,

    /// Scalar function or UDF call
    #[serde(default)]
    pub call: Option<String>,

    /// Aggregate call
    #[serde(default)]
    pub agg: Option<String>,
    #[serde(default)]
    pub distinct: bool,

    /// Window call
    #[serde(default)]
    pub window: Option<String>,
    /// Offset of `lag`/`lead`
    #[serde(default)]
    pub offset: Option<u64>,
    #[serde(default)]
    pub partition_by: Vec<ExprDoc>,
    #[serde(default)]
    pub order_by: Vec<SortKeyDoc>,
    #[serde(default)]
    pub frame: Option<FrameDoc>,

    /// Explicit conversion of the inner expression to `to`
    #[serde(default)]
    pub cast: Option<Box<ExprDoc>>,
    #[serde(default)]
    pub to: Option<String>,

    /// Arguments of `call`, `agg` and `window`
    #[serde(default)]
    pub args: Vec<ExprDoc>,
}

/// Keeps an explicit `null` distinct from an absent key
fn present<'de, D: Deserializer<'de>>(d: D) -> Result<Option<serde_yaml::Value>, D::Error> {
    serde_yaml::Value::deserialize(d).map(Some)
}

/// A source with the rows it was declared with
#[derive(Debug, Clone)]
pub(crate) struct SourceTable {
    pub name: String,
    pub schema: Schema,
    pub rows: Vec<Row>,
}

/// Every relation of a document, built and validated
#[derive(Debug)]
pub(crate) struct BuiltPlan {
    /// Sources then derived relations, in definition order
    pub relations: Vec<(String, Rel)>,
    /// Name of the selected output
    pub output_name: String,
    /// Selected output relation
    pub output: Rel,
    /// Source declarations with their inline rows
    pub tables: Vec<SourceTable>,
}

impl PlanDocument {
    /// Read and parse a document file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read plan document {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid plan document {}", path.display()))
    }

    /// Parse a document from YAML text
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Build every source and relation against `registry`
    pub fn build(&self, registry: &FunctionRegistry) -> Result<BuiltPlan> {
        let mut env: HashMap<String, Rel> = HashMap::new();
        let mut relations = Vec::new();
        let mut tables = Vec::new();

        for (name, source) in &self.sources {
            let table = source
                .table(name)
                .with_context(|| format!("source '{name}'"))?;
            let rel = Rel::source(name.as_str(), table.schema.clone())?;
            env.insert(name.clone(), rel.clone());
            relations.push((name.clone(), rel));
            tables.push(table);
        }

        for doc in &self.relations {
            if env.contains_key(&doc.name) {
                bail!("relation '{}' is defined more than once", doc.name);
            }
            let rel = build_relation(&doc.name, &doc.op, &env, registry)
                .with_context(|| format!("relation '{}'", doc.name))?;
            env.insert(doc.name.clone(), rel.clone());
            relations.push((doc.name.clone(), rel));
        }

        let output_name = match &self.output {
            Some(name) => name.clone(),
            None => self
                .relations
                .last()
                .map(|r| r.name.clone())
                .ok_or_else(|| anyhow!("document defines no relations and no output"))?,
        };
        let output = env
            .get(&output_name)
            .cloned()
            .ok_or_else(|| anyhow!("output '{output_name}' is not defined"))?;

        Ok(BuiltPlan {
            relations,
            output_name,
            output,
            tables,
        })
    }
}

impl SourceDoc {
    fn table(&self, name: &str) -> Result<SourceTable> {
        let fields = self
            .columns
            .iter()
            .map(|c| {
                let data_type = parse_data_type(&c.data_type)
                    .with_context(|| format!("column '{}'", c.name))?;
                Ok(if c.nullable {
                    Field::nullable(c.name.as_str(), data_type)
                } else {
                    Field::not_null(c.name.as_str(), data_type)
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let schema = Schema::try_new(fields)?;
        let rows = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                row.iter()
                    .map(scalar)
                    .collect::<Result<Row>>()
                    .with_context(|| format!("row {i}"))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(SourceTable {
            name: name.to_string(),
            schema,
            rows,
        })
    }
}

fn build_relation(
    name: &str,
    op: &OpDoc,
    env: &HashMap<String, Rel>,
    registry: &FunctionRegistry,
) -> Result<Rel> {
    let lookup = |input: &str| {
        env.get(input)
            .cloned()
            .ok_or_else(|| anyhow!("unknown relation '{input}'"))
    };

    let rel = match op {
        OpDoc::Project(p) => {
            let input = lookup(&p.input)?;
            let scope = Scope::new(vec![&input], env, registry);
            input.project(scope.named(&p.columns)?)?
        }
        OpDoc::Filter(f) => {
            let input = lookup(&f.input)?;
            let scope = Scope::new(vec![&input], env, registry);
            input.filter(scope.exprs(&f.predicates)?)?
        }
        OpDoc::Aggregate(a) => {
            let input = lookup(&a.input)?;
            let scope = Scope::new(vec![&input], env, registry);
            input.aggregate(scope.named(&a.keys)?, scope.named(&a.metrics)?)?
        }
        OpDoc::Sort(s) => {
            let input = lookup(&s.input)?;
            let scope = Scope::new(vec![&input], env, registry);
            input.sort(scope.sort_keys(&s.keys)?)?
        }
        OpDoc::Limit(l) => lookup(&l.input)?.limit(l.limit, l.offset)?,
        OpDoc::Join(j) => {
            let (left, right) = (lookup(&j.left)?, lookup(&j.right)?);
            let kind = JoinKind::from_name(&j.kind)
                .ok_or_else(|| anyhow!("unknown join kind '{}'", j.kind))?;
            let scope = Scope::new(vec![&left, &right], env, registry);
            left.join(&right, kind, scope.exprs(&j.on)?)?
        }
        OpDoc::Union(s) => lookup(&s.left)?.union(&lookup(&s.right)?, s.distinct)?,
        OpDoc::Intersect(s) => lookup(&s.left)?.intersect(&lookup(&s.right)?, s.distinct)?,
        OpDoc::Difference(s) => lookup(&s.left)?.difference(&lookup(&s.right)?, s.distinct)?,
        OpDoc::Alias(a) => lookup(&a.input)?.alias(name)?,
    };
    Ok(rel)
}

/// Name resolution for the expressions of one node
struct Scope<'a> {
    inputs: Vec<&'a Rel>,
    env: &'a HashMap<String, Rel>,
    registry: &'a FunctionRegistry,
}

impl<'a> Scope<'a> {
    fn new(inputs: Vec<&'a Rel>, env: &'a HashMap<String, Rel>, registry: &'a FunctionRegistry) -> Self {
        Self {
            inputs,
            env,
            registry,
        }
    }

    fn named(&self, docs: &[NamedExprDoc]) -> Result<Vec<(String, Expr)>> {
        docs.iter()
            .map(|d| {
                let expr = self
                    .expr(&d.expr)
                    .with_context(|| format!("column '{}'", d.name))?;
                Ok((d.name.clone(), expr))
            })
            .collect()
    }

    fn exprs(&self, docs: &[ExprDoc]) -> Result<Vec<Expr>> {
        docs.iter().map(|d| self.expr(d)).collect()
    }

    fn sort_keys(&self, docs: &[SortKeyDoc]) -> Result<Vec<SortKey>> {
        docs.iter()
            .map(|d| {
                let expr = self.expr(&d.expr)?;
                let mut key = if d.descending {
                    SortKey::desc(expr)
                } else {
                    SortKey::asc(expr)
                };
                if let Some(nulls_first) = d.nulls_first {
                    key.nulls_first = nulls_first;
                }
                Ok(key)
            })
            .collect()
    }

    fn column(&self, name: &str, of: Option<&str>) -> Result<Expr> {
        if let Some(relation) = of {
            let rel = self
                .env
                .get(relation)
                .ok_or_else(|| anyhow!("unknown relation '{relation}'"))?;
            return Ok(rel.col(name)?);
        }
        let owners: Vec<&Rel> = self
            .inputs
            .iter()
            .copied()
            .filter(|r| r.schema().contains(name))
            .collect();
        match owners.as_slice() {
            [rel] => Ok(rel.col(name)?),
            [] => bail!("column '{name}' not found"),
            _ => bail!("column '{name}' is ambiguous; qualify it with `of`"),
        }
    }

    fn expr(&self, doc: &ExprDoc) -> Result<Expr> {
        let forms = [
            doc.col.is_some(),
            doc.lit.is_some(),
            doc.call.is_some(),
            doc.agg.is_some(),
            doc.window.is_some(),
            doc.cast.is_some(),
        ];
        if forms.iter().filter(|f| **f).count() != 1 {
            bail!("expression needs exactly one of col, lit, call, agg, window or cast");
        }

        if let Some(name) = &doc.col {
            return self.column(name, doc.of.as_deref());
        }
        if let Some(value) = &doc.lit {
            let value = scalar(value)?;
            return Ok(match &doc.data_type {
                Some(t) => Expr::typed_literal(value, parse_data_type(t)?)?,
                None => Expr::literal(value),
            });
        }
        if let Some(inner) = &doc.cast {
            let to = doc
                .to
                .as_deref()
                .ok_or_else(|| anyhow!("cast needs a target type in `to`"))?;
            return Ok(self.expr(inner)?.cast(parse_data_type(to)?)?);
        }

        let args = self.exprs(&doc.args)?;
        if let Some(name) = &doc.call {
            return Ok(self.registry.call(name, args)?);
        }
        if let Some(name) = &doc.agg {
            let (func, distinct) = AggregateFunc::from_name(name)
                .ok_or_else(|| anyhow!("unknown aggregate function '{name}'"))?;
            return Ok(Expr::aggregate(func, args, distinct || doc.distinct)?);
        }

        let name = doc.window.as_deref().unwrap_or_default();
        let func = WindowFunc::from_name(name, doc.offset)
            .ok_or_else(|| anyhow!("unknown window function '{name}'"))?;
        let partition_by = self.exprs(&doc.partition_by)?;
        let order_by = self.sort_keys(&doc.order_by)?;
        let frame = match &doc.frame {
            Some(f) => frame(f)?,
            None => WindowFrame::default_for(!order_by.is_empty()),
        };
        Ok(Expr::window(func, args, partition_by, order_by, frame)?)
    }
}

/// Convert a YAML scalar to a value; integers stay exact
pub(crate) fn scalar(value: &serde_yaml::Value) -> Result<ScalarValue> {
    use serde_yaml::Value;
    Ok(match value {
        Value::Null => ScalarValue::Null,
        Value::Bool(b) => ScalarValue::Boolean(*b),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => ScalarValue::Integer(i),
            (None, Some(f)) => ScalarValue::Float(f),
            (None, None) => bail!("number {n} is out of range"),
        },
        Value::String(s) => ScalarValue::String(s.clone()),
        other => bail!("unsupported literal {other:?}"),
    })
}

fn frame(doc: &FrameDoc) -> Result<WindowFrame> {
    let units = match doc.units.to_lowercase().as_str() {
        "rows" => FrameUnits::Rows,
        "range" => FrameUnits::Range,
        other => bail!("unknown frame units '{other}'"),
    };
    Ok(WindowFrame {
        units,
        start: frame_bound(&doc.start)?,
        end: frame_bound(&doc.end)?,
    })
}

/// `unbounded preceding`, `3 preceding`, `current row`, `2 following`, `unbounded following`
pub(crate) fn frame_bound(text: &str) -> Result<FrameBound> {
    let lowered = text.to_lowercase();
    let words: Vec<&str> = lowered.split_whitespace().collect();
    Ok(match words.as_slice() {
        ["unbounded", "preceding"] => FrameBound::UnboundedPreceding,
        ["current", "row"] => FrameBound::CurrentRow,
        ["unbounded", "following"] => FrameBound::UnboundedFollowing,
        [n, "preceding"] => FrameBound::Preceding(
            n.parse()
                .with_context(|| format!("invalid frame offset in '{text}'"))?,
        ),
        [n, "following"] => FrameBound::Following(
            n.parse()
                .with_context(|| format!("invalid frame offset in '{text}'"))?,
        ),
        _ => bail!("invalid frame bound '{text}'"),
    })
}

#[cfg(test)]
#[path = "document_test.rs"]
mod tests;
