//! User-defined function registration and specialization

use super::{EvalFn, FunctionDef, Volatility};
use qv_core::{DataType, ScalarValue};
use std::cmp::Ordering;
use std::sync::Arc;

/// A named, typed UDF input
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UdfInput {
    /// Input (feature) name
    pub name: String,
    /// Declared type
    pub data_type: DataType,
}

impl UdfInput {
    /// Create an input
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Everything needed to register a user-defined scalar function
pub struct UdfDefinition {
    /// Stable name
    pub name: String,
    /// Declared inputs in call order
    pub inputs: Vec<UdfInput>,
    /// Declared output type
    pub output: DataType,
    /// Reorder/duplication safety
    pub volatility: Volatility,
    /// Evaluation body
    pub eval: EvalFn,
    /// Optional callback that narrows the body for a constrained input domain
    pub specializer: Option<Arc<dyn Specializer>>,
}

impl UdfDefinition {
    /// An immutable UDF without a specializer
    pub fn new(
        name: impl Into<String>,
        inputs: Vec<UdfInput>,
        output: DataType,
        eval: EvalFn,
    ) -> Self {
        Self {
            name: name.into(),
            inputs,
            output,
            volatility: Volatility::Immutable,
            eval,
            specializer: None,
        }
    }

    /// Set the volatility
    pub fn with_volatility(mut self, volatility: Volatility) -> Self {
        self.volatility = volatility;
        self
    }

    /// Attach a specializer
    pub fn with_specializer(mut self, specializer: Arc<dyn Specializer>) -> Self {
        self.specializer = Some(specializer);
        self
    }
}

/// Comparison operator of a pushed-down constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `=`
    Eq,
}

impl CmpOp {
    /// Map a built-in comparison function name
    pub fn from_function(name: &str) -> Option<CmpOp> {
        match name {
            "lt" => Some(CmpOp::Lt),
            "lt_eq" => Some(CmpOp::LtEq),
            "gt" => Some(CmpOp::Gt),
            "gt_eq" => Some(CmpOp::GtEq),
            "eq" => Some(CmpOp::Eq),
            _ => None,
        }
    }

    /// The operator with its operands swapped (`5 > a` is `a < 5`)
    pub fn flip(self) -> CmpOp {
        match self {
            CmpOp::Lt => CmpOp::Gt,
            CmpOp::LtEq => CmpOp::GtEq,
            CmpOp::Gt => CmpOp::Lt,
            CmpOp::GtEq => CmpOp::LtEq,
            CmpOp::Eq => CmpOp::Eq,
        }
    }

    /// Whether `lhs op rhs` holds given `lhs.cmp(rhs)`
    pub fn holds(self, ordering: Ordering) -> bool {
        match self {
            CmpOp::Lt => ordering == Ordering::Less,
            CmpOp::LtEq => ordering != Ordering::Greater,
            CmpOp::Gt => ordering == Ordering::Greater,
            CmpOp::GtEq => ordering != Ordering::Less,
            CmpOp::Eq => ordering == Ordering::Equal,
        }
    }

    /// Operator symbol
    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Lt => "<",
            CmpOp::LtEq => "<=",
            CmpOp::Gt => ">",
            CmpOp::GtEq => ">=",
            CmpOp::Eq => "=",
        }
    }
}

/// A known bound on one UDF input, derived from a sibling filter predicate
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InputConstraint {
    /// Argument position
    pub position: usize,
    /// Declared input name
    pub input: String,
    /// Comparison with `value`
    pub op: CmpOp,
    /// Literal bound
    pub value: ScalarValue,
}

impl InputConstraint {
    /// Whether `arg` satisfies the constraint; nulls never do
    pub fn admits(&self, arg: &ScalarValue) -> bool {
        arg.compare(&self.value)
            .map(|ord| self.op.holds(ord))
            .unwrap_or(false)
    }
}

impl std::fmt::Display for InputConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}{}", self.input, self.op.symbol(), self.value)
    }
}

/// Conjunction of input constraints describing a narrowed input domain
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Domain {
    constraints: Vec<InputConstraint>,
}

impl Domain {
    /// Build a domain; constraints are put in a canonical order
    pub fn new(mut constraints: Vec<InputConstraint>) -> Self {
        constraints.sort_by(|a, b| {
            a.position
                .cmp(&b.position)
                .then_with(|| a.op.symbol().cmp(b.op.symbol()))
                .then_with(|| a.value.sort_cmp(&b.value))
        });
        constraints.dedup();
        Self { constraints }
    }

    /// Constraints in canonical order
    pub fn constraints(&self) -> &[InputConstraint] {
        &self.constraints
    }

    /// Whether every constraint holds for these arguments
    pub fn contains(&self, args: &[ScalarValue]) -> bool {
        self.constraints.iter().all(|c| {
            args.get(c.position)
                .map(|arg| c.admits(arg))
                .unwrap_or(false)
        })
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.constraints.iter().map(|c| c.to_string()).collect();
        f.write_str(&parts.join(", "))
    }
}

/// Domain-specific narrowing supplied by a UDF at registration.
///
/// Given the constraints known to hold for every row that reaches the
/// filter, return a body that is correct for inputs inside that domain, or
/// `None` when no safe narrowing exists. Inputs outside the domain are routed
/// to the original body, so the returned body only has to agree with the
/// original inside it.
pub trait Specializer: Send + Sync {
    /// Produce a narrowed evaluation body
    fn specialize(&self, constraints: &[InputConstraint]) -> Option<EvalFn>;
}

/// Specialize a UDF for a constrained domain.
///
/// Returns `None` when the function is not an unspecialized, non-volatile
/// UDF with a specializer, or when the specializer declines.
pub(crate) fn specialize(def: &FunctionDef, constraints: Vec<InputConstraint>) -> Option<FunctionDef> {
    if !def.is_user_defined() || def.is_specialized() || def.volatility() == Volatility::Volatile {
        return None;
    }
    let specializer = def.specializer()?;
    let domain = Domain::new(constraints);
    if domain.constraints().is_empty() {
        return None;
    }
    let narrowed = specializer.specialize(domain.constraints())?;

    let original = Arc::clone(def.eval_body());
    let guard = domain.clone();
    let eval: EvalFn = Arc::new(move |args: &[ScalarValue]| {
        if guard.contains(args) {
            narrowed(args)
        } else {
            original(args)
        }
    });
    Some(def.specialized_variant(&domain, eval))
}
