//! Scalar function definitions and the function registry.
//!
//! Built-in operators and user-defined functions share one representation,
//! [`FunctionDef`]: a stable identity, a typing signature, a volatility flag,
//! an evaluation body and, for UDFs, an optional specializer. Call nodes hold
//! an `Arc<FunctionDef>`, so a plan carries everything needed to type-check,
//! fold and evaluate its calls.

pub mod aggregate;
mod builtins;
mod coerce;
pub mod udf;

use crate::error::{PlanError, PlanResult};
use crate::ir::expr::Expr;
use qv_core::{DataType, FunctionName, Nullability, ScalarValue};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub use udf::{CmpOp, Domain, InputConstraint, Specializer, UdfDefinition, UdfInput};

/// Evaluation body of a scalar function
pub type EvalFn = Arc<dyn Fn(&[ScalarValue]) -> PlanResult<ScalarValue> + Send + Sync>;

/// Wrap a closure as an [`EvalFn`]
pub fn eval_fn<F>(f: F) -> EvalFn
where
    F: Fn(&[ScalarValue]) -> PlanResult<ScalarValue> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Declared reorder/duplication safety of a function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Volatility {
    /// Same inputs always give the same output; may be folded, reordered and deduplicated
    Immutable,
    /// Deterministic within one execution; may be reordered but not folded
    Stable,
    /// May differ per call; never folded, reordered, deduplicated or pruned
    Volatile,
}

impl std::fmt::Display for Volatility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Volatility::Immutable => write!(f, "immutable"),
            Volatility::Stable => write!(f, "stable"),
            Volatility::Volatile => write!(f, "volatile"),
        }
    }
}

/// Typing rule of a built-in function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeRule {
    /// Two numeric arguments unified to a common numeric result
    Arithmetic,
    /// One numeric argument, same result type
    Numeric,
    /// Two arguments unified to a common type, boolean result
    Comparison,
    /// Two boolean arguments, boolean result
    Logical,
    /// One boolean argument, boolean result
    Not,
    /// Any single argument, non-null boolean result
    NullCheck,
    /// One or more arguments unified to a common type
    Coalesce,
    /// Boolean condition followed by two branches of a common type
    IfElse,
    /// One string argument, string result
    StringUnary,
    /// One string argument, integer result
    StringLength,
    /// One or more string arguments, string result
    Concat,
}

/// How a function's argument and result types are determined
#[derive(Debug, Clone, PartialEq)]
pub enum Signature {
    /// Fixed named inputs and output type (user-defined functions)
    Exact {
        /// Declared inputs in call order
        inputs: Vec<UdfInput>,
        /// Declared output type
        output: DataType,
    },
    /// Built-in typing rule
    Rule(TypeRule),
}

/// Source of registration tokens; 0 is reserved for built-ins
static NEXT_REGISTRATION: AtomicU64 = AtomicU64::new(1);

/// A callable scalar function
#[derive(Clone)]
pub struct FunctionDef {
    name: FunctionName,
    identity: String,
    signature: Signature,
    volatility: Volatility,
    eval: EvalFn,
    specializer: Option<Arc<dyn Specializer>>,
    user_defined: bool,
    specialized: bool,
    registration: u64,
}

impl FunctionDef {
    pub(crate) fn builtin(name: &str, rule: TypeRule, eval: EvalFn) -> PlanResult<Self> {
        let name = function_name(name)?;
        Ok(Self {
            identity: builtin_identity(&name, Volatility::Immutable),
            name,
            signature: Signature::Rule(rule),
            volatility: Volatility::Immutable,
            eval,
            specializer: None,
            user_defined: false,
            specialized: false,
            registration: 0,
        })
    }

    pub(crate) fn from_udf(udf: UdfDefinition) -> PlanResult<Self> {
        let name = function_name(&udf.name)?;
        let mut seen = std::collections::HashSet::new();
        for input in &udf.inputs {
            if !seen.insert(input.name.as_str()) {
                return Err(PlanError::shape(
                    "function registration",
                    format!("duplicate input '{}' in '{}'", input.name, name),
                ));
            }
        }
        let signature = Signature::Exact {
            inputs: udf.inputs,
            output: udf.output,
        };
        let registration = NEXT_REGISTRATION.fetch_add(1, Ordering::Relaxed);
        Ok(Self {
            identity: udf_identity(&name, &signature, udf.volatility, registration),
            name,
            signature,
            volatility: udf.volatility,
            eval: udf.eval,
            specializer: udf.specializer,
            user_defined: true,
            specialized: false,
            registration,
        })
    }

    /// Registered name
    pub fn name(&self) -> &FunctionName {
        &self.name
    }

    /// Stable identity used for structural hashing.
    ///
    /// Built from the name, signature and volatility. A user-defined function
    /// also carries a token unique to its registration, so two registrations
    /// with different bodies never share call nodes. Specialized variants
    /// append their narrowed domain.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Typing signature
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Declared volatility
    pub fn volatility(&self) -> Volatility {
        self.volatility
    }

    /// True for functions registered through [`FunctionRegistry::register`]
    pub fn is_user_defined(&self) -> bool {
        self.user_defined
    }

    /// True for a variant produced by predicate pushdown
    pub fn is_specialized(&self) -> bool {
        self.specialized
    }

    /// Specializer supplied at registration, if any
    pub fn specializer(&self) -> Option<&Arc<dyn Specializer>> {
        self.specializer.as_ref()
    }

    /// Input names for exact signatures
    pub fn input_names(&self) -> Vec<&str> {
        match &self.signature {
            Signature::Exact { inputs, .. } => inputs.iter().map(|i| i.name.as_str()).collect(),
            Signature::Rule(_) => Vec::new(),
        }
    }

    /// Evaluate the function on concrete argument values
    pub fn evaluate(&self, args: &[ScalarValue]) -> PlanResult<ScalarValue> {
        (self.eval)(args)
    }

    /// Copy of this definition with a different volatility
    pub fn with_volatility(&self, volatility: Volatility) -> FunctionDef {
        let mut def = self.clone();
        def.volatility = volatility;
        def.identity = if def.user_defined {
            udf_identity(&def.name, &def.signature, volatility, def.registration)
        } else {
            builtin_identity(&def.name, volatility)
        };
        def
    }

    pub(crate) fn specialized_variant(&self, domain: &Domain, eval: EvalFn) -> FunctionDef {
        FunctionDef {
            name: self.name.clone(),
            identity: format!("{}[{}]", self.identity, domain),
            signature: self.signature.clone(),
            volatility: self.volatility,
            eval,
            specializer: None,
            user_defined: self.user_defined,
            specialized: true,
            registration: self.registration,
        }
    }

    pub(crate) fn eval_body(&self) -> &EvalFn {
        &self.eval
    }

    /// Type-check and coerce call arguments.
    ///
    /// Returns the coerced arguments with the result type and nullability.
    pub(crate) fn bind(&self, args: Vec<Expr>) -> PlanResult<(Vec<Expr>, DataType, Nullability)> {
        match &self.signature {
            Signature::Exact { inputs, output } => {
                if args.len() != inputs.len() {
                    return Err(PlanError::ArityMismatch {
                        function: self.name.to_string(),
                        expected: inputs.len().to_string(),
                        found: args.len(),
                    });
                }
                let args = args
                    .into_iter()
                    .zip(inputs.iter())
                    .enumerate()
                    .map(|(pos, (arg, input))| {
                        coerce::coerce_arg(&self.name, pos, arg, &input.data_type)
                    })
                    .collect::<PlanResult<Vec<_>>>()?;
                Ok((args, output.clone(), Nullability::Nullable))
            }
            Signature::Rule(rule) => coerce::bind_rule(&self.name, *rule, args),
        }
    }
}

fn function_name(name: &str) -> PlanResult<FunctionName> {
    FunctionName::try_new(name)
        .ok_or_else(|| PlanError::shape("function registration", "function name must not be empty"))
}

fn builtin_identity(name: &FunctionName, volatility: Volatility) -> String {
    match volatility {
        Volatility::Immutable => name.to_string(),
        other => format!("{name}/{other}"),
    }
}

fn udf_identity(
    name: &FunctionName,
    signature: &Signature,
    volatility: Volatility,
    registration: u64,
) -> String {
    match signature {
        Signature::Exact { inputs, output } => {
            let params: Vec<String> = inputs
                .iter()
                .map(|i| format!("{} {}", i.name, i.data_type))
                .collect();
            format!(
                "{name}({}) -> {output}/{volatility}#{registration}",
                params.join(", ")
            )
        }
        Signature::Rule(_) => builtin_identity(name, volatility),
    }
}

impl std::fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionDef")
            .field("identity", &self.identity)
            .field("volatility", &self.volatility)
            .field("specializer", &self.specializer.is_some())
            .finish()
    }
}

/// Name-keyed table of callable functions
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: BTreeMap<FunctionName, Arc<FunctionDef>>,
}

impl FunctionRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-loaded with the immutable built-in functions
    pub fn with_builtins() -> PlanResult<Self> {
        let mut registry = Self::new();
        for def in builtins::all()? {
            registry.insert(def);
        }
        Ok(registry)
    }

    /// Register a user-defined function, replacing any function of the same name
    pub fn register(&mut self, udf: UdfDefinition) -> PlanResult<Arc<FunctionDef>> {
        let def = FunctionDef::from_udf(udf)?;
        Ok(self.insert(def))
    }

    /// Insert a definition, replacing any function of the same name
    pub fn insert(&mut self, def: FunctionDef) -> Arc<FunctionDef> {
        let def = Arc::new(def);
        if self
            .functions
            .insert(def.name().clone(), Arc::clone(&def))
            .is_some()
        {
            log::debug!("Replaced function '{}'", def.name());
        }
        def
    }

    /// Look up a function by name
    pub fn get(&self, name: &str) -> Option<&Arc<FunctionDef>> {
        self.functions.get(name)
    }

    /// Registered names in sorted order
    pub fn names(&self) -> Vec<&str> {
        self.functions.keys().map(|k| k.as_str()).collect()
    }

    /// Build a call node to a registered function
    pub fn call(&self, name: &str, args: Vec<Expr>) -> PlanResult<Expr> {
        let func = self
            .get(name)
            .ok_or_else(|| PlanError::UnknownFunction {
                name: name.to_string(),
            })?;
        Expr::call(Arc::clone(func), args)
    }
}

#[cfg(test)]
#[path = "function_test.rs"]
mod tests;
