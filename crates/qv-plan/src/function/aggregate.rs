//! Aggregate and window function catalog

use crate::error::{PlanError, PlanResult};
use qv_core::{DataType, Nullability, MAX_DECIMAL_PRECISION};

/// Reduction over a group of rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AggregateFunc {
    /// Count of non-null values
    Count,
    /// Count of rows
    CountStar,
    /// Sum of values
    Sum,
    /// Arithmetic mean
    Mean,
    /// Smallest value
    Min,
    /// Largest value
    Max,
}

impl AggregateFunc {
    /// Resolve a function name. `count_distinct` maps to `Count` with the distinct flag set.
    pub fn from_name(name: &str) -> Option<(AggregateFunc, bool)> {
        let func = match name.to_lowercase().as_str() {
            "count" => (AggregateFunc::Count, false),
            "count_star" => (AggregateFunc::CountStar, false),
            "count_distinct" => (AggregateFunc::Count, true),
            "sum" => (AggregateFunc::Sum, false),
            "mean" | "avg" => (AggregateFunc::Mean, false),
            "min" => (AggregateFunc::Min, false),
            "max" => (AggregateFunc::Max, false),
            _ => return None,
        };
        Some(func)
    }

    /// Canonical lowercase name
    pub fn name(self) -> &'static str {
        match self {
            AggregateFunc::Count => "count",
            AggregateFunc::CountStar => "count_star",
            AggregateFunc::Sum => "sum",
            AggregateFunc::Mean => "mean",
            AggregateFunc::Min => "min",
            AggregateFunc::Max => "max",
        }
    }

    /// Output type and nullability for the given argument types
    pub fn return_type(self, args: &[DataType]) -> PlanResult<(DataType, Nullability)> {
        let expect_arity = |n: usize| {
            if args.len() == n {
                Ok(())
            } else {
                Err(PlanError::ArityMismatch {
                    function: self.name().to_string(),
                    expected: n.to_string(),
                    found: args.len(),
                })
            }
        };
        let bad_arg = |expected: &str| PlanError::InvalidArgumentType {
            function: self.name().to_string(),
            position: 0,
            expected: expected.to_string(),
            found: args[0].clone(),
        };

        match self {
            AggregateFunc::CountStar => {
                expect_arity(0)?;
                Ok((DataType::int64(), Nullability::NotNull))
            }
            AggregateFunc::Count => {
                expect_arity(1)?;
                Ok((DataType::int64(), Nullability::NotNull))
            }
            AggregateFunc::Sum => {
                expect_arity(1)?;
                let out = match &args[0] {
                    DataType::Integer { .. } | DataType::Null => DataType::int64(),
                    DataType::Float { .. } => DataType::float64(),
                    DataType::Decimal { scale, .. } => {
                        DataType::decimal(MAX_DECIMAL_PRECISION, *scale)
                    }
                    _ => return Err(bad_arg("numeric")),
                };
                Ok((out, Nullability::Nullable))
            }
            AggregateFunc::Mean => {
                expect_arity(1)?;
                if !args[0].is_numeric() && args[0] != DataType::Null {
                    return Err(bad_arg("numeric"));
                }
                Ok((DataType::float64(), Nullability::Nullable))
            }
            AggregateFunc::Min | AggregateFunc::Max => {
                expect_arity(1)?;
                if !args[0].is_orderable() {
                    return Err(bad_arg("orderable"));
                }
                Ok((args[0].clone(), Nullability::Nullable))
            }
        }
    }
}

impl std::fmt::Display for AggregateFunc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Function evaluated over a window of rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowFunc {
    /// Any aggregate evaluated over the frame
    Aggregate(AggregateFunc),
    /// 1-based position within the partition
    RowNumber,
    /// Rank with gaps after ties
    Rank,
    /// Rank without gaps
    DenseRank,
    /// Value `n` rows before the current row
    Lag(u64),
    /// Value `n` rows after the current row
    Lead(u64),
}

impl WindowFunc {
    /// Resolve a window function name; `lag`/`lead` take their offset separately
    pub fn from_name(name: &str, offset: Option<u64>) -> Option<WindowFunc> {
        match name.to_lowercase().as_str() {
            "row_number" => Some(WindowFunc::RowNumber),
            "rank" => Some(WindowFunc::Rank),
            "dense_rank" => Some(WindowFunc::DenseRank),
            "lag" => Some(WindowFunc::Lag(offset.unwrap_or(1))),
            "lead" => Some(WindowFunc::Lead(offset.unwrap_or(1))),
            other => AggregateFunc::from_name(other).and_then(|(f, distinct)| {
                // Distinct window aggregates are not supported
                (!distinct).then_some(WindowFunc::Aggregate(f))
            }),
        }
    }

    /// Whether the function needs an ORDER BY to be meaningful
    pub fn requires_order(self) -> bool {
        matches!(
            self,
            WindowFunc::Rank | WindowFunc::DenseRank | WindowFunc::Lag(_) | WindowFunc::Lead(_)
        )
    }

    /// Output type and nullability for the given argument types
    pub fn return_type(self, args: &[DataType]) -> PlanResult<(DataType, Nullability)> {
        match self {
            WindowFunc::Aggregate(agg) => agg.return_type(args),
            WindowFunc::RowNumber | WindowFunc::Rank | WindowFunc::DenseRank => {
                if !args.is_empty() {
                    return Err(PlanError::ArityMismatch {
                        function: self.to_string(),
                        expected: "0".to_string(),
                        found: args.len(),
                    });
                }
                Ok((DataType::int64(), Nullability::NotNull))
            }
            WindowFunc::Lag(_) | WindowFunc::Lead(_) => {
                if args.len() != 1 {
                    return Err(PlanError::ArityMismatch {
                        function: self.to_string(),
                        expected: "1".to_string(),
                        found: args.len(),
                    });
                }
                Ok((args[0].clone(), Nullability::Nullable))
            }
        }
    }
}

impl std::fmt::Display for WindowFunc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WindowFunc::Aggregate(agg) => write!(f, "{agg}"),
            WindowFunc::RowNumber => write!(f, "row_number"),
            WindowFunc::Rank => write!(f, "rank"),
            WindowFunc::DenseRank => write!(f, "dense_rank"),
            WindowFunc::Lag(n) => write!(f, "lag[{n}]"),
            WindowFunc::Lead(n) => write!(f, "lead[{n}]"),
        }
    }
}

/// How frame offsets are measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameUnits {
    /// Physical row offsets
    Rows,
    /// Peer groups of equal ORDER BY values
    Range,
}

/// One end of a window frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameBound {
    /// First row of the partition
    UnboundedPreceding,
    /// `n` rows before the current row
    Preceding(u64),
    /// The current row (or its last peer for RANGE end bounds)
    CurrentRow,
    /// `n` rows after the current row
    Following(u64),
    /// Last row of the partition
    UnboundedFollowing,
}

impl FrameBound {
    /// Signed position relative to the current row, used to order bounds
    fn rank(self) -> i128 {
        match self {
            FrameBound::UnboundedPreceding => i128::MIN,
            FrameBound::Preceding(n) => -(n as i128),
            FrameBound::CurrentRow => 0,
            FrameBound::Following(n) => n as i128,
            FrameBound::UnboundedFollowing => i128::MAX,
        }
    }
}

impl std::fmt::Display for FrameBound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameBound::UnboundedPreceding => write!(f, "UNBOUNDED PRECEDING"),
            FrameBound::Preceding(n) => write!(f, "{n} PRECEDING"),
            FrameBound::CurrentRow => write!(f, "CURRENT ROW"),
            FrameBound::Following(n) => write!(f, "{n} FOLLOWING"),
            FrameBound::UnboundedFollowing => write!(f, "UNBOUNDED FOLLOWING"),
        }
    }
}

/// Row range a window call aggregates over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowFrame {
    /// Offset units
    pub units: FrameUnits,
    /// Frame start
    pub start: FrameBound,
    /// Frame end
    pub end: FrameBound,
}

impl WindowFrame {
    /// The whole partition
    pub fn whole_partition() -> Self {
        Self {
            units: FrameUnits::Rows,
            start: FrameBound::UnboundedPreceding,
            end: FrameBound::UnboundedFollowing,
        }
    }

    /// Running frame: partition start through the current row and its peers
    pub fn running() -> Self {
        Self {
            units: FrameUnits::Range,
            start: FrameBound::UnboundedPreceding,
            end: FrameBound::CurrentRow,
        }
    }

    /// Physical row frame
    pub fn rows(start: FrameBound, end: FrameBound) -> Self {
        Self {
            units: FrameUnits::Rows,
            start,
            end,
        }
    }

    /// Default frame: running when ordered, whole partition otherwise
    pub fn default_for(ordered: bool) -> Self {
        if ordered {
            Self::running()
        } else {
            Self::whole_partition()
        }
    }

    pub(crate) fn validate(&self) -> PlanResult<()> {
        if matches!(self.start, FrameBound::UnboundedFollowing)
            || matches!(self.end, FrameBound::UnboundedPreceding)
            || self.start.rank() > self.end.rank()
        {
            return Err(PlanError::shape(
                "window frame",
                format!("frame start {} is after frame end {}", self.start, self.end),
            ));
        }
        if self.units == FrameUnits::Range
            && [self.start, self.end]
                .iter()
                .any(|b| matches!(b, FrameBound::Preceding(_) | FrameBound::Following(_)))
        {
            return Err(PlanError::shape(
                "window frame",
                "RANGE frames only support UNBOUNDED and CURRENT ROW bounds",
            ));
        }
        Ok(())
    }
}

impl std::fmt::Display for WindowFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let units = match self.units {
            FrameUnits::Rows => "ROWS",
            FrameUnits::Range => "RANGE",
        };
        write!(f, "{units} BETWEEN {} AND {}", self.start, self.end)
    }
}
