//! Strongly-typed identifiers for sources and functions.

use crate::newtype_string::define_newtype_string;

define_newtype_string! {
    /// Name of an external relation wrapped by a source node.
    pub struct SourceName;
}

define_newtype_string! {
    /// Name under which a scalar, aggregate or window function is registered.
    pub struct FunctionName;
}

#[cfg(test)]
#[path = "names_test.rs"]
mod tests;
