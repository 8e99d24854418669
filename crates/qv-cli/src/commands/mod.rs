//! CLI command implementations

pub(crate) mod check;
pub(crate) mod common;
pub(crate) mod optimize;
pub(crate) mod rules;
pub(crate) mod run;
