//! Shared test utilities for qv-backend

use crate::compile::compile;
use crate::memory::MemoryBackend;
use crate::result::{ResultSet, Row};
use crate::traits::Executor;
use qv_core::ScalarValue;
use qv_plan::test_utils::int_schema;
use qv_plan::Rel;

/// Rows of BIGINT values
pub fn int_rows(rows: &[&[i64]]) -> Vec<Row> {
    rows.iter()
        .map(|r| r.iter().map(|v| ScalarValue::Integer(*v)).collect())
        .collect()
}

/// Register a table of non-null BIGINT columns
pub fn register_ints(backend: &MemoryBackend, name: &str, columns: &[&str], rows: &[&[i64]]) {
    backend
        .register_table(name, int_schema(columns), int_rows(rows))
        .unwrap();
}

/// Compile and execute on `backend`, panicking on failure
pub async fn run(backend: &MemoryBackend, plan: &Rel) -> ResultSet {
    let compiled = compile(backend, plan).unwrap();
    backend.execute(&compiled).await.unwrap()
}

/// Integer payloads of every row, with NULL as `None`
pub fn int_values(result: &ResultSet) -> Vec<Vec<Option<i64>>> {
    result
        .rows()
        .iter()
        .map(|r| r.iter().map(ScalarValue::as_i64).collect())
        .collect()
}
