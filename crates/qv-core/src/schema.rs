//! Relation schemas: ordered, uniquely named, typed columns

use crate::error::{CoreError, CoreResult};
use crate::types::{DataType, Nullability};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A named, typed column
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    /// Column name
    pub name: String,
    /// Column type
    pub data_type: DataType,
    /// Whether the column may hold nulls
    #[serde(default = "default_nullable")]
    pub nullability: Nullability,
}

fn default_nullable() -> Nullability {
    Nullability::Nullable
}

impl Field {
    /// Create a field
    pub fn new(name: impl Into<String>, data_type: DataType, nullability: Nullability) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullability,
        }
    }

    /// Create a nullable field
    pub fn nullable(name: impl Into<String>, data_type: DataType) -> Self {
        Self::new(name, data_type, Nullability::Nullable)
    }

    /// Create a non-nullable field
    pub fn not_null(name: impl Into<String>, data_type: DataType) -> Self {
        Self::new(name, data_type, Nullability::NotNull)
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} {}", self.name, self.data_type, self.nullability)
    }
}

/// Ordered mapping from unique column names to field types.
///
/// Invariants: at least one column, no duplicate names, in-range decimal
/// parameters. All are checked by [`Schema::try_new`] and on deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<Field>", into = "Vec<Field>")]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    /// Build a schema, rejecting empty field lists and duplicate names
    pub fn try_new(fields: Vec<Field>) -> CoreResult<Self> {
        if fields.is_empty() {
            return Err(CoreError::EmptySchema);
        }
        let mut seen = HashMap::with_capacity(fields.len());
        for (i, field) in fields.iter().enumerate() {
            if field.name.is_empty() {
                return Err(CoreError::EmptyName {
                    context: format!("column {i}"),
                });
            }
            if seen.insert(field.name.as_str(), i).is_some() {
                return Err(CoreError::DuplicateColumn {
                    name: field.name.clone(),
                });
            }
            field.data_type.validate()?;
        }
        Ok(Self { fields })
    }

    /// Columns in order
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Position of a field by name
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Field at a position
    pub fn field_at(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    /// Column names in order
    pub fn column_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Whether a column with this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// Copy of this schema with every column marked nullable
    pub fn to_nullable(&self) -> Schema {
        Schema {
            fields: self
                .fields
                .iter()
                .map(|f| Field::nullable(f.name.clone(), f.data_type.clone()))
                .collect(),
        }
    }

    /// Sub-schema made of the named columns, in the order given
    pub fn project(&self, names: &[&str]) -> CoreResult<Schema> {
        let fields = names
            .iter()
            .map(|n| {
                self.field(n).cloned().ok_or_else(|| CoreError::ColumnNotFound {
                    name: n.to_string(),
                })
            })
            .collect::<CoreResult<Vec<_>>>()?;
        Schema::try_new(fields)
    }

    /// Whether `other` can replace this schema in a rewrite.
    ///
    /// Names, order and types must match exactly. Nullability may narrow
    /// (nullable to not-null) but never widen.
    pub fn is_preserved_by(&self, other: &Schema) -> bool {
        self.fields.len() == other.fields.len()
            && self.fields.iter().zip(other.fields.iter()).all(|(a, b)| {
                a.name == b.name
                    && a.data_type == b.data_type
                    && (a.nullability.is_nullable() || !b.nullability.is_nullable())
            })
    }
}

impl TryFrom<Vec<Field>> for Schema {
    type Error = CoreError;

    fn try_from(fields: Vec<Field>) -> Result<Self, Self::Error> {
        Schema::try_new(fields)
    }
}

impl From<Schema> for Vec<Field> {
    fn from(schema: Schema) -> Self {
        schema.fields
    }
}

impl std::fmt::Display for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.fields.iter().map(|c| c.to_string()).collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

#[cfg(test)]
#[path = "schema_test.rs"]
mod tests;
