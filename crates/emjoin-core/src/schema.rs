//! Logical schema types. Pure data; no storage layout here.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Boolean,
    Int32,
    Int64,
    Float32,
    Float64,
    Utf8,
    Binary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, idx: usize) -> Option<&Field> {
        self.fields.get(idx)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Resolve a column name to its position, failing with a schema error.
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.index_of(name).ok_or_else(|| {
            let known: Vec<&str> = self.fields.iter().map(|f| f.name.as_str()).collect();
            Error::Schema(format!("column '{name}' not found (have: {})", known.join(", ")))
        })
    }

    /// Output schema of a join: left columns followed by right columns.
    ///
    /// Right columns whose name already exists on the left get a `_right` suffix.
    pub fn join(&self, right: &Schema) -> Schema {
        let mut fields = Vec::with_capacity(self.fields.len() + right.fields.len());
        fields.extend(self.fields.iter().cloned());

        for field in &right.fields {
            let mut new_field = field.clone();
            if self.fields.iter().any(|f| f.name == field.name) {
                new_field.name = format!("{}_right", field.name);
            }
            fields.push(new_field);
        }

        Schema { fields }
    }
}
