use serde::{Deserialize, Serialize};

use crate::core::attributes::Attributes;

use super::{Field, TypeKey};

/// A shape not backed by a table: a database composite / table type, or one
/// synthesized for a routine's projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultType {
    pub name: String,
    pub namespace: String,

    /// The application type this shape is about.
    #[serde(default)]
    pub related_type: Option<TypeKey>,

    /// Exists in the database as a user-defined type. False for shapes
    /// synthesized from routine output columns.
    pub is_custom_type: bool,

    pub fields: Vec<Field>,

    /// Operations returning or accepting this shape.
    #[serde(default)]
    pub operations: Vec<TypeKey>,

    #[serde(default)]
    pub attributes: Option<Attributes>,
}

impl ResultType {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, is_custom_type: bool) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            related_type: None,
            is_custom_type,
            fields: Vec::new(),
            operations: Vec::new(),
            attributes: None,
        }
    }

    pub fn key(&self) -> TypeKey {
        TypeKey::new(&self.namespace, &self.name)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Emitted by this tool on an earlier run.
    pub fn is_generated(&self) -> bool {
        self.attributes.as_ref().is_some_and(Attributes::generated)
    }

    /// Record an operation as a user of this shape. Repeated calls for the
    /// same operation are no-ops.
    pub fn add_operation(&mut self, operation: TypeKey) {
        if !self.operations.contains(&operation) {
            self.operations.push(operation);
        }
    }
}
