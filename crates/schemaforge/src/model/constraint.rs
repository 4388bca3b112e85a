use serde::{Deserialize, Serialize};

use crate::core::schema::KeyKind;

/// A primary key or unique constraint: name plus ordered field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    pub name: String,
    pub kind: KeyKind,
    pub fields: Vec<String>,
}

impl Constraint {
    pub fn new(name: impl Into<String>, kind: KeyKind, fields: Vec<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            fields,
        }
    }

    pub fn is_primary_key(&self) -> bool {
        self.kind == KeyKind::Primary
    }

    pub fn is_unique(&self) -> bool {
        self.kind == KeyKind::Unique
    }
}
