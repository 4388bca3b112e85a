//! Table-backed application types.

use serde::{Deserialize, Serialize};

use crate::core::attributes::Attributes;
use crate::error::{Result, SchemaError};
use crate::naming::NamingConvention;

use super::{Constraint, Field, TypeKey};

/// How rows of a type are removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteType {
    None,
    Soft,
    Hard,
}

impl DeleteType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" => Some(DeleteType::None),
            "soft" => Some(DeleteType::Soft),
            "hard" => Some(DeleteType::Hard),
            _ => None,
        }
    }
}

/// One table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationType {
    pub name: String,
    pub namespace: String,

    /// Fields in ordinal order.
    pub fields: Vec<Field>,

    /// Primary key and unique constraints.
    #[serde(default)]
    pub constraints: Vec<Constraint>,

    #[serde(default)]
    pub attributes: Option<Attributes>,
}

impl ApplicationType {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            fields: Vec::new(),
            constraints: Vec::new(),
            attributes: None,
        }
    }

    pub fn key(&self) -> TypeKey {
        TypeKey::new(&self.namespace, &self.name)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.name == name)
    }

    pub fn key_fields(&self) -> Vec<&Field> {
        self.fields.iter().filter(|f| f.is_key).collect()
    }

    /// The single key field.
    ///
    /// # Errors
    ///
    /// `CompositeKey` when more than one field is marked key. A type with no
    /// key at all is a `Config` error naming the type.
    pub fn key_field(&self) -> Result<&Field> {
        let keys = self.key_fields();
        match keys.as_slice() {
            [single] => Ok(*single),
            [] => Err(SchemaError::Config(format!(
                "Type {} has no primary key",
                self.key()
            ))),
            _ => Err(SchemaError::CompositeKey(self.key().to_string())),
        }
    }

    pub fn unique_constraints(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter().filter(|c| c.is_unique())
    }

    pub fn primary_key(&self) -> Option<&Constraint> {
        self.constraints.iter().find(|c| c.is_primary_key())
    }

    fn attr_flag(&self, read: impl Fn(&Attributes) -> bool) -> bool {
        self.attributes.as_ref().is_some_and(read)
    }

    // ===== Derived flags =====

    /// Holds the application's users.
    pub fn is_security_principal(&self) -> bool {
        self.attr_flag(Attributes::security_principal)
    }

    pub fn is_reference_data(&self) -> bool {
        self.attr_flag(Attributes::reference_data)
    }

    /// A many-to-many join: exactly two foreign keys, every other field
    /// system-managed.
    pub fn is_link_table(&self, conv: &dyn NamingConvention) -> bool {
        let fk_count = self.fields.iter().filter(|f| f.has_reference_type()).count();
        fk_count == 2
            && self
                .fields
                .iter()
                .filter(|f| !f.has_reference_type())
                .all(|f| f.is_system_managed(conv))
    }

    /// Carries file content.
    pub fn is_attachment(&self) -> bool {
        self.fields.iter().any(Field::is_file)
    }

    /// List operations page their results unless this is reference data.
    pub fn is_paginated(&self) -> bool {
        self.attributes
            .as_ref()
            .and_then(Attributes::paginated)
            .unwrap_or(!self.is_reference_data())
    }

    pub fn soft_delete_field(&self, conv: &dyn NamingConvention) -> Option<&Field> {
        self.fields.iter().find(|f| f.is_soft_delete(conv))
    }

    pub fn delete_type(&self, conv: &dyn NamingConvention) -> DeleteType {
        if let Some(explicit) = self
            .attributes
            .as_ref()
            .and_then(Attributes::delete)
            .and_then(DeleteType::parse)
        {
            return explicit;
        }
        if self.soft_delete_field(conv).is_some() {
            DeleteType::Soft
        } else {
            DeleteType::Hard
        }
    }

    pub fn display_fields(&self) -> Vec<&Field> {
        self.fields.iter().filter(|f| f.is_display()).collect()
    }

    /// The field shown as a row's label: the one marked `display`, else a
    /// field named `name` or `title`.
    pub fn display_field(&self, conv: &dyn NamingConvention) -> Option<&Field> {
        self.fields.iter().find(|f| f.is_display()).or_else(|| {
            self.fields.iter().find(|f| {
                matches!(
                    conv.lower_parts(&f.name).as_slice(),
                    [only] if only == "name" || only == "title"
                )
            })
        })
    }

    pub fn created_by_field(&self, conv: &dyn NamingConvention) -> Option<&Field> {
        self.fields.iter().find(|f| f.is_tracking_created_by_user(conv))
    }
}
