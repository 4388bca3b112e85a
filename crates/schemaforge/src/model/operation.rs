//! Operations built from stored routines.

use serde::{Deserialize, Serialize};

use crate::core::attributes::Attributes;
use crate::core::schema::RoutineKind;
use crate::core::value::ClrType;
use crate::naming::NamingConvention;

use super::{Domain, Parameter, TypeKey};

/// Name parts marking a routine that writes.
const CHANGES_DATA_PARTS: &[&str] = &[
    "insert", "update", "delete", "upsert", "save", "create", "add", "remove", "set",
];

/// Name parts marking a routine that inserts.
const CREATES_NEW_PARTS: &[&str] = &["insert", "create", "add"];

/// What an operation returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnKind {
    #[default]
    None,
    Primitive,
    ApplicationType,
    CustomType,
}

/// The resolved return shape.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OperationReturn {
    pub kind: ReturnKind,

    /// Value type for primitive returns.
    #[serde(default)]
    pub clr_type: Option<ClrType>,

    /// Application type or result type for row returns.
    #[serde(default)]
    pub type_key: Option<TypeKey>,

    /// A list rather than a single value or row.
    #[serde(default)]
    pub multiple: bool,
}

impl OperationReturn {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn primitive(clr_type: Option<ClrType>, multiple: bool) -> Self {
        Self {
            kind: ReturnKind::Primitive,
            clr_type,
            type_key: None,
            multiple,
        }
    }

    pub fn application_type(key: TypeKey, multiple: bool) -> Self {
        Self {
            kind: ReturnKind::ApplicationType,
            clr_type: None,
            type_key: Some(key),
            multiple,
        }
    }

    pub fn custom_type(key: TypeKey, multiple: bool) -> Self {
        Self {
            kind: ReturnKind::CustomType,
            clr_type: None,
            type_key: Some(key),
            multiple,
        }
    }

    /// Missing the type a non-void return needs.
    pub fn is_incomplete(&self) -> bool {
        match self.kind {
            ReturnKind::None => false,
            ReturnKind::Primitive => self.clr_type.is_none(),
            ReturnKind::ApplicationType | ReturnKind::CustomType => self.type_key.is_none(),
        }
    }
}

/// One stored routine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub name: String,
    pub namespace: String,

    /// Provider identity of this overload.
    #[serde(default)]
    pub specific_name: String,

    pub kind: RoutineKind,

    pub parameters: Vec<Parameter>,

    #[serde(default)]
    pub returns: OperationReturn,

    #[serde(default)]
    pub attributes: Option<Attributes>,

    #[serde(default)]
    pub related_type: Option<TypeKey>,
}

impl Operation {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, kind: RoutineKind) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            specific_name: String::new(),
            kind,
            parameters: Vec::new(),
            returns: OperationReturn::none(),
            attributes: None,
            related_type: None,
        }
    }

    pub fn key(&self) -> TypeKey {
        TypeKey::new(&self.namespace, &self.name)
    }

    /// The `name` attribute if present, else the routine name.
    pub fn custom_name(&self) -> &str {
        self.attributes
            .as_ref()
            .and_then(Attributes::custom_name)
            .unwrap_or(&self.name)
    }

    /// Native parameter types in order, for DROP signatures.
    pub fn parameter_types(&self) -> Vec<String> {
        self.parameters.iter().map(|p| p.native_type.clone()).collect()
    }

    fn has_name_part(&self, conv: &dyn NamingConvention, parts: &[&str]) -> bool {
        conv.lower_parts(&self.name)
            .iter()
            .any(|p| parts.contains(&p.as_str()))
    }

    pub fn changes_data(&self, conv: &dyn NamingConvention) -> bool {
        self.attributes
            .as_ref()
            .and_then(Attributes::changes_data)
            .unwrap_or_else(|| self.has_name_part(conv, CHANGES_DATA_PARTS))
    }

    pub fn creates_new(&self, conv: &dyn NamingConvention) -> bool {
        self.attributes
            .as_ref()
            .and_then(Attributes::creates_new)
            .unwrap_or_else(|| self.has_name_part(conv, CREATES_NEW_PARTS))
    }

    /// Emitted by this tool on an earlier run.
    pub fn is_generated(&self) -> bool {
        self.attributes.as_ref().is_some_and(Attributes::generated)
    }

    pub fn single_result(&self) -> bool {
        self.attributes.as_ref().is_some_and(Attributes::single_result)
    }

    /// Reads one row of the related type by its key: the parameters are
    /// exactly the key fields plus the optional security-user parameter, and
    /// the return is the related type.
    pub fn is_select_by_id(&self, domain: &Domain) -> bool {
        let conv = domain.naming_convention();
        let Some(related_key) = &self.related_type else {
            return false;
        };
        if self.returns.kind != ReturnKind::ApplicationType
            || self.returns.type_key.as_ref() != Some(related_key)
            || self.changes_data(conv)
        {
            return false;
        }
        let Some(related) = domain.find_type(related_key) else {
            return false;
        };

        let key_names: Vec<&str> = related
            .fields
            .iter()
            .filter(|f| f.is_key)
            .map(|f| f.name.as_str())
            .collect();
        if key_names.is_empty() {
            return false;
        }

        let mut matched = Vec::new();
        for p in &self.parameters {
            if p.is_security_user(domain) {
                continue;
            }
            match p.related_type_field.as_deref() {
                Some(field) if key_names.contains(&field) && !matched.contains(&field) => {
                    matched.push(field)
                }
                _ => return false,
            }
        }
        matched.len() == key_names.len()
    }
}
