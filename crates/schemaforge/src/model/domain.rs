//! The domain aggregate and its cross-cutting queries.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::attributes::Attributes;
use crate::core::traits::{Dialect, ProviderKind};
use crate::dialect::normalize_native_type;
use crate::drivers::DialectImpl;
use crate::error::{Result, SchemaError};
use crate::naming::{NamingConvention, NamingStyle};

use super::{
    ApplicationType, Field, FieldReference, Operation, ResultType, ReturnKind, TypeKey,
};

/// Separator of the "related entity" heuristic: `customer_select_by_x` is
/// about `customer`.
const SELECT_MARKER: &str = "_select_";

/// Every application type, operation and result type read from one database.
///
/// Built once per run by the type provider, then read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub default_namespace: String,
    pub provider: ProviderKind,
    pub naming: NamingStyle,
    pub types: Vec<ApplicationType>,
    pub operations: Vec<Operation>,
    pub result_types: Vec<ResultType>,
}

impl Domain {
    pub fn new(
        provider: ProviderKind,
        naming: NamingStyle,
        default_namespace: impl Into<String>,
    ) -> Self {
        Self {
            default_namespace: default_namespace.into(),
            provider,
            naming,
            types: Vec::new(),
            operations: Vec::new(),
            result_types: Vec::new(),
        }
    }

    pub fn naming_convention(&self) -> &'static dyn NamingConvention {
        self.naming.convention()
    }

    pub fn dialect(&self) -> DialectImpl {
        DialectImpl::for_provider(self.provider)
    }

    fn key_matches(&self, dialect: &DialectImpl, a: &TypeKey, b: &TypeKey) -> bool {
        dialect.names_equal(&a.namespace, &b.namespace) && dialect.names_equal(&a.name, &b.name)
    }

    // ===== Lookups =====

    pub fn find_type(&self, key: &TypeKey) -> Option<&ApplicationType> {
        let dialect = self.dialect();
        self.types
            .iter()
            .find(|t| self.key_matches(&dialect, &t.key(), key))
    }

    pub fn find_type_mut(&mut self, key: &TypeKey) -> Option<&mut ApplicationType> {
        let dialect = self.dialect();
        self.types.iter_mut().find(|t| {
            dialect.names_equal(&t.namespace, &key.namespace) && dialect.names_equal(&t.name, &key.name)
        })
    }

    pub fn find_result_type(&self, key: &TypeKey) -> Option<&ResultType> {
        let dialect = self.dialect();
        self.result_types
            .iter()
            .find(|r| self.key_matches(&dialect, &r.key(), key))
    }

    pub fn find_result_type_mut(&mut self, key: &TypeKey) -> Option<&mut ResultType> {
        let dialect = self.dialect();
        self.result_types.iter_mut().find(|r| {
            dialect.names_equal(&r.namespace, &key.namespace) && dialect.names_equal(&r.name, &key.name)
        })
    }

    /// All overloads sharing a namespace and name.
    pub fn find_operations(&self, key: &TypeKey) -> Vec<&Operation> {
        let dialect = self.dialect();
        self.operations
            .iter()
            .filter(|o| self.key_matches(&dialect, &o.key(), key))
            .collect()
    }

    pub fn find_field(&self, reference: &FieldReference) -> Option<&Field> {
        self.find_type(&reference.type_key)?.field(&reference.field)
    }

    // ===== Type-by-fields matching =====

    /// Find the application type whose fields have exactly the shape of
    /// `fields`.
    ///
    /// Candidates, in order: the operation's related type name in the
    /// operation's namespace, then the part of the operation name before the
    /// first `_select_`. Fields excluded from results are ignored on both
    /// sides. A match needs the same count and, for every given field, exactly
    /// one candidate field with the same name and native type.
    pub fn find_type_by_fields(
        &self,
        fields: &[Field],
        operation: &Operation,
        case_sensitive: bool,
    ) -> Option<TypeKey> {
        let conv = self.naming_convention();
        let wanted: Vec<&Field> = fields
            .iter()
            .filter(|f| !f.is_excluded_from_results(conv))
            .collect();

        let mut candidates = Vec::new();
        if let Some(related) = &operation.related_type {
            candidates.push(TypeKey::new(&operation.namespace, &related.name));
        }
        if let Some(idx) = operation.name.find(SELECT_MARKER) {
            candidates.push(TypeKey::new(&operation.namespace, &operation.name[..idx]));
        }

        for candidate in candidates {
            let Some(t) = self.find_type(&candidate) else {
                continue;
            };
            if fields_match(t, &wanted, conv, case_sensitive) {
                debug!(
                    "Operation {} returns the shape of {}",
                    operation.key(),
                    t.key()
                );
                return Some(t.key());
            }
        }
        None
    }

    // ===== Metadata back-fill =====

    /// Copy field metadata from an application type onto a result type.
    ///
    /// For every result field with a same-named source field: size, key,
    /// required, computed and reference are copied; the value type is widened
    /// to the source's when it is the source's non-nullable form (never
    /// narrowed); attribute bags merge with the result field's own keys
    /// winning.
    pub fn update_result_field_properties_from_application_type(
        &mut self,
        result: &TypeKey,
        source: &TypeKey,
    ) {
        let Some(source_type) = self.find_type(source).cloned() else {
            warn!("Related type {} not found for result type {}", source, result);
            return;
        };
        let dialect = self.dialect();
        let Some(result_type) = self.find_result_type_mut(result) else {
            warn!("Result type {} not found", result);
            return;
        };

        for field in result_type.fields.iter_mut() {
            if let Some(src) = source_type
                .fields
                .iter()
                .find(|s| dialect.names_equal(&s.name, &field.name))
            {
                field.size = src.size;
                field.is_key = src.is_key;
                field.is_required = src.is_required;
                field.is_computed = src.is_computed;
                field.references = src.references.clone();

                if let (Some(own), Some(theirs)) = (field.clr_type, src.clr_type) {
                    if own == theirs.non_nullable() {
                        field.clr_type = Some(theirs);
                    }
                }

                field.attributes =
                    Attributes::merged(src.attributes.as_ref(), field.attributes.as_ref());
            }

            if field.clr_type.is_none() {
                warn!(
                    "Result field {}.{} has no value type (native type '{}')",
                    result, field.name, field.native_type
                );
            }
        }
    }

    // ===== Consistency =====

    /// Check that every reference points into this domain.
    ///
    /// Returns one message per dangling reference; empty means consistent.
    pub fn validate_references(&self) -> Vec<String> {
        let mut problems = Vec::new();

        for t in &self.types {
            for f in &t.fields {
                if let Some(reference) = &f.references {
                    if self.find_field(reference).is_none() {
                        problems.push(format!(
                            "Field {}.{} references missing {}.{}",
                            t.key(),
                            f.name,
                            reference.type_key,
                            reference.field
                        ));
                    }
                }
            }
        }

        for r in &self.result_types {
            if let Some(related) = &r.related_type {
                if self.find_type(related).is_none() {
                    problems.push(format!(
                        "Result type {} relates to missing type {}",
                        r.key(),
                        related
                    ));
                }
            }
        }

        for op in &self.operations {
            if let Some(related) = &op.related_type {
                if self.find_type(related).is_none() {
                    problems.push(format!(
                        "Operation {} relates to missing type {}",
                        op.key(),
                        related
                    ));
                }
            }

            if let Some(key) = &op.returns.type_key {
                let present = match op.returns.kind {
                    ReturnKind::ApplicationType => self.find_type(key).is_some(),
                    ReturnKind::CustomType => self.find_result_type(key).is_some(),
                    _ => true,
                };
                if !present {
                    problems.push(format!("Operation {} returns missing type {}", op.key(), key));
                }
            }

            for p in &op.parameters {
                if let Some(key) = &p.result_type {
                    if self.find_result_type(key).is_none() {
                        problems.push(format!(
                            "Parameter {} of {} carries missing result type {}",
                            p.name,
                            op.key(),
                            key
                        ));
                    }
                }
            }
        }

        problems
    }

    /// The recoverable inconsistencies generation can live with.
    ///
    /// Returned rather than logged; [`inspect`](crate::TypeProvider::inspect)
    /// reports them.
    pub fn sanity_check(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        for t in &self.types {
            if t.namespace.is_empty() {
                warnings.push(format!("Type {} has no namespace", t.name));
            }
            if t.fields.is_empty() {
                warnings.push(format!("Type {} has no fields", t.key()));
            }
            if t.fields.iter().any(|f| f.name.trim().is_empty()) {
                warnings.push(format!("Type {} has a field with an empty name", t.key()));
            }
            if t.display_fields().len() > 1 {
                warnings.push(format!("Type {} has more than one display field", t.key()));
            }
        }

        for r in &self.result_types {
            if r.fields.is_empty() {
                warnings.push(format!("Result type {} has no fields", r.key()));
            }
        }

        for op in &self.operations {
            if op.namespace.is_empty() {
                warnings.push(format!("Operation {} has no namespace", op.name));
            }
            if op.returns.is_incomplete() {
                warnings.push(format!("Operation {} has no return type information", op.key()));
            }
        }

        warnings
    }

    /// The types to generate, narrowed by the single-type filter.
    ///
    /// # Errors
    ///
    /// `TypeFilter` when the filter names no type in the domain.
    pub fn types_for_generation(&self, filter: Option<&str>) -> Result<Vec<&ApplicationType>> {
        let Some(name) = filter else {
            return Ok(self.types.iter().collect());
        };
        let dialect = self.dialect();
        let selected: Vec<&ApplicationType> = self
            .types
            .iter()
            .filter(|t| dialect.names_equal(&t.name, name) || t.key().to_string() == name)
            .collect();
        if selected.is_empty() {
            return Err(SchemaError::TypeFilter(name.to_string()));
        }
        Ok(selected)
    }

    // ===== Security =====

    /// The security principal type.
    pub fn user_type(&self) -> Option<&ApplicationType> {
        self.types.iter().find(|t| t.is_security_principal())
    }

    /// The security principal's key field.
    ///
    /// # Errors
    ///
    /// `CompositeKey` when the user type has a composite key.
    pub fn user_identity_field(&self) -> Result<Option<&Field>> {
        match self.user_type() {
            Some(t) => t.key_field().map(Some),
            None => Ok(None),
        }
    }
}

fn fields_match(
    candidate: &ApplicationType,
    wanted: &[&Field],
    conv: &dyn NamingConvention,
    case_sensitive: bool,
) -> bool {
    let available: Vec<&Field> = candidate
        .fields
        .iter()
        .filter(|f| !f.is_excluded_from_results(conv))
        .collect();
    if available.len() != wanted.len() {
        return false;
    }

    wanted.iter().all(|w| {
        let native = normalize_native_type(&w.native_type);
        available
            .iter()
            .filter(|f| {
                let same_name = if case_sensitive {
                    f.name == w.name
                } else {
                    f.name.eq_ignore_ascii_case(&w.name)
                };
                same_name && normalize_native_type(&f.native_type) == native
            })
            .count()
            == 1
    })
}
