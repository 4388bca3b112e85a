//! Fields of application types and result types.
//!
//! The stored attributes come straight from catalog metadata. The derived
//! classifications (tracking fields, soft delete, file, large text...) are
//! computed on demand from the name, the value kind and the attribute bag;
//! the naming convention is passed in because role names differ in casing
//! between conventions.

use serde::{Deserialize, Serialize};

use crate::core::attributes::Attributes;
use crate::core::value::{ClrType, ValueKind};
use crate::dialect::{is_row_version, normalize_native_type};
use crate::naming::NamingConvention;

use super::TypeKey;

/// Strings longer than this are treated as large text.
pub const LARGE_TEXT_THRESHOLD: i32 = 1000;

/// The target of a foreign-key field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldReference {
    /// The referenced application type.
    pub type_key: TypeKey,

    /// The referenced field on that type.
    pub field: String,
}

/// One column of an application type or result type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,

    /// Ordinal position (1-based).
    pub order: i32,

    /// Native provider type name.
    pub native_type: String,

    /// Mapped value type, already adjusted for nullability. `None` when the
    /// native type is not recognised.
    pub clr_type: Option<ClrType>,

    /// Database-enforced NOT NULL.
    pub is_required: bool,

    #[serde(default)]
    pub size: Option<i32>,

    #[serde(default)]
    pub precision: Option<i32>,

    #[serde(default)]
    pub scale: Option<i32>,

    #[serde(default)]
    pub is_key: bool,

    /// Identity, serial or sequence/uuid default.
    #[serde(default)]
    pub is_generated: bool,

    #[serde(default)]
    pub is_computed: bool,

    #[serde(default)]
    pub default_value: Option<String>,

    #[serde(default)]
    pub references: Option<FieldReference>,

    #[serde(default)]
    pub attributes: Option<Attributes>,
}

impl Field {
    /// A nullable, unflagged field. The loader fills in the rest.
    pub fn new(name: impl Into<String>, order: i32, native_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            order,
            native_type: native_type.into(),
            clr_type: None,
            is_required: false,
            size: None,
            precision: None,
            scale: None,
            is_key: false,
            is_generated: false,
            is_computed: false,
            default_value: None,
            references: None,
            attributes: None,
        }
    }

    pub fn is_nullable(&self) -> bool {
        !self.is_required
    }

    /// Set nullability, keeping the modelled type consistent with it.
    pub fn set_required(&mut self, required: bool) {
        self.is_required = required;
        self.clr_type = self.clr_type.map(|t| t.with_nullability(!required));
    }

    pub fn value_kind(&self) -> Option<ValueKind> {
        self.clr_type.map(|t| t.kind)
    }

    fn kind_is(&self, test: impl Fn(ValueKind) -> bool) -> bool {
        self.clr_type.is_some_and(|t| !t.array && test(t.kind))
    }

    pub fn has_reference_type(&self) -> bool {
        self.references.is_some()
    }

    fn attr_flag(&self, read: impl Fn(&Attributes) -> bool) -> bool {
        self.attributes.as_ref().is_some_and(read)
    }

    fn last_part(&self, conv: &dyn NamingConvention) -> Option<String> {
        conv.lower_parts(&self.name).pop()
    }

    // ===== Tracking fields =====

    pub fn is_tracking_created_timestamp(&self, conv: &dyn NamingConvention) -> bool {
        self.kind_is(ValueKind::is_date_time) && conv.is_created_timestamp_field(&self.name)
    }

    pub fn is_tracking_modified_timestamp(&self, conv: &dyn NamingConvention) -> bool {
        self.kind_is(ValueKind::is_date_time) && conv.is_modified_timestamp_field(&self.name)
    }

    pub fn is_tracking_created_by_user(&self, conv: &dyn NamingConvention) -> bool {
        conv.is_created_by_field(&self.name)
    }

    pub fn is_tracking_modified_by_user(&self, conv: &dyn NamingConvention) -> bool {
        conv.is_modified_by_field(&self.name)
    }

    /// Records which user created or last changed the row.
    pub fn is_tracking_user(&self, conv: &dyn NamingConvention) -> bool {
        self.is_tracking_created_by_user(conv) || self.is_tracking_modified_by_user(conv)
    }

    pub fn is_tracking_timestamp(&self, conv: &dyn NamingConvention) -> bool {
        self.is_tracking_created_timestamp(conv) || self.is_tracking_modified_timestamp(conv)
    }

    pub fn is_soft_delete(&self, conv: &dyn NamingConvention) -> bool {
        self.kind_is(|k| k == ValueKind::Boolean || k.is_date_time())
            && conv.is_soft_delete_field(&self.name)
    }

    // ===== Content classification =====

    pub fn is_search_vector(&self) -> bool {
        normalize_native_type(&self.native_type) == "tsvector"
            || self.attr_flag(Attributes::search_vector)
    }

    pub fn is_row_version(&self) -> bool {
        self.kind_is(|k| k == ValueKind::Binary) && is_row_version(&self.native_type)
    }

    /// Binary content (not a row-version stamp).
    pub fn is_file(&self) -> bool {
        self.kind_is(|k| k == ValueKind::Binary) && !is_row_version(&self.native_type)
    }

    pub fn is_large_text(&self) -> bool {
        self.kind_is(|k| k == ValueKind::String)
            && !self.is_search_vector()
            && self.size.map_or(true, |s| s > LARGE_TEXT_THRESHOLD)
    }

    pub fn is_rating(&self, conv: &dyn NamingConvention) -> bool {
        self.kind_is(ValueKind::is_integer)
            && self.last_part(conv).as_deref() == Some("rating")
    }

    pub fn is_color(&self, conv: &dyn NamingConvention) -> bool {
        self.kind_is(|k| k == ValueKind::String)
            && matches!(self.last_part(conv).as_deref(), Some("color" | "colour"))
    }

    pub fn is_display(&self) -> bool {
        self.attr_flag(Attributes::display)
    }

    /// Suppressed from display projections.
    pub fn is_excluded_from_results(&self, conv: &dyn NamingConvention) -> bool {
        self.is_soft_delete(conv) || self.is_search_vector()
    }

    // ===== Who supplies the value =====

    /// Key assigned by the database: generated integer or GUID key.
    pub fn is_auto_assigned_identity(&self) -> bool {
        self.is_key
            && self.is_generated
            && self.kind_is(|k| k.is_integer() || k == ValueKind::Guid)
    }

    /// Maintained by the database or the generated SQL rather than the caller.
    pub fn is_system_managed(&self, conv: &dyn NamingConvention) -> bool {
        self.is_generated
            || self.is_computed
            || self.is_row_version()
            || self.is_search_vector()
            || self.is_tracking_timestamp(conv)
            || self.is_tracking_user(conv)
            || self.is_soft_delete(conv)
    }

    /// The caller supplies this value on insert.
    pub fn is_caller_provided(&self, conv: &dyn NamingConvention) -> bool {
        !self.is_system_managed(conv)
    }

    /// Editable after insert.
    pub fn is_user_editable(&self, conv: &dyn NamingConvention) -> bool {
        self.is_caller_provided(conv) && !self.is_key
    }
}
