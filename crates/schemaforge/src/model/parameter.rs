use serde::{Deserialize, Serialize};

use crate::core::value::ClrType;
use crate::naming::NamingConvention;

use super::{Domain, Field, TypeKey};

/// One input of an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,

    /// Declaration order (1-based).
    pub order: i32,

    pub native_type: String,

    /// Mapped value type. `ResultType` marker kind for composite parameters.
    pub clr_type: Option<ClrType>,

    pub is_required: bool,

    #[serde(default)]
    pub has_default: bool,

    #[serde(default)]
    pub size: Option<i32>,

    /// The related type's field this parameter was matched to.
    #[serde(default)]
    pub related_type_field: Option<String>,

    /// The result type a composite parameter carries.
    #[serde(default)]
    pub result_type: Option<TypeKey>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, order: i32, native_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            order,
            native_type: native_type.into(),
            clr_type: None,
            is_required: true,
            has_default: false,
            size: None,
            related_type_field: None,
            result_type: None,
        }
    }

    pub fn is_result_type(&self) -> bool {
        self.clr_type.is_some_and(|t| t.is_result_type())
    }

    /// Named like the calling user's id.
    pub fn is_current_user(&self, conv: &dyn NamingConvention) -> bool {
        conv.is_security_user_id_parameter(&self.name)
    }

    /// Carries the calling user's id: named by convention and type-compatible
    /// with the user type's key. Without a user type the name decides.
    pub fn is_security_user(&self, domain: &Domain) -> bool {
        if !self.is_current_user(domain.naming_convention()) {
            return false;
        }
        match (domain.user_identity_field().ok().flatten(), self.clr_type) {
            (Some(identity), Some(own)) => identity.value_kind() == Some(own.kind),
            (Some(_), None) => false,
            (None, _) => true,
        }
    }

    /// Take type, size and nullability from the matched field.
    pub fn apply_field(&mut self, field: &Field) {
        self.related_type_field = Some(field.name.clone());
        if field.clr_type.is_some() {
            self.clr_type = field.clr_type;
        }
        self.size = field.size;
        self.is_required = field.is_required && !self.has_default;
    }

    /// Anonymous calls pass no user, so the parameter must accept null.
    pub fn make_optional(&mut self) {
        self.is_required = false;
        self.clr_type = self.clr_type.map(ClrType::nullable_form);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::ValueKind;

    #[test]
    fn test_apply_field_copies_shape() {
        let mut field = Field::new("modified", 4, "timestamp");
        field.clr_type = Some(ClrType::of(ValueKind::DateTime));
        field.set_required(false);

        let mut p = Parameter::new("modified", 2, "timestamp without time zone");
        p.clr_type = Some(ClrType::of(ValueKind::DateTime));
        p.apply_field(&field);

        assert_eq!(p.related_type_field.as_deref(), Some("modified"));
        assert!(!p.is_required);
        assert_eq!(p.clr_type.unwrap().to_string(), "DateTime?");
    }

    #[test]
    fn test_default_makes_parameter_optional() {
        let mut field = Field::new("name", 2, "text");
        field.clr_type = Some(ClrType::of(ValueKind::String));
        field.set_required(true);

        let mut p = Parameter::new("name", 1, "text");
        p.has_default = true;
        p.apply_field(&field);
        assert!(!p.is_required);
    }

    #[test]
    fn test_make_optional() {
        let mut p = Parameter::new("current_user_id", 3, "integer");
        p.clr_type = Some(ClrType::of(ValueKind::Int32));
        p.make_optional();
        assert!(!p.is_required);
        assert_eq!(p.clr_type.unwrap().to_string(), "int?");
    }
}
