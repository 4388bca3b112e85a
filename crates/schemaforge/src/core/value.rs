//! Provider-agnostic value types.
//!
//! Every native column or parameter type from either database maps onto a
//! [`ValueKind`]. A [`ClrType`] adds the nullable and array adjustments the
//! generators need, so `timestamp` on a nullable column becomes `DateTime?`.

use serde::{Deserialize, Serialize};

/// Common value-type classification shared by both providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Boolean,
    Byte,
    Int16,
    Int32,
    Int64,
    Single,
    Double,
    Decimal,
    String,
    Json,
    Xml,
    DateTime,
    DateTimeOffset,
    DateOnly,
    TimeOnly,
    TimeSpan,
    Binary,
    Guid,
    Object,
    /// Marker for a parameter or column typed by a composite / table type.
    ResultType,
}

impl ValueKind {
    /// Whether this kind is a value type (needs an explicit nullable form).
    pub fn is_value_type(self) -> bool {
        !matches!(
            self,
            ValueKind::String
                | ValueKind::Json
                | ValueKind::Xml
                | ValueKind::Binary
                | ValueKind::Object
                | ValueKind::ResultType
        )
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            ValueKind::Byte | ValueKind::Int16 | ValueKind::Int32 | ValueKind::Int64
        )
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer()
            || matches!(self, ValueKind::Single | ValueKind::Double | ValueKind::Decimal)
    }

    /// Date-time kinds (a date with a time component).
    pub fn is_date_time(self) -> bool {
        matches!(self, ValueKind::DateTime | ValueKind::DateTimeOffset)
    }

    pub fn is_text(self) -> bool {
        matches!(self, ValueKind::String | ValueKind::Json | ValueKind::Xml)
    }

    /// CLR-style spelling used in logs and snapshots.
    pub fn clr_name(self) -> &'static str {
        match self {
            ValueKind::Boolean => "bool",
            ValueKind::Byte => "byte",
            ValueKind::Int16 => "short",
            ValueKind::Int32 => "int",
            ValueKind::Int64 => "long",
            ValueKind::Single => "float",
            ValueKind::Double => "double",
            ValueKind::Decimal => "decimal",
            ValueKind::String => "string",
            ValueKind::Json => "JsonDocument",
            ValueKind::Xml => "XmlDocument",
            ValueKind::DateTime => "DateTime",
            ValueKind::DateTimeOffset => "DateTimeOffset",
            ValueKind::DateOnly => "DateOnly",
            ValueKind::TimeOnly => "TimeOnly",
            ValueKind::TimeSpan => "TimeSpan",
            ValueKind::Binary => "byte[]",
            ValueKind::Guid => "Guid",
            ValueKind::Object => "object",
            ValueKind::ResultType => "ResultType",
        }
    }
}

/// A modelled value type: kind plus nullable and array adjustments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClrType {
    pub kind: ValueKind,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub array: bool,
}

impl ClrType {
    /// A non-nullable scalar of the given kind.
    pub const fn of(kind: ValueKind) -> Self {
        Self {
            kind,
            nullable: false,
            array: false,
        }
    }

    /// An array of the given element type.
    pub fn array_of(element: ClrType) -> Self {
        Self {
            kind: element.kind,
            nullable: false,
            array: true,
        }
    }

    /// The nullable form. Reference types and arrays are already nullable and
    /// stay unchanged.
    pub fn nullable_form(self) -> Self {
        if self.kind.is_value_type() && !self.array {
            Self {
                nullable: true,
                ..self
            }
        } else {
            self
        }
    }

    /// The non-nullable form.
    pub fn non_nullable(self) -> Self {
        Self {
            nullable: false,
            ..self
        }
    }

    /// Apply a column's nullability to this type.
    pub fn with_nullability(self, is_nullable: bool) -> Self {
        if is_nullable {
            self.nullable_form()
        } else {
            self.non_nullable()
        }
    }

    pub fn is_result_type(&self) -> bool {
        self.kind == ValueKind::ResultType
    }
}

impl std::fmt::Display for ClrType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind.clr_name())?;
        if self.nullable {
            write!(f, "?")?;
        }
        if self.array {
            write!(f, "[]")?;
        }
        Ok(())
    }
}
