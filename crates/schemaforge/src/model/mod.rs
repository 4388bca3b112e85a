//! The domain model.
//!
//! - [`Domain`]: aggregate root holding every type, operation and result type
//! - [`ApplicationType`]: one table with its fields and key constraints
//! - [`ResultType`]: a composite shape not backed by a table
//! - [`Operation`]: one stored routine with parameters and return shape
//! - [`Field`], [`Parameter`], [`Constraint`]: the leaves
//!
//! Entities refer to each other by [`TypeKey`] (namespace + name) rather than
//! by pointer, so forward references resolve by lookup in whatever order the
//! provider builds the graph, and a finished domain serializes as-is.

mod application_type;
mod constraint;
mod domain;
mod field;
mod operation;
mod parameter;
mod result_type;
mod snapshot;

pub use application_type::{ApplicationType, DeleteType};
pub use constraint::Constraint;
pub use domain::Domain;
pub use field::{Field, FieldReference, LARGE_TEXT_THRESHOLD};
pub use operation::{Operation, OperationReturn, ReturnKind};
pub use parameter::Parameter;
pub use result_type::ResultType;
pub use snapshot::DomainSnapshot;

use serde::{Deserialize, Serialize};

/// Stable identity of a type, result type or operation within a domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeKey {
    pub namespace: String,
    pub name: String,
}

impl TypeKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for TypeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}
