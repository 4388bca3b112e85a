//! Drop diff between two inspections.

use tracing::{debug, warn};

use crate::core::traits::Dialect;
use crate::error::Result;
use crate::model::Domain;

/// DROP statements for generated objects in `old` that `new` no longer has.
///
/// Only operations and database result types carrying the `generated`
/// attribute are considered. Identity is namespace plus name, compared the
/// way the engine compares identifiers. Routines are dropped before types
/// since a routine may use a type in its signature.
pub fn generate_drop_statements(old: &Domain, new: &Domain) -> Result<Vec<String>> {
    if old.provider != new.provider {
        warn!(
            "Comparing domains from different providers ({} vs {})",
            old.provider, new.provider
        );
    }
    let dialect = new.dialect();
    let mut statements = Vec::new();

    for op in old.operations.iter().filter(|o| o.is_generated()) {
        if !new.find_operations(&op.key()).is_empty() {
            continue;
        }
        debug!("Generated operation {} is gone", op.key());
        statements.push(dialect.drop_routine_statement(
            &op.namespace,
            &op.name,
            op.kind,
            &op.parameter_types(),
        )?);
    }

    for result in old
        .result_types
        .iter()
        .filter(|r| r.is_custom_type && r.is_generated())
    {
        if new.find_result_type(&result.key()).is_some() {
            continue;
        }
        debug!("Generated type {} is gone", result.key());
        statements.push(dialect.drop_type_statement(&result.namespace, &result.name)?);
    }

    Ok(statements)
}
