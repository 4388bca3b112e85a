//! Stage 3: routines into operations.

use tracing::{debug, info, warn};

use crate::core::attributes::Attributes;
use crate::core::schema::{ParameterRow, ResultColumnRow, RoutineRow, UserTypeKind, UserTypeRow};
use crate::core::traits::{CatalogReader, Dialect, ProviderKind};
use crate::core::value::{ClrType, ValueKind};
use crate::drivers::DialectImpl;
use crate::error::{Result, SchemaError};
use crate::model::{Domain, Field, Operation, OperationReturn, Parameter, ResultType, TypeKey};

use super::{split_qualified, TypeProvider};

/// Declared return types that say nothing about the row shape.
const PSEUDO_TYPES: &[&str] = &[
    "record",
    "table",
    "any",
    "anyelement",
    "anyarray",
    "anynonarray",
    "anyenum",
    "anycompatible",
    "internal",
];

fn is_pseudo_type(native_type: &str) -> bool {
    PSEUDO_TYPES.contains(&native_type.trim().to_lowercase().as_str())
}

/// What a user-defined type name stands for.
enum UserTypeShape {
    /// Composite or table type, loaded as a result type.
    Result(TypeKey),
    /// Enum or domain: one value, typed when the catalog gives a mappable base.
    Scalar(Option<ClrType>),
}

/// A result-shape field from a routine column or composite attribute.
fn result_field(dialect: &DialectImpl, owner: &str, column: &ResultColumnRow) -> Field {
    let mut field = Field::new(&column.name, column.ordinal, &column.native_type);
    field.clr_type = dialect.map_native_type(&column.native_type);
    if field.clr_type.is_none() {
        warn!(
            "Result column {}.{} has unmapped native type '{}'",
            owner, column.name, column.native_type
        );
    }
    field.set_required(!column.is_nullable);
    field.size = column.size;
    field
}

impl<C: CatalogReader> TypeProvider<C> {
    /// Load every routine outside the excluded schemas into `domain`.
    ///
    /// Runs after [`get_domain`](Self::get_domain): return shapes are matched
    /// against the loaded application types.
    pub async fn get_operations(&self, domain: &mut Domain) -> Result<()> {
        let routines = self.catalog.routines(&self.settings.excluded_schemas).await?;
        info!("Found {} routines", routines.len());

        for routine in &routines {
            let operation = self.load_operation(domain, routine).await?;
            debug!(
                "Loaded operation {} ({} parameters, returns {:?})",
                operation.key(),
                operation.parameters.len(),
                operation.returns.kind
            );
            domain.operations.push(operation);
        }

        let incomplete = domain
            .operations
            .iter()
            .filter(|o| o.returns.is_incomplete())
            .count();
        if incomplete > 0 {
            warn!("{} operations have an incomplete return shape", incomplete);
        }
        Ok(())
    }

    async fn load_operation(&self, domain: &mut Domain, routine: &RoutineRow) -> Result<Operation> {
        let mut op = Operation::new(&routine.schema, &routine.name, routine.kind);
        op.specific_name = routine.specific_name.clone();
        op.attributes = Attributes::parse(routine.description.as_deref(), &routine.full_name());
        op.related_type = related_type(domain, &op);

        for row in self.catalog.routine_parameters(routine).await? {
            let parameter = self.load_parameter(domain, &op, row).await?;
            op.parameters.push(parameter);
        }

        op.returns = self.infer_return(domain, &op, routine).await?;

        if let Some(related) = op.related_type.clone() {
            backfill_parameters(domain, &mut op, &related);
        }
        Ok(op)
    }

    async fn load_parameter(
        &self,
        domain: &mut Domain,
        op: &Operation,
        row: ParameterRow,
    ) -> Result<Parameter> {
        let mut parameter = Parameter::new(row.name, row.ordinal, row.native_type);
        parameter.has_default = row.has_default;
        parameter.is_required = !row.has_default;

        let clr_type = if row.is_user_defined {
            let schema = row.type_schema.unwrap_or_else(|| op.namespace.clone());
            match self
                .resolve_user_type(domain, &schema, &parameter.native_type, op)
                .await?
            {
                UserTypeShape::Result(key) => {
                    parameter.clr_type = Some(ClrType::of(ValueKind::ResultType));
                    parameter.result_type = Some(key);
                    return Ok(parameter);
                }
                UserTypeShape::Scalar(clr_type) => clr_type,
            }
        } else {
            domain.dialect().map_native_type(&parameter.native_type)
        };

        match clr_type {
            Some(clr_type) => {
                parameter.clr_type = Some(clr_type);
                Ok(parameter)
            }
            None => Err(SchemaError::UnresolvedParameter {
                operation: op.key().to_string(),
                parameter: parameter.name,
            }),
        }
    }

    /// Resolve a user-defined type by name.
    ///
    /// A composite or table type is found among the loaded result types or
    /// read from the catalog, and `op` is recorded as one of its users.
    /// Domains resolve to their base type; enums have no value type.
    async fn resolve_user_type(
        &self,
        domain: &mut Domain,
        schema: &str,
        name: &str,
        op: &Operation,
    ) -> Result<UserTypeShape> {
        let key = TypeKey::new(schema, name);
        if let Some(existing) = domain.find_result_type_mut(&key) {
            existing.add_operation(op.key());
            return Ok(UserTypeShape::Result(existing.key()));
        }

        let row = self
            .catalog
            .user_type(schema, name)
            .await?
            .ok_or_else(|| SchemaError::UnknownUserType {
                namespace: schema.to_string(),
                name: name.to_string(),
            })?;

        match row.kind {
            UserTypeKind::Composite => Ok(UserTypeShape::Result(load_result_type(domain, &row, op))),
            UserTypeKind::Domain => {
                let base_type = row.base_type.as_deref().unwrap_or_default();
                let clr_type = domain.dialect().map_native_type(base_type);
                match clr_type {
                    Some(_) => debug!("Domain {} resolves to '{}'", key, base_type),
                    None => warn!("Domain {} has unmapped base type '{}'", key, base_type),
                }
                Ok(UserTypeShape::Scalar(clr_type))
            }
            UserTypeKind::Enum => {
                warn!("Enum type {} has no value type mapping", key);
                Ok(UserTypeShape::Scalar(None))
            }
        }
    }

    /// Decide what an operation returns.
    ///
    /// Output columns win. A single column is a primitive; several columns
    /// either match an application type exactly or become a synthesized
    /// result type. Without columns the declared return type decides: void,
    /// a mapped primitive, a table's row type, a composite type, or the base
    /// type of a domain. Enums give a primitive with no value type.
    async fn infer_return(
        &self,
        domain: &mut Domain,
        op: &Operation,
        routine: &RoutineRow,
    ) -> Result<OperationReturn> {
        let dialect = domain.dialect();

        let columns = self.catalog.routine_result_columns(routine).await?;
        if !columns.is_empty() {
            return Ok(row_return(domain, op, &columns));
        }

        let return_type = routine.return_type.as_deref();
        if dialect.is_void(return_type) {
            return Ok(OperationReturn::none());
        }
        let return_type = return_type.unwrap_or_default();

        if is_pseudo_type(return_type) {
            warn!(
                "Operation {} returns '{}' without column information",
                op.key(),
                return_type
            );
            return Ok(OperationReturn::primitive(None, routine.returns_set));
        }

        if let Some(clr_type) = dialect.map_native_type(return_type) {
            return Ok(OperationReturn::primitive(Some(clr_type), routine.returns_set));
        }

        let (schema, name) = split_qualified(return_type);
        let schema = schema.unwrap_or(op.namespace.as_str());
        if let Some(app_type) = domain.find_type(&TypeKey::new(schema, name)) {
            return Ok(OperationReturn::application_type(
                app_type.key(),
                routine.returns_set,
            ));
        }

        match self.resolve_user_type(domain, schema, name, op).await? {
            UserTypeShape::Result(key) => {
                if let Some(related) = &op.related_type {
                    domain.update_result_field_properties_from_application_type(&key, related);
                }
                Ok(OperationReturn::custom_type(key, routine.returns_set))
            }
            UserTypeShape::Scalar(clr_type) => {
                Ok(OperationReturn::primitive(clr_type, routine.returns_set))
            }
        }
    }
}

/// Build the result type for a composite / table type row and record `op`
/// as its first user.
fn load_result_type(domain: &mut Domain, row: &UserTypeRow, op: &Operation) -> TypeKey {
    let dialect = domain.dialect();
    let mut result = ResultType::new(&row.schema, &row.name, true);
    let owner = result.key().to_string();
    result.attributes = Attributes::parse(row.description.as_deref(), &owner);
    result.fields = row
        .columns
        .iter()
        .map(|c| result_field(&dialect, &owner, c))
        .collect();
    result.related_type = result
        .attributes
        .as_ref()
        .and_then(Attributes::application_type)
        .and_then(|n| lookup_type(&*domain, n, &row.schema));
    result.add_operation(op.key());

    debug!("Loaded user type {} ({} fields)", owner, result.fields.len());
    let key = result.key();
    domain.result_types.push(result);
    key
}

/// The `applicationtype` attribute resolved against the loaded tables.
fn related_type(domain: &Domain, op: &Operation) -> Option<TypeKey> {
    let name = op
        .attributes
        .as_ref()
        .and_then(Attributes::application_type)?;
    let found = lookup_type(domain, name, &op.namespace);
    if found.is_none() {
        warn!(
            "Operation {} names unknown application type '{}'",
            op.key(),
            name
        );
    }
    found
}

/// Resolve a type named in an attribute.
///
/// Attributes are hand-written, so when the provider's own comparison finds
/// nothing a single case-insensitive match is accepted.
fn lookup_type(domain: &Domain, name: &str, default_schema: &str) -> Option<TypeKey> {
    let (schema, name) = split_qualified(name);
    let key = TypeKey::new(schema.unwrap_or(default_schema), name);
    if let Some(found) = domain.find_type(&key) {
        return Some(found.key());
    }

    let mut folded = domain.types.iter().filter(|t| {
        t.namespace.eq_ignore_ascii_case(&key.namespace) && t.name.eq_ignore_ascii_case(&key.name)
    });
    match (folded.next(), folded.next()) {
        (Some(found), None) => {
            debug!("Matched application type '{}' to {} ignoring case", key, found.key());
            Some(found.key())
        }
        _ => None,
    }
}

/// Return shape for a routine with output columns.
fn row_return(domain: &mut Domain, op: &Operation, columns: &[ResultColumnRow]) -> OperationReturn {
    let dialect = domain.dialect();
    let multiple = !op.single_result();
    let owner = op.key().to_string();
    let fields: Vec<Field> = columns
        .iter()
        .map(|c| result_field(&dialect, &owner, c))
        .collect();

    if let [single] = fields.as_slice() {
        return OperationReturn::primitive(single.clr_type, multiple);
    }

    let case_sensitive = domain.provider == ProviderKind::Postgres;
    if let Some(key) = domain.find_type_by_fields(&fields, op, case_sensitive) {
        return OperationReturn::application_type(key, multiple);
    }

    let name = match op
        .attributes
        .as_ref()
        .and_then(Attributes::result_type_name)
    {
        Some(name) => name.to_string(),
        None => domain.naming_convention().result_type_name(&op.name),
    };
    let key = TypeKey::new(&op.namespace, name);

    if let Some(existing) = domain.find_result_type_mut(&key) {
        existing.add_operation(op.key());
        return OperationReturn::custom_type(existing.key(), multiple);
    }

    let mut result = ResultType::new(&key.namespace, &key.name, false);
    result.fields = fields;
    result.related_type = op.related_type.clone();
    result.add_operation(op.key());
    debug!("Synthesized result type {} for {}", key, op.key());
    domain.result_types.push(result);

    if let Some(related) = &op.related_type {
        domain.update_result_field_properties_from_application_type(&key, related);
    }
    OperationReturn::custom_type(key, multiple)
}

/// Copy field shape onto parameters that match the related type.
///
/// Parameters match a field by name, or by the convention's parameter name
/// for that field. The security-user parameter is left unmatched and made
/// optional.
fn backfill_parameters(domain: &Domain, op: &mut Operation, related: &TypeKey) {
    let Some(related_type) = domain.find_type(related) else {
        return;
    };
    let dialect = domain.dialect();
    let conv = domain.naming_convention();

    for parameter in op.parameters.iter_mut() {
        if parameter.is_result_type() {
            continue;
        }
        if parameter.is_security_user(domain) {
            parameter.make_optional();
            continue;
        }

        let field = related_type
            .fields
            .iter()
            .find(|f| dialect.names_equal(&f.name, &parameter.name))
            .or_else(|| {
                related_type.fields.iter().find(|f| {
                    dialect.names_equal(&conv.parameter_name_from_field(&f.name), &parameter.name)
                })
            });
        match field {
            Some(field) => parameter.apply_field(field),
            None => debug!(
                "Parameter {} of {} matches no field of {}",
                parameter.name,
                op.name,
                related
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerationConfig;
    use crate::drivers::MemoryCatalog;
    use crate::model::ReturnKind;

    async fn inspect(yaml: &str) -> Result<Domain> {
        let provider =
            TypeProvider::new(MemoryCatalog::from_yaml(yaml).unwrap(), GenerationConfig::default());
        provider.inspect().await
    }

    const CUSTOMER: &str = r#"
provider: postgres
tables:
  - schema: public
    name: customer
    columns:
      - { name: id, native_type: integer, is_nullable: false, is_identity: true }
      - { name: name, native_type: text, is_nullable: false }
      - { name: modified, native_type: timestamp without time zone }
    constraints:
      - { name: customer_pkey, kind: primary, columns: [id] }
"#;

    fn with_routines(routines: &str) -> String {
        format!("{}routines:\n{}", CUSTOMER, routines)
    }

    #[test]
    fn test_pseudo_types() {
        assert!(is_pseudo_type("record"));
        assert!(is_pseudo_type(" ANYELEMENT "));
        assert!(!is_pseudo_type("customer"));
    }

    #[tokio::test]
    async fn test_void_and_scalar_returns() {
        let yaml = with_routines(
            r#"
  - { schema: public, name: customer_touch, kind: procedure }
  - { schema: public, name: customer_count, kind: function, return_type: bigint }
  - { schema: public, name: customer_ids, kind: function, return_type: integer, returns_set: true }
"#,
        );
        let domain = inspect(&yaml).await.unwrap();
        let touch = &domain.operations[0].returns;
        assert_eq!(touch.kind, ReturnKind::None);

        let count = &domain.operations[1].returns;
        assert_eq!(count.kind, ReturnKind::Primitive);
        assert_eq!(count.clr_type, Some(ClrType::of(ValueKind::Int64)));
        assert!(!count.multiple);

        assert!(domain.operations[2].returns.multiple);
    }

    #[tokio::test]
    async fn test_table_row_type_return() {
        let yaml = with_routines(
            r#"
  - { schema: public, name: customer_get, kind: function, return_type: public.customer, returns_set: true }
"#,
        );
        let domain = inspect(&yaml).await.unwrap();
        let returns = &domain.operations[0].returns;
        assert_eq!(returns.kind, ReturnKind::ApplicationType);
        assert_eq!(returns.type_key, Some(TypeKey::new("public", "customer")));
        assert!(returns.multiple);
    }

    #[tokio::test]
    async fn test_projection_matching_table_returns_application_type() {
        let yaml = with_routines(
            r#"
  - schema: public
    name: customer_select_all
    kind: function
    return_type: record
    returns_set: true
    result_signature: "TABLE(id integer, name text, modified timestamp without time zone)"
"#,
        );
        let domain = inspect(&yaml).await.unwrap();
        let returns = &domain.operations[0].returns;
        assert_eq!(returns.kind, ReturnKind::ApplicationType);
        assert!(returns.multiple);
        assert!(domain.result_types.is_empty());
    }

    #[tokio::test]
    async fn test_projection_synthesizes_result_type_with_backfill() {
        let yaml = with_routines(
            r#"
  - schema: public
    name: customer_names
    kind: function
    return_type: record
    returns_set: true
    result_signature: "TABLE(id integer, name text)"
    description: '{"applicationtype": "customer"}'
"#,
        );
        let domain = inspect(&yaml).await.unwrap();
        let returns = &domain.operations[0].returns;
        assert_eq!(returns.kind, ReturnKind::CustomType);

        let result = domain.find_result_type(returns.type_key.as_ref().unwrap()).unwrap();
        assert_eq!(result.name, "customer_names_result");
        assert!(!result.is_custom_type);
        assert_eq!(result.related_type, Some(TypeKey::new("public", "customer")));
        // TABLE columns are nullable; key and required come from the table
        let id = result.field("id").unwrap();
        assert!(id.is_key);
        assert!(id.is_required);
        assert_eq!(id.clr_type, Some(ClrType::of(ValueKind::Int32).nullable_form()));
    }

    #[tokio::test]
    async fn test_single_column_is_primitive() {
        let yaml = with_routines(
            r#"
  - schema: public
    name: customer_name_lookup
    kind: function
    return_type: record
    returns_set: true
    result_signature: "TABLE(name text)"
    description: '{"single_result": true}'
"#,
        );
        let domain = inspect(&yaml).await.unwrap();
        let returns = &domain.operations[0].returns;
        assert_eq!(returns.kind, ReturnKind::Primitive);
        assert_eq!(returns.clr_type, Some(ClrType::of(ValueKind::String)));
        assert!(!returns.multiple);
    }

    #[tokio::test]
    async fn test_pseudo_return_without_columns_is_incomplete() {
        let yaml = with_routines(
            r#"
  - { schema: public, name: customer_dynamic, kind: function, return_type: record, returns_set: true }
"#,
        );
        let domain = inspect(&yaml).await.unwrap();
        assert!(domain.operations[0].returns.is_incomplete());
    }

    #[tokio::test]
    async fn test_parameters_backfilled_from_related_type() {
        let yaml = with_routines(
            r#"
  - schema: public
    name: customer_update
    kind: function
    return_type: void
    description: '{"applicationtype": "customer"}'
    parameters:
      - { name: id, native_type: integer }
      - { name: modified, native_type: timestamp without time zone }
      - { name: current_user_id, native_type: integer }
"#,
        );
        let domain = inspect(&yaml).await.unwrap();
        let op = &domain.operations[0];
        assert_eq!(op.related_type, Some(TypeKey::new("public", "customer")));

        let id = &op.parameters[0];
        assert_eq!(id.related_type_field.as_deref(), Some("id"));
        assert!(id.is_required);

        let modified = &op.parameters[1];
        assert!(!modified.is_required);
        assert_eq!(modified.clr_type.unwrap().to_string(), "DateTime?");

        let user = &op.parameters[2];
        assert!(user.related_type_field.is_none());
        assert!(!user.is_required);
        assert_eq!(user.clr_type.unwrap().to_string(), "int?");
    }

    #[tokio::test]
    async fn test_application_type_attribute_ignores_case() {
        let yaml = with_routines(
            r#"
  - schema: public
    name: customer_touch
    kind: procedure
    description: '{"applicationtype": "Customer"}'
    parameters:
      - { name: id, native_type: integer }
  - schema: public
    name: customer_recount
    kind: procedure
    description: '{"applicationtype": "PUBLIC.CUSTOMER"}'
"#,
        );
        let domain = inspect(&yaml).await.unwrap();
        let customer = TypeKey::new("public", "customer");
        assert_eq!(domain.operations[0].related_type.as_ref(), Some(&customer));
        assert_eq!(domain.operations[0].parameters[0].related_type_field.as_deref(), Some("id"));
        assert_eq!(domain.operations[1].related_type.as_ref(), Some(&customer));
    }

    #[tokio::test]
    async fn test_application_type_attribute_prefers_exact_and_rejects_ambiguity() {
        let yaml = r#"
provider: postgres
tables:
  - schema: public
    name: customer
    columns:
      - { name: id, native_type: integer, is_nullable: false }
  - schema: public
    name: Customer
    columns:
      - { name: id, native_type: integer, is_nullable: false }
routines:
  - { schema: public, name: exact_touch, kind: procedure, description: '{"applicationtype": "Customer"}' }
  - { schema: public, name: ambiguous_touch, kind: procedure, description: '{"applicationtype": "CUSTOMER"}' }
"#;
        let domain = inspect(yaml).await.unwrap();
        assert_eq!(
            domain.operations[0].related_type,
            Some(TypeKey::new("public", "Customer"))
        );
        assert!(domain.operations[1].related_type.is_none());
    }

    #[tokio::test]
    async fn test_unmapped_parameter_is_fatal() {
        let yaml = with_routines(
            r#"
  - schema: public
    name: customer_mood
    kind: function
    return_type: void
    parameters:
      - { name: mood, native_type: mood_enum }
"#,
        );
        let err = inspect(&yaml).await.unwrap_err();
        assert!(matches!(err, SchemaError::UnresolvedParameter { ref parameter, .. } if parameter == "mood"));
    }

    #[tokio::test]
    async fn test_unknown_user_type_is_fatal() {
        let yaml = with_routines(
            r#"
  - schema: public
    name: customer_bulk
    kind: function
    return_type: void
    parameters:
      - { name: rows, native_type: customer_row, is_user_defined: true }
"#,
        );
        let err = inspect(&yaml).await.unwrap_err();
        assert!(matches!(err, SchemaError::UnknownUserType { ref name, .. } if name == "customer_row"));
    }

    #[tokio::test]
    async fn test_enum_return_is_incomplete_primitive() {
        let yaml = format!(
            "{}user_types:\n  - {{ schema: public, name: mood, kind: enum }}\n",
            with_routines(
                r#"
  - { schema: public, name: customer_mood, kind: function, return_type: mood }
"#,
            )
        );
        let domain = inspect(&yaml).await.unwrap();
        let returns = &domain.operations[0].returns;
        assert_eq!(returns.kind, ReturnKind::Primitive);
        assert!(returns.is_incomplete());
        assert!(domain.result_types.is_empty());
    }

    #[tokio::test]
    async fn test_enum_parameter_stays_fatal() {
        let yaml = format!(
            "{}user_types:\n  - {{ schema: public, name: mood, kind: enum }}\n",
            with_routines(
                r#"
  - schema: public
    name: customer_set_mood
    kind: procedure
    parameters:
      - { name: mood, native_type: mood, is_user_defined: true }
"#,
            )
        );
        let err = inspect(&yaml).await.unwrap_err();
        assert!(matches!(err, SchemaError::UnresolvedParameter { ref parameter, .. } if parameter == "mood"));
    }

    #[tokio::test]
    async fn test_domain_return_uses_base_type() {
        let yaml = format!(
            "{}user_types:\n  - {{ schema: public, name: positive_int, kind: domain, base_type: integer }}\n",
            with_routines(
                r#"
  - { schema: public, name: customer_total, kind: function, return_type: public.positive_int }
"#,
            )
        );
        let domain = inspect(&yaml).await.unwrap();
        let returns = &domain.operations[0].returns;
        assert_eq!(returns.kind, ReturnKind::Primitive);
        assert_eq!(returns.clr_type, Some(ClrType::of(ValueKind::Int32)));
    }

    #[tokio::test]
    async fn test_user_type_return_is_custom_type() {
        let yaml = format!(
            "{}{}",
            with_routines(
                r#"
  - { schema: public, name: customer_stats, kind: function, return_type: public.stats, returns_set: true }
"#,
            ),
            r#"user_types:
  - schema: public
    name: stats
    description: '{"isResult": true}'
    columns:
      - { name: total, ordinal: 1, native_type: bigint }
      - { name: latest, ordinal: 2, native_type: timestamp without time zone }
"#
        );
        let domain = inspect(&yaml).await.unwrap();
        let returns = &domain.operations[0].returns;
        assert_eq!(returns.kind, ReturnKind::CustomType);
        let stats = domain.find_result_type(&TypeKey::new("public", "stats")).unwrap();
        assert!(stats.is_custom_type);
        assert!(stats.attributes.as_ref().unwrap().is_result());
        assert_eq!(stats.operations, vec![TypeKey::new("public", "customer_stats")]);
    }
}
