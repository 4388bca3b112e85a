//! Provider pipeline tests against in-memory catalogs.
//!
//! The shop fixtures describe the same schema twice, once as PostgreSQL
//! and once as SQL Server would report it; both must produce the same
//! domain shape.

use schemaforge::{
    generate_drop_statements, ClrType, Domain, GenerationConfig, MemoryCatalog, Operation, ReturnKind,
    SchemaError, TypeKey, TypeProvider, ValueKind,
};

const POSTGRES_SHOP: &str = include_str!("fixtures/postgres_shop.yaml");
const SQLSERVER_SHOP: &str = include_str!("fixtures/sqlserver_shop.yaml");
const POSTGRES_SCALAR_TYPES: &str = include_str!("fixtures/postgres_scalar_types.yaml");

fn settings() -> GenerationConfig {
    GenerationConfig {
        excluded_schemas: vec!["audit".to_string()],
        ..GenerationConfig::default()
    }
}

async fn inspect(yaml: &str) -> Result<Domain, SchemaError> {
    let catalog = MemoryCatalog::from_yaml(yaml).unwrap();
    TypeProvider::new(catalog, settings()).inspect().await
}

// =============================================================================
// Table scenarios
// =============================================================================

#[tokio::test]
async fn test_simple_lookup_table() {
    let yaml = r#"
provider: postgres
tables:
  - schema: public
    name: simple_lookup_table
    columns:
      - { name: id, native_type: integer, is_nullable: false, default_value: "nextval('simple_lookup_table_id_seq'::regclass)" }
      - { name: name, native_type: text, is_nullable: false }
      - { name: created, native_type: timestamp without time zone, is_nullable: false }
      - { name: modified, native_type: timestamp without time zone }
    constraints:
      - { name: simple_lookup_table_pkey, kind: primary, columns: [id] }
"#;
    let domain = inspect(yaml).await.unwrap();
    let conv = domain.naming_convention();

    assert_eq!(domain.types.len(), 1);
    let table = &domain.types[0];
    assert_eq!(table.name, "simple_lookup_table");
    assert_eq!(table.fields.len(), 4);

    let id = table.field("id").unwrap();
    assert!(id.is_key && id.is_generated && id.is_required);
    assert!(id.is_auto_assigned_identity());
    assert_eq!(id.clr_type, Some(ClrType::of(ValueKind::Int32)));
    assert_eq!(id.size, None);

    let name = table.field("name").unwrap();
    assert!(name.is_required);
    assert!(!name.is_generated);
    assert_eq!(name.value_kind(), Some(ValueKind::String));

    let created = table.field("created").unwrap();
    assert!(created.is_required);
    assert!(!created.is_generated);
    assert_eq!(created.clr_type.unwrap().to_string(), "DateTime");
    assert!(created.is_tracking_created_timestamp(conv));

    let modified = table.field("modified").unwrap();
    assert!(!modified.is_required);
    assert_eq!(modified.clr_type.unwrap().to_string(), "DateTime?");
    assert!(modified.is_tracking_modified_timestamp(conv));
}

#[tokio::test]
async fn test_sqlserver_related_entities() {
    let domain = inspect(SQLSERVER_SHOP).await.unwrap();
    let product = domain.find_type(&TypeKey::new("dbo", "Product")).unwrap();

    let category = product.field("Category").unwrap();
    assert!(category.has_reference_type());
    let reference = category.references.as_ref().unwrap();
    assert_eq!(reference.type_key, TypeKey::new("dbo", "ProductCategory"));
    let target = domain.find_field(reference).unwrap();
    assert_eq!(target.name, "Id");
    assert!(target.is_key);

    assert!(product.field("Price").unwrap().is_computed);
    assert!(!product.field("UnitPrice").unwrap().is_computed);
}

#[tokio::test]
async fn test_excluded_schema_never_loaded() {
    let domain = inspect(POSTGRES_SHOP).await.unwrap();
    assert!(domain.types.iter().all(|t| t.namespace != "audit"));
    assert!(domain.operations.iter().all(|o| o.namespace != "audit"));
}

// =============================================================================
// Properties
// =============================================================================

#[tokio::test]
async fn test_not_null_columns_are_required() {
    for yaml in [POSTGRES_SHOP, SQLSERVER_SHOP] {
        let domain = inspect(yaml).await.unwrap();
        for t in &domain.types {
            for f in &t.fields {
                let clr = f.clr_type.unwrap();
                if f.is_required {
                    assert!(!clr.nullable, "{}.{} is required but nullable", t.name, f.name);
                } else if clr.kind.is_value_type() {
                    assert!(clr.nullable, "{}.{} should be {}?", t.name, f.name, clr);
                }
            }
        }
    }
}

#[tokio::test]
async fn test_every_reference_points_at_a_real_field() {
    for yaml in [POSTGRES_SHOP, SQLSERVER_SHOP] {
        let domain = inspect(yaml).await.unwrap();
        let mut seen = 0;
        for t in &domain.types {
            for f in t.fields.iter().filter(|f| f.has_reference_type()) {
                let reference = f.references.as_ref().unwrap();
                let target = domain.find_type(&reference.type_key).unwrap();
                assert!(target.fields.iter().any(|tf| tf.name == reference.field));
                seen += 1;
            }
        }
        assert_eq!(seen, 1);
        assert!(domain.validate_references().is_empty());
    }
}

#[tokio::test]
async fn test_generated_single_keys_are_auto_assigned() {
    for yaml in [POSTGRES_SHOP, SQLSERVER_SHOP] {
        let domain = inspect(yaml).await.unwrap();
        for t in &domain.types {
            let key = t.key_field().unwrap();
            assert!(key.is_key && key.is_generated);
            assert!(key.is_auto_assigned_identity());
        }
    }
}

// =============================================================================
// Operation scenarios
// =============================================================================

#[tokio::test]
async fn test_composite_type_parameter() {
    let yaml = r#"
provider: postgres
routines:
  - schema: public
    name: government_area_add
    kind: function
    return_type: integer
    parameters:
      - { name: area, native_type: government_area_new, type_schema: public, is_user_defined: true }
      - { name: source, native_type: text }
      - { name: current_user_id, native_type: integer }
user_types:
  - schema: public
    name: government_area_new
    columns:
      - { name: code, ordinal: 1, native_type: character varying }
      - { name: title, ordinal: 2, native_type: text }
"#;
    let domain = inspect(yaml).await.unwrap();
    assert_eq!(domain.operations.len(), 1);

    let op = &domain.operations[0];
    assert_eq!(op.parameters.len(), 3);
    let area = &op.parameters[0];
    assert!(area.is_result_type());
    assert_eq!(area.result_type, Some(TypeKey::new("public", "government_area_new")));

    assert_eq!(domain.result_types.len(), 1);
    let result = &domain.result_types[0];
    assert_eq!(result.name, "government_area_new");
    assert!(result.is_custom_type);
    assert_eq!(result.fields.len(), 2);
    assert_eq!(result.operations, vec![op.key()]);
}

#[tokio::test]
async fn test_single_result_function() {
    let domain = inspect(SQLSERVER_SHOP).await.unwrap();

    let top = &domain.find_operations(&TypeKey::new("dbo", "ProductTopName"))[0];
    assert_eq!(top.returns.kind, ReturnKind::Primitive);
    assert!(!top.returns.multiple);

    let all = &domain.find_operations(&TypeKey::new("dbo", "ProductNames"))[0];
    assert_eq!(all.returns.kind, ReturnKind::Primitive);
    assert!(all.returns.multiple);
}

#[tokio::test]
async fn test_projection_matching_a_table_returns_it() {
    let domain = inspect(POSTGRES_SHOP).await.unwrap();
    let op = &domain.find_operations(&TypeKey::new("public", "product_select_by_category"))[0];
    assert_eq!(op.returns.kind, ReturnKind::ApplicationType);
    assert_eq!(op.returns.type_key, Some(TypeKey::new("public", "product")));
    assert!(op.returns.multiple);
    assert!(domain.find_result_type(&TypeKey::new("public", "product_select_by_category_result")).is_none());
}

#[tokio::test]
async fn test_synthesized_result_type_backfilled_from_related_type() {
    let domain = inspect(POSTGRES_SHOP).await.unwrap();
    let op = &domain.find_operations(&TypeKey::new("public", "product_summary"))[0];
    assert_eq!(op.returns.kind, ReturnKind::CustomType);

    let result = domain.find_result_type(op.returns.type_key.as_ref().unwrap()).unwrap();
    assert_eq!(result.name, "product_summary_result");
    let category = result.field("category").unwrap();
    assert!(category.is_required);
    assert_eq!(
        category.references.as_ref().map(|r| r.type_key.clone()),
        Some(TypeKey::new("public", "product_category"))
    );
    // the projection column was nullable; the table's non-null form never narrows it
    assert_eq!(category.clr_type.unwrap().to_string(), "int?");
    assert!(result.field("total").unwrap().references.is_none());
}

#[tokio::test]
async fn test_insert_parameters_backfilled() {
    let domain = inspect(POSTGRES_SHOP).await.unwrap();
    let op = &domain.find_operations(&TypeKey::new("public", "product_insert"))[0];
    assert!(op.is_generated());

    let unit_price = &op.parameters[1];
    assert_eq!(unit_price.related_type_field.as_deref(), Some("unit_price"));
    assert!(unit_price.is_required);

    let user = &op.parameters[3];
    assert!(user.is_security_user(&domain));
    assert!(!user.is_required);
    assert_eq!(user.clr_type.unwrap().to_string(), "int?");
}

#[tokio::test]
async fn test_result_type_reused_by_name() {
    let yaml = r#"
provider: postgres
routines:
  - schema: public
    name: customer_summary_recent
    kind: function
    return_type: record
    returns_set: true
    result_signature: "TABLE(name text, total bigint)"
    description: '{"result_type": "customer_summary"}'
  - schema: public
    name: customer_summary_all
    kind: function
    return_type: record
    returns_set: true
    result_signature: "TABLE(name text, total bigint)"
    description: '{"result_type": "customer_summary"}'
"#;
    let domain = inspect(yaml).await.unwrap();
    assert_eq!(domain.result_types.len(), 1);

    let shared = TypeKey::new("public", "customer_summary");
    for op in &domain.operations {
        assert_eq!(op.returns.type_key.as_ref(), Some(&shared));
    }
    assert_eq!(domain.result_types[0].operations.len(), 2);
}

#[tokio::test]
async fn test_result_type_reused_by_convention_name() {
    let yaml = r#"
provider: postgres
routines:
  - schema: public
    name: customer_report
    specific_name: customer_report_101
    kind: function
    return_type: record
    returns_set: true
    result_signature: "TABLE(name text, total bigint)"
  - schema: public
    name: customer_report
    specific_name: customer_report_102
    kind: function
    return_type: record
    returns_set: true
    result_signature: "TABLE(name text, total bigint)"
    parameters:
      - { name: since, native_type: date }
"#;
    let domain = inspect(yaml).await.unwrap();
    assert_eq!(domain.operations.len(), 2);
    assert_eq!(domain.result_types.len(), 1);

    let shared = TypeKey::new("public", "customer_report_result");
    for op in &domain.operations {
        assert_eq!(op.returns.kind, ReturnKind::CustomType);
        assert_eq!(op.returns.type_key.as_ref(), Some(&shared));
    }
    let result = &domain.result_types[0];
    assert_eq!(result.key(), shared);
    assert!(!result.is_custom_type);
    assert_eq!(result.operations, vec![TypeKey::new("public", "customer_report")]);
}

// =============================================================================
// Enum and domain types
// =============================================================================

#[tokio::test]
async fn test_enum_and_domain_types_do_not_abort_inspection() {
    let domain = inspect(POSTGRES_SCALAR_TYPES).await.unwrap();
    assert_eq!(domain.operations.len(), 5);
    assert!(domain.result_types.is_empty());

    fn find<'a>(domain: &'a Domain, name: &str) -> &'a Operation {
        domain.operations.iter().find(|o| o.name == name).unwrap()
    }
    let op = |name: &str| find(&domain, name);

    for name in ["person_current_mood", "person_moods"] {
        let returns = &op(name).returns;
        assert_eq!(returns.kind, ReturnKind::Primitive);
        assert!(returns.is_incomplete());
    }
    assert!(op("person_moods").returns.multiple);

    let email = &op("person_email").returns;
    assert_eq!(email.kind, ReturnKind::Primitive);
    assert_eq!(email.clr_type, Some(ClrType::of(ValueKind::String)));

    let by_email = op("person_select_by_email");
    assert_eq!(by_email.returns.kind, ReturnKind::ApplicationType);
    let parameter = &by_email.parameters[0];
    assert!(!parameter.is_result_type());
    assert_eq!(parameter.native_type, "email_address");
    assert_eq!(parameter.clr_type, Some(ClrType::of(ValueKind::String)));

    assert_eq!(op("person_count").returns.clr_type, Some(ClrType::of(ValueKind::Int64)));
}

// =============================================================================
// Drop diff
// =============================================================================

#[tokio::test]
async fn test_drop_statement_for_removed_generated_operation() {
    let old = inspect(POSTGRES_SHOP).await.unwrap();
    let mut new = old.clone();
    new.operations.retain(|o| o.name != "product_insert");

    let statements = generate_drop_statements(&old, &new).unwrap();
    assert_eq!(
        statements,
        vec![r#"DROP FUNCTION IF EXISTS "public"."product_insert"(integer, numeric, integer, integer);"#]
    );

    assert!(generate_drop_statements(&old, &old).unwrap().is_empty());
}

#[tokio::test]
async fn test_drop_generated_executes_through_catalog() {
    let old = inspect(SQLSERVER_SHOP).await.unwrap();
    let mut new = old.clone();
    new.operations.retain(|o| o.name != "ProductInsert");

    let provider = TypeProvider::new(MemoryCatalog::from_yaml(SQLSERVER_SHOP).unwrap(), settings());
    let executed = provider.drop_generated(&old, &new).await.unwrap();
    assert_eq!(executed, vec!["DROP FUNCTION IF EXISTS [dbo].[ProductInsert];"]);
    assert_eq!(provider.catalog().executed().await, executed);
}

// =============================================================================
// Cross-provider equivalence
// =============================================================================

/// Provider-neutral projection of a domain: names folded to lower case
/// without underscores, native types left out.
fn shape(domain: &Domain) -> Vec<String> {
    fn fold(s: &str) -> String {
        s.replace('_', "").to_lowercase()
    }
    fn key(k: &TypeKey) -> String {
        fold(&k.name)
    }
    let clr = |c: Option<ClrType>| c.map(|c| c.to_string()).unwrap_or_default();

    let mut lines = Vec::new();
    for t in &domain.types {
        lines.push(format!("type {} constraints={}", fold(&t.name), t.constraints.len()));
        for f in &t.fields {
            lines.push(format!(
                "  field {} {} key={} req={} gen={} computed={} size={:?} ref={:?}",
                fold(&f.name),
                clr(f.clr_type),
                f.is_key,
                f.is_required,
                f.is_generated,
                f.is_computed,
                f.size,
                f.references.as_ref().map(|r| (key(&r.type_key), fold(&r.field))),
            ));
        }
    }
    for op in &domain.operations {
        lines.push(format!(
            "op {} {:?} related={:?} returns={:?} {} multiple={} type={:?}",
            fold(&op.name),
            op.kind,
            op.related_type.as_ref().map(key),
            op.returns.kind,
            clr(op.returns.clr_type),
            op.returns.multiple,
            op.returns.type_key.as_ref().map(key),
        ));
        for p in &op.parameters {
            lines.push(format!(
                "  param {} {} req={} field={:?} result={:?}",
                fold(&p.name),
                clr(p.clr_type),
                p.is_required,
                p.related_type_field.as_deref().map(fold),
                p.result_type.as_ref().map(key),
            ));
        }
    }
    for r in &domain.result_types {
        lines.push(format!(
            "result {} custom={} related={:?} ops={}",
            fold(&r.name),
            r.is_custom_type,
            r.related_type.as_ref().map(key),
            r.operations.len()
        ));
        for f in &r.fields {
            lines.push(format!(
                "  field {} {} key={} req={}",
                fold(&f.name),
                clr(f.clr_type),
                f.is_key,
                f.is_required
            ));
        }
    }
    lines
}

#[tokio::test]
async fn test_providers_produce_identical_shape() {
    let postgres = inspect(POSTGRES_SHOP).await.unwrap();
    let sqlserver = inspect(SQLSERVER_SHOP).await.unwrap();

    assert_eq!(postgres.types.len(), 2);
    assert_eq!(postgres.operations.len(), 7);
    assert_eq!(postgres.result_types.len(), 2);
    assert_eq!(shape(&postgres), shape(&sqlserver));
}
