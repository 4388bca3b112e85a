//! Stages 1 and 2: tables and their references.

use tracing::{debug, info, warn};

use crate::core::attributes::Attributes;
use crate::core::schema::{ForeignKeyRow, KeyKind, TableRow};
use crate::core::traits::{CatalogReader, Dialect};
use crate::drivers::DialectImpl;
use crate::error::{Result, SchemaError};
use crate::model::{ApplicationType, Constraint, Domain, Field, FieldReference, TypeKey};

use super::TypeProvider;

fn find_field_mut<'a>(
    dialect: &DialectImpl,
    fields: &'a mut [Field],
    name: &str,
) -> Option<&'a mut Field> {
    fields.iter_mut().find(|f| dialect.names_equal(&f.name, name))
}

impl<C: CatalogReader> TypeProvider<C> {
    /// Load every table outside the excluded schemas and resolve foreign keys.
    pub async fn get_domain(&self) -> Result<Domain> {
        let mut domain = self.empty_domain();
        let dialect = domain.dialect();

        let tables = self.catalog.tables(&self.settings.excluded_schemas).await?;
        info!("Found {} tables", tables.len());

        let mut pending = Vec::with_capacity(tables.len());
        for table in &tables {
            let app_type = self.load_table(&dialect, table).await?;
            let foreign_keys = self.catalog.foreign_keys(table).await?;
            pending.push((app_type.key(), foreign_keys));
            domain.types.push(app_type);
        }

        let mut resolved = 0;
        for (owner, foreign_keys) in &pending {
            resolved += resolve_foreign_keys(&mut domain, owner, foreign_keys)?;
        }
        info!("Resolved {} foreign key references", resolved);

        Ok(domain)
    }

    async fn load_table(&self, dialect: &DialectImpl, table: &TableRow) -> Result<ApplicationType> {
        let full_name = table.full_name();
        let mut app_type = ApplicationType::new(&table.schema, &table.name);
        app_type.attributes = Attributes::parse(table.description.as_deref(), &full_name);

        for column in self.catalog.columns(table).await? {
            let owner = format!("{}.{}", full_name, column.name);
            let mut field = Field::new(column.name, column.ordinal, column.native_type);
            field.clr_type = dialect.map_native_type(&field.native_type);
            if field.clr_type.is_none() {
                warn!(
                    "Column {} has unmapped native type '{}'",
                    owner, field.native_type
                );
            }
            field.set_required(false);
            field.size = column.size;
            field.precision = column.precision;
            field.scale = column.scale;
            field.attributes = Attributes::parse(column.description.as_deref(), &owner);
            app_type.fields.push(field);
        }

        for flags in self.catalog.column_flags(table).await? {
            let Some(field) = find_field_mut(dialect, &mut app_type.fields, &flags.name) else {
                warn!("Column flags for unknown column {}.{}", full_name, flags.name);
                continue;
            };
            field.set_required(!flags.is_nullable);
            field.is_computed = flags.is_computed;
            field.is_generated = flags.is_identity
                || flags
                    .default_value
                    .as_deref()
                    .is_some_and(|d| dialect.is_generated_default(d));
            field.default_value = flags.default_value;
        }

        for constraint in self.catalog.key_constraints(table).await? {
            let mut names = Vec::with_capacity(constraint.columns.len());
            for column in &constraint.columns {
                let field = find_field_mut(dialect, &mut app_type.fields, column).ok_or_else(|| {
                    SchemaError::missing_field(
                        &full_name,
                        column,
                        format!("key constraint {}", constraint.name),
                    )
                })?;
                if constraint.kind == KeyKind::Primary {
                    field.is_key = true;
                }
                names.push(field.name.clone());
            }
            app_type
                .constraints
                .push(Constraint::new(constraint.name, constraint.kind, names));
        }

        debug!(
            "Loaded {} ({} fields, {} constraints)",
            full_name,
            app_type.fields.len(),
            app_type.constraints.len()
        );
        Ok(app_type)
    }
}

/// Point each foreign-key field at its target. Returns the number resolved.
///
/// A target table outside the domain (excluded schema) is skipped with a
/// warning; a missing column on either side is fatal.
fn resolve_foreign_keys(
    domain: &mut Domain,
    owner: &TypeKey,
    foreign_keys: &[ForeignKeyRow],
) -> Result<usize> {
    let dialect = domain.dialect();
    let mut resolved = 0;

    for fk in foreign_keys {
        let target_key = TypeKey::new(&fk.ref_schema, &fk.ref_table);
        let Some(target) = domain.find_type(&target_key) else {
            warn!(
                "Foreign key {} on {} references {} which is not in the domain; skipping",
                fk.name, owner, target_key
            );
            continue;
        };
        let target_field = target
            .fields
            .iter()
            .find(|f| dialect.names_equal(&f.name, &fk.ref_column))
            .ok_or_else(|| {
                SchemaError::missing_field(
                    target_key.to_string(),
                    &fk.ref_column,
                    format!("foreign key {} on {}", fk.name, owner),
                )
            })?;
        let reference = FieldReference {
            type_key: target.key(),
            field: target_field.name.clone(),
        };

        let owner_type = domain.find_type_mut(owner).ok_or_else(|| {
            SchemaError::missing_field(owner.to_string(), &fk.column, format!("foreign key {}", fk.name))
        })?;
        let field = find_field_mut(&dialect, &mut owner_type.fields, &fk.column).ok_or_else(|| {
            SchemaError::missing_field(owner.to_string(), &fk.column, format!("foreign key {}", fk.name))
        })?;
        debug!(
            "{}.{} references {}.{}",
            owner, field.name, reference.type_key, reference.field
        );
        field.references = Some(reference);
        resolved += 1;
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use crate::config::GenerationConfig;
    use crate::core::value::{ClrType, ValueKind};
    use crate::drivers::MemoryCatalog;
    use crate::error::SchemaError;
    use crate::model::TypeKey;
    use crate::provider::TypeProvider;

    fn provider(yaml: &str) -> TypeProvider<MemoryCatalog> {
        TypeProvider::new(MemoryCatalog::from_yaml(yaml).unwrap(), GenerationConfig::default())
    }

    const SHOP: &str = r#"
provider: postgres
tables:
  - schema: public
    name: product
    columns:
      - { name: id, native_type: integer, is_nullable: false, default_value: "nextval('product_id_seq'::regclass)" }
      - { name: category_id, native_type: integer, is_nullable: false }
      - { name: name, native_type: character varying, size: 100, is_nullable: false }
      - { name: price, native_type: numeric, is_computed: true }
    constraints:
      - { name: product_pkey, kind: primary, columns: [id] }
      - { name: product_name_key, kind: unique, columns: [name] }
    foreign_keys:
      - { name: fk_category, column: category_id, ref_schema: public, ref_table: category, ref_column: id }
  - schema: public
    name: category
    columns:
      - { name: id, native_type: integer, is_nullable: false, is_identity: true }
      - { name: title, native_type: text, is_nullable: false }
    constraints:
      - { name: category_pkey, kind: primary, columns: [id] }
"#;

    #[tokio::test]
    async fn test_fields_and_flags() {
        let domain = provider(SHOP).get_domain().await.unwrap();
        let product = domain.find_type(&TypeKey::new("public", "product")).unwrap();

        let id = product.field("id").unwrap();
        assert!(id.is_key);
        assert!(id.is_required);
        assert!(id.is_generated);
        assert_eq!(id.clr_type, Some(ClrType::of(ValueKind::Int32)));

        let name = product.field("name").unwrap();
        assert_eq!(name.size, Some(100));
        assert!(!name.is_key);

        let price = product.field("price").unwrap();
        assert!(price.is_computed);
        assert!(!price.is_required);
        assert_eq!(price.clr_type.unwrap().to_string(), "decimal?");

        assert_eq!(product.constraints.len(), 2);
        assert!(product.constraints[1].is_unique());
    }

    #[tokio::test]
    async fn test_forward_reference_resolves() {
        let domain = provider(SHOP).get_domain().await.unwrap();
        let product = domain.find_type(&TypeKey::new("public", "product")).unwrap();
        let reference = product.field("category_id").unwrap().references.clone().unwrap();
        assert_eq!(reference.type_key, TypeKey::new("public", "category"));
        assert_eq!(reference.field, "id");
        assert!(domain.find_field(&reference).is_some());

        let category = domain.find_type(&TypeKey::new("public", "category")).unwrap();
        assert!(category.field("id").unwrap().is_generated);
    }

    #[tokio::test]
    async fn test_excluded_target_is_skipped() {
        let yaml = r#"
provider: postgres
tables:
  - schema: public
    name: invoice
    columns:
      - { name: id, native_type: integer, is_nullable: false }
      - { name: audit_id, native_type: integer }
    foreign_keys:
      - { name: fk_audit, column: audit_id, ref_schema: audit, ref_table: entry, ref_column: id }
  - schema: audit
    name: entry
    columns:
      - { name: id, native_type: integer, is_nullable: false }
"#;
        let settings = GenerationConfig {
            excluded_schemas: vec!["audit".to_string()],
            ..GenerationConfig::default()
        };
        let p = TypeProvider::new(MemoryCatalog::from_yaml(yaml).unwrap(), settings);
        let domain = p.get_domain().await.unwrap();
        assert_eq!(domain.types.len(), 1);
        let invoice = &domain.types[0];
        assert!(invoice.field("audit_id").unwrap().references.is_none());
    }

    #[tokio::test]
    async fn test_missing_key_column_is_fatal() {
        let yaml = r#"
provider: postgres
tables:
  - schema: public
    name: tag
    columns:
      - { name: id, native_type: integer, is_nullable: false }
    constraints:
      - { name: tag_pkey, kind: primary, columns: [tag_id] }
"#;
        let err = provider(yaml).get_domain().await.unwrap_err();
        assert!(matches!(err, SchemaError::MissingField { ref field, .. } if field == "tag_id"));
    }

    #[tokio::test]
    async fn test_missing_reference_column_is_fatal() {
        let yaml = r#"
provider: postgres
tables:
  - schema: public
    name: a
    columns:
      - { name: id, native_type: integer, is_nullable: false }
      - { name: b_id, native_type: integer }
    foreign_keys:
      - { name: fk_b, column: b_id, ref_schema: public, ref_table: b, ref_column: missing }
  - schema: public
    name: b
    columns:
      - { name: id, native_type: integer, is_nullable: false }
"#;
        let err = provider(yaml).get_domain().await.unwrap_err();
        assert!(matches!(err, SchemaError::MissingField { ref table, .. } if table == "public.b"));
    }

    #[tokio::test]
    async fn test_sqlserver_names_match_case_insensitively() {
        let yaml = r#"
provider: sql_server
tables:
  - schema: dbo
    name: Customer
    columns:
      - { name: CustomerId, native_type: int, is_nullable: false, is_identity: true }
      - { name: Name, native_type: nvarchar, size: 50, is_nullable: false }
    constraints:
      - { name: PK_Customer, kind: primary, columns: [customerid] }
"#;
        let domain = provider(yaml).get_domain().await.unwrap();
        let customer = &domain.types[0];
        assert!(customer.field("CustomerId").unwrap().is_key);
        assert_eq!(customer.constraints[0].fields, vec!["CustomerId"]);
    }
}
