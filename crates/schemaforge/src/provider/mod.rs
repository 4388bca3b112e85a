//! The type provider: catalog rows in, domain model out.
//!
//! A run reads the catalog in three stages:
//!
//! 1. **Tables**: every table becomes an [`ApplicationType`](crate::model::ApplicationType)
//!    with typed fields, nullability, generated and computed flags, and key
//!    constraints
//! 2. **References**: foreign keys are resolved once every table is loaded,
//!    so declaration order never matters
//! 3. **Operations**: routines become operations with typed parameters and
//!    an inferred return shape, synthesizing result types along the way
//!
//! The provider also diffs two domains into DROP statements for objects a
//! previous run generated.

mod drop;
mod operations;
mod tables;

pub use drop::generate_drop_statements;

use std::time::Instant;

use tracing::{info, warn};

use crate::config::{Config, GenerationConfig};
use crate::core::traits::{CatalogReader, ProviderKind};
use crate::drivers::{CatalogImpl, DialectImpl};
use crate::error::Result;
use crate::model::Domain;

/// Builds domains from one database catalog.
pub struct TypeProvider<C: CatalogReader = CatalogImpl> {
    catalog: C,
    settings: GenerationConfig,
}

impl TypeProvider<CatalogImpl> {
    /// Connect to the configured database.
    pub async fn connect(config: &Config) -> Result<Self> {
        let catalog = CatalogImpl::connect(&config.database).await?;
        Ok(Self::new(catalog, config.generation.clone()))
    }
}

impl<C: CatalogReader> TypeProvider<C> {
    pub fn new(catalog: C, settings: GenerationConfig) -> Self {
        Self { catalog, settings }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn settings(&self) -> &GenerationConfig {
        &self.settings
    }

    pub fn provider(&self) -> ProviderKind {
        self.catalog.provider()
    }

    pub fn dialect(&self) -> DialectImpl {
        DialectImpl::for_provider(self.provider())
    }

    /// An empty domain configured for this provider.
    fn empty_domain(&self) -> Domain {
        let kind = self.provider();
        Domain::new(
            kind,
            self.settings.naming_for(kind),
            self.settings.namespace_for(kind),
        )
    }

    /// Read tables and operations, then check the result.
    pub async fn inspect(&self) -> Result<Domain> {
        let start = Instant::now();
        info!("Inspecting {} catalog", self.provider());

        let mut domain = self.get_domain().await?;
        self.get_operations(&mut domain).await?;

        for problem in domain.validate_references() {
            warn!("{}", problem);
        }
        for warning in domain.sanity_check() {
            warn!("{}", warning);
        }

        info!(
            "Inspection complete: {} types, {} operations, {} result types in {:.2}s",
            domain.types.len(),
            domain.operations.len(),
            domain.result_types.len(),
            start.elapsed().as_secs_f64()
        );
        Ok(domain)
    }

    /// Check the catalog connection.
    pub async fn health_check(&self) -> Result<()> {
        self.catalog.test_connection().await
    }

    /// DROP statements for objects `old` generated that `new` no longer has.
    pub fn generate_drop_statements(&self, old: &Domain, new: &Domain) -> Result<Vec<String>> {
        generate_drop_statements(old, new)
    }

    /// Generate and execute the drop diff, returning the statements run.
    pub async fn drop_generated(&self, old: &Domain, new: &Domain) -> Result<Vec<String>> {
        let statements = generate_drop_statements(old, new)?;
        if statements.is_empty() {
            info!("No generated objects to drop");
            return Ok(statements);
        }

        info!("Dropping {} generated objects", statements.len());
        for statement in &statements {
            info!("Executing: {}", statement);
            self.catalog.execute(statement).await?;
        }
        Ok(statements)
    }

    /// Create freshly generated objects in the database.
    ///
    /// A no-op unless `generation.register_generated` is set. Returns the
    /// number of statements executed.
    pub async fn register_generated(&self, statements: &[String]) -> Result<usize> {
        if !self.settings.register_generated {
            info!(
                "Skipping registration of {} statements (register_generated is off)",
                statements.len()
            );
            return Ok(0);
        }

        for statement in statements {
            self.catalog.execute(statement).await?;
        }
        info!("Registered {} generated objects", statements.len());
        Ok(statements.len())
    }

    pub async fn close(&self) {
        self.catalog.close().await;
    }
}

/// Split `schema.name`; a bare name has no schema.
fn split_qualified(name: &str) -> (Option<&str>, &str) {
    match name.split_once('.') {
        Some((schema, rest)) if !schema.is_empty() && !rest.is_empty() => (Some(schema), rest),
        _ => (None, name),
    }
}
