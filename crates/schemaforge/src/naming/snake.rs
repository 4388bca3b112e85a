//! snake_case naming convention, the PostgreSQL default.

use super::NamingConvention;

/// Splits on underscores and composes lower-case, underscore-joined names.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnakeCaseConvention;

impl NamingConvention for SnakeCaseConvention {
    fn name(&self) -> &'static str {
        "snake_case"
    }

    fn get_name_parts(&self, name: &str) -> Vec<String> {
        name.split('_')
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn create_name_from_fragments(&self, parts: &[String]) -> String {
        parts
            .iter()
            .filter(|part| !part.is_empty())
            .map(|part| part.to_lowercase())
            .collect::<Vec<_>>()
            .join("_")
    }

    fn parameter_name_from_field(&self, field_name: &str) -> String {
        let mut parts = self.get_name_parts(field_name);
        if parts.is_empty() {
            return field_name.to_string();
        }
        parts.push("param".to_string());
        self.create_name_from_fragments(&parts)
    }
}
