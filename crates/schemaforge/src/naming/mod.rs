//! Naming conventions (Strategy pattern).
//!
//! A convention decomposes raw database identifiers into word parts, composes
//! identifiers back from parts, and recognises the role names the domain model
//! depends on (tracking timestamps, tracking users, the security user
//! parameter). Role recognition works on lower-cased parts, so both
//! conventions agree on semantics and differ only in casing.
//!
//! - [`SnakeCaseConvention`]: `customer_address`, splits on underscores
//! - [`PascalCaseConvention`]: `CustomerAddress`, splits on case transitions

mod pascal;
mod snake;

pub use pascal::PascalCaseConvention;
pub use snake::SnakeCaseConvention;

use serde::{Deserialize, Serialize};

/// Suffixes that may follow `created` / `modified` in a timestamp field name.
const TIMESTAMP_SUFFIXES: &[&str] = &["at", "on", "date", "time", "timestamp", "utc", "datetime"];

const MODIFIED_WORDS: &[&str] = &["modified", "updated", "changed"];

/// Identifier casing policy.
pub trait NamingConvention: Send + Sync + std::fmt::Debug {
    /// Convention name for logging.
    fn name(&self) -> &'static str;

    /// Split a raw identifier into its word parts.
    ///
    /// An empty name yields no parts; callers use the original name verbatim.
    fn get_name_parts(&self, name: &str) -> Vec<String>;

    /// Compose an identifier in this convention's casing.
    fn create_name_from_fragments(&self, parts: &[String]) -> String;

    /// Conventional parameter name for a field (`id` -> `id_param`).
    fn parameter_name_from_field(&self, field_name: &str) -> String;

    /// Lower-cased parts, the basis for role recognition.
    fn lower_parts(&self, name: &str) -> Vec<String> {
        self.get_name_parts(name)
            .into_iter()
            .map(|p| p.to_lowercase())
            .collect()
    }

    /// Name of the parameter carrying the calling user's id.
    fn security_user_id_parameter_name(&self) -> String {
        self.create_name_from_fragments(&fragments(&["current", "user", "id"]))
    }

    /// Conventional name of the result type synthesized for an operation.
    fn result_type_name(&self, operation_name: &str) -> String {
        let mut parts = self.get_name_parts(operation_name);
        if parts.is_empty() {
            parts.push(operation_name.to_string());
        }
        parts.push("result".to_string());
        self.create_name_from_fragments(&parts)
    }

    fn is_created_timestamp_field(&self, name: &str) -> bool {
        let parts = self.lower_parts(name);
        let words: Vec<&str> = parts.iter().map(String::as_str).collect();
        match words.as_slice() {
            ["created"] => true,
            ["created", suffix] => TIMESTAMP_SUFFIXES.contains(suffix),
            ["creation" | "create", "date" | "time" | "timestamp"] => true,
            ["date", "created"] => true,
            _ => false,
        }
    }

    fn is_modified_timestamp_field(&self, name: &str) -> bool {
        let parts = self.lower_parts(name);
        let words: Vec<&str> = parts.iter().map(String::as_str).collect();
        let words = match words.as_slice() {
            ["last", rest @ ..] => rest,
            other => other,
        };
        match words {
            [word] => MODIFIED_WORDS.contains(word),
            [first, second] => {
                (MODIFIED_WORDS.contains(first) && TIMESTAMP_SUFFIXES.contains(second))
                    || (*first == "date" && MODIFIED_WORDS.contains(second))
            }
            _ => false,
        }
    }

    fn is_created_by_field(&self, name: &str) -> bool {
        let parts = self.lower_parts(name);
        let words: Vec<&str> = parts.iter().map(String::as_str).collect();
        match words.as_slice() {
            ["created", "by"] | ["owner", "id"] => true,
            ["created", "by", rest @ ..] => is_user_suffix(rest),
            _ => false,
        }
    }

    fn is_modified_by_field(&self, name: &str) -> bool {
        let parts = self.lower_parts(name);
        let words: Vec<&str> = parts.iter().map(String::as_str).collect();
        match words.as_slice() {
            [word, "by"] => MODIFIED_WORDS.contains(word),
            [word, "by", rest @ ..] => MODIFIED_WORDS.contains(word) && is_user_suffix(rest),
            _ => false,
        }
    }

    fn is_soft_delete_field(&self, name: &str) -> bool {
        let parts = self.lower_parts(name);
        let words: Vec<&str> = parts.iter().map(String::as_str).collect();
        match words.as_slice() {
            ["deleted"] | ["is", "deleted"] => true,
            ["deleted", suffix] => TIMESTAMP_SUFFIXES.contains(suffix),
            _ => false,
        }
    }

    fn is_security_user_id_parameter(&self, name: &str) -> bool {
        let parts = self.lower_parts(name);
        let words: Vec<&str> = parts.iter().map(String::as_str).collect();
        matches!(
            words.as_slice(),
            ["current" | "security", "user", "id"]
        )
    }

    /// Case- and separator-insensitive form used for fuzzy name matching.
    fn canonical(&self, name: &str) -> String {
        let parts = self.lower_parts(name);
        if parts.is_empty() {
            name.to_lowercase()
        } else {
            parts.concat()
        }
    }
}

fn is_user_suffix(rest: &[&str]) -> bool {
    matches!(rest, ["user"] | ["id"] | ["user", "id"])
}

fn fragments(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

/// Serializable selector for the two conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NamingStyle {
    #[default]
    SnakeCase,
    PascalCase,
}

static SNAKE_CASE: SnakeCaseConvention = SnakeCaseConvention;
static PASCAL_CASE: PascalCaseConvention = PascalCaseConvention;

impl NamingStyle {
    /// The shared convention instance for this style.
    pub fn convention(self) -> &'static dyn NamingConvention {
        match self {
            NamingStyle::SnakeCase => &SNAKE_CASE,
            NamingStyle::PascalCase => &PASCAL_CASE,
        }
    }

    /// Parse a style from configuration text.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "snake_case" | "snake" => Some(NamingStyle::SnakeCase),
            "pascal_case" | "pascal" => Some(NamingStyle::PascalCase),
            _ => None,
        }
    }
}
