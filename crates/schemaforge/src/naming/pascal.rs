//! PascalCase naming convention, the SQL Server default.

use super::NamingConvention;

/// Splits purely on case transitions; a run of capitals is one part.
///
/// `AutomaticXMLFormat` splits into `Automatic`, `XML`, `Format`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PascalCaseConvention;

impl NamingConvention for PascalCaseConvention {
    fn name(&self) -> &'static str {
        "PascalCase"
    }

    fn get_name_parts(&self, name: &str) -> Vec<String> {
        let chars: Vec<char> = name.chars().collect();
        let mut parts = Vec::new();
        let mut current = String::new();

        for (i, &c) in chars.iter().enumerate() {
            if i > 0 && c.is_uppercase() {
                let prev = chars[i - 1];
                let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
                // Word start after a lower-case letter or digit, or the last
                // capital of an acronym run that begins the next word.
                let boundary = prev.is_lowercase()
                    || prev.is_ascii_digit()
                    || (prev.is_uppercase() && next_is_lower);
                if boundary && !current.is_empty() {
                    parts.push(std::mem::take(&mut current));
                }
            }
            current.push(c);
        }

        if !current.is_empty() {
            parts.push(current);
        }
        parts
    }

    fn create_name_from_fragments(&self, parts: &[String]) -> String {
        parts.iter().map(|part| capitalize(part)).collect()
    }

    fn parameter_name_from_field(&self, field_name: &str) -> String {
        let mut chars = field_name.chars();
        match chars.next() {
            Some(first) => first.to_lowercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

fn capitalize(part: &str) -> String {
    let mut chars = part.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acronym_run_is_one_part() {
        assert_eq!(
            PascalCaseConvention.get_name_parts("AutomaticXMLFormat"),
            vec!["Automatic", "XML", "Format"]
        );
    }

    #[test]
    fn test_trailing_acronym() {
        assert_eq!(
            PascalCaseConvention.get_name_parts("CustomerID"),
            vec!["Customer", "ID"]
        );
    }

    #[test]
    fn test_camel_case_input() {
        assert_eq!(
            PascalCaseConvention.get_name_parts("currentUserId"),
            vec!["current", "User", "Id"]
        );
    }

    #[test]
    fn test_single_word_is_one_part() {
        assert_eq!(PascalCaseConvention.get_name_parts("Product"), vec!["Product"]);
        assert_eq!(PascalCaseConvention.get_name_parts("lowercase"), vec!["lowercase"]);
    }

    #[test]
    fn test_empty_name_has_no_parts() {
        assert!(PascalCaseConvention.get_name_parts("").is_empty());
    }

    #[test]
    fn test_round_trip() {
        let conv = PascalCaseConvention;
        for name in ["AutomaticXMLFormat", "ProductCategory", "Id", "CreatedByUserId"] {
            let parts = conv.get_name_parts(name);
            assert_eq!(conv.create_name_from_fragments(&parts), name);
        }
    }

    #[test]
    fn test_compose_capitalizes_lower_parts() {
        let parts = vec!["created".to_string(), "by".to_string()];
        assert_eq!(PascalCaseConvention.create_name_from_fragments(&parts), "CreatedBy");
    }

    #[test]
    fn test_parameter_name_from_field() {
        assert_eq!(PascalCaseConvention.parameter_name_from_field("CategoryId"), "categoryId");
        assert_eq!(PascalCaseConvention.parameter_name_from_field(""), "");
    }
}
