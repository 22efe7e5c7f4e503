use std::fmt;

use crate::error::{Result, StorageError};

/// A table or column name that is safe to splice into a statement.
///
/// Names cannot be bound as query parameters, so every name that reaches SQL
/// text goes through this type. Only ASCII letters, digits and underscores are
/// accepted, and the first character may not be a digit.
///
/// # Examples
///
/// ```
/// use storage::models::Identifier;
///
/// let table = Identifier::new("Largest_banks").unwrap();
/// assert_eq!(table.quoted(), "\"Largest_banks\"");
///
/// assert!(Identifier::new("banks; DROP TABLE x").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if Self::is_valid(&name) {
            Ok(Self(name))
        } else {
            Err(StorageError::InvalidIdentifier(name))
        }
    }

    pub fn is_valid(name: &str) -> bool {
        let mut chars = name.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return false,
        }
        chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The name wrapped in double quotes, ready for SQL text.
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for Identifier {
    type Error = StorageError;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_names() {
        assert!(Identifier::new("Largest_banks").is_ok());
        assert!(Identifier::new("MC_GBP_Billion").is_ok());
        assert!(Identifier::new("_private").is_ok());
        assert!(Identifier::new("t2").is_ok());
    }

    #[test]
    fn test_rejects_unsafe_names() {
        assert!(Identifier::new("").is_err());
        assert!(Identifier::new("2fast").is_err());
        assert!(Identifier::new("has space").is_err());
        assert!(Identifier::new("quote\"d").is_err());
        assert!(Identifier::new("drop;--").is_err());
        assert!(Identifier::new("naïve").is_err());
    }

    #[test]
    fn test_quoted_form() {
        let id = Identifier::try_from("Name").unwrap();
        assert_eq!(id.quoted(), "\"Name\"");
        assert_eq!(id.to_string(), "Name");
    }
}
