use derive_more::{AsRef, Display};

/// Display name of a catalog item or routine.
#[derive(AsRef, Debug, Display, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Name(String);

impl Name {
    pub const MAX_LEN: usize = 100;

    /// Surrounding whitespace is dropped; the length is counted in characters.
    pub fn new(name: &str) -> Result<Self, NameError> {
        match name.trim() {
            "" => Err(NameError::Empty),
            trimmed => match trimmed.chars().count() {
                len if len > Self::MAX_LEN => Err(NameError::TooLong(len)),
                _ => Ok(Name(trimmed.to_owned())),
            },
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Name {
    type Error = NameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Name::new(&value)
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum NameError {
    #[error("Name must not be empty")]
    Empty,
    #[error("Name must be 100 characters or fewer ({0} > 100)")]
    TooLong(usize),
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("Push-up", Ok(Name("Push-up".to_string())))]
    #[case("  Leg Press  ", Ok(Name("Leg Press".to_string())))]
    #[case("", Err(NameError::Empty))]
    #[case("   ", Err(NameError::Empty))]
    fn test_name_new(#[case] name: &str, #[case] expected: Result<Name, NameError>) {
        assert_eq!(Name::new(name), expected);
    }

    #[test]
    fn test_name_too_long() {
        assert_eq!(Name::new(&"A".repeat(101)), Err(NameError::TooLong(101)));
        assert!(Name::new(&"A".repeat(100)).is_ok());
    }

    #[test]
    fn test_name_try_from_string() {
        assert_eq!(
            Name::try_from(String::from(" Chest ")).unwrap().as_str(),
            "Chest"
        );
    }
}
