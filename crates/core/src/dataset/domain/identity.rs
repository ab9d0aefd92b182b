use std::fmt;

use crate::dataset::domain::dataset_repository::DatasetError;

/// Name of a tracked individual; unique key of a dataset.
///
/// Each identity is stored in a directory of the same name, so it must be a
/// single, non-empty path component.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(String);

impl Identity {
    pub fn new(name: impl Into<String>) -> Result<Self, DatasetError> {
        let name = name.into();
        let invalid = name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\', '\0']);
        if invalid {
            return Err(DatasetError::InvalidIdentity(name));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for Identity {
    type Error = DatasetError;

    fn try_from(name: &str) -> Result<Self, Self::Error> {
        Identity::new(name)
    }
}
