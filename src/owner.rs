//! The owner reference that every transaction and aggregate belongs to.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

/// A newtype wrapper for integer owner IDs.
///
/// The owner is the account holder established by the identity layer in front
/// of the ledger. The ledger treats it as an opaque reference and never
/// verifies it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
pub struct OwnerId(i64);

impl OwnerId {
    /// Create a new owner ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the owner ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for OwnerId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse()
            .map(OwnerId::new)
            .map_err(|_| Error::MissingOwner)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Error, OwnerId};

    #[test]
    fn parses_integer_ids() {
        assert_eq!(" 42 ".parse::<OwnerId>(), Ok(OwnerId::new(42)));
    }

    #[test]
    fn rejects_empty_and_non_numeric_ids() {
        assert_eq!("".parse::<OwnerId>(), Err(Error::MissingOwner));
        assert_eq!("alice".parse::<OwnerId>(), Err(Error::MissingOwner));
    }
}
