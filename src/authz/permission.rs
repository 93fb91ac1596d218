use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::PermissionError;

const WILDCARD: &str = "*";
const PART_DIVIDER: char = ':';
const SUBPART_DIVIDER: char = ',';

/// A wildcard permission such as `registry:pull,push:library/*`.
///
/// Parts are separated by `:`, each part is either `*` or a comma separated list of tokens.
/// Matching is case-insensitive.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Permission {
    raw: String,
    parts: Vec<BTreeSet<String>>,
}

impl Permission {
    pub fn new(value: &str) -> Result<Self, PermissionError> {
        let raw = value.trim();
        if raw.is_empty() {
            return Err(PermissionError::Empty);
        }

        let mut parts = Vec::new();
        for part in raw.split(PART_DIVIDER) {
            let tokens: BTreeSet<String> = part
                .split(SUBPART_DIVIDER)
                .map(|token| token.trim().to_lowercase())
                .filter(|token| !token.is_empty())
                .collect();

            if tokens.is_empty() {
                return Err(PermissionError::EmptyPart(raw.to_string()));
            }
            parts.push(tokens);
        }

        Ok(Self {
            raw: raw.to_string(),
            parts,
        })
    }

    /// Returns `true` if holding `self` grants everything `other` describes.
    ///
    /// Missing trailing parts of `self` imply everything; trailing parts of `self` beyond the
    /// length of `other` only imply when they are wildcards.
    pub fn implies(&self, other: &Permission) -> bool {
        for (index, other_part) in other.parts.iter().enumerate() {
            let Some(part) = self.parts.get(index) else {
                return true;
            };

            if !part.contains(WILDCARD) && !part.is_superset(other_part) {
                return false;
            }
        }

        self.parts
            .iter()
            .skip(other.parts.len())
            .all(|part| part.contains(WILDCARD))
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for Permission {
    type Err = PermissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::new(s)
    }
}

impl TryFrom<String> for Permission {
    type Error = PermissionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Permission::new(&value)
    }
}

impl From<Permission> for String {
    fn from(permission: Permission) -> Self {
        permission.raw
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}
