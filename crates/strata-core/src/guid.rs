// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Stable actor identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A globally unique, persistent identifier for an actor.
///
/// The GUID is the primary key of every actor descriptor. It survives renames,
/// moves between folders, and re-saves, so references between actors are
/// expressed exclusively in terms of GUIDs.
///
/// The textual form is 32 uppercase hexadecimal digits without separators,
/// which is also the form written to build manifests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ActorGuid(Uuid);

impl ActorGuid {
    /// The invalid, all-zero GUID.
    pub const NIL: Self = Self(Uuid::nil());

    /// Creates a new, random (version 4) `ActorGuid`.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a deterministic (version 5) `ActorGuid` from a name.
    ///
    /// Generated actors use this so that regenerating the same content yields
    /// the same identity, turning a regeneration into an edit instead of a
    /// delete followed by an add.
    pub fn from_name(name: &str) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()))
    }

    /// Builds a GUID from its raw 128-bit value.
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    /// Returns `true` unless this is [`ActorGuid::NIL`].
    pub fn is_valid(&self) -> bool {
        !self.0.is_nil()
    }
}

impl Default for ActorGuid {
    /// Creates a new, random (version 4) `ActorGuid`.
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActorGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032X}", self.0.as_u128())
    }
}

/// An error returned when a string is not a valid GUID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseGuidError(String);

impl fmt::Display for ParseGuidError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not a valid actor GUID", self.0)
    }
}

impl std::error::Error for ParseGuidError {}

impl FromStr for ActorGuid {
    type Err = ParseGuidError;

    /// Accepts both the 32-digit form and the hyphenated form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| ParseGuidError(s.to_string()))
    }
}

impl From<ActorGuid> for String {
    fn from(guid: ActorGuid) -> Self {
        guid.to_string()
    }
}

impl TryFrom<String> for ActorGuid {
    type Error = ParseGuidError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_32_uppercase_hex_digits() {
        let guid = ActorGuid::from_u128(0x00ab_cdef_0000_0000_0000_0000_0000_0001);
        let text = guid.to_string();
        assert_eq!(text, "00ABCDEF000000000000000000000001");
        assert_eq!(text.len(), 32);
    }

    #[test]
    fn test_parse_accepts_simple_and_hyphenated_forms() {
        let guid = ActorGuid::from_u128(42);
        let simple: ActorGuid = guid.to_string().parse().unwrap();
        let hyphenated: ActorGuid = "00000000-0000-0000-0000-00000000002a".parse().unwrap();
        assert_eq!(simple, guid);
        assert_eq!(hyphenated, guid);
        assert!("not-a-guid".parse::<ActorGuid>().is_err());
    }

    #[test]
    fn test_from_name_is_deterministic() {
        let a = ActorGuid::from_name("World/HLOD0/Cell_X0_Y0");
        let b = ActorGuid::from_name("World/HLOD0/Cell_X0_Y0");
        let c = ActorGuid::from_name("World/HLOD0/Cell_X1_Y0");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.is_valid());
        assert!(!ActorGuid::NIL.is_valid());
    }

    #[test]
    fn test_serde_uses_textual_form() {
        let guid = ActorGuid::from_u128(7);
        let json = serde_json::to_string(&guid).unwrap();
        assert_eq!(json, "\"00000000000000000000000000000007\"");
        let back: ActorGuid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, guid);
    }
}
