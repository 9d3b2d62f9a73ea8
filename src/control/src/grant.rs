// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::ser::{SerializeTuple, Serializer};
use serde::{Deserialize, Serialize};

use crate::object::GrantOn;

/// A single grant: a privilege held on a target, by whichever role or user
/// the surrounding plan entry belongs to.
///
/// Canonical form: privilege and object name are upper-cased at
/// construction, and the target renders as the upper-cased type tag. Two
/// grants are equal iff all three fields are. Plan files serialize a grant
/// as a `[privilege, object_type, object_name]` triple.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Grant {
    pub privilege: String,
    pub on: GrantOn,
    pub name: String,
}

impl Grant {
    pub fn new(privilege: &str, on: GrantOn, name: &str) -> Grant {
        Grant {
            privilege: privilege.trim().to_uppercase(),
            on,
            name: name.trim().to_uppercase(),
        }
    }

    /// The containing database of the grant's target, taken as the leading
    /// component of the fully qualified name.
    pub fn database(&self) -> &str {
        self.name.split('.').next().unwrap_or("")
    }
}

impl fmt::Display for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ON {} {}", self.privilege, self.on, self.name)
    }
}

// Display order for plans and statements: target type, then object name,
// then privilege.
impl Ord for Grant {
    fn cmp(&self, other: &Grant) -> Ordering {
        (self.on.to_string(), &self.name, &self.privilege).cmp(&(
            other.on.to_string(),
            &other.name,
            &other.privilege,
        ))
    }
}

impl PartialOrd for Grant {
    fn partial_cmp(&self, other: &Grant) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Serialize for Grant {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut triple = serializer.serialize_tuple(3)?;
        triple.serialize_element(&self.privilege)?;
        triple.serialize_element(&self.on.to_string())?;
        triple.serialize_element(&self.name)?;
        triple.end()
    }
}

impl<'de> Deserialize<'de> for Grant {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Grant, D::Error> {
        let (privilege, on, name) = <(String, String, String)>::deserialize(deserializer)?;
        let on = GrantOn::from_str(&on).map_err(de::Error::custom)?;
        Ok(Grant::new(&privilege, on, &name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Container, ObjectType};

    #[test]
    fn canonical_form_uppercases() {
        let g = Grant::new("select", GrantOn::Object(ObjectType::Table), "db.s.t1");
        assert_eq!(g.privilege, "SELECT");
        assert_eq!(g.name, "DB.S.T1");
        assert_eq!(g.database(), "DB");
    }

    #[test]
    fn future_and_direct_grants_are_distinct() {
        let direct = Grant::new("SELECT", GrantOn::Object(ObjectType::Table), "SALES");
        let future = Grant::new(
            "SELECT",
            GrantOn::Future {
                object_type: ObjectType::Table,
                container: Container::Schema,
            },
            "SALES",
        );
        assert_ne!(direct, future);
    }

    #[test]
    fn ordering_is_type_then_name_then_privilege() {
        let mut grants = vec![
            Grant::new("SELECT", GrantOn::Object(ObjectType::View), "DB.S.V"),
            Grant::new("INSERT", GrantOn::Object(ObjectType::Table), "DB.S.T2"),
            Grant::new("SELECT", GrantOn::Object(ObjectType::Table), "DB.S.T1"),
            Grant::new("DELETE", GrantOn::Object(ObjectType::Table), "DB.S.T1"),
        ];
        grants.sort();
        let rendered: Vec<_> = grants.iter().map(|g| g.to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                "DELETE ON TABLE DB.S.T1",
                "SELECT ON TABLE DB.S.T1",
                "INSERT ON TABLE DB.S.T2",
                "SELECT ON VIEW DB.S.V",
            ]
        );
    }

    #[test]
    fn serializes_as_triple() {
        let g = Grant::new(
            "SELECT",
            GrantOn::Future {
                object_type: ObjectType::Table,
                container: Container::Schema,
            },
            "SALES",
        );
        let json = serde_json::to_string(&g).unwrap();
        assert_eq!(json, r#"["SELECT","FUTURE TABLES IN SCHEMA","SALES"]"#);
        let back: Grant = serde_json::from_str(&json).unwrap();
        assert_eq!(back, g);
    }
}
