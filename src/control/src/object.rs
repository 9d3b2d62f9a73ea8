// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The object-type table.
//!
//! Every tracked Snowflake object kind is a variant of [`ObjectType`], and
//! everything that varies by kind — the catalog listing query, the columns
//! that assemble a fully qualified name, the column that identifies the
//! containing database during filtering, the detailed-to-generic mapping —
//! hangs off the variant rather than off string comparisons scattered
//! through the engine.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::names;

/// A kind of Snowflake object tracked by the reconciler.
///
/// The refined variants (shared/application database, internal/external
/// stage, materialized view, external table) never come out of a catalog
/// scan directly; the object filter splits them out of their raw types
/// before profiles are matched against the inventory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ObjectType {
    Warehouse,
    Database,
    StorageIntegration,
    NotificationIntegration,
    ApiIntegration,
    Schema,
    Table,
    DynamicTable,
    View,
    Stage,
    Pipe,
    Task,
    Stream,
    Tag,
    FileFormat,
    Function,
    Procedure,
    // Generic target of the three integration kinds. Grants name it, scans
    // do not.
    Integration,
    // Refined subtypes produced by the object filter.
    SharedDatabase,
    ApplicationDatabase,
    InternalStage,
    ExternalStage,
    MaterializedView,
    ExternalTable,
}

/// The container a future grant applies within.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Container {
    Database,
    Schema,
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Container::Database => f.write_str("DATABASE"),
            Container::Schema => f.write_str("SCHEMA"),
        }
    }
}

use ObjectType::*;

impl ObjectType {
    /// Every variant, in table order.
    pub const ALL: &'static [ObjectType] = &[
        Warehouse,
        Database,
        StorageIntegration,
        NotificationIntegration,
        ApiIntegration,
        Schema,
        Table,
        DynamicTable,
        View,
        Stage,
        Pipe,
        Task,
        Stream,
        Tag,
        FileFormat,
        Function,
        Procedure,
        Integration,
        SharedDatabase,
        ApplicationDatabase,
        InternalStage,
        ExternalStage,
        MaterializedView,
        ExternalTable,
    ];

    /// The types the inventory scanner issues catalog queries for.
    pub const SCANNED: &'static [ObjectType] = &[
        Warehouse,
        Database,
        StorageIntegration,
        NotificationIntegration,
        ApiIntegration,
        Schema,
        Table,
        DynamicTable,
        View,
        Stage,
        Pipe,
        Task,
        Stream,
        Tag,
        FileFormat,
        Function,
        Procedure,
    ];

    /// The lowercase name used in configuration files and cache documents.
    pub fn name(&self) -> &'static str {
        match self {
            Warehouse => "warehouse",
            Database => "database",
            StorageIntegration => "storage integration",
            NotificationIntegration => "notification integration",
            ApiIntegration => "api integration",
            Schema => "schema",
            Table => "table",
            DynamicTable => "dynamic table",
            View => "view",
            Stage => "stage",
            Pipe => "pipe",
            Task => "task",
            Stream => "stream",
            Tag => "tag",
            FileFormat => "file format",
            Function => "function",
            Procedure => "procedure",
            Integration => "integration",
            SharedDatabase => "shared database",
            ApplicationDatabase => "application database",
            InternalStage => "internal stage",
            ExternalStage => "external stage",
            MaterializedView => "materialized view",
            ExternalTable => "external table",
        }
    }

    /// The uppercase form used in grant tuples and generated SQL.
    pub fn sql_name(&self) -> String {
        self.name().to_uppercase()
    }

    /// Resolves a configuration-file type name.
    pub fn from_config_name(name: &str) -> Option<ObjectType> {
        let name = name.trim().to_lowercase();
        ObjectType::ALL.iter().copied().find(|ty| ty.name() == name)
    }

    /// Resolves a type tag as the platform reports it in grant listings
    /// (uppercase, underscore-separated). Returns `None` for object kinds
    /// the tool does not model, which callers discard.
    pub fn from_platform(name: &str) -> Option<ObjectType> {
        ObjectType::from_config_name(&name.to_lowercase().replace('_', " "))
    }

    /// Maps a detailed type onto the generic type grants are expressed
    /// against.
    pub fn generic(&self) -> ObjectType {
        match self {
            MaterializedView => View,
            ExternalTable => Table,
            InternalStage | ExternalStage => Stage,
            StorageIntegration | NotificationIntegration | ApiIntegration => Integration,
            other => *other,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Function | Procedure)
    }

    /// The catalog listing query for this type.
    ///
    /// Integrations do not support the `in account` qualifier.
    pub fn show_query(&self) -> String {
        match self {
            StorageIntegration | NotificationIntegration | ApiIntegration => {
                format!("show {}s", self.name())
            }
            _ => format!("show {}s in account", self.name()),
        }
    }

    /// The listing columns concatenated into the fully qualified name.
    pub fn full_name_keys(&self) -> &'static [&'static str] {
        match self {
            Warehouse | Database | StorageIntegration | NotificationIntegration
            | ApiIntegration => &["name"],
            Schema => &["database_name", "name"],
            Function | Procedure => &["catalog_name", "schema_name", "arguments"],
            _ => &["database_name", "schema_name", "name"],
        }
    }

    /// The listing column that names the containing database, used when
    /// filtering out shared and ignored containers. `None` for types that
    /// have no meaningful container (account-level objects and the refined
    /// database pseudo-types).
    pub fn filter_identifier(&self) -> Option<&'static str> {
        match self {
            Function | Procedure => Some("catalog_name"),
            Database => Some("name"),
            Warehouse | StorageIntegration | NotificationIntegration | ApiIntegration
            | Integration | SharedDatabase | ApplicationDatabase => None,
            _ => Some("database_name"),
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for ObjectType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for ObjectType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct NameVisitor;

        impl Visitor<'_> for NameVisitor {
            type Value = ObjectType;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object type name")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<ObjectType, E> {
                ObjectType::from_config_name(v)
                    .ok_or_else(|| E::custom(format!("unknown object type {v:?}")))
            }
        }

        deserializer.deserialize_str(NameVisitor)
    }
}

/// What a grant attaches to: the account itself, a role, an existing object
/// of some type, or all future objects of a type within a container.
///
/// The future form renders as `FUTURE <PLURAL-TYPE> IN <CONTAINER>`, which
/// keeps future grants distinct from direct grants on the same type under
/// tuple equality.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GrantOn {
    Account,
    Role,
    Object(ObjectType),
    Future {
        object_type: ObjectType,
        container: Container,
    },
}

impl fmt::Display for GrantOn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrantOn::Account => f.write_str("ACCOUNT"),
            GrantOn::Role => f.write_str("ROLE"),
            GrantOn::Object(ty) => f.write_str(&ty.sql_name()),
            GrantOn::Future {
                object_type,
                container,
            } => write!(
                f,
                "FUTURE {} IN {}",
                names::pluralize(&object_type.sql_name()),
                container
            ),
        }
    }
}

impl FromStr for GrantOn {
    type Err = Error;

    fn from_str(s: &str) -> Result<GrantOn, Error> {
        let upper = s.trim().to_uppercase();
        if upper == "ACCOUNT" {
            return Ok(GrantOn::Account);
        }
        if upper == "ROLE" {
            return Ok(GrantOn::Role);
        }
        if let Some(rest) = upper.strip_prefix("FUTURE ") {
            let (plural, container) =
                rest.rsplit_once(" IN ")
                    .ok_or_else(|| Error::UnknownGrantTarget {
                        value: s.to_string(),
                    })?;
            let container = match container {
                "DATABASE" => Container::Database,
                "SCHEMA" => Container::Schema,
                _ => {
                    return Err(Error::UnknownGrantTarget {
                        value: s.to_string(),
                    })
                }
            };
            let object_type = ObjectType::ALL
                .iter()
                .copied()
                .find(|ty| names::pluralize(&ty.sql_name()) == plural)
                .ok_or_else(|| Error::UnknownGrantTarget {
                    value: s.to_string(),
                })?;
            return Ok(GrantOn::Future {
                object_type,
                container,
            });
        }
        match ObjectType::from_platform(&upper) {
            Some(ty) => Ok(GrantOn::Object(ty)),
            None => Err(Error::UnknownGrantTarget {
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_names_round_trip() {
        for ty in ObjectType::ALL {
            assert_eq!(ObjectType::from_config_name(ty.name()), Some(*ty));
        }
    }

    #[test]
    fn platform_tags_resolve() {
        assert_eq!(ObjectType::from_platform("TABLE"), Some(Table));
        assert_eq!(
            ObjectType::from_platform("MATERIALIZED_VIEW"),
            Some(MaterializedView)
        );
        assert_eq!(ObjectType::from_platform("FILE_FORMAT"), Some(FileFormat));
        // New platform kinds the tool does not model are discarded upstream.
        assert_eq!(ObjectType::from_platform("SEMANTIC_VIEW"), None);
    }

    #[test]
    fn detailed_types_generalize() {
        assert_eq!(MaterializedView.generic(), View);
        assert_eq!(ExternalTable.generic(), Table);
        assert_eq!(InternalStage.generic(), Stage);
        assert_eq!(ExternalStage.generic(), Stage);
        assert_eq!(StorageIntegration.generic(), Integration);
        assert_eq!(Table.generic(), Table);
    }

    #[test]
    fn grant_on_display_parses_back() {
        let cases = [
            GrantOn::Account,
            GrantOn::Role,
            GrantOn::Object(Table),
            GrantOn::Object(DynamicTable),
            GrantOn::Future {
                object_type: Table,
                container: Container::Schema,
            },
            GrantOn::Future {
                object_type: Schema,
                container: Container::Database,
            },
        ];
        for on in cases {
            assert_eq!(on.to_string().parse::<GrantOn>().unwrap(), on);
        }
    }

    #[test]
    fn future_tag_never_matches_direct_tag() {
        let direct = GrantOn::Object(Table).to_string();
        let future = GrantOn::Future {
            object_type: Table,
            container: Container::Schema,
        }
        .to_string();
        assert_eq!(future, "FUTURE TABLES IN SCHEMA");
        assert_ne!(direct, future);
    }
}
