// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the reconciliation engine.
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the [`sc_snowflake_client`] crate.
    #[error(transparent)]
    Client(#[from] sc_snowflake_client::Error),
    /// An I/O error against the cache/plan files.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// An error (de)serializing a cache or plan document.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// An invalid regular expression in a profile pattern or ignore list.
    #[error(transparent)]
    Pattern(#[from] regex::Error),
    /// A configuration file that could not be read.
    #[error("unable to read config file {}", path.display())]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A configuration file that could not be parsed.
    #[error("unable to parse config file {}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    /// A callable whose name does not carry the parenthesized signature the
    /// platform is expected to emit. Signals an unrecognized output format,
    /// not a per-record condition.
    #[error("unrecognized callable signature in {name:?}")]
    MalformedCallable { name: String },
    /// A profile pattern referencing a template parameter the role
    /// configuration does not supply.
    #[error("pattern {pattern:?} references missing template parameter {parameter:?}")]
    MissingTemplateParameter { pattern: String, parameter: String },
    /// An object type name that does not resolve in the object-type table.
    #[error("unknown object type {name:?} in {context}")]
    UnknownObjectType { name: String, context: String },
    /// An atomic group a profile references but the group table lacks.
    #[error("unknown atomic group {group:?} for object type {object_type:?}")]
    UnknownAtomicGroup { object_type: String, group: String },
    /// A profile a role references but the profile file lacks.
    #[error("unknown profile {name:?}")]
    UnknownProfile { name: String },
    /// A role requested for planning that has no configuration.
    #[error("role {name:?} has no configuration")]
    UnknownRole { name: String },
    /// A profile entry whose shape does not fit its object type.
    #[error("profile {profile:?}: malformed entry for object type {object_type:?}")]
    ProfileShape { profile: String, object_type: String },
    /// A grant target tag that cannot be parsed back from a plan document.
    #[error("unknown grant target {value:?}")]
    UnknownGrantTarget { value: String },
    /// A result set missing a column the projection is contracted to yield.
    #[error("result of {statement:?} is missing column {column:?}")]
    MissingColumn { statement: String, column: String },
    /// A user delta holding anything but a role membership grant. Contract
    /// breach: user plans only ever move `USAGE` on `ROLE`.
    #[error(
        "user grant contract violated: privilege {privilege:?} on {object_type:?}"
    )]
    UserGrantContract {
        privilege: String,
        object_type: String,
    },
    /// An apply attempted without the top administrative role.
    #[error("plans can only be applied as ACCOUNTADMIN, not {role:?}")]
    NotAccountAdmin { role: String },
    /// A planning or apply run that needs the object inventory before `sync`
    /// has produced one.
    #[error("no cached object inventory at {}; run `control sync` first", path.display())]
    NoCachedInventory { path: PathBuf },
    /// A show/sql/apply run before `plan` has produced a plan.
    #[error("no cached plan at {}; run `control plan` first", path.display())]
    NoCachedPlan { path: PathBuf },
}
