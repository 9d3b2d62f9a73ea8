// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The object inventory scanner.
//!
//! For every scanned type this issues the type's catalog listing query,
//! then chains a projection over the listing's result set (by statement
//! handle) that assembles the fully qualified name from the type's key
//! columns. Names are canonicalized before they become inventory keys, so
//! every downstream comparison joins on the same form.

use std::collections::BTreeMap;

use sc_snowflake_client::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Error;
use crate::names;
use crate::object::ObjectType;
use crate::pool::{self, Mode};

/// The attribute columns of one catalog record. `None` is SQL `NULL`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectRecord(pub BTreeMap<String, Option<String>>);

impl ObjectRecord {
    /// Looks up an attribute column, treating NULL as absent.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.0.get(column).and_then(|v| v.as_deref())
    }
}

/// The records of one object type, keyed by canonical full name.
pub type ObjectSet = BTreeMap<String, ObjectRecord>;

/// The full object inventory, keyed by type.
pub type Inventory = BTreeMap<ObjectType, ObjectSet>;

/// Scans the account catalog for every tracked object type.
///
/// Type scans are independent and keyed by type, so the result is identical
/// in both execution modes.
pub async fn scan_objects(
    client: &Client,
    mode: Mode,
    workers: usize,
) -> Result<Inventory, Error> {
    let tasks: Vec<_> = ObjectType::SCANNED
        .iter()
        .map(|ty| scan_type(client, *ty))
        .collect();
    let mut inventory = Inventory::new();
    for result in pool::run_all(mode, workers, tasks).await {
        let (ty, objects) = result?;
        inventory.insert(ty, objects);
    }
    Ok(inventory)
}

async fn scan_type(client: &Client, ty: ObjectType) -> Result<(ObjectType, ObjectSet), Error> {
    debug!(object_type = %ty, "scanning catalog");
    let listing = client.execute(&ty.show_query()).await?;
    let keys = ty
        .full_name_keys()
        .iter()
        .map(|key| format!("\"{key}\""))
        .collect::<Vec<_>>()
        .join(",");
    let projection = format!(
        "select *, concat_ws('.',{keys}) as full_name \
         from table(result_scan('{qid}')) \
         where \"name\" not like '%SNOWFLAKE_KAFKA_CONNECTOR%' \
         and \"name\" != 'INFORMATION_SCHEMA'",
        qid = listing.statement_id,
    );
    let result = client.execute(&projection).await?;

    let full_name = result
        .column("full_name")
        .ok_or_else(|| Error::MissingColumn {
            statement: projection.clone(),
            column: "full_name".into(),
        })?;
    let is_builtin = result.column("is_builtin");

    let mut objects = ObjectSet::new();
    for row in &result.rows {
        if ty.is_callable() {
            let builtin = is_builtin
                .and_then(|i| row.get(i))
                .and_then(|v| v.as_deref());
            if builtin == Some("Y") {
                continue;
            }
        }
        let raw = match row.get(full_name).and_then(|v| v.as_deref()) {
            Some(name) if !name.is_empty() => name,
            _ => continue,
        };
        let canonical = names::canonicalize(raw, ty)?;
        let attributes = result
            .columns
            .iter()
            .zip(row)
            .filter(|(column, _)| !column.eq_ignore_ascii_case("full_name"))
            .map(|(column, value)| (column.clone(), value.clone()))
            .collect();
        objects.insert(canonical, ObjectRecord(attributes));
    }
    debug!(object_type = %ty, count = objects.len(), "scan complete");
    Ok((ty, objects))
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;

    /// Builds an inventory record out of `column=value` pairs.
    pub fn record(attrs: &[(&str, &str)]) -> ObjectRecord {
        ObjectRecord(
            attrs
                .iter()
                .map(|(k, v)| (k.to_string(), Some(v.to_string())))
                .collect(),
        )
    }
}
