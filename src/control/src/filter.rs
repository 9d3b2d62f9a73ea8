// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The object filter.
//!
//! Runs between scanning and planning. First the raw inventory is refined
//! into the subtypes profiles actually reference: shared and application
//! databases split out of `database`, internal and external stages out of
//! `stage`, materialized views out of `view` (after dropping
//! INFORMATION_SCHEMA views), external tables out of `table`. Then records
//! are dropped when their containing database is shared/application or
//! looks like an environment clone, or when their full name matches an
//! administrator ignore pattern.
//!
//! Filtering only ever removes records, so the output per type is a subset
//! of the input.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::ControlConfig;
use crate::object::ObjectType;
use crate::scan::{Inventory, ObjectSet};

/// Databases stamped out by environment cloning are never managed.
static ENV_CLONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.*_(DEV|QA|PROD)_[0-9]{1,5}").expect("valid regex"));

/// Refines and filters a scanned inventory.
pub fn filter_objects(mut inventory: Inventory, config: &ControlConfig) -> Inventory {
    refine(&mut inventory);

    let ignore_dbs: BTreeSet<String> = inventory
        .get(&ObjectType::SharedDatabase)
        .into_iter()
        .chain(inventory.get(&ObjectType::ApplicationDatabase))
        .flat_map(|objects| objects.keys().cloned())
        .collect();

    for (ty, objects) in inventory.iter_mut() {
        if let Some(identifier) = ty.filter_identifier() {
            objects.retain(|_, record| match record.get(identifier) {
                Some(container) => {
                    !ignore_dbs.contains(container) && !ENV_CLONE.is_match(container)
                }
                None => false,
            });
        }
        objects.retain(|full_name, _| !config.is_ignored(full_name));
    }
    inventory
}

fn refine(inventory: &mut Inventory) {
    let databases = inventory
        .get(&ObjectType::Database)
        .cloned()
        .unwrap_or_default();
    inventory.insert(
        ObjectType::SharedDatabase,
        split(&databases, |r| r.get("kind") == Some("IMPORTED DATABASE")),
    );
    inventory.insert(
        ObjectType::ApplicationDatabase,
        split(&databases, |r| r.get("kind") == Some("APPLICATION")),
    );

    let stages = inventory
        .get(&ObjectType::Stage)
        .cloned()
        .unwrap_or_default();
    inventory.insert(
        ObjectType::InternalStage,
        split(&stages, |r| r.get("type") == Some("INTERNAL")),
    );
    inventory.insert(
        ObjectType::ExternalStage,
        split(&stages, |r| r.get("type") == Some("EXTERNAL")),
    );

    let mut views = inventory
        .get(&ObjectType::View)
        .cloned()
        .unwrap_or_default();
    views.retain(|_, r| r.get("schema_name") != Some("INFORMATION_SCHEMA"));
    inventory.insert(
        ObjectType::MaterializedView,
        split(&views, |r| r.get("is_materialized") == Some("true")),
    );
    views.retain(|_, r| r.get("is_materialized") != Some("true"));
    inventory.insert(ObjectType::View, views);

    let mut tables = inventory
        .get(&ObjectType::Table)
        .cloned()
        .unwrap_or_default();
    inventory.insert(
        ObjectType::ExternalTable,
        split(&tables, |r| r.get("is_external") == Some("Y")),
    );
    tables.retain(|_, r| r.get("is_external") != Some("Y"));
    inventory.insert(ObjectType::Table, tables);
}

fn split(objects: &ObjectSet, pred: impl Fn(&crate::scan::ObjectRecord) -> bool) -> ObjectSet {
    objects
        .iter()
        .filter(|(_, record)| pred(record))
        .map(|(name, record)| (name.clone(), record.clone()))
        .collect()
}
