// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! On-disk persistence for inventory snapshots, plans, and rendered SQL.
//!
//! All three documents live next to the account's configuration, so a
//! config directory checked into version control carries the latest
//! reconciliation state alongside the profiles that produced it. Plans are
//! immutable once written; re-planning replaces the file wholesale.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Error;
use crate::plan::Plan;
use crate::scan::Inventory;

const CACHE_FILE: &str = ".snowcache";
const PLAN_FILE: &str = ".snowplan";
const SQL_FILE: &str = ".snowplansql";

/// The persisted form of an inventory snapshot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CachedInventory {
    pub local_cached_time: DateTime<Utc>,
    pub objects: Inventory,
}

/// The file store for one account's reconciliation state.
#[derive(Clone, Debug)]
pub struct Store {
    dir: PathBuf,
}

impl Store {
    /// Opens the store under `<config_dir>/<account>/`.
    pub fn new(config_dir: &Path, account: &str) -> Store {
        Store {
            dir: config_dir.join(account),
        }
    }

    /// Writes an inventory snapshot stamped with the current time.
    pub fn write_inventory(&self, objects: &Inventory) -> Result<(), Error> {
        let cached = CachedInventory {
            local_cached_time: Utc::now(),
            objects: objects.clone(),
        };
        let path = self.dir.join(CACHE_FILE);
        fs::write(&path, serde_json::to_vec_pretty(&cached)?)?;
        info!(path = %path.display(), "wrote inventory snapshot");
        Ok(())
    }

    /// Reads the cached inventory snapshot.
    pub fn read_inventory(&self) -> Result<CachedInventory, Error> {
        let path = self.dir.join(CACHE_FILE);
        let bytes = match fs::read(&path) {
            Ok(bytes) if !bytes.is_empty() => bytes,
            _ => return Err(Error::NoCachedInventory { path }),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn write_plan(&self, plan: &Plan) -> Result<(), Error> {
        let path = self.dir.join(PLAN_FILE);
        fs::write(&path, serde_json::to_vec_pretty(plan)?)?;
        info!(path = %path.display(), plan_id = plan.plan_id, "wrote plan");
        Ok(())
    }

    pub fn read_plan(&self) -> Result<Plan, Error> {
        let path = self.dir.join(PLAN_FILE);
        let bytes = match fs::read(&path) {
            Ok(bytes) if !bytes.is_empty() => bytes,
            _ => return Err(Error::NoCachedPlan { path }),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Writes the rendered statement list, semicolon-terminated, one per
    /// line.
    pub fn write_sql(&self, statements: &[String]) -> Result<(), Error> {
        let path = self.dir.join(SQL_FILE);
        let mut text = statements.join(";\n");
        if !text.is_empty() {
            text.push_str(";\n");
        }
        fs::write(&path, text)?;
        info!(path = %path.display(), statements = statements.len(), "wrote statements");
        Ok(())
    }

    /// Truncates all three state files. Missing files are left missing.
    pub fn clear(&self) -> Result<(), Error> {
        for file in [CACHE_FILE, PLAN_FILE, SQL_FILE] {
            let path = self.dir.join(file);
            if path.exists() {
                fs::write(&path, b"")?;
            }
        }
        info!(dir = %self.dir.display(), "cleared cached state");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grant::Grant;
    use crate::object::{GrantOn, ObjectType};
    use crate::plan::Delta;
    use crate::scan::testutil::record;

    fn store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("myacct")).unwrap();
        let store = Store::new(dir.path(), "myacct");
        (dir, store)
    }

    #[test]
    fn inventory_round_trips() {
        let (_dir, store) = store();
        let mut inventory = Inventory::new();
        inventory.insert(
            ObjectType::Table,
            [(
                "DB.S.T1".to_string(),
                record(&[("database_name", "DB"), ("is_external", "N")]),
            )]
            .into(),
        );
        inventory.insert(ObjectType::Warehouse, Default::default());
        store.write_inventory(&inventory).unwrap();
        let cached = store.read_inventory().unwrap();
        assert_eq!(cached.objects, inventory);
        assert!(cached.local_cached_time <= Utc::now());
    }

    #[test]
    fn plan_round_trips() {
        let (_dir, store) = store();
        let mut plan = Plan {
            plan_id: 1_700_000_000,
            ..Default::default()
        };
        plan.roles.insert(
            "ANALYST".into(),
            Delta {
                to_revoke: vec![],
                ok: vec![],
                to_grant: vec![Grant::new(
                    "SELECT",
                    GrantOn::Object(ObjectType::Table),
                    "DB.S.T1",
                )],
            },
        );
        store.write_plan(&plan).unwrap();
        assert_eq!(store.read_plan().unwrap(), plan);
    }

    #[test]
    fn missing_state_reports_which_command_to_run() {
        let (_dir, store) = store();
        assert!(matches!(
            store.read_inventory(),
            Err(Error::NoCachedInventory { .. })
        ));
        assert!(matches!(store.read_plan(), Err(Error::NoCachedPlan { .. })));
    }

    #[test]
    fn clear_truncates_without_creating() {
        let (_dir, store) = store();
        store.write_plan(&Plan::default()).unwrap();
        store.clear().unwrap();
        assert!(matches!(store.read_plan(), Err(Error::NoCachedPlan { .. })));
        assert!(!store.dir.join(CACHE_FILE).exists());
    }

    #[test]
    fn sql_file_is_semicolon_terminated() {
        let (_dir, store) = store();
        store
            .write_sql(&[
                "REVOKE INSERT ON TABLE DB.S.T2 FROM ROLE ANALYST".to_string(),
                "GRANT SELECT ON TABLE DB.S.T3 TO ROLE ANALYST".to_string(),
            ])
            .unwrap();
        let text = fs::read_to_string(store.dir.join(SQL_FILE)).unwrap();
        assert_eq!(
            text,
            "REVOKE INSERT ON TABLE DB.S.T2 FROM ROLE ANALYST;\n\
             GRANT SELECT ON TABLE DB.S.T3 TO ROLE ANALYST;\n"
        );
    }
}
