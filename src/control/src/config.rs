// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Declarative configuration.
//!
//! All configuration is loaded once, up front, into an immutable
//! [`ControlConfig`] that the engine passes around explicitly. Layout under
//! the configuration directory:
//!
//! ```text
//! atomic_groups.yaml           privilege bundles per object type
//! ignore/privs.yaml            (privilege, type) pairs the platform rejects
//! <account>/roles.yaml         role -> profiles with template parameters
//! <account>/role_profiles.yaml profile definitions
//! <account>/user_profiles.yaml user -> target role set        (optional)
//! <account>/ignore/objects.yaml  full-name ignore patterns    (optional)
//! ```
//!
//! Object-type names appearing anywhere in configuration are resolved
//! against the object-type table at load time, so an unknown type is a load
//! error rather than a silently empty match downstream.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use regex::RegexBuilder;
use serde::Deserialize;

use crate::error::Error;
use crate::grant::Grant;
use crate::object::ObjectType;

/// Object-type keys in atomic groups and profiles that are not object types
/// from the inventory.
const ACCOUNT_TYPE: &str = "account";
const ROLE_TYPE: &str = "role";

/// A named bundle of concrete privileges, per object type.
pub type AtomicGroups = BTreeMap<String, BTreeMap<String, Vec<String>>>;

/// A profile reference inside a role configuration, with its template
/// parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfileRef {
    pub name: String,
    pub parameters: BTreeMap<String, String>,
}

/// The declarative configuration of a single role.
#[derive(Clone, Debug, Default)]
pub struct RoleConfig {
    pub profiles: Vec<ProfileRef>,
}

/// One entry of a profile: either name patterns per atomic group, or (for
/// the pseudo-type `account`) the account identifier per atomic group.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum ProfileEntry {
    Patterns(BTreeMap<String, Vec<String>>),
    Account(BTreeMap<String, String>),
}

/// A named, parameterized privilege profile.
#[derive(Clone, Debug, Deserialize)]
pub struct Profile {
    pub privileges: BTreeMap<String, ProfileEntry>,
}

#[derive(Deserialize)]
struct RawRoleConfig {
    #[serde(default)]
    profiles: Vec<BTreeMap<String, BTreeMap<String, String>>>,
}

#[derive(Deserialize)]
struct IgnoreObjects {
    #[serde(default)]
    full_name_patterns: Vec<String>,
}

/// The immutable configuration the engine runs against.
#[derive(Debug, Default)]
pub struct ControlConfig {
    atomic_groups: AtomicGroups,
    unsupported: BTreeSet<(String, String)>,
    ignore_patterns: Vec<regex::Regex>,
    pub roles: BTreeMap<String, RoleConfig>,
    pub profiles: BTreeMap<String, Profile>,
    pub users: BTreeMap<String, BTreeSet<String>>,
}

impl ControlConfig {
    /// Loads the configuration for an account from the configuration
    /// directory.
    pub fn load(config_dir: &Path, account: &str) -> Result<ControlConfig, Error> {
        let account_dir = config_dir.join(account);
        let atomic_groups = read_required(&config_dir.join("atomic_groups.yaml"))?;
        let unsupported = read_required(&config_dir.join("ignore").join("privs.yaml"))?;
        let roles = read_required(&account_dir.join("roles.yaml"))?;
        let profiles = read_required(&account_dir.join("role_profiles.yaml"))?;
        let users = read_optional(&account_dir.join("user_profiles.yaml"))?;
        let ignore = read_optional(&account_dir.join("ignore").join("objects.yaml"))?;
        ControlConfig::from_yaml(
            &atomic_groups,
            &unsupported,
            &roles,
            &profiles,
            users.as_deref(),
            ignore.as_deref(),
        )
    }

    /// Parses a configuration from in-memory YAML documents.
    pub fn from_yaml(
        atomic_groups: &str,
        unsupported_privileges: &str,
        roles: &str,
        profiles: &str,
        users: Option<&str>,
        ignore_objects: Option<&str>,
    ) -> Result<ControlConfig, Error> {
        let atomic_groups: AtomicGroups = parse_yaml("atomic_groups.yaml", atomic_groups)?;
        let unsupported: BTreeMap<String, Vec<String>> =
            parse_yaml("ignore/privs.yaml", unsupported_privileges)?;
        let raw_roles: BTreeMap<String, RawRoleConfig> = parse_yaml("roles.yaml", roles)?;
        let profiles: BTreeMap<String, Profile> = parse_yaml("role_profiles.yaml", profiles)?;
        let users: BTreeMap<String, BTreeSet<String>> = match users {
            Some(doc) => parse_yaml("user_profiles.yaml", doc)?,
            None => BTreeMap::new(),
        };
        let ignore: IgnoreObjects = match ignore_objects {
            Some(doc) => parse_yaml("ignore/objects.yaml", doc)?,
            None => IgnoreObjects {
                full_name_patterns: vec![],
            },
        };

        let unsupported = unsupported
            .into_iter()
            .flat_map(|(privilege, types)| {
                types
                    .into_iter()
                    .map(move |ty| (privilege.to_uppercase(), ty.to_uppercase()))
            })
            .collect();

        let ignore_patterns = ignore
            .full_name_patterns
            .iter()
            .map(|pattern| {
                RegexBuilder::new(&format!("^(?:{})$", pattern.to_uppercase()))
                    .case_insensitive(true)
                    .build()
            })
            .collect::<Result<Vec<_>, _>>()?;

        let roles = raw_roles
            .into_iter()
            .map(|(role, raw)| {
                let profiles = raw
                    .profiles
                    .into_iter()
                    .flatten()
                    .map(|(name, parameters)| ProfileRef { name, parameters })
                    .collect();
                (role, RoleConfig { profiles })
            })
            .collect();

        let config = ControlConfig {
            atomic_groups,
            unsupported,
            ignore_patterns,
            roles,
            profiles,
            users,
        };
        config.validate()?;
        Ok(config)
    }

    /// Verifies every object-type name in the configuration resolves in the
    /// object-type table.
    fn validate(&self) -> Result<(), Error> {
        for type_name in self.atomic_groups.keys() {
            check_type_name(type_name, "atomic_groups.yaml")?;
        }
        for (_, type_name) in &self.unsupported {
            check_type_name(type_name, "ignore/privs.yaml")?;
        }
        for (profile_name, profile) in &self.profiles {
            for type_name in profile.privileges.keys() {
                check_type_name(type_name, &format!("profile {profile_name:?}"))?;
            }
        }
        Ok(())
    }

    /// The concrete privileges of an atomic group.
    pub fn atomic_privileges(&self, object_type: &str, group: &str) -> Result<&[String], Error> {
        self.atomic_groups
            .get(object_type)
            .and_then(|groups| groups.get(group))
            .map(|privs| privs.as_slice())
            .ok_or_else(|| Error::UnknownAtomicGroup {
                object_type: object_type.to_string(),
                group: group.to_string(),
            })
    }

    /// Reports whether the platform rejects this grant's
    /// `(privilege, object type)` combination.
    pub fn is_unsupported(&self, grant: &Grant) -> bool {
        self.unsupported
            .contains(&(grant.privilege.clone(), grant.on.to_string()))
    }

    /// Reports whether a fully qualified name matches an administrator
    /// ignore pattern.
    pub fn is_ignored(&self, full_name: &str) -> bool {
        self.ignore_patterns
            .iter()
            .any(|pattern| pattern.is_match(full_name))
    }

    /// The role configurations to plan, optionally restricted to a subset.
    /// Requested roles are matched case-insensitively; an unconfigured role
    /// is an error.
    pub fn roles_to_plan(
        &self,
        subset: Option<&[String]>,
    ) -> Result<BTreeMap<&str, &RoleConfig>, Error> {
        match subset {
            None => Ok(self
                .roles
                .iter()
                .map(|(role, config)| (role.as_str(), config))
                .collect()),
            Some(requested) => requested
                .iter()
                .map(|name| {
                    self.roles
                        .iter()
                        .find(|(role, _)| role.eq_ignore_ascii_case(name))
                        .map(|(role, config)| (role.as_str(), config))
                        .ok_or_else(|| Error::UnknownRole { name: name.clone() })
                })
                .collect(),
        }
    }
}

fn check_type_name(name: &str, context: &str) -> Result<(), Error> {
    if name == ACCOUNT_TYPE || name == ROLE_TYPE {
        return Ok(());
    }
    match ObjectType::from_config_name(name) {
        Some(_) => Ok(()),
        None => Err(Error::UnknownObjectType {
            name: name.to_string(),
            context: context.to_string(),
        }),
    }
}

fn parse_yaml<T: serde::de::DeserializeOwned>(path: &str, doc: &str) -> Result<T, Error> {
    serde_yaml::from_str(doc).map_err(|source| Error::ConfigParse {
        path: PathBuf::from(path),
        source,
    })
}

fn read_required(path: &Path) -> Result<String, Error> {
    fs::read_to_string(path).map_err(|source| Error::ConfigFile {
        path: path.to_path_buf(),
        source,
    })
}

fn read_optional(path: &Path) -> Result<Option<String>, Error> {
    match fs::read_to_string(path) {
        Ok(doc) => Ok(Some(doc)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(Error::ConfigFile {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::GrantOn;

    const ATOMIC: &str = "\
table:
  read: [SELECT, REFERENCES]
  write: [INSERT, UPDATE, DELETE]
stage:
  use: [USAGE]
internal stage:
  use: [READ, WRITE]
schema:
  use: [USAGE]
warehouse:
  use: [USAGE, OPERATE]
account:
  monitor: [MONITOR USAGE]
";

    const PRIVS: &str = "\
select:
  - internal stage
references:
  - view
";

    const ROLES: &str = "\
analyst:
  profiles:
    - reader: {db: ANALYTICS}
loader:
  profiles:
    - writer: {db: RAW}
";

    const PROFILES: &str = "\
reader:
  privileges:
    table:
      read:
        - '{db}\\..*\\..*'
    account:
      monitor: MYACCT
writer:
  privileges:
    table:
      write:
        - '{db}\\..*\\..*'
";

    fn config() -> ControlConfig {
        ControlConfig::from_yaml(
            ATOMIC,
            PRIVS,
            ROLES,
            PROFILES,
            Some("bob: [ANALYST]\n"),
            Some("full_name_patterns: ['TMP_.*']\n"),
        )
        .unwrap()
    }

    #[test]
    fn parses_and_indexes() {
        let config = config();
        assert_eq!(
            config.atomic_privileges("table", "read").unwrap(),
            &["SELECT", "REFERENCES"]
        );
        assert!(matches!(
            config.atomic_privileges("table", "admin"),
            Err(Error::UnknownAtomicGroup { .. })
        ));
        assert_eq!(config.roles["analyst"].profiles.len(), 1);
        assert_eq!(config.roles["analyst"].profiles[0].name, "reader");
        assert_eq!(
            config.roles["analyst"].profiles[0].parameters["db"],
            "ANALYTICS"
        );
        assert!(config.users["bob"].contains("ANALYST"));
    }

    #[test]
    fn unsupported_pairs_expand_per_type() {
        let config = config();
        let rejected = Grant::new(
            "SELECT",
            GrantOn::Object(ObjectType::InternalStage),
            "DB.S.STG",
        );
        let fine = Grant::new("SELECT", GrantOn::Object(ObjectType::Table), "DB.S.T");
        assert!(config.is_unsupported(&rejected));
        assert!(!config.is_unsupported(&fine));
    }

    #[test]
    fn ignore_patterns_match_case_insensitively_and_anchored() {
        let config = config();
        assert!(config.is_ignored("TMP_SCRATCH"));
        assert!(config.is_ignored("tmp_scratch"));
        assert!(!config.is_ignored("NOT_TMP_SCRATCH"));
    }

    #[test]
    fn unknown_object_type_fails_at_load() {
        let err = ControlConfig::from_yaml(
            "hyper table:\n  read: [SELECT]\n",
            PRIVS,
            ROLES,
            PROFILES,
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnknownObjectType { .. }));
    }

    #[test]
    fn role_subsets_match_case_insensitively() {
        let config = config();
        let subset = config
            .roles_to_plan(Some(&["ANALYST".to_string()]))
            .unwrap();
        assert_eq!(subset.len(), 1);
        assert!(subset.contains_key("analyst"));
        assert!(matches!(
            config.roles_to_plan(Some(&["missing".to_string()])),
            Err(Error::UnknownRole { .. })
        ));
    }
}
