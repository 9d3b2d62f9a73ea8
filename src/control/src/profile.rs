// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Expansion of declarative profiles into concrete target grants.
//!
//! A profile names, per object type and atomic group, a list of name
//! patterns. Patterns are templated with the parameters the role
//! configuration supplies, then matched case-insensitively against the
//! filtered inventory. A pattern ending in `.*` is a wildcard over a
//! container: it matches schemas (or, for the `schema` type, databases)
//! and expands into future grants instead of direct ones. The atomic
//! group's privileges cross-product with every matched name.
//!
//! Combinations the platform rejects are dropped here, so they can never
//! enter the target side of a diff.

use std::collections::{BTreeMap, BTreeSet};

use regex::{Regex, RegexBuilder};
use tracing::debug;

use crate::config::{ControlConfig, Profile, ProfileEntry, ProfileRef, RoleConfig};
use crate::error::Error;
use crate::grant::Grant;
use crate::object::{Container, GrantOn, ObjectType};
use crate::scan::Inventory;

/// Expands every profile associated with a role into the role's target
/// grant set.
pub fn role_target_state(
    config: &ControlConfig,
    inventory: &Inventory,
    role_config: &RoleConfig,
) -> Result<BTreeSet<Grant>, Error> {
    let mut target = BTreeSet::new();
    for ProfileRef { name, parameters } in &role_config.profiles {
        let profile = config
            .profiles
            .get(name)
            .ok_or_else(|| Error::UnknownProfile { name: name.clone() })?;
        target.extend(expand_profile(config, inventory, name, profile, parameters)?);
    }
    Ok(target)
}

/// Expands a single profile under the given template parameters.
pub fn expand_profile(
    config: &ControlConfig,
    inventory: &Inventory,
    profile_name: &str,
    profile: &Profile,
    parameters: &BTreeMap<String, String>,
) -> Result<BTreeSet<Grant>, Error> {
    debug!(profile = profile_name, "expanding profile");
    let mut grants = BTreeSet::new();
    for (type_name, entry) in &profile.privileges {
        match (type_name.as_str(), entry) {
            // Role grants to roles are managed outside profiles.
            ("role", _) => continue,
            ("account", ProfileEntry::Account(groups)) => {
                for (group, account) in groups {
                    for privilege in config.atomic_privileges("account", group)? {
                        grants.insert(Grant::new(privilege, GrantOn::Account, account));
                    }
                }
            }
            ("account", ProfileEntry::Patterns(_)) => {
                return Err(Error::ProfileShape {
                    profile: profile_name.to_string(),
                    object_type: type_name.clone(),
                })
            }
            (_, ProfileEntry::Patterns(groups)) => {
                let ty = ObjectType::from_config_name(type_name).ok_or_else(|| {
                    Error::UnknownObjectType {
                        name: type_name.clone(),
                        context: format!("profile {profile_name:?}"),
                    }
                })?;
                for (group, patterns) in groups {
                    let privileges = config.atomic_privileges(type_name, group)?;
                    expand_patterns(
                        inventory, ty, patterns, parameters, privileges, &mut grants,
                    )?;
                }
            }
            (_, ProfileEntry::Account(_)) => {
                return Err(Error::ProfileShape {
                    profile: profile_name.to_string(),
                    object_type: type_name.clone(),
                })
            }
        }
    }
    grants.retain(|grant| !config.is_unsupported(grant));
    Ok(grants)
}

fn expand_patterns(
    inventory: &Inventory,
    ty: ObjectType,
    patterns: &[String],
    parameters: &BTreeMap<String, String>,
    privileges: &[String],
    grants: &mut BTreeSet<Grant>,
) -> Result<(), Error> {
    let generic = ty.generic();
    let (wildcards, literals): (Vec<&String>, Vec<&String>) =
        patterns.iter().partition(|p| p.ends_with(".*"));

    let literal_regexes = literals
        .iter()
        .map(|pattern| {
            let rendered = render_pattern(pattern, parameters)?;
            compile_anchored(&format!("{}$", rendered.to_uppercase()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    for name in matching_names(inventory.get(&ty), &literal_regexes) {
        for privilege in privileges {
            grants.insert(Grant::new(privilege, GrantOn::Object(generic), name));
        }
    }

    if wildcards.is_empty() {
        return Ok(());
    }
    let wildcard_regexes = wildcards
        .iter()
        .map(|pattern| {
            let stem = pattern[..pattern.len() - 2].trim_end_matches(['.', '[', ']']);
            let rendered = render_pattern(stem, parameters)?;
            compile_anchored(&format!("{}$", rendered.to_uppercase()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    // Wildcards grant on objects yet to be created, so they match the
    // parent container inventory, not the object inventory.
    let (parents, container) = match ty {
        ObjectType::Schema => (inventory.get(&ObjectType::Database), Container::Database),
        _ => (inventory.get(&ObjectType::Schema), Container::Schema),
    };
    let parents = parents.map(|objects| {
        objects
            .iter()
            .filter(|(_, record)| match container {
                Container::Database => record.get("name") != Some("SNOWFLAKE"),
                Container::Schema => record.get("name") != Some("INFORMATION_SCHEMA"),
            })
            .map(|(name, _)| name)
    });
    let on = GrantOn::Future {
        object_type: generic,
        container,
    };
    for parent in parents.into_iter().flatten() {
        if wildcard_regexes.iter().any(|re| re.is_match(parent)) {
            for privilege in privileges {
                grants.insert(Grant::new(privilege, on, parent));
            }
        }
    }
    Ok(())
}

fn matching_names<'a>(
    objects: Option<&'a crate::scan::ObjectSet>,
    regexes: &'a [Regex],
) -> impl Iterator<Item = &'a str> {
    objects
        .into_iter()
        .flat_map(|objects| objects.keys())
        .filter(|name| regexes.iter().any(|re| re.is_match(name)))
        .map(|name| name.as_str())
}

fn compile_anchored(pattern: &str) -> Result<Regex, Error> {
    Ok(RegexBuilder::new(&format!("^(?:{pattern})"))
        .case_insensitive(true)
        .build()?)
}

/// Substitutes `{name}` placeholders from the parameter map. A placeholder
/// without a parameter fails by name rather than producing a half-rendered
/// pattern.
pub fn render_pattern(
    pattern: &str,
    parameters: &BTreeMap<String, String>,
) -> Result<String, Error> {
    let mut out = String::with_capacity(pattern.len());
    let mut rest = pattern;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after
            .find('}')
            .ok_or_else(|| Error::MissingTemplateParameter {
                pattern: pattern.to_string(),
                parameter: after.to_string(),
            })?;
        let name = &after[..end];
        let value = parameters
            .get(name)
            .ok_or_else(|| Error::MissingTemplateParameter {
                pattern: pattern.to_string(),
                parameter: name.to_string(),
            })?;
        out.push_str(value);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
