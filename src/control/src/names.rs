// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Canonicalization of fully qualified object names.
//!
//! The platform emits function and procedure names in several irregular
//! shapes, depending on where the name came from:
//!
//! ```text
//! db.schema."f(NUMBER, VARCHAR):NUMBER"
//! db.schema."f(a NUMBER, b VARCHAR):NUMBER"
//! db.schema.f(NUMBER, VARCHAR) RETURN NUMBER
//! ```
//!
//! None of these are usable as a join key across the inventory and the
//! grant listings, so every callable name is reduced to the single form
//!
//! ```text
//! db.schema.f(NUMBER,VARCHAR)
//! ```
//!
//! dropping the return type, quotes, and argument names. Non-callable
//! types pass through untouched.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::Error;
use crate::object::ObjectType;

/// Splits `db.schema.local` at the last two separating dots, capturing the
/// local part.
static LOCAL_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*\..*\.)(.*\(.*\).*)$").expect("valid regex"));

/// Captures the parenthesized signature of a callable's local name.
static SIGNATURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*)\((.*)\)$").expect("valid regex"));

/// Canonicalizes a fully qualified name for the given object type.
///
/// Idempotent: canonical output maps to itself. A callable name without the
/// expected parenthesized signature is a fatal [`Error::MalformedCallable`];
/// it means the platform emitted a format the tool does not recognize, and
/// silently keeping the raw name would leave the object without a stable
/// join key.
pub fn canonicalize(name: &str, object_type: ObjectType) -> Result<String, Error> {
    if !object_type.is_callable() {
        return Ok(name.to_string());
    }
    // Catalog listings spell the return type `... RETURN T`; grant listings
    // spell it `...:T`. Normalize before parsing.
    let name = name.replace(" RETURN ", ":");
    let captures = LOCAL_NAME
        .captures(&name)
        .ok_or_else(|| Error::MalformedCallable { name: name.clone() })?;
    let prefix = &captures[1];
    let local = captures[2].replace('"', "");
    let local = match local.split_once(':') {
        Some((main, _return_type)) => main.to_string(),
        None => local,
    };
    let signature = SIGNATURE
        .captures(&local)
        .ok_or_else(|| Error::MalformedCallable { name: name.clone() })?;
    let base = &signature[1];
    let args = signature[2]
        .split(',')
        .filter(|arg| !arg.trim().is_empty())
        .map(|arg| {
            // `name type` argument pairs reduce to the trailing type token.
            arg.split_whitespace().last().unwrap_or("").to_string()
        })
        .collect::<Vec<_>>();
    Ok(format!("{prefix}{base}({})", args.join(",")))
}

/// Pluralizes an uppercase object-type name for future-grant tags.
pub fn pluralize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }
    if word.ends_with('Y') {
        return format!("{}IES", &word[..word.len() - 1]);
    }
    if word.ends_with('S')
        || word.ends_with('Z')
        || word.ends_with('X')
        || word.ends_with("SH")
        || word.ends_with("CH")
    {
        return format!("{word}ES");
    }
    format!("{word}S")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_callables_pass_through() {
        let name = "DB.S.\"weird name\"";
        assert_eq!(canonicalize(name, ObjectType::Table).unwrap(), name);
    }

    #[test]
    fn callable_with_named_args_and_return_type() {
        assert_eq!(
            canonicalize("DB.S.\"F(A NUMBER, B VARCHAR):NUMBER\"", ObjectType::Function).unwrap(),
            "DB.S.F(NUMBER,VARCHAR)"
        );
    }

    #[test]
    fn callable_with_bare_arg_types() {
        assert_eq!(
            canonicalize("DB.S.\"F(NUMBER, VARCHAR):NUMBER\"", ObjectType::Procedure).unwrap(),
            "DB.S.F(NUMBER,VARCHAR)"
        );
    }

    #[test]
    fn callable_in_catalog_listing_form() {
        assert_eq!(
            canonicalize("DB.S.F(NUMBER, VARCHAR) RETURN NUMBER", ObjectType::Function).unwrap(),
            "DB.S.F(NUMBER,VARCHAR)"
        );
    }

    #[test]
    fn zero_argument_callable() {
        assert_eq!(
            canonicalize("DB.S.\"F():VARCHAR\"", ObjectType::Function).unwrap(),
            "DB.S.F()"
        );
    }

    #[test]
    fn canonicalization_is_idempotent() {
        let raw = "DB.S.\"F(A NUMBER, B VARCHAR):NUMBER\"";
        let once = canonicalize(raw, ObjectType::Function).unwrap();
        let twice = canonicalize(&once, ObjectType::Function).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn missing_signature_is_fatal() {
        let err = canonicalize("DB.S.F", ObjectType::Function).unwrap_err();
        assert!(matches!(err, Error::MalformedCallable { .. }));
    }

    #[test]
    fn pluralize_rules() {
        assert_eq!(pluralize("TABLE"), "TABLES");
        assert_eq!(pluralize("POLICY"), "POLICIES");
        assert_eq!(pluralize("INDEX"), "INDEXES");
        assert_eq!(pluralize("DYNAMIC TABLE"), "DYNAMIC TABLES");
        assert_eq!(pluralize(""), "");
    }
}
