// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Declarative access control reconciliation for Snowflake.
//!
//! Administrators describe the access each role and user should hold as
//! parameterized privilege profiles. The engine scans the account's object
//! catalog, expands the profiles against it, fetches the grants actually in
//! force, and partitions the two into revokes, matches, and grants. The
//! resulting plan is persisted, rendered to literal SQL, and applied one
//! statement at a time, continuing past individual failures.
//!
//! The flow, in module order:
//!
//! 1. [`scan`] lists the catalog and [`filter`] refines it.
//! 2. [`profile`] expands role profiles into target grant tuples.
//! 3. [`grants`] fetches the grants currently in force.
//! 4. [`plan`] diffs current against target per recipient.
//! 5. [`sql`] renders the plan and [`apply`] executes it.
//!
//! [`store`] persists the inventory, plan, and rendered statements between
//! runs; [`config`] holds the declarative inputs; [`command`] and
//! [`context`] back the `control` binary.

pub mod apply;
pub mod command;
pub mod config;
pub mod context;
pub mod error;
pub mod filter;
pub mod grant;
pub mod grants;
pub mod names;
pub mod object;
pub mod plan;
pub mod pool;
pub mod profile;
pub mod scan;
pub mod sql;
pub mod store;

pub use error::Error;
