// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Bounded fan-out for network-bound work.
//!
//! Scanning, planning, and applying all dispatch many independent catalog
//! queries. Each unit of work communicates only through its return value;
//! the caller merges results keyed by a stable identifier, so completion
//! order never matters. In sequential mode tasks run one at a time, in
//! submission order, which callers rely on for ordered apply output.
//!
//! There is no cancellation or timeout: a hung query occupies its slot
//! indefinitely.

use std::str::FromStr;

use futures::stream::{self, StreamExt};
use futures::Future;

/// The default concurrency limit. Queries are network-bound, so the limit
/// is sized well past typical type/role counts.
pub const DEFAULT_WORKERS: usize = 100;

/// How a batch of independent tasks is executed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// One task at a time, in submission order.
    Sequential,
    /// Up to the worker limit at a time, in no particular order.
    Concurrent,
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Mode, String> {
        match s {
            "seq" | "sequential" => Ok(Mode::Sequential),
            "conc" | "concurrent" => Ok(Mode::Concurrent),
            other => Err(format!("unknown execution mode {other:?}")),
        }
    }
}

/// Runs every task to completion and returns their results.
///
/// In sequential mode results arrive in submission order; in concurrent
/// mode they arrive in completion order.
pub async fn run_all<T, F>(mode: Mode, workers: usize, tasks: Vec<F>) -> Vec<T>
where
    F: Future<Output = T>,
{
    match mode {
        Mode::Sequential => {
            let mut results = Vec::with_capacity(tasks.len());
            for task in tasks {
                results.push(task.await);
            }
            results
        }
        Mode::Concurrent => {
            stream::iter(tasks)
                .buffer_unordered(workers.max(1))
                .collect()
                .await
        }
    }
}
