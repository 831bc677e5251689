//! Migration planning.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::{MigrateError, Result};

/// Versions to execute, in order, starting from `start_version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationPlan {
    /// Highest applied version when the plan was built, 0 if none.
    pub start_version: i64,
    pub versions: Vec<i64>,
}

impl MigrationPlan {
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }
}

/// Compute the versions needed to move from the applied state to `target`.
///
/// Moving up applies every known version above the start, oldest first.
/// Moving down reverts every known version above the target, newest first.
/// An available version below the start that was never applied makes the
/// history ambiguous and fails with [`MigrateError::Version`].
pub fn build_plan(target: i64, applied: &[i64], available: &[i64]) -> Result<MigrationPlan> {
    let start_version = applied.iter().copied().max().unwrap_or(0);
    let applied_set: BTreeSet<i64> = applied.iter().copied().collect();

    let holes: BTreeSet<i64> = available
        .iter()
        .copied()
        .filter(|v| *v < start_version && !applied_set.contains(v))
        .collect();
    if !holes.is_empty() {
        return Err(MigrateError::version(
            format!(
                "Found unapplied migrations older than the current database version {}",
                start_version
            ),
            holes.into_iter().collect(),
        ));
    }

    let mut candidates = applied_set;
    candidates.extend(available.iter().copied());

    let versions = if target < start_version {
        candidates
            .into_iter()
            .rev()
            .filter(|v| *v > target && *v <= start_version)
            .collect()
    } else {
        candidates
            .into_iter()
            .filter(|v| *v > start_version && *v <= target)
            .collect()
    };

    Ok(MigrationPlan {
        start_version,
        versions,
    })
}
