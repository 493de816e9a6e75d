//! Random distribution of branches across workspaces.

use crate::error::ConfigError;
use rand::Rng;
use std::collections::HashSet;
use usagegen_core::{BranchId, WorkspaceId};

/// Workspace → branches mapping for one run.
///
/// Workspaces keep the order they were given in, and each workspace's
/// branches keep the order they were assigned in. Every branch belongs to
/// exactly one workspace; a workspace may own none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    buckets: Vec<(WorkspaceId, Vec<BranchId>)>,
    branch_count: usize,
}

impl Assignment {
    /// Assigns every branch to a workspace drawn uniformly at random.
    ///
    /// Fails with `ConfigError::NoWorkspaces` when there are branches but no
    /// workspace to put them in.
    pub fn random<R: Rng + ?Sized>(
        workspaces: Vec<WorkspaceId>,
        branches: Vec<BranchId>,
        rng: &mut R,
    ) -> Result<Self, ConfigError> {
        if workspaces.is_empty() && !branches.is_empty() {
            return Err(ConfigError::NoWorkspaces {
                branches: branches.len(),
            });
        }

        let mut buckets: Vec<(WorkspaceId, Vec<BranchId>)> =
            workspaces.into_iter().map(|ws| (ws, Vec::new())).collect();
        let branch_count = branches.len();

        for branch in branches {
            let idx = rng.gen_range(0..buckets.len());
            buckets[idx].1.push(branch);
        }

        Ok(Self {
            buckets,
            branch_count,
        })
    }

    /// Builds an assignment from explicit buckets, rejecting a branch that
    /// appears twice.
    pub fn from_buckets(buckets: Vec<(WorkspaceId, Vec<BranchId>)>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for (_, branches) in &buckets {
            for branch in branches {
                if !seen.insert(branch.as_str()) {
                    return Err(ConfigError::DuplicateBranch(branch.clone()));
                }
            }
        }
        let branch_count = seen.len();

        Ok(Self {
            buckets,
            branch_count,
        })
    }

    /// Workspaces in order, each with its branches
    pub fn iter(&self) -> impl Iterator<Item = (&WorkspaceId, &[BranchId])> {
        self.buckets.iter().map(|(ws, branches)| (ws, branches.as_slice()))
    }

    /// All branches, workspace by workspace
    pub fn branches(&self) -> impl Iterator<Item = &BranchId> {
        self.buckets.iter().flat_map(|(_, branches)| branches.iter())
    }

    pub fn branches_of(&self, workspace_id: &str) -> Option<&[BranchId]> {
        self.buckets
            .iter()
            .find(|(ws, _)| ws == workspace_id)
            .map(|(_, branches)| branches.as_slice())
    }

    pub fn workspace_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn branch_count(&self) -> usize {
        self.branch_count
    }

    /// Number of branches per workspace, in workspace order
    pub fn bucket_sizes(&self) -> Vec<usize> {
        self.buckets.iter().map(|(_, b)| b.len()).collect()
    }
}
