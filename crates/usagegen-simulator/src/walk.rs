//! Per-branch usage with a bounded random drift.
//!
//! Every tick each branch's usage moves by a magnitude drawn from
//! `[0, max_delta)`: down with probability `1 / decrease_one_in`, up
//! otherwise, never below zero. Only the latest value is kept.

use crate::error::ConfigError;
use fxhash::FxHashMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use usagegen_core::BranchId;

/// Parameters of the drift rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkParams {
    /// Usage every branch starts from
    pub baseline: u64,
    /// Exclusive upper bound of the per-tick magnitude
    pub max_delta: u64,
    /// One in this many ticks moves usage down
    pub decrease_one_in: u32,
}

impl Default for WalkParams {
    fn default() -> Self {
        Self {
            baseline: 120,
            max_delta: 50,
            decrease_one_in: 10,
        }
    }
}

impl WalkParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_delta == 0 {
            return Err(ConfigError::InvalidWalk(
                "max_delta must be at least 1".to_string(),
            ));
        }
        if self.decrease_one_in == 0 {
            return Err(ConfigError::InvalidWalk(
                "decrease_one_in must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Applies one drift step to `current`, clamping at zero.
pub fn apply_drift(current: u64, magnitude: u64, decrease: bool) -> u64 {
    if decrease {
        current.saturating_sub(magnitude)
    } else {
        current.saturating_add(magnitude)
    }
}

/// Summary of the usage values at a point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub branches: usize,
    pub min: u64,
    pub max: u64,
    pub mean: f64,
}

/// Current usage of every branch.
#[derive(Debug, Clone)]
pub struct WalkState {
    params: WalkParams,
    usage: FxHashMap<BranchId, u64>,
}

impl WalkState {
    /// Starts every branch at the baseline. Fails on parameters that
    /// `WalkParams::validate` rejects.
    pub fn new<'a>(
        params: WalkParams,
        branches: impl IntoIterator<Item = &'a BranchId>,
    ) -> Result<Self, ConfigError> {
        params.validate()?;
        let usage = branches
            .into_iter()
            .map(|b| (b.clone(), params.baseline))
            .collect();
        Ok(Self { params, usage })
    }

    pub fn params(&self) -> &WalkParams {
        &self.params
    }

    /// Current usage of a branch
    pub fn value(&self, branch_id: &str) -> Option<u64> {
        self.usage.get(branch_id).copied()
    }

    pub fn len(&self) -> usize {
        self.usage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.usage.is_empty()
    }

    /// Advances one branch by one tick and returns its new usage.
    ///
    /// A branch that was not known yet starts from the baseline.
    pub fn step<R: Rng + ?Sized>(&mut self, branch_id: &str, rng: &mut R) -> u64 {
        let magnitude = rng.gen_range(0..self.params.max_delta);
        let decrease = rng.gen_range(0..self.params.decrease_one_in) == 0;

        let current = self.value(branch_id).unwrap_or(self.params.baseline);
        let next = apply_drift(current, magnitude, decrease);

        match self.usage.get_mut(branch_id) {
            Some(value) => *value = next,
            None => {
                self.usage.insert(branch_id.to_string(), next);
            }
        }
        next
    }

    pub fn summary(&self) -> UsageSummary {
        if self.usage.is_empty() {
            return UsageSummary::default();
        }

        let mut min = u64::MAX;
        let mut max = 0;
        let mut total: u128 = 0;
        for &v in self.usage.values() {
            min = min.min(v);
            max = max.max(v);
            total += v as u128;
        }

        UsageSummary {
            branches: self.usage.len(),
            min,
            max,
            mean: total as f64 / self.usage.len() as f64,
        }
    }
}
