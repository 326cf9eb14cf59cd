//! Per-instant caps on how many remedial actions may be activated.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::Crac;
use crate::error::{CracError, CracResult};
use crate::instant::Instant;

const UNLIMITED: i32 = i32::MAX;

/// Activation limits at one instant.
///
/// Per-TSO maps are keyed by operator; an operator absent from a map is
/// unlimited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaUsageLimits {
    pub max_ra: i32,
    pub max_tso: i32,
    pub max_topo_per_tso: BTreeMap<String, i32>,
    pub max_pst_per_tso: BTreeMap<String, i32>,
    pub max_ra_per_tso: BTreeMap<String, i32>,
    pub max_elementary_actions_per_tso: BTreeMap<String, i32>,
}

impl Default for RaUsageLimits {
    fn default() -> Self {
        Self {
            max_ra: UNLIMITED,
            max_tso: UNLIMITED,
            max_topo_per_tso: BTreeMap::new(),
            max_pst_per_tso: BTreeMap::new(),
            max_ra_per_tso: BTreeMap::new(),
            max_elementary_actions_per_tso: BTreeMap::new(),
        }
    }
}

impl RaUsageLimits {
    pub fn max_topo_for(&self, tso: &str) -> i32 {
        self.max_topo_per_tso.get(tso).copied().unwrap_or(UNLIMITED)
    }

    pub fn max_pst_for(&self, tso: &str) -> i32 {
        self.max_pst_per_tso.get(tso).copied().unwrap_or(UNLIMITED)
    }

    pub fn max_ra_for(&self, tso: &str) -> i32 {
        self.max_ra_per_tso.get(tso).copied().unwrap_or(UNLIMITED)
    }

    pub fn max_elementary_actions_for(&self, tso: &str) -> i32 {
        self.max_elementary_actions_per_tso
            .get(tso)
            .copied()
            .unwrap_or(UNLIMITED)
    }

    /// Negative limits become 0
    pub(crate) fn clamped(mut self) -> Self {
        self.max_ra = clamp("max_ra", self.max_ra);
        self.max_tso = clamp("max_tso", self.max_tso);
        for (field, map) in [
            ("max_topo_per_tso", &mut self.max_topo_per_tso),
            ("max_pst_per_tso", &mut self.max_pst_per_tso),
            ("max_ra_per_tso", &mut self.max_ra_per_tso),
            ("max_elementary_actions_per_tso", &mut self.max_elementary_actions_per_tso),
        ] {
            for value in map.values_mut() {
                *value = clamp(field, *value);
            }
        }
        self
    }
}

fn clamp(field: &str, value: i32) -> i32 {
    if value < 0 {
        warn!(field, value, "negative remedial action usage limit set to 0");
        0
    } else {
        value
    }
}

/// Builder for the [`RaUsageLimits`] of one instant
pub struct RaUsageLimitsAdder<'a> {
    crac: &'a mut Crac,
    instant_id: String,
    limits: RaUsageLimits,
}

impl<'a> RaUsageLimitsAdder<'a> {
    /// Start from a complete set of limits
    pub fn with_limits(mut self, limits: RaUsageLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_max_ra(mut self, max_ra: i32) -> Self {
        self.limits.max_ra = max_ra;
        self
    }

    pub fn with_max_tso(mut self, max_tso: i32) -> Self {
        self.limits.max_tso = max_tso;
        self
    }

    pub fn with_max_topo_per_tso(mut self, limits: impl IntoIterator<Item = (String, i32)>) -> Self {
        self.limits.max_topo_per_tso = limits.into_iter().collect();
        self
    }

    pub fn with_max_pst_per_tso(mut self, limits: impl IntoIterator<Item = (String, i32)>) -> Self {
        self.limits.max_pst_per_tso = limits.into_iter().collect();
        self
    }

    pub fn with_max_ra_per_tso(mut self, limits: impl IntoIterator<Item = (String, i32)>) -> Self {
        self.limits.max_ra_per_tso = limits.into_iter().collect();
        self
    }

    pub fn with_max_elementary_actions_per_tso(
        mut self,
        limits: impl IntoIterator<Item = (String, i32)>,
    ) -> Self {
        self.limits.max_elementary_actions_per_tso = limits.into_iter().collect();
        self
    }

    /// Replace the limits of the instant; it must be defined in the Crac.
    pub fn add(self) -> CracResult<&'a RaUsageLimits> {
        if self.crac.instant(&self.instant_id).is_err() {
            return Err(CracError::UnknownReference(format!(
                "The instant {} does not exist in the crac.",
                self.instant_id
            )));
        }
        let limits = self.limits.clamped();
        debug!(instant = %self.instant_id, max_ra = limits.max_ra, "setting remedial action usage limits");
        let crac = self.crac;
        let slot = crac
            .ra_usage_limits
            .entry(self.instant_id)
            .or_default();
        *slot = limits;
        Ok(slot)
    }
}

impl Crac {
    pub fn new_ra_usage_limits(&mut self, instant_id: impl Into<String>) -> RaUsageLimitsAdder<'_> {
        RaUsageLimitsAdder {
            crac: self,
            instant_id: instant_id.into(),
            limits: RaUsageLimits::default(),
        }
    }

    /// Limits at `instant`, unlimited when none were set
    pub fn ra_usage_limits(&self, instant: &Instant) -> RaUsageLimits {
        self.ra_usage_limits
            .get(instant.id())
            .cloned()
            .unwrap_or_default()
    }

    /// Limits that were explicitly set, keyed by instant id
    pub fn ra_usage_limits_per_instant(&self) -> &BTreeMap<String, RaUsageLimits> {
        &self.ra_usage_limits
    }
}
