//! Admissible ranges of range actions.
//!
//! A range is anchored by its [`RangeType`]: absolute, relative to the
//! initial network, or relative to the setpoint chosen at the previous
//! instant. An action's admissible interval is the intersection of all its
//! ranges once anchored.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::pst::PstRangeActionAdder;
use crate::error::{CracError, CracResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RangeType {
    Absolute,
    RelativeToInitialNetwork,
    RelativeToPreviousInstant,
}

impl fmt::Display for RangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RangeType::Absolute => "ABSOLUTE",
            RangeType::RelativeToInitialNetwork => "RELATIVE_TO_INITIAL_NETWORK",
            RangeType::RelativeToPreviousInstant => "RELATIVE_TO_PREVIOUS_INSTANT",
        };
        f.write_str(label)
    }
}

/// Tap interval of a PST
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapRange {
    range_type: RangeType,
    min_tap: i32,
    max_tap: i32,
}

impl TapRange {
    pub fn range_type(&self) -> RangeType {
        self.range_type
    }

    pub fn min_tap(&self) -> i32 {
        self.min_tap
    }

    pub fn max_tap(&self) -> i32 {
        self.max_tap
    }

    /// `[min, max]` in absolute taps
    pub(crate) fn anchored(&self, initial_tap: i32, previous_tap: i32) -> (i32, i32) {
        let anchor = match self.range_type {
            RangeType::Absolute => return (self.min_tap, self.max_tap),
            RangeType::RelativeToInitialNetwork => initial_tap,
            RangeType::RelativeToPreviousInstant => previous_tap,
        };
        (
            anchor.saturating_add(self.min_tap),
            anchor.saturating_add(self.max_tap),
        )
    }
}

/// Setpoint interval (MW) of an HVDC, injection or counter-trade action
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StandardRange {
    range_type: RangeType,
    min: f64,
    max: f64,
}

impl StandardRange {
    pub fn range_type(&self) -> RangeType {
        self.range_type
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

fn anchor(
    range: &StandardRange,
    initial_setpoint: Option<f64>,
    previous_setpoint: f64,
    action_id: &str,
) -> CracResult<f64> {
    match range.range_type {
        RangeType::Absolute => Ok(0.0),
        RangeType::RelativeToInitialNetwork => initial_setpoint.ok_or_else(|| {
            CracError::InvalidData(format!(
                "Range action {} has a range relative to the initial network but no initial setpoint",
                action_id
            ))
        }),
        RangeType::RelativeToPreviousInstant => Ok(previous_setpoint),
    }
}

/// Tightest floor over `ranges`
pub(crate) fn min_admissible_setpoint(
    ranges: &[StandardRange],
    initial_setpoint: Option<f64>,
    previous_setpoint: f64,
    action_id: &str,
) -> CracResult<f64> {
    let mut min = f64::NEG_INFINITY;
    for range in ranges {
        min = min.max(anchor(range, initial_setpoint, previous_setpoint, action_id)? + range.min);
    }
    Ok(min)
}

/// Tightest ceiling over `ranges`
pub(crate) fn max_admissible_setpoint(
    ranges: &[StandardRange],
    initial_setpoint: Option<f64>,
    previous_setpoint: f64,
    action_id: &str,
) -> CracResult<f64> {
    let mut max = f64::INFINITY;
    for range in ranges {
        max = max.min(anchor(range, initial_setpoint, previous_setpoint, action_id)? + range.max);
    }
    Ok(max)
}

/// Parent adder collecting standard ranges.
pub trait StandardRangeOwner: Sized {
    fn push_standard_range(&mut self, range: StandardRange);

    fn new_range(self) -> StandardRangeAdder<Self> {
        StandardRangeAdder {
            owner: self,
            range_type: RangeType::Absolute,
            min: None,
            max: None,
        }
    }
}

/// Nested builder for a [`StandardRange`]; the range type defaults to absolute.
pub struct StandardRangeAdder<P: StandardRangeOwner> {
    owner: P,
    range_type: RangeType,
    min: Option<f64>,
    max: Option<f64>,
}

impl<P: StandardRangeOwner> StandardRangeAdder<P> {
    pub fn with_range_type(mut self, range_type: RangeType) -> Self {
        self.range_type = range_type;
        self
    }

    pub fn with_min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn with_max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn add(self) -> CracResult<P> {
        let min = self.min.ok_or_else(|| {
            CracError::MissingField("StandardRange min value was not defined.".into())
        })?;
        let max = self.max.ok_or_else(|| {
            CracError::MissingField("StandardRange max value was not defined.".into())
        })?;
        if max < min {
            return Err(CracError::InvalidData(
                "Max value of StandardRange must be equal or greater than min value.".into(),
            ));
        }
        let mut owner = self.owner;
        owner.push_standard_range(StandardRange {
            range_type: self.range_type,
            min,
            max,
        });
        Ok(owner)
    }
}

/// Nested builder for a PST [`TapRange`]. Open ends default to the widest taps.
pub struct TapRangeAdder<'a> {
    owner: PstRangeActionAdder<'a>,
    range_type: Option<RangeType>,
    min_tap: i32,
    max_tap: i32,
}

impl<'a> TapRangeAdder<'a> {
    pub(crate) fn new(owner: PstRangeActionAdder<'a>) -> Self {
        Self {
            owner,
            range_type: None,
            min_tap: i32::MIN,
            max_tap: i32::MAX,
        }
    }

    pub fn with_range_type(mut self, range_type: RangeType) -> Self {
        self.range_type = Some(range_type);
        self
    }

    pub fn with_min_tap(mut self, min_tap: i32) -> Self {
        self.min_tap = min_tap;
        self
    }

    pub fn with_max_tap(mut self, max_tap: i32) -> Self {
        self.max_tap = max_tap;
        self
    }

    pub fn add(self) -> CracResult<PstRangeActionAdder<'a>> {
        let range_type = self.range_type.ok_or_else(|| {
            CracError::MissingField(
                "Cannot add a tap range without a range type. Please use withRangeType() with a non null value".into(),
            )
        })?;
        if self.max_tap < self.min_tap {
            return Err(CracError::InvalidData(
                "Max tap of TapRange is inferior to min tap.".into(),
            ));
        }
        let mut owner = self.owner;
        owner.push_tap_range(TapRange {
            range_type,
            min_tap: self.min_tap,
            max_tap: self.max_tap,
        });
        Ok(owner)
    }
}
