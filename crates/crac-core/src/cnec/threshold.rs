//! Thresholds: the raw limits a cnec is defined with.
//!
//! A threshold is expressed in its own [`Unit`] and is only turned into a
//! bound (in the unit a caller asks for) by the owning cnec.

use serde::{Deserialize, Serialize};

use crate::error::{CracError, CracResult};
use crate::network::Side;
use crate::units::{PhysicalParameter, Unit};

/// `[min, max]` limit in a given unit; either end may be open.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    unit: Unit,
    min: Option<f64>,
    max: Option<f64>,
}

impl Threshold {
    /// Validated construction; used by every threshold adder.
    pub(crate) fn checked(
        unit: Option<Unit>,
        min: Option<f64>,
        max: Option<f64>,
        parameter: PhysicalParameter,
    ) -> CracResult<Self> {
        let unit = unit.ok_or_else(|| {
            CracError::MissingField(
                "Cannot add Threshold without a Unit. Please use withUnit() with a non null value"
                    .into(),
            )
        })?;
        unit.check_physical_parameter(parameter)?;
        if min.is_none() && max.is_none() {
            return Err(CracError::MissingField(
                "Cannot add a threshold without min nor max values. Please use withMin() or withMax()."
                    .into(),
            ));
        }
        Ok(Self { unit, min, max })
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn min(&self) -> Option<f64> {
        self.min
    }

    pub fn max(&self) -> Option<f64> {
        self.max
    }

    pub fn limits_by_min(&self) -> bool {
        self.min.is_some()
    }

    pub fn limits_by_max(&self) -> bool {
        self.max.is_some()
    }
}

/// Flow threshold attached to one side of a branch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BranchThreshold {
    pub threshold: Threshold,
    pub side: Side,
}

/// Parent adder collecting thresholds of a single physical parameter.
pub trait ThresholdOwner: Sized {
    const PHYSICAL_PARAMETER: PhysicalParameter;

    fn push_threshold(&mut self, threshold: Threshold);

    fn new_threshold(self) -> ThresholdAdder<Self> {
        ThresholdAdder::new(self)
    }
}

/// Nested builder for angle and voltage thresholds.
///
/// `add` hands the parent adder back so chaining can continue.
pub struct ThresholdAdder<P: ThresholdOwner> {
    owner: P,
    unit: Option<Unit>,
    min: Option<f64>,
    max: Option<f64>,
}

impl<P: ThresholdOwner> ThresholdAdder<P> {
    pub(crate) fn new(owner: P) -> Self {
        Self {
            owner,
            unit: None,
            min: None,
            max: None,
        }
    }

    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
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
        let threshold = Threshold::checked(self.unit, self.min, self.max, P::PHYSICAL_PARAMETER)?;
        let mut owner = self.owner;
        owner.push_threshold(threshold);
        Ok(owner)
    }
}
