//! Critical network elements and contingencies (cnecs).
//!
//! A cnec is a monitored quantity in a given [`State`]. Three kinds exist:
//!
//! - [`FlowCnec`]: active power / current on a branch, side-aware
//! - [`AngleCnec`]: voltage-angle difference between two elements
//! - [`VoltageCnec`]: voltage magnitude at one element
//!
//! All of them share [`CnecCommon`] and implement the [`Cnec`] trait, which
//! carries the network-facing computations (margin, security status,
//! location, connectivity).

mod angle;
mod flow;
pub mod threshold;
mod voltage;

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use angle::{AngleCnec, AngleCnecAdder};
pub use flow::{FlowCnec, FlowCnecAdder, FlowCnecValue, FlowThresholdAdder};
pub use threshold::{BranchThreshold, Threshold, ThresholdAdder, ThresholdOwner};
pub use voltage::{VoltageCnec, VoltageCnecAdder};

use crate::crac::Crac;
use crate::error::{CracError, CracResult};
use crate::network::{Country, NetworkModel, Side};
use crate::network_element::NetworkElement;
use crate::state::State;
use crate::units::{PhysicalParameter, Unit};

/// Outcome of checking a value against its bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecurityStatus {
    Secure,
    HighConstraint,
    LowConstraint,
    HighAndLowConstraints,
}

impl SecurityStatus {
    pub(crate) fn from_flags(high: bool, low: bool) -> Self {
        match (high, low) {
            (false, false) => SecurityStatus::Secure,
            (true, false) => SecurityStatus::HighConstraint,
            (false, true) => SecurityStatus::LowConstraint,
            (true, true) => SecurityStatus::HighAndLowConstraints,
        }
    }

    pub fn has_high_constraint(self) -> bool {
        matches!(
            self,
            SecurityStatus::HighConstraint | SecurityStatus::HighAndLowConstraints
        )
    }

    pub fn has_low_constraint(self) -> bool {
        matches!(
            self,
            SecurityStatus::LowConstraint | SecurityStatus::HighAndLowConstraints
        )
    }

    /// Merge the statuses of two sides of the same cnec
    pub fn combine(self, other: SecurityStatus) -> SecurityStatus {
        SecurityStatus::from_flags(
            self.has_high_constraint() || other.has_high_constraint(),
            self.has_low_constraint() || other.has_low_constraint(),
        )
    }
}

impl fmt::Display for SecurityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SecurityStatus::Secure => "SECURE",
            SecurityStatus::HighConstraint => "HIGH_CONSTRAINT",
            SecurityStatus::LowConstraint => "LOW_CONSTRAINT",
            SecurityStatus::HighAndLowConstraints => "HIGH_AND_LOW_CONSTRAINTS",
        };
        f.write_str(label)
    }
}

/// Lightweight handle to a cnec, as stored in OnConstraint usage rules.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CnecReference {
    pub id: String,
    pub physical_parameter: PhysicalParameter,
    pub state: State,
}

impl CnecReference {
    pub fn from_cnec(cnec: &dyn Cnec) -> Self {
        Self {
            id: cnec.id().to_string(),
            physical_parameter: cnec.physical_parameter(),
            state: cnec.state().clone(),
        }
    }
}

/// Identity and flags shared by every cnec kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CnecCommon {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) operator: Option<String>,
    pub(crate) border: Option<String>,
    pub(crate) state: State,
    pub(crate) reliability_margin: f64,
    pub(crate) optimized: bool,
    pub(crate) monitored: bool,
}

/// Behaviour shared by flow, angle and voltage cnecs.
pub trait Cnec {
    fn common(&self) -> &CnecCommon;

    fn physical_parameter(&self) -> PhysicalParameter;

    /// Every network element the cnec observes
    fn network_elements(&self) -> Vec<&NetworkElement>;

    /// Distance to the closest violated or binding bound, in `unit`.
    ///
    /// Negative when the cnec is overloaded.
    fn compute_margin(&self, network: &dyn NetworkModel, unit: Unit) -> CracResult<f64>;

    fn compute_security_status(
        &self,
        network: &dyn NetworkModel,
        unit: Unit,
    ) -> CracResult<SecurityStatus>;

    fn id(&self) -> &str {
        &self.common().id
    }

    fn name(&self) -> &str {
        &self.common().name
    }

    fn operator(&self) -> Option<&str> {
        self.common().operator.as_deref()
    }

    fn border(&self) -> Option<&str> {
        self.common().border.as_deref()
    }

    fn state(&self) -> &State {
        &self.common().state
    }

    fn reliability_margin(&self) -> f64 {
        self.common().reliability_margin
    }

    fn is_optimized(&self) -> bool {
        self.common().optimized
    }

    fn is_monitored(&self) -> bool {
        self.common().monitored
    }

    /// Countries touched by the cnec's network elements
    fn location(&self, network: &dyn NetworkModel) -> CracResult<BTreeSet<Country>> {
        let mut countries = BTreeSet::new();
        for element in self.network_elements() {
            countries.extend(network.countries(element.id())?);
        }
        Ok(countries)
    }

    /// Both terminals of every observed element are connected
    fn is_connected(&self, network: &dyn NetworkModel) -> CracResult<bool> {
        for element in self.network_elements() {
            for side in Side::BOTH {
                if !network.is_terminal_connected(element.id(), side)? {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }
}

/// `min(upper - value, value - lower)`, an absent bound counting as +inf.
pub(crate) fn margin_between(value: f64, lower: Option<f64>, upper: Option<f64>) -> f64 {
    let upper_margin = upper.map_or(f64::INFINITY, |u| u - value);
    let lower_margin = lower.map_or(f64::INFINITY, |l| value - l);
    upper_margin.min(lower_margin)
}

pub(crate) fn status_between(value: f64, lower: Option<f64>, upper: Option<f64>) -> SecurityStatus {
    SecurityStatus::from_flags(
        upper.is_some_and(|u| value > u),
        lower.is_some_and(|l| value < l),
    )
}

/// Builder fields shared by the three cnec adders.
#[derive(Debug, Default)]
pub(crate) struct CnecAdderFields {
    pub(crate) id: Option<String>,
    pub(crate) name: Option<String>,
    pub(crate) operator: Option<String>,
    pub(crate) border: Option<String>,
    pub(crate) instant_id: Option<String>,
    pub(crate) contingency_id: Option<String>,
    pub(crate) reliability_margin: f64,
    pub(crate) optimized: bool,
    pub(crate) monitored: bool,
}

impl CnecAdderFields {
    pub(crate) fn require_id(&self, kind: &str) -> CracResult<String> {
        self.id.clone().ok_or_else(|| {
            CracError::MissingField(format!(
                "Cannot add a {} object with no specified id. Please use withId()",
                kind
            ))
        })
    }

    pub(crate) fn require_instant(&self) -> CracResult<&str> {
        self.instant_id.as_deref().ok_or_else(|| {
            CracError::MissingField(
                "Cannot add Cnec without a instant. Please use withInstant() with a non null value"
                    .into(),
            )
        })
    }

    pub(crate) fn check_unique(&self, crac: &Crac, id: &str) -> CracResult<()> {
        if crac.cnec(id).is_some() {
            return Err(CracError::Conflict(format!(
                "Cannot add a cnec with an already existing ID - {}.",
                id
            )));
        }
        Ok(())
    }

    /// Validate the instant / contingency pair and build the cnec's state.
    pub(crate) fn resolve_state(&self, crac: &Crac, id: &str) -> CracResult<State> {
        let instant = crac.instant(self.require_instant()?)?;
        match (instant.is_preventive(), self.contingency_id.as_deref()) {
            (true, Some(_)) => Err(CracError::InvalidData(
                "You cannot define a contingency for a preventive cnec.".into(),
            )),
            (false, None) => Err(CracError::InvalidData(
                "You must define a contingency for a non-preventive cnec.".into(),
            )),
            (false, Some(contingency_id)) if crac.contingency(contingency_id).is_none() => {
                Err(CracError::UnknownReference(format!(
                    "Contingency {} of Cnec {} does not exist in the crac. Use crac.newContingency() first.",
                    contingency_id, id
                )))
            }
            (_, contingency_id) => Ok(crac.make_state(contingency_id, instant)),
        }
    }

    pub(crate) fn into_common(self, id: String, state: State) -> CnecCommon {
        CnecCommon {
            name: self.name.unwrap_or_else(|| id.clone()),
            id,
            operator: self.operator,
            border: self.border,
            state,
            reliability_margin: self.reliability_margin,
            optimized: self.optimized,
            monitored: self.monitored,
        }
    }
}

/// Builder methods shared by the cnec adders
macro_rules! impl_cnec_adder_fields {
    ($adder:ident) => {
        impl<'a> $adder<'a> {
            pub fn with_id(mut self, id: impl Into<String>) -> Self {
                self.fields.id = Some(id.into());
                self
            }

            pub fn with_name(mut self, name: impl Into<String>) -> Self {
                self.fields.name = Some(name.into());
                self
            }

            pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
                self.fields.operator = Some(operator.into());
                self
            }

            pub fn with_border(mut self, border: impl Into<String>) -> Self {
                self.fields.border = Some(border.into());
                self
            }

            pub fn with_instant(mut self, instant_id: impl Into<String>) -> Self {
                self.fields.instant_id = Some(instant_id.into());
                self
            }

            pub fn with_contingency(mut self, contingency_id: impl Into<String>) -> Self {
                self.fields.contingency_id = Some(contingency_id.into());
                self
            }

            pub fn with_reliability_margin(mut self, margin: f64) -> Self {
                self.fields.reliability_margin = margin;
                self
            }

            pub fn with_optimized(mut self, optimized: bool) -> Self {
                self.fields.optimized = optimized;
                self
            }

            pub fn with_monitored(mut self, monitored: bool) -> Self {
                self.fields.monitored = monitored;
                self
            }
        }
    };
}

pub(crate) use impl_cnec_adder_fields;
