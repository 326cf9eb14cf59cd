use serde::{Deserialize, Serialize};
use tracing::debug;

use super::threshold::{BranchThreshold, Threshold};
use super::{
    impl_cnec_adder_fields, margin_between, status_between, Cnec, CnecAdderFields, CnecCommon,
    SecurityStatus,
};
use crate::crac::Crac;
use crate::error::{CracError, CracResult};
use crate::network::{NetworkModel, Side};
use crate::network_element::NetworkElement;
use crate::units::{Amperes, Kilovolts, Megawatts, PhysicalParameter, Unit};

/// Flow measured on both sides of a branch; NaN for unmonitored sides
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlowCnecValue {
    pub side_one: f64,
    pub side_two: f64,
}

impl FlowCnecValue {
    pub fn side(&self, side: Side) -> f64 {
        match side {
            Side::One => self.side_one,
            Side::Two => self.side_two,
        }
    }
}

/// Flow limit on a branch in a given state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowCnec {
    common: CnecCommon,
    network_element: NetworkElement,
    thresholds: Vec<BranchThreshold>,
    nominal_voltages: [Option<f64>; 2],
    i_max: [Option<f64>; 2],
}

impl FlowCnec {
    pub fn network_element(&self) -> &NetworkElement {
        &self.network_element
    }

    pub fn thresholds(&self) -> &[BranchThreshold] {
        &self.thresholds
    }

    pub fn nominal_voltage(&self, side: Side) -> Option<f64> {
        self.nominal_voltages[side.index()]
    }

    pub fn i_max(&self, side: Side) -> Option<f64> {
        self.i_max[side.index()]
    }

    /// Sides carrying at least one threshold
    pub fn monitored_sides(&self) -> Vec<Side> {
        Side::BOTH
            .into_iter()
            .filter(|side| self.thresholds.iter().any(|t| t.side == *side))
            .collect()
    }

    fn check_evaluation_unit(&self, unit: Unit) -> CracResult<()> {
        unit.check_physical_parameter(PhysicalParameter::Flow)?;
        match unit {
            Unit::Megawatt | Unit::Ampere => Ok(()),
            _ => Err(CracError::InvalidData(format!(
                "Unit {} cannot be used to evaluate FlowCnec {}",
                unit,
                self.id()
            ))),
        }
    }

    fn voltage(&self, side: Side) -> CracResult<Kilovolts> {
        self.nominal_voltage(side).map(Kilovolts).ok_or_else(|| {
            CracError::InvalidData(format!(
                "Nominal voltage on {} side of FlowCnec {} is required to convert between MW and A",
                side.label(),
                self.id()
            ))
        })
    }

    /// Convert a value from a threshold unit into MW or A on `side`.
    fn convert(&self, value: f64, from: Unit, to: Unit, side: Side) -> CracResult<f64> {
        if from == to {
            return Ok(value);
        }
        let amperes = match from {
            Unit::Megawatt => return Ok(Megawatts(value).to_amperes(self.voltage(side)?).value()),
            Unit::Ampere => Amperes(value),
            Unit::PercentImax => {
                let i_max = self.i_max(side).ok_or_else(|| {
                    CracError::InvalidData(format!(
                        "iMax on {} side of FlowCnec {} is not defined",
                        side.label(),
                        self.id()
                    ))
                })?;
                Amperes::from_percent_imax(value, Amperes(i_max))
            }
            other => {
                return Err(CracError::InvalidData(format!(
                    "Unit {} cannot be used to evaluate FlowCnec {}",
                    other,
                    self.id()
                )))
            }
        };
        match to {
            Unit::Ampere => Ok(amperes.value()),
            _ => Ok(amperes.to_megawatts(self.voltage(side)?).value()),
        }
    }

    fn converted_reliability_margin(&self, side: Side, unit: Unit) -> CracResult<f64> {
        if self.common.reliability_margin == 0.0 {
            return Ok(0.0);
        }
        self.convert(self.common.reliability_margin, Unit::Megawatt, unit, side)
    }

    /// Tightest ceiling on `side`, derated by the reliability margin.
    pub fn upper_bound(&self, side: Side, unit: Unit) -> CracResult<Option<f64>> {
        self.check_evaluation_unit(unit)?;
        let mut bound: Option<f64> = None;
        for branch_threshold in self.thresholds.iter().filter(|t| t.side == side) {
            if let Some(max) = branch_threshold.threshold.max() {
                let converted = self.convert(max, branch_threshold.threshold.unit(), unit, side)?;
                bound = Some(bound.map_or(converted, |b| b.min(converted)));
            }
        }
        match bound {
            Some(b) => Ok(Some(b - self.converted_reliability_margin(side, unit)?)),
            None => Ok(None),
        }
    }

    /// Tightest floor on `side`, derated by the reliability margin.
    pub fn lower_bound(&self, side: Side, unit: Unit) -> CracResult<Option<f64>> {
        self.check_evaluation_unit(unit)?;
        let mut bound: Option<f64> = None;
        for branch_threshold in self.thresholds.iter().filter(|t| t.side == side) {
            if let Some(min) = branch_threshold.threshold.min() {
                let converted = self.convert(min, branch_threshold.threshold.unit(), unit, side)?;
                bound = Some(bound.map_or(converted, |b| b.max(converted)));
            }
        }
        match bound {
            Some(b) => Ok(Some(b + self.converted_reliability_margin(side, unit)?)),
            None => Ok(None),
        }
    }

    /// Margin of a given flow value on `side`
    pub fn margin(&self, value: f64, side: Side, unit: Unit) -> CracResult<f64> {
        Ok(margin_between(
            value,
            self.lower_bound(side, unit)?,
            self.upper_bound(side, unit)?,
        ))
    }

    pub fn security_status(&self, value: f64, side: Side, unit: Unit) -> CracResult<SecurityStatus> {
        Ok(status_between(
            value,
            self.lower_bound(side, unit)?,
            self.upper_bound(side, unit)?,
        ))
    }

    /// Read the live flow on every monitored side.
    pub fn compute_value(&self, network: &dyn NetworkModel, unit: Unit) -> CracResult<FlowCnecValue> {
        self.check_evaluation_unit(unit)?;
        let mut values = [f64::NAN; 2];
        for side in self.monitored_sides() {
            let flow = network.terminal_flow(self.network_element.id(), side)?;
            values[side.index()] = match unit {
                Unit::Megawatt => flow.active_power,
                _ => {
                    let current = if flow.current.is_nan() {
                        Megawatts(flow.active_power)
                            .to_amperes(self.voltage(side)?)
                            .abs()
                            .value()
                    } else {
                        flow.current.abs()
                    };
                    if flow.active_power < 0.0 {
                        -current
                    } else {
                        current
                    }
                }
            };
        }
        Ok(FlowCnecValue {
            side_one: values[0],
            side_two: values[1],
        })
    }
}

impl Cnec for FlowCnec {
    fn common(&self) -> &CnecCommon {
        &self.common
    }

    fn physical_parameter(&self) -> PhysicalParameter {
        PhysicalParameter::Flow
    }

    fn network_elements(&self) -> Vec<&NetworkElement> {
        vec![&self.network_element]
    }

    fn compute_margin(&self, network: &dyn NetworkModel, unit: Unit) -> CracResult<f64> {
        let value = self.compute_value(network, unit)?;
        let mut margin = f64::INFINITY;
        for side in self.monitored_sides() {
            margin = margin.min(self.margin(value.side(side), side, unit)?);
        }
        Ok(margin)
    }

    fn compute_security_status(
        &self,
        network: &dyn NetworkModel,
        unit: Unit,
    ) -> CracResult<SecurityStatus> {
        let value = self.compute_value(network, unit)?;
        let mut status = SecurityStatus::Secure;
        for side in self.monitored_sides() {
            status = status.combine(self.security_status(value.side(side), side, unit)?);
        }
        Ok(status)
    }
}

/// Builder for [`FlowCnec`]
pub struct FlowCnecAdder<'a> {
    crac: &'a mut Crac,
    fields: CnecAdderFields,
    network_elements: Vec<NetworkElement>,
    thresholds: Vec<BranchThreshold>,
    nominal_voltages: [Option<f64>; 2],
    i_max: [Option<f64>; 2],
}

impl_cnec_adder_fields!(FlowCnecAdder);

impl<'a> FlowCnecAdder<'a> {
    pub(crate) fn new(crac: &'a mut Crac) -> Self {
        Self {
            crac,
            fields: CnecAdderFields::default(),
            network_elements: Vec::new(),
            thresholds: Vec::new(),
            nominal_voltages: [None; 2],
            i_max: [None; 2],
        }
    }

    pub fn with_network_element(mut self, id: impl Into<String>) -> Self {
        self.network_elements.push(NetworkElement::new(id, None));
        self
    }

    pub fn with_network_element_and_name(mut self, id: impl Into<String>, name: &str) -> Self {
        self.network_elements.push(NetworkElement::new(id, Some(name)));
        self
    }

    /// Nominal voltage (kV) on both sides
    pub fn with_nominal_voltage(mut self, voltage: f64) -> Self {
        self.nominal_voltages = [Some(voltage); 2];
        self
    }

    pub fn with_nominal_voltage_on(mut self, voltage: f64, side: Side) -> Self {
        self.nominal_voltages[side.index()] = Some(voltage);
        self
    }

    /// Thermal limit (A) on both sides
    pub fn with_i_max(mut self, i_max: f64) -> Self {
        self.i_max = [Some(i_max); 2];
        self
    }

    pub fn with_i_max_on(mut self, i_max: f64, side: Side) -> Self {
        self.i_max[side.index()] = Some(i_max);
        self
    }

    pub fn new_threshold(self) -> FlowThresholdAdder<'a> {
        FlowThresholdAdder {
            owner: self,
            unit: None,
            min: None,
            max: None,
            side: None,
        }
    }

    pub fn add(self) -> CracResult<&'a FlowCnec> {
        let id = self.fields.require_id("FlowCnec")?;
        self.fields.require_instant()?;
        let network_element = match self.network_elements.as_slice() {
            [] => {
                return Err(CracError::MissingField(
                    "Cannot add Cnec without a network element. Please use withNetworkElement()"
                        .into(),
                ))
            }
            [element] => element.clone(),
            _ => {
                return Err(CracError::InvalidData(
                    "Cannot add multiple network elements for a flow cnec.".into(),
                ))
            }
        };
        let Some(first) = self.thresholds.first() else {
            return Err(CracError::MissingField(
                "Cannot add a cnec without a threshold. Please use newThreshold".into(),
            ));
        };
        if self.thresholds.iter().any(|t| t.side != first.side) {
            return Err(CracError::InvalidData(format!(
                "All thresholds of FlowCnec {} must be defined on the same side.",
                id
            )));
        }
        self.fields.check_unique(self.crac, &id)?;
        let state = self.fields.resolve_state(self.crac, &id)?;

        for branch_threshold in &self.thresholds {
            let side = branch_threshold.side;
            let unit = branch_threshold.threshold.unit();
            if unit == Unit::PercentImax && self.i_max[side.index()].is_none() {
                return Err(CracError::MissingField(format!(
                    "iMax on {label} side of FlowCnec {} must be defined, as one of its threshold is on PERCENT_IMAX on the {label} side. Please use withIMax()",
                    id,
                    label = side.label()
                )));
            }
            if matches!(unit, Unit::Ampere | Unit::PercentImax)
                && self.nominal_voltages.iter().any(Option::is_none)
            {
                return Err(CracError::MissingField(format!(
                    "nominal voltages on both side of FlowCnec {} must be defined, as one of its threshold is on PERCENT_IMAX or AMPERE. Please use withNominalVoltage()",
                    id
                )));
            }
        }

        let crac = self.crac;
        crac.check_network_element(&network_element)?;
        crac.register_network_element(network_element.clone());
        let state = crac.register_state(state).clone();

        debug!(cnec = %id, state = %state, "adding flow cnec");
        let cnec = FlowCnec {
            common: self.fields.into_common(id.clone(), state),
            network_element,
            thresholds: self.thresholds,
            nominal_voltages: self.nominal_voltages,
            i_max: self.i_max,
        };
        Ok(crac.flow_cnecs.entry(id).or_insert(cnec))
    }
}

/// Nested builder for side-aware flow thresholds
pub struct FlowThresholdAdder<'a> {
    owner: FlowCnecAdder<'a>,
    unit: Option<Unit>,
    min: Option<f64>,
    max: Option<f64>,
    side: Option<Side>,
}

impl<'a> FlowThresholdAdder<'a> {
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

    pub fn with_side(mut self, side: Side) -> Self {
        self.side = Some(side);
        self
    }

    pub fn add(self) -> CracResult<FlowCnecAdder<'a>> {
        let threshold =
            Threshold::checked(self.unit, self.min, self.max, PhysicalParameter::Flow)?;
        let side = self.side.ok_or_else(|| {
            CracError::MissingField(
                "Cannot add a threshold without side. Please use withSide()".into(),
            )
        })?;
        let mut owner = self.owner;
        owner.thresholds.push(BranchThreshold { threshold, side });
        Ok(owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instant::InstantKind;

    fn crac() -> Crac {
        let mut crac = Crac::new("crac");
        crac.new_instant("preventive", InstantKind::Preventive)
            .unwrap()
            .new_instant("outage", InstantKind::Outage)
            .unwrap()
            .new_instant("curative", InstantKind::Curative)
            .unwrap();
        crac.new_contingency().with_id("co1").add().unwrap();
        crac
    }

    fn preventive_adder(crac: &mut Crac) -> FlowCnecAdder<'_> {
        crac.new_flow_cnec()
            .with_id("cnec")
            .with_instant("preventive")
            .with_network_element("ne1")
    }

    #[test]
    fn test_megawatt_threshold_in_amperes() {
        let mut crac = crac();
        let cnec = preventive_adder(&mut crac)
            .with_nominal_voltage(380.0)
            .new_threshold()
            .with_unit(Unit::Megawatt)
            .with_side(Side::One)
            .with_min(-500.0)
            .with_max(500.0)
            .add()
            .unwrap()
            .add()
            .unwrap();

        let upper = cnec.upper_bound(Side::One, Unit::Ampere).unwrap().unwrap();
        assert!((upper - 500.0 / (0.38 * 3.0_f64.sqrt())).abs() < 1e-6);
        assert!((upper - 759.67).abs() < 0.01);
        assert_eq!(cnec.upper_bound(Side::Two, Unit::Ampere).unwrap(), None);
        assert_eq!(cnec.upper_bound(Side::One, Unit::Megawatt).unwrap(), Some(500.0));
        assert_eq!(cnec.lower_bound(Side::One, Unit::Megawatt).unwrap(), Some(-500.0));
        assert!(!cnec.is_optimized());
        assert!(!cnec.is_monitored());
    }

    #[test]
    fn test_reliability_margin_is_symmetric() {
        let mut crac = crac();
        let cnec = preventive_adder(&mut crac)
            .with_reliability_margin(20.0)
            .new_threshold()
            .with_unit(Unit::Megawatt)
            .with_side(Side::Two)
            .with_min(-100.0)
            .with_max(100.0)
            .add()
            .unwrap()
            .add()
            .unwrap();
        assert_eq!(cnec.upper_bound(Side::Two, Unit::Megawatt).unwrap(), Some(80.0));
        assert_eq!(cnec.lower_bound(Side::Two, Unit::Megawatt).unwrap(), Some(-80.0));
        assert_eq!(cnec.margin(50.0, Side::Two, Unit::Megawatt).unwrap(), 30.0);
        assert_eq!(
            cnec.security_status(90.0, Side::Two, Unit::Megawatt).unwrap(),
            SecurityStatus::HighConstraint
        );
    }

    #[test]
    fn test_tightest_threshold_wins() {
        let mut crac = crac();
        let cnec = preventive_adder(&mut crac)
            .with_nominal_voltage(400.0)
            .with_i_max(1000.0)
            .new_threshold()
            .with_unit(Unit::PercentImax)
            .with_side(Side::One)
            .with_max(1.1)
            .add()
            .unwrap()
            .new_threshold()
            .with_unit(Unit::Ampere)
            .with_side(Side::One)
            .with_max(1200.0)
            .add()
            .unwrap()
            .add()
            .unwrap();
        let upper = cnec.upper_bound(Side::One, Unit::Ampere).unwrap().unwrap();
        assert!((upper - 1100.0).abs() < 1e-9);
        assert_eq!(cnec.lower_bound(Side::One, Unit::Ampere).unwrap(), None);
    }

    #[test]
    fn test_unsupported_bound_unit() {
        let mut crac = crac();
        let cnec = preventive_adder(&mut crac)
            .new_threshold()
            .with_unit(Unit::Megawatt)
            .with_side(Side::One)
            .with_max(100.0)
            .add()
            .unwrap()
            .add()
            .unwrap();
        let err = cnec.upper_bound(Side::One, Unit::PercentImax).unwrap_err();
        assert_eq!(err.to_string(), "Unit % cannot be used to evaluate FlowCnec cnec");
        let err = cnec.upper_bound(Side::One, Unit::Kilovolt).unwrap_err();
        assert_eq!(err.to_string(), "kV Unit is not suited to measure a FLOW value.");
    }

    #[test]
    fn test_missing_threshold_side() {
        let mut crac = crac();
        let err = preventive_adder(&mut crac)
            .new_threshold()
            .with_unit(Unit::Megawatt)
            .with_max(100.0)
            .add()
            .err()
            .unwrap();
        assert_eq!(
            err.to_string(),
            "Cannot add a threshold without side. Please use withSide()"
        );
    }

    #[test]
    fn test_thresholds_must_share_a_side() {
        let mut crac = crac();
        let err = preventive_adder(&mut crac)
            .new_threshold()
            .with_unit(Unit::Megawatt)
            .with_side(Side::One)
            .with_max(100.0)
            .add()
            .unwrap()
            .new_threshold()
            .with_unit(Unit::Megawatt)
            .with_side(Side::Two)
            .with_max(100.0)
            .add()
            .unwrap()
            .add()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "All thresholds of FlowCnec cnec must be defined on the same side."
        );
    }

    #[test]
    fn test_percent_imax_requires_i_max() {
        let mut crac = crac();
        let err = preventive_adder(&mut crac)
            .with_nominal_voltage(400.0)
            .new_threshold()
            .with_unit(Unit::PercentImax)
            .with_side(Side::Two)
            .with_max(1.0)
            .add()
            .unwrap()
            .add()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "iMax on right side of FlowCnec cnec must be defined, as one of its threshold is on PERCENT_IMAX on the right side. Please use withIMax()"
        );
    }

    #[test]
    fn test_ampere_requires_both_nominal_voltages() {
        let mut crac = crac();
        let err = preventive_adder(&mut crac)
            .with_nominal_voltage_on(400.0, Side::One)
            .new_threshold()
            .with_unit(Unit::Ampere)
            .with_side(Side::One)
            .with_max(1000.0)
            .add()
            .unwrap()
            .add()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "nominal voltages on both side of FlowCnec cnec must be defined, as one of its threshold is on PERCENT_IMAX or AMPERE. Please use withNominalVoltage()"
        );
    }

    #[test]
    fn test_state_validation() {
        fn threshold(adder: FlowCnecAdder<'_>) -> FlowCnecAdder<'_> {
            adder
                .new_threshold()
                .with_unit(Unit::Megawatt)
                .with_side(Side::One)
                .with_max(100.0)
                .add()
                .unwrap()
        }

        let mut crac = crac();

        let err = threshold(preventive_adder(&mut crac).with_contingency("co1"))
            .add()
            .unwrap_err();
        assert_eq!(err.to_string(), "You cannot define a contingency for a preventive cnec.");

        let err = threshold(
            crac.new_flow_cnec()
                .with_id("cnec")
                .with_instant("curative")
                .with_network_element("ne1"),
        )
        .add()
        .unwrap_err();
        assert_eq!(err.to_string(), "You must define a contingency for a non-preventive cnec.");

        let err = threshold(
            crac.new_flow_cnec()
                .with_id("cnec")
                .with_instant("curative")
                .with_contingency("co2")
                .with_network_element("ne1"),
        )
        .add()
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Contingency co2 of Cnec cnec does not exist in the crac. Use crac.newContingency() first."
        );
        assert_eq!(crac.flow_cnecs().count(), 0);
        assert_eq!(crac.network_elements().count(), 0);
    }

    #[test]
    fn test_missing_fields() {
        let mut crac = crac();
        let err = crac.new_flow_cnec().add().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot add a FlowCnec object with no specified id. Please use withId()"
        );
        let err = crac.new_flow_cnec().with_id("c").add().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot add Cnec without a instant. Please use withInstant() with a non null value"
        );
        let err = crac
            .new_flow_cnec()
            .with_id("c")
            .with_instant("preventive")
            .add()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot add Cnec without a network element. Please use withNetworkElement()"
        );
        let err = preventive_adder(&mut crac).add().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot add a cnec without a threshold. Please use newThreshold"
        );
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let mut crac = crac();
        for expect_ok in [true, false] {
            let result = preventive_adder(&mut crac)
                .new_threshold()
                .with_unit(Unit::Megawatt)
                .with_side(Side::One)
                .with_max(100.0)
                .add()
                .unwrap()
                .add()
                .map(|c| c.id().to_string());
            if expect_ok {
                assert_eq!(result.unwrap(), "cnec");
            } else {
                assert_eq!(
                    result.unwrap_err().to_string(),
                    "Cannot add a cnec with an already existing ID - cnec."
                );
            }
        }
    }
}
