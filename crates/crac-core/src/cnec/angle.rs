use serde::{Deserialize, Serialize};
use tracing::debug;

use super::threshold::{Threshold, ThresholdOwner};
use super::{
    impl_cnec_adder_fields, margin_between, status_between, Cnec, CnecAdderFields, CnecCommon,
    SecurityStatus,
};
use crate::crac::Crac;
use crate::error::{CracError, CracResult};
use crate::network::NetworkModel;
use crate::network_element::NetworkElement;
use crate::units::{PhysicalParameter, Unit};

/// Voltage-angle difference between an exporting and an importing element.
///
/// Monitor-only: angle cnecs can never be optimized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AngleCnec {
    common: CnecCommon,
    exporting_network_element: NetworkElement,
    importing_network_element: NetworkElement,
    thresholds: Vec<Threshold>,
}

impl AngleCnec {
    pub fn exporting_network_element(&self) -> &NetworkElement {
        &self.exporting_network_element
    }

    pub fn importing_network_element(&self) -> &NetworkElement {
        &self.importing_network_element
    }

    pub fn thresholds(&self) -> &[Threshold] {
        &self.thresholds
    }

    pub fn upper_bound(&self, unit: Unit) -> CracResult<Option<f64>> {
        unit.check_physical_parameter(PhysicalParameter::Angle)?;
        Ok(self
            .thresholds
            .iter()
            .filter_map(Threshold::max)
            .reduce(f64::min)
            .map(|b| b - self.common.reliability_margin))
    }

    pub fn lower_bound(&self, unit: Unit) -> CracResult<Option<f64>> {
        unit.check_physical_parameter(PhysicalParameter::Angle)?;
        Ok(self
            .thresholds
            .iter()
            .filter_map(Threshold::min)
            .reduce(f64::max)
            .map(|b| b + self.common.reliability_margin))
    }

    pub fn margin(&self, value: f64, unit: Unit) -> CracResult<f64> {
        Ok(margin_between(value, self.lower_bound(unit)?, self.upper_bound(unit)?))
    }

    /// `angle(exporting) - angle(importing)` in degrees
    pub fn compute_value(&self, network: &dyn NetworkModel, unit: Unit) -> CracResult<f64> {
        unit.check_physical_parameter(PhysicalParameter::Angle)?;
        let exporting = network.voltage_angle(self.exporting_network_element.id())?;
        let importing = network.voltage_angle(self.importing_network_element.id())?;
        Ok(exporting - importing)
    }
}

impl Cnec for AngleCnec {
    fn common(&self) -> &CnecCommon {
        &self.common
    }

    fn physical_parameter(&self) -> PhysicalParameter {
        PhysicalParameter::Angle
    }

    fn network_elements(&self) -> Vec<&NetworkElement> {
        vec![
            &self.exporting_network_element,
            &self.importing_network_element,
        ]
    }

    fn compute_margin(&self, network: &dyn NetworkModel, unit: Unit) -> CracResult<f64> {
        self.margin(self.compute_value(network, unit)?, unit)
    }

    fn compute_security_status(
        &self,
        network: &dyn NetworkModel,
        unit: Unit,
    ) -> CracResult<SecurityStatus> {
        let value = self.compute_value(network, unit)?;
        Ok(status_between(
            value,
            self.lower_bound(unit)?,
            self.upper_bound(unit)?,
        ))
    }
}

/// Builder for [`AngleCnec`]
pub struct AngleCnecAdder<'a> {
    crac: &'a mut Crac,
    fields: CnecAdderFields,
    exporting: Option<NetworkElement>,
    importing: Option<NetworkElement>,
    thresholds: Vec<Threshold>,
}

impl_cnec_adder_fields!(AngleCnecAdder);

impl<'a> ThresholdOwner for AngleCnecAdder<'a> {
    const PHYSICAL_PARAMETER: PhysicalParameter = PhysicalParameter::Angle;

    fn push_threshold(&mut self, threshold: Threshold) {
        self.thresholds.push(threshold);
    }
}

impl<'a> AngleCnecAdder<'a> {
    pub(crate) fn new(crac: &'a mut Crac) -> Self {
        Self {
            crac,
            fields: CnecAdderFields::default(),
            exporting: None,
            importing: None,
            thresholds: Vec::new(),
        }
    }

    pub fn with_exporting_network_element(mut self, id: impl Into<String>) -> Self {
        self.exporting = Some(NetworkElement::new(id, None));
        self
    }

    pub fn with_exporting_network_element_and_name(
        mut self,
        id: impl Into<String>,
        name: &str,
    ) -> Self {
        self.exporting = Some(NetworkElement::new(id, Some(name)));
        self
    }

    pub fn with_importing_network_element(mut self, id: impl Into<String>) -> Self {
        self.importing = Some(NetworkElement::new(id, None));
        self
    }

    pub fn with_importing_network_element_and_name(
        mut self,
        id: impl Into<String>,
        name: &str,
    ) -> Self {
        self.importing = Some(NetworkElement::new(id, Some(name)));
        self
    }

    pub fn add(self) -> CracResult<&'a AngleCnec> {
        let id = self.fields.require_id("AngleCnec")?;
        self.fields.require_instant()?;
        let exporting = self.exporting.ok_or_else(|| {
            CracError::MissingField(
                "Cannot add AngleCnec without a exporting network element. Please use withExportingNetworkElement() with a non null value".into(),
            )
        })?;
        let importing = self.importing.ok_or_else(|| {
            CracError::MissingField(
                "Cannot add AngleCnec without a importing network element. Please use withImportingNetworkElement() with a non null value".into(),
            )
        })?;
        if self.thresholds.is_empty() {
            return Err(CracError::MissingField(
                "Cannot add an AngleCnec without a threshold. Please use newThreshold".into(),
            ));
        }
        if self.fields.optimized {
            return Err(CracError::InvalidData(format!(
                "Error while adding cnec {} : optimization of AngleCnecs is not supported.",
                id
            )));
        }
        self.fields.check_unique(self.crac, &id)?;
        let state = self.fields.resolve_state(self.crac, &id)?;

        let crac = self.crac;
        crac.check_network_element(&exporting)?;
        crac.check_network_element(&importing)?;
        crac.register_network_element(exporting.clone());
        crac.register_network_element(importing.clone());
        let state = crac.register_state(state).clone();

        debug!(cnec = %id, state = %state, "adding angle cnec");
        let cnec = AngleCnec {
            common: self.fields.into_common(id.clone(), state),
            exporting_network_element: exporting,
            importing_network_element: importing,
            thresholds: self.thresholds,
        };
        Ok(crac.angle_cnecs.entry(id).or_insert(cnec))
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

    fn adder(crac: &mut Crac) -> AngleCnecAdder<'_> {
        crac.new_angle_cnec()
            .with_id("angle")
            .with_instant("curative")
            .with_contingency("co1")
            .with_exporting_network_element("eNE")
            .with_importing_network_element("iNE")
    }

    #[test]
    fn test_add_angle_cnec() {
        let mut crac = crac();
        let cnec = adder(&mut crac)
            .with_operator("FR")
            .with_reliability_margin(1.0)
            .new_threshold()
            .with_unit(Unit::Degree)
            .with_min(-100.0)
            .with_max(100.0)
            .add()
            .unwrap()
            .new_threshold()
            .with_unit(Unit::Degree)
            .with_max(80.0)
            .add()
            .unwrap()
            .add()
            .unwrap();
        assert_eq!(cnec.operator(), Some("FR"));
        assert_eq!(cnec.state().id(), "co1 - curative");
        assert_eq!(cnec.upper_bound(Unit::Degree).unwrap(), Some(79.0));
        assert_eq!(cnec.lower_bound(Unit::Degree).unwrap(), Some(-99.0));
        assert_eq!(cnec.margin(70.0, Unit::Degree).unwrap(), 9.0);
        assert_eq!(crac.network_elements().count(), 2);
    }

    #[test]
    fn test_optimized_angle_cnec_is_rejected() {
        let mut crac = crac();
        let err = adder(&mut crac)
            .with_optimized(true)
            .new_threshold()
            .with_unit(Unit::Degree)
            .with_max(100.0)
            .add()
            .unwrap()
            .add()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error while adding cnec angle : optimization of AngleCnecs is not supported."
        );
    }

    #[test]
    fn test_missing_elements_and_threshold() {
        let mut crac = crac();
        let err = crac
            .new_angle_cnec()
            .with_id("angle")
            .with_instant("preventive")
            .with_importing_network_element("iNE")
            .add()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot add AngleCnec without a exporting network element. Please use withExportingNetworkElement() with a non null value"
        );
        let err = crac
            .new_angle_cnec()
            .with_id("angle")
            .with_instant("preventive")
            .with_exporting_network_element("eNE")
            .add()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot add AngleCnec without a importing network element. Please use withImportingNetworkElement() with a non null value"
        );
        let err = adder(&mut crac).add().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot add an AngleCnec without a threshold. Please use newThreshold"
        );
    }

    #[test]
    fn test_wrong_threshold_unit() {
        let mut crac = crac();
        let err = adder(&mut crac)
            .new_threshold()
            .with_unit(Unit::Megawatt)
            .with_max(100.0)
            .add()
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "MW Unit is not suited to measure a ANGLE value.");
    }
}
