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

/// Voltage magnitude limit at one element. Never optimized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoltageCnec {
    common: CnecCommon,
    network_element: NetworkElement,
    thresholds: Vec<Threshold>,
}

impl VoltageCnec {
    pub fn network_element(&self) -> &NetworkElement {
        &self.network_element
    }

    pub fn thresholds(&self) -> &[Threshold] {
        &self.thresholds
    }

    pub fn upper_bound(&self, unit: Unit) -> CracResult<Option<f64>> {
        unit.check_physical_parameter(PhysicalParameter::Voltage)?;
        Ok(self
            .thresholds
            .iter()
            .filter_map(Threshold::max)
            .reduce(f64::min)
            .map(|b| b - self.common.reliability_margin))
    }

    pub fn lower_bound(&self, unit: Unit) -> CracResult<Option<f64>> {
        unit.check_physical_parameter(PhysicalParameter::Voltage)?;
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

    pub fn compute_value(&self, network: &dyn NetworkModel, unit: Unit) -> CracResult<f64> {
        unit.check_physical_parameter(PhysicalParameter::Voltage)?;
        network.voltage_magnitude(self.network_element.id())
    }
}

impl Cnec for VoltageCnec {
    fn common(&self) -> &CnecCommon {
        &self.common
    }

    fn physical_parameter(&self) -> PhysicalParameter {
        PhysicalParameter::Voltage
    }

    fn network_elements(&self) -> Vec<&NetworkElement> {
        vec![&self.network_element]
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

/// Builder for [`VoltageCnec`]
pub struct VoltageCnecAdder<'a> {
    crac: &'a mut Crac,
    fields: CnecAdderFields,
    network_element: Option<NetworkElement>,
    thresholds: Vec<Threshold>,
}

impl_cnec_adder_fields!(VoltageCnecAdder);

impl<'a> ThresholdOwner for VoltageCnecAdder<'a> {
    const PHYSICAL_PARAMETER: PhysicalParameter = PhysicalParameter::Voltage;

    fn push_threshold(&mut self, threshold: Threshold) {
        self.thresholds.push(threshold);
    }
}

impl<'a> VoltageCnecAdder<'a> {
    pub(crate) fn new(crac: &'a mut Crac) -> Self {
        Self {
            crac,
            fields: CnecAdderFields::default(),
            network_element: None,
            thresholds: Vec::new(),
        }
    }

    pub fn with_network_element(mut self, id: impl Into<String>) -> Self {
        self.network_element = Some(NetworkElement::new(id, None));
        self
    }

    pub fn with_network_element_and_name(mut self, id: impl Into<String>, name: &str) -> Self {
        self.network_element = Some(NetworkElement::new(id, Some(name)));
        self
    }

    pub fn add(self) -> CracResult<&'a VoltageCnec> {
        let id = self.fields.require_id("VoltageCnec")?;
        self.fields.require_instant()?;
        let network_element = self.network_element.ok_or_else(|| {
            CracError::MissingField(
                "Cannot add Cnec without a network element. Please use withNetworkElement()".into(),
            )
        })?;
        if self.thresholds.is_empty() {
            return Err(CracError::MissingField(
                "Cannot add a VoltageCnec without a threshold. Please use newThreshold".into(),
            ));
        }
        if self.fields.optimized {
            return Err(CracError::InvalidData(format!(
                "Error while adding cnec {} : optimization of VoltageCnecs is not supported.",
                id
            )));
        }
        self.fields.check_unique(self.crac, &id)?;
        let state = self.fields.resolve_state(self.crac, &id)?;

        let crac = self.crac;
        crac.check_network_element(&network_element)?;
        crac.register_network_element(network_element.clone());
        let state = crac.register_state(state).clone();

        debug!(cnec = %id, state = %state, "adding voltage cnec");
        let cnec = VoltageCnec {
            common: self.fields.into_common(id.clone(), state),
            network_element,
            thresholds: self.thresholds,
        };
        Ok(crac.voltage_cnecs.entry(id).or_insert(cnec))
    }
}
