use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::range::{self, StandardRange, StandardRangeOwner};
use super::{
    impl_range_action_adder, impl_remedial_action_adder, RangeAction, RangeActionCommon,
    RemedialAction, RemedialActionAdderFields, RemedialActionCommon,
};
use crate::crac::Crac;
use crate::error::{CracError, CracResult};
use crate::network::{HvdcConverterMode, NetworkModel};
use crate::network_element::NetworkElement;

/// Active power setpoint (MW) of an HVDC line; the sign selects the direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HvdcRangeAction {
    common: RemedialActionCommon,
    range: RangeActionCommon,
    network_element: NetworkElement,
    ranges: Vec<StandardRange>,
    initial_setpoint: Option<f64>,
}

impl HvdcRangeAction {
    pub fn network_element(&self) -> &NetworkElement {
        &self.network_element
    }

    pub fn ranges(&self) -> &[StandardRange] {
        &self.ranges
    }

    pub fn initial_setpoint(&self) -> Option<f64> {
        self.initial_setpoint
    }
}

impl RemedialAction for HvdcRangeAction {
    fn common(&self) -> &RemedialActionCommon {
        &self.common
    }

    fn network_elements(&self) -> Vec<&NetworkElement> {
        vec![&self.network_element]
    }
}

impl RangeAction for HvdcRangeAction {
    fn range_common(&self) -> &RangeActionCommon {
        &self.range
    }

    fn min_admissible_setpoint(&self, previous_instant_setpoint: f64) -> CracResult<f64> {
        range::min_admissible_setpoint(
            &self.ranges,
            self.initial_setpoint,
            previous_instant_setpoint,
            self.id(),
        )
    }

    fn max_admissible_setpoint(&self, previous_instant_setpoint: f64) -> CracResult<f64> {
        range::max_admissible_setpoint(
            &self.ranges,
            self.initial_setpoint,
            previous_instant_setpoint,
            self.id(),
        )
    }

    fn current_setpoint(&self, network: &dyn NetworkModel) -> CracResult<f64> {
        network.hvdc_setpoint(self.network_element.id())
    }

    /// Angle droop is switched off first: the setpoint would be ignored otherwise.
    fn apply(&self, network: &mut dyn NetworkModel, setpoint: f64) -> CracResult<()> {
        let hvdc_id = self.network_element.id();
        if network.is_hvdc_angle_droop_active(hvdc_id)? {
            warn!(
                remedial_action = %self.id(),
                hvdc = %hvdc_id,
                "deactivating angle droop active power control before applying setpoint"
            );
            network.set_hvdc_angle_droop_active(hvdc_id, false)?;
        }
        let mode = if setpoint >= 0.0 {
            HvdcConverterMode::SideOneRectifierSideTwoInverter
        } else {
            HvdcConverterMode::SideOneInverterSideTwoRectifier
        };
        network.set_hvdc_converter_mode(hvdc_id, mode)?;
        network.set_hvdc_active_power_setpoint(hvdc_id, setpoint.abs())
    }

    fn range_count(&self) -> usize {
        self.ranges.len()
    }
}

/// Builder for [`HvdcRangeAction`]
pub struct HvdcRangeActionAdder<'a> {
    crac: &'a mut Crac,
    fields: RemedialActionAdderFields,
    range: RangeActionCommon,
    network_element: Option<NetworkElement>,
    ranges: Vec<StandardRange>,
    initial_setpoint: Option<f64>,
}

impl_remedial_action_adder!(HvdcRangeActionAdder);
impl_range_action_adder!(HvdcRangeActionAdder);

impl<'a> StandardRangeOwner for HvdcRangeActionAdder<'a> {
    fn push_standard_range(&mut self, range: StandardRange) {
        self.ranges.push(range);
    }
}

impl<'a> HvdcRangeActionAdder<'a> {
    pub(crate) fn new(crac: &'a mut Crac) -> Self {
        Self {
            crac,
            fields: RemedialActionAdderFields::default(),
            range: RangeActionCommon::default(),
            network_element: None,
            ranges: Vec::new(),
            initial_setpoint: None,
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

    pub fn with_initial_setpoint(mut self, setpoint: f64) -> Self {
        self.initial_setpoint = Some(setpoint);
        self
    }

    pub fn add(self) -> CracResult<&'a HvdcRangeAction> {
        let id = self.fields.require_id("HvdcRangeAction")?;
        self.fields.check_unique(self.crac, &id)?;
        self.fields.check_auto_speed("Hvdc range action")?;
        let network_element = self.network_element.ok_or_else(|| {
            CracError::MissingField(
                "Cannot add HvdcRangeAction without a network element. Please use withNetworkElement() with a non null value".into(),
            )
        })?;
        if self.ranges.is_empty() {
            return Err(CracError::MissingField(
                "Cannot add HvdcRangeAction without a range. Please use newRange()".into(),
            ));
        }
        self.fields.warn_if_unusable(&id);

        let crac = self.crac;
        self.fields.register(crac, &[&network_element])?;
        debug!(remedial_action = %id, "adding HVDC range action");
        let action = HvdcRangeAction {
            common: self.fields.into_common(id.clone()),
            range: self.range,
            network_element,
            ranges: self.ranges,
            initial_setpoint: self.initial_setpoint,
        };
        Ok(crac.hvdc_range_actions.entry(id).or_insert(action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instant::InstantKind;
    use crate::remedial_action::{RangeType, VariationDirection};
    use crate::usage_rule::{UsageMethod, UsageRuleOwner};

    fn crac() -> Crac {
        let mut crac = Crac::new("crac");
        crac.new_instant("preventive", InstantKind::Preventive)
            .unwrap()
            .new_instant("outage", InstantKind::Outage)
            .unwrap();
        crac
    }

    #[test]
    fn test_add_hvdc_range_action() {
        let mut crac = crac();
        let hvdc = crac
            .new_hvdc_range_action()
            .with_id("hvdc")
            .with_network_element("BBE2AA11 FFR3AA11 1")
            .with_group_id("group")
            .with_initial_setpoint(100.0)
            .with_variation_cost(10.0, VariationDirection::Up)
            .new_range()
            .with_min(-1000.0)
            .with_max(1000.0)
            .add()
            .unwrap()
            .new_range()
            .with_range_type(RangeType::RelativeToInitialNetwork)
            .with_min(-300.0)
            .with_max(300.0)
            .add()
            .unwrap()
            .new_on_instant_usage_rule()
            .with_instant("preventive")
            .with_usage_method(UsageMethod::Available)
            .add()
            .unwrap()
            .add()
            .unwrap();
        assert_eq!(hvdc.group_id(), Some("group"));
        assert_eq!(hvdc.variation_cost(VariationDirection::Up), Some(10.0));
        assert_eq!(hvdc.variation_cost(VariationDirection::Down), None);
        assert_eq!(hvdc.min_admissible_setpoint(0.0).unwrap(), -200.0);
        assert_eq!(hvdc.max_admissible_setpoint(0.0).unwrap(), 400.0);
        assert_eq!(crac.network_elements().count(), 1);
    }

    #[test]
    fn test_hvdc_requires_range() {
        let mut crac = crac();
        let err = crac
            .new_hvdc_range_action()
            .with_id("hvdc")
            .with_network_element("ne")
            .add()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot add HvdcRangeAction without a range. Please use newRange()"
        );
    }

    #[test]
    fn test_standard_range_validation() {
        let mut crac = crac();
        let err = crac
            .new_hvdc_range_action()
            .new_range()
            .with_max(10.0)
            .add()
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "StandardRange min value was not defined.");
        let err = crac
            .new_hvdc_range_action()
            .new_range()
            .with_min(10.0)
            .with_max(5.0)
            .add()
            .err()
            .unwrap();
        assert_eq!(
            err.to_string(),
            "Max value of StandardRange must be equal or greater than min value."
        );
    }
}
