use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::range::{self, StandardRange, StandardRangeOwner};
use super::{
    impl_range_action_adder, impl_remedial_action_adder, RangeAction, RangeActionCommon,
    RemedialAction, RemedialActionAdderFields, RemedialActionCommon,
};
use crate::crac::Crac;
use crate::error::{CracError, CracResult};
use crate::network::NetworkModel;
use crate::network_element::NetworkElement;

const SETPOINT_TOLERANCE: f64 = 1e-6;

/// Injection shift spread over several generators or loads.
///
/// Applying setpoint `s` sets `s * key` on each injection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjectionRangeAction {
    common: RemedialActionCommon,
    range: RangeActionCommon,
    distribution_keys: Vec<(NetworkElement, f64)>,
    ranges: Vec<StandardRange>,
    initial_setpoint: Option<f64>,
}

impl InjectionRangeAction {
    /// Element and key, one entry per distinct element
    pub fn injection_distribution_keys(&self) -> &[(NetworkElement, f64)] {
        &self.distribution_keys
    }

    pub fn ranges(&self) -> &[StandardRange] {
        &self.ranges
    }

    pub fn initial_setpoint(&self) -> Option<f64> {
        self.initial_setpoint
    }
}

impl RemedialAction for InjectionRangeAction {
    fn common(&self) -> &RemedialActionCommon {
        &self.common
    }

    fn network_elements(&self) -> Vec<&NetworkElement> {
        self.distribution_keys.iter().map(|(element, _)| element).collect()
    }
}

impl RangeAction for InjectionRangeAction {
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

    /// Common `injection / key` ratio; an error when injections disagree.
    fn current_setpoint(&self, network: &dyn NetworkModel) -> CracResult<f64> {
        let mut setpoint: Option<f64> = None;
        for (element, key) in self.distribution_keys.iter().filter(|(_, key)| *key != 0.0) {
            let ratio = network.injection_setpoint(element.id())? / key;
            match setpoint {
                None => setpoint = Some(ratio),
                Some(reference)
                    if (reference - ratio).abs()
                        > SETPOINT_TOLERANCE * reference.abs().max(1.0) =>
                {
                    return Err(CracError::InvalidData(format!(
                        "Cannot evaluate reference setpoint of InjectionRangeAction {}, as the injections are not distributed according to their key",
                        self.id()
                    )))
                }
                Some(_) => {}
            }
        }
        Ok(setpoint.unwrap_or(0.0))
    }

    fn apply(&self, network: &mut dyn NetworkModel, setpoint: f64) -> CracResult<()> {
        for (element, key) in &self.distribution_keys {
            network.set_injection_setpoint(element.id(), setpoint * key)?;
        }
        Ok(())
    }

    fn range_count(&self) -> usize {
        self.ranges.len()
    }
}

/// Builder for [`InjectionRangeAction`]
pub struct InjectionRangeActionAdder<'a> {
    crac: &'a mut Crac,
    fields: RemedialActionAdderFields,
    range: RangeActionCommon,
    keys: Vec<(NetworkElement, f64)>,
    used_single_element: bool,
    ranges: Vec<StandardRange>,
    initial_setpoint: Option<f64>,
}

impl_remedial_action_adder!(InjectionRangeActionAdder);
impl_range_action_adder!(InjectionRangeActionAdder);

impl<'a> StandardRangeOwner for InjectionRangeActionAdder<'a> {
    fn push_standard_range(&mut self, range: StandardRange) {
        self.ranges.push(range);
    }
}

impl<'a> InjectionRangeActionAdder<'a> {
    pub(crate) fn new(crac: &'a mut Crac) -> Self {
        Self {
            crac,
            fields: RemedialActionAdderFields::default(),
            range: RangeActionCommon::default(),
            keys: Vec::new(),
            used_single_element: false,
            ranges: Vec::new(),
            initial_setpoint: None,
        }
    }

    /// Single injection with key 1.0
    pub fn with_network_element(mut self, id: impl Into<String>) -> Self {
        self.used_single_element = true;
        self.keys.push((NetworkElement::new(id, None), 1.0));
        self
    }

    /// Add `key` to the distribution key of element `id`.
    pub fn with_network_element_and_key(mut self, key: f64, id: impl Into<String>) -> Self {
        self.keys.push((NetworkElement::new(id, None), key));
        self
    }

    pub fn with_network_element_and_key_named(
        mut self,
        key: f64,
        id: impl Into<String>,
        name: &str,
    ) -> Self {
        self.keys.push((NetworkElement::new(id, Some(name)), key));
        self
    }

    pub fn with_initial_setpoint(mut self, setpoint: f64) -> Self {
        self.initial_setpoint = Some(setpoint);
        self
    }

    pub fn add(self) -> CracResult<&'a InjectionRangeAction> {
        let id = self.fields.require_id("InjectionRangeAction")?;
        self.fields.check_unique(self.crac, &id)?;
        self.fields.check_auto_speed("Injection range action")?;
        if self.keys.is_empty() {
            return Err(CracError::MissingField(
                "Cannot add InjectionRangeAction without a injection distribution key. Please use withNetworkElementAndKey()".into(),
            ));
        }
        if self.used_single_element && self.keys.len() > 1 {
            return Err(CracError::InvalidData(
                "There are already NetworkElements tied to this injection. Use instead withNetworkElementAndKey() to add multiple NetworkElements".into(),
            ));
        }
        if self.ranges.is_empty() {
            return Err(CracError::MissingField(
                "Cannot add InjectionRangeAction without a range. Please use newRange()".into(),
            ));
        }

        let mut summed: BTreeMap<String, (NetworkElement, f64)> = BTreeMap::new();
        for (element, key) in self.keys {
            summed
                .entry(element.id().to_string())
                .and_modify(|(_, total)| *total += key)
                .or_insert((element, key));
        }
        let distribution_keys: Vec<(NetworkElement, f64)> = summed.into_values().collect();
        self.fields.warn_if_unusable(&id);

        let crac = self.crac;
        let elements: Vec<&NetworkElement> = distribution_keys.iter().map(|(e, _)| e).collect();
        self.fields.register(crac, &elements)?;
        debug!(
            remedial_action = %id,
            injections = distribution_keys.len(),
            "adding injection range action"
        );
        let action = InjectionRangeAction {
            common: self.fields.into_common(id.clone()),
            range: self.range,
            distribution_keys,
            ranges: self.ranges,
            initial_setpoint: self.initial_setpoint,
        };
        Ok(crac.injection_range_actions.entry(id).or_insert(action))
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
            .unwrap();
        crac
    }

    #[test]
    fn test_keys_are_summed_per_element() {
        let mut crac = crac();
        let action = crac
            .new_injection_range_action()
            .with_id("injection")
            .with_network_element_and_key(1.0, "generator1")
            .with_network_element_and_key(-0.5, "load1")
            .with_network_element_and_key(0.5, "generator1")
            .new_range()
            .with_min(-100.0)
            .with_max(100.0)
            .add()
            .unwrap()
            .add()
            .unwrap();
        let keys = action.injection_distribution_keys();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].0.id(), "generator1");
        assert_eq!(keys[0].1, 1.5);
        assert_eq!(keys[1].1, -0.5);
    }

    #[test]
    fn test_missing_key_and_range() {
        let mut crac = crac();
        let err = crac
            .new_injection_range_action()
            .with_id("injection")
            .new_range()
            .with_min(-1.0)
            .with_max(1.0)
            .add()
            .unwrap()
            .add()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot add InjectionRangeAction without a injection distribution key. Please use withNetworkElementAndKey()"
        );
        let err = crac
            .new_injection_range_action()
            .with_id("injection")
            .with_network_element("generator1")
            .add()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot add InjectionRangeAction without a range. Please use newRange()"
        );
    }

    #[test]
    fn test_single_element_cannot_be_mixed() {
        let mut crac = crac();
        let err = crac
            .new_injection_range_action()
            .with_id("injection")
            .with_network_element_and_key(1.0, "generator1")
            .with_network_element("generator2")
            .new_range()
            .with_min(-1.0)
            .with_max(1.0)
            .add()
            .unwrap()
            .add()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "There are already NetworkElements tied to this injection. Use instead withNetworkElementAndKey() to add multiple NetworkElements"
        );
    }
}
