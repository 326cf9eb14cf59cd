//! Cascading removal.
//!
//! Removing a cnec or a remedial action releases the network elements and
//! states it used; each released id is deleted when no remaining cnec or
//! remedial action references it. Unknown ids are ignored.

use tracing::debug;

use super::Crac;
use crate::cnec::Cnec;
use crate::error::{CracError, CracResult};
use crate::remedial_action::RemedialAction;
use crate::usage_rule::UsageRule;

/// Ids an entity held on shared registries
#[derive(Debug, Default)]
struct Released {
    network_elements: Vec<String>,
    states: Vec<String>,
}

impl Released {
    fn from_cnec(cnec: &dyn Cnec) -> Self {
        Self {
            network_elements: cnec.network_elements().iter().map(|e| e.id().to_string()).collect(),
            states: vec![cnec.state().id().to_string()],
        }
    }

    fn from_remedial_action<R: RemedialAction + ?Sized>(action: &R) -> Self {
        Self {
            network_elements: action
                .network_elements()
                .iter()
                .map(|e| e.id().to_string())
                .collect(),
            states: contingency_states(action.usage_rules()),
        }
    }
}

fn contingency_states(rules: &[UsageRule]) -> Vec<String> {
    rules
        .iter()
        .filter_map(|rule| match rule {
            UsageRule::OnContingencyState { state, .. } => Some(state.id().to_string()),
            _ => None,
        })
        .collect()
}

impl Crac {
    pub fn remove_flow_cnec(&mut self, id: &str) {
        if let Some(cnec) = self.flow_cnecs.remove(id) {
            debug!(cnec = %id, "removing flow cnec");
            self.release(Released::from_cnec(&cnec));
        }
    }

    pub fn remove_angle_cnec(&mut self, id: &str) {
        if let Some(cnec) = self.angle_cnecs.remove(id) {
            debug!(cnec = %id, "removing angle cnec");
            self.release(Released::from_cnec(&cnec));
        }
    }

    pub fn remove_voltage_cnec(&mut self, id: &str) {
        if let Some(cnec) = self.voltage_cnecs.remove(id) {
            debug!(cnec = %id, "removing voltage cnec");
            self.release(Released::from_cnec(&cnec));
        }
    }

    /// Remove a cnec of any kind
    pub fn remove_cnec(&mut self, id: &str) {
        self.remove_flow_cnec(id);
        self.remove_angle_cnec(id);
        self.remove_voltage_cnec(id);
    }

    pub fn remove_network_action(&mut self, id: &str) {
        if let Some(action) = self.network_actions.remove(id) {
            debug!(remedial_action = %id, "removing network action");
            self.release(Released::from_remedial_action(&action));
        }
    }

    pub fn remove_pst_range_action(&mut self, id: &str) {
        if let Some(action) = self.pst_range_actions.remove(id) {
            debug!(remedial_action = %id, "removing pst range action");
            self.release(Released::from_remedial_action(&action));
        }
    }

    pub fn remove_hvdc_range_action(&mut self, id: &str) {
        if let Some(action) = self.hvdc_range_actions.remove(id) {
            debug!(remedial_action = %id, "removing hvdc range action");
            self.release(Released::from_remedial_action(&action));
        }
    }

    pub fn remove_injection_range_action(&mut self, id: &str) {
        if let Some(action) = self.injection_range_actions.remove(id) {
            debug!(remedial_action = %id, "removing injection range action");
            self.release(Released::from_remedial_action(&action));
        }
    }

    pub fn remove_counter_trade_range_action(&mut self, id: &str) {
        if let Some(action) = self.counter_trade_range_actions.remove(id) {
            debug!(remedial_action = %id, "removing counter trade range action");
            self.release(Released::from_remedial_action(&action));
        }
    }

    pub fn remove_range_action(&mut self, id: &str) {
        self.remove_pst_range_action(id);
        self.remove_hvdc_range_action(id);
        self.remove_injection_range_action(id);
        self.remove_counter_trade_range_action(id);
    }

    pub fn remove_remedial_action(&mut self, id: &str) {
        self.remove_network_action(id);
        self.remove_range_action(id);
    }

    /// Remove a contingency and the states built on it.
    ///
    /// Fails while a cnec or a usage rule of any kind still refers to the
    /// contingency.
    pub fn remove_contingency(&mut self, id: &str) -> CracResult<()> {
        if !self.contingencies.contains_key(id) {
            return Ok(());
        }
        let in_cnec = self.cnecs().any(|c| c.state().contingency_id() == Some(id));
        let in_rule = self
            .remedial_actions()
            .any(|ra| ra.usage_rules().iter().any(|rule| rule.contingency_id() == Some(id)));
        if in_cnec || in_rule {
            return Err(CracError::Conflict(format!(
                "Contingency {} is used within a CNEC or an OnContingencyState UsageRule. Please remove all references to the contingency first.",
                id
            )));
        }
        self.contingencies.remove(id);
        debug!(contingency = %id, "removing contingency");
        let states: Vec<String> = self
            .states_of_contingency(id)
            .map(|s| s.id().to_string())
            .collect();
        self.safe_remove_states(&states);
        Ok(())
    }

    fn release(&mut self, released: Released) {
        self.safe_remove_network_elements(&released.network_elements);
        self.safe_remove_states(&released.states);
    }

    fn safe_remove_network_elements(&mut self, ids: &[String]) {
        for id in ids {
            if !self.is_network_element_used(id) && self.network_elements.remove(id).is_some() {
                debug!(network_element = %id, "removing unused network element");
            }
        }
    }

    fn safe_remove_states(&mut self, ids: &[String]) {
        for id in ids {
            if !self.is_state_used(id) && self.states.remove(id).is_some() {
                debug!(state = %id, "removing unused state");
            }
        }
    }

    fn is_network_element_used(&self, id: &str) -> bool {
        self.cnecs()
            .any(|c| c.network_elements().iter().any(|e| e.id() == id))
            || self
                .remedial_actions()
                .any(|ra| ra.network_elements().iter().any(|e| e.id() == id))
    }

    fn is_state_used(&self, id: &str) -> bool {
        self.cnecs().any(|c| c.state().id() == id)
            || self
                .remedial_actions()
                .any(|ra| contingency_states(ra.usage_rules()).iter().any(|s| s == id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instant::InstantKind;
    use crate::remedial_action::ActionType;
    use crate::usage_rule::{UsageMethod, UsageRuleOwner};

    fn crac() -> Crac {
        let mut crac = Crac::new("crac");
        crac.new_instant("preventive", InstantKind::Preventive)
            .unwrap()
            .new_instant("outage", InstantKind::Outage)
            .unwrap()
            .new_instant("curative", InstantKind::Curative)
            .unwrap();
        crac.new_contingency()
            .with_id("co1")
            .with_contingency_element("line-co", crate::contingency::ContingencyElementType::Line)
            .add()
            .unwrap();
        crac
    }

    fn add_topo(crac: &mut Crac, id: &str, switch: &str) {
        crac.new_network_action()
            .with_id(id)
            .with_switch_action(switch, ActionType::Open)
            .new_on_contingency_state_usage_rule()
            .with_contingency("co1")
            .with_instant("curative")
            .with_usage_method(UsageMethod::Available)
            .add()
            .unwrap()
            .add()
            .unwrap();
    }

    #[test]
    fn test_unknown_ids_are_ignored() {
        let mut crac = crac();
        crac.remove_cnec("nothing");
        crac.remove_remedial_action("nothing");
        crac.remove_contingency("nothing").unwrap();
        assert_eq!(crac.contingencies().count(), 1);
    }

    #[test]
    fn test_remedial_action_releases_rule_state() {
        let mut crac = crac();
        add_topo(&mut crac, "topo1", "sw1");
        add_topo(&mut crac, "topo2", "sw2");
        assert_eq!(crac.states().count(), 1);
        assert_eq!(crac.network_elements().count(), 2);

        crac.remove_network_action("topo1");
        assert_eq!(crac.states().count(), 1);
        assert!(crac.network_element("sw1").is_none());
        assert!(crac.network_element("sw2").is_some());

        crac.remove_remedial_action("topo2");
        assert_eq!(crac.states().count(), 0);
        assert_eq!(crac.network_elements().count(), 0);
        assert_eq!(crac.remedial_actions().count(), 0);
    }

    #[test]
    fn test_contingency_removal_is_refused_while_referenced() {
        let mut crac = crac();
        add_topo(&mut crac, "topo", "sw");
        let err = crac.remove_contingency("co1").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Contingency co1 is used within a CNEC or an OnContingencyState UsageRule. Please remove all references to the contingency first."
        );

        crac.remove_network_action("topo");
        crac.add_state("co1", "outage").unwrap();
        crac.remove_contingency("co1").unwrap();
        assert!(crac.contingency("co1").is_none());
        assert_eq!(crac.states().count(), 0);
    }

    #[test]
    fn test_contingency_scoped_country_rule_blocks_removal() {
        let mut crac = crac();
        crac.new_network_action()
            .with_id("topo")
            .with_switch_action("sw", ActionType::Open)
            .new_on_flow_constraint_in_country_usage_rule()
            .with_instant("curative")
            .with_country("FR")
            .with_contingency("co1")
            .with_usage_method(UsageMethod::Available)
            .add()
            .unwrap()
            .add()
            .unwrap();

        let err = crac.remove_contingency("co1").unwrap_err();
        assert!(matches!(err, CracError::Conflict(_)));
        assert!(crac.contingency("co1").is_some());

        crac.remove_network_action("topo");
        crac.remove_contingency("co1").unwrap();
        assert!(crac.contingency("co1").is_none());
    }
}
