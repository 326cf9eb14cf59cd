use serde::{Deserialize, Serialize};
use tracing::debug;

use super::elementary::{ActionType, ElementaryAction};
use super::{impl_remedial_action_adder, RemedialAction, RemedialActionAdderFields, RemedialActionCommon};
use crate::crac::Crac;
use crate::error::{CracError, CracResult};
use crate::network::NetworkModel;
use crate::network_element::NetworkElement;

/// Topological or setpoint remedial action: every elementary action is
/// applied together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkAction {
    common: RemedialActionCommon,
    elementary_actions: Vec<ElementaryAction>,
}

impl NetworkAction {
    pub fn elementary_actions(&self) -> &[ElementaryAction] {
        &self.elementary_actions
    }

    /// Apply every elementary action.
    ///
    /// Returns `Ok(false)` without touching `network` when one of them cannot
    /// be applied.
    pub fn apply(&self, network: &mut dyn NetworkModel) -> CracResult<bool> {
        if !self.can_be_applied(network)? {
            debug!(remedial_action = %self.id(), "network action cannot be applied");
            return Ok(false);
        }
        for action in &self.elementary_actions {
            action.apply(network)?;
        }
        Ok(true)
    }

    pub fn can_be_applied(&self, network: &dyn NetworkModel) -> CracResult<bool> {
        for action in &self.elementary_actions {
            if !action.can_be_applied(network)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// True when at least one elementary action would change the network
    pub fn has_impact_on_network(&self, network: &dyn NetworkModel) -> CracResult<bool> {
        for action in &self.elementary_actions {
            if action.has_impact_on_network(network)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn is_compatible_with(&self, other: &NetworkAction) -> bool {
        self.elementary_actions.iter().all(|mine| {
            other
                .elementary_actions
                .iter()
                .all(|theirs| mine.is_compatible_with(theirs))
        })
    }
}

impl RemedialAction for NetworkAction {
    fn common(&self) -> &RemedialActionCommon {
        &self.common
    }

    fn network_elements(&self) -> Vec<&NetworkElement> {
        let mut elements: Vec<&NetworkElement> = Vec::new();
        for element in self.elementary_actions.iter().flat_map(ElementaryAction::network_elements) {
            if !elements.contains(&element) {
                elements.push(element);
            }
        }
        elements
    }
}

/// Builder for [`NetworkAction`]
pub struct NetworkActionAdder<'a> {
    crac: &'a mut Crac,
    fields: RemedialActionAdderFields,
    elementary_actions: Vec<ElementaryAction>,
}

impl_remedial_action_adder!(NetworkActionAdder);

impl<'a> NetworkActionAdder<'a> {
    pub(crate) fn new(crac: &'a mut Crac) -> Self {
        Self {
            crac,
            fields: RemedialActionAdderFields::default(),
            elementary_actions: Vec::new(),
        }
    }

    /// Add an already built elementary action; duplicates are ignored.
    pub fn with_elementary_action(mut self, action: ElementaryAction) -> Self {
        if !self.elementary_actions.contains(&action) {
            self.elementary_actions.push(action);
        }
        self
    }

    pub fn with_terminals_connection_action(
        self,
        element_id: impl Into<String>,
        action_type: ActionType,
    ) -> Self {
        self.with_elementary_action(ElementaryAction::TerminalsConnection {
            network_element: NetworkElement::new(element_id, None),
            action_type,
        })
    }

    pub fn with_switch_action(self, switch_id: impl Into<String>, action_type: ActionType) -> Self {
        self.with_elementary_action(ElementaryAction::Switch {
            network_element: NetworkElement::new(switch_id, None),
            action_type,
        })
    }

    pub fn with_phase_tap_changer_tap_position_action(
        self,
        transformer_id: impl Into<String>,
        tap_position: i32,
    ) -> Self {
        self.with_elementary_action(ElementaryAction::PhaseTapChangerTapPosition {
            network_element: NetworkElement::new(transformer_id, None),
            tap_position,
        })
    }

    pub fn with_generator_action(self, generator_id: impl Into<String>, active_power: f64) -> Self {
        self.with_elementary_action(ElementaryAction::Generator {
            network_element: NetworkElement::new(generator_id, None),
            active_power,
        })
    }

    pub fn with_load_action(self, load_id: impl Into<String>, active_power: f64) -> Self {
        self.with_elementary_action(ElementaryAction::Load {
            network_element: NetworkElement::new(load_id, None),
            active_power,
        })
    }

    pub fn with_dangling_line_action(
        self,
        dangling_line_id: impl Into<String>,
        active_power: f64,
    ) -> Self {
        self.with_elementary_action(ElementaryAction::DanglingLine {
            network_element: NetworkElement::new(dangling_line_id, None),
            active_power,
        })
    }

    pub fn with_shunt_compensator_position_action(
        self,
        shunt_id: impl Into<String>,
        section_count: u32,
    ) -> Self {
        self.with_elementary_action(ElementaryAction::ShuntCompensatorPosition {
            network_element: NetworkElement::new(shunt_id, None),
            section_count,
        })
    }

    pub fn with_switch_pair(
        self,
        switch_to_open: impl Into<String>,
        switch_to_close: impl Into<String>,
    ) -> Self {
        self.with_elementary_action(ElementaryAction::SwitchPair {
            switch_to_open: NetworkElement::new(switch_to_open, None),
            switch_to_close: NetworkElement::new(switch_to_close, None),
        })
    }

    pub fn add(self) -> CracResult<&'a NetworkAction> {
        let id = self.fields.require_id("NetworkAction")?;
        self.fields.check_unique(self.crac, &id)?;
        if self.elementary_actions.is_empty() {
            return Err(CracError::MissingField(
                "Cannot add NetworkAction without elementary actions. Please use one of the new*Action() methods".into(),
            ));
        }
        for action in &self.elementary_actions {
            if let ElementaryAction::SwitchPair {
                switch_to_open,
                switch_to_close,
            } = action
            {
                if switch_to_open == switch_to_close {
                    return Err(CracError::InvalidData(
                        "A switch pair cannot be created with the same switch to open and close"
                            .into(),
                    ));
                }
            }
        }
        self.fields.warn_if_unusable(&id);

        let crac = self.crac;
        let elements: Vec<&NetworkElement> = self
            .elementary_actions
            .iter()
            .flat_map(ElementaryAction::network_elements)
            .collect();
        self.fields.register(crac, &elements)?;
        debug!(
            remedial_action = %id,
            elementary_actions = self.elementary_actions.len(),
            "adding network action"
        );
        let action = NetworkAction {
            common: self.fields.into_common(id.clone()),
            elementary_actions: self.elementary_actions,
        };
        Ok(crac.network_actions.entry(id).or_insert(action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instant::InstantKind;
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
    fn test_add_network_action() {
        let mut crac = crac();
        let action = crac
            .new_network_action()
            .with_id("topo")
            .with_operator("FR")
            .with_terminals_connection_action("line1", ActionType::Open)
            .with_generator_action("gen1", 50.0)
            .with_switch_pair("sw1", "sw2")
            .new_on_instant_usage_rule()
            .with_instant("preventive")
            .with_usage_method(UsageMethod::Available)
            .add()
            .unwrap()
            .add()
            .unwrap();
        assert_eq!(action.elementary_actions().len(), 3);
        assert_eq!(action.network_elements().len(), 4);
        assert_eq!(action.operator(), Some("FR"));
        assert_eq!(crac.network_elements().count(), 4);
    }

    #[test]
    fn test_network_action_requires_elementary_action() {
        let mut crac = crac();
        let err = crac.new_network_action().with_id("topo").add().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot add NetworkAction without elementary actions. Please use one of the new*Action() methods"
        );
    }

    #[test]
    fn test_switch_pair_needs_two_switches() {
        let mut crac = crac();
        let err = crac
            .new_network_action()
            .with_id("topo")
            .with_switch_pair("sw1", "sw1")
            .add()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "A switch pair cannot be created with the same switch to open and close"
        );
        assert_eq!(crac.network_elements().count(), 0);
    }

    #[test]
    fn test_compatibility_between_actions() {
        let mut crac = crac();
        crac.new_network_action()
            .with_id("open")
            .with_switch_action("sw", ActionType::Open)
            .add()
            .unwrap();
        crac.new_network_action()
            .with_id("close")
            .with_switch_action("sw", ActionType::Close)
            .with_load_action("load", 10.0)
            .add()
            .unwrap();
        let open = crac.network_action("open").unwrap();
        let close = crac.network_action("close").unwrap();
        assert!(!open.is_compatible_with(close));
        assert!(open.is_compatible_with(open));
    }
}
