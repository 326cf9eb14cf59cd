//! Which remedial actions can be used in a state.

use super::Crac;
use crate::cnec::FlowCnec;
use crate::error::CracResult;
use crate::network::NetworkModel;
use crate::remedial_action::{NetworkAction, RangeAction, RemedialAction};
use crate::state::State;
use crate::usage_rule::{self, UsageMethod, UsageRule};

impl Crac {
    /// Strongest usage method of `action` in `state`, see
    /// [`RemedialAction::usage_method`]
    pub fn usage_method<R: RemedialAction + ?Sized>(&self, action: &R, state: &State) -> UsageMethod {
        action.usage_method(state)
    }

    /// Range actions whose usage method in `state` is one of `methods`
    pub fn range_actions_for_state(&self, state: &State, methods: &[UsageMethod]) -> Vec<&dyn RangeAction> {
        self.range_actions()
            .filter(|ra| methods.contains(&self.usage_method(*ra, state)))
            .collect()
    }

    /// Network actions whose usage method in `state` is one of `methods`
    pub fn network_actions_for_state(&self, state: &State, methods: &[UsageMethod]) -> Vec<&NetworkAction> {
        self.network_actions()
            .filter(|na| methods.contains(&self.usage_method(*na, state)))
            .collect()
    }

    pub fn potentially_available_range_actions(&self, state: &State) -> Vec<&dyn RangeAction> {
        self.range_actions_for_state(state, &[UsageMethod::Available, UsageMethod::Forced])
    }

    pub fn potentially_available_network_actions(&self, state: &State) -> Vec<&NetworkAction> {
        self.network_actions_for_state(state, &[UsageMethod::Available, UsageMethod::Forced])
    }

    pub fn is_range_action_available_in_state<R: RangeAction + ?Sized>(&self, action: &R, state: &State) -> bool {
        self.usage_method(action, state).is_activable()
    }

    /// Available in the preventive state
    pub fn is_range_action_preventive<R: RangeAction + ?Sized>(&self, action: &R) -> bool {
        self.preventive_instant()
            .map(|instant| self.make_state(None, instant))
            .is_ok_and(|state| self.is_range_action_available_in_state(action, &state))
    }

    /// Available in at least one registered auto or curative state
    pub fn is_range_action_auto_or_curative<R: RangeAction + ?Sized>(&self, action: &R) -> bool {
        self.states()
            .filter(|s| s.instant().is_auto() || s.instant().is_curative())
            .any(|s| self.is_range_action_available_in_state(action, s))
    }

    /// Flow cnecs of `candidates` that could trigger `rule`
    pub fn flow_cnecs_constraining_for_one_usage_rule<'c>(
        &self,
        rule: &UsageRule,
        candidates: &[&'c FlowCnec],
        network: &dyn NetworkModel,
    ) -> CracResult<Vec<&'c FlowCnec>> {
        rule.flow_cnecs_constraining(candidates, network)
    }

    /// Flow cnecs of `candidates` that could trigger a rule of `action`
    /// applicable in `state`
    pub fn flow_cnecs_constraining_usage_rules<'c, R: RemedialAction + ?Sized>(
        &self,
        action: &R,
        candidates: &[&'c FlowCnec],
        network: &dyn NetworkModel,
        state: &State,
    ) -> CracResult<Vec<&'c FlowCnec>> {
        usage_rule::flow_cnecs_constraining_usage_rules(action.usage_rules(), candidates, network, state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instant::InstantKind;
    use crate::units::Unit;
    use crate::network::Side;
    use crate::usage_rule::UsageRuleOwner;

    fn crac() -> Crac {
        let mut crac = Crac::new("crac");
        crac.new_instant("preventive", InstantKind::Preventive)
            .unwrap()
            .new_instant("outage", InstantKind::Outage)
            .unwrap()
            .new_instant("curative", InstantKind::Curative)
            .unwrap();
        crac.new_contingency().with_id("co1").add().unwrap();
        crac.new_contingency().with_id("co2").add().unwrap();
        crac.new_flow_cnec()
            .with_id("cnec-co1")
            .with_network_element("line")
            .with_instant("curative")
            .with_contingency("co1")
            .new_threshold()
            .with_unit(Unit::Megawatt)
            .with_side(Side::One)
            .with_max(100.0)
            .add()
            .unwrap()
            .add()
            .unwrap();
        crac
    }

    fn add_pst(crac: &mut Crac) {
        crac.new_pst_range_action()
            .with_id("pst")
            .with_network_element("pst-element")
            .with_initial_tap(0)
            .with_tap_to_angle_conversion_map([(-1, -1.5), (0, 0.0), (1, 1.5)])
            .new_on_constraint_usage_rule()
            .with_instant("curative")
            .with_cnec("cnec-co1")
            .with_usage_method(UsageMethod::Available)
            .add()
            .unwrap()
            .add()
            .unwrap();
    }

    #[test]
    fn test_on_constraint_applies_to_every_state_at_instant() {
        let mut crac = crac();
        add_pst(&mut crac);
        let co1 = crac.add_state("co1", "curative").unwrap().clone();
        let co2 = crac.add_state("co2", "curative").unwrap().clone();
        let outage = crac.add_state("co1", "outage").unwrap().clone();
        let pst = crac.pst_range_action("pst").unwrap();

        assert_eq!(crac.usage_method(pst, &co1), UsageMethod::Available);
        assert_eq!(crac.usage_method(pst, &co2), UsageMethod::Available);
        assert_eq!(crac.usage_method(pst, &co2), pst.usage_method(&co2));
        assert_eq!(crac.usage_method(pst, &outage), UsageMethod::Undefined);

        assert_eq!(crac.potentially_available_range_actions(&co1).len(), 1);
        assert_eq!(crac.potentially_available_range_actions(&co2).len(), 1);
        assert!(crac.is_range_action_available_in_state(pst, &co2));
        assert!(crac.is_range_action_auto_or_curative(pst));
        assert!(!crac.is_range_action_preventive(pst));
    }

    #[test]
    fn test_filter_by_usage_method() {
        let mut crac = crac();
        crac.new_network_action()
            .with_id("forced")
            .with_switch_action("sw", crate::remedial_action::ActionType::Open)
            .new_on_instant_usage_rule()
            .with_instant("preventive")
            .with_usage_method(UsageMethod::Forced)
            .add()
            .unwrap()
            .add()
            .unwrap();
        let preventive = crac.add_preventive_state().unwrap().clone();
        assert_eq!(
            crac.network_actions_for_state(&preventive, &[UsageMethod::Forced]).len(),
            1
        );
        assert!(crac
            .network_actions_for_state(&preventive, &[UsageMethod::Available])
            .is_empty());
        assert_eq!(crac.potentially_available_network_actions(&preventive).len(), 1);
    }
}
