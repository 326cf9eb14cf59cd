//! Remedial actions: topology changes and setpoint ranges.
//!
//! Two families share [`RemedialAction`]:
//!
//! - [`NetworkAction`]: a fixed bundle of [`ElementaryAction`]s applied at once
//! - range actions ([`PstRangeAction`], [`HvdcRangeAction`],
//!   [`InjectionRangeAction`], [`CounterTradeRangeAction`]): a continuous (or
//!   tap-discrete) setpoint chosen inside admissible [`range`]s
//!
//! Whether an action may be used in a state is decided by its usage rules;
//! see [`crate::usage_rule`].

mod counter_trade;
pub mod elementary;
mod hvdc;
mod injection;
mod network_action;
mod pst;
pub mod range;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

pub use counter_trade::{CounterTradeRangeAction, CounterTradeRangeActionAdder};
pub use elementary::{ActionType, ElementaryAction};
pub use hvdc::{HvdcRangeAction, HvdcRangeActionAdder};
pub use injection::{InjectionRangeAction, InjectionRangeActionAdder};
pub use network_action::{NetworkAction, NetworkActionAdder};
pub use pst::{PstRangeAction, PstRangeActionAdder};
pub use range::{RangeType, StandardRange, StandardRangeAdder, StandardRangeOwner, TapRange, TapRangeAdder};

use crate::crac::Crac;
use crate::error::{CracError, CracResult};
use crate::network::NetworkModel;
use crate::network_element::NetworkElement;
use crate::state::State;
use crate::usage_rule::{UsageMethod, UsageRule};

/// Direction of a setpoint move, for variation costs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VariationDirection {
    Up,
    Down,
}

impl fmt::Display for VariationDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariationDirection::Up => f.write_str("UP"),
            VariationDirection::Down => f.write_str("DOWN"),
        }
    }
}

/// Fields shared by every remedial action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemedialActionCommon {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) operator: Option<String>,
    pub(crate) usage_rules: Vec<UsageRule>,
    pub(crate) speed: Option<u32>,
    pub(crate) activation_cost: Option<f64>,
}

/// Fields shared by every range action
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeActionCommon {
    pub(crate) group_id: Option<String>,
    pub(crate) variation_costs: BTreeMap<VariationDirection, f64>,
}

pub trait RemedialAction {
    fn common(&self) -> &RemedialActionCommon;

    /// Elements the action acts on; they keep the Crac's element registry alive
    fn network_elements(&self) -> Vec<&NetworkElement>;

    fn id(&self) -> &str {
        &self.common().id
    }

    fn name(&self) -> &str {
        &self.common().name
    }

    fn operator(&self) -> Option<&str> {
        self.common().operator.as_deref()
    }

    fn usage_rules(&self) -> &[UsageRule] {
        &self.common().usage_rules
    }

    fn speed(&self) -> Option<u32> {
        self.common().speed
    }

    fn activation_cost(&self) -> Option<f64> {
        self.common().activation_cost
    }

    /// Strongest usage method among the rules applicable in `state`
    fn usage_method(&self, state: &State) -> UsageMethod {
        UsageMethod::strongest(
            self.usage_rules()
                .iter()
                .filter(|rule| rule.applies_to(state))
                .map(UsageRule::usage_method),
        )
    }

    fn network_element_ids(&self) -> BTreeSet<&str> {
        self.network_elements().into_iter().map(NetworkElement::id).collect()
    }
}

/// Remedial action choosing a setpoint inside admissible ranges.
///
/// Setpoints are degrees for PSTs and MW otherwise.
pub trait RangeAction: RemedialAction {
    fn range_common(&self) -> &RangeActionCommon;

    fn min_admissible_setpoint(&self, previous_instant_setpoint: f64) -> CracResult<f64>;

    fn max_admissible_setpoint(&self, previous_instant_setpoint: f64) -> CracResult<f64>;

    fn current_setpoint(&self, network: &dyn NetworkModel) -> CracResult<f64>;

    fn apply(&self, network: &mut dyn NetworkModel, setpoint: f64) -> CracResult<()>;

    /// Number of ranges the action carries
    fn range_count(&self) -> usize;

    fn group_id(&self) -> Option<&str> {
        self.range_common().group_id.as_deref()
    }

    fn variation_cost(&self, direction: VariationDirection) -> Option<f64> {
        self.range_common().variation_costs.get(&direction).copied()
    }
}

/// Builder fields shared by the remedial-action adders.
#[derive(Debug, Default)]
pub(crate) struct RemedialActionAdderFields {
    pub(crate) id: Option<String>,
    pub(crate) name: Option<String>,
    pub(crate) operator: Option<String>,
    pub(crate) speed: Option<u32>,
    pub(crate) activation_cost: Option<f64>,
    pub(crate) usage_rules: Vec<UsageRule>,
}

impl RemedialActionAdderFields {
    pub(crate) fn push_usage_rule(&mut self, rule: UsageRule) {
        if !self.usage_rules.contains(&rule) {
            self.usage_rules.push(rule);
        }
    }

    pub(crate) fn require_id(&self, kind: &str) -> CracResult<String> {
        self.id.clone().ok_or_else(|| {
            CracError::MissingField(format!(
                "Cannot add a {} object with no specified id. Please use withId()",
                kind
            ))
        })
    }

    pub(crate) fn check_unique(&self, crac: &Crac, id: &str) -> CracResult<()> {
        if crac.remedial_action(id).is_some() {
            return Err(CracError::Conflict(format!(
                "A remedial action with id {} already exists",
                id
            )));
        }
        Ok(())
    }

    /// Range actions usable at the auto instant need a speed.
    pub(crate) fn check_auto_speed(&self, label: &str) -> CracResult<()> {
        let auto = self.usage_rules.iter().any(|rule| rule.instant().is_auto());
        if auto && self.speed.is_none() {
            return Err(CracError::MissingField(format!(
                "Cannot create an AUTO {} without speed defined",
                label
            )));
        }
        Ok(())
    }

    pub(crate) fn all_rules_preventive(&self) -> bool {
        !self.usage_rules.is_empty()
            && self
                .usage_rules
                .iter()
                .all(|rule| rule.instant().is_preventive())
    }

    pub(crate) fn warn_if_unusable(&self, id: &str) {
        if self.usage_rules.is_empty() {
            warn!(
                remedial_action = %id,
                "remedial action has no usage rule and will never be available"
            );
        }
    }

    /// Register rule states and elements into `crac`, once every check passed.
    pub(crate) fn register(&self, crac: &mut Crac, elements: &[&NetworkElement]) -> CracResult<()> {
        for element in elements {
            crac.check_network_element(element)?;
        }
        for element in elements {
            crac.register_network_element((*element).clone());
        }
        for rule in &self.usage_rules {
            if let UsageRule::OnContingencyState { state, .. } = rule {
                crac.register_state(state.clone());
            }
        }
        Ok(())
    }

    pub(crate) fn into_common(self, id: String) -> RemedialActionCommon {
        RemedialActionCommon {
            name: self.name.unwrap_or_else(|| id.clone()),
            id,
            operator: self.operator,
            usage_rules: self.usage_rules,
            speed: self.speed,
            activation_cost: self.activation_cost,
        }
    }
}

/// Identity setters and [`UsageRuleOwner`](crate::usage_rule::UsageRuleOwner)
/// for a remedial-action adder with `crac` and `fields` members.
macro_rules! impl_remedial_action_adder {
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

            /// Activation speed, required for auto range actions
            pub fn with_speed(mut self, speed: u32) -> Self {
                self.fields.speed = Some(speed);
                self
            }

            pub fn with_activation_cost(mut self, cost: f64) -> Self {
                self.fields.activation_cost = Some(cost);
                self
            }
        }

        impl<'a> $crate::usage_rule::UsageRuleOwner for $adder<'a> {
            fn crac(&self) -> &$crate::crac::Crac {
                &*self.crac
            }

            fn push_usage_rule(&mut self, rule: $crate::usage_rule::UsageRule) {
                self.fields.push_usage_rule(rule);
            }
        }
    };
}

/// Group id and variation costs for range-action adders with a `range` member.
macro_rules! impl_range_action_adder {
    ($adder:ident) => {
        impl<'a> $adder<'a> {
            pub fn with_group_id(mut self, group_id: impl Into<String>) -> Self {
                self.range.group_id = Some(group_id.into());
                self
            }

            pub fn with_variation_cost(
                mut self,
                cost: f64,
                direction: $crate::remedial_action::VariationDirection,
            ) -> Self {
                self.range.variation_costs.insert(direction, cost);
                self
            }
        }
    };
}

pub(crate) use impl_range_action_adder;
pub(crate) use impl_remedial_action_adder;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_rules_are_ignored() {
        let instant = crate::instant::Instant::new(
            "preventive",
            crate::instant::InstantKind::Preventive,
            None,
        );
        let mut fields = RemedialActionAdderFields::default();
        let rule = UsageRule::OnInstant {
            usage_method: UsageMethod::Available,
            instant,
        };
        fields.push_usage_rule(rule.clone());
        fields.push_usage_rule(rule);
        assert_eq!(fields.usage_rules.len(), 1);
        assert!(fields.all_rules_preventive());
    }

    #[test]
    fn test_auto_speed_check() {
        let preventive = crate::instant::Instant::new(
            "preventive",
            crate::instant::InstantKind::Preventive,
            None,
        );
        let outage = crate::instant::Instant::new(
            "outage",
            crate::instant::InstantKind::Outage,
            Some(&preventive),
        );
        let auto = crate::instant::Instant::new(
            "auto",
            crate::instant::InstantKind::Auto,
            Some(&outage),
        );
        let mut fields = RemedialActionAdderFields::default();
        fields.push_usage_rule(UsageRule::OnInstant {
            usage_method: UsageMethod::Forced,
            instant: auto,
        });
        let err = fields.check_auto_speed("Pst range action").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot create an AUTO Pst range action without speed defined"
        );
        fields.speed = Some(1);
        assert!(fields.check_auto_speed("Pst range action").is_ok());
        assert!(!fields.all_rules_preventive());
    }
}
