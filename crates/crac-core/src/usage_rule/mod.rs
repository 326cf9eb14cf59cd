//! Usage rules: when a remedial action may (or must) be used.
//!
//! Resolution is a pure function of a remedial action's rules and a state:
//! every rule whose applicability predicate holds contributes its
//! [`UsageMethod`], and the strongest one wins. Nothing is cached; the rules
//! are re-walked on every query.

mod adder;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use adder::{
    OnConstraintAdder, OnContingencyStateAdder, OnFlowConstraintInCountryAdder, OnInstantAdder,
    UsageRuleOwner,
};

use crate::cnec::{Cnec, CnecReference, FlowCnec};
use crate::error::CracResult;
use crate::instant::Instant;
use crate::network::{Country, NetworkModel};
use crate::state::State;

/// Strength of a usage rule.
///
/// `Unavailable` overrides everything; otherwise
/// `Undefined < Available < Forced`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UsageMethod {
    Undefined,
    Available,
    Forced,
    Unavailable,
}

impl UsageMethod {
    fn strength(self) -> u8 {
        match self {
            UsageMethod::Undefined => 0,
            UsageMethod::Available => 1,
            UsageMethod::Forced => 2,
            UsageMethod::Unavailable => 3,
        }
    }

    /// Strongest method of a set; `Undefined` for an empty set.
    pub fn strongest(methods: impl IntoIterator<Item = UsageMethod>) -> UsageMethod {
        methods
            .into_iter()
            .max_by_key(|m| m.strength())
            .unwrap_or(UsageMethod::Undefined)
    }

    /// `Available` or `Forced`
    pub fn is_activable(self) -> bool {
        matches!(self, UsageMethod::Available | UsageMethod::Forced)
    }
}

impl fmt::Display for UsageMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            UsageMethod::Undefined => "UNDEFINED",
            UsageMethod::Available => "AVAILABLE",
            UsageMethod::Forced => "FORCED",
            UsageMethod::Unavailable => "UNAVAILABLE",
        };
        f.write_str(label)
    }
}

/// Condition under which a remedial action gets a usage method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UsageRule {
    OnInstant {
        usage_method: UsageMethod,
        instant: Instant,
    },
    OnContingencyState {
        usage_method: UsageMethod,
        state: State,
    },
    OnConstraint {
        usage_method: UsageMethod,
        instant: Instant,
        cnec: CnecReference,
    },
    OnFlowConstraintInCountry {
        usage_method: UsageMethod,
        instant: Instant,
        country: Country,
        contingency_id: Option<String>,
    },
}

impl UsageRule {
    pub fn usage_method(&self) -> UsageMethod {
        match self {
            UsageRule::OnInstant { usage_method, .. }
            | UsageRule::OnContingencyState { usage_method, .. }
            | UsageRule::OnConstraint { usage_method, .. }
            | UsageRule::OnFlowConstraintInCountry { usage_method, .. } => *usage_method,
        }
    }

    /// The rule's instant, derived from its state for OnContingencyState
    pub fn instant(&self) -> &Instant {
        match self {
            UsageRule::OnInstant { instant, .. }
            | UsageRule::OnConstraint { instant, .. }
            | UsageRule::OnFlowConstraintInCountry { instant, .. } => instant,
            UsageRule::OnContingencyState { state, .. } => state.instant(),
        }
    }

    /// Applicability predicate of the rule for `state`.
    ///
    /// An OnConstraint rule only applies when its cnec is defined at the
    /// rule's own instant.
    pub fn applies_to(&self, state: &State) -> bool {
        match self {
            UsageRule::OnInstant { instant, .. } => state.instant() == instant,
            UsageRule::OnContingencyState { state: own, .. } => own == state,
            UsageRule::OnConstraint { instant, cnec, .. } => {
                state.instant() == instant && cnec.state.instant() == instant
            }
            UsageRule::OnFlowConstraintInCountry {
                instant,
                contingency_id,
                ..
            } => {
                state.instant() == instant
                    && contingency_id
                        .as_deref()
                        .map_or(true, |c| state.contingency_id() == Some(c))
            }
        }
    }

    /// Usage method of the rule in `state`, `Undefined` when it does not apply
    pub fn usage_method_in(&self, state: &State) -> UsageMethod {
        if self.applies_to(state) {
            self.usage_method()
        } else {
            UsageMethod::Undefined
        }
    }

    /// Contingency the rule is tied to, if any
    pub fn contingency_id(&self) -> Option<&str> {
        match self {
            UsageRule::OnInstant { .. } => None,
            UsageRule::OnContingencyState { state, .. } => state.contingency_id(),
            UsageRule::OnConstraint { cnec, .. } => cnec.state.contingency_id(),
            UsageRule::OnFlowConstraintInCountry { contingency_id, .. } => {
                contingency_id.as_deref()
            }
        }
    }

    /// Flow cnecs among `candidates` that can trigger this rule.
    pub fn flow_cnecs_constraining<'c>(
        &self,
        candidates: &[&'c FlowCnec],
        network: &dyn NetworkModel,
    ) -> CracResult<Vec<&'c FlowCnec>> {
        let mut constraining = Vec::new();
        for cnec in candidates.iter().copied() {
            let keep = match self {
                UsageRule::OnInstant { instant, .. } => cnec.state().instant() == instant,
                UsageRule::OnContingencyState { state, .. } => cnec.state() == state,
                UsageRule::OnConstraint { cnec: target, .. } => cnec.id() == target.id,
                UsageRule::OnFlowConstraintInCountry {
                    instant,
                    country,
                    contingency_id,
                    ..
                } => {
                    cnec.state().instant() == instant
                        && contingency_id
                            .as_deref()
                            .map_or(true, |c| cnec.state().contingency_id() == Some(c))
                        && cnec.location(network)?.contains(country)
                }
            };
            if keep {
                constraining.push(cnec);
            }
        }
        Ok(constraining)
    }
}

/// Union of the constraining cnecs of every rule applicable in `state`,
/// deduplicated by id.
pub fn flow_cnecs_constraining_usage_rules<'c>(
    usage_rules: &[UsageRule],
    candidates: &[&'c FlowCnec],
    network: &dyn NetworkModel,
    state: &State,
) -> CracResult<Vec<&'c FlowCnec>> {
    let mut union: BTreeMap<&str, &'c FlowCnec> = BTreeMap::new();
    for rule in usage_rules.iter().filter(|r| r.applies_to(state)) {
        for cnec in rule.flow_cnecs_constraining(candidates, network)? {
            union.insert(cnec.id(), cnec);
        }
    }
    Ok(union.into_values().collect())
}
