use crate::cnec::CnecReference;
use crate::crac::Crac;
use crate::error::{CracError, CracResult};
use crate::instant::Instant;
use crate::network::Country;

use super::{UsageMethod, UsageRule};

/// A remedial-action adder that collects usage rules.
///
/// The provided `new_*_usage_rule` methods hand the owner to a nested adder
/// whose `add` validates the rule against the owner's Crac and gives the
/// owner back.
pub trait UsageRuleOwner: Sized {
    fn crac(&self) -> &Crac;

    fn push_usage_rule(&mut self, rule: UsageRule);

    fn new_on_instant_usage_rule(self) -> OnInstantAdder<Self> {
        OnInstantAdder {
            owner: self,
            instant_id: None,
            usage_method: None,
        }
    }

    fn new_on_contingency_state_usage_rule(self) -> OnContingencyStateAdder<Self> {
        OnContingencyStateAdder {
            owner: self,
            instant_id: None,
            contingency_id: None,
            usage_method: None,
        }
    }

    fn new_on_constraint_usage_rule(self) -> OnConstraintAdder<Self> {
        OnConstraintAdder {
            owner: self,
            instant_id: None,
            cnec_id: None,
            usage_method: None,
        }
    }

    fn new_on_flow_constraint_in_country_usage_rule(self) -> OnFlowConstraintInCountryAdder<Self> {
        OnFlowConstraintInCountryAdder {
            owner: self,
            instant_id: None,
            country: None,
            contingency_id: None,
            usage_method: None,
        }
    }
}

fn missing(rule: &str, what: &str, method: &str) -> CracError {
    CracError::MissingField(format!(
        "Cannot add {} without a {}. Please use {}() with a non null value",
        rule, what, method
    ))
}

fn rule_instant<'c>(crac: &'c Crac, rule: &str, instant_id: &str) -> CracResult<&'c Instant> {
    let instant = crac.instant(instant_id)?;
    if instant.is_outage() {
        return Err(CracError::InvalidData(format!(
            "{} usage rules are not allowed for OUTAGE instant.",
            rule
        )));
    }
    Ok(instant)
}

pub struct OnInstantAdder<P: UsageRuleOwner> {
    owner: P,
    instant_id: Option<String>,
    usage_method: Option<UsageMethod>,
}

impl<P: UsageRuleOwner> OnInstantAdder<P> {
    pub fn with_instant(mut self, instant_id: impl Into<String>) -> Self {
        self.instant_id = Some(instant_id.into());
        self
    }

    pub fn with_usage_method(mut self, usage_method: UsageMethod) -> Self {
        self.usage_method = Some(usage_method);
        self
    }

    pub fn add(self) -> CracResult<P> {
        let instant_id = self
            .instant_id
            .ok_or_else(|| missing("OnInstant", "instant", "withInstant"))?;
        let usage_method = self
            .usage_method
            .ok_or_else(|| missing("OnInstant", "usage method", "withUsageMethod"))?;
        let instant = rule_instant(self.owner.crac(), "OnInstant", &instant_id)?.clone();
        let mut owner = self.owner;
        owner.push_usage_rule(UsageRule::OnInstant {
            usage_method,
            instant,
        });
        Ok(owner)
    }
}

/// Usage rule tied to one (contingency, instant) state.
///
/// On the preventive instant the contingency is ignored and the preventive
/// state is used.
pub struct OnContingencyStateAdder<P: UsageRuleOwner> {
    owner: P,
    instant_id: Option<String>,
    contingency_id: Option<String>,
    usage_method: Option<UsageMethod>,
}

impl<P: UsageRuleOwner> OnContingencyStateAdder<P> {
    pub fn with_instant(mut self, instant_id: impl Into<String>) -> Self {
        self.instant_id = Some(instant_id.into());
        self
    }

    pub fn with_contingency(mut self, contingency_id: impl Into<String>) -> Self {
        self.contingency_id = Some(contingency_id.into());
        self
    }

    pub fn with_usage_method(mut self, usage_method: UsageMethod) -> Self {
        self.usage_method = Some(usage_method);
        self
    }

    pub fn add(self) -> CracResult<P> {
        let instant_id = self
            .instant_id
            .ok_or_else(|| missing("OnContingencyState", "instant", "withInstant"))?;
        let usage_method = self
            .usage_method
            .ok_or_else(|| missing("OnContingencyState", "usage method", "withUsageMethod"))?;
        let crac = self.owner.crac();
        let instant = rule_instant(crac, "OnContingencyState", &instant_id)?;
        let state = if instant.is_preventive() {
            crac.make_state(None, instant)
        } else {
            let contingency_id = self
                .contingency_id
                .as_deref()
                .ok_or_else(|| missing("OnContingencyState", "contingency", "withContingency"))?;
            if crac.contingency(contingency_id).is_none() {
                return Err(CracError::UnknownReference(format!(
                    "Contingency {} of OnContingencyState usage rule does not exist in the crac. Use crac.newContingency() first.",
                    contingency_id
                )));
            }
            crac.make_state(Some(contingency_id), instant)
        };
        let mut owner = self.owner;
        owner.push_usage_rule(UsageRule::OnContingencyState {
            usage_method,
            state,
        });
        Ok(owner)
    }
}

/// Usage rule triggered by a specific cnec.
///
/// The rule instant may not come after the cnec's instant.
pub struct OnConstraintAdder<P: UsageRuleOwner> {
    owner: P,
    instant_id: Option<String>,
    cnec_id: Option<String>,
    usage_method: Option<UsageMethod>,
}

impl<P: UsageRuleOwner> OnConstraintAdder<P> {
    pub fn with_instant(mut self, instant_id: impl Into<String>) -> Self {
        self.instant_id = Some(instant_id.into());
        self
    }

    pub fn with_cnec(mut self, cnec_id: impl Into<String>) -> Self {
        self.cnec_id = Some(cnec_id.into());
        self
    }

    pub fn with_usage_method(mut self, usage_method: UsageMethod) -> Self {
        self.usage_method = Some(usage_method);
        self
    }

    pub fn add(self) -> CracResult<P> {
        let instant_id = self
            .instant_id
            .ok_or_else(|| missing("OnConstraint", "instant", "withInstant"))?;
        let cnec_id = self
            .cnec_id
            .ok_or_else(|| missing("OnConstraint", "cnec", "withCnec"))?;
        let usage_method = self
            .usage_method
            .ok_or_else(|| missing("OnConstraint", "usage method", "withUsageMethod"))?;
        let crac = self.owner.crac();
        let instant = rule_instant(crac, "OnConstraint", &instant_id)?;
        let cnec = crac.cnec(&cnec_id).ok_or_else(|| {
            CracError::UnknownReference(format!(
                "Cnec {} does not exist in crac. Consider adding it first.",
                cnec_id
            ))
        })?;
        let cnec_instant = cnec.state().instant();
        if instant.comes_after(cnec_instant) {
            return Err(CracError::InvalidData(format!(
                "Remedial actions available at instant '{}' on a CNEC constraint at instant '{}' are not allowed.",
                instant.id(),
                cnec_instant.id()
            )));
        }
        let rule = UsageRule::OnConstraint {
            usage_method,
            instant: instant.clone(),
            cnec: CnecReference::from_cnec(cnec),
        };
        let mut owner = self.owner;
        owner.push_usage_rule(rule);
        Ok(owner)
    }
}

pub struct OnFlowConstraintInCountryAdder<P: UsageRuleOwner> {
    owner: P,
    instant_id: Option<String>,
    country: Option<Country>,
    contingency_id: Option<String>,
    usage_method: Option<UsageMethod>,
}

impl<P: UsageRuleOwner> OnFlowConstraintInCountryAdder<P> {
    pub fn with_instant(mut self, instant_id: impl Into<String>) -> Self {
        self.instant_id = Some(instant_id.into());
        self
    }

    pub fn with_country(mut self, country: impl Into<Country>) -> Self {
        self.country = Some(country.into());
        self
    }

    /// Restrict the rule to the states of one contingency
    pub fn with_contingency(mut self, contingency_id: impl Into<String>) -> Self {
        self.contingency_id = Some(contingency_id.into());
        self
    }

    pub fn with_usage_method(mut self, usage_method: UsageMethod) -> Self {
        self.usage_method = Some(usage_method);
        self
    }

    pub fn add(self) -> CracResult<P> {
        const RULE: &str = "OnFlowConstraintInCountry";
        let instant_id = self
            .instant_id
            .ok_or_else(|| missing(RULE, "instant", "withInstant"))?;
        let country = self
            .country
            .ok_or_else(|| missing(RULE, "country", "withCountry"))?;
        let usage_method = self
            .usage_method
            .ok_or_else(|| missing(RULE, "usage method", "withUsageMethod"))?;
        let crac = self.owner.crac();
        let instant = rule_instant(crac, RULE, &instant_id)?.clone();
        if let Some(contingency_id) = self.contingency_id.as_deref() {
            if crac.contingency(contingency_id).is_none() {
                return Err(CracError::UnknownReference(format!(
                    "Contingency {} of OnFlowConstraintInCountry usage rule does not exist in the crac. Use crac.newContingency() first.",
                    contingency_id
                )));
            }
        }
        let mut owner = self.owner;
        owner.push_usage_rule(UsageRule::OnFlowConstraintInCountry {
            usage_method,
            instant,
            country,
            contingency_id: self.contingency_id,
        });
        Ok(owner)
    }
}
