use super::Crac;
use crate::cnec::Cnec;
use crate::diagnostics::{Category, Diagnostics};
use crate::remedial_action::RemedialAction;
use crate::units::Unit;

impl Crac {
    /// Report legal but suspicious content into `diagnostics`
    pub fn validate_into(&self, diagnostics: &mut Diagnostics) {
        for action in self.remedial_actions() {
            if action.usage_rules().is_empty() {
                diagnostics.add_warning(
                    Category::UsageRule,
                    "remedial action has no usage rule and will never be available",
                    action.id(),
                );
            }
        }
        for action in self.range_actions() {
            if action.range_count() == 0 {
                diagnostics.add_warning(Category::Range, "range action has no range", action.id());
            }
        }
        for cnec in self.cnecs() {
            if !cnec.is_optimized() && !cnec.is_monitored() {
                diagnostics.add_warning(
                    Category::Monitoring,
                    "cnec is neither optimized nor monitored",
                    cnec.id(),
                );
            }
        }
        for contingency in self.contingencies() {
            if self.states_of_contingency(contingency.id()).next().is_none() {
                diagnostics.add_warning(
                    Category::Contingency,
                    "contingency is not used by any state",
                    contingency.id(),
                );
            }
        }
        for cnec in self.flow_cnecs() {
            for side in cnec.monitored_sides() {
                match (
                    cnec.upper_bound(side, Unit::Megawatt),
                    cnec.lower_bound(side, Unit::Megawatt),
                ) {
                    (Ok(None), Ok(None)) => diagnostics.add_warning(
                        Category::Threshold,
                        "flow cnec has no finite bound",
                        cnec.id(),
                    ),
                    (Err(err), _) | (_, Err(err)) => {
                        diagnostics.add_error(Category::Threshold, err.to_string(), cnec.id())
                    }
                    _ => {}
                }
            }
        }
    }

    pub fn validate(&self) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        self.validate_into(&mut diagnostics);
        diagnostics
    }
}
