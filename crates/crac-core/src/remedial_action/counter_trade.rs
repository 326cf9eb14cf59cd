use serde::{Deserialize, Serialize};
use tracing::debug;

use super::range::{self, StandardRange, StandardRangeOwner};
use super::{
    impl_range_action_adder, impl_remedial_action_adder, RangeAction, RangeActionCommon,
    RemedialAction, RemedialActionAdderFields, RemedialActionCommon,
};
use crate::crac::Crac;
use crate::error::{CracError, CracResult};
use crate::network::{Country, NetworkModel};
use crate::network_element::NetworkElement;

/// Exchange between two countries. Has no network element and cannot be
/// applied to a network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterTradeRangeAction {
    common: RemedialActionCommon,
    range: RangeActionCommon,
    exporting_country: Country,
    importing_country: Country,
    ranges: Vec<StandardRange>,
    initial_setpoint: Option<f64>,
}

impl CounterTradeRangeAction {
    pub fn exporting_country(&self) -> &Country {
        &self.exporting_country
    }

    pub fn importing_country(&self) -> &Country {
        &self.importing_country
    }

    pub fn ranges(&self) -> &[StandardRange] {
        &self.ranges
    }

    pub fn initial_setpoint(&self) -> Option<f64> {
        self.initial_setpoint
    }
}

impl RemedialAction for CounterTradeRangeAction {
    fn common(&self) -> &RemedialActionCommon {
        &self.common
    }

    fn network_elements(&self) -> Vec<&NetworkElement> {
        Vec::new()
    }
}

impl RangeAction for CounterTradeRangeAction {
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

    /// The initial setpoint; a counter trade is not visible in the network
    fn current_setpoint(&self, _network: &dyn NetworkModel) -> CracResult<f64> {
        Ok(self.initial_setpoint.unwrap_or(0.0))
    }

    fn apply(&self, _network: &mut dyn NetworkModel, _setpoint: f64) -> CracResult<()> {
        Err(CracError::InvalidData(format!(
            "Can't apply a counter trade range action on a network (CounterTradeRangeAction {})",
            self.id()
        )))
    }

    fn range_count(&self) -> usize {
        self.ranges.len()
    }
}

/// Builder for [`CounterTradeRangeAction`]
pub struct CounterTradeRangeActionAdder<'a> {
    crac: &'a mut Crac,
    fields: RemedialActionAdderFields,
    range: RangeActionCommon,
    exporting_country: Option<Country>,
    importing_country: Option<Country>,
    ranges: Vec<StandardRange>,
    initial_setpoint: Option<f64>,
}

impl_remedial_action_adder!(CounterTradeRangeActionAdder);
impl_range_action_adder!(CounterTradeRangeActionAdder);

impl<'a> StandardRangeOwner for CounterTradeRangeActionAdder<'a> {
    fn push_standard_range(&mut self, range: StandardRange) {
        self.ranges.push(range);
    }
}

impl<'a> CounterTradeRangeActionAdder<'a> {
    pub(crate) fn new(crac: &'a mut Crac) -> Self {
        Self {
            crac,
            fields: RemedialActionAdderFields::default(),
            range: RangeActionCommon::default(),
            exporting_country: None,
            importing_country: None,
            ranges: Vec::new(),
            initial_setpoint: None,
        }
    }

    pub fn with_exporting_country(mut self, country: impl Into<Country>) -> Self {
        self.exporting_country = Some(country.into());
        self
    }

    pub fn with_importing_country(mut self, country: impl Into<Country>) -> Self {
        self.importing_country = Some(country.into());
        self
    }

    pub fn with_initial_setpoint(mut self, setpoint: f64) -> Self {
        self.initial_setpoint = Some(setpoint);
        self
    }

    pub fn add(self) -> CracResult<&'a CounterTradeRangeAction> {
        let id = self.fields.require_id("CounterTradeRangeAction")?;
        self.fields.check_unique(self.crac, &id)?;
        self.fields.check_auto_speed("Counter trade range action")?;
        let exporting_country = self.exporting_country.ok_or_else(|| {
            CracError::MissingField(
                "Cannot add CounterTradeRangeAction without a exporting country. Please use withExportingCountry() with a non null value".into(),
            )
        })?;
        let importing_country = self.importing_country.ok_or_else(|| {
            CracError::MissingField(
                "Cannot add CounterTradeRangeAction without a importing country. Please use withImportingCountry() with a non null value".into(),
            )
        })?;
        if self.ranges.is_empty() {
            return Err(CracError::MissingField(
                "Cannot add CounterTradeRangeAction without a range. Please use newRange()".into(),
            ));
        }
        self.fields.warn_if_unusable(&id);

        let crac = self.crac;
        self.fields.register(crac, &[])?;
        debug!(
            remedial_action = %id,
            exporting = %exporting_country,
            importing = %importing_country,
            "adding counter trade range action"
        );
        let action = CounterTradeRangeAction {
            common: self.fields.into_common(id.clone()),
            range: self.range,
            exporting_country,
            importing_country,
            ranges: self.ranges,
            initial_setpoint: self.initial_setpoint,
        };
        Ok(crac.counter_trade_range_actions.entry(id).or_insert(action))
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
    fn test_add_counter_trade_range_action() {
        let mut crac = crac();
        let action = crac
            .new_counter_trade_range_action()
            .with_id("ct")
            .with_exporting_country("fr")
            .with_importing_country("DE")
            .new_range()
            .with_min(-500.0)
            .with_max(500.0)
            .add()
            .unwrap()
            .add()
            .unwrap();
        assert_eq!(action.exporting_country().value(), "FR");
        assert_eq!(action.importing_country().value(), "DE");
        assert!(action.network_elements().is_empty());
        assert_eq!(action.max_admissible_setpoint(0.0).unwrap(), 500.0);
    }

    #[test]
    fn test_countries_are_required() {
        let mut crac = crac();
        let err = crac
            .new_counter_trade_range_action()
            .with_id("ct")
            .with_importing_country("DE")
            .add()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot add CounterTradeRangeAction without a exporting country. Please use withExportingCountry() with a non null value"
        );
    }
}
