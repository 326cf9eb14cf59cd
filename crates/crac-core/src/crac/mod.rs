//! The [`Crac`] aggregate.
//!
//! A `Crac` owns every entity of the model: instants, contingencies,
//! states, network elements, cnecs, remedial actions and usage limits. It is
//! the only mutable store; builders borrow it mutably and register into it
//! on `add()`, after all their checks passed.
//!
//! Network elements and states are shared: the first entity that mentions
//! one creates it, later ones reuse it, and removals release it once nothing
//! references it anymore (see [`removal`](self#removal)).
//!
//! # Example
//!
//! ```
//! use crac_core::prelude::*;
//! use crac_core::{Crac, InstantKind, Side, Unit};
//!
//! let mut crac = Crac::new("crac");
//! crac.new_instant("preventive", InstantKind::Preventive)?
//!     .new_instant("outage", InstantKind::Outage)?
//!     .new_instant("curative", InstantKind::Curative)?;
//! crac.new_contingency().with_id("co1").add()?;
//! crac.new_flow_cnec()
//!     .with_id("cnec")
//!     .with_network_element("line")
//!     .with_instant("curative")
//!     .with_contingency("co1")
//!     .new_threshold()
//!     .with_unit(Unit::Megawatt)
//!     .with_side(Side::One)
//!     .with_max(500.0)
//!     .add()?
//!     .add()?;
//!
//! assert_eq!(crac.states().count(), 1);
//! assert_eq!(crac.network_elements().count(), 1);
//! # Ok::<(), crac_core::CracError>(())
//! ```

mod availability;
mod ra_usage_limits;
mod removal;
mod validation;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::debug;

pub use ra_usage_limits::{RaUsageLimits, RaUsageLimitsAdder};

use crate::cnec::{AngleCnec, AngleCnecAdder, Cnec, FlowCnec, FlowCnecAdder, VoltageCnec, VoltageCnecAdder};
use crate::contingency::{Contingency, ContingencyAdder};
use crate::error::{CracError, CracResult};
use crate::instant::{Instant, InstantKind};
use crate::network_element::NetworkElement;
use crate::remedial_action::{
    CounterTradeRangeAction, CounterTradeRangeActionAdder, HvdcRangeAction, HvdcRangeActionAdder,
    InjectionRangeAction, InjectionRangeActionAdder, NetworkAction, NetworkActionAdder,
    PstRangeAction, PstRangeActionAdder, RangeAction, RemedialAction,
};
use crate::state::State;
use crate::units::PhysicalParameter;

/// Contingency list, remedial actions and additional constraints.
#[derive(Debug, Clone)]
pub struct Crac {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) timestamp: Option<DateTime<Utc>>,
    pub(crate) instants: Vec<Instant>,
    pub(crate) network_elements: BTreeMap<String, NetworkElement>,
    pub(crate) contingencies: BTreeMap<String, Contingency>,
    pub(crate) states: BTreeMap<String, State>,
    pub(crate) flow_cnecs: BTreeMap<String, FlowCnec>,
    pub(crate) angle_cnecs: BTreeMap<String, AngleCnec>,
    pub(crate) voltage_cnecs: BTreeMap<String, VoltageCnec>,
    pub(crate) network_actions: BTreeMap<String, NetworkAction>,
    pub(crate) pst_range_actions: BTreeMap<String, PstRangeAction>,
    pub(crate) hvdc_range_actions: BTreeMap<String, HvdcRangeAction>,
    pub(crate) injection_range_actions: BTreeMap<String, InjectionRangeAction>,
    pub(crate) counter_trade_range_actions: BTreeMap<String, CounterTradeRangeAction>,
    /// Keyed by instant id
    pub(crate) ra_usage_limits: BTreeMap<String, RaUsageLimits>,
}

impl Crac {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            timestamp: None,
            instants: Vec::new(),
            network_elements: BTreeMap::new(),
            contingencies: BTreeMap::new(),
            states: BTreeMap::new(),
            flow_cnecs: BTreeMap::new(),
            angle_cnecs: BTreeMap::new(),
            voltage_cnecs: BTreeMap::new(),
            network_actions: BTreeMap::new(),
            pst_range_actions: BTreeMap::new(),
            hvdc_range_actions: BTreeMap::new(),
            injection_range_actions: BTreeMap::new(),
            counter_trade_range_actions: BTreeMap::new(),
            ra_usage_limits: BTreeMap::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Timestamp of the Crac; it becomes part of every state id.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timestamp(&self) -> Option<&DateTime<Utc>> {
        self.timestamp.as_ref()
    }

    // =========================================================================
    // Instants
    // =========================================================================

    /// Append an instant to the timeline.
    ///
    /// The timeline must read `preventive, outage, [auto], curative*`.
    pub fn new_instant(&mut self, id: impl Into<String>, kind: InstantKind) -> CracResult<&mut Self> {
        let id = id.into();
        if self.instants.iter().any(|i| i.id() == id) {
            return Err(CracError::Instant(format!("Instant '{}' is already defined", id)));
        }
        let previous = self.instants.last();
        let instant = Instant::new(id, kind, previous);
        match (instant.order(), kind) {
            (0, InstantKind::Preventive) | (1, InstantKind::Outage) => {}
            (0, _) => {
                return Err(CracError::Instant(
                    "The first instant in the CRAC must be preventive".into(),
                ))
            }
            (1, _) => {
                return Err(CracError::Instant(
                    "The second instant in the CRAC must be an outage".into(),
                ))
            }
            (_, InstantKind::Preventive) => {
                return Err(CracError::Instant("Only one preventive instant is allowed".into()))
            }
            (_, InstantKind::Outage) => {
                return Err(CracError::Instant("Only one outage instant is allowed".into()))
            }
            (_, InstantKind::Auto) if previous.is_some_and(|p| !p.is_outage()) => {
                return Err(CracError::Instant(
                    "Only one auto instant is allowed and it must occur between outage and curative instants"
                        .into(),
                ))
            }
            _ => {}
        }
        debug!(instant = %instant.id(), kind = %kind, order = instant.order(), "adding instant");
        self.instants.push(instant);
        Ok(self)
    }

    pub fn instant(&self, id: &str) -> CracResult<&Instant> {
        self.instants
            .iter()
            .find(|i| i.id() == id)
            .ok_or_else(|| CracError::UnknownReference(format!("Instant '{}' has not been defined", id)))
    }

    /// Instants sorted by order
    pub fn sorted_instants(&self) -> &[Instant] {
        &self.instants
    }

    pub fn instants_of_kind(&self, kind: InstantKind) -> impl Iterator<Item = &Instant> + '_ {
        self.instants.iter().filter(move |i| i.kind() == kind)
    }

    /// The single instant of `kind`; an error when there are zero or several.
    pub fn instant_by_kind(&self, kind: InstantKind) -> CracResult<&Instant> {
        let mut of_kind = self.instants_of_kind(kind);
        match (of_kind.next(), of_kind.next()) {
            (Some(instant), None) => Ok(instant),
            _ => Err(CracError::Instant(format!(
                "Crac does not contain exactly one instant of kind '{}'. It contains {} instants of kind '{}'",
                kind,
                self.instants_of_kind(kind).count(),
                kind
            ))),
        }
    }

    pub fn preventive_instant(&self) -> CracResult<&Instant> {
        self.instant_by_kind(InstantKind::Preventive)
    }

    pub fn outage_instant(&self) -> CracResult<&Instant> {
        self.instant_by_kind(InstantKind::Outage)
    }

    pub fn last_instant(&self) -> Option<&Instant> {
        self.instants.last()
    }

    pub fn has_auto_instant(&self) -> bool {
        self.instants.iter().any(Instant::is_auto)
    }

    /// Instant preceding `instant`, which must be one of this Crac's instants.
    pub fn instant_before(&self, instant: &Instant) -> CracResult<Option<&Instant>> {
        let own = self
            .instants
            .iter()
            .find(|i| i.id() == instant.id())
            .ok_or_else(|| {
                CracError::UnknownReference(format!(
                    "Provided instant '{}' is not defined in the CRAC",
                    instant.id()
                ))
            })?;
        if own != instant {
            return Err(CracError::Instant(format!(
                "Provided instant {{id:'{}', kind:'{}', order:{}}} is not the same {{id: '{}', kind:'{}', order:{}}} in the CRAC",
                instant.id(),
                instant.kind(),
                instant.order(),
                own.id(),
                own.kind(),
                own.order()
            )));
        }
        Ok(own.order().checked_sub(1).and_then(|order| self.instants.get(order)))
    }

    // =========================================================================
    // Network elements
    // =========================================================================

    pub fn network_elements(&self) -> impl Iterator<Item = &NetworkElement> + '_ {
        self.network_elements.values()
    }

    pub fn network_element(&self, id: &str) -> Option<&NetworkElement> {
        self.network_elements.get(id)
    }

    /// Register a network element, or return the one already registered.
    pub fn add_network_element(&mut self, id: impl Into<String>, name: Option<&str>) -> CracResult<&NetworkElement> {
        let element = NetworkElement::new(id, name);
        self.check_network_element(&element)?;
        let id = element.id().to_string();
        self.register_network_element(element);
        self.network_elements
            .get(&id)
            .ok_or_else(|| CracError::UnknownReference(id.clone()))
    }

    /// Reject an element whose id is registered under another name.
    pub(crate) fn check_network_element(&self, element: &NetworkElement) -> CracResult<()> {
        match self.network_elements.get(element.id()) {
            Some(existing) if existing.name() != element.name() => Err(CracError::Conflict(format!(
                "A network element with the same ID ({}) but a different name already exists.",
                element.id()
            ))),
            _ => Ok(()),
        }
    }

    pub(crate) fn register_network_element(&mut self, element: NetworkElement) {
        if !self.network_elements.contains_key(element.id()) {
            debug!(network_element = %element.id(), "adding network element");
            self.network_elements.insert(element.id().to_string(), element);
        }
    }

    // =========================================================================
    // Contingencies
    // =========================================================================

    pub fn new_contingency(&mut self) -> ContingencyAdder<'_> {
        ContingencyAdder::new(self)
    }

    pub fn contingency(&self, id: &str) -> Option<&Contingency> {
        self.contingencies.get(id)
    }

    pub fn contingencies(&self) -> impl Iterator<Item = &Contingency> + '_ {
        self.contingencies.values()
    }

    // =========================================================================
    // States
    // =========================================================================

    /// Build, without registering, the state of `contingency_id` at `instant`
    pub(crate) fn make_state(&self, contingency_id: Option<&str>, instant: &Instant) -> State {
        match contingency_id {
            Some(contingency_id) if !instant.is_preventive() => {
                State::post_contingency(contingency_id, instant.clone(), self.timestamp)
            }
            _ => State::preventive(instant.clone(), self.timestamp),
        }
    }

    /// Register `state` unless a state with the same id exists; return the registered one.
    pub(crate) fn register_state(&mut self, state: State) -> &State {
        let id = state.id().to_string();
        self.states.entry(id).or_insert_with(|| {
            debug!(state = %state.id(), "adding state");
            state
        })
    }

    /// Preventive state, created on first call
    pub fn add_preventive_state(&mut self) -> CracResult<&State> {
        let state = self.make_state(None, self.preventive_instant()?);
        Ok(self.register_state(state))
    }

    /// Post-contingency state, created on first call
    pub fn add_state(&mut self, contingency_id: &str, instant_id: &str) -> CracResult<&State> {
        let instant = self.instant(instant_id)?;
        if instant.is_preventive() {
            return Err(CracError::InvalidData(
                "Impossible to add a preventive state with a contingency.".into(),
            ));
        }
        if self.contingency(contingency_id).is_none() {
            return Err(CracError::UnknownReference(format!(
                "Please add {} to crac first.",
                contingency_id
            )));
        }
        let state = self.make_state(Some(contingency_id), instant);
        Ok(self.register_state(state))
    }

    pub fn states(&self) -> impl Iterator<Item = &State> + '_ {
        self.states.values()
    }

    pub fn state_by_id(&self, id: &str) -> Option<&State> {
        self.states.get(id)
    }

    pub fn preventive_state(&self) -> Option<&State> {
        let instant = self.preventive_instant().ok()?;
        self.states.get(&State::preventive_id(instant.id(), self.timestamp.as_ref()))
    }

    /// State of `contingency_id` at `instant`, if it was ever created.
    ///
    /// Asking for an unknown contingency is an error.
    pub fn state(&self, contingency_id: &str, instant: &Instant) -> CracResult<Option<&State>> {
        if self.contingency(contingency_id).is_none() {
            return Err(CracError::UnknownReference(format!(
                "Contingency {} does not exist, as well as the related state.",
                contingency_id
            )));
        }
        let id = State::post_contingency_id(contingency_id, instant.id(), self.timestamp.as_ref());
        Ok(self.states.get(&id))
    }

    pub fn states_of_contingency<'s>(&'s self, contingency_id: &'s str) -> impl Iterator<Item = &'s State> + 's {
        self.states
            .values()
            .filter(move |s| s.contingency_id() == Some(contingency_id))
    }

    pub fn states_at_instant<'s>(&'s self, instant: &'s Instant) -> impl Iterator<Item = &'s State> + 's {
        self.states.values().filter(move |s| s.instant() == instant)
    }

    pub fn curative_states(&self) -> impl Iterator<Item = &State> + '_ {
        self.states.values().filter(|s| s.instant().is_curative())
    }

    // =========================================================================
    // Cnecs
    // =========================================================================

    pub fn new_flow_cnec(&mut self) -> FlowCnecAdder<'_> {
        FlowCnecAdder::new(self)
    }

    pub fn new_angle_cnec(&mut self) -> AngleCnecAdder<'_> {
        AngleCnecAdder::new(self)
    }

    pub fn new_voltage_cnec(&mut self) -> VoltageCnecAdder<'_> {
        VoltageCnecAdder::new(self)
    }

    pub fn cnec(&self, id: &str) -> Option<&dyn Cnec> {
        if let Some(cnec) = self.flow_cnecs.get(id) {
            return Some(cnec as &dyn Cnec);
        }
        if let Some(cnec) = self.angle_cnecs.get(id) {
            return Some(cnec as &dyn Cnec);
        }
        self.voltage_cnecs.get(id).map(|cnec| cnec as &dyn Cnec)
    }

    pub fn cnecs(&self) -> impl Iterator<Item = &dyn Cnec> + '_ {
        self.flow_cnecs
            .values()
            .map(|c| c as &dyn Cnec)
            .chain(self.angle_cnecs.values().map(|c| c as &dyn Cnec))
            .chain(self.voltage_cnecs.values().map(|c| c as &dyn Cnec))
    }

    pub fn cnecs_in_state<'s>(&'s self, state: &'s State) -> impl Iterator<Item = &'s dyn Cnec> + 's {
        self.cnecs().filter(move |c| c.state() == state)
    }

    /// Cnecs measuring `parameter`, optionally restricted to one state
    pub fn cnecs_by_parameter<'s>(
        &'s self,
        parameter: PhysicalParameter,
        state: Option<&'s State>,
    ) -> impl Iterator<Item = &'s dyn Cnec> + 's {
        self.cnecs().filter(move |c| {
            c.physical_parameter() == parameter && state.map_or(true, |s| c.state() == s)
        })
    }

    pub fn flow_cnec(&self, id: &str) -> Option<&FlowCnec> {
        self.flow_cnecs.get(id)
    }

    pub fn flow_cnecs(&self) -> impl Iterator<Item = &FlowCnec> + '_ {
        self.flow_cnecs.values()
    }

    pub fn flow_cnecs_in_state<'s>(&'s self, state: &'s State) -> impl Iterator<Item = &'s FlowCnec> + 's {
        self.flow_cnecs.values().filter(move |c| c.state() == state)
    }

    pub fn angle_cnec(&self, id: &str) -> Option<&AngleCnec> {
        self.angle_cnecs.get(id)
    }

    pub fn angle_cnecs(&self) -> impl Iterator<Item = &AngleCnec> + '_ {
        self.angle_cnecs.values()
    }

    pub fn angle_cnecs_in_state<'s>(&'s self, state: &'s State) -> impl Iterator<Item = &'s AngleCnec> + 's {
        self.angle_cnecs.values().filter(move |c| c.state() == state)
    }

    pub fn voltage_cnec(&self, id: &str) -> Option<&VoltageCnec> {
        self.voltage_cnecs.get(id)
    }

    pub fn voltage_cnecs(&self) -> impl Iterator<Item = &VoltageCnec> + '_ {
        self.voltage_cnecs.values()
    }

    pub fn voltage_cnecs_in_state<'s>(&'s self, state: &'s State) -> impl Iterator<Item = &'s VoltageCnec> + 's {
        self.voltage_cnecs.values().filter(move |c| c.state() == state)
    }

    // =========================================================================
    // Remedial actions
    // =========================================================================

    pub fn new_network_action(&mut self) -> NetworkActionAdder<'_> {
        NetworkActionAdder::new(self)
    }

    pub fn new_pst_range_action(&mut self) -> PstRangeActionAdder<'_> {
        PstRangeActionAdder::new(self)
    }

    pub fn new_hvdc_range_action(&mut self) -> HvdcRangeActionAdder<'_> {
        HvdcRangeActionAdder::new(self)
    }

    pub fn new_injection_range_action(&mut self) -> InjectionRangeActionAdder<'_> {
        InjectionRangeActionAdder::new(self)
    }

    pub fn new_counter_trade_range_action(&mut self) -> CounterTradeRangeActionAdder<'_> {
        CounterTradeRangeActionAdder::new(self)
    }

    pub fn remedial_action(&self, id: &str) -> Option<&dyn RemedialAction> {
        if let Some(action) = self.network_actions.get(id) {
            return Some(action as &dyn RemedialAction);
        }
        if let Some(action) = self.pst_range_actions.get(id) {
            return Some(action as &dyn RemedialAction);
        }
        if let Some(action) = self.hvdc_range_actions.get(id) {
            return Some(action as &dyn RemedialAction);
        }
        if let Some(action) = self.injection_range_actions.get(id) {
            return Some(action as &dyn RemedialAction);
        }
        self.counter_trade_range_actions
            .get(id)
            .map(|action| action as &dyn RemedialAction)
    }

    pub fn remedial_actions(&self) -> impl Iterator<Item = &dyn RemedialAction> + '_ {
        self.network_actions
            .values()
            .map(|a| a as &dyn RemedialAction)
            .chain(self.pst_range_actions.values().map(|a| a as &dyn RemedialAction))
            .chain(self.hvdc_range_actions.values().map(|a| a as &dyn RemedialAction))
            .chain(self.injection_range_actions.values().map(|a| a as &dyn RemedialAction))
            .chain(self.counter_trade_range_actions.values().map(|a| a as &dyn RemedialAction))
    }

    pub fn range_action(&self, id: &str) -> Option<&dyn RangeAction> {
        self.range_actions().find(|a| a.id() == id)
    }

    pub fn range_actions(&self) -> impl Iterator<Item = &dyn RangeAction> + '_ {
        self.pst_range_actions
            .values()
            .map(|a| a as &dyn RangeAction)
            .chain(self.hvdc_range_actions.values().map(|a| a as &dyn RangeAction))
            .chain(self.injection_range_actions.values().map(|a| a as &dyn RangeAction))
            .chain(self.counter_trade_range_actions.values().map(|a| a as &dyn RangeAction))
    }

    pub fn network_action(&self, id: &str) -> Option<&NetworkAction> {
        self.network_actions.get(id)
    }

    pub fn network_actions(&self) -> impl Iterator<Item = &NetworkAction> + '_ {
        self.network_actions.values()
    }

    pub fn pst_range_action(&self, id: &str) -> Option<&PstRangeAction> {
        self.pst_range_actions.get(id)
    }

    pub fn pst_range_actions(&self) -> impl Iterator<Item = &PstRangeAction> + '_ {
        self.pst_range_actions.values()
    }

    pub fn hvdc_range_action(&self, id: &str) -> Option<&HvdcRangeAction> {
        self.hvdc_range_actions.get(id)
    }

    pub fn hvdc_range_actions(&self) -> impl Iterator<Item = &HvdcRangeAction> + '_ {
        self.hvdc_range_actions.values()
    }

    pub fn injection_range_action(&self, id: &str) -> Option<&InjectionRangeAction> {
        self.injection_range_actions.get(id)
    }

    pub fn injection_range_actions(&self) -> impl Iterator<Item = &InjectionRangeAction> + '_ {
        self.injection_range_actions.values()
    }

    pub fn counter_trade_range_action(&self, id: &str) -> Option<&CounterTradeRangeAction> {
        self.counter_trade_range_actions.get(id)
    }

    pub fn counter_trade_range_actions(&self) -> impl Iterator<Item = &CounterTradeRangeAction> + '_ {
        self.counter_trade_range_actions.values()
    }
}
