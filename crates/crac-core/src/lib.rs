//! # crac-core: Contingencies, Remedial Actions and additional Constraints
//!
//! Domain model of a CRAC for power-grid security analysis: which outages
//! are simulated, which network elements are monitored and against which
//! limits, and which remedial actions may be used, when, and how strongly.
//!
//! ## Design
//!
//! A [`Crac`] is a single in-memory store. Every entity is created through
//! a builder ("adder") borrowed from it, validated as a whole on `add()`, and
//! only then registered:
//!
//! - **Instants** form the timeline `preventive -> outage -> [auto] -> curative*`
//! - **States** pair an instant with an optional contingency; they are
//!   created on first use and shared
//! - **Network elements** are shared by id between cnecs and remedial actions
//! - **Cnecs** carry unit-tagged thresholds; the bound engine converts them
//!   between MW, A and % of Imax
//! - **Remedial actions** carry usage rules, resolved per state into a
//!   [`UsageMethod`]
//!
//! Removing a cnec or a remedial action deletes the elements and states
//! nothing else references anymore.
//!
//! The grid itself is never modelled here: computations that need live
//! values go through the [`NetworkModel`] trait.
//!
//! ## Quick Start
//!
//! ```
//! use crac_core::prelude::*;
//! use crac_core::{Crac, InstantKind, Side, Unit, UsageMethod};
//!
//! let mut crac = Crac::new("crac");
//! crac.new_instant("preventive", InstantKind::Preventive)?
//!     .new_instant("outage", InstantKind::Outage)?
//!     .new_instant("curative", InstantKind::Curative)?;
//! crac.new_contingency().with_id("co1").add()?;
//!
//! let cnec = crac
//!     .new_flow_cnec()
//!     .with_id("line-curative")
//!     .with_network_element("line")
//!     .with_instant("curative")
//!     .with_contingency("co1")
//!     .with_nominal_voltage(380.0)
//!     .new_threshold()
//!     .with_unit(Unit::Megawatt)
//!     .with_side(Side::One)
//!     .with_min(-500.0)
//!     .with_max(500.0)
//!     .add()?
//!     .add()?;
//! assert_eq!(cnec.upper_bound(Side::One, Unit::Megawatt)?, Some(500.0));
//!
//! crac.new_network_action()
//!     .with_id("open-coupler")
//!     .with_switch_action("coupler", ActionType::Open)
//!     .new_on_instant_usage_rule()
//!     .with_instant("curative")
//!     .with_usage_method(UsageMethod::Available)
//!     .add()?
//!     .add()?;
//!
//! let state = crac.add_state("co1", "curative")?.clone();
//! let action = crac.network_action("open-coupler").unwrap();
//! assert_eq!(crac.usage_method(action, &state), UsageMethod::Available);
//! # Ok::<(), crac_core::CracError>(())
//! ```
//!
//! ## Modules
//!
//! - [`crac`] - The aggregate, availability queries and cascading removal
//! - [`cnec`] - Flow, angle and voltage cnecs and their thresholds
//! - [`remedial_action`] - Network actions and range actions
//! - [`usage_rule`] - Usage rules and their resolution
//! - [`config`] - TOML instant layout and usage limits
//! - [`diagnostics`] - Non-fatal validation report

pub mod cnec;
pub mod config;
pub mod contingency;
pub mod crac;
pub mod diagnostics;
pub mod error;
pub mod instant;
pub mod network;
pub mod network_element;
pub mod remedial_action;
pub mod state;
pub mod units;
pub mod usage_rule;

pub use cnec::{
    AngleCnec, BranchThreshold, Cnec, CnecReference, FlowCnec, FlowCnecValue, SecurityStatus,
    Threshold, VoltageCnec,
};
pub use config::{CracConfig, InstantConfig};
pub use contingency::{Contingency, ContingencyElement, ContingencyElementType};
pub use crac::{Crac, RaUsageLimits};
pub use diagnostics::{Category, DiagnosticIssue, Diagnostics, Severity};
pub use error::{CracError, CracResult};
pub use instant::{Instant, InstantKind};
pub use network::{Country, HvdcConverterMode, NetworkModel, Side, TerminalFlow};
pub use network_element::NetworkElement;
pub use remedial_action::{
    ActionType, CounterTradeRangeAction, ElementaryAction, HvdcRangeAction, InjectionRangeAction,
    NetworkAction, PstRangeAction, RangeType, VariationDirection,
};
pub use state::State;
pub use units::{PhysicalParameter, Unit};
pub use usage_rule::{UsageMethod, UsageRule};

/// Traits needed to call the builder and query methods.
pub mod prelude {
    pub use crate::cnec::{Cnec, ThresholdOwner};
    pub use crate::remedial_action::{ActionType, RangeAction, RemedialAction, StandardRangeOwner};
    pub use crate::usage_rule::UsageRuleOwner;
}
