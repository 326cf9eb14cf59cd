//! Boundary with the network simulation model.
//!
//! The CRAC never owns grid state. Everything it needs to read (terminal
//! flows, voltages, countries, switch and tap positions) or to write (the
//! elementary actions and range-action setpoints) goes through
//! [`NetworkModel`], which callers implement on top of their own grid
//! representation. Unknown element ids are reported as
//! [`CracError::Network`](crate::CracError::Network).

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CracResult;

/// Side of a two-terminal branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    One,
    Two,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::One, Side::Two];

    #[inline]
    pub(crate) fn index(self) -> usize {
        match self {
            Side::One => 0,
            Side::Two => 1,
        }
    }

    /// Human label used in validation messages
    pub(crate) fn label(self) -> &'static str {
        match self {
            Side::One => "left",
            Side::Two => "right",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::One => f.write_str("ONE"),
            Side::Two => f.write_str("TWO"),
        }
    }
}

/// Country code (ISO 3166 alpha-2, e.g. `FR`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Country(String);

impl Country {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().to_uppercase())
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Country {
    fn from(code: &str) -> Self {
        Country::new(code)
    }
}

/// Active power and current measured at one terminal of a branch.
///
/// `current` may be NaN when the simulation only provides active power.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TerminalFlow {
    /// Active power entering the branch (MW)
    pub active_power: f64,
    /// Current magnitude (A)
    pub current: f64,
}

/// Converter station operating mode of an HVDC line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HvdcConverterMode {
    SideOneRectifierSideTwoInverter,
    SideOneInverterSideTwoRectifier,
}

/// Read/write capability over the simulated grid.
///
/// Implementations are expected to be cheap to query; the CRAC reads them
/// fresh on every computation and never caches values.
pub trait NetworkModel {
    // ------------------------------------------------------------------
    // Observations
    // ------------------------------------------------------------------

    /// Flow at one terminal of a branch
    fn terminal_flow(&self, branch_id: &str, side: Side) -> CracResult<TerminalFlow>;

    /// Whether the terminal on `side` of an element is connected.
    ///
    /// Single-terminal elements report the same value for both sides.
    fn is_terminal_connected(&self, element_id: &str, side: Side) -> CracResult<bool>;

    /// Countries of the substations an element is connected to
    fn countries(&self, element_id: &str) -> CracResult<BTreeSet<Country>>;

    /// Voltage angle of the bus an element is connected to (degrees)
    fn voltage_angle(&self, element_id: &str) -> CracResult<f64>;

    /// Voltage magnitude of the bus an element is connected to (kV)
    fn voltage_magnitude(&self, element_id: &str) -> CracResult<f64>;

    fn generator_target_p(&self, generator_id: &str) -> CracResult<f64>;

    fn load_p0(&self, load_id: &str) -> CracResult<f64>;

    fn dangling_line_p0(&self, dangling_line_id: &str) -> CracResult<f64>;

    fn shunt_section_count(&self, shunt_id: &str) -> CracResult<u32>;

    fn shunt_maximum_section_count(&self, shunt_id: &str) -> CracResult<u32>;

    fn phase_tap_position(&self, transformer_id: &str) -> CracResult<i32>;

    /// Lowest and highest tap of a phase tap changer
    fn phase_tap_range(&self, transformer_id: &str) -> CracResult<(i32, i32)>;

    fn is_switch_open(&self, switch_id: &str) -> CracResult<bool>;

    /// Signed active power setpoint (MW), positive from side one to side two
    fn hvdc_setpoint(&self, hvdc_id: &str) -> CracResult<f64>;

    fn is_hvdc_angle_droop_active(&self, hvdc_id: &str) -> CracResult<bool>;

    /// Injection setpoint (MW) in generator convention
    fn injection_setpoint(&self, injection_id: &str) -> CracResult<f64>;

    // ------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------

    fn set_generator_target_p(&mut self, generator_id: &str, target_p: f64) -> CracResult<()>;

    fn set_load_p0(&mut self, load_id: &str, p0: f64) -> CracResult<()>;

    fn set_dangling_line_p0(&mut self, dangling_line_id: &str, p0: f64) -> CracResult<()>;

    fn set_shunt_section_count(&mut self, shunt_id: &str, section_count: u32) -> CracResult<()>;

    fn set_phase_tap_position(&mut self, transformer_id: &str, tap: i32) -> CracResult<()>;

    fn set_switch_open(&mut self, switch_id: &str, open: bool) -> CracResult<()>;

    /// Connect or disconnect every terminal of an element
    fn set_terminals_connected(&mut self, element_id: &str, connected: bool) -> CracResult<()>;

    fn set_hvdc_angle_droop_active(&mut self, hvdc_id: &str, active: bool) -> CracResult<()>;

    fn set_hvdc_converter_mode(&mut self, hvdc_id: &str, mode: HvdcConverterMode) -> CracResult<()>;

    /// Unsigned active power setpoint (MW); direction comes from the converter mode
    fn set_hvdc_active_power_setpoint(&mut self, hvdc_id: &str, setpoint: f64) -> CracResult<()>;

    /// Injection setpoint (MW) in generator convention
    fn set_injection_setpoint(&mut self, injection_id: &str, setpoint: f64) -> CracResult<()>;
}
