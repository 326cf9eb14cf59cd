//! Grid equipment stored on the nodes and edges of a [`GridNetwork`](crate::GridNetwork).
//!
//! Values are plain stored numbers: nothing here solves a load flow.

use crac_core::{Country, HvdcConverterMode, Side, TerminalFlow};
use serde::{Deserialize, Serialize};

#[inline]
pub(crate) fn side_index(side: Side) -> usize {
    match side {
        Side::One => 0,
        Side::Two => 1,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bus {
    pub id: String,
    pub country: Option<Country>,
    /// kV
    pub voltage_magnitude: f64,
    /// degrees
    pub voltage_angle: f64,
}

impl Bus {
    pub fn new(id: impl Into<String>, voltage_magnitude: f64) -> Self {
        Self {
            id: id.into(),
            country: None,
            voltage_magnitude,
            voltage_angle: 0.0,
        }
    }

    pub fn with_country(mut self, country: &str) -> Self {
        self.country = Some(Country::new(country));
        self
    }

    pub fn with_voltage_angle(mut self, angle: f64) -> Self {
        self.voltage_angle = angle;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generator {
    pub id: String,
    /// MW
    pub target_p: f64,
    pub connected: bool,
}

impl Generator {
    pub fn new(id: impl Into<String>, target_p: f64) -> Self {
        Self {
            id: id.into(),
            target_p,
            connected: true,
        }
    }
}

/// Consumption in load convention (positive when drawing power)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Load {
    pub id: String,
    pub p0: f64,
    pub connected: bool,
}

impl Load {
    pub fn new(id: impl Into<String>, p0: f64) -> Self {
        Self {
            id: id.into(),
            p0,
            connected: true,
        }
    }
}

/// Boundary injection, load convention like [`Load`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DanglingLine {
    pub id: String,
    pub p0: f64,
    pub connected: bool,
}

impl DanglingLine {
    pub fn new(id: impl Into<String>, p0: f64) -> Self {
        Self {
            id: id.into(),
            p0,
            connected: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShuntCompensator {
    pub id: String,
    pub section_count: u32,
    pub maximum_section_count: u32,
    pub connected: bool,
}

impl ShuntCompensator {
    pub fn new(id: impl Into<String>, section_count: u32, maximum_section_count: u32) -> Self {
        Self {
            id: id.into(),
            section_count,
            maximum_section_count,
            connected: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub id: String,
    pub flows: [TerminalFlow; 2],
    pub connected: [bool; 2],
}

impl Line {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            flows: [TerminalFlow::default(); 2],
            connected: [true; 2],
        }
    }

    /// Flow at one terminal; `current` may be NaN
    pub fn with_flow(mut self, side: Side, active_power: f64, current: f64) -> Self {
        self.flows[side_index(side)] = TerminalFlow {
            active_power,
            current,
        };
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTapChanger {
    pub tap: i32,
    pub low_tap: i32,
    pub high_tap: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transformer {
    pub id: String,
    pub flows: [TerminalFlow; 2],
    pub connected: [bool; 2],
    pub phase_tap_changer: Option<PhaseTapChanger>,
}

impl Transformer {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            flows: [TerminalFlow::default(); 2],
            connected: [true; 2],
            phase_tap_changer: None,
        }
    }

    pub fn with_phase_tap_changer(mut self, tap: i32, low_tap: i32, high_tap: i32) -> Self {
        self.phase_tap_changer = Some(PhaseTapChanger {
            tap,
            low_tap,
            high_tap,
        });
        self
    }

    pub fn with_flow(mut self, side: Side, active_power: f64, current: f64) -> Self {
        self.flows[side_index(side)] = TerminalFlow {
            active_power,
            current,
        };
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Switch {
    pub id: String,
    pub open: bool,
}

impl Switch {
    pub fn new(id: impl Into<String>, open: bool) -> Self {
        Self { id: id.into(), open }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HvdcLine {
    pub id: String,
    /// Unsigned MW; the direction is given by `converter_mode`
    pub active_power_setpoint: f64,
    pub converter_mode: HvdcConverterMode,
    pub angle_droop_active: bool,
    pub connected: [bool; 2],
}

impl HvdcLine {
    /// Line flowing `setpoint` MW, positive from side one to side two
    pub fn new(id: impl Into<String>, setpoint: f64) -> Self {
        Self {
            id: id.into(),
            active_power_setpoint: setpoint.abs(),
            converter_mode: if setpoint >= 0.0 {
                HvdcConverterMode::SideOneRectifierSideTwoInverter
            } else {
                HvdcConverterMode::SideOneInverterSideTwoRectifier
            },
            angle_droop_active: false,
            connected: [true; 2],
        }
    }

    pub fn with_angle_droop_active(mut self, active: bool) -> Self {
        self.angle_droop_active = active;
        self
    }

    pub fn signed_setpoint(&self) -> f64 {
        match self.converter_mode {
            HvdcConverterMode::SideOneRectifierSideTwoInverter => self.active_power_setpoint,
            HvdcConverterMode::SideOneInverterSideTwoRectifier => -self.active_power_setpoint,
        }
    }
}

/// Graph node: a bus or a single-terminal element attached to one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Bus(Bus),
    Generator(Generator),
    Load(Load),
    DanglingLine(DanglingLine),
    Shunt(ShuntCompensator),
}

impl Node {
    pub fn id(&self) -> &str {
        match self {
            Node::Bus(b) => &b.id,
            Node::Generator(g) => &g.id,
            Node::Load(l) => &l.id,
            Node::DanglingLine(d) => &d.id,
            Node::Shunt(s) => &s.id,
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Node::Bus(_) => "bus",
            Node::Generator(_) => "generator",
            Node::Load(_) => "load",
            Node::DanglingLine(_) => "dangling line",
            Node::Shunt(_) => "shunt compensator",
        }
    }
}

/// Graph edge: a two-terminal element, or the attachment of an injection to its bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Edge {
    Line(Line),
    Transformer(Transformer),
    Switch(Switch),
    Hvdc(HvdcLine),
    Attachment,
}

impl Edge {
    pub fn id(&self) -> Option<&str> {
        match self {
            Edge::Line(l) => Some(&l.id),
            Edge::Transformer(t) => Some(&t.id),
            Edge::Switch(s) => Some(&s.id),
            Edge::Hvdc(h) => Some(&h.id),
            Edge::Attachment => None,
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Edge::Line(_) => "line",
            Edge::Transformer(_) => "transformer",
            Edge::Switch(_) => "switch",
            Edge::Hvdc(_) => "hvdc line",
            Edge::Attachment => "attachment",
        }
    }
}
