//! # crac-grid: in-memory grid for CRAC evaluation
//!
//! [`GridNetwork`] implements [`crac_core::NetworkModel`] on top of a
//! petgraph `Graph<Node, Edge, Undirected>`:
//!
//! - buses, generators, loads, dangling lines and shunt compensators are nodes
//! - lines, transformers, switches and HVDC lines are edges between buses
//! - an injection is linked to its bus by an [`Edge::Attachment`]
//!
//! Flows, voltages and angles are stored values set by the caller (typically
//! the output of an external load flow). Element lookups go through id
//! indexes; an unknown or mistyped id is a [`crac_core::CracError::Network`].
//!
//! ```
//! use crac_core::{NetworkModel, Side};
//! use crac_grid::{Bus, GridNetwork, Line};
//!
//! let mut grid = GridNetwork::new();
//! grid.add_bus(Bus::new("a", 400.0).with_country("FR"))?;
//! grid.add_bus(Bus::new("b", 400.0).with_country("DE"))?;
//! grid.add_line("a", "b", Line::new("a-b").with_flow(Side::One, 250.0, f64::NAN))?;
//!
//! assert_eq!(grid.terminal_flow("a-b", Side::One)?.active_power, 250.0);
//! assert_eq!(grid.countries("a-b")?.len(), 2);
//! # Ok::<(), crac_core::CracError>(())
//! ```

pub mod components;
pub mod grid;

pub use components::{
    Bus, DanglingLine, Edge, Generator, HvdcLine, Line, Load, Node, PhaseTapChanger,
    ShuntCompensator, Switch, Transformer,
};
pub use grid::GridNetwork;
pub use petgraph::graph::{EdgeIndex, NodeIndex};
