use std::collections::{BTreeSet, HashMap};

use crac_core::{Country, CracError, CracResult, HvdcConverterMode, NetworkModel, Side, TerminalFlow};
use petgraph::graph::EdgeIndex;
use petgraph::prelude::*;
use petgraph::Undirected;
use tracing::debug;

use crate::components::*;

fn not_found(id: &str) -> CracError {
    CracError::Network(format!("Element '{id}' not found in the network"))
}

fn wrong_kind(id: &str, found: &str, expected: &str) -> CracError {
    CracError::Network(format!("Element '{id}' is a {found}, not a {expected}"))
}

/// In-memory grid.
///
/// Buses and single-terminal injections are nodes; branches, switches and
/// HVDC lines are edges between buses. Each injection hangs off its bus
/// through an [`Edge::Attachment`].
#[derive(Debug, Default)]
pub struct GridNetwork {
    pub graph: Graph<Node, Edge, Undirected>,
    nodes: HashMap<String, NodeIndex>,
    edges: HashMap<String, EdgeIndex>,
}

impl GridNetwork {
    pub fn new() -> Self {
        Self {
            graph: Graph::new_undirected(),
            nodes: HashMap::new(),
            edges: HashMap::new(),
        }
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    fn check_free(&self, id: &str) -> CracResult<()> {
        if self.nodes.contains_key(id) || self.edges.contains_key(id) {
            return Err(CracError::Network(format!(
                "Element '{id}' already exists in the network"
            )));
        }
        Ok(())
    }

    pub fn add_bus(&mut self, bus: Bus) -> CracResult<NodeIndex> {
        self.check_free(&bus.id)?;
        let id = bus.id.clone();
        let index = self.graph.add_node(Node::Bus(bus));
        self.nodes.insert(id, index);
        Ok(index)
    }

    fn bus_index(&self, bus_id: &str) -> CracResult<NodeIndex> {
        let index = *self.nodes.get(bus_id).ok_or_else(|| not_found(bus_id))?;
        match &self.graph[index] {
            Node::Bus(_) => Ok(index),
            other => Err(wrong_kind(bus_id, other.kind(), "bus")),
        }
    }

    fn attach(&mut self, bus_id: &str, node: Node) -> CracResult<NodeIndex> {
        self.check_free(node.id())?;
        let bus = self.bus_index(bus_id)?;
        let id = node.id().to_string();
        let index = self.graph.add_node(node);
        self.graph.add_edge(bus, index, Edge::Attachment);
        self.nodes.insert(id, index);
        Ok(index)
    }

    fn connect(&mut self, from_bus: &str, to_bus: &str, edge: Edge) -> CracResult<EdgeIndex> {
        let Some(id) = edge.id().map(str::to_string) else {
            return Err(CracError::Network(
                "Only identified elements can connect two buses".into(),
            ));
        };
        self.check_free(&id)?;
        let from = self.bus_index(from_bus)?;
        let to = self.bus_index(to_bus)?;
        let index = self.graph.add_edge(from, to, edge);
        self.edges.insert(id, index);
        Ok(index)
    }

    pub fn add_generator(&mut self, bus_id: &str, generator: Generator) -> CracResult<NodeIndex> {
        self.attach(bus_id, Node::Generator(generator))
    }

    pub fn add_load(&mut self, bus_id: &str, load: Load) -> CracResult<NodeIndex> {
        self.attach(bus_id, Node::Load(load))
    }

    pub fn add_dangling_line(&mut self, bus_id: &str, line: DanglingLine) -> CracResult<NodeIndex> {
        self.attach(bus_id, Node::DanglingLine(line))
    }

    pub fn add_shunt(&mut self, bus_id: &str, shunt: ShuntCompensator) -> CracResult<NodeIndex> {
        self.attach(bus_id, Node::Shunt(shunt))
    }

    pub fn add_line(&mut self, from_bus: &str, to_bus: &str, line: Line) -> CracResult<EdgeIndex> {
        self.connect(from_bus, to_bus, Edge::Line(line))
    }

    pub fn add_transformer(
        &mut self,
        from_bus: &str,
        to_bus: &str,
        transformer: Transformer,
    ) -> CracResult<EdgeIndex> {
        self.connect(from_bus, to_bus, Edge::Transformer(transformer))
    }

    pub fn add_switch(&mut self, from_bus: &str, to_bus: &str, switch: Switch) -> CracResult<EdgeIndex> {
        self.connect(from_bus, to_bus, Edge::Switch(switch))
    }

    pub fn add_hvdc_line(&mut self, from_bus: &str, to_bus: &str, hvdc: HvdcLine) -> CracResult<EdgeIndex> {
        self.connect(from_bus, to_bus, Edge::Hvdc(hvdc))
    }

    // ------------------------------------------------------------------
    // State updates (what a load flow would otherwise produce)
    // ------------------------------------------------------------------

    pub fn set_terminal_flow(&mut self, branch_id: &str, side: Side, flow: TerminalFlow) -> CracResult<()> {
        let flows = match self.edge_mut(branch_id)? {
            Edge::Line(l) => &mut l.flows,
            Edge::Transformer(t) => &mut t.flows,
            other => return Err(wrong_kind(branch_id, other.kind(), "branch")),
        };
        flows[side_index(side)] = flow;
        Ok(())
    }

    pub fn set_bus_voltage(&mut self, bus_id: &str, magnitude: f64, angle: f64) -> CracResult<()> {
        let index = self.bus_index(bus_id)?;
        if let Node::Bus(bus) = &mut self.graph[index] {
            bus.voltage_magnitude = magnitude;
            bus.voltage_angle = angle;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id).map(|index| &self.graph[*index])
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.get(id).map(|index| &self.graph[*index])
    }

    fn edge_ref(&self, id: &str) -> CracResult<&Edge> {
        self.edge(id).ok_or_else(|| not_found(id))
    }

    fn edge_mut(&mut self, id: &str) -> CracResult<&mut Edge> {
        let index = *self.edges.get(id).ok_or_else(|| not_found(id))?;
        Ok(&mut self.graph[index])
    }

    fn node_ref(&self, id: &str) -> CracResult<&Node> {
        self.node(id).ok_or_else(|| not_found(id))
    }

    fn node_mut(&mut self, id: &str) -> CracResult<&mut Node> {
        let index = *self.nodes.get(id).ok_or_else(|| not_found(id))?;
        Ok(&mut self.graph[index])
    }

    /// The bus itself, or the bus an injection is attached to
    fn bus_of(&self, index: NodeIndex) -> Option<&Bus> {
        if let Node::Bus(bus) = &self.graph[index] {
            return Some(bus);
        }
        self.graph
            .neighbors(index)
            .find_map(|neighbor| match &self.graph[neighbor] {
                Node::Bus(bus) => Some(bus),
                _ => None,
            })
    }

    fn bus_of_element(&self, id: &str) -> CracResult<&Bus> {
        if let Some(index) = self.nodes.get(id) {
            return self.bus_of(*index).ok_or_else(|| {
                CracError::Network(format!("Element '{id}' is not attached to a bus"))
            });
        }
        let edge = self.edge_ref(id)?;
        Err(CracError::Network(format!(
            "Element '{id}' is a {}, it is not connected to a single bus",
            edge.kind()
        )))
    }

    fn hvdc(&self, id: &str) -> CracResult<&HvdcLine> {
        match self.edge_ref(id)? {
            Edge::Hvdc(h) => Ok(h),
            other => Err(wrong_kind(id, other.kind(), "hvdc line")),
        }
    }

    fn hvdc_mut(&mut self, id: &str) -> CracResult<&mut HvdcLine> {
        match self.edge_mut(id)? {
            Edge::Hvdc(h) => Ok(h),
            other => Err(wrong_kind(id, other.kind(), "hvdc line")),
        }
    }

    fn phase_tap_changer(&self, id: &str) -> CracResult<&PhaseTapChanger> {
        match self.edge_ref(id)? {
            Edge::Transformer(Transformer {
                phase_tap_changer: Some(ptc),
                ..
            }) => Ok(ptc),
            Edge::Transformer(_) => Err(CracError::Network(format!(
                "Transformer '{id}' has no phase tap changer"
            ))),
            other => Err(wrong_kind(id, other.kind(), "transformer")),
        }
    }

    fn shunt(&self, id: &str) -> CracResult<&ShuntCompensator> {
        match self.node_ref(id)? {
            Node::Shunt(s) => Ok(s),
            other => Err(wrong_kind(id, other.kind(), "shunt compensator")),
        }
    }

    fn switch(&self, id: &str) -> CracResult<&Switch> {
        match self.edge_ref(id)? {
            Edge::Switch(s) => Ok(s),
            other => Err(wrong_kind(id, other.kind(), "switch")),
        }
    }
}

impl NetworkModel for GridNetwork {
    fn terminal_flow(&self, branch_id: &str, side: Side) -> CracResult<TerminalFlow> {
        match self.edge_ref(branch_id)? {
            Edge::Line(l) => Ok(l.flows[side_index(side)]),
            Edge::Transformer(t) => Ok(t.flows[side_index(side)]),
            other => Err(wrong_kind(branch_id, other.kind(), "branch")),
        }
    }

    fn is_terminal_connected(&self, element_id: &str, side: Side) -> CracResult<bool> {
        if let Some(edge) = self.edge(element_id) {
            return Ok(match edge {
                Edge::Line(l) => l.connected[side_index(side)],
                Edge::Transformer(t) => t.connected[side_index(side)],
                Edge::Hvdc(h) => h.connected[side_index(side)],
                Edge::Switch(_) | Edge::Attachment => true,
            });
        }
        Ok(match self.node_ref(element_id)? {
            Node::Bus(_) => true,
            Node::Generator(g) => g.connected,
            Node::Load(l) => l.connected,
            Node::DanglingLine(d) => d.connected,
            Node::Shunt(s) => s.connected,
        })
    }

    fn countries(&self, element_id: &str) -> CracResult<BTreeSet<Country>> {
        let buses: Vec<&Bus> = if let Some(index) = self.nodes.get(element_id) {
            self.bus_of(*index).into_iter().collect()
        } else {
            let index = *self.edges.get(element_id).ok_or_else(|| not_found(element_id))?;
            match self.graph.edge_endpoints(index) {
                Some((a, b)) => [a, b].into_iter().filter_map(|n| self.bus_of(n)).collect(),
                None => Vec::new(),
            }
        };
        Ok(buses.into_iter().filter_map(|b| b.country.clone()).collect())
    }

    fn voltage_angle(&self, element_id: &str) -> CracResult<f64> {
        Ok(self.bus_of_element(element_id)?.voltage_angle)
    }

    fn voltage_magnitude(&self, element_id: &str) -> CracResult<f64> {
        Ok(self.bus_of_element(element_id)?.voltage_magnitude)
    }

    fn generator_target_p(&self, generator_id: &str) -> CracResult<f64> {
        match self.node_ref(generator_id)? {
            Node::Generator(g) => Ok(g.target_p),
            other => Err(wrong_kind(generator_id, other.kind(), "generator")),
        }
    }

    fn load_p0(&self, load_id: &str) -> CracResult<f64> {
        match self.node_ref(load_id)? {
            Node::Load(l) => Ok(l.p0),
            other => Err(wrong_kind(load_id, other.kind(), "load")),
        }
    }

    fn dangling_line_p0(&self, dangling_line_id: &str) -> CracResult<f64> {
        match self.node_ref(dangling_line_id)? {
            Node::DanglingLine(d) => Ok(d.p0),
            other => Err(wrong_kind(dangling_line_id, other.kind(), "dangling line")),
        }
    }

    fn shunt_section_count(&self, shunt_id: &str) -> CracResult<u32> {
        Ok(self.shunt(shunt_id)?.section_count)
    }

    fn shunt_maximum_section_count(&self, shunt_id: &str) -> CracResult<u32> {
        Ok(self.shunt(shunt_id)?.maximum_section_count)
    }

    fn phase_tap_position(&self, transformer_id: &str) -> CracResult<i32> {
        Ok(self.phase_tap_changer(transformer_id)?.tap)
    }

    fn phase_tap_range(&self, transformer_id: &str) -> CracResult<(i32, i32)> {
        let ptc = self.phase_tap_changer(transformer_id)?;
        Ok((ptc.low_tap, ptc.high_tap))
    }

    fn is_switch_open(&self, switch_id: &str) -> CracResult<bool> {
        Ok(self.switch(switch_id)?.open)
    }

    fn hvdc_setpoint(&self, hvdc_id: &str) -> CracResult<f64> {
        Ok(self.hvdc(hvdc_id)?.signed_setpoint())
    }

    fn is_hvdc_angle_droop_active(&self, hvdc_id: &str) -> CracResult<bool> {
        Ok(self.hvdc(hvdc_id)?.angle_droop_active)
    }

    fn injection_setpoint(&self, injection_id: &str) -> CracResult<f64> {
        match self.node_ref(injection_id)? {
            Node::Generator(g) => Ok(g.target_p),
            Node::Load(l) => Ok(-l.p0),
            Node::DanglingLine(d) => Ok(-d.p0),
            other => Err(wrong_kind(injection_id, other.kind(), "injection")),
        }
    }

    fn set_generator_target_p(&mut self, generator_id: &str, target_p: f64) -> CracResult<()> {
        match self.node_mut(generator_id)? {
            Node::Generator(g) => g.target_p = target_p,
            other => return Err(wrong_kind(generator_id, other.kind(), "generator")),
        }
        debug!(generator = generator_id, target_p, "generator target updated");
        Ok(())
    }

    fn set_load_p0(&mut self, load_id: &str, p0: f64) -> CracResult<()> {
        match self.node_mut(load_id)? {
            Node::Load(l) => l.p0 = p0,
            other => return Err(wrong_kind(load_id, other.kind(), "load")),
        }
        debug!(load = load_id, p0, "load consumption updated");
        Ok(())
    }

    fn set_dangling_line_p0(&mut self, dangling_line_id: &str, p0: f64) -> CracResult<()> {
        match self.node_mut(dangling_line_id)? {
            Node::DanglingLine(d) => d.p0 = p0,
            other => return Err(wrong_kind(dangling_line_id, other.kind(), "dangling line")),
        }
        debug!(dangling_line = dangling_line_id, p0, "dangling line consumption updated");
        Ok(())
    }

    fn set_shunt_section_count(&mut self, shunt_id: &str, section_count: u32) -> CracResult<()> {
        match self.node_mut(shunt_id)? {
            Node::Shunt(s) => {
                if section_count > s.maximum_section_count {
                    return Err(CracError::Network(format!(
                        "Section count {section_count} of shunt compensator '{shunt_id}' exceeds its maximum {}",
                        s.maximum_section_count
                    )));
                }
                s.section_count = section_count;
            }
            other => return Err(wrong_kind(shunt_id, other.kind(), "shunt compensator")),
        }
        debug!(shunt = shunt_id, section_count, "shunt sections updated");
        Ok(())
    }

    fn set_phase_tap_position(&mut self, transformer_id: &str, tap: i32) -> CracResult<()> {
        let (low, high) = self.phase_tap_range(transformer_id)?;
        if !(low..=high).contains(&tap) {
            return Err(CracError::Network(format!(
                "Tap {tap} of transformer '{transformer_id}' is outside [{low}, {high}]"
            )));
        }
        if let Edge::Transformer(Transformer {
            phase_tap_changer: Some(ptc),
            ..
        }) = self.edge_mut(transformer_id)?
        {
            ptc.tap = tap;
        }
        debug!(transformer = transformer_id, tap, "phase tap moved");
        Ok(())
    }

    fn set_switch_open(&mut self, switch_id: &str, open: bool) -> CracResult<()> {
        match self.edge_mut(switch_id)? {
            Edge::Switch(s) => s.open = open,
            other => return Err(wrong_kind(switch_id, other.kind(), "switch")),
        }
        debug!(switch = switch_id, open, "switch operated");
        Ok(())
    }

    fn set_terminals_connected(&mut self, element_id: &str, connected: bool) -> CracResult<()> {
        if self.edges.contains_key(element_id) {
            match self.edge_mut(element_id)? {
                Edge::Line(l) => l.connected = [connected; 2],
                Edge::Transformer(t) => t.connected = [connected; 2],
                Edge::Hvdc(h) => h.connected = [connected; 2],
                other => {
                    return Err(CracError::Network(format!(
                        "Terminals of {} '{element_id}' cannot be operated",
                        other.kind()
                    )))
                }
            }
        } else {
            match self.node_mut(element_id)? {
                Node::Generator(g) => g.connected = connected,
                Node::Load(l) => l.connected = connected,
                Node::DanglingLine(d) => d.connected = connected,
                Node::Shunt(s) => s.connected = connected,
                Node::Bus(_) => {
                    return Err(CracError::Network(format!(
                        "Terminals of bus '{element_id}' cannot be operated"
                    )))
                }
            }
        }
        debug!(element = element_id, connected, "terminals operated");
        Ok(())
    }

    fn set_hvdc_angle_droop_active(&mut self, hvdc_id: &str, active: bool) -> CracResult<()> {
        self.hvdc_mut(hvdc_id)?.angle_droop_active = active;
        Ok(())
    }

    fn set_hvdc_converter_mode(&mut self, hvdc_id: &str, mode: HvdcConverterMode) -> CracResult<()> {
        self.hvdc_mut(hvdc_id)?.converter_mode = mode;
        Ok(())
    }

    fn set_hvdc_active_power_setpoint(&mut self, hvdc_id: &str, setpoint: f64) -> CracResult<()> {
        if setpoint < 0.0 {
            return Err(CracError::Network(format!(
                "Active power setpoint of hvdc line '{hvdc_id}' must be non-negative, got {setpoint}"
            )));
        }
        self.hvdc_mut(hvdc_id)?.active_power_setpoint = setpoint;
        debug!(hvdc = hvdc_id, setpoint, "hvdc setpoint updated");
        Ok(())
    }

    fn set_injection_setpoint(&mut self, injection_id: &str, setpoint: f64) -> CracResult<()> {
        match self.node_mut(injection_id)? {
            Node::Generator(g) => g.target_p = setpoint,
            Node::Load(l) => l.p0 = -setpoint,
            Node::DanglingLine(d) => d.p0 = -setpoint,
            other => return Err(wrong_kind(injection_id, other.kind(), "injection")),
        }
        debug!(injection = injection_id, setpoint, "injection setpoint updated");
        Ok(())
    }
}
