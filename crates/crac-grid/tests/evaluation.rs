//! Cnec evaluation and remedial action application against a stored grid

use crac_core::prelude::*;
use crac_core::{
    Crac, InstantKind, NetworkModel, RangeType, SecurityStatus, Side, Unit, UsageMethod,
};
use crac_grid::{
    Bus, DanglingLine, Generator, GridNetwork, HvdcLine, Line, Load, ShuntCompensator, Switch,
    Transformer,
};

const TOL: f64 = 1e-6;

/// Two French buses and one Belgian bus, with a PST, a coupler pair and an
/// HVDC link.
fn grid() -> GridNetwork {
    let mut grid = GridNetwork::new();
    grid.add_bus(Bus::new("fr-1", 400.0).with_country("FR").with_voltage_angle(4.0))
        .unwrap();
    grid.add_bus(Bus::new("fr-2", 395.0).with_country("FR").with_voltage_angle(1.5))
        .unwrap();
    grid.add_bus(Bus::new("be-1", 410.0).with_country("BE").with_voltage_angle(-2.0))
        .unwrap();

    grid.add_line(
        "fr-1",
        "be-1",
        Line::new("fr-be")
            .with_flow(Side::One, 600.0, f64::NAN)
            .with_flow(Side::Two, -590.0, 900.0),
    )
    .unwrap();
    grid.add_line("fr-1", "fr-2", Line::new("fr-fr").with_flow(Side::One, 100.0, 150.0))
        .unwrap();
    grid.add_transformer(
        "fr-2",
        "be-1",
        Transformer::new("pst").with_phase_tap_changer(0, -2, 2),
    )
    .unwrap();
    grid.add_switch("fr-1", "fr-2", Switch::new("coupler-a", false)).unwrap();
    grid.add_switch("fr-1", "fr-2", Switch::new("coupler-b", true)).unwrap();
    grid.add_hvdc_line(
        "fr-2",
        "be-1",
        HvdcLine::new("hvdc", 200.0).with_angle_droop_active(true),
    )
    .unwrap();

    grid.add_generator("fr-1", Generator::new("gen-fr", 300.0)).unwrap();
    grid.add_load("be-1", Load::new("load-be", 150.0)).unwrap();
    grid.add_dangling_line("be-1", DanglingLine::new("x-node", 20.0)).unwrap();
    grid.add_shunt("fr-2", ShuntCompensator::new("shunt", 1, 3)).unwrap();
    grid
}

fn crac() -> Crac {
    let mut crac = Crac::new("crac");
    crac.new_instant("preventive", InstantKind::Preventive)
        .unwrap()
        .new_instant("outage", InstantKind::Outage)
        .unwrap()
        .new_instant("curative", InstantKind::Curative)
        .unwrap();
    crac.new_contingency().with_id("co1").add().unwrap();
    crac
}

#[test]
fn test_flow_cnec_value_and_margin() {
    let grid = grid();
    let mut crac = crac();
    let cnec = crac
        .new_flow_cnec()
        .with_id("fr-be")
        .with_network_element("fr-be")
        .with_instant("preventive")
        .with_nominal_voltage(400.0)
        .new_threshold()
        .with_unit(Unit::Megawatt)
        .with_side(Side::One)
        .with_min(-500.0)
        .with_max(500.0)
        .add()
        .unwrap()
        .new_threshold()
        .with_unit(Unit::Megawatt)
        .with_side(Side::Two)
        .with_min(-650.0)
        .with_max(650.0)
        .add()
        .unwrap()
        .add()
        .unwrap();

    let mw = cnec.compute_value(&grid, Unit::Megawatt).unwrap();
    assert_eq!(mw.side_one, 600.0);
    assert_eq!(mw.side_two, -590.0);

    // Side one has no measured current: derived from P and the nominal voltage
    let amperes = cnec.compute_value(&grid, Unit::Ampere).unwrap();
    assert!((amperes.side_one - 600.0 / (0.4 * 3f64.sqrt())).abs() < TOL);
    assert_eq!(amperes.side_two, -900.0);

    let margin = cnec.compute_margin(&grid, Unit::Megawatt).unwrap();
    assert!((margin + 100.0).abs() < TOL);
    assert_eq!(
        cnec.compute_security_status(&grid, Unit::Megawatt).unwrap(),
        SecurityStatus::HighConstraint
    );
    assert!(cnec.compute_value(&grid, Unit::Kilovolt).is_err());
}

#[test]
fn test_angle_and_voltage_cnecs() {
    let grid = grid();
    let mut crac = crac();
    let angle = crac
        .new_angle_cnec()
        .with_id("angle")
        .with_exporting_network_element("fr-1")
        .with_importing_network_element("load-be")
        .with_instant("preventive")
        .new_threshold()
        .with_unit(Unit::Degree)
        .with_min(-5.0)
        .with_max(5.0)
        .add()
        .unwrap()
        .add()
        .unwrap();
    assert!((angle.compute_value(&grid, Unit::Degree).unwrap() - 6.0).abs() < TOL);
    assert!((angle.compute_margin(&grid, Unit::Degree).unwrap() + 1.0).abs() < TOL);
    let countries: Vec<String> = angle
        .location(&grid)
        .unwrap()
        .iter()
        .map(|c| c.to_string())
        .collect();
    assert_eq!(countries, vec!["BE", "FR"]);

    let voltage = crac
        .new_voltage_cnec()
        .with_id("voltage")
        .with_network_element("fr-2")
        .with_instant("preventive")
        .new_threshold()
        .with_unit(Unit::Kilovolt)
        .with_min(380.0)
        .with_max(420.0)
        .add()
        .unwrap()
        .add()
        .unwrap();
    assert_eq!(voltage.compute_value(&grid, Unit::Kilovolt).unwrap(), 395.0);
    assert!((voltage.compute_margin(&grid, Unit::Kilovolt).unwrap() - 15.0).abs() < TOL);
    assert_eq!(
        voltage.compute_security_status(&grid, Unit::Kilovolt).unwrap(),
        SecurityStatus::Secure
    );
}

#[test]
fn test_cnec_connection_follows_terminals() {
    let mut grid = grid();
    let mut crac = crac();
    crac.new_flow_cnec()
        .with_id("fr-fr")
        .with_network_element("fr-fr")
        .with_instant("curative")
        .with_contingency("co1")
        .new_threshold()
        .with_unit(Unit::Megawatt)
        .with_side(Side::One)
        .with_max(1000.0)
        .add()
        .unwrap()
        .add()
        .unwrap();
    crac.new_network_action()
        .with_id("open-fr-fr")
        .with_terminals_connection_action("fr-fr", ActionType::Open)
        .new_on_instant_usage_rule()
        .with_instant("curative")
        .with_usage_method(UsageMethod::Available)
        .add()
        .unwrap()
        .add()
        .unwrap();

    let cnec = crac.flow_cnec("fr-fr").unwrap();
    assert!(cnec.is_connected(&grid).unwrap());
    let action = crac.network_action("open-fr-fr").unwrap();
    assert!(action.has_impact_on_network(&grid).unwrap());
    assert!(action.apply(&mut grid).unwrap());
    assert!(!cnec.is_connected(&grid).unwrap());
    assert!(!action.has_impact_on_network(&grid).unwrap());
}

#[test]
fn test_network_action_refused_when_one_action_cannot_apply() {
    let mut grid = grid();
    let mut crac = crac();
    crac.new_network_action()
        .with_id("combined")
        .with_generator_action("gen-fr", 250.0)
        .with_phase_tap_changer_tap_position_action("pst", 5)
        .new_on_instant_usage_rule()
        .with_instant("preventive")
        .with_usage_method(UsageMethod::Available)
        .add()
        .unwrap()
        .add()
        .unwrap();
    let action = crac.network_action("combined").unwrap();
    assert!(!action.can_be_applied(&grid).unwrap());
    assert!(!action.apply(&mut grid).unwrap());
    assert_eq!(grid.generator_target_p("gen-fr").unwrap(), 300.0);
}

#[test]
fn test_elementary_setpoints_and_topology() {
    let mut grid = grid();
    let mut crac = crac();
    crac.new_network_action()
        .with_id("redispatch")
        .with_generator_action("gen-fr", 300.05)
        .with_load_action("load-be", 120.0)
        .with_dangling_line_action("x-node", 0.0)
        .with_shunt_compensator_position_action("shunt", 3)
        .with_switch_pair("coupler-a", "coupler-b")
        .new_on_instant_usage_rule()
        .with_instant("preventive")
        .with_usage_method(UsageMethod::Available)
        .add()
        .unwrap()
        .add()
        .unwrap();
    let action = crac.network_action("redispatch").unwrap();
    assert!(action.can_be_applied(&grid).unwrap());
    assert!(action.apply(&mut grid).unwrap());

    assert_eq!(grid.load_p0("load-be").unwrap(), 120.0);
    assert_eq!(grid.dangling_line_p0("x-node").unwrap(), 0.0);
    assert_eq!(grid.shunt_section_count("shunt").unwrap(), 3);
    assert!(grid.is_switch_open("coupler-a").unwrap());
    assert!(!grid.is_switch_open("coupler-b").unwrap());

    // Both switches now sit in their target position; the generator moved by
    // less than the setpoint epsilon.
    assert!(!action.has_impact_on_network(&grid).unwrap());
    // Exactly one switch of the pair is open, so the pair can be applied again.
    assert!(action.can_be_applied(&grid).unwrap());
}

#[test]
fn test_pst_range_action_moves_tap() {
    let mut grid = grid();
    let mut crac = crac();
    crac.new_pst_range_action()
        .with_id("pst-ra")
        .with_network_element("pst")
        .with_initial_tap(0)
        .with_tap_to_angle_conversion_map([(-2, -5.0), (-1, -2.5), (0, 0.0), (1, 2.5), (2, 5.0)])
        .new_tap_range()
        .with_range_type(RangeType::Absolute)
        .with_min_tap(-2)
        .with_max_tap(2)
        .add()
        .unwrap()
        .new_on_instant_usage_rule()
        .with_instant("preventive")
        .with_usage_method(UsageMethod::Available)
        .add()
        .unwrap()
        .add()
        .unwrap();
    let pst = crac.pst_range_action("pst-ra").unwrap();
    assert_eq!(pst.current_setpoint(&grid).unwrap(), 0.0);
    pst.apply(&mut grid, 2.4).unwrap();
    assert_eq!(grid.phase_tap_position("pst").unwrap(), 1);
    assert_eq!(pst.current_setpoint(&grid).unwrap(), 2.5);
}

#[test]
fn test_hvdc_range_action_reverses_flow() {
    let mut grid = grid();
    let mut crac = crac();
    crac.new_hvdc_range_action()
        .with_id("hvdc-ra")
        .with_network_element("hvdc")
        .new_range()
        .with_min(-1000.0)
        .with_max(1000.0)
        .add()
        .unwrap()
        .new_on_instant_usage_rule()
        .with_instant("preventive")
        .with_usage_method(UsageMethod::Available)
        .add()
        .unwrap()
        .add()
        .unwrap();
    let hvdc = crac.hvdc_range_action("hvdc-ra").unwrap();
    assert_eq!(hvdc.current_setpoint(&grid).unwrap(), 200.0);

    hvdc.apply(&mut grid, -350.0).unwrap();
    assert!(!grid.is_hvdc_angle_droop_active("hvdc").unwrap());
    assert_eq!(grid.hvdc_setpoint("hvdc").unwrap(), -350.0);
    assert_eq!(hvdc.current_setpoint(&grid).unwrap(), -350.0);
}

#[test]
fn test_injection_range_action_uses_keys() {
    let mut grid = grid();
    grid.set_injection_setpoint("load-be", -300.0).unwrap();
    let mut crac = crac();
    crac.new_injection_range_action()
        .with_id("injection-ra")
        .with_network_element_and_key(1.0, "gen-fr")
        .with_network_element_and_key(-1.0, "load-be")
        .new_range()
        .with_min(0.0)
        .with_max(1000.0)
        .add()
        .unwrap()
        .new_on_instant_usage_rule()
        .with_instant("preventive")
        .with_usage_method(UsageMethod::Available)
        .add()
        .unwrap()
        .add()
        .unwrap();
    let injection = crac.injection_range_action("injection-ra").unwrap();
    assert!((injection.current_setpoint(&grid).unwrap() - 300.0).abs() < TOL);

    injection.apply(&mut grid, 450.0).unwrap();
    assert_eq!(grid.generator_target_p("gen-fr").unwrap(), 450.0);
    assert_eq!(grid.load_p0("load-be").unwrap(), 450.0);
}

#[test]
fn test_unknown_elements_surface_as_network_errors() {
    let grid = grid();
    let mut crac = crac();
    let cnec = crac
        .new_flow_cnec()
        .with_id("ghost")
        .with_network_element("ghost-line")
        .with_instant("preventive")
        .new_threshold()
        .with_unit(Unit::Megawatt)
        .with_side(Side::One)
        .with_max(100.0)
        .add()
        .unwrap()
        .add()
        .unwrap();
    let err = cnec.compute_margin(&grid, Unit::Megawatt).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Network error: Element 'ghost-line' not found in the network"
    );
}
