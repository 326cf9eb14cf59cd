//! Elementary actions: the atomic network modifications a
//! [`NetworkAction`](super::NetworkAction) is made of.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CracResult;
use crate::network::{NetworkModel, Side};
use crate::network_element::NetworkElement;

/// Setpoint differences below this (MW) have no impact
pub const SETPOINT_EPSILON: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    Open,
    Close,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionType::Open => f.write_str("OPEN"),
            ActionType::Close => f.write_str("CLOSE"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElementaryAction {
    /// Connect or disconnect both terminals of a branch
    TerminalsConnection {
        network_element: NetworkElement,
        action_type: ActionType,
    },
    Switch {
        network_element: NetworkElement,
        action_type: ActionType,
    },
    PhaseTapChangerTapPosition {
        network_element: NetworkElement,
        tap_position: i32,
    },
    /// Generator target P (MW)
    Generator {
        network_element: NetworkElement,
        active_power: f64,
    },
    /// Load P0 (MW)
    Load {
        network_element: NetworkElement,
        active_power: f64,
    },
    DanglingLine {
        network_element: NetworkElement,
        active_power: f64,
    },
    ShuntCompensatorPosition {
        network_element: NetworkElement,
        section_count: u32,
    },
    /// Open one switch and close another in a single move
    SwitchPair {
        switch_to_open: NetworkElement,
        switch_to_close: NetworkElement,
    },
}

impl ElementaryAction {
    pub fn network_elements(&self) -> Vec<&NetworkElement> {
        match self {
            ElementaryAction::TerminalsConnection {
                network_element, ..
            }
            | ElementaryAction::Switch {
                network_element, ..
            }
            | ElementaryAction::PhaseTapChangerTapPosition {
                network_element, ..
            }
            | ElementaryAction::Generator {
                network_element, ..
            }
            | ElementaryAction::Load {
                network_element, ..
            }
            | ElementaryAction::DanglingLine {
                network_element, ..
            }
            | ElementaryAction::ShuntCompensatorPosition {
                network_element, ..
            } => vec![network_element],
            ElementaryAction::SwitchPair {
                switch_to_open,
                switch_to_close,
            } => vec![switch_to_open, switch_to_close],
        }
    }

    pub fn apply(&self, network: &mut dyn NetworkModel) -> CracResult<()> {
        match self {
            ElementaryAction::TerminalsConnection {
                network_element,
                action_type,
            } => network.set_terminals_connected(
                network_element.id(),
                *action_type == ActionType::Close,
            ),
            ElementaryAction::Switch {
                network_element,
                action_type,
            } => network.set_switch_open(network_element.id(), *action_type == ActionType::Open),
            ElementaryAction::PhaseTapChangerTapPosition {
                network_element,
                tap_position,
            } => network.set_phase_tap_position(network_element.id(), *tap_position),
            ElementaryAction::Generator {
                network_element,
                active_power,
            } => network.set_generator_target_p(network_element.id(), *active_power),
            ElementaryAction::Load {
                network_element,
                active_power,
            } => network.set_load_p0(network_element.id(), *active_power),
            ElementaryAction::DanglingLine {
                network_element,
                active_power,
            } => network.set_dangling_line_p0(network_element.id(), *active_power),
            ElementaryAction::ShuntCompensatorPosition {
                network_element,
                section_count,
            } => network.set_shunt_section_count(network_element.id(), *section_count),
            ElementaryAction::SwitchPair {
                switch_to_open,
                switch_to_close,
            } => {
                network.set_switch_open(switch_to_open.id(), true)?;
                network.set_switch_open(switch_to_close.id(), false)
            }
        }
    }

    /// Whether the target state is reachable on `network`
    pub fn can_be_applied(&self, network: &dyn NetworkModel) -> CracResult<bool> {
        match self {
            ElementaryAction::ShuntCompensatorPosition {
                network_element,
                section_count,
            } => Ok(*section_count
                <= network.shunt_maximum_section_count(network_element.id())?),
            ElementaryAction::PhaseTapChangerTapPosition {
                network_element,
                tap_position,
            } => {
                let (low, high) = network.phase_tap_range(network_element.id())?;
                Ok((low..=high).contains(tap_position))
            }
            ElementaryAction::SwitchPair {
                switch_to_open,
                switch_to_close,
            } => Ok(network.is_switch_open(switch_to_open.id())?
                != network.is_switch_open(switch_to_close.id())?),
            _ => Ok(true),
        }
    }

    /// Whether applying would change anything on `network`
    pub fn has_impact_on_network(&self, network: &dyn NetworkModel) -> CracResult<bool> {
        match self {
            ElementaryAction::TerminalsConnection {
                network_element,
                action_type,
            } => {
                let mut connected = Vec::with_capacity(2);
                for side in Side::BOTH {
                    connected.push(network.is_terminal_connected(network_element.id(), side)?);
                }
                Ok(match action_type {
                    ActionType::Open => connected.iter().any(|c| *c),
                    ActionType::Close => connected.iter().any(|c| !*c),
                })
            }
            ElementaryAction::Switch {
                network_element,
                action_type,
            } => {
                let open = network.is_switch_open(network_element.id())?;
                Ok(open != (*action_type == ActionType::Open))
            }
            ElementaryAction::PhaseTapChangerTapPosition {
                network_element,
                tap_position,
            } => Ok(network.phase_tap_position(network_element.id())? != *tap_position),
            ElementaryAction::Generator {
                network_element,
                active_power,
            } => Ok(
                (network.generator_target_p(network_element.id())? - active_power).abs()
                    >= SETPOINT_EPSILON,
            ),
            ElementaryAction::Load {
                network_element,
                active_power,
            } => Ok((network.load_p0(network_element.id())? - active_power).abs() >= SETPOINT_EPSILON),
            ElementaryAction::DanglingLine {
                network_element,
                active_power,
            } => Ok(
                (network.dangling_line_p0(network_element.id())? - active_power).abs()
                    >= SETPOINT_EPSILON,
            ),
            ElementaryAction::ShuntCompensatorPosition {
                network_element,
                section_count,
            } => Ok(network.shunt_section_count(network_element.id())? != *section_count),
            ElementaryAction::SwitchPair {
                switch_to_open,
                switch_to_close,
            } => Ok(!network.is_switch_open(switch_to_open.id())?
                || network.is_switch_open(switch_to_close.id())?),
        }
    }

    /// Two actions are incompatible when they drive a shared element to
    /// different targets.
    pub fn is_compatible_with(&self, other: &ElementaryAction) -> bool {
        use ElementaryAction::*;
        match (self, other) {
            (
                TerminalsConnection {
                    network_element: a,
                    action_type: ta,
                },
                TerminalsConnection {
                    network_element: b,
                    action_type: tb,
                },
            )
            | (
                Switch {
                    network_element: a,
                    action_type: ta,
                },
                Switch {
                    network_element: b,
                    action_type: tb,
                },
            ) => a != b || ta == tb,
            (
                PhaseTapChangerTapPosition {
                    network_element: a,
                    tap_position: ta,
                },
                PhaseTapChangerTapPosition {
                    network_element: b,
                    tap_position: tb,
                },
            ) => a != b || ta == tb,
            (
                Generator {
                    network_element: a,
                    active_power: pa,
                },
                Generator {
                    network_element: b,
                    active_power: pb,
                },
            )
            | (
                Load {
                    network_element: a,
                    active_power: pa,
                },
                Load {
                    network_element: b,
                    active_power: pb,
                },
            )
            | (
                DanglingLine {
                    network_element: a,
                    active_power: pa,
                },
                DanglingLine {
                    network_element: b,
                    active_power: pb,
                },
            ) => a != b || pa == pb,
            (
                ShuntCompensatorPosition {
                    network_element: a,
                    section_count: sa,
                },
                ShuntCompensatorPosition {
                    network_element: b,
                    section_count: sb,
                },
            ) => a != b || sa == sb,
            (
                SwitchPair {
                    switch_to_open: open_a,
                    switch_to_close: close_a,
                },
                SwitchPair {
                    switch_to_open: open_b,
                    switch_to_close: close_b,
                },
            ) => open_a != close_b && close_a != open_b,
            (
                Switch {
                    network_element,
                    action_type,
                },
                SwitchPair {
                    switch_to_open,
                    switch_to_close,
                },
            )
            | (
                SwitchPair {
                    switch_to_open,
                    switch_to_close,
                },
                Switch {
                    network_element,
                    action_type,
                },
            ) => match action_type {
                ActionType::Open => network_element != switch_to_close,
                ActionType::Close => network_element != switch_to_open,
            },
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ne(id: &str) -> NetworkElement {
        NetworkElement::new(id, None)
    }

    #[test]
    fn test_same_element_different_target_is_incompatible() {
        let open = ElementaryAction::Switch {
            network_element: ne("sw"),
            action_type: ActionType::Open,
        };
        let close = ElementaryAction::Switch {
            network_element: ne("sw"),
            action_type: ActionType::Close,
        };
        let other = ElementaryAction::Switch {
            network_element: ne("sw2"),
            action_type: ActionType::Close,
        };
        assert!(!open.is_compatible_with(&close));
        assert!(open.is_compatible_with(&open.clone()));
        assert!(open.is_compatible_with(&other));

        let g1 = ElementaryAction::Generator {
            network_element: ne("gen"),
            active_power: 100.0,
        };
        let g2 = ElementaryAction::Generator {
            network_element: ne("gen"),
            active_power: 120.0,
        };
        assert!(!g1.is_compatible_with(&g2));
        assert!(g1.is_compatible_with(&open));
    }

    #[test]
    fn test_switch_pair_roles() {
        let pair = ElementaryAction::SwitchPair {
            switch_to_open: ne("s1"),
            switch_to_close: ne("s2"),
        };
        let reversed = ElementaryAction::SwitchPair {
            switch_to_open: ne("s2"),
            switch_to_close: ne("s3"),
        };
        let same_roles = ElementaryAction::SwitchPair {
            switch_to_open: ne("s1"),
            switch_to_close: ne("s4"),
        };
        assert!(!pair.is_compatible_with(&reversed));
        assert!(pair.is_compatible_with(&same_roles));

        let close_s1 = ElementaryAction::Switch {
            network_element: ne("s1"),
            action_type: ActionType::Close,
        };
        let open_s1 = ElementaryAction::Switch {
            network_element: ne("s1"),
            action_type: ActionType::Open,
        };
        assert!(!pair.is_compatible_with(&close_s1));
        assert!(!close_s1.is_compatible_with(&pair));
        assert!(pair.is_compatible_with(&open_s1));
        assert_eq!(pair.network_elements().len(), 2);
    }

    #[test]
    fn test_serialized_tag() {
        let action = ElementaryAction::ShuntCompensatorPosition {
            network_element: ne("shunt"),
            section_count: 2,
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "SHUNT_COMPENSATOR_POSITION");
        assert_eq!(json["section_count"], 2);
    }
}
