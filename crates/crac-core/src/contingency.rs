//! Contingencies: simulated combinations of equipment outages.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::crac::Crac;
use crate::error::{CracError, CracResult};

/// Kind of equipment tripped by a contingency element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContingencyElementType {
    Line,
    TwoWindingsTransformer,
    ThreeWindingsTransformer,
    Generator,
    Load,
    HvdcLine,
    DanglingLine,
    ShuntCompensator,
    BusbarSection,
    Switch,
}

impl fmt::Display for ContingencyElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ContingencyElementType::Line => "LINE",
            ContingencyElementType::TwoWindingsTransformer => "TWO_WINDINGS_TRANSFORMER",
            ContingencyElementType::ThreeWindingsTransformer => "THREE_WINDINGS_TRANSFORMER",
            ContingencyElementType::Generator => "GENERATOR",
            ContingencyElementType::Load => "LOAD",
            ContingencyElementType::HvdcLine => "HVDC_LINE",
            ContingencyElementType::DanglingLine => "DANGLING_LINE",
            ContingencyElementType::ShuntCompensator => "SHUNT_COMPENSATOR",
            ContingencyElementType::BusbarSection => "BUSBAR_SECTION",
            ContingencyElementType::Switch => "SWITCH",
        };
        f.write_str(label)
    }
}

/// One tripped element
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContingencyElement {
    pub id: String,
    pub element_type: ContingencyElementType,
}

/// A named set of outages.
///
/// Contingency elements are not CRAC network elements: they do not keep
/// anything alive in the element registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contingency {
    id: String,
    name: Option<String>,
    elements: BTreeSet<ContingencyElement>,
}

impl Contingency {
    pub fn new(
        id: impl Into<String>,
        name: Option<String>,
        elements: impl IntoIterator<Item = ContingencyElement>,
    ) -> Self {
        Self {
            id: id.into(),
            name,
            elements: elements.into_iter().collect(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Name, falling back to the id
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn elements(&self) -> &BTreeSet<ContingencyElement> {
        &self.elements
    }
}

/// Builder registering a [`Contingency`] into a [`Crac`].
///
/// Re-adding an identical contingency returns the registered one unchanged.
pub struct ContingencyAdder<'a> {
    crac: &'a mut Crac,
    id: Option<String>,
    name: Option<String>,
    elements: Vec<ContingencyElement>,
}

impl<'a> ContingencyAdder<'a> {
    pub(crate) fn new(crac: &'a mut Crac) -> Self {
        Self {
            crac,
            id: None,
            name: None,
            elements: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_contingency_element(
        mut self,
        id: impl Into<String>,
        element_type: ContingencyElementType,
    ) -> Self {
        self.elements.push(ContingencyElement {
            id: id.into(),
            element_type,
        });
        self
    }

    pub fn add(self) -> CracResult<&'a Contingency> {
        let id = self.id.ok_or_else(|| {
            CracError::MissingField(
                "Cannot add a contingency object with no specified id. Please use withId()".into(),
            )
        })?;
        let contingency = Contingency::new(id.clone(), self.name, self.elements);
        let crac = self.crac;

        if let Some(existing) = crac.contingencies.get(&id) {
            if *existing != contingency {
                return Err(CracError::Conflict(format!(
                    "A contingency with the same ID ({}) but a different name or network elements already exists.",
                    id
                )));
            }
            debug!(contingency = %id, "contingency already registered");
        } else {
            debug!(contingency = %id, elements = contingency.elements.len(), "adding contingency");
        }
        Ok(crac.contingencies.entry(id).or_insert(contingency))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_falls_back_to_id() {
        let contingency = Contingency::new("co1", None, []);
        assert_eq!(contingency.name(), "co1");
    }

    #[test]
    fn test_elements_compare_as_set() {
        let a = Contingency::new(
            "co1",
            None,
            [
                ContingencyElement {
                    id: "ne1".into(),
                    element_type: ContingencyElementType::Line,
                },
                ContingencyElement {
                    id: "ne2".into(),
                    element_type: ContingencyElementType::Generator,
                },
            ],
        );
        let b = Contingency::new(
            "co1",
            None,
            [
                ContingencyElement {
                    id: "ne2".into(),
                    element_type: ContingencyElementType::Generator,
                },
                ContingencyElement {
                    id: "ne1".into(),
                    element_type: ContingencyElementType::Line,
                },
            ],
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_adder_is_idempotent_for_identical_payload() {
        let mut crac = Crac::new("crac");
        crac.new_contingency()
            .with_id("co1")
            .with_name("Trip of line 1")
            .with_contingency_element("ne1", ContingencyElementType::Line)
            .add()
            .unwrap();
        let again = crac
            .new_contingency()
            .with_id("co1")
            .with_name("Trip of line 1")
            .with_contingency_element("ne1", ContingencyElementType::Line)
            .add()
            .unwrap();
        assert_eq!(again.name(), "Trip of line 1");
        assert_eq!(crac.contingencies().count(), 1);
    }

    #[test]
    fn test_adder_rejects_different_payload() {
        let mut crac = Crac::new("crac");
        crac.new_contingency()
            .with_id("co1")
            .with_contingency_element("ne1", ContingencyElementType::Line)
            .add()
            .unwrap();
        let err = crac
            .new_contingency()
            .with_id("co1")
            .with_contingency_element("ne2", ContingencyElementType::Line)
            .add()
            .unwrap_err();
        assert!(matches!(err, CracError::Conflict(_)));
        assert_eq!(
            err.to_string(),
            "A contingency with the same ID (co1) but a different name or network elements already exists."
        );
    }

    #[test]
    fn test_adder_requires_id() {
        let mut crac = Crac::new("crac");
        let err = crac.new_contingency().add().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot add a contingency object with no specified id. Please use withId()"
        );
    }
}
