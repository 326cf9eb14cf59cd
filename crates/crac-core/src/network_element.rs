use std::fmt;

use serde::{Deserialize, Serialize};

/// A physical element of the network referenced by the CRAC.
///
/// Identity is the id; the name is informational and defaults to the id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NetworkElement {
    id: String,
    name: String,
}

impl NetworkElement {
    pub fn new(id: impl Into<String>, name: Option<&str>) -> Self {
        let id = id.into();
        let name = name.map_or_else(|| id.clone(), str::to_string);
        Self { id, name }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for NetworkElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}
