//! Instants: the named time points of a CRAC.
//!
//! A CRAC's instants form a chain `preventive -> outage -> [auto] -> curative*`.
//! Instants are only created through [`Crac::new_instant`](crate::Crac::new_instant),
//! which enforces the chain; once created they never change.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of an instant, in lattice order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstantKind {
    Preventive,
    Outage,
    Auto,
    Curative,
}

impl fmt::Display for InstantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InstantKind::Preventive => "PREVENTIVE",
            InstantKind::Outage => "OUTAGE",
            InstantKind::Auto => "AUTO",
            InstantKind::Curative => "CURATIVE",
        };
        f.write_str(label)
    }
}

/// A named point of the CRAC timeline.
///
/// `order` is the 0-based registration index, so the preventive instant is
/// always `0` and the outage instant `1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instant {
    id: String,
    kind: InstantKind,
    order: usize,
    previous: Option<String>,
}

impl Instant {
    /// Build the instant that follows `previous` (or the first one).
    pub(crate) fn new(id: impl Into<String>, kind: InstantKind, previous: Option<&Instant>) -> Self {
        Self {
            id: id.into(),
            kind,
            order: previous.map_or(0, |p| p.order + 1),
            previous: previous.map(|p| p.id.clone()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> InstantKind {
        self.kind
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Id of the immediately preceding instant
    pub fn previous_id(&self) -> Option<&str> {
        self.previous.as_deref()
    }

    pub fn is_preventive(&self) -> bool {
        self.kind == InstantKind::Preventive
    }

    pub fn is_outage(&self) -> bool {
        self.kind == InstantKind::Outage
    }

    pub fn is_auto(&self) -> bool {
        self.kind == InstantKind::Auto
    }

    pub fn is_curative(&self) -> bool {
        self.kind == InstantKind::Curative
    }

    pub fn comes_before(&self, other: &Instant) -> bool {
        self.order < other.order
    }

    pub fn comes_after(&self, other: &Instant) -> bool {
        self.order > other.order
    }

    /// Earlier of two instants; `None` as soon as one side is missing.
    pub fn min<'a>(a: Option<&'a Instant>, b: Option<&'a Instant>) -> Option<&'a Instant> {
        match (a, b) {
            (Some(a), Some(b)) => Some(if b.comes_before(a) { b } else { a }),
            _ => None,
        }
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}
