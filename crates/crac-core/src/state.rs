//! States: "when, and under which outage" a limit or an action applies.
//!
//! A state is either preventive (the preventive instant, no contingency) or
//! post-contingency (a contingency plus a non-preventive instant). States are
//! created lazily by the [`Crac`](crate::Crac) and cached by id.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CracError, CracResult};
use crate::instant::Instant;

const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct State {
    id: String,
    instant: Instant,
    contingency_id: Option<String>,
    timestamp: Option<DateTime<Utc>>,
}

impl State {
    pub(crate) fn preventive(instant: Instant, timestamp: Option<DateTime<Utc>>) -> Self {
        Self {
            id: Self::preventive_id(instant.id(), timestamp.as_ref()),
            instant,
            contingency_id: None,
            timestamp,
        }
    }

    pub(crate) fn post_contingency(
        contingency_id: impl Into<String>,
        instant: Instant,
        timestamp: Option<DateTime<Utc>>,
    ) -> Self {
        let contingency_id = contingency_id.into();
        Self {
            id: Self::post_contingency_id(&contingency_id, instant.id(), timestamp.as_ref()),
            instant,
            contingency_id: Some(contingency_id),
            timestamp,
        }
    }

    /// `"{instantId}[ - yyyyMMddHHmm]"`
    pub fn preventive_id(instant_id: &str, timestamp: Option<&DateTime<Utc>>) -> String {
        match timestamp {
            Some(ts) => format!("{} - {}", instant_id, ts.format(TIMESTAMP_FORMAT)),
            None => instant_id.to_string(),
        }
    }

    /// `"{contingencyId} - {instantId}[ - yyyyMMddHHmm]"`
    pub fn post_contingency_id(
        contingency_id: &str,
        instant_id: &str,
        timestamp: Option<&DateTime<Utc>>,
    ) -> String {
        match timestamp {
            Some(ts) => format!(
                "{} - {} - {}",
                contingency_id,
                instant_id,
                ts.format(TIMESTAMP_FORMAT)
            ),
            None => format!("{} - {}", contingency_id, instant_id),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn instant(&self) -> &Instant {
        &self.instant
    }

    pub fn contingency_id(&self) -> Option<&str> {
        self.contingency_id.as_deref()
    }

    pub fn timestamp(&self) -> Option<&DateTime<Utc>> {
        self.timestamp.as_ref()
    }

    pub fn is_preventive(&self) -> bool {
        self.instant.is_preventive()
    }

    /// Order by instant, then by timestamp.
    ///
    /// Comparing a timestamped state with an untimestamped one is an error.
    pub fn compare(&self, other: &State) -> CracResult<Ordering> {
        match (&self.timestamp, &other.timestamp) {
            (Some(_), None) | (None, Some(_)) => Err(CracError::InvalidData(
                "Cannot compare states with and without timestamp".into(),
            )),
            (a, b) => Ok(self
                .instant
                .order()
                .cmp(&other.instant.order())
                .then_with(|| a.cmp(b))),
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}
