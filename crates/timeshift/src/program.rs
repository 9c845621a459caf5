use crate::error::EngineError;
use chrono::{DateTime, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use serde::Deserialize;
use std::fmt;

/// Timestamp layout used by the broadcaster's catalog (local time).
pub const DATETIME_LAYOUT: &str = "%Y%m%d%H%M";

/// Immutable program metadata from the external catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct Program {
    pub station_id: String,
    pub title: String,
    pub performer: String,
    /// Broadcast start, local to the broadcaster's zone, in [`DATETIME_LAYOUT`].
    pub start: String,
    /// Broadcast end, same layout.
    pub end: String,
    pub description: String,
}

impl Program {
    pub fn id(&self) -> ProgramId {
        ProgramId {
            station_id: self.station_id.clone(),
            start: self.start.clone(),
            title: self.title.clone(),
        }
    }

    /// Parse the start timestamp in the given zone.
    pub fn start_time(&self, tz: Tz) -> Result<DateTime<Tz>, EngineError> {
        let naive = NaiveDateTime::parse_from_str(&self.start, DATETIME_LAYOUT).map_err(|e| {
            EngineError::InvalidStartTime {
                input: self.start.clone(),
                reason: e.to_string(),
            }
        })?;
        tz.from_local_datetime(&naive)
            .single()
            .ok_or_else(|| EngineError::InvalidStartTime {
                input: self.start.clone(),
                reason: "ambiguous or nonexistent local time".to_string(),
            })
    }

    /// Broadcast year as written into the artifact's tag.
    pub fn year(&self) -> &str {
        self.start.get(..4).unwrap_or("")
    }
}

/// Program identity: (station, start, title).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgramId {
    pub station_id: String,
    pub start: String,
    pub title: String,
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]{} ({})", self.station_id, self.title, self.start)
    }
}
