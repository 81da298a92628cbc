// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Version clock
//!
//! Issues creation timestamps that never repeat or go backwards within one
//! repository. Follows wall time while it advances; when two versions land in
//! the same tick, or the wall clock steps back, the next timestamp is the last
//! one plus a microsecond.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

/// Clock errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClockError {
    #[error("No timestamp left after {0}")]
    Exhausted(DateTime<Utc>),
}

/// Monotonic timestamp source for version creation
#[derive(Debug, Clone, Default)]
pub struct VersionClock {
    /// Last issued or observed timestamp
    last: Option<DateTime<Utc>>,
}

impl VersionClock {
    /// Create a clock that has not issued anything yet
    pub fn new() -> Self {
        Self { last: None }
    }

    /// Issue the next timestamp
    pub fn tick(&mut self) -> Result<DateTime<Utc>, ClockError> {
        self.tick_at(Utc::now())
    }

    /// Issue the next timestamp given a wall clock reading.
    ///
    /// Fails when the last timestamp is the largest representable one
    /// (only reachable through imported data).
    pub fn tick_at(&mut self, wall: DateTime<Utc>) -> Result<DateTime<Utc>, ClockError> {
        let next = match self.last {
            Some(last) if wall <= last => last
                .checked_add_signed(Duration::microseconds(1))
                .ok_or(ClockError::Exhausted(last))?,
            _ => wall,
        };
        self.last = Some(next);
        Ok(next)
    }

    /// Record an externally produced timestamp (e.g. from an import) so
    /// later ticks sort after it
    pub fn observe(&mut self, timestamp: DateTime<Utc>) {
        if self.last.map_or(true, |last| timestamp > last) {
            self.last = Some(timestamp);
        }
    }

    /// Last issued or observed timestamp
    pub fn last(&self) -> Option<DateTime<Utc>> {
        self.last
    }
}
