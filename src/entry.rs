// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Logged records and their single-line encoding.
//!
//! Each entry is stored as one compact JSON object terminated by `\n`:
//!
//! ```text
//! {"date":"2025-01-01T00:00:00Z","headers":{"host":"example.org"}}
//! ```
//!
//! Absent attribute maps are omitted. Lines written with an explicit `null`
//! or an empty object for a map decode to the same absent value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{LogError, Result};

/// String-keyed attribute map carried by an entry.
pub type Attributes = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    date: DateTime<Utc>,
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    headers: Option<Attributes>,
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    params: Option<Attributes>,
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    body: Option<Attributes>,
}

impl Entry {
    /// Capture an entry stamped with the current time.
    pub fn new(
        headers: Option<Attributes>,
        params: Option<Attributes>,
        body: Option<Attributes>,
    ) -> Self {
        Self::at(Utc::now(), headers, params, body)
    }

    /// Build an entry with an explicit capture time.
    pub fn at(
        date: DateTime<Utc>,
        headers: Option<Attributes>,
        params: Option<Attributes>,
        body: Option<Attributes>,
    ) -> Self {
        Self {
            date,
            headers: headers.filter(|m| !m.is_empty()),
            params: params.filter(|m| !m.is_empty()),
            body: body.filter(|m| !m.is_empty()),
        }
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn headers(&self) -> Option<&Attributes> {
        self.headers.as_ref()
    }

    pub fn params(&self) -> Option<&Attributes> {
        self.params.as_ref()
    }

    pub fn body(&self) -> Option<&Attributes> {
        self.body.as_ref()
    }

    /// Encode as a single line, including the trailing `\n`.
    ///
    /// Compact JSON escapes control characters inside strings, so the only
    /// newline in the output is the terminator.
    pub fn encode(&self) -> Result<String> {
        let mut line = serde_json::to_string(self).map_err(LogError::Encode)?;
        line.push('\n');
        Ok(line)
    }

    /// Decode one stored line. `index` is the absolute line number, used for
    /// error reporting only.
    pub fn decode(line: &str, index: u64) -> Result<Self> {
        serde_json::from_str(line).map_err(|source| LogError::Decode {
            line: index,
            source,
        })
    }
}

fn non_empty<'de, D>(deserializer: D) -> std::result::Result<Option<Attributes>, D::Error>
where
    D: Deserializer<'de>,
{
    let map = Option::<Attributes>::deserialize(deserializer)?;
    Ok(map.filter(|m| !m.is_empty()))
}
