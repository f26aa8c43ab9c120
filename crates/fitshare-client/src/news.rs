//! Plaintext body of an activity post
//!
//! This JSON document is what gets encrypted per recipient; the backend only
//! ever stores its ciphertexts.

use crate::{ClientError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Activity category of a post
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SportCategory {
    Running,
    Cycling,
    Walking,
    Tennis,
    Swimming,
}

impl SportCategory {
    pub const ALL: [SportCategory; 5] = [
        Self::Running,
        Self::Cycling,
        Self::Walking,
        Self::Tennis,
        Self::Swimming,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Cycling => "CYCLING",
            Self::Walking => "WALKING",
            Self::Tennis => "TENNIS",
            Self::Swimming => "SWIMMING",
        }
    }
}

impl fmt::Display for SportCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SportCategory {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ClientError::Config(format!("unknown sport category: {}", s)))
    }
}

/// A single activity post
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewsContent {
    pub category: SportCategory,
    pub content: String,
    pub kcal: u32,
    /// Duration in minutes
    pub time: u32,
    /// Distance in kilometres, 0 when not applicable
    #[serde(default)]
    pub distance: f64,
}

impl NewsContent {
    pub fn new(category: SportCategory, content: impl Into<String>, kcal: u32, time: u32) -> Self {
        Self {
            category,
            content: content.into(),
            kcal,
            time,
            distance: 0.0,
        }
    }

    pub fn with_distance(mut self, distance: f64) -> Self {
        self.distance = distance;
        self
    }

    /// Serialize to the plaintext that gets encrypted
    pub fn to_plaintext(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a decrypted feed item body
    pub fn from_plaintext(plaintext: &str) -> Result<Self> {
        Ok(serde_json::from_str(plaintext)?)
    }
}

/// Parse an `HH:MM` duration into minutes
pub fn parse_time_minutes(time: &str) -> Result<u32> {
    let invalid = || ClientError::Config(format!("invalid duration '{}', expected HH:MM", time));

    let (hours, minutes) = time.trim().split_once(':').ok_or_else(invalid)?;
    let hours: u32 = hours.parse().map_err(|_| invalid())?;
    let minutes: u32 = minutes.parse().map_err(|_| invalid())?;
    if minutes >= 60 {
        return Err(invalid());
    }
    hours
        .checked_mul(60)
        .and_then(|total| total.checked_add(minutes))
        .ok_or_else(invalid)
}
