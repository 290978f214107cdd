//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized form of a game name used for uniqueness and lookups
pub fn normalize_game_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// A game: one team pairing on one date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: i64,
    /// Trimmed display name
    pub name: String,
    /// `YYYY-MM-DD`
    pub date: String,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a shot
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ShotResult {
    Goal,
    Saved,
    Blocked,
    Missed,
    Turnover,
    /// Any label outside the known set, kept verbatim
    Other(String),
}

impl ShotResult {
    pub fn as_str(&self) -> &str {
        match self {
            ShotResult::Goal => "Goal",
            ShotResult::Saved => "Saved",
            ShotResult::Blocked => "Blocked",
            ShotResult::Missed => "Missed",
            ShotResult::Turnover => "Turnover",
            ShotResult::Other(label) => label,
        }
    }

    /// Parse a result label; matching is exact and case-sensitive
    pub fn parse(label: &str) -> Self {
        match label {
            "Goal" => ShotResult::Goal,
            "Saved" => ShotResult::Saved,
            "Blocked" => ShotResult::Blocked,
            "Missed" => ShotResult::Missed,
            "Turnover" => ShotResult::Turnover,
            other => ShotResult::Other(other.to_string()),
        }
    }
}

impl Default for ShotResult {
    fn default() -> Self {
        ShotResult::Other(String::new())
    }
}

impl fmt::Display for ShotResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prefix marking a shot taken straight after a turnover
pub const TURNOVER_PREFIX: &str = "Turnover | ";

/// How a shot was taken
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ShotType {
    Direct,
    OneTimer,
    Rebound,
    /// `Turnover | <type>`
    Turnover(Box<ShotType>),
    Other(String),
}

impl ShotType {
    pub fn parse(label: &str) -> Self {
        if let Some(inner) = label.strip_prefix(TURNOVER_PREFIX) {
            return ShotType::Turnover(Box::new(ShotType::parse(inner)));
        }
        match label {
            "Direct" => ShotType::Direct,
            "One-timer" => ShotType::OneTimer,
            "Rebound" => ShotType::Rebound,
            other => ShotType::Other(other.to_string()),
        }
    }

    pub fn is_turnover(&self) -> bool {
        matches!(self, ShotType::Turnover(_))
    }
}

impl Default for ShotType {
    fn default() -> Self {
        ShotType::Other(String::new())
    }
}

impl fmt::Display for ShotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShotType::Direct => f.write_str("Direct"),
            ShotType::OneTimer => f.write_str("One-timer"),
            ShotType::Rebound => f.write_str("Rebound"),
            ShotType::Turnover(inner) => write!(f, "{}{}", TURNOVER_PREFIX, inner),
            ShotType::Other(label) => f.write_str(label),
        }
    }
}

impl Serialize for ShotResult {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ShotResult {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(ShotResult::parse(&label))
    }
}

impl Serialize for ShotType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ShotType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(ShotType::parse(&label))
    }
}

/// The six on-ice position labels of one team
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnIce {
    pub lw: String,
    pub c: String,
    pub rw: String,
    pub ld: String,
    pub rd: String,
    pub g: String,
}

/// The payload of one shot event as it appears in an import file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShotRecord {
    pub date: String,
    pub team1: String,
    pub team2: String,
    /// Time in game as recorded (e.g. `12:34`)
    pub time: String,
    pub shooting_team: String,
    pub result: ShotResult,
    #[serde(rename = "type")]
    pub shot_type: ShotType,
    pub xg: f64,
    pub xgot: f64,
    pub shooter: String,
    pub passer: String,
    pub team1_on_ice: OnIce,
    pub team2_on_ice: OnIce,
    /// Power play
    pub pp: bool,
    /// Shorthanded
    pub sh: bool,
    pub distance: f64,
    pub angle: f64,
    pub player_team1: i64,
    pub player_team2: i64,
    /// Shot location on the rink chart, 0 when the export predates it
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

/// A persisted shot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shot {
    pub id: i64,
    pub game_id: i64,
    #[serde(flatten)]
    pub record: ShotRecord,
}
