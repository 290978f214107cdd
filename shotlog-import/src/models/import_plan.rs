//! Import target, plan and outcome

use crate::error::ImportError;
use crate::models::ShotCandidate;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use shotlog_common::db::normalize_game_name;
use uuid::Uuid;

/// Date formats accepted for a game date, first match wins
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y", "%d/%m/%Y"];

/// The game an import is merged into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameTarget {
    pub name: String,
    pub date: String,
}

impl GameTarget {
    pub fn new(name: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            date: date.into(),
        }
    }

    /// Validate and normalize: trimmed name, ISO `YYYY-MM-DD` date
    pub fn validated(&self) -> Result<GameTarget, ImportError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ImportError::Validation("Game name is required".to_string()));
        }

        let date = self.date.trim();
        if date.is_empty() {
            return Err(ImportError::Validation("Game date is required".to_string()));
        }

        let parsed = parse_game_date(date)
            .ok_or_else(|| ImportError::Validation(format!("Invalid game date '{}'", date)))?;

        Ok(GameTarget {
            name: name.to_string(),
            date: parsed.format("%Y-%m-%d").to_string(),
        })
    }

    /// Key under which concurrent imports of the same game are serialized
    pub fn lease_key(&self) -> (String, String) {
        (normalize_game_name(&self.name), self.date.trim().to_string())
    }

    /// Derive a target from the first data row: `"<team1> vs <team2>"` on
    /// the row's date
    pub fn suggest(candidates: &[ShotCandidate]) -> Option<GameTarget> {
        let first = candidates.first()?;
        let record = &first.record;
        if record.team1.is_empty() || record.team2.is_empty() || record.date.is_empty() {
            return None;
        }

        Some(GameTarget::new(
            format!("{} vs {}", record.team1, record.team2),
            record.date.clone(),
        ))
    }
}

fn parse_game_date(date: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date, format).ok())
}

/// What a commit would do, computed before anything is written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportPlan {
    pub total: usize,
    pub unique_count: usize,
    pub duplicate_count: usize,
    pub target_is_new_game: bool,
    /// Existing game the rows would be merged into
    pub target_game_id: Option<i64>,
}

impl ImportPlan {
    pub fn has_conflicts(&self) -> bool {
        self.duplicate_count > 0
    }
}

/// How duplicate conflicts are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportMode {
    /// Stop and ask for confirmation when duplicates are found
    #[default]
    Standard,
    /// Commit the non-duplicate rows without asking
    Forced,
}

/// Summary of a committed import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub session_id: Uuid,
    pub game_id: i64,
    pub game_created: bool,
    pub plan: ImportPlan,
    pub inserted: usize,
    pub skipped: usize,
    /// Shots stored for the game after the commit
    pub game_shot_count: i64,
}

/// Result of driving an import as far as it can go
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImportOutcome {
    /// Rows committed and the snapshot saved
    Committed(ImportReport),
    /// Duplicates found; nothing written until a forced import is requested
    AwaitingConfirmation(ImportPlan),
}

#[cfg(test)]
mod tests {
    use super::*;
    use shotlog_common::db::ShotRecord;

    #[test]
    fn test_validated_trims_and_normalizes_date() {
        let target = GameTarget::new("  Team A vs Team B ", "01.02.2024");
        let validated = target.validated().unwrap();

        assert_eq!(validated.name, "Team A vs Team B");
        assert_eq!(validated.date, "2024-02-01");
    }

    #[test]
    fn test_missing_name_or_date_is_validation_error() {
        assert!(matches!(
            GameTarget::new("   ", "2024-01-01").validated(),
            Err(ImportError::Validation(_))
        ));
        assert!(matches!(
            GameTarget::new("A vs B", "").validated(),
            Err(ImportError::Validation(_))
        ));
        assert!(matches!(
            GameTarget::new("A vs B", "yesterday").validated(),
            Err(ImportError::Validation(_))
        ));
    }

    #[test]
    fn test_lease_key_ignores_case_and_whitespace() {
        let a = GameTarget::new(" Team A vs Team B", "2024-01-01");
        let b = GameTarget::new("team a VS team b ", "2024-01-01");
        assert_eq!(a.lease_key(), b.lease_key());
    }

    #[test]
    fn test_suggest_from_first_row() {
        let candidate = ShotCandidate {
            row_index: 1,
            record: ShotRecord {
                date: "2024-03-09".to_string(),
                team1: "Lions".to_string(),
                team2: "Tigers".to_string(),
                ..ShotRecord::default()
            },
            coerced_fields: Vec::new(),
        };

        let target = GameTarget::suggest(&[candidate]).unwrap();
        assert_eq!(target.name, "Lions vs Tigers");
        assert_eq!(target.date, "2024-03-09");
        assert!(GameTarget::suggest(&[]).is_none());
    }
}
