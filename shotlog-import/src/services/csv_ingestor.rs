//! CSV ingestion for shot exports
//!
//! Parsing is strict about structure (balanced quotes, non-empty input) and
//! permissive about content: short rows yield empty fields and unparseable
//! numbers become 0. No row is dropped for its shape.
//!
//! Columns are bound by header name, so a reordered export still maps
//! correctly. A header with none of the known names, or with foreign names
//! only where the known ones leave gaps, is read in the documented
//! positional order.

use shotlog_common::db::{OnIce, ShotRecord, ShotResult, ShotType};
use tracing::{debug, warn};

use crate::error::ParseError;
use crate::models::ShotCandidate;

/// Number of data columns in a shot export
pub const COLUMN_COUNT: usize = 31;

/// Shot export columns in documented order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Date,
    Team1,
    Team2,
    Time,
    ShootingTeam,
    Result,
    Type,
    Xg,
    Xgot,
    Shooter,
    Passer,
    T1Lw,
    T1C,
    T1Rw,
    T1Ld,
    T1Rd,
    T1G,
    T2Lw,
    T2C,
    T2Rw,
    T2Ld,
    T2Rd,
    T2G,
    Pp,
    Sh,
    Distance,
    Angle,
    PlayerTeam1,
    PlayerTeam2,
    /// Shot location on the rink chart; older exports stop before these
    X,
    Y,
}

impl Column {
    pub const ALL: [Column; COLUMN_COUNT] = [
        Column::Date,
        Column::Team1,
        Column::Team2,
        Column::Time,
        Column::ShootingTeam,
        Column::Result,
        Column::Type,
        Column::Xg,
        Column::Xgot,
        Column::Shooter,
        Column::Passer,
        Column::T1Lw,
        Column::T1C,
        Column::T1Rw,
        Column::T1Ld,
        Column::T1Rd,
        Column::T1G,
        Column::T2Lw,
        Column::T2C,
        Column::T2Rw,
        Column::T2Ld,
        Column::T2Rd,
        Column::T2G,
        Column::Pp,
        Column::Sh,
        Column::Distance,
        Column::Angle,
        Column::PlayerTeam1,
        Column::PlayerTeam2,
        Column::X,
        Column::Y,
    ];

    /// Canonical header text
    pub fn header_name(self) -> &'static str {
        match self {
            Column::Date => "date",
            Column::Team1 => "team1",
            Column::Team2 => "team2",
            Column::Time => "time",
            Column::ShootingTeam => "shooting_team",
            Column::Result => "result",
            Column::Type => "type",
            Column::Xg => "xg",
            Column::Xgot => "xgot",
            Column::Shooter => "shooter",
            Column::Passer => "passer",
            Column::T1Lw => "t1_lw",
            Column::T1C => "t1_c",
            Column::T1Rw => "t1_rw",
            Column::T1Ld => "t1_ld",
            Column::T1Rd => "t1_rd",
            Column::T1G => "t1_g",
            Column::T2Lw => "t2_lw",
            Column::T2C => "t2_c",
            Column::T2Rw => "t2_rw",
            Column::T2Ld => "t2_ld",
            Column::T2Rd => "t2_rd",
            Column::T2G => "t2_g",
            Column::Pp => "pp",
            Column::Sh => "sh",
            Column::Distance => "distance",
            Column::Angle => "angle",
            Column::PlayerTeam1 => "player_team1",
            Column::PlayerTeam2 => "player_team2",
            Column::X => "x",
            Column::Y => "y",
        }
    }

    fn aliases(self) -> &'static [&'static str] {
        match self {
            Column::Type => &["shottype"],
            Column::Pp => &["powerplay"],
            Column::Sh => &["shorthanded"],
            Column::X => &["shotx"],
            Column::Y => &["shoty"],
            _ => &[],
        }
    }

    /// Columns a named header may leave out
    fn is_optional(self) -> bool {
        matches!(self, Column::X | Column::Y)
    }

    fn matches_header(self, normalized: &str) -> bool {
        normalize_header(self.header_name()) == normalized
            || self.aliases().iter().any(|alias| *alias == normalized)
    }
}

/// Lower-case and strip everything but letters and digits
fn normalize_header(cell: &str) -> String {
    cell.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Reject input whose quotes never close
///
/// Doubled quotes (`""`) toggle twice and so stay balanced.
fn check_quote_balance(text: &str) -> Result<(), ParseError> {
    let mut in_quotes = false;
    let mut line = 1;
    let mut opened_on = 0;

    for c in text.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                if in_quotes {
                    opened_on = line;
                }
            }
            '\n' => line += 1,
            _ => {}
        }
    }

    if in_quotes {
        return Err(ParseError::UnbalancedQuote { line: opened_on });
    }
    Ok(())
}

/// Parse CSV text into rows of cells, header included
///
/// Blank lines are skipped; rows may differ in length.
pub fn parse_csv(text: &str) -> Result<Vec<Vec<String>>, ParseError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    if text.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    check_quote_balance(text)?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    debug!(rows = rows.len(), "Parsed CSV");
    Ok(rows)
}

/// Where each column lives in a row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnBinding {
    positions: [Option<usize>; COLUMN_COUNT],
    named: bool,
}

impl ColumnBinding {
    /// Documented column order
    pub fn positional() -> Self {
        let mut positions = [None; COLUMN_COUNT];
        for (i, slot) in positions.iter_mut().enumerate() {
            *slot = Some(i);
        }
        Self {
            positions,
            named: false,
        }
    }

    /// Bind columns from a header row
    ///
    /// A header naming every required column is bound by name. A header
    /// naming none is a legacy export and falls back to positions. A header
    /// naming only some columns is read by position as long as each name it
    /// does use sits in its documented place and no required column is cut
    /// off. A recognised name out of place is rejected, since positions
    /// would then silently shift fields.
    pub fn from_header(header: &[String]) -> Result<Self, ParseError> {
        let normalized: Vec<String> = header.iter().map(|h| normalize_header(h)).collect();

        let mut positions = [None; COLUMN_COUNT];
        for (slot, column) in positions.iter_mut().zip(Column::ALL) {
            *slot = normalized.iter().position(|h| column.matches_header(h));
        }

        let found = positions.iter().filter(|p| p.is_some()).count();
        if found == 0 {
            warn!("CSV header not recognised, binding columns by position");
            return Ok(Self::positional());
        }

        let missing: Vec<String> = Column::ALL
            .iter()
            .zip(positions.iter())
            .filter(|(column, position)| position.is_none() && !column.is_optional())
            .map(|(column, _)| column.header_name().to_string())
            .collect();

        if missing.is_empty() {
            return Ok(Self {
                positions,
                named: true,
            });
        }

        let in_place = positions
            .iter()
            .enumerate()
            .all(|(documented, position)| position.map_or(true, |p| p == documented));
        let required = Column::ALL.iter().filter(|c| !c.is_optional()).count();

        if in_place && header.len() >= required {
            warn!(
                unrecognised = %missing.join(", "),
                "CSV header partly recognised, binding columns by position"
            );
            return Ok(Self::positional());
        }

        Err(ParseError::HeaderMismatch { missing })
    }

    pub fn is_named(&self) -> bool {
        self.named
    }

    pub fn position(&self, column: Column) -> Option<usize> {
        self.positions[column as usize]
    }

    fn cell<'a>(&self, row: &'a [String], column: Column) -> &'a str {
        self.position(column)
            .and_then(|i| row.get(i))
            .map(|s| s.trim())
            .unwrap_or("")
    }

    /// Map one data row to a shot candidate
    pub fn map_row(&self, row_index: usize, row: &[String]) -> ShotCandidate {
        let mut mapper = RowMapper {
            binding: self,
            row,
            coerced: Vec::new(),
        };

        let record = ShotRecord {
            date: mapper.text(Column::Date),
            team1: mapper.text(Column::Team1),
            team2: mapper.text(Column::Team2),
            time: mapper.text(Column::Time),
            shooting_team: mapper.text(Column::ShootingTeam),
            result: ShotResult::parse(mapper.cell(Column::Result)),
            shot_type: ShotType::parse(mapper.cell(Column::Type)),
            xg: mapper.float(Column::Xg),
            xgot: mapper.float(Column::Xgot),
            shooter: mapper.text(Column::Shooter),
            passer: mapper.text(Column::Passer),
            team1_on_ice: OnIce {
                lw: mapper.text(Column::T1Lw),
                c: mapper.text(Column::T1C),
                rw: mapper.text(Column::T1Rw),
                ld: mapper.text(Column::T1Ld),
                rd: mapper.text(Column::T1Rd),
                g: mapper.text(Column::T1G),
            },
            team2_on_ice: OnIce {
                lw: mapper.text(Column::T2Lw),
                c: mapper.text(Column::T2C),
                rw: mapper.text(Column::T2Rw),
                ld: mapper.text(Column::T2Ld),
                rd: mapper.text(Column::T2Rd),
                g: mapper.text(Column::T2G),
            },
            pp: mapper.flag(Column::Pp),
            sh: mapper.flag(Column::Sh),
            distance: mapper.float(Column::Distance),
            angle: mapper.float(Column::Angle),
            player_team1: mapper.int(Column::PlayerTeam1),
            player_team2: mapper.int(Column::PlayerTeam2),
            x: mapper.float(Column::X),
            y: mapper.float(Column::Y),
        };

        ShotCandidate {
            row_index,
            record,
            coerced_fields: mapper.coerced,
        }
    }
}

struct RowMapper<'a> {
    binding: &'a ColumnBinding,
    row: &'a [String],
    coerced: Vec<&'static str>,
}

impl<'a> RowMapper<'a> {
    fn cell(&self, column: Column) -> &'a str {
        self.binding.cell(self.row, column)
    }

    fn text(&self, column: Column) -> String {
        self.cell(column).to_string()
    }

    fn float(&mut self, column: Column) -> f64 {
        let raw = self.cell(column);
        if raw.is_empty() {
            return 0.0;
        }

        let parsed = raw
            .parse::<f64>()
            .or_else(|_| raw.replacen(',', ".", 1).parse::<f64>())
            .ok()
            .filter(|v| v.is_finite());

        match parsed {
            Some(v) => v,
            None => {
                self.coerced.push(column.header_name());
                0.0
            }
        }
    }

    fn int(&mut self, column: Column) -> i64 {
        let raw = self.cell(column);
        if raw.is_empty() {
            return 0;
        }

        if let Ok(v) = raw.parse::<i64>() {
            return v;
        }

        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() && v.fract() == 0.0 => v as i64,
            _ => {
                self.coerced.push(column.header_name());
                0
            }
        }
    }

    fn flag(&mut self, column: Column) -> bool {
        let raw = self.cell(column).to_lowercase();
        match raw.as_str() {
            "1" | "true" | "yes" | "y" | "x" => true,
            "" | "0" | "false" | "no" | "n" => false,
            _ => {
                self.coerced.push(column.header_name());
                false
            }
        }
    }
}

/// Map a row in documented column order
pub fn map_row_to_shot(row: &[String]) -> ShotRecord {
    ColumnBinding::positional().map_row(0, row).record
}

/// Parsed shot export: header plus mapped data rows
#[derive(Debug, Clone)]
pub struct IngestedCsv {
    pub header: Vec<String>,
    pub binding: ColumnBinding,
    pub candidates: Vec<ShotCandidate>,
}

/// Parse a shot export and map every data row
///
/// The first row is the header; data rows keep their file position as
/// `row_index` (first data row is 1).
pub fn ingest(text: &str) -> Result<IngestedCsv, ParseError> {
    let mut rows = parse_csv(text)?.into_iter();
    let header = rows.next().unwrap_or_default();
    let binding = ColumnBinding::from_header(&header)?;

    let candidates: Vec<ShotCandidate> = rows
        .enumerate()
        .map(|(i, row)| binding.map_row(i + 1, &row))
        .collect();

    debug!(
        candidates = candidates.len(),
        named_binding = binding.is_named(),
        "Mapped CSV rows to shots"
    );

    Ok(IngestedCsv {
        header,
        binding,
        candidates,
    })
}
