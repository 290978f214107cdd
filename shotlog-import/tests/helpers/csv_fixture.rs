//! CSV fixture builder
//!
//! Produces shot exports in the documented column order.

pub const HEADER: &str = "date,team1,team2,time,shooting_team,result,type,xg,xgot,shooter,passer,\
t1_lw,t1_c,t1_rw,t1_ld,t1_rd,t1_g,t2_lw,t2_c,t2_rw,t2_ld,t2_rd,t2_g,\
pp,sh,distance,angle,player_team1,player_team2,x,y";

/// One shot row of an export
#[derive(Debug, Clone)]
pub struct ShotRow {
    pub date: String,
    pub team1: String,
    pub team2: String,
    pub time: String,
    pub shooting_team: String,
    pub result: String,
    pub shot_type: String,
    pub xg: String,
    pub shooter: String,
    pub passer: String,
    pub distance: String,
    pub angle: String,
}

impl ShotRow {
    pub fn new(time: &str, shooter: &str) -> Self {
        Self {
            date: "2024-01-01".to_string(),
            team1: "Team A".to_string(),
            team2: "Team B".to_string(),
            time: time.to_string(),
            shooting_team: "Team A".to_string(),
            result: "Saved".to_string(),
            shot_type: "Direct".to_string(),
            xg: "0.12".to_string(),
            shooter: shooter.to_string(),
            passer: String::new(),
            distance: "8.5".to_string(),
            angle: "20".to_string(),
        }
    }

    pub fn with_result(mut self, result: &str) -> Self {
        self.result = result.to_string();
        self
    }

    pub fn with_distance(mut self, distance: &str) -> Self {
        self.distance = distance.to_string();
        self
    }

    fn cell(value: &str) -> String {
        if value.contains(',') || value.contains('"') {
            format!("\"{}\"", value.replace('"', "\"\""))
        } else {
            value.to_string()
        }
    }

    pub fn to_csv(&self) -> String {
        let lineup = |prefix: &str| {
            ["LW", "C", "RW", "LD", "RD", "G"]
                .iter()
                .map(|pos| format!("{} {}", prefix, pos))
                .collect::<Vec<_>>()
        };

        let mut cells = vec![
            self.date.clone(),
            self.team1.clone(),
            self.team2.clone(),
            self.time.clone(),
            self.shooting_team.clone(),
            self.result.clone(),
            self.shot_type.clone(),
            self.xg.clone(),
            "0.3".to_string(),
            self.shooter.clone(),
            self.passer.clone(),
        ];
        cells.extend(lineup("A"));
        cells.extend(lineup("B"));
        cells.extend(
            ["0", "0", self.distance.as_str(), self.angle.as_str(), "5", "5", "1.0", "2.0"]
                .iter()
                .map(|s| s.to_string()),
        );

        cells.iter().map(|c| Self::cell(c)).collect::<Vec<_>>().join(",")
    }
}

/// `n` distinct rows, one per second of play
pub fn numbered_rows(n: usize) -> Vec<ShotRow> {
    (0..n)
        .map(|i| ShotRow::new(&format!("{:02}:{:02}", i / 60, i % 60), &format!("Player {}", i % 5)))
        .collect()
}

/// Header plus rows
pub fn csv_text(rows: &[ShotRow]) -> String {
    let mut text = String::from(HEADER);
    for row in rows {
        text.push_str("\r\n");
        text.push_str(&row.to_csv());
    }
    text.push_str("\r\n");
    text
}
