pub mod de;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One model recommendation for a single market: the play and how sure the model is
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickLine {
    #[serde(default, deserialize_with = "de::string")]
    pub pick: String,
    #[serde(default, deserialize_with = "de::confidence")]
    pub confidence: f64, // Percentage between 0 and 100
    #[serde(
        default,
        deserialize_with = "de::odds",
        skip_serializing_if = "Option::is_none"
    )]
    pub odds: Option<i32>, // American odds for the picked side
}

/// Model picks for one game at one bookmaker
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pick {
    #[serde(default, deserialize_with = "de::string")]
    pub matchup: String,
    #[serde(default, deserialize_with = "de::string")]
    pub bookmaker: String,
    #[serde(
        default,
        alias = "mlPick",
        deserialize_with = "de::pick_line",
        skip_serializing_if = "Option::is_none"
    )]
    pub moneyline_pick: Option<PickLine>,
    #[serde(
        default,
        deserialize_with = "de::pick_line",
        skip_serializing_if = "Option::is_none"
    )]
    pub spread_pick: Option<PickLine>,
    #[serde(
        default,
        deserialize_with = "de::pick_line",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_pick: Option<PickLine>,
    #[serde(
        default,
        deserialize_with = "de::pick_line",
        skip_serializing_if = "Option::is_none"
    )]
    pub recommended_play: Option<PickLine>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropLock {
    #[serde(default, deserialize_with = "de::string")]
    pub player: String,
    #[serde(default, deserialize_with = "de::string")]
    pub market: String,
    #[serde(default, deserialize_with = "de::optional_number")]
    pub line: Option<f64>,
    #[serde(default, deserialize_with = "de::string")]
    pub pick: String,
    #[serde(default, deserialize_with = "de::confidence")]
    pub confidence: f64,
}

/// The "picks of the day" payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeaturedLocks {
    #[serde(default, deserialize_with = "de::pick_line")]
    pub moneyline_lock: Option<PickLine>,
    #[serde(default, deserialize_with = "de::pick_line")]
    pub spread_lock: Option<PickLine>,
    #[serde(default, deserialize_with = "de::object")]
    pub prop_lock: Option<PropLock>,
    #[serde(default, deserialize_with = "de::list")]
    pub picks: Vec<Pick>,
    #[serde(default, deserialize_with = "de::datetime")]
    pub generated_at: Option<DateTime<Utc>>,
}

/// Graded record of past picks
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub wins: u32,
    pub losses: u32,
    pub win_rate: f64, // Percentage between 0 and 100
}

impl Record {
    pub fn format(&self) -> String {
        format!("{}-{} ({:.1}%)", self.wins, self.losses, self.win_rate)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamScore {
    #[serde(default, deserialize_with = "de::string")]
    pub name: String,
    #[serde(default, deserialize_with = "de::optional_string")]
    pub score: Option<String>,
}

/// A live or recently finished game
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreEntry {
    #[serde(default, deserialize_with = "de::optional_string")]
    pub id: Option<String>,
    #[serde(default, alias = "home_team", deserialize_with = "de::string")]
    pub home_team: String,
    #[serde(default, alias = "away_team", deserialize_with = "de::string")]
    pub away_team: String,
    #[serde(default, deserialize_with = "de::list")]
    pub scores: Vec<TeamScore>,
    #[serde(default, deserialize_with = "de::boolean")]
    pub completed: bool,
    #[serde(default, alias = "last_update", deserialize_with = "de::datetime")]
    pub last_update: Option<DateTime<Utc>>,
}

/// Player prop recommendation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropPick {
    #[serde(default, deserialize_with = "de::string")]
    pub player: String,
    #[serde(default, deserialize_with = "de::string")]
    pub market: String,
    #[serde(default, deserialize_with = "de::optional_number")]
    pub line: Option<f64>,
    #[serde(default, deserialize_with = "de::odds")]
    pub over: Option<i32>, // American odds
    #[serde(default, deserialize_with = "de::odds")]
    pub under: Option<i32>, // American odds
    #[serde(default, deserialize_with = "de::string")]
    pub matchup: String,
}

/// Which betting market a play belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Market {
    Moneyline,
    Spread,
    Total,
    Recommended,
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Market::Moneyline => "Moneyline",
            Market::Spread => "Spread",
            Market::Total => "Total",
            Market::Recommended => "Recommended",
        };
        f.write_str(label)
    }
}

/// A single play pulled out of a pick, with market-derived numbers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Play {
    pub matchup: String,
    pub market: Market,
    pub pick: String,
    pub confidence: f64,
    pub odds: Option<i32>,
    pub implied_prob: Option<f64>, // Percentage implied by the odds
    pub edge: Option<f64>,         // confidence - implied_prob, percentage points
}

/// One data section of the dashboard, one per endpoint kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SectionKind {
    Featured,
    Picks,
    Record,
    Scores,
    Props,
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SectionKind::Featured => "featured",
            SectionKind::Picks => "picks",
            SectionKind::Record => "record",
            SectionKind::Scores => "scores",
            SectionKind::Props => "props",
        };
        f.write_str(label)
    }
}

/// Freshness of one section of a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SectionState {
    /// Refreshed by the cycle that produced the snapshot
    Fresh,
    /// The latest refresh failed; the value is carried over from an earlier cycle
    Stale { reason: String },
    /// Never loaded successfully; the value is the empty default
    Unavailable { reason: String },
}

impl SectionState {
    pub fn has_data(&self) -> bool {
        !matches!(self, SectionState::Unavailable { .. })
    }
}

/// The merged view model of one poll cycle. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub seq: u64,
    pub fetched_at: DateTime<Utc>,
    pub picks: Vec<Pick>,
    pub featured: Option<FeaturedLocks>,
    pub record: Record,
    pub scores: Vec<ScoreEntry>,
    pub props: Vec<PropPick>,
    pub top_plays: Vec<Play>,
    pub sections: BTreeMap<SectionKind, SectionState>,
}

impl Snapshot {
    pub fn section(&self, kind: SectionKind) -> Option<&SectionState> {
        self.sections.get(&kind)
    }
}
