//! Maps a `ViewState` to what the dashboard shows. No I/O, no business rules.

use crate::models::{
    FeaturedLocks, Pick, PickLine, Play, PropPick, ScoreEntry, SectionKind, SectionState, Snapshot,
};
use crate::sync::merger::candidate_picks;
use crate::sync::store::ViewState;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Which screen the dashboard is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderState {
    /// Nothing fetched and nothing running
    NoData,
    /// First load in progress
    Loading,
    /// Nothing to show and the last cycle failed
    ErrorNoData,
    /// Older data on screen because the last cycle failed
    Stale,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionStatus {
    /// Not polled in this configuration
    Hidden,
    Fresh,
    Stale,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionView<T> {
    pub status: SectionStatus,
    pub note: Option<String>,
    pub items: Vec<T>,
}

impl<T> SectionView<T> {
    fn hidden() -> Self {
        Self {
            status: SectionStatus::Hidden,
            note: None,
            items: Vec::new(),
        }
    }

    fn from_state(label: &str, state: Option<&SectionState>, items: Vec<T>) -> Self {
        match state {
            None => Self::hidden(),
            Some(SectionState::Fresh) => Self {
                status: SectionStatus::Fresh,
                note: None,
                items,
            },
            Some(SectionState::Stale { reason }) => Self {
                status: SectionStatus::Stale,
                note: Some(format!("Showing earlier {} ({})", label, reason)),
                items,
            },
            Some(SectionState::Unavailable { reason }) => Self {
                status: SectionStatus::Unavailable,
                note: Some(format!("{} unavailable ({})", capitalize(label), reason)),
                items: Vec::new(),
            },
        }
    }

    pub fn is_visible(&self) -> bool {
        self.status != SectionStatus::Hidden
    }

    pub fn is_unavailable(&self) -> bool {
        self.status == SectionStatus::Unavailable
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LockCard {
    pub title: String,
    pub pick: String,
    pub confidence: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PickCard {
    pub matchup: String,
    pub bookmaker: String,
    /// "Moneyline: Chiefs (71%)", one per market present
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayCard {
    pub rank: usize,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreCard {
    pub title: String,
    pub live: bool,
    pub status_label: String,
    pub lines: Vec<String>,
    pub updated: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropCard {
    pub player: String,
    pub market: String,
    pub line: String,
    pub matchup: String,
}

/// Everything a front end needs to draw one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub state: RenderState,
    pub banner: Option<String>,
    pub auth_required: bool,
    pub refreshing: bool,
    pub polling: bool,
    pub record: SectionView<String>,
    pub locks: SectionView<LockCard>,
    pub top_plays: Vec<PlayCard>,
    pub picks: SectionView<PickCard>,
    pub scores: SectionView<ScoreCard>,
    pub props: SectionView<PropCard>,
    pub updated: Option<String>,
}

impl DashboardView {
    pub fn has_data(&self) -> bool {
        matches!(self.state, RenderState::Ready | RenderState::Stale)
    }
}

/// Select the view for a state
pub fn select(state: &ViewState) -> DashboardView {
    let render_state = match (&state.snapshot, state.loading, state.last_cycle_failed) {
        (None, true, _) => RenderState::Loading,
        (None, false, true) => RenderState::ErrorNoData,
        // Armed but the first cycle has not started yet
        (None, false, false) if state.polling => RenderState::Loading,
        (None, false, false) => RenderState::NoData,
        (Some(_), _, true) => RenderState::Stale,
        (Some(_), _, false) => RenderState::Ready,
    };

    let mut banner = state.banner.clone();
    if state.auth_required {
        banner = Some(match banner {
            Some(b) => format!("Sign in again to see protected picks. {}", b),
            None => "Sign in again to see protected picks.".to_string(),
        });
    }

    let mut view = DashboardView {
        state: render_state,
        banner,
        auth_required: state.auth_required,
        refreshing: state.loading,
        polling: state.polling,
        record: SectionView::hidden(),
        locks: SectionView::hidden(),
        top_plays: Vec::new(),
        picks: SectionView::hidden(),
        scores: SectionView::hidden(),
        props: SectionView::hidden(),
        updated: None,
    };

    if let Some(snapshot) = &state.snapshot {
        fill_sections(&mut view, snapshot, state.last_cycle_failed);
    }
    view
}

/// The state a section is drawn with. When the whole latest cycle failed,
/// nothing on screen is current, so fresh sections are shown as stale.
fn section_state(snapshot: &Snapshot, kind: SectionKind, cycle_failed: bool) -> Option<SectionState> {
    match snapshot.section(kind) {
        Some(SectionState::Fresh) if cycle_failed => Some(SectionState::Stale {
            reason: "last refresh failed".to_string(),
        }),
        other => other.cloned(),
    }
}

fn fill_sections(view: &mut DashboardView, snapshot: &Snapshot, cycle_failed: bool) {
    let state = |kind| section_state(snapshot, kind, cycle_failed);

    view.record = SectionView::from_state(
        "record",
        state(SectionKind::Record).as_ref(),
        vec![snapshot.record.format()],
    );
    view.locks = SectionView::from_state(
        "locks",
        state(SectionKind::Featured).as_ref(),
        snapshot.featured.as_ref().map(lock_cards).unwrap_or_default(),
    );

    // Picks come from /api/picks, or from the featured payload when that's all
    // there is. The status follows whichever source the cards come from.
    let picks = candidate_picks(snapshot);
    let from_featured = snapshot.picks.is_empty() && !picks.is_empty();
    let picks_state = if from_featured {
        state(SectionKind::Featured)
    } else {
        state(SectionKind::Picks).or_else(|| state(SectionKind::Featured))
    };
    view.picks = SectionView::from_state(
        "picks",
        picks_state.as_ref(),
        picks.iter().map(pick_card).collect(),
    );

    view.top_plays = snapshot
        .top_plays
        .iter()
        .enumerate()
        .map(|(i, play)| play_card(i + 1, play))
        .collect();
    view.scores = SectionView::from_state(
        "scores",
        state(SectionKind::Scores).as_ref(),
        snapshot.scores.iter().map(score_card).collect(),
    );
    view.props = SectionView::from_state(
        "props",
        state(SectionKind::Props).as_ref(),
        snapshot.props.iter().map(prop_card).collect(),
    );

    let updated = snapshot
        .featured
        .as_ref()
        .and_then(|f| f.generated_at)
        .unwrap_or(snapshot.fetched_at);
    view.updated = Some(format_time(&updated));
}

fn lock_cards(featured: &FeaturedLocks) -> Vec<LockCard> {
    let line_card = |title: &str, line: &Option<PickLine>| LockCard {
        title: title.to_string(),
        pick: line
            .as_ref()
            .map(|l| l.pick.clone())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| "No pick".to_string()),
        confidence: format!("{:.0}%", line.as_ref().map(|l| l.confidence).unwrap_or(0.0)),
    };

    let prop = featured.prop_lock.as_ref().filter(|p| !p.player.is_empty());
    vec![
        line_card("Moneyline Lock", &featured.moneyline_lock),
        line_card("Spread Lock", &featured.spread_lock),
        LockCard {
            title: "Prop Lock".to_string(),
            pick: prop
                .map(|p| {
                    [p.player.as_str(), p.pick.as_str(), p.market.as_str()]
                        .iter()
                        .filter(|s| !s.is_empty())
                        .cloned()
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .unwrap_or_else(|| "No props available".to_string()),
            confidence: format!("{:.0}%", prop.map(|p| p.confidence).unwrap_or(0.0)),
        },
    ]
}

fn pick_card(pick: &Pick) -> PickCard {
    let markets = [
        ("Moneyline", &pick.moneyline_pick),
        ("Spread", &pick.spread_pick),
        ("Total", &pick.total_pick),
        ("Recommended", &pick.recommended_play),
    ];
    let lines = markets
        .iter()
        .filter_map(|(label, line)| {
            line.as_ref()
                .filter(|l| !l.pick.is_empty())
                .map(|l| format!("{}: {} ({:.0}%)", label, l.pick, l.confidence))
        })
        .collect();

    PickCard {
        matchup: pick.matchup.clone(),
        bookmaker: pick.bookmaker.clone(),
        lines,
    }
}

fn play_card(rank: usize, play: &Play) -> PlayCard {
    PlayCard {
        rank,
        summary: play.format(),
    }
}

fn score_card(entry: &ScoreEntry) -> ScoreCard {
    let live = !entry.completed;
    let lines = if entry.scores.is_empty() {
        vec!["No scores yet.".to_string()]
    } else {
        entry
            .scores
            .iter()
            .map(|s| format!("{}: {}", s.name, s.score.as_deref().unwrap_or("-")))
            .collect()
    };

    ScoreCard {
        title: format!("{} @ {}", entry.away_team, entry.home_team),
        live,
        status_label: if live { "LIVE" } else { "FINAL" }.to_string(),
        lines,
        updated: entry.last_update.as_ref().map(format_time),
    }
}

fn prop_card(prop: &PropPick) -> PropCard {
    let price = |odds: Option<i32>| odds.map(|o| format!(" ({:+})", o)).unwrap_or_default();
    let line = match prop.line {
        Some(line) => format!(
            "Over {}{} / Under {}{}",
            line,
            price(prop.over),
            line,
            price(prop.under)
        ),
        None => "No line".to_string(),
    };

    PropCard {
        player: prop.player.clone(),
        market: prop.market.clone(),
        line,
        matchup: prop.matchup.clone(),
    }
}

fn format_time(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M UTC").to_string()
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Plain-text rendering for the terminal
pub fn format_text(view: &DashboardView) -> String {
    let mut out = String::new();
    out.push_str("LOCKBOX AI PICKS\n\n");

    match view.state {
        RenderState::NoData => out.push_str("No data available yet.\n"),
        RenderState::Loading => out.push_str("Loading data...\n"),
        RenderState::ErrorNoData => out.push_str("Could not load data.\n"),
        RenderState::Stale | RenderState::Ready => {}
    }
    if let Some(banner) = &view.banner {
        out.push_str(&format!("! {}\n", banner));
    }
    if !view.has_data() {
        return out;
    }

    push_section(&mut out, "RECORD", &view.record, |record| record.clone());
    push_section(&mut out, "PICKS OF THE DAY", &view.locks, |lock| {
        format!("{}: {} ({})", lock.title, lock.pick, lock.confidence)
    });

    if !view.top_plays.is_empty() {
        out.push_str("\nTOP PLAYS\n");
        for play in &view.top_plays {
            out.push_str(&format!("{}. {}\n", play.rank, play.summary));
        }
    }

    push_section(&mut out, "ALL PICKS", &view.picks, |pick| {
        let mut text = format!("{} [{}]", pick.matchup, pick.bookmaker);
        for line in &pick.lines {
            text.push_str(&format!("\n   {}", line));
        }
        text
    });
    push_section(&mut out, "SCORES", &view.scores, |score| {
        format!("{} {} | {}", score.title, score.status_label, score.lines.join(", "))
    });
    push_section(&mut out, "PROPS", &view.props, |prop| {
        format!("{} {} | {} | {}", prop.player, prop.market, prop.line, prop.matchup)
    });

    if let Some(updated) = &view.updated {
        out.push_str(&format!("\nUpdated: {}\n", updated));
    }
    out
}

fn push_section<T>(
    out: &mut String,
    title: &str,
    section: &SectionView<T>,
    line: impl Fn(&T) -> String,
) {
    if !section.is_visible() {
        return;
    }
    out.push_str(&format!("\n{}\n", title));
    if let Some(note) = &section.note {
        out.push_str(&format!("({})\n", note));
    }
    if section.items.is_empty() && !section.is_unavailable() {
        out.push_str("Nothing posted yet.\n");
    }
    for item in &section.items {
        out.push_str(&format!("- {}\n", line(item)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Endpoint, EndpointResult, FetchError};
    use crate::sync::store::SnapshotStore;
    use serde_json::json;
    use std::time::Duration;

    fn record_ok() -> EndpointResult {
        EndpointResult::ok(
            Endpoint::new(SectionKind::Record, "/api/record"),
            json!({ "wins": 10, "losses": 5 }),
        )
    }

    fn scores_timeout() -> EndpointResult {
        EndpointResult::failed(
            Endpoint::new(SectionKind::Scores, "/api/scores"),
            FetchError::Timeout(Duration::from_secs(15)),
        )
    }

    fn picks_ok() -> EndpointResult {
        EndpointResult::ok(
            Endpoint::new(SectionKind::Picks, "/api/picks"),
            json!({ "picks": [{
                "matchup": "Bills @ Chiefs",
                "bookmaker": "DraftKings",
                "moneylinePick": { "pick": "Chiefs", "confidence": 71 },
                "spreadPick": null
            }] }),
        )
    }

    #[test]
    fn test_no_data_and_loading() {
        let store = SnapshotStore::new();
        assert_eq!(select(&store.current()).state, RenderState::NoData);

        let epoch = store.current_epoch().unwrap();
        store.begin_cycle(epoch);
        let view = select(&store.current());
        assert_eq!(view.state, RenderState::Loading);
        assert!(format_text(&view).contains("Loading data..."));
    }

    #[test]
    fn test_error_without_data() {
        let store = SnapshotStore::new();
        let epoch = store.current_epoch().unwrap();
        store.commit(epoch, 1, vec![scores_timeout()]);

        let view = select(&store.current());
        assert_eq!(view.state, RenderState::ErrorNoData);
        assert!(view.banner.is_some());
        assert!(!view.has_data());
    }

    #[test]
    fn test_error_keeps_stale_data_on_screen() {
        let store = SnapshotStore::new();
        let epoch = store.current_epoch().unwrap();
        store.commit(epoch, 1, vec![record_ok()]);
        store.commit(
            epoch,
            2,
            vec![EndpointResult::failed(
                Endpoint::new(SectionKind::Record, "/api/record"),
                FetchError::Http { status: 503 },
            )],
        );

        let view = select(&store.current());
        assert_eq!(view.state, RenderState::Stale);
        assert_eq!(view.record.items, vec!["10-5 (66.7%)".to_string()]);
        assert!(view.banner.as_deref().unwrap().contains("HTTP status 503"));
    }

    #[test]
    fn test_total_failure_marks_every_section_stale() {
        let store = SnapshotStore::new();
        let epoch = store.current_epoch().unwrap();
        store.commit(epoch, 1, vec![record_ok(), picks_ok()]);
        store.commit(
            epoch,
            2,
            vec![
                EndpointResult::failed(
                    Endpoint::new(SectionKind::Record, "/api/record"),
                    FetchError::Http { status: 503 },
                ),
                EndpointResult::failed(
                    Endpoint::new(SectionKind::Picks, "/api/picks"),
                    FetchError::Network("connection reset".to_string()),
                ),
            ],
        );

        let view = select(&store.current());
        assert_eq!(view.state, RenderState::Stale);
        assert_eq!(view.record.status, SectionStatus::Stale);
        assert_eq!(view.record.items, vec!["10-5 (66.7%)".to_string()]);
        assert!(view.record.note.as_deref().unwrap().contains("last refresh failed"));
        assert_eq!(view.picks.status, SectionStatus::Stale);
        assert_eq!(view.picks.items.len(), 1);
        assert!(format_text(&view).contains("(Showing earlier record (last refresh failed))"));

        // The next good cycle makes them fresh again
        store.commit(epoch, 3, vec![record_ok(), picks_ok()]);
        let view = select(&store.current());
        assert_eq!(view.state, RenderState::Ready);
        assert_eq!(view.record.status, SectionStatus::Fresh);
        assert!(view.record.note.is_none());
    }

    #[test]
    fn test_picks_fall_back_to_featured_with_featured_status() {
        let store = SnapshotStore::new();
        let epoch = store.current_epoch().unwrap();
        store.commit(
            epoch,
            1,
            vec![
                EndpointResult::ok(
                    Endpoint::new(SectionKind::Featured, "/api/featured"),
                    json!({ "picks": [{
                        "matchup": "A @ B",
                        "bookmaker": "FanDuel",
                        "moneylinePick": { "pick": "B", "confidence": 80 }
                    }] }),
                ),
                EndpointResult::failed(
                    Endpoint::protected(SectionKind::Picks, "/api/picks/protected"),
                    FetchError::Auth,
                ),
            ],
        );

        let view = select(&store.current());
        assert_eq!(view.picks.status, SectionStatus::Fresh);
        assert_eq!(view.picks.items.len(), 1);
        assert_eq!(view.picks.items[0].matchup, "A @ B");
        assert_eq!(view.top_plays.len(), 1);
        assert!(view.auth_required);
    }

    #[test]
    fn test_armed_scheduler_without_data_is_loading() {
        let store = SnapshotStore::new();
        store.open_epoch();
        let view = select(&store.current());
        assert_eq!(view.state, RenderState::Loading);
        assert!(format_text(&view).contains("Loading data..."));

        store.close_epoch();
        assert_eq!(select(&store.current()).state, RenderState::NoData);
    }

    #[test]
    fn test_failed_section_renders_unavailable_only_there() {
        let store = SnapshotStore::new();
        let epoch = store.current_epoch().unwrap();
        store.commit(epoch, 1, vec![record_ok(), picks_ok(), scores_timeout()]);

        let view = select(&store.current());
        assert_eq!(view.state, RenderState::Ready);
        assert_eq!(view.picks.status, SectionStatus::Fresh);
        assert_eq!(view.picks.items[0].lines, vec!["Moneyline: Chiefs (71%)".to_string()]);
        assert!(view.scores.is_unavailable());
        assert!(view.scores.note.as_deref().unwrap().starts_with("Scores unavailable"));
        assert!(!view.props.is_visible());

        let text = format_text(&view);
        assert!(text.contains("10-5 (66.7%)"));
        assert!(text.contains("Scores unavailable"));
        assert!(!text.contains("Could not load data"));
    }

    #[test]
    fn test_score_and_prop_cards() {
        let entry: ScoreEntry = serde_json::from_value(json!({
            "homeTeam": "Chiefs",
            "awayTeam": "Bills",
            "completed": true,
            "scores": [{ "name": "Chiefs", "score": "27" }, { "name": "Bills", "score": null }]
        }))
        .unwrap();
        let card = score_card(&entry);
        assert_eq!(card.title, "Bills @ Chiefs");
        assert_eq!(card.status_label, "FINAL");
        assert_eq!(card.lines, vec!["Chiefs: 27", "Bills: -"]);

        let prop = PropPick {
            player: "Travis Kelce".to_string(),
            market: "receiving yards".to_string(),
            line: Some(62.5),
            over: Some(-115),
            under: None,
            matchup: "Bills @ Chiefs".to_string(),
        };
        assert_eq!(prop_card(&prop).line, "Over 62.5 (-115) / Under 62.5");
    }

    #[test]
    fn test_lock_cards_default_missing_locks() {
        let featured = FeaturedLocks {
            moneyline_lock: Some(PickLine {
                pick: "Chiefs ML".to_string(),
                confidence: 77.0,
                odds: None,
            }),
            ..FeaturedLocks::default()
        };
        let cards = lock_cards(&featured);
        assert_eq!(cards[0].pick, "Chiefs ML");
        assert_eq!(cards[0].confidence, "77%");
        assert_eq!(cards[1].pick, "No pick");
        assert_eq!(cards[2].pick, "No props available");
        assert_eq!(cards[2].confidence, "0%");
    }

    #[test]
    fn test_auth_required_banner() {
        let store = SnapshotStore::new();
        let epoch = store.current_epoch().unwrap();
        store.commit(
            epoch,
            1,
            vec![EndpointResult::failed(
                Endpoint::protected(SectionKind::Picks, "/api/picks/protected"),
                FetchError::Auth,
            )],
        );
        let view = select(&store.current());
        assert!(view.auth_required);
        assert_eq!(view.state, RenderState::ErrorNoData);
        assert!(view.banner.unwrap().starts_with("Sign in again"));
    }
}
