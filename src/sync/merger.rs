//! Builds the next snapshot from the previous one plus one cycle's results.

use crate::api::payloads::{decode, SectionData};
use crate::api::EndpointResult;
use crate::models::{SectionState, Snapshot};
use crate::utils::plays::{collect_plays, top_plays, TOP_PLAYS};
use chrono::Utc;
use std::collections::BTreeMap;
use tracing::debug;

/// Merge a cycle's results over the previous snapshot.
///
/// A section that fetched and decoded cleanly takes the new value. Any other
/// section keeps the previous value, or the empty default if there never was
/// one. Derived fields are recomputed from the merged data.
pub fn merge(previous: Option<&Snapshot>, results: &[EndpointResult], seq: u64) -> Snapshot {
    let mut next = match previous {
        Some(prev) => Snapshot {
            seq,
            fetched_at: Utc::now(),
            ..prev.clone()
        },
        None => Snapshot {
            seq,
            fetched_at: Utc::now(),
            picks: Vec::new(),
            featured: None,
            record: Default::default(),
            scores: Vec::new(),
            props: Vec::new(),
            top_plays: Vec::new(),
            sections: BTreeMap::new(),
        },
    };

    for result in results {
        let kind = result.endpoint.kind;
        let decoded = result
            .outcome
            .clone()
            .and_then(|payload| decode(kind, payload));

        match decoded {
            Ok(data) => {
                apply(&mut next, data);
                next.sections.insert(kind, SectionState::Fresh);
            }
            Err(error) => {
                debug!(section = %kind, error = %error, "keeping previous section value");
                let had_data = previous
                    .and_then(|prev| prev.section(kind))
                    .map(SectionState::has_data)
                    .unwrap_or(false);
                let reason = error.to_string();
                let state = if had_data {
                    SectionState::Stale { reason }
                } else {
                    SectionState::Unavailable { reason }
                };
                next.sections.insert(kind, state);
            }
        }
    }

    next.top_plays = top_plays(collect_plays(candidate_picks(&next)), TOP_PLAYS);
    next
}

fn apply(snapshot: &mut Snapshot, data: SectionData) {
    match data {
        SectionData::Featured(featured) => snapshot.featured = Some(featured),
        SectionData::Picks(picks) => snapshot.picks = picks,
        SectionData::Record(record) => snapshot.record = record,
        SectionData::Scores(scores) => snapshot.scores = scores,
        SectionData::Props(props) => snapshot.props = props,
    }
}

/// Picks from `/api/picks` when there are any, else the featured payload's own list
pub fn candidate_picks(snapshot: &Snapshot) -> &[crate::models::Pick] {
    if !snapshot.picks.is_empty() {
        return &snapshot.picks;
    }
    snapshot
        .featured
        .as_ref()
        .map(|f| f.picks.as_slice())
        .unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Endpoint, FetchError};
    use crate::models::{Record, SectionKind};
    use serde_json::json;
    use std::time::Duration;

    fn record_endpoint() -> Endpoint {
        Endpoint::new(SectionKind::Record, "/api/record")
    }

    fn picks_endpoint() -> Endpoint {
        Endpoint::new(SectionKind::Picks, "/api/picks")
    }

    fn scores_endpoint() -> Endpoint {
        Endpoint::new(SectionKind::Scores, "/api/scores")
    }

    fn picks_payload() -> serde_json::Value {
        json!({
            "picks": [
                { "matchup": "Bills @ Chiefs", "bookmaker": "DraftKings",
                  "moneylinePick": { "pick": "Chiefs", "confidence": 55 } },
                { "matchup": "Jets @ Dolphins", "bookmaker": "FanDuel",
                  "moneylinePick": { "pick": "Dolphins", "confidence": 90, "odds": -150 },
                  "spreadPick": { "pick": "Dolphins -3.5", "confidence": 70 } },
                { "matchup": "Ravens @ Steelers", "bookmaker": "FanDuel",
                  "moneylinePick": { "pick": "Ravens", "confidence": 90 } }
            ]
        })
    }

    #[test]
    fn test_first_cycle_builds_snapshot() {
        let results = vec![
            EndpointResult::ok(record_endpoint(), json!({ "wins": 10, "losses": 5 })),
            EndpointResult::ok(picks_endpoint(), picks_payload()),
            EndpointResult::failed(scores_endpoint(), FetchError::Timeout(Duration::from_secs(15))),
        ];

        let snapshot = merge(None, &results, 1);

        assert_eq!(snapshot.seq, 1);
        assert_eq!(snapshot.record.format(), "10-5 (66.7%)");
        assert_eq!(snapshot.picks.len(), 3);
        assert!(snapshot.scores.is_empty());
        assert_eq!(snapshot.section(SectionKind::Picks), Some(&SectionState::Fresh));
        assert!(matches!(
            snapshot.section(SectionKind::Scores),
            Some(SectionState::Unavailable { .. })
        ));
        // Not configured, so no state at all
        assert_eq!(snapshot.section(SectionKind::Props), None);

        let top: Vec<(&str, f64)> = snapshot
            .top_plays
            .iter()
            .map(|p| (p.pick.as_str(), p.confidence))
            .collect();
        assert_eq!(
            top,
            vec![("Dolphins", 90.0), ("Ravens", 90.0), ("Dolphins -3.5", 70.0)]
        );
        assert!((snapshot.top_plays[0].implied_prob.unwrap() - 60.0).abs() < 0.1);
        assert!((snapshot.top_plays[0].edge.unwrap() - 30.0).abs() < 0.1);
    }

    #[test]
    fn test_failed_endpoint_keeps_previous_value() {
        let first = merge(
            None,
            &[
                EndpointResult::ok(record_endpoint(), json!({ "wins": 10, "losses": 5 })),
                EndpointResult::ok(picks_endpoint(), picks_payload()),
            ],
            1,
        );

        let second = merge(
            Some(&first),
            &[
                EndpointResult::failed(record_endpoint(), FetchError::Http { status: 502 }),
                EndpointResult::ok(picks_endpoint(), json!({ "picks": [] })),
            ],
            2,
        );

        assert_eq!(second.record, first.record);
        assert_eq!(
            second.section(SectionKind::Record),
            Some(&SectionState::Stale {
                reason: "HTTP status 502".to_string()
            })
        );
        assert!(second.picks.is_empty());
        assert!(second.top_plays.is_empty());
        // The earlier snapshot is untouched
        assert_eq!(first.picks.len(), 3);
    }

    #[test]
    fn test_malformed_payload_is_a_failure() {
        let first = merge(
            None,
            &[EndpointResult::ok(record_endpoint(), json!({ "wins": 3, "losses": 1 }))],
            1,
        );
        let second = merge(
            Some(&first),
            &[EndpointResult::ok(record_endpoint(), json!({ "message": "oops" }))],
            2,
        );

        assert_eq!(
            second.record,
            Record {
                wins: 3,
                losses: 1,
                win_rate: 75.0
            }
        );
        assert!(matches!(
            second.section(SectionKind::Record),
            Some(SectionState::Stale { .. })
        ));
    }

    #[test]
    fn test_stale_stays_stale_and_unavailable_stays_unavailable() {
        let first = merge(
            None,
            &[EndpointResult::failed(scores_endpoint(), FetchError::Network("refused".into()))],
            1,
        );
        let second = merge(
            Some(&first),
            &[EndpointResult::failed(scores_endpoint(), FetchError::Network("refused".into()))],
            2,
        );
        assert!(matches!(
            second.section(SectionKind::Scores),
            Some(SectionState::Unavailable { .. })
        ));
        assert_eq!(second.record, Record::default());
    }

    #[test]
    fn test_featured_picks_feed_top_plays_without_picks_endpoint() {
        let featured = json!({
            "moneylineLock": { "pick": "Chiefs ML", "confidence": 77 },
            "picks": [
                { "matchup": "Bills @ Chiefs", "mlPick": { "pick": "Chiefs", "confidence": 77 } }
            ]
        });
        let snapshot = merge(
            None,
            &[EndpointResult::ok(
                Endpoint::new(SectionKind::Featured, "/api/featured"),
                featured,
            )],
            1,
        );
        assert_eq!(snapshot.top_plays.len(), 1);
        assert_eq!(snapshot.top_plays[0].pick, "Chiefs");
    }
}
