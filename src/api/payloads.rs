//! Shape-detecting adapters from raw JSON to section data.
//!
//! A payload that is missing its top-level key, or has the wrong type there,
//! is a `FetchError::Parse`. Inside a list, malformed items are skipped.

use crate::api::FetchError;
use crate::models::de::{list_from_values, number_from_value};
use crate::models::{FeaturedLocks, Pick, PropPick, Record, ScoreEntry, SectionKind};
use crate::utils::odds::win_rate;
use serde_json::Value;

/// A decoded payload, tagged with the section it feeds
#[derive(Debug, Clone, PartialEq)]
pub enum SectionData {
    Featured(FeaturedLocks),
    Picks(Vec<Pick>),
    Record(Record),
    Scores(Vec<ScoreEntry>),
    Props(Vec<PropPick>),
}

pub fn decode(kind: SectionKind, payload: Value) -> Result<SectionData, FetchError> {
    match kind {
        SectionKind::Featured => decode_featured(payload).map(SectionData::Featured),
        SectionKind::Picks => decode_picks(payload).map(SectionData::Picks),
        SectionKind::Record => decode_record(payload).map(SectionData::Record),
        SectionKind::Scores => decode_scores(payload).map(SectionData::Scores),
        SectionKind::Props => decode_props(payload).map(SectionData::Props),
    }
}

pub fn decode_featured(payload: Value) -> Result<FeaturedLocks, FetchError> {
    if !payload.is_object() {
        return Err(FetchError::Parse(format!(
            "featured: expected an object, got {}",
            type_name(&payload)
        )));
    }
    serde_json::from_value(payload).map_err(|e| FetchError::Parse(format!("featured: {}", e)))
}

/// `{ picks: [...] }`, or a bare array
pub fn decode_picks(payload: Value) -> Result<Vec<Pick>, FetchError> {
    list_payload(payload, "picks").map(list_from_values)
}

/// `{ props: [...] }`, or a bare array
pub fn decode_props(payload: Value) -> Result<Vec<PropPick>, FetchError> {
    list_payload(payload, "props").map(list_from_values)
}

/// `{ games: [...] }` or a bare array; deployments disagree on which
pub fn decode_scores(payload: Value) -> Result<Vec<ScoreEntry>, FetchError> {
    list_payload(payload, "games").map(list_from_values)
}

/// `{ wins, losses, winRate? }`; the rate is derived when the server leaves it out
pub fn decode_record(payload: Value) -> Result<Record, FetchError> {
    let Value::Object(fields) = payload else {
        return Err(FetchError::Parse(format!(
            "record: expected an object, got {}",
            type_name(&payload)
        )));
    };

    let wins = count_field(fields.get("wins"), "wins")?;
    let losses = count_field(fields.get("losses"), "losses")?;
    let win_rate = fields
        .get("winRate")
        .or_else(|| fields.get("win_rate"))
        .and_then(number_from_value)
        .map(|rate| rate.clamp(0.0, 100.0))
        .unwrap_or_else(|| win_rate(wins, losses));

    Ok(Record {
        wins,
        losses,
        win_rate,
    })
}

fn list_payload(payload: Value, key: &str) -> Result<Vec<Value>, FetchError> {
    match payload {
        Value::Array(items) => Ok(items),
        Value::Object(mut fields) => match fields.remove(key) {
            Some(Value::Array(items)) => Ok(items),
            Some(other) => Err(FetchError::Parse(format!(
                "{}: expected an array, got {}",
                key,
                type_name(&other)
            ))),
            None => Err(FetchError::Parse(format!("missing `{}` key", key))),
        },
        other => Err(FetchError::Parse(format!(
            "{}: expected an object or array, got {}",
            key,
            type_name(&other)
        ))),
    }
}

fn count_field(value: Option<&Value>, name: &str) -> Result<u32, FetchError> {
    let value = value.ok_or_else(|| FetchError::Parse(format!("record: missing `{}`", name)))?;
    match number_from_value(value) {
        Some(n) if n >= 0.0 && n.fract() == 0.0 && n <= u32::MAX as f64 => Ok(n as u32),
        _ => Err(FetchError::Parse(format!(
            "record: `{}` is not a non-negative integer",
            name
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_derives_win_rate() {
        let record = decode_record(json!({ "wins": 10, "losses": 5 })).unwrap();
        assert_eq!(record.wins, 10);
        assert_eq!(record.losses, 5);
        assert_eq!(record.win_rate, 66.7);
        assert_eq!(record.format(), "10-5 (66.7%)");

        let record = decode_record(json!({ "wins": 0, "losses": 0 })).unwrap();
        assert_eq!(record.win_rate, 0.0);
    }

    #[test]
    fn test_record_keeps_server_win_rate() {
        let record = decode_record(json!({ "wins": 3, "losses": 1, "winRate": "75.0" })).unwrap();
        assert_eq!(record.win_rate, 75.0);
    }

    #[test]
    fn test_record_rejects_missing_or_negative_counts() {
        assert!(matches!(
            decode_record(json!({ "losses": 5 })),
            Err(FetchError::Parse(_))
        ));
        assert!(matches!(
            decode_record(json!({ "wins": -1, "losses": 5 })),
            Err(FetchError::Parse(_))
        ));
        assert!(matches!(
            decode_record(json!([1, 2])),
            Err(FetchError::Parse(_))
        ));
    }

    #[test]
    fn test_scores_accepts_both_shapes() {
        let game = json!({
            "id": "abc",
            "home_team": "Kansas City Chiefs",
            "away_team": "Buffalo Bills",
            "completed": false,
            "scores": [{ "name": "Kansas City Chiefs", "score": "21" }, { "name": "Buffalo Bills", "score": 17 }],
            "last_update": "2025-01-12T20:15:00Z"
        });

        let wrapped = decode_scores(json!({ "totalGames": 1, "liveGames": 1, "games": [game.clone()] })).unwrap();
        let bare = decode_scores(json!([game])).unwrap();
        assert_eq!(wrapped, bare);

        let entry = &bare[0];
        assert_eq!(entry.home_team, "Kansas City Chiefs");
        assert_eq!(entry.away_team, "Buffalo Bills");
        assert_eq!(entry.scores[1].score.as_deref(), Some("17"));
        assert!(entry.last_update.is_some());
        assert!(!entry.completed);
    }

    #[test]
    fn test_scores_rejects_unknown_shape() {
        assert!(matches!(
            decode_scores(json!({ "error": "upstream down" })),
            Err(FetchError::Parse(_))
        ));
        assert!(matches!(decode_scores(json!("nope")), Err(FetchError::Parse(_))));
    }

    #[test]
    fn test_picks_accepts_legacy_moneyline_key() {
        let picks = decode_picks(json!({
            "picks": [
                {
                    "matchup": "Bills @ Chiefs",
                    "bookmaker": "DraftKings",
                    "mlPick": { "pick": "Chiefs", "confidence": 71 }
                },
                {
                    "matchup": "Jets @ Dolphins",
                    "bookmaker": "FanDuel",
                    "moneylinePick": { "pick": "Dolphins", "confidence": "58", "odds": "-135" },
                    "spreadPick": null,
                    "recommendedPlay": "Dolphins ML"
                }
            ]
        }))
        .unwrap();

        assert_eq!(picks.len(), 2);
        assert_eq!(picks[0].moneyline_pick.as_ref().unwrap().pick, "Chiefs");
        let second = &picks[1];
        let moneyline = second.moneyline_pick.as_ref().unwrap();
        assert_eq!(moneyline.confidence, 58.0);
        assert_eq!(moneyline.odds, Some(-135));
        assert!(second.spread_pick.is_none());
        assert_eq!(second.recommended_play.as_ref().unwrap().pick, "Dolphins ML");
    }

    #[test]
    fn test_picks_skips_malformed_items() {
        let picks = decode_picks(json!({
            "picks": [
                "garbage",
                { "matchup": "Bills @ Chiefs", "moneylinePick": { "pick": "Chiefs", "confidence": 150 } }
            ]
        }))
        .unwrap();
        assert_eq!(picks.len(), 1);
        // Confidence is clamped to a percentage
        assert_eq!(picks[0].moneyline_pick.as_ref().unwrap().confidence, 100.0);

        assert!(matches!(
            decode_picks(json!({ "data": [] })),
            Err(FetchError::Parse(_))
        ));
    }

    #[test]
    fn test_featured_defaults_missing_locks() {
        let featured = decode_featured(json!({
            "moneylineLock": { "pick": "Chiefs ML", "confidence": 77 },
            "propLock": { "player": "Josh Allen", "market": "passing yards", "line": 265.5, "confidence": 62 },
            "picks": [],
            "generatedAt": "2025-01-12T18:00:00.000Z"
        }))
        .unwrap();

        assert_eq!(featured.moneyline_lock.as_ref().unwrap().confidence, 77.0);
        assert!(featured.spread_lock.is_none());
        assert_eq!(featured.prop_lock.as_ref().unwrap().line, Some(265.5));
        assert!(featured.generated_at.is_some());

        assert!(matches!(decode_featured(json!(null)), Err(FetchError::Parse(_))));
    }

    #[test]
    fn test_props() {
        let props = decode_props(json!({
            "props": [{
                "player": "Travis Kelce",
                "market": "receiving yards",
                "line": "62.5",
                "over": -115,
                "under": "+105",
                "matchup": "Bills @ Chiefs"
            }]
        }))
        .unwrap();
        assert_eq!(props[0].line, Some(62.5));
        assert_eq!(props[0].over, Some(-115));
        assert_eq!(props[0].under, Some(105));
    }
}
