use crate::models::{Market, Pick, PickLine, Play};
use crate::utils::odds::{american_odds_to_probability, calculate_edge};

/// How many plays the dashboard highlights
pub const TOP_PLAYS: usize = 3;

impl Play {
    fn from_line(pick: &Pick, market: Market, line: &PickLine) -> Self {
        Self {
            matchup: pick.matchup.clone(),
            market,
            pick: line.pick.clone(),
            confidence: line.confidence,
            odds: line.odds,
            implied_prob: line.odds.map(american_odds_to_probability),
            edge: line.odds.map(|odds| calculate_edge(line.confidence, odds)),
        }
    }

    /// Format the play as a readable string
    pub fn format(&self) -> String {
        let mut out = format!(
            "{} | {}: {} | Confidence: {:.0}%",
            self.matchup, self.market, self.pick, self.confidence
        );
        if let (Some(odds), Some(implied), Some(edge)) = (self.odds, self.implied_prob, self.edge) {
            out.push_str(&format!(
                " | Odds: {:+} | Implied: {:.1}% | Edge: {:+.1}%",
                odds, implied, edge
            ));
        }
        out
    }
}

/// Every play present in the picks, in pick order and then market order
pub fn collect_plays(picks: &[Pick]) -> Vec<Play> {
    let mut plays = Vec::new();
    for pick in picks {
        let lines = [
            (Market::Moneyline, &pick.moneyline_pick),
            (Market::Spread, &pick.spread_pick),
            (Market::Total, &pick.total_pick),
            (Market::Recommended, &pick.recommended_play),
        ];
        for (market, line) in lines {
            // An absent market is skipped, and so is one with nothing to show
            if let Some(line) = line.as_ref().filter(|l| !l.pick.trim().is_empty()) {
                plays.push(Play::from_line(pick, market, line));
            }
        }
    }
    plays
}

/// Highest-confidence plays first. Ties keep their original order.
pub fn top_plays(mut plays: Vec<Play>, top_n: usize) -> Vec<Play> {
    // sort_by is stable
    plays.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    plays.truncate(top_n);
    plays
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(pick: &str, confidence: f64) -> Option<PickLine> {
        Some(PickLine {
            pick: pick.to_string(),
            confidence,
            odds: None,
        })
    }

    fn moneyline_only(matchup: &str, confidence: f64) -> Pick {
        Pick {
            matchup: matchup.to_string(),
            bookmaker: "DraftKings".to_string(),
            moneyline_pick: line(matchup, confidence),
            ..Pick::default()
        }
    }

    #[test]
    fn test_top_plays_is_stable() {
        let picks: Vec<Pick> = [55.0, 90.0, 70.0, 90.0, 60.0]
            .iter()
            .enumerate()
            .map(|(i, c)| moneyline_only(&format!("game {}", i), *c))
            .collect();

        let top = top_plays(collect_plays(&picks), TOP_PLAYS);

        let matchups: Vec<&str> = top.iter().map(|p| p.matchup.as_str()).collect();
        assert_eq!(matchups, vec!["game 1", "game 3", "game 2"]);
        let confidences: Vec<f64> = top.iter().map(|p| p.confidence).collect();
        assert_eq!(confidences, vec![90.0, 90.0, 70.0]);
    }

    #[test]
    fn test_top_plays_with_fewer_candidates() {
        let picks = vec![moneyline_only("only game", 51.0)];
        let top = top_plays(collect_plays(&picks), TOP_PLAYS);
        assert_eq!(top.len(), 1);
        assert!(top_plays(Vec::new(), TOP_PLAYS).is_empty());
    }

    #[test]
    fn test_collect_plays_skips_missing_markets() {
        let pick = Pick {
            matchup: "Bills @ Chiefs".to_string(),
            bookmaker: "FanDuel".to_string(),
            moneyline_pick: Some(PickLine {
                pick: "Chiefs".to_string(),
                confidence: 64.0,
                odds: Some(-150),
            }),
            spread_pick: None,
            total_pick: line("", 80.0),
            recommended_play: line("Over 47.5", 58.0),
        };

        let plays = collect_plays(&[pick]);
        assert_eq!(plays.len(), 2);
        assert_eq!(plays[0].market, Market::Moneyline);
        assert_eq!(plays[1].market, Market::Recommended);

        // Edge against the same side's price: 64 - 60
        let edge = plays[0].edge.unwrap();
        assert!((edge - 4.0).abs() < 0.1);
        assert!(plays[1].edge.is_none());
    }

    #[test]
    fn test_play_format() {
        let play = Play {
            matchup: "Bills @ Chiefs".to_string(),
            market: Market::Moneyline,
            pick: "Chiefs".to_string(),
            confidence: 64.0,
            odds: Some(-150),
            implied_prob: Some(60.0),
            edge: Some(4.0),
        };
        assert_eq!(
            play.format(),
            "Bills @ Chiefs | Moneyline: Chiefs | Confidence: 64% | Odds: -150 | Implied: 60.0% | Edge: +4.0%"
        );
    }
}
