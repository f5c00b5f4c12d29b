/// Convert American odds to an implied probability percentage (0-100)
/// Positive odds (+150) mean you win $150 on a $100 bet
/// Negative odds (-150) mean you need to bet $150 to win $100
pub fn american_odds_to_probability(odds: i32) -> f64 {
    if odds < 0 {
        // For negative odds: -odds / (-odds + 100)
        let abs_odds = -(odds as f64);
        abs_odds / (abs_odds + 100.0) * 100.0
    } else {
        // For positive odds: 100 / (odds + 100)
        100.0 / (odds as f64 + 100.0) * 100.0
    }
}

/// Edge of a pick against the market, in percentage points.
///
/// `confidence` is the model confidence for one side and `odds` the price of
/// that same side, so the comparison never mixes favorite and underdog.
pub fn calculate_edge(confidence: f64, odds: i32) -> f64 {
    confidence - american_odds_to_probability(odds)
}

/// Win rate in percent, rounded to one decimal. Zero when no games are graded.
pub fn win_rate(wins: u32, losses: u32) -> f64 {
    let total = wins as u64 + losses as u64;
    if total == 0 {
        return 0.0;
    }
    round_to_tenth(wins as f64 / total as f64 * 100.0)
}

pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
