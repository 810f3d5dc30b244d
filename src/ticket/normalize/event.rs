//! Event ("Team A vs Team B") derivation.

use lazy_static::lazy_static;
use regex::Regex;

use super::collapse_whitespace;

lazy_static! {
    /// Connectors that separate the two sides of a matchup
    static ref CONNECTOR: Regex = Regex::new(r"(?i)\s+(?:vs\.?|versus|x|v)\s+|\s+[-–]\s+|\s*@\s*")
        .expect("Matchup connector pattern should be valid");

    /// Betting-market vocabulary; a side containing any of it is a market line
    static ref MARKET_VOCABULARY: Regex = Regex::new(
        r"(?i)\b(?:assist[eê]ncias?|assists?|escanteios?|corners?|over|under|mais\s+de|menos\s+de|acima|abaixo|pontos|points|rebotes|rebounds|gols|goals|cart[õo]es|cards|chutes|shots|finaliza[çc][õo]es|handicap|ambas|btts|total|resultado|vencedor|winner|moneyline|dupla\s+chance|double\s+chance|empate|draw|jogador|player|odds?|sim|n[ãa]o|yes|no)\b",
    )
    .expect("Market vocabulary pattern should be valid");

    /// Numeric thresholds such as `20+`, `+1.5` or `2.5`
    static ref THRESHOLD: Regex = Regex::new(r"(?:^|\s)(?:\d+(?:[.,]\d+)?\+|[+-]\d+(?:[.,]\d+)?|\d+[.,]5)(?:\s|$)")
        .expect("Threshold pattern should be valid");
}

fn clean_line(line: &str) -> String {
    let trimmed = line.trim_matches(|c: char| c.is_whitespace() || matches!(c, '•' | '*' | '·' | '|' | '>'));
    collapse_whitespace(trimmed)
}

fn is_side(side: &str) -> bool {
    let side = side.trim();
    !side.is_empty()
        && side.chars().any(char::is_alphabetic)
        && !MARKET_VOCABULARY.is_match(side)
        && !THRESHOLD.is_match(side)
}

/// Whether a single line reads as "Team A <connector> Team B"
///
/// At least two sides are required, each with letters and none using
/// market vocabulary or numeric thresholds.
pub fn is_matchup(text: &str) -> bool {
    let line = clean_line(text);
    if line.is_empty() {
        return false;
    }
    let sides: Vec<&str> = CONNECTOR.split(&line).collect();
    sides.len() >= 2 && sides.iter().all(|side| is_side(side))
}

fn first_matchup(candidate: &str) -> Option<String> {
    candidate
        .lines()
        .map(clean_line)
        .find(|line| is_matchup(line))
}

/// Pick the event for a ticket
///
/// The extractor's field is accepted only when it is a matchup; otherwise
/// the caption, the selections and the market are scanned in that order.
/// With no matchup anywhere the extractor's field is kept as-is, or the
/// first non-empty candidate line is used.
pub fn derive_event(
    extracted: Option<&str>,
    caption: Option<&str>,
    selections: &str,
    market: &str,
) -> String {
    let extracted = extracted.map(clean_line).unwrap_or_default();
    if is_matchup(&extracted) {
        return extracted;
    }

    let candidates = [caption.unwrap_or_default(), selections, market];
    if let Some(event) = candidates.iter().find_map(|c| first_matchup(c)) {
        return event;
    }

    if !extracted.is_empty() {
        return extracted;
    }

    candidates
        .iter()
        .flat_map(|c| c.lines())
        .map(clean_line)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
}
