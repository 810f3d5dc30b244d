//! Market derivation from free-text selections.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

use super::collapse_whitespace;
use super::event::is_matchup;

lazy_static! {
    /// Separators between a selection's context and its market
    static ref SEGMENT_SEPARATOR: Regex = Regex::new(r"→|:|\s[-–]\s")
        .expect("Segment separator pattern should be valid");

    /// Ticket/bet identifiers
    static ref IDENTIFIER: Regex = Regex::new(r"(?i)#\s*\d+|\b(?:id|ref|c[oó]d(?:igo)?)\.?\s*\d+")
        .expect("Identifier pattern should be valid");

    /// Odds quotes (`@1.85`, `odd 1,85`, or a bare two-decimal quote)
    static ref ODDS: Regex = Regex::new(r"(?i)@\s*\d+(?:[.,]\d+)?|\bodds?\s*\d+(?:[.,]\d+)?|\b\d+[.,]\d{2}\b")
        .expect("Odds pattern should be valid");

    /// Money amounts
    static ref AMOUNT: Regex = Regex::new(r"(?i)R\$\s*\d[\d.,]*|\b\d[\d.,]*\s*(?:reais|brl)\b")
        .expect("Amount pattern should be valid");

    static ref PERCENT: Regex = Regex::new(r"\d+(?:[.,]\d+)?\s*%|%")
        .expect("Percent pattern should be valid");

    /// A segment that is only a numeric threshold, e.g. `20+` or `+1.5`
    static ref BARE_THRESHOLD: Regex = Regex::new(r"^(?:\d+(?:[.,]\d+)?\+|[+-]\d+(?:[.,]\d+)?|\d+[.,]5)$")
        .expect("Bare threshold pattern should be valid");
}

fn strip_noise(segment: &str) -> String {
    let segment = IDENTIFIER.replace_all(segment, " ");
    let segment = AMOUNT.replace_all(&segment, " ");
    let segment = PERCENT.replace_all(&segment, " ");
    let segment = ODDS.replace_all(&segment, " ");

    collapse_whitespace(&segment)
        .trim_matches(|c: char| matches!(c, '-' | '–' | '•' | '*' | '·' | '|' | ',' | ';' | '(' | ')'))
        .trim()
        .to_string()
}

/// Market text of one selection line, with noise removed
///
/// The trailing segment wins; a bare threshold there keeps the segment
/// before it on the same line (`Total de Pontos: 20+`).
fn clean_segment(line: &str) -> String {
    let mut segments: Vec<String> = SEGMENT_SEPARATOR
        .split(line)
        .map(strip_noise)
        .filter(|s| !s.is_empty())
        .collect();

    let Some(last) = segments.pop() else {
        return String::new();
    };
    if BARE_THRESHOLD.is_match(&last) {
        if let Some(previous) = segments.pop() {
            return format!("{previous} {last}");
        }
    }
    last
}

/// Derive a market description from the selections text
///
/// Each line contributes its trailing segment; bare thresholds attach to
/// the previous segment, duplicates collapse case-insensitively and the
/// result is joined with `/`. Non-empty input never yields an empty market.
pub fn derive_market(selections: &str) -> String {
    let mut segments: Vec<String> = Vec::new();

    for line in selections.lines() {
        if line.trim().is_empty() || is_matchup(line) {
            continue;
        }
        let segment = clean_segment(line);
        if segment.is_empty() {
            continue;
        }

        if BARE_THRESHOLD.is_match(&segment) {
            match segments.last_mut() {
                Some(previous) => {
                    previous.push(' ');
                    previous.push_str(&segment);
                }
                None => segments.push(segment),
            }
        } else if segment.chars().any(char::is_alphabetic) {
            segments.push(segment);
        }
    }

    let mut seen = HashSet::new();
    let unique: Vec<String> = segments
        .into_iter()
        .filter(|s| seen.insert(s.to_lowercase()))
        .collect();

    if unique.is_empty() {
        return selections
            .lines()
            .map(collapse_whitespace)
            .find(|line| !line.is_empty())
            .unwrap_or_default();
    }

    unique.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_merges_into_previous_segment() {
        assert_eq!(derive_market("Jogador X pontos\n20+"), "Jogador X pontos 20+");
    }

    #[test]
    fn test_threshold_keeps_description_on_same_line() {
        assert_eq!(derive_market("Total de Pontos: 20+"), "Total de Pontos 20+");
        assert_eq!(derive_market("LeBron James pontos - 20+"), "LeBron James pontos 20+");
        assert_eq!(
            derive_market("Resultado: Flamengo\nPontos: 20+"),
            "Flamengo/Pontos 20+"
        );
    }

    #[test]
    fn test_trailing_segment_after_separators() {
        assert_eq!(derive_market("Futebol → Brasileirão → Ambas Marcam"), "Ambas Marcam");
        assert_eq!(derive_market("Total de Gols: Mais de 2.5"), "Mais de 2.5");
        assert_eq!(derive_market("Flamengo - Vencedor do Encontro"), "Vencedor do Encontro");
    }

    #[test]
    fn test_noise_is_stripped() {
        assert_eq!(
            derive_market("Escanteios Mais de 9.5 @1.85 R$ 50,00 #123456"),
            "Escanteios Mais de 9.5"
        );
        assert_eq!(derive_market("Vitória 100%"), "Vitória");
    }

    #[test]
    fn test_segments_deduplicated_and_joined() {
        let selections = "Flamengo x Palmeiras\nResultado: Flamengo\nRESULTADO: flamengo\nAmbas Marcam: Sim";
        assert_eq!(derive_market(selections), "Flamengo/Sim");
    }

    #[test]
    fn test_never_empty_for_non_empty_input() {
        assert_eq!(derive_market("  123456  "), "123456");
        assert_eq!(derive_market("@1.85"), "@1.85");
        assert_eq!(derive_market(""), "");
        assert_eq!(derive_market("Flamengo x Palmeiras"), "Flamengo x Palmeiras");
    }
}
