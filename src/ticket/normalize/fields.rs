//! Scalar field normalization: dates, amounts, status and bet type.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use lazy_static::lazy_static;
use regex::Regex;

use super::fold_text;
use crate::models::{SettlementStatus, DEFAULT_BET_TYPE, MULTIPLE_BET_TYPE};

lazy_static! {
    static ref ISO_PREFIX: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}")
        .expect("ISO date pattern should be valid");

    /// `DD/MM/YYYY` with an optional `HH:MM[:SS]`
    static ref BR_DATE: Regex = Regex::new(
        r"^(\d{1,2})/(\d{1,2})/(\d{4})(?:[\sT,]+(\d{1,2}):(\d{2})(?::(\d{2}))?)?$",
    )
    .expect("DD/MM/YYYY pattern should be valid");
}

const ISO_DATETIME: &str = "%Y-%m-%dT%H:%M:%S";

/// Normalize a ticket date to ISO form
///
/// ISO input passes through, `DD/MM/YYYY[ HH:MM[:SS]]` is converted and
/// anything else becomes an empty string.
pub fn normalize_date(raw: &str) -> String {
    let raw = raw.trim();
    if ISO_PREFIX.is_match(raw) {
        return raw.to_string();
    }

    let Some(caps) = BR_DATE.captures(raw) else {
        return String::new();
    };
    let number = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());

    let (Some(day), Some(month), Some(year)) = (number(1), number(2), number(3)) else {
        return String::new();
    };
    let Some(date) = NaiveDate::from_ymd_opt(year as i32, month, day) else {
        return String::new();
    };

    match (number(4), number(5)) {
        (Some(hour), Some(minute)) => {
            match NaiveTime::from_hms_opt(hour, minute, number(6).unwrap_or(0)) {
                Some(time) => date.and_time(time).format(ISO_DATETIME).to_string(),
                None => String::new(),
            }
        }
        _ => date.format("%Y-%m-%d").to_string(),
    }
}

/// Parse a normalized ISO date/time into a naive timestamp
///
/// Offsets are converted to UTC; a bare date is taken at midnight.
pub fn parse_iso_datetime(iso: &str) -> Option<NaiveDateTime> {
    let iso = iso.trim();
    if iso.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(iso) {
        return Some(dt.naive_utc());
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(iso, format) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(iso.get(..10)?, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Parse a human-written decimal (`"R$ 1.250,50"`, `"1,80"`, `"2.05"`)
///
/// With both `.` and `,` present the last one is the decimal separator;
/// a single separator kind is decimal when it occurs once, grouping otherwise.
pub fn parse_decimal_text(text: &str) -> Option<f64> {
    let kept: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();
    if !kept.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let last_dot = kept.rfind('.');
    let last_comma = kept.rfind(',');
    let decimal_sep = match (last_dot, last_comma) {
        (Some(d), Some(c)) => Some(if d > c { '.' } else { ',' }),
        (Some(_), None) if kept.matches('.').count() == 1 => Some('.'),
        (None, Some(_)) if kept.matches(',').count() == 1 => Some(','),
        _ => None,
    };

    let canonical: String = match decimal_sep {
        Some(sep) => kept
            .chars()
            .filter(|c| *c == sep || !matches!(c, '.' | ','))
            .map(|c| if c == sep { '.' } else { c })
            .collect(),
        None => kept.chars().filter(|c| !matches!(c, '.' | ',')).collect(),
    };

    canonical.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn has_phrase(padded: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| padded.contains(&format!(" {p} ")))
}

fn has_prefix_word(folded: &str, prefixes: &[&str]) -> bool {
    folded
        .split(' ')
        .any(|word| prefixes.iter().any(|p| word.starts_with(p)))
}

/// Map free-form status wording to a settlement status (default Pendente)
pub fn normalize_status(raw: &str) -> SettlementStatus {
    let folded = fold_text(raw);
    if folded.is_empty() {
        return SettlementStatus::Pendente;
    }
    let padded = format!(" {folded} ");

    if has_phrase(&padded, &["meio ganha", "meio ganho", "half won", "half win"]) {
        SettlementStatus::MeioGanha
    } else if has_phrase(&padded, &["meio perdida", "meio perdido", "half lost", "half loss"]) {
        SettlementStatus::MeioPerdida
    } else if has_prefix_word(&folded, &["reembols", "devolvid", "anulad", "cancelad"])
        || has_phrase(&padded, &["void", "refund", "refunded", "cashout", "cash out"])
    {
        SettlementStatus::Reembolsada
    } else if has_prefix_word(&folded, &["ganh", "vencid"])
        || has_phrase(&padded, &["green", "won", "win", "winner"])
    {
        SettlementStatus::Ganha
    } else if has_prefix_word(&folded, &["perd"]) || has_phrase(&padded, &["red", "lost", "loss", "lose"]) {
        SettlementStatus::Perdida
    } else {
        SettlementStatus::Pendente
    }
}

/// Canonical bet type: accumulators become "Múltipla", everything else "Simples"
pub fn normalize_bet_type(raw: &str) -> String {
    let folded = fold_text(raw);
    let multiple = has_prefix_word(&folded, &["multipl", "acumulad", "combinad", "parlay", "accumulator", "acca"]);
    if multiple {
        MULTIPLE_BET_TYPE.to_string()
    } else {
        DEFAULT_BET_TYPE.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_date() {
        assert_eq!(normalize_date("2025-03-21T16:00:00Z"), "2025-03-21T16:00:00Z");
        assert_eq!(normalize_date("21/03/2025"), "2025-03-21");
        assert_eq!(normalize_date("1/3/2025 9:05"), "2025-03-01T09:05:00");
        assert_eq!(normalize_date("21/03/2025 16:00:30"), "2025-03-21T16:00:30");
        assert_eq!(normalize_date("31/02/2025"), "");
        assert_eq!(normalize_date("amanhã às 16h"), "");
        assert_eq!(normalize_date(""), "");
    }

    #[test]
    fn test_parse_iso_datetime() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 21)
            .and_then(|d| d.and_hms_opt(16, 0, 0))
            .unwrap();
        assert_eq!(parse_iso_datetime("2025-03-21T16:00:00"), Some(expected));
        assert_eq!(parse_iso_datetime("2025-03-21T19:00:00+03:00"), Some(expected));
        assert_eq!(parse_iso_datetime("2025-03-21T16:00"), Some(expected));
        assert_eq!(
            parse_iso_datetime("2025-03-21"),
            NaiveDate::from_ymd_opt(2025, 3, 21).and_then(|d| d.and_hms_opt(0, 0, 0))
        );
        assert_eq!(parse_iso_datetime(""), None);
        assert_eq!(parse_iso_datetime("garbage"), None);
    }

    #[test]
    fn test_parse_decimal_text() {
        assert_eq!(parse_decimal_text("R$ 1.250,50"), Some(1250.5));
        assert_eq!(parse_decimal_text("1,80"), Some(1.8));
        assert_eq!(parse_decimal_text("2.05"), Some(2.05));
        assert_eq!(parse_decimal_text("1,250.75"), Some(1250.75));
        assert_eq!(parse_decimal_text("1.000.000"), Some(1_000_000.0));
        assert_eq!(parse_decimal_text("abc"), None);
    }

    #[test]
    fn test_normalize_status_vocabulary() {
        assert_eq!(normalize_status("Ganhou"), SettlementStatus::Ganha);
        assert_eq!(normalize_status("GREEN ✅"), SettlementStatus::Ganha);
        assert_eq!(normalize_status("Perdida"), SettlementStatus::Perdida);
        assert_eq!(normalize_status("red"), SettlementStatus::Perdida);
        assert_eq!(normalize_status("Meio Ganha"), SettlementStatus::MeioGanha);
        assert_eq!(normalize_status("meio perdida"), SettlementStatus::MeioPerdida);
        assert_eq!(normalize_status("Reembolsada"), SettlementStatus::Reembolsada);
        assert_eq!(normalize_status("Anulada"), SettlementStatus::Reembolsada);
        assert_eq!(normalize_status("Em aberto"), SettlementStatus::Pendente);
        assert_eq!(normalize_status("credited"), SettlementStatus::Pendente);
        assert_eq!(normalize_status(""), SettlementStatus::Pendente);
    }

    #[test]
    fn test_normalize_bet_type() {
        assert_eq!(normalize_bet_type("Múltipla"), "Múltipla");
        assert_eq!(normalize_bet_type("Aposta acumulada"), "Múltipla");
        assert_eq!(normalize_bet_type("Simples"), "Simples");
        assert_eq!(normalize_bet_type(""), "Simples");
    }
}
