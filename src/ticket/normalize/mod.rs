//! # Ticket Normalization
//!
//! Pure, deterministic functions that turn loosely-shaped extractor output
//! into a [`WageringTicketDraft`]. Nothing in here performs I/O, and every
//! function is total: unparseable input degrades to a default instead of
//! an error.

mod event;
mod fields;
mod market;
mod sport;

pub use event::{derive_event, is_matchup};
pub use fields::{
    normalize_bet_type, normalize_date, normalize_status, parse_decimal_text, parse_iso_datetime,
};
pub use market::derive_market;
pub use sport::normalize_sport;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use super::extraction::RawTicket;
use crate::models::{WageringTicketDraft, DEFAULT_COUNTRY};

/// Fold text for comparisons
///
/// Decomposes to NFD, drops combining marks, lowercases and turns every
/// non-alphanumeric run (emoji, punctuation) into a single space.
pub(crate) fn fold_text(text: &str) -> String {
    let mut folded = String::with_capacity(text.len());
    let mut pending_space = false;
    for c in text.nfd().filter(|c| !is_combining_mark(*c)) {
        if c.is_alphanumeric() {
            if pending_space && !folded.is_empty() {
                folded.push(' ');
            }
            pending_space = false;
            folded.extend(c.to_lowercase());
        } else {
            pending_space = true;
        }
    }
    folded
}

/// Collapse internal whitespace runs and trim
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn text_or_empty(value: &Option<String>) -> String {
    value.as_deref().map(str::trim).unwrap_or_default().to_string()
}

/// Normalize one extractor result into a draft
///
/// `caption` is the text the user sent alongside the image, if any.
pub fn normalize_ticket(raw: &RawTicket, caption: Option<&str>) -> WageringTicketDraft {
    let selections = raw.aposta.as_deref().map(str::trim).unwrap_or_default();

    let structured_market = text_or_empty(&raw.mercado);
    let market = if structured_market.is_empty() {
        derive_market(selections)
    } else {
        structured_market
    };

    let event = derive_event(raw.evento.as_deref(), caption, selections, &market);

    let country = match text_or_empty(&raw.pais) {
        c if c.is_empty() => DEFAULT_COUNTRY.to_string(),
        c => c,
    };

    WageringTicketDraft {
        sportsbook: text_or_empty(&raw.casa_de_aposta),
        tipster: text_or_empty(&raw.tipster),
        sport: normalize_sport(raw.esporte.as_deref().unwrap_or_default()),
        event,
        tournament: text_or_empty(&raw.torneio),
        country,
        market,
        bet_type: normalize_bet_type(raw.tipo_aposta.as_deref().unwrap_or_default()),
        stake: raw.valor_apostado.filter(|v| v.is_finite()).unwrap_or(0.0),
        odds: raw.odd.filter(|v| v.is_finite()).unwrap_or(0.0),
        bonus: raw.bonus.filter(|v| v.is_finite()).unwrap_or(0.0),
        event_date: normalize_date(raw.data_evento.as_deref().unwrap_or_default()),
        status: normalize_status(raw.status.as_deref().unwrap_or_default()),
        selections: selections.to_string(),
    }
}
