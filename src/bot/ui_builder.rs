//! UI Builder module for creating keyboards and formatting bet messages

use reqwest::Url;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, WebAppInfo};

use super::callback_data::{CallbackAction, KeyboardView};
use crate::localization::{t, t_args};
use crate::models::{profit_or_loss, Bet, SettlementStatus, StatusAction};

/// Telegram's hard limit on message text, in characters
pub const MESSAGE_CHAR_LIMIT: usize = 4096;
pub const TRUNCATION_MARKER: &str = "\n… (mensagem truncada)";

/// Format an amount as Brazilian currency, e.g. `R$ 1.250,50`
pub fn format_money(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let integer = (cents / 100).to_string();

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}R$ {grouped},{:02}", cents % 100)
}

/// Decimal with a comma separator, e.g. `1,80`
pub fn format_decimal(value: f64) -> String {
    format!("{value:.2}").replace('.', ",")
}

/// Cut `text` to the platform limit, ending with the truncation marker
pub fn truncate_message(text: &str) -> String {
    if text.chars().count() <= MESSAGE_CHAR_LIMIT {
        return text.to_string();
    }
    let keep = MESSAGE_CHAR_LIMIT - TRUNCATION_MARKER.chars().count();
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

fn push_field(out: &mut String, label_key: &str, value: &str) {
    if !value.trim().is_empty() {
        out.push_str(&format!("{}: {}\n", t(label_key), value.trim()));
    }
}

/// Full summary text of a bet, already truncated to the platform limit
pub fn format_bet_summary(bet: &Bet) -> String {
    let mut text = t_args("summary-title", &[("id", &bet.id.to_string())]);
    text.push_str("\n\n");

    text.push_str(&format!(
        "{} {}: {}\n",
        bet.status.glyph(),
        t("summary-status"),
        bet.status
    ));
    push_field(&mut text, "summary-sport", &bet.sport);
    push_field(&mut text, "summary-event", &bet.event);
    push_field(&mut text, "summary-tournament", &bet.tournament);
    push_field(&mut text, "summary-market", &bet.market);
    push_field(&mut text, "summary-bet-type", &bet.bet_type);
    push_field(&mut text, "summary-stake", &format_money(bet.stake));
    push_field(&mut text, "summary-odds", &format_decimal(bet.odds));
    if bet.bonus > 0.0 {
        push_field(&mut text, "summary-bonus", &format_money(bet.bonus));
    }
    push_field(
        &mut text,
        "summary-date",
        &bet.event_date.format("%d/%m/%Y %H:%M").to_string(),
    );
    push_field(&mut text, "summary-bookmaker", &bet.bookmaker);
    push_field(&mut text, "summary-tipster", &bet.tipster);

    if let Some(ret) = bet.obtained_return {
        push_field(&mut text, "summary-return", &format_money(ret));
    }
    match profit_or_loss(bet.status, bet.stake, bet.odds) {
        Some(profit) if profit < 0.0 => {
            push_field(&mut text, "summary-loss", &format_money(profit.abs()))
        }
        Some(profit) => push_field(&mut text, "summary-profit", &format_money(profit)),
        None => {}
    }

    if !bet.selections.trim().is_empty() {
        text.push_str(&format!("\n{}:\n{}", t("summary-selections"), bet.selections.trim()));
    }

    truncate_message(text.trim_end())
}

/// One-line summary used when the full message cannot be delivered
pub fn format_fallback_summary(bet: &Bet) -> String {
    let event = if bet.event.trim().is_empty() {
        bet.market.as_str()
    } else {
        bet.event.as_str()
    };
    truncate_message(&t_args(
        "bet-fallback-summary",
        &[
            ("id", &bet.id.to_string()),
            ("event", event),
            ("stake", &format_money(bet.stake)),
            ("odds", &format_decimal(bet.odds)),
        ],
    ))
}

/// Where the bet message lives and what can be linked from it
#[derive(Debug, Clone, Copy)]
pub struct EditButtonContext<'a> {
    pub bet_id: i64,
    /// (chat id, message id) of the bet message, once known
    pub coordinates: Option<(i64, i32)>,
    pub is_private: bool,
    pub webapp_base_url: Option<&'a str>,
}

impl EditButtonContext<'_> {
    fn deep_link(&self) -> Option<Url> {
        let base = self.webapp_base_url?;
        let (chat_id, message_id) = self.coordinates?;
        Url::parse(&edit_deep_link(base, self.bet_id, message_id, chat_id)).ok()
    }
}

/// Deep link into the hosted bet editor
pub fn edit_deep_link(base_url: &str, bet_id: i64, message_id: i32, chat_id: i64) -> String {
    format!(
        "{}/apostas/{bet_id}/editar?messageId={message_id}&chatId={chat_id}",
        base_url.trim_end_matches('/')
    )
}

/// One way of rendering the Edit button; `None` when not applicable
pub trait EditButtonStrategy: Send + Sync {
    fn button(&self, ctx: &EditButtonContext<'_>) -> Option<InlineKeyboardButton>;
}

/// Mini-app button; Telegram only allows these in private chats
pub struct WebAppEditButton;

impl EditButtonStrategy for WebAppEditButton {
    fn button(&self, ctx: &EditButtonContext<'_>) -> Option<InlineKeyboardButton> {
        if !ctx.is_private {
            return None;
        }
        let url = ctx.deep_link()?;
        Some(InlineKeyboardButton::web_app(t("button-edit"), WebAppInfo { url }))
    }
}

/// Plain URL button for groups and channels
pub struct UrlEditButton;

impl EditButtonStrategy for UrlEditButton {
    fn button(&self, ctx: &EditButtonContext<'_>) -> Option<InlineKeyboardButton> {
        let url = ctx.deep_link()?;
        Some(InlineKeyboardButton::url(t("button-edit"), url))
    }
}

/// Callback button answered in the chat, used when no link applies
fn callback_edit_button(bet_id: i64) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(t("button-edit"), CallbackAction::Edit(bet_id).encode())
}

/// Link strategies in priority order; the first applicable one wins
pub fn edit_button_strategies() -> [&'static dyn EditButtonStrategy; 2] {
    [&WebAppEditButton, &UrlEditButton]
}

pub fn edit_button(ctx: &EditButtonContext<'_>) -> InlineKeyboardButton {
    edit_button_strategies()
        .iter()
        .find_map(|strategy| strategy.button(ctx))
        .unwrap_or_else(|| callback_edit_button(ctx.bet_id))
}

/// Edit / Delete / Alter-status keyboard
pub fn primary_keyboard(ctx: &EditButtonContext<'_>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            edit_button(ctx),
            InlineKeyboardButton::callback(
                t("button-delete"),
                CallbackAction::Delete(ctx.bet_id).encode(),
            ),
        ],
        vec![InlineKeyboardButton::callback(
            t("button-status"),
            CallbackAction::OpenStatusMenu(ctx.bet_id).encode(),
        )],
    ])
}

/// Status list (two per row) followed by Back
pub fn status_menu_keyboard(bet_id: i64) -> InlineKeyboardMarkup {
    let status_button = |status: SettlementStatus| {
        InlineKeyboardButton::callback(
            format!("{} {}", status.glyph(), status),
            CallbackAction::Status {
                action: StatusAction::Set(status),
                bet_id,
            }
            .encode(),
        )
    };

    let mut rows: Vec<Vec<InlineKeyboardButton>> = SettlementStatus::ALL
        .chunks(2)
        .map(|pair| pair.iter().copied().map(status_button).collect())
        .collect();
    rows.push(vec![InlineKeyboardButton::callback(
        t("button-back"),
        CallbackAction::Status {
            action: StatusAction::Back,
            bet_id,
        }
        .encode(),
    )]);
    InlineKeyboardMarkup::new(rows)
}

pub fn keyboard_for(view: KeyboardView, ctx: &EditButtonContext<'_>) -> InlineKeyboardMarkup {
    match view {
        KeyboardView::Primary => primary_keyboard(ctx),
        KeyboardView::StatusMenu => status_menu_keyboard(ctx.bet_id),
    }
}

/// Keyboard with no buttons, used for terminal messages
pub fn empty_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(Vec::<Vec<InlineKeyboardButton>>::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use teloxide::types::InlineKeyboardButtonKind;

    fn sample_bet() -> Bet {
        Bet {
            id: 42,
            bankroll_id: 1,
            sport: "Futebol ⚽".into(),
            event: "Flamengo x Palmeiras".into(),
            tournament: String::new(),
            country: "Mundo".into(),
            market: "Ambas Marcam".into(),
            bet_type: "Simples".into(),
            stake: 100.0,
            odds: 2.0,
            bonus: 0.0,
            event_date: NaiveDate::from_ymd_opt(2025, 3, 21)
                .and_then(|d| d.and_hms_opt(16, 0, 0))
                .unwrap(),
            tipster: String::new(),
            status: SettlementStatus::Perdida,
            bookmaker: "Bet365".into(),
            obtained_return: None,
            selections: "Ambas Marcam: Sim".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(1250.5), "R$ 1.250,50");
        assert_eq!(format_money(0.0), "R$ 0,00");
        assert_eq!(format_money(-100.0), "-R$ 100,00");
        assert_eq!(format_money(1_234_567.891), "R$ 1.234.567,89");
        assert_eq!(format_decimal(1.8), "1,80");
    }

    #[test]
    fn test_truncation_respects_cap() {
        let long = "á".repeat(MESSAGE_CHAR_LIMIT + 500);
        let truncated = truncate_message(&long);
        assert_eq!(truncated.chars().count(), MESSAGE_CHAR_LIMIT);
        assert!(truncated.ends_with(TRUNCATION_MARKER));

        let exact = "a".repeat(MESSAGE_CHAR_LIMIT);
        assert_eq!(truncate_message(&exact), exact);
    }

    #[test]
    fn test_summary_shows_loss_for_lost_bet() {
        let text = format_bet_summary(&sample_bet());
        assert!(text.starts_with("🎯 Aposta #42 registrada"));
        assert!(text.contains("❌ Status: Perdida"));
        assert!(text.contains("Prejuízo: R$ 100,00"));
        assert!(!text.contains("Retorno"));
        assert!(!text.contains("Torneio"));
        assert!(text.contains("Data: 21/03/2025 16:00"));
    }

    #[test]
    fn test_summary_of_huge_selections_is_capped() {
        let mut bet = sample_bet();
        bet.selections = "Linha de seleção\n".repeat(1000);
        let text = format_bet_summary(&bet);
        assert!(text.chars().count() <= MESSAGE_CHAR_LIMIT);
        assert!(text.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn test_edit_button_strategy_order() {
        let mut ctx = EditButtonContext {
            bet_id: 42,
            coordinates: Some((555, 10)),
            is_private: true,
            webapp_base_url: Some("https://app.example.com"),
        };
        assert!(matches!(edit_button(&ctx).kind, InlineKeyboardButtonKind::WebApp(_)));

        ctx.is_private = false;
        match edit_button(&ctx).kind {
            InlineKeyboardButtonKind::Url(url) => assert_eq!(
                url.as_str(),
                "https://app.example.com/apostas/42/editar?messageId=10&chatId=555"
            ),
            other => panic!("expected url button, got {other:?}"),
        }

        ctx.coordinates = None;
        assert!(edit_button_strategies()
            .iter()
            .all(|strategy| strategy.button(&ctx).is_none()));
        assert_eq!(
            edit_button(&ctx).kind,
            InlineKeyboardButtonKind::CallbackData("editar_42".into())
        );

        ctx.coordinates = Some((555, 10));
        ctx.webapp_base_url = None;
        assert_eq!(
            edit_button(&ctx).kind,
            InlineKeyboardButtonKind::CallbackData("editar_42".into())
        );
    }

    #[test]
    fn test_status_menu_layout() {
        let keyboard = status_menu_keyboard(9);
        let rows = &keyboard.inline_keyboard;
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].len(), 2);
        assert_eq!(
            rows[3][0].kind,
            InlineKeyboardButtonKind::CallbackData("status:BACK:9".into())
        );
        assert_eq!(
            rows[0][0].kind,
            InlineKeyboardButtonKind::CallbackData("status:GANHA:9".into())
        );
    }
}
