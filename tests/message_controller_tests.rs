use std::sync::Arc;
use std::time::Duration;

use bankroll_bot::bot::callback_data::KeyboardView;
use bankroll_bot::bot::ui_builder::{MESSAGE_CHAR_LIMIT, TRUNCATION_MARKER};
use bankroll_bot::bot::{EditOffer, MessageController};
use bankroll_bot::config::DeliveryConfig;
use bankroll_bot::models::{Bet, SettlementStatus};
use bankroll_bot::testkit::{ChatCall, RecordingChat};
use chrono::{NaiveDate, Utc};
use teloxide::types::{InlineKeyboardButtonKind, InlineKeyboardMarkup};

const CHAT: i64 = 555;

fn sample_bet(id: i64) -> Bet {
    Bet {
        id,
        bankroll_id: 1,
        sport: "Futebol ⚽".to_string(),
        event: "Flamengo x Palmeiras".to_string(),
        tournament: "Brasileirão".to_string(),
        country: "Brasil".to_string(),
        market: "Mais de 2.5".to_string(),
        bet_type: "Simples".to_string(),
        stake: 100.0,
        odds: 2.0,
        bonus: 0.0,
        event_date: NaiveDate::from_ymd_opt(2025, 3, 21)
            .and_then(|d| d.and_hms_opt(16, 0, 0))
            .unwrap(),
        tipster: String::new(),
        status: SettlementStatus::Pendente,
        bookmaker: "Bet365".to_string(),
        obtained_return: None,
        selections: String::new(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn controller(webapp: Option<&str>) -> (MessageController, Arc<RecordingChat>) {
    let chat = Arc::new(RecordingChat::new());
    let config = DeliveryConfig {
        retry_backoff: Duration::from_millis(1),
        webapp_base_url: webapp.map(str::to_string),
    };
    (MessageController::new(chat.clone(), config), chat)
}

fn callback_data(keyboard: &InlineKeyboardMarkup) -> Vec<String> {
    keyboard
        .inline_keyboard
        .iter()
        .flatten()
        .filter_map(|button| match &button.kind {
            InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_present_bet_replaces_placeholder() {
    let (messages, chat) = controller(None);
    let placeholder = messages.send_placeholder(CHAT).await;
    assert!(placeholder.is_some());

    let outstanding = messages
        .present_bet(CHAT, true, &sample_bet(7), placeholder)
        .await
        .expect("delivery should succeed");

    assert_eq!(outstanding.view, Some(KeyboardView::Primary));
    let calls = chat.calls();
    let ChatCall::Send { keyboard: Some(keyboard), text, .. } = &calls[1] else {
        panic!("expected the summary to be sent with a keyboard, got {calls:?}");
    };
    assert!(text.contains("#7"));
    assert_eq!(
        callback_data(keyboard),
        vec!["editar_7", "excluir_7", "alterar_status_7"]
    );
    assert!(calls.contains(&ChatCall::Delete {
        chat_id: CHAT,
        message_id: placeholder.unwrap()
    }));
}

#[tokio::test]
async fn test_present_bet_attaches_editor_link() {
    let (messages, chat) = controller(Some("https://app.example.com/"));
    let outstanding = messages
        .present_bet(CHAT, true, &sample_bet(7), None)
        .await
        .unwrap();

    let upgraded = chat
        .calls()
        .into_iter()
        .find_map(|call| match call {
            ChatCall::EditKeyboard { message_id, keyboard, .. }
                if message_id == outstanding.message_id =>
            {
                Some(keyboard)
            }
            _ => None,
        })
        .expect("keyboard should be upgraded");

    let InlineKeyboardButtonKind::WebApp(info) = &upgraded.inline_keyboard[0][0].kind else {
        panic!("expected a web app edit button");
    };
    assert_eq!(
        info.url.as_str(),
        format!(
            "https://app.example.com/apostas/7/editar?messageId={}&chatId={CHAT}",
            outstanding.message_id
        )
    );
}

#[tokio::test]
async fn test_single_failure_is_retried() {
    let (messages, chat) = controller(None);
    chat.fail_next_sends(1);

    let outstanding = messages
        .present_bet(CHAT, true, &sample_bet(3), None)
        .await
        .unwrap();

    assert_eq!(outstanding.view, Some(KeyboardView::Primary));
    assert_eq!(chat.failed_attempts(), 1);
    assert_eq!(chat.sent().len(), 1);
}

#[tokio::test]
async fn test_repeated_failure_degrades_to_text_only() {
    let (messages, chat) = controller(None);
    chat.fail_next_sends(2);

    let outstanding = messages
        .present_bet(CHAT, true, &sample_bet(3), None)
        .await
        .unwrap();

    assert_eq!(outstanding.view, None);
    let sent = chat.sent();
    assert_eq!(sent.len(), 1);
    assert!(matches!(&sent[0], ChatCall::Send { keyboard: None, .. }));
}

#[tokio::test]
async fn test_placeholder_holds_fallback_when_every_send_fails() {
    let (messages, chat) = controller(None);
    let placeholder = messages.send_placeholder(CHAT).await.unwrap();
    chat.fail_next_sends(3);

    let outstanding = messages
        .present_bet(CHAT, true, &sample_bet(9), Some(placeholder))
        .await
        .unwrap();

    assert_eq!(outstanding.message_id, placeholder);
    assert_eq!(outstanding.view, None);
    let calls = chat.calls();
    let Some(ChatCall::EditText { message_id, text, .. }) = calls.last() else {
        panic!("expected the placeholder to be edited, got {calls:?}");
    };
    assert_eq!(*message_id, placeholder);
    assert!(text.contains("#9"));
    assert!(!calls.iter().any(|c| matches!(c, ChatCall::Delete { .. })));
}

#[tokio::test]
async fn test_delivery_error_without_placeholder() {
    let (messages, chat) = controller(None);
    chat.fail_next_sends(3);

    let err = messages
        .present_bet(CHAT, true, &sample_bet(9), None)
        .await
        .unwrap_err();
    assert_eq!(err.bet_id, 9);
    assert!(chat.calls().is_empty());
}

#[tokio::test]
async fn test_long_summary_is_truncated() {
    let (messages, chat) = controller(None);
    let mut bet = sample_bet(1);
    bet.selections = "Jogador marca a qualquer momento\n".repeat(300);

    messages.present_bet(CHAT, true, &bet, None).await.unwrap();

    let text = &chat.sent_texts()[0];
    assert!(text.chars().count() <= MESSAGE_CHAR_LIMIT);
    assert!(text.ends_with(TRUNCATION_MARKER));
}

#[tokio::test]
async fn test_status_menu_round_trip() {
    let (messages, chat) = controller(None);
    let outstanding = messages
        .present_bet(CHAT, true, &sample_bet(4), None)
        .await
        .unwrap();

    let menu = messages
        .show_status_menu(CHAT, outstanding.message_id, 4)
        .await
        .unwrap();
    assert_eq!(menu.view, Some(KeyboardView::StatusMenu));
    let Some(ChatCall::EditKeyboard { keyboard, .. }) = chat.calls().last().cloned() else {
        panic!("expected a keyboard-only edit");
    };
    let data = callback_data(&keyboard);
    assert_eq!(data.len(), 7);
    assert!(data.contains(&"status:GANHA:4".to_string()));
    assert_eq!(data.last().map(String::as_str), Some("status:BACK:4"));

    let mut won = sample_bet(4);
    won.status = SettlementStatus::Ganha;
    won.obtained_return = Some(200.0);
    let restored = messages
        .apply_status_choice(CHAT, outstanding.message_id, true, &won)
        .await
        .unwrap();
    assert_eq!(restored.view, Some(KeyboardView::Primary));
    let Some(ChatCall::EditText { text, keyboard: Some(keyboard), .. }) = chat.calls().last().cloned()
    else {
        panic!("expected a text edit with keyboard");
    };
    assert!(text.contains("✅"));
    assert!(text.contains("R$ 200,00"));
    assert!(callback_data(&keyboard).contains(&"alterar_status_4".to_string()));
}

#[tokio::test]
async fn test_mark_deleted_clears_keyboard() {
    let (messages, chat) = controller(None);
    messages.mark_deleted(CHAT, 100, 12).await.unwrap();

    let Some(ChatCall::EditText { text, keyboard: Some(keyboard), .. }) = chat.calls().last().cloned()
    else {
        panic!("expected a terminal text edit");
    };
    assert!(text.contains("#12"));
    assert!(keyboard.inline_keyboard.is_empty());
}

#[tokio::test]
async fn test_offer_edit_paths() {
    let (messages, _chat) = controller(None);
    assert_eq!(
        messages.offer_edit(CHAT, Some(100), true, 1).await.unwrap(),
        EditOffer::Unavailable
    );

    let (messages, chat) = controller(Some("https://app.example.com"));
    assert_eq!(
        messages.offer_edit(CHAT, Some(100), true, 1).await.unwrap(),
        EditOffer::Upgraded
    );
    assert!(matches!(
        chat.calls().last(),
        Some(ChatCall::EditKeyboard { message_id: 100, .. })
    ));

    let (messages, chat) = controller(Some("https://app.example.com"));
    assert_eq!(
        messages.offer_edit(-100200, None, false, 1).await.unwrap(),
        EditOffer::SentFallback
    );
    let calls = chat.calls();
    assert!(matches!(&calls[0], ChatCall::Send { .. }));
    let ChatCall::EditKeyboard { keyboard, .. } = &calls[1] else {
        panic!("expected the fallback message to receive the editor link");
    };
    assert!(matches!(
        keyboard.inline_keyboard[0][0].kind,
        InlineKeyboardButtonKind::Url(_)
    ));
}
