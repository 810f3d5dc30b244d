//! # Localization Tests
//!
//! Every key the bot renders must exist in the pt-BR catalog; a missing
//! key would reach the user as its raw name.

use bankroll_bot::localization::{t, t_args};

const CATALOG_KEYS: &[&str] = &[
    "start-unlinked",
    "start-linked",
    "help",
    "support-contact",
    "link-success",
    "link-already",
    "link-missing-id",
    "link-invalid-id",
    "link-account-not-found",
    "link-chat-taken",
    "link-account-taken",
    "link-error",
    "unlink-success",
    "unlink-none",
    "unlink-error",
    "not-linked",
    "no-bankroll",
    "ticket-processing",
    "ticket-failed",
    "ticket-timeout",
    "ticket-save-failed",
    "bet-fallback-summary",
    "summary-title",
    "summary-sport",
    "summary-event",
    "summary-tournament",
    "summary-market",
    "summary-bet-type",
    "summary-stake",
    "summary-odds",
    "summary-bonus",
    "summary-date",
    "summary-bookmaker",
    "summary-tipster",
    "summary-status",
    "summary-return",
    "summary-profit",
    "summary-loss",
    "summary-selections",
    "button-edit",
    "button-delete",
    "button-status",
    "button-back",
    "callback-not-linked",
    "callback-not-found",
    "callback-invalid",
    "callback-error",
    "callback-status-updated",
    "callback-deleted",
    "callback-stale",
    "bet-deleted",
    "edit-fallback",
    "edit-unavailable",
];

#[test]
fn test_every_key_is_translated() {
    for key in CATALOG_KEYS {
        let text = t(key);
        assert_ne!(text, *key, "missing translation for {key}");
        assert!(!text.trim().is_empty(), "empty translation for {key}");
    }
}

#[test]
fn test_arguments_are_interpolated() {
    let text = t_args("link-success", &[("account", "ana-01")]);
    assert!(text.contains("ana-01"));
    assert!(!text.contains("{"));

    let text = t_args(
        "bet-fallback-summary",
        &[
            ("id", "12"),
            ("event", "Flamengo x Palmeiras"),
            ("stake", "R$ 50,00"),
            ("odds", "1,80"),
        ],
    );
    assert_eq!(text, "✅ Aposta #12 registrada: Flamengo x Palmeiras (R$ 50,00 @ 1,80)");
}

#[test]
fn test_missing_argument_does_not_panic() {
    let text = t("summary-title");
    assert!(text.contains("Aposta"));
}
