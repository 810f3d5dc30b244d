//! Callback payload grammar and the keyboard view state machine.
//!
//! Payloads: `excluir_<id>`, `editar_<id>`, `alterar_status_<id>` and
//! `status:<ACTION>:<id>` where `ACTION` is a status token or `BACK`.

use crate::models::{SettlementStatus, StatusAction};

const DELETE_PREFIX: &str = "excluir_";
const EDIT_PREFIX: &str = "editar_";
const STATUS_MENU_PREFIX: &str = "alterar_status_";
const STATUS_PREFIX: &str = "status:";

/// A decoded inline-button press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    Delete(i64),
    Edit(i64),
    OpenStatusMenu(i64),
    Status { action: StatusAction, bet_id: i64 },
}

impl CallbackAction {
    pub fn parse(data: &str) -> Option<Self> {
        let data = data.trim();
        let bet_id = |rest: &str| rest.parse::<i64>().ok().filter(|id| *id > 0);

        if let Some(rest) = data.strip_prefix(STATUS_MENU_PREFIX) {
            return bet_id(rest).map(CallbackAction::OpenStatusMenu);
        }
        if let Some(rest) = data.strip_prefix(DELETE_PREFIX) {
            return bet_id(rest).map(CallbackAction::Delete);
        }
        if let Some(rest) = data.strip_prefix(EDIT_PREFIX) {
            return bet_id(rest).map(CallbackAction::Edit);
        }
        if let Some(rest) = data.strip_prefix(STATUS_PREFIX) {
            let (token, id) = rest.split_once(':')?;
            let action = StatusAction::from_token(token)?;
            return bet_id(id).map(|bet_id| CallbackAction::Status { action, bet_id });
        }
        None
    }

    pub fn encode(&self) -> String {
        match self {
            CallbackAction::Delete(id) => format!("{DELETE_PREFIX}{id}"),
            CallbackAction::Edit(id) => format!("{EDIT_PREFIX}{id}"),
            CallbackAction::OpenStatusMenu(id) => format!("{STATUS_MENU_PREFIX}{id}"),
            CallbackAction::Status { action, bet_id } => {
                format!("{STATUS_PREFIX}{}:{bet_id}", action.token())
            }
        }
    }

    pub fn bet_id(&self) -> i64 {
        match self {
            CallbackAction::Delete(id)
            | CallbackAction::Edit(id)
            | CallbackAction::OpenStatusMenu(id)
            | CallbackAction::Status { bet_id: id, .. } => *id,
        }
    }

    /// Keyboard the button is drawn on
    pub fn source_view(&self) -> KeyboardView {
        match self {
            CallbackAction::Status { .. } => KeyboardView::StatusMenu,
            _ => KeyboardView::Primary,
        }
    }
}

/// The two mutually exclusive keyboards of a bet message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyboardView {
    /// Edit / Delete / Alter status
    #[default]
    Primary,
    /// Status list + Back
    StatusMenu,
}

/// Lifecycle of a bet message once it carries a keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageState {
    Presented(KeyboardView),
    Deleted,
}

/// Work a transition asks of the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    DeleteBet,
    OfferEditor,
    ShowStatusMenu,
    ApplyStatus(SettlementStatus),
    RestorePrimary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: MessageState,
    pub effect: Effect,
}

impl MessageState {
    /// Transition for `action`, or `None` when the press does not belong to
    /// the keyboard on screen (stale or replayed buttons)
    pub fn step(self, action: &CallbackAction) -> Option<Transition> {
        use KeyboardView::{Primary, StatusMenu};
        use MessageState::Presented;

        let (next, effect) = match (self, *action) {
            (Presented(Primary), CallbackAction::Delete(_)) => (MessageState::Deleted, Effect::DeleteBet),
            (Presented(Primary), CallbackAction::Edit(_)) => (self, Effect::OfferEditor),
            (Presented(Primary), CallbackAction::OpenStatusMenu(_)) => {
                (Presented(StatusMenu), Effect::ShowStatusMenu)
            }
            (
                Presented(StatusMenu),
                CallbackAction::Status {
                    action: StatusAction::Set(status),
                    ..
                },
            ) => (Presented(Primary), Effect::ApplyStatus(status)),
            (
                Presented(StatusMenu),
                CallbackAction::Status {
                    action: StatusAction::Back,
                    ..
                },
            ) => (Presented(Primary), Effect::RestorePrimary),
            _ => return None,
        };
        Some(Transition { next, effect })
    }
}
