//! Boundary decoding of webhook payloads.
//!
//! Raw Telegram JSON is deserialized into the minimal structs below and
//! immediately classified into an [`InboundUpdate`]; nothing downstream
//! sees untyped payloads.

use serde::Deserialize;

use super::callback_data::{CallbackAction, KeyboardView};

#[derive(Debug, Clone, Deserialize)]
pub struct WireUpdate {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<WireMessage>,
    #[serde(default)]
    pub channel_post: Option<WireMessage>,
    #[serde(default)]
    pub callback_query: Option<WireCallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireChat {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireUser {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WirePhotoSize {
    pub file_id: String,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireDocument {
    pub file_id: String,
    #[serde(default)]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireMessage {
    pub message_id: i32,
    pub chat: WireChat,
    #[serde(default)]
    pub from: Option<WireUser>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub photo: Option<Vec<WirePhotoSize>>,
    #[serde(default)]
    pub document: Option<WireDocument>,
    #[serde(default)]
    pub reply_markup: Option<WireKeyboard>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireKeyboard {
    #[serde(default)]
    pub inline_keyboard: Vec<Vec<WireButton>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireButton {
    #[serde(default)]
    pub callback_data: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireCallbackQuery {
    pub id: String,
    pub from: WireUser,
    #[serde(default)]
    pub message: Option<WireMessage>,
    #[serde(default)]
    pub data: Option<String>,
}

/// Text commands understood by the bot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/start` with an optional deep-link parameter (an account id)
    Start(Option<String>),
    /// `/start support_<id>`
    Support(String),
    /// `/id <account id>`
    Link(Option<String>),
    /// `/desvincular`
    Unlink,
    Help,
}

impl Command {
    /// Parse a command line; `/cmd@BotName` is accepted
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if !text.starts_with('/') {
            return None;
        }
        let mut parts = text.splitn(2, char::is_whitespace);
        let head = parts.next().unwrap_or_default();
        let arg = parts
            .next()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string);
        let name = head[1..].split('@').next().unwrap_or_default().to_lowercase();

        match name.as_str() {
            "start" => match arg {
                Some(param) => match param.strip_prefix("support_") {
                    Some(id) if !id.is_empty() => Some(Command::Support(id.to_string())),
                    _ => Some(Command::Start(Some(param))),
                },
                None => Some(Command::Start(None)),
            },
            "id" => Some(Command::Link(arg)),
            "desvincular" => Some(Command::Unlink),
            "help" | "ajuda" => Some(Command::Help),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageContent {
    Command(Command),
    Image {
        file_id: String,
        caption: Option<String>,
    },
    Text(String),
    /// Stickers, voice, unknown commands...
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub chat_id: i64,
    /// Sender id, or the chat id for anonymous channel posts
    pub chat_user_id: i64,
    pub username: Option<String>,
    pub message_id: i32,
    pub is_private: bool,
    pub content: MessageContent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingCallback {
    pub id: String,
    pub chat_user_id: i64,
    pub username: Option<String>,
    /// Coordinates of the message carrying the keyboard, when the platform sent them
    pub message: Option<(i64, i32)>,
    /// Keyboard the message showed when the button was pressed, decoded
    /// from its markup; `None` when the platform did not send it
    pub keyboard: Option<KeyboardView>,
    pub is_private: bool,
    pub data: String,
}

/// A classified webhook update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundUpdate {
    Message(IncomingMessage),
    CallbackQuery(IncomingCallback),
    Unknown,
}

fn is_private_chat(chat: &WireChat) -> bool {
    match chat.kind.as_deref() {
        Some(kind) => kind == "private",
        None => chat.id > 0,
    }
}

/// Largest photo size, which Telegram lists last but not always
fn best_photo(photos: &[WirePhotoSize]) -> Option<&WirePhotoSize> {
    photos
        .iter()
        .max_by_key(|p| (p.file_size.unwrap_or(0), u64::from(p.width) * u64::from(p.height)))
}

fn classify_content(message: &WireMessage) -> MessageContent {
    let caption = message
        .caption
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string);

    if let Some(photo) = message.photo.as_deref().and_then(best_photo) {
        return MessageContent::Image {
            file_id: photo.file_id.clone(),
            caption,
        };
    }

    if let Some(document) = &message.document {
        let is_image = document
            .mime_type
            .as_deref()
            .is_some_and(|m| m.starts_with("image/"));
        if is_image {
            return MessageContent::Image {
                file_id: document.file_id.clone(),
                caption,
            };
        }
        return MessageContent::Other;
    }

    match message.text.as_deref().map(str::trim) {
        Some(text) if text.starts_with('/') => match Command::parse(text) {
            Some(command) => MessageContent::Command(command),
            None => MessageContent::Other,
        },
        Some(text) if !text.is_empty() => MessageContent::Text(text.to_string()),
        _ => MessageContent::Other,
    }
}

/// View of the bet keyboard attached to a message
fn shown_keyboard(message: &WireMessage) -> Option<KeyboardView> {
    message
        .reply_markup
        .as_ref()?
        .inline_keyboard
        .iter()
        .flatten()
        .filter_map(|button| button.callback_data.as_deref())
        .find_map(CallbackAction::parse)
        .map(|action| action.source_view())
}

fn incoming_message(message: &WireMessage) -> IncomingMessage {
    IncomingMessage {
        chat_id: message.chat.id,
        chat_user_id: message.from.as_ref().map_or(message.chat.id, |u| u.id),
        username: message.from.as_ref().and_then(|u| u.username.clone()),
        message_id: message.message_id,
        is_private: is_private_chat(&message.chat),
        content: classify_content(message),
    }
}

impl WireUpdate {
    pub fn classify(&self) -> InboundUpdate {
        if let Some(query) = &self.callback_query {
            return InboundUpdate::CallbackQuery(IncomingCallback {
                id: query.id.clone(),
                chat_user_id: query.from.id,
                username: query.from.username.clone(),
                message: query.message.as_ref().map(|m| (m.chat.id, m.message_id)),
                keyboard: query.message.as_ref().and_then(shown_keyboard),
                is_private: query.message.as_ref().map_or(true, |m| is_private_chat(&m.chat)),
                data: query.data.clone().unwrap_or_default(),
            });
        }

        match self.message.as_ref().or(self.channel_post.as_ref()) {
            Some(message) => InboundUpdate::Message(incoming_message(message)),
            None => InboundUpdate::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn update(value: serde_json::Value) -> InboundUpdate {
        serde_json::from_value::<WireUpdate>(value).unwrap().classify()
    }

    #[test]
    fn test_command_parsing() {
        assert_eq!(Command::parse("/start"), Some(Command::Start(None)));
        assert_eq!(
            Command::parse("/start abc123"),
            Some(Command::Start(Some("abc123".into())))
        );
        assert_eq!(
            Command::parse("/start support_77"),
            Some(Command::Support("77".into()))
        );
        assert_eq!(
            Command::parse("/id@BancaBot  user-1 "),
            Some(Command::Link(Some("user-1".into())))
        );
        assert_eq!(Command::parse("/id"), Some(Command::Link(None)));
        assert_eq!(Command::parse("/DESVINCULAR"), Some(Command::Unlink));
        assert_eq!(Command::parse("/unknown"), None);
        assert_eq!(Command::parse("hello"), None);
    }

    #[test]
    fn test_photo_message_picks_largest_size() {
        let classified = update(json!({
            "update_id": 1,
            "message": {
                "message_id": 10,
                "chat": {"id": 555, "type": "private"},
                "from": {"id": 555, "username": "joao"},
                "caption": "  Flamengo x Vasco ",
                "photo": [
                    {"file_id": "small", "file_size": 100, "width": 90, "height": 90},
                    {"file_id": "large", "file_size": 9000, "width": 800, "height": 800}
                ]
            }
        }));

        let InboundUpdate::Message(message) = classified else {
            panic!("expected a message");
        };
        assert!(message.is_private);
        assert_eq!(message.username.as_deref(), Some("joao"));
        assert_eq!(
            message.content,
            MessageContent::Image {
                file_id: "large".into(),
                caption: Some("Flamengo x Vasco".into())
            }
        );
    }

    #[test]
    fn test_image_document_and_other_documents() {
        let image = update(json!({
            "update_id": 2,
            "message": {
                "message_id": 11,
                "chat": {"id": 555},
                "document": {"file_id": "doc", "mime_type": "image/png"}
            }
        }));
        let InboundUpdate::Message(message) = image else {
            panic!("expected a message");
        };
        assert!(matches!(message.content, MessageContent::Image { .. }));
        assert_eq!(message.chat_user_id, 555);

        let pdf = update(json!({
            "update_id": 3,
            "message": {
                "message_id": 12,
                "chat": {"id": 555},
                "document": {"file_id": "doc", "mime_type": "application/pdf"}
            }
        }));
        let InboundUpdate::Message(message) = pdf else {
            panic!("expected a message");
        };
        assert_eq!(message.content, MessageContent::Other);
    }

    #[test]
    fn test_channel_post_and_callback() {
        let post = update(json!({
            "update_id": 4,
            "channel_post": {
                "message_id": 13,
                "chat": {"id": -100123, "type": "channel"},
                "text": "/help"
            }
        }));
        let InboundUpdate::Message(message) = post else {
            panic!("expected a message");
        };
        assert!(!message.is_private);
        assert_eq!(message.chat_user_id, -100123);
        assert_eq!(message.content, MessageContent::Command(Command::Help));

        let callback = update(json!({
            "update_id": 5,
            "callback_query": {
                "id": "cb1",
                "from": {"id": 555},
                "message": {"message_id": 14, "chat": {"id": 555, "type": "private"}},
                "data": "excluir_9"
            }
        }));
        let InboundUpdate::CallbackQuery(query) = callback else {
            panic!("expected a callback");
        };
        assert_eq!(query.message, Some((555, 14)));
        assert_eq!(query.data, "excluir_9");
        assert_eq!(query.keyboard, None);
    }

    #[test]
    fn test_callback_reports_keyboard_on_screen() {
        let press = |buttons: serde_json::Value| {
            let classified = update(json!({
                "update_id": 7,
                "callback_query": {
                    "id": "cb2",
                    "from": {"id": 555},
                    "message": {
                        "message_id": 15,
                        "chat": {"id": 555, "type": "private"},
                        "reply_markup": {"inline_keyboard": buttons}
                    },
                    "data": "status:GANHA:9"
                }
            }));
            match classified {
                InboundUpdate::CallbackQuery(query) => query.keyboard,
                other => panic!("expected a callback, got {other:?}"),
            }
        };

        let primary = press(json!([
            [{"text": "Editar", "url": "https://app.test/apostas/9/editar"}],
            [{"text": "Excluir", "callback_data": "excluir_9"}]
        ]));
        assert_eq!(primary, Some(KeyboardView::Primary));

        let menu = press(json!([
            [{"text": "Ganha", "callback_data": "status:GANHA:9"}],
            [{"text": "Voltar", "callback_data": "status:BACK:9"}]
        ]));
        assert_eq!(menu, Some(KeyboardView::StatusMenu));

        assert_eq!(press(json!([])), None);
    }

    #[test]
    fn test_unknown_update() {
        assert_eq!(
            update(json!({"update_id": 6, "edited_message": {}})),
            InboundUpdate::Unknown
        );
    }
}
