use teloxide::dispatching::dialogue::GetChatId;
use teloxide::types::{Update, UpdateKind};
use teloxide::utils::command::BotCommands;

use crate::commands::{Command, RequestData, TextCommand};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Callback(String),
    Other,
}

/// The part of a Telegram update the bot cares about; this is what the
/// update queue stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub chat_id: i64,
    pub message_id: i32,
    pub payload: Payload,
}

impl RawEvent {
    pub fn text(chat_id: i64, message_id: i32, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            message_id,
            payload: Payload::Text(text.into()),
        }
    }

    pub fn callback(chat_id: i64, message_id: i32, data: impl Into<String>) -> Self {
        Self {
            chat_id,
            message_id,
            payload: Payload::Callback(data.into()),
        }
    }

    /// Extracts the event from a message or a callback query on a message.
    /// Updates that are not tied to a chat yield `None`.
    pub fn from_update(update: &Update) -> Option<Self> {
        match &update.kind {
            UpdateKind::Message(msg) => Some(Self {
                chat_id: msg.chat.id.0,
                message_id: msg.id.0,
                payload: msg
                    .text()
                    .map(|text| Payload::Text(text.to_owned()))
                    .unwrap_or(Payload::Other),
            }),
            UpdateKind::CallbackQuery(q) => {
                let chat_id = q.chat_id()?;
                let message = q.message.as_ref()?;
                Some(Self {
                    chat_id: chat_id.0,
                    message_id: message.id().0,
                    payload: q
                        .data
                        .clone()
                        .map(Payload::Callback)
                        .unwrap_or(Payload::Other),
                })
            }
            _ => None,
        }
    }
}

/// Maps an event to the command it represents. Never fails: anything
/// unrecognised becomes [`Command::Unknown`].
pub fn parse(event: &RawEvent) -> RequestData {
    let command = match &event.payload {
        Payload::Text(text) => TextCommand::parse(text.trim(), "")
            .map(Command::from)
            .unwrap_or(Command::Unknown),
        Payload::Callback(data) => Command::from_callback_data(data),
        Payload::Other => Command::Unknown,
    };

    RequestData {
        chat_id: event.chat_id,
        message_id: event.message_id,
        command,
    }
}
