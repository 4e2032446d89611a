use async_trait::async_trait;
use teloxide::payloads::{EditMessageTextSetters, SendMessageSetters};
use teloxide::prelude::Requester;
use teloxide::types::{ChatId, MessageId};
use teloxide::Bot;
use tracing::{debug, error};

use crate::commands::Command;
use crate::keyboard::inline_keyboard;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub callback_data: String,
}

/// One outgoing message: either a new message or an edit of `edit_message_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub chat_id: i64,
    pub text: String,
    pub edit_message_id: Option<i32>,
    pub buttons: Vec<Button>,
}

impl Response {
    pub fn builder(chat_id: i64) -> ResponseBuilder {
        ResponseBuilder {
            response: Response {
                chat_id,
                text: String::new(),
                edit_message_id: None,
                buttons: Vec::new(),
            },
        }
    }

    pub fn is_edit(&self) -> bool {
        self.edit_message_id.is_some()
    }
}

pub struct ResponseBuilder {
    response: Response,
}

impl ResponseBuilder {
    pub fn message(mut self, text: impl Into<String>) -> Self {
        self.response.text = text.into();
        self
    }

    pub fn edit_current(mut self, message_id: i32) -> Self {
        self.response.edit_message_id = Some(message_id);
        self
    }

    /// Adds a button triggering `command`. Commands without a callback
    /// payload are skipped.
    pub fn button(mut self, label: impl Into<String>, command: &Command) -> Self {
        match command.callback_data() {
            Some(callback_data) => self.response.buttons.push(Button {
                label: label.into(),
                callback_data,
            }),
            None => debug!(?command, "Command has no callback payload, button skipped"),
        }
        self
    }

    pub fn buttons<L: Into<String>>(self, buttons: impl IntoIterator<Item = (L, Command)>) -> Self {
        buttons
            .into_iter()
            .fold(self, |builder, (label, command)| builder.button(label, &command))
    }

    pub fn build(self) -> Response {
        self.response
    }
}

/// Where the quiz flow hands its outgoing messages.
///
/// Delivery is fire-and-forget: failures stay inside the sink.
#[async_trait]
pub trait ResponseSink: Send + Sync {
    async fn deliver(&self, response: Response);
}

/// Delivers responses through the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramSink {
    bot: Bot,
}

impl TelegramSink {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    async fn try_deliver(&self, response: Response) -> Result<(), teloxide::RequestError> {
        let chat_id = ChatId(response.chat_id);
        let keyboard = inline_keyboard(&response.buttons);

        match response.edit_message_id {
            Some(message_id) => {
                let request = self
                    .bot
                    .edit_message_text(chat_id, MessageId(message_id), response.text);
                match keyboard {
                    Some(keyboard) => request.reply_markup(keyboard).await?,
                    None => request.await?,
                };
            }
            None => {
                let request = self.bot.send_message(chat_id, response.text);
                match keyboard {
                    Some(keyboard) => request.reply_markup(keyboard).await?,
                    None => request.await?,
                };
            }
        }

        Ok(())
    }
}

#[async_trait]
impl ResponseSink for TelegramSink {
    async fn deliver(&self, response: Response) {
        let chat_id = response.chat_id;
        let edit = response.is_edit();
        if let Err(e) = self.try_deliver(response).await {
            error!(chat_id, edit, error = %e, "Failed to deliver response");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_buttons_in_order() {
        let response = Response::builder(3)
            .message("Start the quiz?")
            .edit_current(9)
            .button("Yes", &Command::StartQuiz { start: true })
            .button("No", &Command::StartQuiz { start: false })
            .build();

        assert_eq!(response.chat_id, 3);
        assert_eq!(response.edit_message_id, Some(9));
        assert_eq!(
            response
                .buttons
                .iter()
                .map(|b| b.callback_data.as_str())
                .collect::<Vec<_>>(),
            vec!["start_quiz:true", "start_quiz:false"]
        );
    }

    #[test]
    fn text_only_commands_do_not_become_buttons() {
        let response = Response::builder(3)
            .message("hi")
            .button("Start", &Command::Start)
            .build();

        assert!(response.buttons.is_empty());
        assert!(!response.is_edit());
    }
}
