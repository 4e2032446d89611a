use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::response::Button;

/// One button per row; `None` when there is nothing to attach.
pub(crate) fn inline_keyboard(buttons: &[Button]) -> Option<InlineKeyboardMarkup> {
    if buttons.is_empty() {
        return None;
    }

    let keyboard: Vec<Vec<InlineKeyboardButton>> = buttons
        .iter()
        .map(|button| {
            vec![InlineKeyboardButton::callback(
                button.label.clone(),
                button.callback_data.clone(),
            )]
        })
        .collect();

    Some(InlineKeyboardMarkup::new(keyboard))
}
