use std::sync::Arc;

use teloxide::{
    dispatching::{UpdateFilterExt, UpdateHandler},
    dptree,
    prelude::Requester,
    types::{CallbackQuery, Update},
    Bot,
};
use tracing::{debug, instrument};

use crate::{parser::RawEvent, queue::UpdateQueue, HandlerResult};

/// Handler tree for the teloxide dispatcher: everything relevant goes
/// straight into the update queue, nothing is processed here.
pub fn schema() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    dptree::entry()
        .branch(Update::filter_message().endpoint(enqueue_message))
        .branch(Update::filter_callback_query().endpoint(enqueue_callback))
}

fn enqueue(queue: &UpdateQueue, update: &Update) {
    match RawEvent::from_update(update) {
        Some(event) => queue.enqueue(event),
        None => debug!(update_id = ?update.id, "Update without a chat, skipped"),
    }
}

#[instrument(level = "debug", skip_all, fields(update_id = ?update.id))]
async fn enqueue_message(update: Update, queue: Arc<UpdateQueue>) -> HandlerResult {
    enqueue(&queue, &update);
    Ok(())
}

#[instrument(level = "debug", skip_all, fields(update_id = ?update.id))]
async fn enqueue_callback(
    bot: Bot,
    q: CallbackQuery,
    update: Update,
    queue: Arc<UpdateQueue>,
) -> HandlerResult {
    enqueue(&queue, &update);
    bot.answer_callback_query(&q.id).await?;
    Ok(())
}
