use std::error::Error;
use std::sync::Arc;

use dotenvy::dotenv;
use teloxide::error_handlers::IgnoringErrorHandlerSafe;
use teloxide::prelude::*;
use teloxide::update_listeners::webhooks::{self, Options};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

use wordquizbot::config::Config;
use wordquizbot::controller::{QuizFlow, Repositories};
use wordquizbot::dispatch::ChatWorkers;
use wordquizbot::queue::UpdateQueue;
use wordquizbot::repository::http::HttpBackend;
use wordquizbot::response::TelegramSink;
use wordquizbot::scheduler::Scheduler;
use wordquizbot::schema::schema;

type MainResult = Result<(), Box<dyn Error + Send + Sync + 'static>>;

fn init_tracing(level: &str) -> MainResult {
    // teloxide logs through `log`
    tracing_log::LogTracer::init()?;

    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_span_events(FmtSpan::ENTER)
        .log_internal_errors(true)
        .with_line_number(true)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

#[tokio::main]
async fn main() -> MainResult {
    dotenv().ok();

    let config = Config::from_env()?;
    init_tracing(&config.log_level)?;

    let backend = Arc::new(HttpBackend::new(
        config.backend_url.clone(),
        config.backend_timeout,
    )?);
    let bot = Bot::new(config.token.clone());

    let (wake_tx, wake_rx) = mpsc::unbounded_channel();
    let scheduler = Scheduler::new(config.reschedule_policy, wake_tx);
    info!(backend = %config.backend_url, policy = ?scheduler.policy(), "Starting bot...");

    let flow = Arc::new(QuizFlow::new(
        Repositories::from_backend(backend),
        Arc::new(TelegramSink::new(bot.clone())),
        scheduler,
    ));
    let workers = ChatWorkers::new(flow, config.worker_idle);
    workers.forward_wakeups(wake_rx);

    let queue = Arc::new(UpdateQueue::new(config.poll_interval));
    let drain = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move { queue.start(|event| workers.route(event)).await })
    };

    let mut dispatcher = Dispatcher::builder(bot.clone(), schema())
        .dependencies(dptree::deps![Arc::clone(&queue)])
        .enable_ctrlc_handler()
        .build();

    match config.webhook {
        Some(webhook) => {
            info!(url = %webhook.url, addr = %webhook.addr, "Receiving updates through a webhook");
            let listener = webhooks::axum(bot, Options::new(webhook.addr, webhook.url)).await?;
            dispatcher
                .dispatch_with_listener(listener, Arc::new(IgnoringErrorHandlerSafe))
                .await
        }
        None => {
            info!("Receiving updates through long polling");
            dispatcher.dispatch().await
        }
    }

    queue.stop();
    drain.await?;
    info!("Bot stopped");

    Ok(())
}
