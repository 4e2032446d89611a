pub mod commands;
pub mod config;
pub mod controller;
pub mod dispatch;
pub mod errors;
pub mod keyboard;
pub mod messages;
pub mod parser;
pub mod queue;
pub mod repository;
pub mod response;
pub mod scheduler;
pub mod schema;
pub mod state;
pub mod transition;

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync + 'static>>;
