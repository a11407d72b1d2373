mod chat;
mod health;
mod metrics;

pub use chat::{ClientOrigin, chat_handler, identity_key};
pub use health::health_handler;
pub use metrics::metrics_handler;
