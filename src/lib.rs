pub mod chat;
pub mod config;
pub mod error;
pub mod logging;
pub mod providers;
pub mod server;

pub use chat::{ChatMessage, Provider, UniformChatRequest};
pub use config::RelayConfig;
pub use error::{RelayError, Result};
pub use logging::SharedLogger;
pub use server::{build_router, AppState};
