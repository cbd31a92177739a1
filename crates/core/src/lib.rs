pub mod address;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod dns;
pub mod error;
pub mod export;
pub mod identity;
pub mod message;
pub mod model;
pub mod paginate;
pub mod progress;
pub mod torrent;
pub mod tree;

pub use client::{QueryClient, Resolved, Transport};
pub use config::{ClientConfig, ServerConfig};
pub use dispatch::{Dispatcher, Question, QuestionType, Reply};
pub use error::{Error, Result};
pub use model::*;
pub use tree::VirtualTree;
