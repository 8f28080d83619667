//! Core configuration and data model shared across the crate.

pub mod config;
pub mod models;

pub use config::AppConfig;
pub use models::{Attachment, Channel, Message, MessagePage, Reaction, UserInfo};
