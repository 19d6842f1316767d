//! Telegram Bot API integration — client and update decoding.

pub mod client;
pub mod update;

pub use client::TelegramClient;
pub use update::Update;
