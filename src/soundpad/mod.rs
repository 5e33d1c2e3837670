//! Soundpad integration: the helper process and its HTTP API

pub mod client;
pub mod server;

pub use client::{ensure_running, SoundpadClient};
pub use server::SoundpadServer;
