//! Format resolution module

pub mod models;
pub mod resolver;

pub use models::{selector_for, ResolvedFormat, StreamVariant};
pub use resolver::{audio_codec_score, resolve_formats};
