//! Thin adapter around `yt-dlp`: resolve a song name to a playable audio stream URL,
//! or search for videos and project their metadata into [`search::SearchResult`]s.

pub mod cli;
pub mod error;
pub mod resolve;
pub mod search;
pub mod service;
pub mod telemetry;
pub mod tools;

pub use error::LookupError;
