//! Core library for finding, choosing and downloading subtitles for video files.
//! The pipeline is fingerprint → search → candidate set → selection → download,
//! and `session::Session` runs it once per video.

pub mod config;
pub mod download;
pub mod error;
pub mod fingerprint;
pub mod present;
pub mod search;
pub mod select;
pub mod session;
