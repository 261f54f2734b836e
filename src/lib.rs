//! # albumsift
//!
//! On-device visual similarity engine: embeds photos with a local ONNX model,
//! groups near-duplicates by threshold clustering, and matches a photo library
//! against a representative learned from example photos.

pub mod cli;
pub mod commands;
pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod processing;
pub mod runtime;
pub mod storage;
pub mod ui;
