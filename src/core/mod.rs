//! Core coordinate, frame and configuration utilities shared by the globe
//! and overlay layers.

pub mod config;
pub mod coordinates;
pub mod space;

pub use config::OverlayConfig;
