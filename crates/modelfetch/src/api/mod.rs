//! Marketplace API clients

pub mod sketchfab_api;

pub use sketchfab_api::{ModelMetadata, SketchfabApi};
