//! Modules layer - Infrastructure components for external integrations
//!
//! Contains the usage counter backends and the image-generation provider client.

pub mod provider;
pub mod usage_store;
