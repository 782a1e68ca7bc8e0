mod access_gate;
mod generation_service;

pub use access_gate::{AccessDecision, AccessGate};
pub use generation_service::GenerationService;
