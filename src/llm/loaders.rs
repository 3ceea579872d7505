//! Checkpoint resolution and weight file discovery

pub mod hub;
pub mod safetensor;
