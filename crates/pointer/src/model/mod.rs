//! Pointer head module, tensor bridge, and the encoder-injected scoring model.

pub mod bridge;
pub mod head;
pub mod scoring;
