//! Training: target construction, masked pointer loss, and the epoch loop.

pub mod data;
pub mod loss;
pub mod trainer;
