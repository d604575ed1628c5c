//! Core domain types shared by the engine and its front ends.

pub mod errors;
pub mod model;
