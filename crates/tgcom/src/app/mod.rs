//! Application layer: language lookup, line selection, transforms, and the
//! mutation engine that ties them together.

pub mod batch;
pub mod engine;
pub mod language;
pub mod selection;
pub mod transform;
