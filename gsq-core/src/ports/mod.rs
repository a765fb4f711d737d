// gsq-core/src/ports/mod.rs

// What the pipeline needs from the outside world, without knowing how it's done.

pub mod credential;
pub mod dataset;
pub mod evaluator;
pub mod http;
