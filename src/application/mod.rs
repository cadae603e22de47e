//! Application layer: the callable tool surface and the research
//! orchestration behind it.

pub mod research;
pub mod tools;
