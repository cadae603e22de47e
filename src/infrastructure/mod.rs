//! Infrastructure layer: the Gemini REST backend and the model catalog.

pub mod catalog;
pub mod model;
