//! Database row types and repository request types, one module per table.

pub mod analyses;
pub mod cutting_parameters;
pub mod drawings;
pub mod machines;
pub mod presets;
pub mod tools;
