pub mod analyses;
pub mod analyze;
pub mod cutting_parameters;
pub mod extraction;
pub mod machines;
pub mod presets;
pub mod status;
pub mod tools;
pub mod users;
