//! Repositories, one per table. Every query filters on the owning user.

pub mod analyses;
pub mod cutting_parameters;
pub mod drawings;
pub mod machines;
pub mod presets;
pub mod repository;
pub mod tools;

pub use analyses::Analyses;
pub use cutting_parameters::CuttingParameters;
pub use drawings::Drawings;
pub use machines::Machines;
pub use presets::Presets;
pub use repository::Repository;
pub use tools::Tools;
