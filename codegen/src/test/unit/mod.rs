pub mod target;
pub mod types;
