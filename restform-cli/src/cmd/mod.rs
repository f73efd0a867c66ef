pub mod config;
pub mod invoke;
pub mod plan;
pub mod resources;
pub mod validate;
