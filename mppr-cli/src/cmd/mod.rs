pub mod config;
pub mod simulate;
pub mod topology;
pub mod validate;
