pub mod config;
pub mod errors;
pub mod observations;
pub mod persistence;
pub mod person;
pub mod resolution;
pub mod types;
