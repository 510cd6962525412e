pub mod config;
pub mod context;
pub mod errors;
pub mod health;
pub mod time_provider;
